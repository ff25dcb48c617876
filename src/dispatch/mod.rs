//! In-process task dispatch.
//!
//! The scheduling collaborator consumed by the application: jobs are fired
//! at worker actors and awaited through handles. The dispatcher's own
//! logging happens through the `tracing` facade under the `dispatch::*`
//! logger subtrees, which the namespace policy binds at logging setup (the
//! worker/broker/scheduler subtrees flow through the shared pipeline, the
//! raw duplicate subtree is silenced).

pub mod worker;

use std::collections::HashMap;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use kameo::{actor::ActorRef, prelude::Message, Actor};
use kameo_actors::pubsub::{PubSub, Subscribe};
use kameo_actors::DeliveryStrategy;
use serde_json::Value;
use tokio::sync::oneshot;

use crate::logging::policy::SubsystemSinks;
use crate::util::new_id;
use self::worker::{RunJob, WorkerActor};

/// A unit of work executed by a dispatch worker.
#[async_trait]
pub trait Job: Send + Sync + 'static {
    fn name(&self) -> &str;

    async fn run(&self) -> Result<Value, String>;
}

/// Result of one job execution, as observed by the scheduling caller.
#[derive(Debug, Clone)]
pub struct JobOutcome {
    pub succeeded: bool,
    pub value: Option<Value>,
    pub error: Option<String>,
    pub execution_time: Duration,
}

impl JobOutcome {
    fn success(value: Value, execution_time: Duration) -> Self {
        JobOutcome {
            succeeded: true,
            value: Some(value),
            error: None,
            execution_time,
        }
    }

    fn failure(error: String, execution_time: Duration) -> Self {
        JobOutcome {
            succeeded: false,
            value: None,
            error: Some(error),
            execution_time,
        }
    }
}

/// Job state reported to the status monitor.
#[derive(Debug, Clone)]
pub enum JobStatus {
    Active,
    Finished,
    Failed(String),
}

/// The message type published to the status pubsub on every transition.
#[derive(Clone)]
pub struct StatusUpdate {
    pub job_id: u64,
    pub status: JobStatus,
}

/// Query the monitor for a job's most recent status.
pub struct RetrieveStatus {
    pub job_id: u64,
}

#[derive(Debug, thiserror::Error)]
pub enum DispatchError {
    #[error("timed out after {0:?} waiting for job result")]
    Timeout(Duration),
    #[error("worker unavailable: {0}")]
    WorkerUnavailable(String),
    #[error("result channel closed before the job finished")]
    ResultChannelClosed,
}

/// Handle returned by [`Dispatcher::schedule`]; resolves to the job's
/// outcome.
pub struct JobHandle {
    job_id: u64,
    rx: oneshot::Receiver<JobOutcome>,
}

impl JobHandle {
    pub fn job_id(&self) -> u64 {
        self.job_id
    }

    /// Wait up to `timeout` for the job's outcome.
    pub async fn await_result(self, timeout: Duration) -> Result<JobOutcome, DispatchError> {
        match tokio::time::timeout(timeout, self.rx).await {
            Ok(Ok(outcome)) => Ok(outcome),
            Ok(Err(_)) => Err(DispatchError::ResultChannelClosed),
            Err(_) => Err(DispatchError::Timeout(timeout)),
        }
    }
}

/// Tracks the status history of every job seen on the pubsub.
#[derive(Actor)]
pub struct StatusMonitor {
    statuses: Mutex<HashMap<u64, Vec<JobStatus>>>,
}

impl StatusMonitor {
    fn new() -> Self {
        StatusMonitor {
            statuses: Mutex::new(HashMap::new()),
        }
    }
}

impl Message<StatusUpdate> for StatusMonitor {
    type Reply = ();
    async fn handle(
        &mut self,
        msg: StatusUpdate,
        _: &mut kameo::prelude::Context<Self, Self::Reply>,
    ) -> Self::Reply {
        tracing::debug!(
            target: "dispatch::scheduler",
            job_id = msg.job_id,
            status = format!("{:?}", msg.status).as_str(),
            "Job status changed"
        );
        self.statuses
            .lock()
            .unwrap()
            .entry(msg.job_id)
            .or_default()
            .push(msg.status);
    }
}

impl Message<RetrieveStatus> for StatusMonitor {
    type Reply = Option<JobStatus>;
    async fn handle(
        &mut self,
        msg: RetrieveStatus,
        _: &mut kameo::prelude::Context<Self, Self::Reply>,
    ) -> Self::Reply {
        self.statuses
            .lock()
            .unwrap()
            .get(&msg.job_id)
            .and_then(|statuses| statuses.last().cloned())
    }
}

/// Round-robin front over a pool of worker actors.
pub struct Dispatcher {
    workers: Vec<ActorRef<WorkerActor>>,
    monitor: ActorRef<StatusMonitor>,
    next: AtomicUsize,
}

impl Dispatcher {
    /// Spawn the worker pool, the status pubsub and its monitor.
    ///
    /// The dispatcher registers its raw output channel with the subsystem
    /// registry the way a third-party library attaches its own handler;
    /// when the namespace policy detached that prefix at logging setup, the
    /// registration stays dormant.
    pub async fn spawn(
        workers: usize,
        subsystems: &SubsystemSinks,
    ) -> Result<Dispatcher, DispatchError> {
        let _raw = subsystems.register("dispatch::raw");

        let monitor_chan = PubSub::spawn(PubSub::new(DeliveryStrategy::Guaranteed));
        let monitor = StatusMonitor::spawn(StatusMonitor::new());
        monitor_chan
            .tell(Subscribe(monitor.clone()))
            .await
            .map_err(|e| DispatchError::WorkerUnavailable(e.to_string()))?;

        let workers = (0..workers.max(1))
            .map(|_| {
                WorkerActor::spawn(WorkerActor {
                    id: new_id(),
                    monitor_chan: monitor_chan.clone(),
                })
            })
            .collect();

        Ok(Dispatcher {
            workers,
            monitor,
            next: AtomicUsize::new(0),
        })
    }

    /// Fire a job at the next worker. Returns a handle resolving to the
    /// job's outcome.
    pub async fn schedule(&self, job: Box<dyn Job>) -> Result<JobHandle, DispatchError> {
        let job_id = new_id();
        let name = job.name().to_string();
        let (reply, rx) = oneshot::channel();

        let index = self.next.fetch_add(1, Ordering::Relaxed) % self.workers.len();
        self.workers[index]
            .tell(RunJob { job_id, job, reply })
            .await
            .map_err(|e| DispatchError::WorkerUnavailable(e.to_string()))?;

        tracing::debug!(
            target: "dispatch::broker",
            job_id = job_id,
            job = name.as_str(),
            "Job enqueued"
        );
        Ok(JobHandle { job_id, rx })
    }

    /// The most recent status the monitor has seen for a job.
    pub async fn job_status(&self, job_id: u64) -> Option<JobStatus> {
        self.monitor.ask(RetrieveStatus { job_id }).await.ok()?
    }
}
