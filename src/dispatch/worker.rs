//! Worker actors executing dispatched jobs.

use std::time::Instant;

use kameo::{actor::ActorRef, prelude::Message, Actor};
use kameo_actors::pubsub::{PubSub, Publish};
use tokio::sync::oneshot;

use super::{Job, JobOutcome, JobStatus, StatusUpdate};

pub struct WorkerActor {
    pub id: u64,
    pub monitor_chan: ActorRef<PubSub<StatusUpdate>>,
}

/// Run one job and send its outcome back over the reply channel.
pub struct RunJob {
    pub job_id: u64,
    pub job: Box<dyn Job>,
    pub reply: oneshot::Sender<JobOutcome>,
}

impl Actor for WorkerActor {
    type Args = Self;
    type Error = ();
    async fn on_start(args: Self::Args, _actor_ref: ActorRef<Self>) -> Result<Self, Self::Error> {
        Ok(args)
    }
}

impl Message<RunJob> for WorkerActor {
    type Reply = ();
    async fn handle(
        &mut self,
        msg: RunJob,
        _ctx: &mut kameo::prelude::Context<Self, Self::Reply>,
    ) -> Self::Reply {
        let job_name = msg.job.name().to_string();
        self.publish(msg.job_id, JobStatus::Active).await;
        tracing::info!(
            target: "dispatch::worker",
            job = job_name.as_str(),
            job_id = msg.job_id,
            worker_id = self.id,
            "Executing task"
        );

        let started = Instant::now();
        let result = msg.job.run().await;
        let execution_time = started.elapsed();

        let outcome = match result {
            Ok(value) => {
                tracing::info!(
                    target: "dispatch::worker",
                    job = job_name.as_str(),
                    job_id = msg.job_id,
                    execution_time_ms = execution_time.as_millis() as u64,
                    "Task succeeded"
                );
                self.publish(msg.job_id, JobStatus::Finished).await;
                JobOutcome::success(value, execution_time)
            }
            Err(error) => {
                tracing::error!(
                    target: "dispatch::worker",
                    job = job_name.as_str(),
                    job_id = msg.job_id,
                    error = error.as_str(),
                    "Task failed"
                );
                self.publish(msg.job_id, JobStatus::Failed(error.clone()))
                    .await;
                JobOutcome::failure(error, execution_time)
            }
        };

        // Raw duplicate of the completion line. The namespace policy
        // silences this subtree; the structured records above replace it.
        tracing::info!(
            target: "dispatch::raw",
            job = job_name.as_str(),
            job_id = msg.job_id,
            "task completed"
        );

        // The caller may have stopped waiting; a closed reply channel is
        // not an error.
        let _ = msg.reply.send(outcome);
    }
}

impl WorkerActor {
    async fn publish(&self, job_id: u64, status: JobStatus) {
        let update = StatusUpdate { job_id, status };
        if let Err(e) = self.monitor_chan.tell(Publish(update)).await {
            tracing::warn!(
                target: "dispatch::worker",
                worker_id = self.id,
                error = e.to_string().as_str(),
                "Status update not delivered"
            );
        }
    }
}
