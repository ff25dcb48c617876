//! End-to-end test: schedule a job, await its result, and verify that both
//! the job's own structured records and the dispatcher's foreign-path
//! records flow through the shared pipeline under the namespace policy.

mod common;

use std::time::Duration;

use serde_json::Value;

use relog::dispatch::{Dispatcher, JobStatus};
use relog::jobs::AddOne;
use relog::logging::{self, Level, LoggingConfig, RenderMode};

use common::capture_system;

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn scheduled_job_logs_through_the_shared_pipeline() {
    let (system, writer) = capture_system(LoggingConfig {
        min_level: Level::Debug,
        mode: RenderMode::Structured,
        color: false,
        rules: logging::default_rules(),
    });
    // Installs the process-wide system, the tracing layer and the panic
    // hook; the job's native-path logger resolves this instance.
    assert!(logging::init_with_system(system.clone()));

    let dispatcher = Dispatcher::spawn(1, system.subsystems())
        .await
        .expect("dispatcher start");
    let handle = dispatcher
        .schedule(Box::new(AddOne { value: 1 }))
        .await
        .expect("schedule");
    let job_id = handle.job_id();

    let outcome = handle
        .await_result(Duration::from_secs(2))
        .await
        .expect("job result");
    assert!(outcome.succeeded);
    assert_eq!(outcome.value, Some(serde_json::json!(2)));
    assert!(outcome.execution_time < Duration::from_secs(2));

    // Give the status pubsub a moment to drain into the monitor.
    tokio::time::sleep(Duration::from_millis(300)).await;
    assert!(matches!(
        dispatcher.job_status(job_id).await,
        Some(JobStatus::Finished)
    ));

    let output = writer.contents();
    let records: Vec<Value> = output
        .lines()
        .map(|line| serde_json::from_str(line).expect("parseable line"))
        .collect();

    // The job's own record arrived through the native path.
    let task_record = records
        .iter()
        .find(|r| r["event"] == "Adding one to the value")
        .expect("task record");
    assert_eq!(task_record["logger"], "app::tasks");
    assert_eq!(task_record["level"], "info");
    assert_eq!(task_record["value"], 1);
    assert!(task_record["process_id"].as_u64().is_some());

    // The worker's records arrived through the foreign path, redirected
    // into the shared pipeline.
    assert!(records
        .iter()
        .any(|r| r["logger"] == "dispatch::worker" && r["event"] == "Executing task"));
    assert!(records
        .iter()
        .any(|r| r["logger"] == "dispatch::worker" && r["event"] == "Task succeeded"));
    assert!(records
        .iter()
        .any(|r| r["logger"] == "dispatch::broker" && r["event"] == "Job enqueued"));
    assert!(records
        .iter()
        .any(|r| r["logger"] == "dispatch::scheduler" && r["event"] == "Job status changed"));

    // The raw duplicate subtree is silenced by policy.
    assert!(!records.iter().any(|r| r["logger"] == "dispatch::raw"));
    assert!(!output.contains("task completed"));
}
