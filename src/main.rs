use std::time::Duration;

use envconfig::Envconfig;
use serde_json::Value;

use relog::dispatch::Dispatcher;
use relog::jobs::AddOne;
use relog::logging::{setup_logging, Logger};
use relog::settings::Settings;

#[tokio::main]
async fn main() {
    let settings = match Settings::init_from_env() {
        Ok(settings) => settings,
        Err(e) => {
            eprintln!("failed to load settings: {}", e);
            std::process::exit(1);
        }
    };
    let system = setup_logging(&settings);

    let logger = Logger::new("app::main");
    relog::debug!(
        logger,
        "Settings loaded",
        environment = settings.environment.as_str(),
        workers = settings.workers
    );

    let dispatcher = match Dispatcher::spawn(settings.workers, system.subsystems()).await {
        Ok(dispatcher) => dispatcher,
        Err(e) => {
            relog::critical!(logger, "Dispatcher failed to start", error = e.to_string());
            std::process::exit(1);
        }
    };

    let handle = match dispatcher.schedule(Box::new(AddOne { value: 1 })).await {
        Ok(handle) => handle,
        Err(e) => {
            relog::error!(logger, "Failed to schedule task", error = e.to_string());
            std::process::exit(1);
        }
    };

    match handle.await_result(Duration::from_secs(2)).await {
        Ok(outcome) => {
            relog::info!(
                logger,
                "Task execution finished",
                execution_time_ms = outcome.execution_time.as_millis() as u64,
                succeeded = outcome.succeeded
            );
            if outcome.succeeded {
                relog::info!(
                    logger,
                    "Returned value",
                    value = outcome.value.unwrap_or(Value::Null)
                );
            } else {
                relog::error!(
                    logger,
                    "Error found while executing task",
                    error = outcome.error.unwrap_or_default()
                );
            }
        }
        Err(e) => relog::error!(logger, "Task result unavailable", error = e.to_string()),
    }
}
