//! Application job definitions executed by the dispatcher.

use async_trait::async_trait;
use serde_json::{json, Value};

use crate::dispatch::Job;
use crate::logging::Logger;

/// Adds one to the supplied value.
pub struct AddOne {
    pub value: i64,
}

#[async_trait]
impl Job for AddOne {
    fn name(&self) -> &str {
        "add_one"
    }

    async fn run(&self) -> Result<Value, String> {
        let logger = Logger::new("app::tasks");
        crate::info!(logger, "Adding one to the value", value = self.value);
        Ok(json!(self.value + 1))
    }
}
