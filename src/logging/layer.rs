//! Foreign ingestion path: a `tracing` layer feeding the shared pipeline.
//!
//! Third-party and legacy code logs through the `tracing` macros with only
//! a message, a level and loose fields. This layer wraps each event into an
//! [`EventRecord`] and hands it to the same processor chain and renderer as
//! the native structured path, so both paths produce identical output for
//! identical input.

use std::fmt;
use std::sync::Arc;

use serde_json::{json, Value};
use tracing::{
    field::{Field, Visit},
    Event, Subscriber,
};
use tracing_subscriber::{layer::Context, Layer};

use super::record::{CallSite, EventRecord, Fields, Level};
use super::LoggingSystem;

/// Routes every `tracing` event into the shared logging pipeline.
pub struct PipelineLayer {
    system: Arc<LoggingSystem>,
}

impl PipelineLayer {
    pub fn new(system: Arc<LoggingSystem>) -> Self {
        PipelineLayer { system }
    }
}

/// Visitor that extracts the message and typed fields from an event.
struct EventVisitor {
    message: String,
    fields: Fields,
}

impl EventVisitor {
    fn new() -> Self {
        EventVisitor {
            message: String::new(),
            fields: Fields::new(),
        }
    }
}

impl Visit for EventVisitor {
    fn record_debug(&mut self, field: &Field, value: &dyn fmt::Debug) {
        if field.name() == "message" {
            self.message = format!("{:?}", value);
        } else {
            self.fields
                .insert(field.name().to_string(), json!(format!("{:?}", value)));
        }
    }

    fn record_str(&mut self, field: &Field, value: &str) {
        if field.name() == "message" {
            self.message = value.to_string();
        } else {
            self.fields
                .insert(field.name().to_string(), Value::String(value.to_string()));
        }
    }

    fn record_i64(&mut self, field: &Field, value: i64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_u64(&mut self, field: &Field, value: u64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_f64(&mut self, field: &Field, value: f64) {
        self.fields.insert(field.name().to_string(), json!(value));
    }

    fn record_bool(&mut self, field: &Field, value: bool) {
        self.fields.insert(field.name().to_string(), json!(value));
    }
}

impl<S> Layer<S> for PipelineLayer
where
    S: Subscriber,
{
    fn on_event(&self, event: &Event<'_>, _ctx: Context<'_, S>) {
        let metadata = event.metadata();
        let level = Level::from_tracing(metadata.level());

        let mut visitor = EventVisitor::new();
        event.record(&mut visitor);

        let callsite = CallSite {
            file: metadata.file(),
            module: metadata.module_path(),
            line: metadata.line(),
        };
        let record = EventRecord::new(metadata.target(), level, &visitor.message, callsite)
            .with_fields(visitor.fields);
        self.system.dispatch(record);
    }
}
