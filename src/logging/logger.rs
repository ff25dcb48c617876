//! Native ingestion path: the structured logging API.
//!
//! A [`Logger`] is a cheap named handle, optionally carrying bound fields
//! that are merged into every record it emits. The level macros
//! ([`crate::info!`] and friends) are the primary call surface; they
//! capture the call site and hand a fully formed [`EventRecord`] to the
//! shared pipeline.

use std::sync::Arc;

use super::record::{CallSite, EventRecord, ExceptionInfo, Fields, Level};
use super::LoggingSystem;

/// Handle for emitting structured records under a logger name.
#[derive(Clone)]
pub struct Logger {
    name: String,
    bound: Fields,
    system: Option<Arc<LoggingSystem>>,
}

impl Logger {
    /// A logger resolving the process-wide logging system at emit time.
    /// Records are dropped if logging has not been initialized.
    pub fn new(name: &str) -> Self {
        Logger {
            name: name.to_string(),
            bound: Fields::new(),
            system: None,
        }
    }

    /// A logger pinned to a specific system instead of the process-wide
    /// one.
    pub fn with_system(name: &str, system: Arc<LoggingSystem>) -> Self {
        Logger {
            name: name.to_string(),
            bound: Fields::new(),
            system: Some(system),
        }
    }

    /// Return a logger with `fields` merged into every emitted record.
    /// Per-call fields override bound ones.
    pub fn bind(mut self, fields: Fields) -> Self {
        self.bound.extend(fields);
        self
    }

    pub fn name(&self) -> &str {
        &self.name
    }

    fn target(&self) -> Option<Arc<LoggingSystem>> {
        self.system.clone().or_else(super::global)
    }

    /// Emit one record. This is the shared tail both the macros and the
    /// exception hook terminate in.
    pub fn log_at(&self, level: Level, event: &str, fields: Fields, callsite: CallSite) {
        self.log_record(level, event, fields, callsite, None, false);
    }

    /// Emit one record carrying exception details and, when requested, a
    /// backtrace.
    pub fn log_record(
        &self,
        level: Level,
        event: &str,
        fields: Fields,
        callsite: CallSite,
        exception: Option<ExceptionInfo>,
        include_stack: bool,
    ) {
        let Some(system) = self.target() else {
            return;
        };
        let mut record = EventRecord::new(&self.name, level, event, callsite);
        record.fields.extend(self.bound.clone());
        record.fields.extend(fields);
        record.exception = exception;
        record.include_stack = include_stack;
        system.dispatch(record);
    }
}

/// Emit a structured record at an explicit level.
///
/// ```ignore
/// let logger = Logger::new("app::main");
/// relog::event!(logger, Level::Info, "Adding one to the value", value = 1);
/// ```
#[macro_export]
macro_rules! event {
    ($logger:expr, $level:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {{
        #[allow(unused_mut)]
        let mut fields = $crate::logging::record::Fields::new();
        $(
            fields.insert(stringify!($key).to_string(), $crate::serde_json::json!($value));
        )*
        $logger.log_at(
            $level,
            $event,
            fields,
            $crate::logging::record::CallSite {
                file: Some(file!()),
                module: Some(module_path!()),
                line: Some(line!()),
            },
        );
    }};
}

#[macro_export]
macro_rules! debug {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::event!($logger, $crate::logging::record::Level::Debug, $event $(, $key = $value)*)
    };
}

#[macro_export]
macro_rules! info {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::event!($logger, $crate::logging::record::Level::Info, $event $(, $key = $value)*)
    };
}

#[macro_export]
macro_rules! warning {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::event!($logger, $crate::logging::record::Level::Warning, $event $(, $key = $value)*)
    };
}

#[macro_export]
macro_rules! error {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::event!($logger, $crate::logging::record::Level::Error, $event $(, $key = $value)*)
    };
}

#[macro_export]
macro_rules! critical {
    ($logger:expr, $event:expr $(, $key:ident = $value:expr)* $(,)?) => {
        $crate::event!($logger, $crate::logging::record::Level::Critical, $event $(, $key = $value)*)
    };
}

/// Build a [`Fields`] map inline.
///
/// ```ignore
/// let logger = Logger::new("app").bind(relog::fields! { "environment" => "dev" });
/// ```
#[macro_export]
macro_rules! fields {
    ($($key:expr => $value:expr),* $(,)?) => {{
        #[allow(unused_mut)]
        let mut fields = $crate::logging::record::Fields::new();
        $(
            fields.insert(($key).to_string(), $crate::serde_json::json!($value));
        )*
        fields
    }};
}
