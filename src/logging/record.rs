//! Event records and severity levels carried through the logging pipeline.

use std::fmt;
use std::str::FromStr;

use serde_json::Value;

/// Ordered field map attached to an event. Insertion order is preserved all
/// the way into the structured output.
pub type Fields = serde_json::Map<String, Value>;

/// Severity levels, totally ordered from least to most severe.
///
/// `FATAL` is accepted as an alias of `CRITICAL` when parsing, matching the
/// level names accepted in configuration.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub enum Level {
    Notset,
    Debug,
    Info,
    Warning,
    Error,
    Critical,
}

impl Level {
    /// The lowercase token used in rendered output.
    pub fn as_str(&self) -> &'static str {
        match self {
            Level::Notset => "notset",
            Level::Debug => "debug",
            Level::Info => "info",
            Level::Warning => "warning",
            Level::Error => "error",
            Level::Critical => "critical",
        }
    }

    /// Map a `tracing` level onto the pipeline's level set. TRACE has no
    /// counterpart and lands below DEBUG.
    pub fn from_tracing(level: &tracing::Level) -> Level {
        match *level {
            tracing::Level::TRACE => Level::Notset,
            tracing::Level::DEBUG => Level::Debug,
            tracing::Level::INFO => Level::Info,
            tracing::Level::WARN => Level::Warning,
            tracing::Level::ERROR => Level::Error,
        }
    }
}

impl fmt::Display for Level {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Level {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_uppercase().as_str() {
            "NOTSET" => Ok(Level::Notset),
            "DEBUG" => Ok(Level::Debug),
            "INFO" => Ok(Level::Info),
            "WARNING" | "WARN" => Ok(Level::Warning),
            "ERROR" => Ok(Level::Error),
            "CRITICAL" | "FATAL" => Ok(Level::Critical),
            other => Err(format!("unknown log level: {}", other)),
        }
    }
}

/// Call-site metadata captured where the log call was made. All parts are
/// optional because the foreign path cannot always supply them.
#[derive(Debug, Clone, Copy, Default)]
pub struct CallSite {
    pub file: Option<&'static str>,
    pub module: Option<&'static str>,
    pub line: Option<u32>,
}

/// Details of an exception (panic payload, job failure) attached to a record.
#[derive(Debug, Clone)]
pub struct ExceptionInfo {
    /// Payload type name, e.g. `&str` or `String` for panics.
    pub kind: String,
    pub message: String,
    /// Rendered backtrace text.
    pub trace: String,
}

/// Structured, in-flight representation of one log occurrence.
///
/// Mutable only while passing through the processor chain; treated as
/// immutable once handed to the renderer. The `fields` map always contains
/// an `event` entry holding the message.
#[derive(Debug, Clone)]
pub struct EventRecord {
    pub logger: String,
    pub level: Level,
    pub callsite: CallSite,
    pub fields: Fields,
    /// Raw byte attachments, folded into `fields` as lossy UTF-8 text by
    /// the chain.
    pub bytes: Vec<(String, Vec<u8>)>,
    pub exception: Option<ExceptionInfo>,
    /// The caller asked for a backtrace to be attached.
    pub include_stack: bool,
}

impl EventRecord {
    pub fn new(logger: &str, level: Level, event: &str, callsite: CallSite) -> Self {
        let mut fields = Fields::new();
        fields.insert("event".to_string(), Value::String(event.to_string()));
        EventRecord {
            logger: logger.to_string(),
            level,
            callsite,
            fields,
            bytes: Vec::new(),
            exception: None,
            include_stack: false,
        }
    }

    /// Extend the record with additional fields. Existing keys are
    /// overwritten in place, keeping their position.
    pub fn with_fields(mut self, fields: Fields) -> Self {
        self.fields.extend(fields);
        self
    }

    pub fn with_exception(mut self, exception: ExceptionInfo) -> Self {
        self.exception = Some(exception);
        self
    }

    pub fn with_stack(mut self) -> Self {
        self.include_stack = true;
        self
    }

    pub fn insert(&mut self, key: &str, value: Value) {
        self.fields.insert(key.to_string(), value);
    }

    /// Attach a raw byte sequence under `key`. The chain normalizes it to
    /// well-formed text before rendering.
    pub fn attach_bytes(&mut self, key: &str, bytes: Vec<u8>) {
        self.bytes.push((key.to_string(), bytes));
    }

    pub fn event(&self) -> &str {
        self.fields
            .get("event")
            .and_then(Value::as_str)
            .unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn levels_are_totally_ordered() {
        assert!(Level::Notset < Level::Debug);
        assert!(Level::Debug < Level::Info);
        assert!(Level::Info < Level::Warning);
        assert!(Level::Warning < Level::Error);
        assert!(Level::Error < Level::Critical);
    }

    #[test]
    fn level_parses_fatal_and_critical() {
        assert_eq!("FATAL".parse::<Level>().unwrap(), Level::Critical);
        assert_eq!("critical".parse::<Level>().unwrap(), Level::Critical);
        assert_eq!("info".parse::<Level>().unwrap(), Level::Info);
        assert!("VERBOSE".parse::<Level>().is_err());
    }

    #[test]
    fn record_always_carries_event() {
        let record = EventRecord::new("app", Level::Info, "hello", CallSite::default());
        assert_eq!(record.event(), "hello");
    }
}
