//! The ordered enrichment chain applied to every record before rendering.
//!
//! Each stage is a pure transform over an [`EventRecord`]; stages perform no
//! I/O and are deterministic given the record and ambient process state
//! (process id, task-scoped context fields). The chain is built once at
//! initialization and shared read-only by both ingestion paths.

use std::backtrace::Backtrace;

use chrono::{SecondsFormat, Utc};
use once_cell::sync::Lazy;
use serde_json::{json, Value};

use super::context;
use super::record::{EventRecord, Level};

/// Non-success outcome of a chain stage.
#[derive(Debug)]
pub enum ChainSignal {
    /// Discard the record silently.
    Drop,
    /// The stage failed; the record is dropped and a fallback diagnostic is
    /// written directly to the sink.
    Failed(String),
}

/// Error produced by [`ProcessorChain::run`], naming the aborting stage.
#[derive(Debug)]
pub struct ChainError {
    pub stage: &'static str,
    pub signal: ChainSignal,
}

/// One enrichment step. `logger` and `level` describe the originating call;
/// the record is consumed and returned enriched.
pub trait Processor: Send + Sync {
    fn name(&self) -> &'static str;

    fn process(
        &self,
        logger: &str,
        level: Level,
        record: EventRecord,
    ) -> Result<EventRecord, ChainSignal>;
}

/// Ordered sequence of processors. Order is semantically significant: the
/// stage list assembled at initialization merges ambient context before
/// per-call fields, stamps metadata, and formats exceptions last.
pub struct ProcessorChain {
    stages: Vec<Box<dyn Processor>>,
}

impl ProcessorChain {
    pub fn new(stages: Vec<Box<dyn Processor>>) -> Self {
        ProcessorChain { stages }
    }

    /// Run the record through every stage in order. Aborts on the first
    /// stage that signals, reporting which stage did.
    pub fn run(&self, record: EventRecord) -> Result<EventRecord, ChainError> {
        let logger = record.logger.clone();
        let level = record.level;
        let mut current = record;
        for stage in &self.stages {
            match stage.process(&logger, level, current) {
                Ok(next) => current = next,
                Err(signal) => {
                    return Err(ChainError {
                        stage: stage.name(),
                        signal,
                    })
                }
            }
        }
        Ok(current)
    }
}

/// Merge ambient task-scoped context fields into the record. Runs first so
/// explicit per-call fields override ambient ones.
pub struct MergeContextFields;

impl Processor for MergeContextFields {
    fn name(&self) -> &'static str {
        "merge_context_fields"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        let ambient = context::current();
        if !ambient.is_empty() {
            let mut merged = ambient;
            merged.extend(std::mem::take(&mut record.fields));
            record.fields = merged;
        }
        Ok(record)
    }
}

/// Attach the originating logger name.
pub struct AddLoggerName;

impl Processor for AddLoggerName {
    fn name(&self) -> &'static str {
        "add_logger_name"
    }

    fn process(
        &self,
        logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        record.insert("logger", Value::String(logger.to_string()));
        Ok(record)
    }
}

static PROCESS_ID: Lazy<u32> = Lazy::new(std::process::id);

/// Attach the OS process id, computed once per process.
pub struct AddProcessId;

impl Processor for AddProcessId {
    fn name(&self) -> &'static str {
        "add_process_id"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        record.insert("process_id", json!(*PROCESS_ID));
        Ok(record)
    }
}

/// Attach the normalized severity level token.
pub struct AddLogLevel;

impl Processor for AddLogLevel {
    fn name(&self) -> &'static str {
        "add_log_level"
    }

    fn process(
        &self,
        _logger: &str,
        level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        record.insert("level", Value::String(level.as_str().to_string()));
        Ok(record)
    }
}

/// Fold a `positional_args` array into `{}` placeholders of the event
/// message. Legacy callers pass the message template and arguments
/// separately.
pub struct FormatPositionalArgs;

impl Processor for FormatPositionalArgs {
    fn name(&self) -> &'static str {
        "format_positional_args"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        if let Some(Value::Array(args)) = record.fields.shift_remove("positional_args") {
            let mut event = record.event().to_string();
            for arg in args {
                let rendered = match arg {
                    Value::String(s) => s,
                    other => other.to_string(),
                };
                event = event.replacen("{}", &rendered, 1);
            }
            record.insert("event", Value::String(event));
        }
        Ok(record)
    }
}

/// Hoist the entries of an `extra` object into top-level fields without
/// overriding fields already present.
pub struct MergeExtraFields;

impl Processor for MergeExtraFields {
    fn name(&self) -> &'static str {
        "merge_extra_fields"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        if let Some(Value::Object(extra)) = record.fields.shift_remove("extra") {
            for (key, value) in extra {
                record.fields.entry(key).or_insert(value);
            }
        }
        Ok(record)
    }
}

/// Remove the pre-colorized duplicate of the message that some producers
/// attach for their own console output. It must never reach the structured
/// stream.
pub struct DropColorMessage;

impl Processor for DropColorMessage {
    fn name(&self) -> &'static str {
        "drop_color_message"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        record.fields.shift_remove("color_message");
        Ok(record)
    }
}

/// Attach the ISO-8601 UTC timestamp of the render instant.
pub struct TimeStamper;

impl Processor for TimeStamper {
    fn name(&self) -> &'static str {
        "timestamper"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        let now = Utc::now().to_rfc3339_opts(SecondsFormat::Micros, true);
        record.insert("timestamp", Value::String(now));
        Ok(record)
    }
}

/// Attach backtrace text when the caller asked for it.
pub struct StackInfoRenderer;

impl Processor for StackInfoRenderer {
    fn name(&self) -> &'static str {
        "stack_info_renderer"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        if record.include_stack && !record.fields.contains_key("stack") {
            let trace = Backtrace::force_capture().to_string();
            record.insert("stack", Value::String(trace));
        }
        Ok(record)
    }
}

/// Normalize raw byte attachments to well-formed text, lossily replacing
/// invalid sequences.
pub struct DecodeBytes;

impl Processor for DecodeBytes {
    fn name(&self) -> &'static str {
        "decode_bytes"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        for (key, bytes) in std::mem::take(&mut record.bytes) {
            let text = String::from_utf8_lossy(&bytes).into_owned();
            record.fields.insert(key, Value::String(text));
        }
        Ok(record)
    }
}

/// Attach call-site metadata: source file name, enclosing module path and
/// line number.
pub struct CallsiteParams;

impl Processor for CallsiteParams {
    fn name(&self) -> &'static str {
        "callsite_params"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        if let Some(file) = record.callsite.file {
            let base = file.rsplit(['/', '\\']).next().unwrap_or(file);
            record.insert("filename", Value::String(base.to_string()));
        }
        if let Some(module) = record.callsite.module {
            record.insert("func_name", Value::String(module.to_string()));
        }
        if let Some(line) = record.callsite.line {
            record.insert("lineno", json!(line));
        }
        Ok(record)
    }
}

/// Pre-format attached exception info into its final text representation.
/// Only part of the structured chain; the human renderer pretty-prints the
/// raw exception itself.
pub struct FormatExcInfo;

impl Processor for FormatExcInfo {
    fn name(&self) -> &'static str {
        "format_exc_info"
    }

    fn process(
        &self,
        _logger: &str,
        _level: Level,
        mut record: EventRecord,
    ) -> Result<EventRecord, ChainSignal> {
        if let Some(exc) = record.exception.take() {
            let text = format!("{}: {}\n{}", exc.kind, exc.message, exc.trace);
            record.insert("exception", Value::String(text));
        }
        Ok(record)
    }
}
