//! Global capture of uncaught panics as one final critical record.
//!
//! The hook observes the crash; it never suppresses it. Interrupt panics
//! carrying a [`UserInterrupt`] payload are delegated verbatim to whatever
//! hook was installed before ours, preserving intentional shutdown
//! semantics, and are never logged.

use std::any::Any;
use std::backtrace::Backtrace;
use std::panic;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use serde_json::json;

use super::record::{CallSite, ExceptionInfo, Fields, Level};
use super::LoggingSystem;

/// Marker payload for operator-initiated interrupts. Panicking with this
/// payload reaches the previously installed hook untouched.
pub struct UserInterrupt;

static HOOK_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Install the process-wide capture hook, chaining to the hook active at
/// install time for the delegated cases.
pub fn install(system: Arc<LoggingSystem>) {
    let previous = panic::take_hook();
    panic::set_hook(Box::new(move |info| {
        if info.payload().is::<UserInterrupt>() {
            previous(info);
            return;
        }
        // A poisoned sink, or a panic raised while this hook is already
        // running, must not re-enter the pipeline.
        if system.sink_poisoned() || HOOK_ACTIVE.swap(true, Ordering::SeqCst) {
            previous(info);
            return;
        }

        let exception = ExceptionInfo {
            kind: payload_kind(info.payload()),
            message: payload_message(info.payload()),
            trace: Backtrace::force_capture().to_string(),
        };
        let mut fields = Fields::new();
        if let Some(location) = info.location() {
            fields.insert("panic_file".to_string(), json!(location.file()));
            fields.insert("panic_lineno".to_string(), json!(location.line()));
        }
        let logger = system.logger("relog::panic");
        logger.log_record(
            Level::Critical,
            "Uncaught panic",
            fields,
            CallSite {
                file: Some(file!()),
                module: Some(module_path!()),
                line: Some(line!()),
            },
            Some(exception),
            false,
        );

        HOOK_ACTIVE.store(false, Ordering::SeqCst);
    }));
}

fn payload_kind(payload: &dyn Any) -> String {
    if payload.is::<&str>() {
        "&str".to_string()
    } else if payload.is::<String>() {
        "String".to_string()
    } else {
        "Box<dyn Any>".to_string()
    }
}

fn payload_message(payload: &dyn Any) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
