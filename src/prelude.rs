//! Prelude module for convenient imports when working with the pipeline
//! and the dispatcher.
//!
//! ```ignore
//! use relog::prelude::*;
//! ```

// Re-export the attribute macro required on Job impls and the trait
// required in scope to load Settings
pub use async_trait::async_trait;
pub use envconfig::Envconfig;

pub use serde_json::{json, Value};

// Logging
pub use crate::logging::record::{EventRecord, Fields, Level};
pub use crate::logging::{setup_logging, Logger, LoggingConfig, LoggingSystem, RenderMode};

// Dispatch
pub use crate::dispatch::{DispatchError, Dispatcher, Job, JobHandle, JobOutcome};

// Settings
pub use crate::settings::Settings;

// Macros
pub use crate::{critical, debug, error, event, fields, info, warning};
