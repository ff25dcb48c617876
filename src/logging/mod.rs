//! Process-wide structured logging pipeline.
//!
//! Heterogeneous log calls converge here into one canonical stream:
//!
//! ```text
//! ┌──────────────────────────┐   ┌──────────────────────────────┐
//! │ native path              │   │ foreign path                 │
//! │ Logger + event!/info!    │   │ tracing macros → PipelineLayer│
//! └────────────┬─────────────┘   └──────────────┬───────────────┘
//!              │        EventRecord             │
//!              └────────────┬───────────────────┘
//!                           ▼
//!                 NamespacePolicy gate
//!                           ▼
//!                   ProcessorChain (ordered enrichment)
//!                           ▼
//!                 Renderer (structured | human)
//!                           ▼
//!                  LogSink (atomic line writes)
//! ```
//!
//! # Usage
//!
//! ## Initialization (once, at startup, before anything logs)
//!
//! ```ignore
//! let settings = Settings::init_from_env()?;
//! let system = relog::logging::setup_logging(&settings);
//! ```
//!
//! Repeated calls are idempotent: they return the existing system and never
//! attach a second sink or hook.
//!
//! ## Emitting records
//!
//! ```ignore
//! let logger = Logger::new("app::main");
//! relog::info!(logger, "Adding one to the value", value = 1);
//! ```
//!
//! Third-party code keeps using `tracing::info!` and friends; those events
//! enter the same pipeline through [`layer::PipelineLayer`].

pub mod context;
pub mod layer;
pub mod logger;
pub mod panic_hook;
pub mod policy;
pub mod processors;
pub mod record;
pub mod render;
pub mod sink;

pub use self::layer::PipelineLayer;
pub use self::logger::Logger;
pub use self::panic_hook::UserInterrupt;
pub use self::policy::{default_rules, NamespacePolicy, NamespaceRule, SubsystemSinks};
pub use self::record::{EventRecord, Fields, Level};
pub use self::render::RenderMode;

use std::io::Write;
use std::sync::Arc;

use once_cell::sync::OnceCell;
use serde_json::json;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

use self::processors::{
    AddLogLevel, AddLoggerName, AddProcessId, CallsiteParams, ChainSignal, DecodeBytes,
    DropColorMessage, FormatExcInfo, FormatPositionalArgs, MergeContextFields, MergeExtraFields,
    Processor, ProcessorChain, StackInfoRenderer, TimeStamper,
};
use self::render::Renderer;
use self::sink::LogSink;
use crate::settings::Settings;

/// Everything the logging system is configured with, resolved once.
pub struct LoggingConfig {
    pub min_level: Level,
    pub mode: RenderMode,
    pub color: bool,
    pub rules: Vec<NamespaceRule>,
}

impl LoggingConfig {
    pub fn from_settings(settings: &Settings) -> Self {
        LoggingConfig {
            min_level: settings.log_level,
            mode: if settings.log_json_format {
                RenderMode::Structured
            } else {
                RenderMode::Human
            },
            color: settings.log_color,
            rules: default_rules(),
        }
    }
}

/// The singleton holding the constructed chain, renderer, sink, policy
/// table and subsystem channel registry. Shared read-only by every call
/// path.
pub struct LoggingSystem {
    min_level: Level,
    mode: RenderMode,
    chain: ProcessorChain,
    renderer: Renderer,
    sink: LogSink,
    policy: NamespacePolicy,
    subsystems: SubsystemSinks,
}

impl LoggingSystem {
    /// Build a system writing to stderr.
    pub fn new(config: LoggingConfig) -> Self {
        Self::with_writer(config, Box::new(std::io::stderr()))
    }

    /// Build a system with a custom sink writer. Useful for capturing
    /// output in tests.
    pub fn with_writer(config: LoggingConfig, writer: Box<dyn Write + Send>) -> Self {
        let policy = NamespacePolicy::new(config.rules);
        let subsystems = SubsystemSinks::new();
        // Namespace rules are applied exactly once, here.
        policy.apply(&subsystems);

        LoggingSystem {
            min_level: config.min_level,
            mode: config.mode,
            chain: build_chain(config.mode),
            renderer: Renderer::new(config.mode, config.color),
            sink: LogSink::from_writer(writer),
            policy,
            subsystems,
        }
    }

    pub fn min_level(&self) -> Level {
        self.min_level
    }

    pub fn mode(&self) -> RenderMode {
        self.mode
    }

    pub fn sink_poisoned(&self) -> bool {
        self.sink.poisoned()
    }

    pub fn subsystems(&self) -> &SubsystemSinks {
        &self.subsystems
    }

    /// A native-path logger pinned to this system.
    pub fn logger(self: &Arc<Self>, name: &str) -> Logger {
        Logger::with_system(name, self.clone())
    }

    /// The shared tail of both ingestion paths: filter, enrich, render,
    /// write.
    pub fn dispatch(&self, record: EventRecord) {
        if record.level < self.min_level {
            return;
        }
        if !self.policy.allows(&record.logger) {
            return;
        }

        let logger = record.logger.clone();
        match self.chain.run(record) {
            Ok(enriched) => {
                let line = self.renderer.render_line(&enriched);
                self.subsystems.publish(&logger, &line);
                if let Err(e) = self.sink.write_line(&line) {
                    // Never retried, never re-entered; the failure surfaces
                    // through the same termination path as any other
                    // unhandled error.
                    panic!("log sink write failed: {}", e);
                }
            }
            Err(err) => match err.signal {
                ChainSignal::Drop => {}
                ChainSignal::Failed(message) => {
                    // The record is lost, but the pipeline failure itself is
                    // not silent: one fallback diagnostic goes straight to
                    // the sink, bypassing the chain.
                    let fallback = json!({
                        "event": "log processor failure",
                        "level": Level::Error.as_str(),
                        "logger": logger,
                        "stage": err.stage,
                        "error": message,
                    });
                    let _ = self.sink.write_line(&fallback.to_string());
                }
            },
        }
    }
}

/// Assemble the shared processor chain. The order is load-bearing; see the
/// stage docs in [`processors`].
fn build_chain(mode: RenderMode) -> ProcessorChain {
    let mut stages: Vec<Box<dyn Processor>> = vec![
        Box::new(MergeContextFields),
        Box::new(AddLoggerName),
        Box::new(AddProcessId),
        Box::new(AddLogLevel),
        Box::new(FormatPositionalArgs),
        Box::new(MergeExtraFields),
        Box::new(DropColorMessage),
        Box::new(TimeStamper),
        Box::new(StackInfoRenderer),
        Box::new(DecodeBytes),
        Box::new(CallsiteParams),
    ];
    if mode == RenderMode::Structured {
        // Exceptions are pre-formatted only for structured output; the
        // human renderer pretty-prints the raw exception itself.
        stages.push(Box::new(FormatExcInfo));
    }
    ProcessorChain::new(stages)
}

static SYSTEM: OnceCell<Arc<LoggingSystem>> = OnceCell::new();

/// Construct and install the process-wide logging system.
///
/// Wires the shared pipeline behind both ingestion paths, applies the
/// namespace policy, and installs the panic capture hook. Idempotent:
/// repeated calls return the already-installed system without attaching
/// duplicate sinks or hooks. Must run before any other component logs.
pub fn setup_logging(settings: &Settings) -> Arc<LoggingSystem> {
    SYSTEM
        .get_or_init(|| {
            let system = Arc::new(LoggingSystem::new(LoggingConfig::from_settings(settings)));
            install(system.clone());
            system
        })
        .clone()
}

/// Install an already-constructed system as the process-wide one. Returns
/// false if a system was installed earlier; the earlier instance stays
/// active.
pub fn init_with_system(system: Arc<LoggingSystem>) -> bool {
    if SYSTEM.set(system.clone()).is_err() {
        return false;
    }
    install(system);
    true
}

fn install(system: Arc<LoggingSystem>) {
    // try_init tolerates an already-installed subscriber, keeping
    // re-initialization harmless.
    let _ = tracing_subscriber::registry()
        .with(PipelineLayer::new(system.clone()))
        .try_init();
    panic_hook::install(system);
}

/// The process-wide system, if initialized.
pub fn global() -> Option<Arc<LoggingSystem>> {
    SYSTEM.get().cloned()
}

#[cfg(test)]
mod tests {
    use std::io;
    use std::sync::{Arc, Mutex};

    use serde_json::Value;

    use super::record::CallSite;
    use super::*;

    #[derive(Clone, Default)]
    struct SharedBuf(Arc<Mutex<Vec<u8>>>);

    impl io::Write for SharedBuf {
        fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
            self.0.lock().unwrap().extend_from_slice(buf);
            Ok(buf.len())
        }
        fn flush(&mut self) -> io::Result<()> {
            Ok(())
        }
    }

    impl SharedBuf {
        fn contents(&self) -> String {
            String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
        }
    }

    fn structured_config() -> LoggingConfig {
        LoggingConfig {
            min_level: Level::Info,
            mode: RenderMode::Structured,
            color: false,
            rules: Vec::new(),
        }
    }

    #[test]
    fn records_below_min_level_never_reach_the_sink() {
        let buf = SharedBuf::default();
        let system = LoggingSystem::with_writer(structured_config(), Box::new(buf.clone()));
        system.dispatch(EventRecord::new(
            "app",
            Level::Debug,
            "hidden",
            CallSite::default(),
        ));
        system.dispatch(EventRecord::new(
            "app",
            Level::Info,
            "visible",
            CallSite::default(),
        ));
        let output = buf.contents();
        assert!(!output.contains("hidden"));
        assert!(output.contains("visible"));
    }

    #[test]
    fn processor_failure_emits_one_fallback_diagnostic() {
        struct Exploding;
        impl Processor for Exploding {
            fn name(&self) -> &'static str {
                "exploding"
            }
            fn process(
                &self,
                _: &str,
                _: Level,
                _: EventRecord,
            ) -> Result<EventRecord, ChainSignal> {
                Err(ChainSignal::Failed("broken stage".to_string()))
            }
        }

        let buf = SharedBuf::default();
        let mut system = LoggingSystem::with_writer(structured_config(), Box::new(buf.clone()));
        system.chain = ProcessorChain::new(vec![Box::new(Exploding)]);

        system.dispatch(EventRecord::new(
            "app",
            Level::Info,
            "doomed",
            CallSite::default(),
        ));

        let output = buf.contents();
        assert_eq!(output.lines().count(), 1);
        let parsed: Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
        assert_eq!(parsed["event"], "log processor failure");
        assert_eq!(parsed["stage"], "exploding");
        assert_eq!(parsed["error"], "broken stage");
        assert!(!output.contains("doomed"));
    }

    #[test]
    fn drop_signal_discards_silently() {
        struct Dropper;
        impl Processor for Dropper {
            fn name(&self) -> &'static str {
                "dropper"
            }
            fn process(
                &self,
                _: &str,
                _: Level,
                _: EventRecord,
            ) -> Result<EventRecord, ChainSignal> {
                Err(ChainSignal::Drop)
            }
        }

        let buf = SharedBuf::default();
        let mut system = LoggingSystem::with_writer(structured_config(), Box::new(buf.clone()));
        system.chain = ProcessorChain::new(vec![Box::new(Dropper)]);

        system.dispatch(EventRecord::new(
            "app",
            Level::Info,
            "gone",
            CallSite::default(),
        ));
        assert!(buf.contents().is_empty());
    }
}
