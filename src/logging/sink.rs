//! The shared output sink.
//!
//! The sink is the one shared mutable resource of the pipeline: every
//! rendered record is appended as one complete line in a single write under
//! the lock, so concurrent writers never interleave partial lines.

use std::io::{self, Write};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Mutex;

/// Locked line-oriented writer. A write failure poisons the sink: further
/// output is dropped rather than retried, and the failure is reported to
/// the caller exactly once.
pub struct LogSink {
    writer: Mutex<Box<dyn Write + Send>>,
    failed: AtomicBool,
}

impl LogSink {
    pub fn stderr() -> Self {
        Self::from_writer(Box::new(io::stderr()))
    }

    pub fn from_writer(writer: Box<dyn Write + Send>) -> Self {
        LogSink {
            writer: Mutex::new(writer),
            failed: AtomicBool::new(false),
        }
    }

    /// Append one complete line. The line and its terminator go out in a
    /// single `write_all` under the lock.
    pub fn write_line(&self, line: &str) -> io::Result<()> {
        if self.failed.load(Ordering::Relaxed) {
            return Ok(());
        }
        let mut buf = Vec::with_capacity(line.len() + 1);
        buf.extend_from_slice(line.as_bytes());
        buf.push(b'\n');

        let mut writer = self.writer.lock().unwrap();
        let result = writer.write_all(&buf).and_then(|()| writer.flush());
        if result.is_err() {
            self.failed.store(true, Ordering::Relaxed);
        }
        result
    }

    pub fn poisoned(&self) -> bool {
        self.failed.load(Ordering::Relaxed)
    }
}
