//! Shared helpers for integration tests.

use std::io::{self, Write};
use std::sync::{Arc, Mutex};

use relog::logging::{LoggingConfig, LoggingSystem};

/// A cloneable in-memory sink writer for capturing pipeline output.
#[derive(Clone, Default)]
pub struct SharedWriter(Arc<Mutex<Vec<u8>>>);

impl Write for SharedWriter {
    fn write(&mut self, buf: &[u8]) -> io::Result<usize> {
        self.0.lock().unwrap().extend_from_slice(buf);
        Ok(buf.len())
    }

    fn flush(&mut self) -> io::Result<()> {
        Ok(())
    }
}

impl SharedWriter {
    pub fn contents(&self) -> String {
        String::from_utf8(self.0.lock().unwrap().clone()).unwrap()
    }
}

/// Build a system that renders into a capturable buffer.
pub fn capture_system(config: LoggingConfig) -> (Arc<LoggingSystem>, SharedWriter) {
    let writer = SharedWriter::default();
    let system = Arc::new(LoggingSystem::with_writer(config, Box::new(writer.clone())));
    (system, writer)
}
