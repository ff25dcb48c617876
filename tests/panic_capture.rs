//! Integration tests for the global panic capture hook: uncaught panics
//! become exactly one critical record, interrupts are delegated untouched.

mod common;

use std::panic;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::thread;

use serde_json::Value;

use relog::logging::{panic_hook, Level, LoggingConfig, RenderMode, UserInterrupt};

use common::capture_system;

static PREVIOUS_HOOK_CALLS: AtomicUsize = AtomicUsize::new(0);

#[test]
fn interrupts_are_delegated_and_panics_logged_once() {
    let (system, writer) = capture_system(LoggingConfig {
        min_level: Level::Info,
        mode: RenderMode::Structured,
        color: false,
        rules: Vec::new(),
    });

    // Stand-in for whatever hook was active before installation; the test
    // swallows the default stderr printout and counts delegations.
    panic::set_hook(Box::new(|_info| {
        PREVIOUS_HOOK_CALLS.fetch_add(1, Ordering::SeqCst);
    }));
    panic_hook::install(system);

    // The designated interrupt payload reaches the prior hook untouched
    // and is never logged.
    let interrupted = thread::spawn(|| panic::panic_any(UserInterrupt));
    assert!(interrupted.join().is_err());
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 1);
    assert!(writer.contents().is_empty());

    // Any other payload becomes exactly one critical record; the prior
    // hook is not invoked for it.
    let crashed = thread::spawn(|| panic!("boom"));
    assert!(crashed.join().is_err());
    assert_eq!(PREVIOUS_HOOK_CALLS.load(Ordering::SeqCst), 1);

    let output = writer.contents();
    assert_eq!(output.lines().count(), 1);
    let parsed: Value = serde_json::from_str(output.lines().next().unwrap()).unwrap();
    assert_eq!(parsed["event"], "Uncaught panic");
    assert_eq!(parsed["level"], "critical");
    assert_eq!(parsed["logger"], "relog::panic");

    let exception = parsed["exception"].as_str().unwrap();
    assert!(exception.starts_with("&str: boom"));
    // The rendered backtrace text follows the payload line.
    assert!(exception.contains('\n'));
    assert!(parsed["panic_file"]
        .as_str()
        .unwrap()
        .ends_with("panic_capture.rs"));

    // Leave later panics with the default behavior.
    let _ = panic::take_hook();
}
