//! Unit tests for engine.rs
//!
//! Tests logger replacement and the logging macros routing.

use crate::engine::Engine;
use crate::log::{Logger, LogEntry, LogSeverity};
use serial_test::serial;
use std::sync::{Arc, Mutex};

struct CaptureLogger {
    entries: Arc<Mutex<Vec<LogEntry>>>,
}

impl Logger for CaptureLogger {
    fn log(&self, entry: &LogEntry) {
        // Other test threads may log concurrently
        if entry.source == "umbra::engine_tests" {
            self.entries.lock().unwrap().push(entry.clone());
        }
    }
}

fn install_capture() -> Arc<Mutex<Vec<LogEntry>>> {
    let entries = Arc::new(Mutex::new(Vec::new()));
    Engine::set_logger(CaptureLogger { entries: Arc::clone(&entries) });
    entries
}

// ============================================================================
// Tests: Logger routing
// ============================================================================

#[test]
#[serial]
fn test_log_reaches_custom_logger() {
    let entries = install_capture();
    Engine::log(LogSeverity::Info, "umbra::engine_tests", "hello".to_string());
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries.len(), 1);
    assert_eq!(entries[0].severity, LogSeverity::Info);
    assert_eq!(entries[0].source, "umbra::engine_tests");
    assert_eq!(entries[0].message, "hello");
    assert!(entries[0].file.is_none());
}

#[test]
#[serial]
fn test_log_detailed_carries_location() {
    let entries = install_capture();
    Engine::log_detailed(LogSeverity::Error, "umbra::engine_tests", "boom".to_string(), "x.rs", 9);
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    assert_eq!(entries[0].file, Some("x.rs"));
    assert_eq!(entries[0].line, Some(9));
}

#[test]
#[serial]
fn test_macros_route_with_severity() {
    let entries = install_capture();
    crate::engine_debug!("umbra::engine_tests", "d {}", 1);
    crate::engine_warn!("umbra::engine_tests", "w {}", 2);
    crate::engine_error!("umbra::engine_tests", "e {}", 3);
    let _ = crate::engine_err!("umbra::engine_tests", "err {}", 4);
    Engine::reset_logger();

    let entries = entries.lock().unwrap();
    let severities: Vec<LogSeverity> = entries.iter().map(|e| e.severity).collect();
    assert_eq!(
        severities,
        vec![LogSeverity::Debug, LogSeverity::Warn, LogSeverity::Error, LogSeverity::Error]
    );
    assert_eq!(entries[3].message, "err 4");
    assert!(entries[2].line.is_some());
}

#[test]
#[serial]
fn test_reset_logger_detaches_custom_logger() {
    let entries = install_capture();
    Engine::reset_logger();
    Engine::log(LogSeverity::Trace, "umbra::engine_tests", "after reset".to_string());
    assert!(entries.lock().unwrap().is_empty());
}
