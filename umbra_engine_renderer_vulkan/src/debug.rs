/// Vulkan Debug Messenger - Routes validation layer messages into the engine logger
///
/// Only compiled with the `vulkan-validation` feature. Messages are counted
/// per severity and identical messages are grouped so a repeated warning
/// shows its occurrence count instead of flooding the log.

use ash::vk;
use colored::*;
use rustc_hash::FxHashMap;
use std::ffi::CStr;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;
use umbra_engine::{engine_debug, engine_error, engine_trace, engine_warn};

/// Whether the callback should forward messages (false during teardown)
static DEBUG_ACTIVE: AtomicBool = AtomicBool::new(false);

/// Global validation statistics (thread-safe atomic counters)
static VALIDATION_STATS: ValidationStatsTracker = ValidationStatsTracker::new();

/// Global message tracker for grouping identical messages
static MESSAGE_TRACKER: Mutex<Option<FxHashMap<String, u32>>> = Mutex::new(None);

/// Validation message counts since the device was created
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct ValidationStats {
    pub errors: u32,
    pub warnings: u32,
    pub info: u32,
    pub verbose: u32,
}

impl ValidationStats {
    pub fn total(&self) -> u32 {
        self.errors + self.warnings + self.info + self.verbose
    }
}

/// Thread-safe validation statistics tracker
struct ValidationStatsTracker {
    errors: AtomicU32,
    warnings: AtomicU32,
    info: AtomicU32,
    verbose: AtomicU32,
}

impl ValidationStatsTracker {
    const fn new() -> Self {
        Self {
            errors: AtomicU32::new(0),
            warnings: AtomicU32::new(0),
            info: AtomicU32::new(0),
            verbose: AtomicU32::new(0),
        }
    }

    fn get_stats(&self) -> ValidationStats {
        ValidationStats {
            errors: self.errors.load(Ordering::Relaxed),
            warnings: self.warnings.load(Ordering::Relaxed),
            info: self.info.load(Ordering::Relaxed),
            verbose: self.verbose.load(Ordering::Relaxed),
        }
    }

    fn reset(&self) {
        self.errors.store(0, Ordering::Relaxed);
        self.warnings.store(0, Ordering::Relaxed);
        self.info.store(0, Ordering::Relaxed);
        self.verbose.store(0, Ordering::Relaxed);
    }
}

/// Start forwarding messages, resetting statistics
pub fn init_debug_config() {
    VALIDATION_STATS.reset();

    if let Ok(mut tracker) = MESSAGE_TRACKER.lock() {
        *tracker = Some(FxHashMap::default());
    }

    DEBUG_ACTIVE.store(true, Ordering::Release);
}

/// Stop forwarding messages (called before the messenger is destroyed)
pub fn cleanup_debug_config() {
    DEBUG_ACTIVE.store(false, Ordering::Release);
}

/// Severity flags the messenger subscribes to
pub fn severity_flags() -> vk::DebugUtilsMessageSeverityFlagsEXT {
    vk::DebugUtilsMessageSeverityFlagsEXT::ERROR
        | vk::DebugUtilsMessageSeverityFlagsEXT::WARNING
        | vk::DebugUtilsMessageSeverityFlagsEXT::INFO
}

/// Get current validation statistics
pub fn get_validation_stats() -> ValidationStats {
    VALIDATION_STATS.get_stats()
}

/// Print validation statistics report
pub fn print_validation_stats_report() {
    let stats = get_validation_stats();

    if stats.total() == 0 {
        println!("\n{}", "No validation messages".green().bold());
        return;
    }

    println!("\n{}", "=== Validation Statistics Report ===".bright_blue().bold());

    if stats.errors > 0 {
        println!("  {} {}", "Errors:".red().bold(), stats.errors);
    }
    if stats.warnings > 0 {
        println!("  {} {}", "Warnings:".yellow().bold(), stats.warnings);
    }
    if stats.info > 0 {
        println!("  {} {}", "Info:".cyan(), stats.info);
    }
    if stats.verbose > 0 {
        println!("  {} {}", "Verbose:".bright_black(), stats.verbose);
    }

    println!("  {} {}", "Total:".white().bold(), stats.total());

    if let Ok(tracker) = MESSAGE_TRACKER.lock() {
        if let Some(messages) = tracker.as_ref() {
            let duplicate_count = messages.values().filter(|&&count| count > 1).count();
            if duplicate_count > 0 {
                println!("\n  {} message(s) appeared multiple times", duplicate_count);
            }
        }
    }

    println!("{}\n", "====================================".bright_blue().bold());
}

/// Record one occurrence of `message`, returning how often it was seen
fn track_message(message: &str) -> u32 {
    let Ok(mut tracker) = MESSAGE_TRACKER.lock() else {
        return 1;
    };
    let messages = tracker.get_or_insert_with(FxHashMap::default);
    let count = messages.entry(message.to_string()).or_insert(0);
    *count += 1;
    *count
}

/// Vulkan debug messenger callback
///
/// Called by the validation layers; forwards the message to the engine
/// logger under the `umbra::vulkan::validation` source.
pub unsafe extern "system" fn vulkan_debug_callback(
    message_severity: vk::DebugUtilsMessageSeverityFlagsEXT,
    message_type: vk::DebugUtilsMessageTypeFlagsEXT,
    p_callback_data: *const vk::DebugUtilsMessengerCallbackDataEXT,
    _user_data: *mut std::os::raw::c_void,
) -> vk::Bool32 {
    if !DEBUG_ACTIVE.load(Ordering::Acquire) || p_callback_data.is_null() {
        return vk::FALSE;
    }

    let callback_data = *p_callback_data;
    let message_id_name = if callback_data.p_message_id_name.is_null() {
        "Unknown"
    } else {
        CStr::from_ptr(callback_data.p_message_id_name)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };
    let message = if callback_data.p_message.is_null() {
        "No message"
    } else {
        CStr::from_ptr(callback_data.p_message)
            .to_str()
            .unwrap_or("Invalid UTF-8")
    };

    let type_str = if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::VALIDATION) {
        "Validation"
    } else if message_type.contains(vk::DebugUtilsMessageTypeFlagsEXT::PERFORMANCE) {
        "Performance"
    } else {
        "General"
    };

    let occurrence_count = track_message(message);
    let repeat_indicator = if occurrence_count > 1 {
        format!(" [x{}]", occurrence_count)
    } else {
        String::new()
    };

    let source = "umbra::vulkan::validation";
    if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::ERROR) {
        VALIDATION_STATS.errors.fetch_add(1, Ordering::Relaxed);
        engine_error!(source, "[{}]{} {}: {}", type_str, repeat_indicator, message_id_name, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::WARNING) {
        VALIDATION_STATS.warnings.fetch_add(1, Ordering::Relaxed);
        engine_warn!(source, "[{}]{} {}: {}", type_str, repeat_indicator, message_id_name, message);
    } else if message_severity.contains(vk::DebugUtilsMessageSeverityFlagsEXT::INFO) {
        VALIDATION_STATS.info.fetch_add(1, Ordering::Relaxed);
        engine_debug!(source, "[{}]{} {}: {}", type_str, repeat_indicator, message_id_name, message);
    } else {
        VALIDATION_STATS.verbose.fetch_add(1, Ordering::Relaxed);
        engine_trace!(source, "[{}]{} {}: {}", type_str, repeat_indicator, message_id_name, message);
    }

    vk::FALSE // Don't abort Vulkan execution
}
