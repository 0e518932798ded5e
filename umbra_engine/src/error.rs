//! Error types for the Umbra renderer
//!
//! This module defines the error types used throughout the engine,
//! including device setup, asset loading and frame submission.

use std::fmt;

/// Result type for Umbra operations
pub type Result<T> = std::result::Result<T, Error>;

/// Umbra renderer errors
#[derive(Debug, Clone, PartialEq)]
pub enum Error {
    /// Backend-specific error (Vulkan call failed, device lost, ...)
    BackendError(String),

    /// Out of GPU memory
    OutOfMemory,

    /// Invalid resource (missing registry entry, bad descriptor, ...)
    InvalidResource(String),

    /// Initialization failed (instance, device, swapchain, subsystems)
    InitializationFailed(String),

    /// Model or texture could not be loaded
    AssetLoad(String),

    /// Operation requires a prepared renderer / loaded scene
    NotReady(String),
}

impl fmt::Display for Error {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Error::BackendError(msg) => write!(f, "Backend error: {}", msg),
            Error::OutOfMemory => write!(f, "Out of GPU memory"),
            Error::InvalidResource(msg) => write!(f, "Invalid resource: {}", msg),
            Error::InitializationFailed(msg) => write!(f, "Initialization failed: {}", msg),
            Error::AssetLoad(msg) => write!(f, "Asset load failed: {}", msg),
            Error::NotReady(msg) => write!(f, "Not ready: {}", msg),
        }
    }
}

impl std::error::Error for Error {}

// ===== ERROR MACROS =====

/// Log an ERROR and build an `Error::BackendError` with the same message
///
/// # Example
///
/// ```no_run
/// # use umbra_engine::engine_err;
/// let err = engine_err!("umbra::vulkan", "Failed to create fence: {}", 42);
/// ```
#[macro_export]
macro_rules! engine_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::umbra::Engine::log_detailed(
            $crate::umbra::log::LogSeverity::Error,
            $source,
            message.clone(),
            file!(),
            line!()
        );
        $crate::umbra::Error::BackendError(message)
    }};
}

/// Log an ERROR and return `Err(Error::BackendError)` from the enclosing function
#[macro_export]
macro_rules! engine_bail {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_err!($source, $($arg)*))
    };
}

/// Log a WARN and build an `Error::BackendError` with the same message
#[macro_export]
macro_rules! engine_warn_err {
    ($source:expr, $($arg:tt)*) => {{
        let message = format!($($arg)*);
        $crate::umbra::Engine::log(
            $crate::umbra::log::LogSeverity::Warn,
            $source,
            message.clone()
        );
        $crate::umbra::Error::BackendError(message)
    }};
}

/// Log a WARN and return `Err(Error::BackendError)` from the enclosing function
///
/// Used for recoverable caller mistakes (bad index, missing entry).
#[macro_export]
macro_rules! engine_bail_warn {
    ($source:expr, $($arg:tt)*) => {
        return Err($crate::engine_warn_err!($source, $($arg)*))
    };
}

#[cfg(test)]
#[path = "error_tests.rs"]
mod tests;
