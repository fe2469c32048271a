use crate::types::SensorKind;
use std::fmt;

/// Error reported by the sensor manager alongside a sample.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
#[error("platform error {code}: {message}")]
pub struct PlatformError {
    pub code: i32,
    pub message: String,
}

impl PlatformError {
    pub fn new(code: i32, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
        }
    }
}

/// Errors surfaced by motionkit.
///
/// The start/stop surface of [`crate::MotionSession`] only logs these;
/// they are returned by the `try_*` and stream APIs.
#[derive(Debug, thiserror::Error)]
pub enum MotionError {
    #[error("The {0} is not available")]
    SensorUnavailable(SensorKind),

    #[error(transparent)]
    Platform(#[from] PlatformError),

    #[error("Invalid update interval: {0} s")]
    InvalidInterval(f64),

    #[error("Failed to spawn update queue: {0}")]
    Spawn(String),

    #[error("Reading stream stopped")]
    StreamStopped,

    #[error("Timeout waiting for reading")]
    Timeout,
}

/// Thread-safe last-error storage for the C FFI layer.
pub(crate) struct LastError {
    message: std::sync::Mutex<String>,
}

impl LastError {
    pub const fn new() -> Self {
        Self {
            message: std::sync::Mutex::new(String::new()),
        }
    }

    pub fn set(&self, err: &MotionError) {
        if let Ok(mut msg) = self.message.lock() {
            *msg = fmt::format(format_args!("{}\0", err));
        }
    }

    pub fn as_ptr(&self) -> *const std::ffi::c_char {
        match self.message.lock() {
            Ok(msg) if !msg.is_empty() => msg.as_ptr() as *const std::ffi::c_char,
            _ => std::ptr::null(),
        }
    }
}
