//! # motionkit - start/stop wrapper around a motion-sensor manager
//!
//! A thin consumer-side layer over a platform sensor manager. Provides:
//! - Start/stop pairs for the accelerometer, gyroscope, device motion and magnetometer
//! - Readings with their Euclidean norm, delivered on a per-sensor thread
//! - Delivery to a per-call callback, a registered observer, or a channel
//! - A simulated manager for tests and demos
//! - C FFI for integration with C/C++ consumers
//!
//! ## Quick Start
//! ```no_run
//! use motionkit::{MotionSession, SensorSet, SimulatedManager};
//! use std::sync::Arc;
//! use std::time::Duration;
//!
//! let session = MotionSession::new(Arc::new(SimulatedManager::new(SensorSet::all())));
//! session.start_accelerometer_updates(
//!     Some(Duration::from_millis(100)),
//!     Some(Box::new(|x, y, z| println!("accel: {x:+.3} {y:+.3} {z:+.3}"))),
//! );
//! std::thread::sleep(Duration::from_secs(1));
//! session.stop_accelerometer_updates();
//! ```

pub mod error;
pub mod types;
pub mod config;
pub mod manager;
mod queue;
pub mod observer;
pub mod session;
pub mod sim;
pub mod ffi;

pub use error::{MotionError, PlatformError};
pub use types::*;
pub use config::SessionConfig;
pub use manager::{SampleSink, SensorManager};
pub use observer::{HandlerSlots, MotionObserver};
pub use session::{MotionSession, ReadingCallback, ReadingStream};
pub use sim::{SimulatedManager, SimulatedSample};

/// Result type alias for motionkit operations.
pub type Result<T> = std::result::Result<T, MotionError>;
