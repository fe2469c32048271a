//! Contract of the platform motion-sensor manager.
//!
//! The manager owns hardware access, sampling, timestamps and fusion.
//! motionkit only asks it about availability, sets intervals, and hands it a
//! [`SampleSink`] to push samples into.

use crate::error::PlatformError;
use crate::types::{MotionData, SensorKind, SensorSet};
use crate::Result;
use crossbeam_channel::{Sender, TrySendError};
use std::time::Duration;

/// A platform sensor manager.
///
/// Implementations push samples from whatever thread they sample on. They
/// must stop pushing into a sink once `stop_updates` for its kind returns,
/// or once [`SampleSink::deliver`] reports `false`.
pub trait SensorManager: Send + Sync {
    fn is_available(&self, kind: SensorKind) -> bool;

    fn set_update_interval(&self, kind: SensorKind, interval: Duration);

    /// Begin delivering samples for `kind` into `sink`. Starting a kind that
    /// is already running replaces its sink.
    fn start_updates(&self, kind: SensorKind, sink: SampleSink) -> Result<()>;

    /// Halt deliveries for `kind`. Must be a no-op when nothing is running.
    fn stop_updates(&self, kind: SensorKind);

    /// All kinds this manager reports as available.
    fn available_sensors(&self) -> SensorSet {
        SensorKind::ALL
            .into_iter()
            .filter(|&k| self.is_available(k))
            .fold(SensorSet::empty(), |set, k| set | k.as_set())
    }
}

/// One push from the manager: a sample, an error, or both.
#[derive(Debug, Clone)]
pub(crate) struct SampleEvent {
    pub data: Option<MotionData>,
    pub error: Option<PlatformError>,
}

/// Producer handle into one subscription's update queue.
#[derive(Debug, Clone)]
pub struct SampleSink {
    kind: SensorKind,
    sender: Sender<SampleEvent>,
}

impl SampleSink {
    pub(crate) fn new(kind: SensorKind, sender: Sender<SampleEvent>) -> Self {
        Self { kind, sender }
    }

    /// The sensor kind this sink was created for.
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Push a sample without blocking.
    ///
    /// A full queue drops the sample. Returns `false` once the subscription
    /// has been torn down; the producer should stop pushing.
    pub fn deliver(&self, data: Option<MotionData>, error: Option<PlatformError>) -> bool {
        match self.sender.try_send(SampleEvent { data, error }) {
            Ok(()) => true,
            Err(TrySendError::Full(_)) => {
                log::trace!("{} queue full, dropping sample", self.kind);
                true
            }
            Err(TrySendError::Disconnected(_)) => false,
        }
    }

    /// Shorthand for a sample without an error.
    pub fn send(&self, data: MotionData) -> bool {
        self.deliver(Some(data), None)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector3;

    struct Fixed(SensorSet);

    impl SensorManager for Fixed {
        fn is_available(&self, kind: SensorKind) -> bool {
            self.0.contains(kind.as_set())
        }
        fn set_update_interval(&self, _kind: SensorKind, _interval: Duration) {}
        fn start_updates(&self, _kind: SensorKind, _sink: SampleSink) -> Result<()> {
            Ok(())
        }
        fn stop_updates(&self, _kind: SensorKind) {}
    }

    #[test]
    fn test_available_sensors_default() {
        let m = Fixed(SensorSet::ACCELEROMETER | SensorSet::DEVICE_MOTION);
        assert_eq!(
            m.available_sensors(),
            SensorSet::ACCELEROMETER | SensorSet::DEVICE_MOTION
        );
    }

    #[test]
    fn test_sink_full_and_disconnected() {
        let (tx, rx) = crossbeam_channel::bounded(1);
        let sink = SampleSink::new(SensorKind::Gyroscope, tx);
        let data = MotionData::from_axes(SensorKind::Gyroscope, Vector3::new(0.0, 1.0, 0.0));

        assert!(sink.send(data));
        // Full: dropped, but the subscription is still alive.
        assert!(sink.send(data));
        assert_eq!(rx.len(), 1);

        drop(rx);
        assert!(!sink.send(data));
    }
}
