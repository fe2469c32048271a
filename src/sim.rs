//! Timer-driven stand-in for a platform sensor manager.
//!
//! Each started sensor gets a producer thread that pushes one sample per
//! tick of its update interval until stopped.

use crate::error::PlatformError;
use crate::manager::{SampleSink, SensorManager};
use crate::types::{MotionData, SensorKind, SensorSet, Vector3};
use crate::{MotionError, Result};
use crossbeam_channel::{select, Sender};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError};
use std::thread::JoinHandle;
use std::time::Duration;

/// Shortest tick a producer runs at. Zero intervals are raised to this.
pub const MIN_INTERVAL: Duration = Duration::from_millis(1);

/// One push produced by a sample source.
#[derive(Debug, Clone, PartialEq)]
pub struct SimulatedSample {
    pub data: Option<MotionData>,
    pub error: Option<PlatformError>,
}

impl SimulatedSample {
    pub fn ok(data: MotionData) -> Self {
        Self {
            data: Some(data),
            error: None,
        }
    }

    /// An error push with no sample attached.
    pub fn error(error: PlatformError) -> Self {
        Self {
            data: None,
            error: Some(error),
        }
    }

    pub fn with_error(mut self, error: PlatformError) -> Self {
        self.error = Some(error);
        self
    }
}

type SampleSource = Arc<dyn Fn(u64) -> SimulatedSample + Send + Sync>;

struct Producer {
    stop_tx: Sender<()>,
    thread: JoinHandle<()>,
}

struct Slot {
    interval: Duration,
    producer: Option<Producer>,
}

/// A [`SensorManager`] that synthesizes samples.
///
/// Unless a source is installed, sensors report a device lying flat:
/// gravity along -z for the accelerometer and device motion, zero rotation,
/// and a fixed magnetic field.
pub struct SimulatedManager {
    available: SensorSet,
    sources: [SampleSource; 4],
    slots: Mutex<[Slot; 4]>,
    sent: Arc<[AtomicU64; 4]>,
}

impl SimulatedManager {
    pub fn new(available: SensorSet) -> Self {
        let sources = SensorKind::ALL.map(|kind| constant_source(kind, resting_axes(kind)));
        Self {
            available,
            sources,
            slots: Mutex::new(SensorKind::ALL.map(|_| Slot {
                interval: crate::config::DEFAULT_UPDATE_INTERVAL,
                producer: None,
            })),
            sent: Arc::new([
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
                AtomicU64::new(0),
            ]),
        }
    }

    /// Every push for `kind` carries `v` in its delivered field.
    pub fn with_constant(mut self, kind: SensorKind, v: Vector3) -> Self {
        self.sources[kind.index()] = constant_source(kind, v);
        self
    }

    /// Pushes for `kind` come from `source`, called with a sequence number
    /// starting at 0 for every start.
    pub fn with_source<F>(mut self, kind: SensorKind, source: F) -> Self
    where
        F: Fn(u64) -> SimulatedSample + Send + Sync + 'static,
    {
        self.sources[kind.index()] = Arc::new(source);
        self
    }

    /// Whether a producer is currently pushing for `kind`.
    pub fn is_running(&self, kind: SensorKind) -> bool {
        self.lock_slots()[kind.index()]
            .producer
            .as_ref()
            .is_some_and(|p| !p.thread.is_finished())
    }

    /// The interval last set for `kind`.
    pub fn update_interval(&self, kind: SensorKind) -> Duration {
        self.lock_slots()[kind.index()].interval
    }

    /// Pushes accepted by sinks for `kind` since creation.
    pub fn samples_sent(&self, kind: SensorKind) -> u64 {
        self.sent[kind.index()].load(Ordering::Relaxed)
    }

    fn lock_slots(&self) -> MutexGuard<'_, [Slot; 4]> {
        self.slots.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn halt(producer: Producer, kind: SensorKind) {
        drop(producer.stop_tx);
        if producer.thread.join().is_err() {
            log::warn!("Simulated {} producer panicked", kind);
        }
    }
}

impl SensorManager for SimulatedManager {
    fn is_available(&self, kind: SensorKind) -> bool {
        self.available.contains(kind.as_set())
    }

    fn set_update_interval(&self, kind: SensorKind, interval: Duration) {
        self.lock_slots()[kind.index()].interval = interval;
    }

    fn start_updates(&self, kind: SensorKind, sink: SampleSink) -> Result<()> {
        if !self.is_available(kind) {
            return Err(MotionError::SensorUnavailable(kind));
        }

        let (previous, interval) = {
            let mut slots = self.lock_slots();
            let slot = &mut slots[kind.index()];
            (slot.producer.take(), slot.interval)
        };
        if let Some(previous) = previous {
            Self::halt(previous, kind);
        }

        let (stop_tx, stop_rx) = crossbeam_channel::bounded::<()>(0);
        let source = self.sources[kind.index()].clone();
        let sent = self.sent.clone();
        let period = interval.max(MIN_INTERVAL);

        let thread = std::thread::Builder::new()
            .name(format!("motionkit-sim-{}", kind.name()))
            .spawn(move || {
                let ticker = crossbeam_channel::tick(period);
                let mut seq = 0u64;
                loop {
                    select! {
                        recv(stop_rx) -> _ => break,
                        recv(ticker) -> _ => {
                            let sample = source(seq);
                            seq += 1;
                            if !sink.deliver(sample.data, sample.error) {
                                log::debug!("Simulated {} sink closed", kind);
                                break;
                            }
                            sent[kind.index()].fetch_add(1, Ordering::Relaxed);
                        }
                    }
                }
            })
            .map_err(|e| MotionError::Spawn(format!("simulated {} producer: {}", kind, e)))?;

        log::debug!("Simulated {} producer running every {:?}", kind, period);
        self.lock_slots()[kind.index()].producer = Some(Producer { stop_tx, thread });
        Ok(())
    }

    fn stop_updates(&self, kind: SensorKind) {
        let producer = self.lock_slots()[kind.index()].producer.take();
        if let Some(producer) = producer {
            Self::halt(producer, kind);
        }
    }
}

impl Drop for SimulatedManager {
    fn drop(&mut self) {
        for kind in SensorKind::ALL {
            self.stop_updates(kind);
        }
    }
}

fn resting_axes(kind: SensorKind) -> Vector3 {
    match kind {
        SensorKind::Accelerometer | SensorKind::DeviceMotion => Vector3::new(0.0, 0.0, -1.0),
        SensorKind::Gyroscope => Vector3::default(),
        SensorKind::Magnetometer => Vector3::new(22.0, -5.0, -42.0),
    }
}

fn constant_source(kind: SensorKind, v: Vector3) -> SampleSource {
    let data = MotionData::from_axes(kind, v);
    Arc::new(move |_: u64| SimulatedSample::ok(data))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::manager::SampleEvent;
    use std::time::Instant;

    fn sink(kind: SensorKind) -> (SampleSink, crossbeam_channel::Receiver<SampleEvent>) {
        let (tx, rx) = crossbeam_channel::unbounded();
        (SampleSink::new(kind, tx), rx)
    }

    #[test]
    fn test_unavailable_refuses_start() {
        let m = SimulatedManager::new(SensorSet::ACCELEROMETER);
        assert!(m.is_available(SensorKind::Accelerometer));
        assert!(!m.is_available(SensorKind::Gyroscope));
        assert_eq!(m.available_sensors(), SensorSet::ACCELEROMETER);

        let (s, _rx) = sink(SensorKind::Gyroscope);
        assert!(matches!(
            m.start_updates(SensorKind::Gyroscope, s),
            Err(MotionError::SensorUnavailable(SensorKind::Gyroscope))
        ));
        assert!(!m.is_running(SensorKind::Gyroscope));
    }

    #[test]
    fn test_producer_pushes_sequence() {
        let m = SimulatedManager::new(SensorSet::all()).with_source(SensorKind::Gyroscope, |seq| {
            SimulatedSample::ok(MotionData::from_axes(
                SensorKind::Gyroscope,
                Vector3::new(seq as f64, 0.0, 0.0),
            ))
        });
        m.set_update_interval(SensorKind::Gyroscope, Duration::from_millis(2));
        let (s, rx) = sink(SensorKind::Gyroscope);
        m.start_updates(SensorKind::Gyroscope, s).unwrap();
        assert!(m.is_running(SensorKind::Gyroscope));

        let xs: Vec<f64> = (0..3)
            .map(|_| {
                let ev = rx.recv_timeout(Duration::from_secs(1)).unwrap();
                ev.data.unwrap().axes().x
            })
            .collect();
        assert_eq!(xs, vec![0.0, 1.0, 2.0]);

        m.stop_updates(SensorKind::Gyroscope);
        assert!(!m.is_running(SensorKind::Gyroscope));
        assert!(m.samples_sent(SensorKind::Gyroscope) >= 3);

        // Stopping twice is a no-op.
        m.stop_updates(SensorKind::Gyroscope);
    }

    #[test]
    fn test_zero_interval_is_clamped() {
        let m = SimulatedManager::new(SensorSet::all());
        m.set_update_interval(SensorKind::Magnetometer, Duration::ZERO);
        assert_eq!(m.update_interval(SensorKind::Magnetometer), Duration::ZERO);

        let (s, rx) = sink(SensorKind::Magnetometer);
        m.start_updates(SensorKind::Magnetometer, s).unwrap();
        let ev = rx.recv_timeout(Duration::from_secs(1)).unwrap();
        assert_eq!(ev.data.unwrap().axes(), Vector3::new(22.0, -5.0, -42.0));
    }

    #[test]
    fn test_producer_exits_when_sink_closes() {
        let m = SimulatedManager::new(SensorSet::all());
        m.set_update_interval(SensorKind::Accelerometer, Duration::from_millis(2));
        let (s, rx) = sink(SensorKind::Accelerometer);
        m.start_updates(SensorKind::Accelerometer, s).unwrap();
        rx.recv_timeout(Duration::from_secs(1)).unwrap();
        drop(rx);

        let deadline = Instant::now() + Duration::from_secs(1);
        while m.is_running(SensorKind::Accelerometer) {
            assert!(Instant::now() < deadline, "producer kept running");
            std::thread::sleep(Duration::from_millis(2));
        }
    }
}
