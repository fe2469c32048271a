use crate::manager::{SampleEvent, SampleSink};
use crate::types::{SensorKind, SensorReading};
use crate::{MotionError, Result};
use crossbeam_channel::{select, Receiver, Sender};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::thread::JoinHandle;
use std::time::Instant;

/// Execution context of one subscription.
///
/// The manager pushes into a bounded channel through a [`SampleSink`]; a
/// dedicated worker thread drains it and runs the delivery handler for each
/// reading. Every started subscription gets a fresh queue.
///
/// The handler returns `false` once its consumer is gone. The worker then
/// exits and drops its receiver, so the manager's next push fails and the
/// producer can stop.
pub(crate) struct UpdateQueue {
    kind: SensorKind,
    stop_flag: Arc<AtomicBool>,
    stop_tx: Option<Sender<()>>,
    thread: Option<JoinHandle<()>>,
}

impl UpdateQueue {
    /// Spawn the worker thread and return the queue with its producer sink.
    pub fn spawn<F>(
        kind: SensorKind,
        capacity: usize,
        handler: F,
    ) -> Result<(UpdateQueue, SampleSink)>
    where
        F: FnMut(SensorReading) -> bool + Send + 'static,
    {
        let (sender, receiver) = crossbeam_channel::bounded(capacity.max(1));
        let (stop_tx, stop_rx) = crossbeam_channel::bounded(0);
        let stop_flag = Arc::new(AtomicBool::new(false));
        let stop_clone = stop_flag.clone();

        let thread = std::thread::Builder::new()
            .name(format!("motionkit-{}", kind.name()))
            .spawn(move || {
                delivery_loop(kind, receiver, stop_rx, stop_clone, handler);
            })
            .map_err(|e| MotionError::Spawn(format!("{} queue: {}", kind, e)))?;

        Ok((
            UpdateQueue {
                kind,
                stop_flag,
                stop_tx: Some(stop_tx),
                thread: Some(thread),
            },
            SampleSink::new(kind, sender),
        ))
    }

    /// Whether the worker is still delivering.
    pub fn is_active(&self) -> bool {
        !self.stop_flag.load(Ordering::Acquire)
            && self.thread.as_ref().is_some_and(|t| !t.is_finished())
    }

    /// Stop delivering and wait for the worker to finish.
    pub fn stop(mut self) {
        self.shutdown();
    }

    fn shutdown(&mut self) {
        self.stop_flag.store(true, Ordering::Release);
        drop(self.stop_tx.take());
        if let Some(thread) = self.thread.take() {
            // Stopped from inside our own handler: the loop exits once the
            // current delivery returns, joining here would deadlock.
            if thread.thread().id() == std::thread::current().id() {
                return;
            }
            if thread.join().is_err() {
                log::warn!("{} update queue panicked", self.kind);
            }
        }
    }
}

impl Drop for UpdateQueue {
    fn drop(&mut self) {
        self.shutdown();
    }
}

fn delivery_loop<F>(
    kind: SensorKind,
    samples: Receiver<SampleEvent>,
    stop_rx: Receiver<()>,
    stop_flag: Arc<AtomicBool>,
    mut handler: F,
) where
    F: FnMut(SensorReading) -> bool,
{
    let epoch = Instant::now();
    log::debug!("{} update queue started", kind);

    loop {
        let event = select! {
            recv(stop_rx) -> _ => break,
            recv(samples) -> msg => match msg {
                Ok(event) => event,
                Err(_) => {
                    log::debug!("{} sink dropped by manager", kind);
                    break;
                }
            },
        };

        // select! picks at random when both are ready
        if stop_flag.load(Ordering::Acquire) {
            break;
        }

        if let Some(reading) = to_reading(kind, event, epoch) {
            if !handler(reading) {
                log::debug!("{} consumer gone", kind);
                break;
            }
        }
    }

    log::debug!("{} update queue stopped", kind);
}

/// Turn one manager push into a reading.
///
/// A reported error is logged and the sample is still used. Pushes with no
/// sample, or a sample for another kind, are logged and skipped.
pub(crate) fn to_reading(
    kind: SensorKind,
    event: SampleEvent,
    epoch: Instant,
) -> Option<SensorReading> {
    if let Some(err) = &event.error {
        log::warn!("{} update error: {}", kind, err);
    }

    let data = match event.data {
        Some(data) => data,
        None => {
            log::warn!("{} update carried no sample, skipping", kind);
            return None;
        }
    };

    if data.kind() != kind {
        log::warn!("{} update carried a {} sample, skipping", kind, data.kind());
        return None;
    }

    Some(SensorReading::new(kind, data.axes(), epoch.elapsed().as_secs_f64()))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::error::PlatformError;
    use crate::types::{MotionData, Vector3};
    use std::time::Duration;

    fn accel(x: f64, y: f64, z: f64) -> MotionData {
        MotionData::from_axes(SensorKind::Accelerometer, Vector3::new(x, y, z))
    }

    #[test]
    fn test_to_reading_keeps_sample_with_error() {
        let event = SampleEvent {
            data: Some(accel(0.0, 3.0, 4.0)),
            error: Some(PlatformError::new(1, "device busy")),
        };
        let r = to_reading(SensorKind::Accelerometer, event, Instant::now()).unwrap();
        assert_eq!((r.x, r.y, r.z), (0.0, 3.0, 4.0));
        assert!((r.absolute_value - 5.0).abs() < 1e-12);
    }

    #[test]
    fn test_to_reading_skips_empty_and_mismatched() {
        let empty = SampleEvent {
            data: None,
            error: Some(PlatformError::new(2, "no data")),
        };
        assert!(to_reading(SensorKind::Accelerometer, empty, Instant::now()).is_none());

        let wrong = SampleEvent {
            data: Some(accel(1.0, 0.0, 0.0)),
            error: None,
        };
        assert!(to_reading(SensorKind::Gyroscope, wrong, Instant::now()).is_none());
    }

    #[test]
    fn test_queue_delivers_in_order() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (queue, sink) = UpdateQueue::spawn(SensorKind::Accelerometer, 16, move |r| {
            let _ = tx.send(r.x);
            true
        })
        .unwrap();
        assert!(queue.is_active());

        for i in 0..5 {
            assert!(sink.send(accel(i as f64, 0.0, 0.0)));
        }
        let got: Vec<f64> = (0..5)
            .map(|_| rx.recv_timeout(Duration::from_secs(1)).unwrap())
            .collect();
        assert_eq!(got, vec![0.0, 1.0, 2.0, 3.0, 4.0]);

        queue.stop();
        assert!(!sink.send(accel(9.0, 0.0, 0.0)));
        assert!(rx.recv_timeout(Duration::from_millis(50)).is_err());
    }

    #[test]
    fn test_queue_stop_from_own_handler() {
        let slot: Arc<std::sync::Mutex<Option<UpdateQueue>>> = Arc::default();
        let slot_clone = slot.clone();
        let (tx, rx) = crossbeam_channel::unbounded();

        let (queue, sink) = UpdateQueue::spawn(SensorKind::Magnetometer, 16, move |r| {
            let _ = tx.send(r.z);
            if let Some(q) = slot_clone.lock().unwrap().take() {
                q.stop();
            }
            true
        })
        .unwrap();
        *slot.lock().unwrap() = Some(queue);

        let seven = Vector3::new(0.0, 0.0, 7.0);
        sink.send(MotionData::from_axes(SensorKind::Magnetometer, seven));
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 7.0);

        // The worker exits after the self-stop, disconnecting the sink.
        let deadline = Instant::now() + Duration::from_secs(1);
        while sink.send(MotionData::from_axes(SensorKind::Magnetometer, Vector3::default())) {
            assert!(Instant::now() < deadline, "worker did not exit");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(rx.try_recv().is_err());
    }

    #[test]
    fn test_handler_false_ends_queue() {
        let (tx, rx) = crossbeam_channel::unbounded();
        let (queue, sink) = UpdateQueue::spawn(SensorKind::Gyroscope, 16, move |r| {
            // Keep going until the second reading.
            let _ = tx.send(r.x);
            r.x < 1.0
        })
        .unwrap();

        let gyro = |x| MotionData::from_axes(SensorKind::Gyroscope, Vector3::new(x, 0.0, 0.0));
        assert!(sink.send(gyro(0.0)));
        assert!(sink.send(gyro(1.0)));
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 0.0);
        assert_eq!(rx.recv_timeout(Duration::from_secs(1)).unwrap(), 1.0);

        let deadline = Instant::now() + Duration::from_secs(1);
        while sink.send(gyro(2.0)) {
            assert!(Instant::now() < deadline, "worker did not exit");
            std::thread::sleep(Duration::from_millis(5));
        }
        assert!(!queue.is_active());
        assert!(rx.try_recv().is_err());
    }
}
