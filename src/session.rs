use crate::config::SessionConfig;
use crate::manager::SensorManager;
use crate::observer::{self, MotionObserver};
use crate::queue::UpdateQueue;
use crate::types::{SensorKind, SensorReading, SensorSet};
use crate::{MotionError, Result};
use crossbeam_channel::{Receiver, TrySendError};
use std::sync::{Arc, Mutex, MutexGuard, PoisonError, RwLock, Weak};
use std::time::Duration;

/// Per-call reading callback, receives `(x, y, z)`.
pub type ReadingCallback = Box<dyn FnMut(f64, f64, f64) + Send>;

type ObserverSlot = Arc<RwLock<Option<Weak<dyn MotionObserver>>>>;

/// Consumer-side handle on a sensor manager.
///
/// Each sensor has a start/stop pair. Readings go to the callback passed to
/// start (if any) and then to the registered observer (if any). Unavailable
/// sensors and manager errors are logged, never returned, by the start/stop
/// pairs; use [`MotionSession::try_start_updates`] to get them as errors.
///
/// Dropping the session stops every subscription it started.
pub struct MotionSession {
    manager: Arc<dyn SensorManager>,
    config: SessionConfig,
    observer: ObserverSlot,
    queues: Mutex<[Option<UpdateQueue>; 4]>,
}

impl MotionSession {
    pub fn new(manager: Arc<dyn SensorManager>) -> Self {
        Self::with_config(manager, SessionConfig::default())
    }

    pub fn with_config(manager: Arc<dyn SensorManager>, config: SessionConfig) -> Self {
        log::info!(
            "Motion session initialised: available={:?}",
            manager.available_sensors()
        );
        Self {
            manager,
            config,
            observer: Arc::new(RwLock::new(None)),
            queues: Mutex::new([None, None, None, None]),
        }
    }

    pub fn config(&self) -> &SessionConfig {
        &self.config
    }

    /// Register the observer. Only a weak reference is kept: once the caller
    /// drops its last `Arc`, deliveries to it silently stop.
    ///
    /// Applies to subscriptions that are already running.
    pub fn set_observer<O: MotionObserver + 'static>(&self, observer: &Arc<O>) {
        let weak: Weak<O> = Arc::downgrade(observer);
        self.store_observer(weak);
    }

    /// [`MotionSession::set_observer`] for an already type-erased observer.
    pub fn set_observer_dyn(&self, observer: &Arc<dyn MotionObserver>) {
        self.store_observer(Arc::downgrade(observer));
    }

    fn store_observer(&self, weak: Weak<dyn MotionObserver>) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = Some(weak);
    }

    pub fn clear_observer(&self) {
        *self.observer.write().unwrap_or_else(PoisonError::into_inner) = None;
    }

    pub fn is_available(&self, kind: SensorKind) -> bool {
        self.manager.is_available(kind)
    }

    pub fn available_sensors(&self) -> SensorSet {
        self.manager.available_sensors()
    }

    /// Whether this session has a live subscription for `kind`.
    pub fn is_active(&self, kind: SensorKind) -> bool {
        self.lock_queues()[kind.index()]
            .as_ref()
            .is_some_and(|q| q.is_active())
    }

    pub fn start_accelerometer_updates(
        &self,
        interval: Option<Duration>,
        on_reading: Option<ReadingCallback>,
    ) {
        self.start_updates(SensorKind::Accelerometer, interval, on_reading);
    }

    pub fn start_gyroscope_updates(
        &self,
        interval: Option<Duration>,
        on_reading: Option<ReadingCallback>,
    ) {
        self.start_updates(SensorKind::Gyroscope, interval, on_reading);
    }

    /// Readings carry the gravity vector of the fused motion.
    pub fn start_device_motion_updates(
        &self,
        interval: Option<Duration>,
        on_reading: Option<ReadingCallback>,
    ) {
        self.start_updates(SensorKind::DeviceMotion, interval, on_reading);
    }

    pub fn start_magnetometer_updates(
        &self,
        interval: Option<Duration>,
        on_reading: Option<ReadingCallback>,
    ) {
        self.start_updates(SensorKind::Magnetometer, interval, on_reading);
    }

    pub fn stop_accelerometer_updates(&self) {
        self.stop_updates(SensorKind::Accelerometer);
    }

    pub fn stop_gyroscope_updates(&self) {
        self.stop_updates(SensorKind::Gyroscope);
    }

    pub fn stop_device_motion_updates(&self) {
        self.stop_updates(SensorKind::DeviceMotion);
    }

    pub fn stop_magnetometer_updates(&self) {
        self.stop_updates(SensorKind::Magnetometer);
    }

    /// Start updates for `kind`. `None` interval means the configured default.
    ///
    /// Failures (sensor unavailable, manager refused) are logged only.
    pub fn start_updates(
        &self,
        kind: SensorKind,
        interval: Option<Duration>,
        on_reading: Option<ReadingCallback>,
    ) {
        if let Err(e) = self.try_start_updates(kind, interval, on_reading) {
            log::warn!("{}", e);
        }
    }

    /// Like [`MotionSession::start_updates`] but returns the failure.
    pub fn try_start_updates(
        &self,
        kind: SensorKind,
        interval: Option<Duration>,
        on_reading: Option<ReadingCallback>,
    ) -> Result<()> {
        let mut on_reading = on_reading;
        let observer = self.observer.clone();
        self.start_with_handler(kind, interval, move |reading| {
            if let Some(cb) = on_reading.as_mut() {
                cb(reading.x, reading.y, reading.z);
            }
            notify_observer(&observer, &reading);
            true
        })
    }

    /// Start updates for `kind` and receive readings through a channel.
    ///
    /// The registered observer still fires. The stream ends
    /// ([`MotionError::StreamStopped`]) once the subscription is stopped or
    /// replaced. Dropping the stream ends the subscription at the next reading.
    pub fn readings(&self, kind: SensorKind, interval: Option<Duration>) -> Result<ReadingStream> {
        let (sender, receiver) = crossbeam_channel::bounded(self.config.queue_capacity.max(1));
        let observer = self.observer.clone();
        self.start_with_handler(kind, interval, move |reading| {
            match sender.try_send(reading) {
                Ok(()) => {}
                Err(TrySendError::Full(_)) => {
                    log::trace!("{} reading stream full, dropping reading", kind);
                }
                Err(TrySendError::Disconnected(_)) => {
                    log::info!("{} reading stream dropped, ending updates", kind);
                    return false;
                }
            }
            notify_observer(&observer, &reading);
            true
        })?;
        Ok(ReadingStream { kind, receiver })
    }

    /// Stop updates for `kind`. Safe to call when nothing is running.
    ///
    /// Once this returns no further readings for `kind` are delivered, unless
    /// called from inside that sensor's own callback, where the current
    /// delivery finishes first.
    pub fn stop_updates(&self, kind: SensorKind) {
        let queue = self.detach(kind);
        if let Some(queue) = queue {
            queue.stop();
            log::info!("{} updates stopped", kind);
        }
    }

    /// Stop every subscription this session started.
    pub fn stop_all(&self) {
        for kind in SensorKind::ALL {
            let active = self.lock_queues()[kind.index()].is_some();
            if active {
                self.stop_updates(kind);
            }
        }
    }

    fn start_with_handler<F>(
        &self,
        kind: SensorKind,
        interval: Option<Duration>,
        handler: F,
    ) -> Result<()>
    where
        F: FnMut(SensorReading) -> bool + Send + 'static,
    {
        if !self.manager.is_available(kind) {
            return Err(MotionError::SensorUnavailable(kind));
        }

        let previous = self.detach(kind);
        if let Some(previous) = previous {
            log::debug!("Replacing active {} subscription", kind);
            previous.stop();
        }

        let interval = interval.unwrap_or(self.config.default_interval);
        self.manager.set_update_interval(kind, interval);

        let (queue, sink) = UpdateQueue::spawn(kind, self.config.queue_capacity, handler)?;
        let stale = {
            // Manager start and slot update happen under one lock so a
            // concurrent stop sees both or neither. On failure the guard is
            // released before the queue is dropped and joined.
            let mut queues = self.lock_queues();
            self.manager.start_updates(kind, sink)?;
            queues[kind.index()].replace(queue)
        };
        log::info!("{} updates started (interval {:?})", kind, interval);

        // A concurrent start for the same kind may have landed in between.
        if let Some(stale) = stale {
            stale.stop();
        }
        Ok(())
    }

    /// Stop the manager side of `kind` and take its queue, atomically with
    /// respect to other starts and stops. The caller stops the queue outside
    /// the lock.
    fn detach(&self, kind: SensorKind) -> Option<UpdateQueue> {
        let mut queues = self.lock_queues();
        self.manager.stop_updates(kind);
        queues[kind.index()].take()
    }

    fn lock_queues(&self) -> MutexGuard<'_, [Option<UpdateQueue>; 4]> {
        self.queues.lock().unwrap_or_else(PoisonError::into_inner)
    }
}

impl Drop for MotionSession {
    fn drop(&mut self) {
        self.stop_all();
    }
}

fn notify_observer(slot: &ObserverSlot, reading: &SensorReading) {
    // Upgrade under the lock, call without it.
    let observer = match slot.read() {
        Ok(guard) => guard.as_ref().and_then(Weak::upgrade),
        Err(_) => None,
    };
    if let Some(observer) = observer {
        observer::notify(observer.as_ref(), reading);
    }
}

/// Pull-style handle on one subscription, see [`MotionSession::readings`].
pub struct ReadingStream {
    kind: SensorKind,
    receiver: Receiver<SensorReading>,
}

impl ReadingStream {
    pub fn kind(&self) -> SensorKind {
        self.kind
    }

    /// Receive the next reading (blocks until available).
    pub fn recv(&self) -> Result<SensorReading> {
        self.receiver.recv().map_err(|_| MotionError::StreamStopped)
    }

    /// Try to receive a reading without blocking.
    pub fn try_recv(&self) -> Option<SensorReading> {
        self.receiver.try_recv().ok()
    }

    /// Receive a reading with a timeout.
    pub fn recv_timeout(&self, timeout: Duration) -> Result<SensorReading> {
        self.receiver.recv_timeout(timeout).map_err(|e| match e {
            crossbeam_channel::RecvTimeoutError::Timeout => MotionError::Timeout,
            crossbeam_channel::RecvTimeoutError::Disconnected => MotionError::StreamStopped,
        })
    }
}
