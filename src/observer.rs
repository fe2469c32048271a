use crate::types::{SensorKind, SensorReading};

/// Persistent receiver of readings, registered on a [`crate::MotionSession`].
///
/// Every method has an empty default body; implement only the sensors you
/// care about. Methods are called from the per-sensor update threads.
pub trait MotionObserver: Send + Sync {
    fn accelerometer_values(&self, _x: f64, _y: f64, _z: f64, _absolute_value: f64) {}

    fn gyroscope_values(&self, _x: f64, _y: f64, _z: f64, _absolute_value: f64) {}

    /// Receives the gravity vector of the fused device motion.
    fn device_motion_values(&self, _x: f64, _y: f64, _z: f64, _absolute_value: f64) {}

    fn magnetometer_values(&self, _x: f64, _y: f64, _z: f64, _absolute_value: f64) {}
}

/// Route a reading to the observer method for its kind.
pub(crate) fn notify(observer: &dyn MotionObserver, r: &SensorReading) {
    match r.kind {
        SensorKind::Accelerometer => observer.accelerometer_values(r.x, r.y, r.z, r.absolute_value),
        SensorKind::Gyroscope => observer.gyroscope_values(r.x, r.y, r.z, r.absolute_value),
        SensorKind::DeviceMotion => observer.device_motion_values(r.x, r.y, r.z, r.absolute_value),
        SensorKind::Magnetometer => observer.magnetometer_values(r.x, r.y, r.z, r.absolute_value),
    }
}

type Slot = Option<Box<dyn Fn(f64, f64, f64, f64) + Send + Sync>>;

/// Observer assembled from independently optional closures.
///
/// ```
/// use motionkit::HandlerSlots;
///
/// let observer = HandlerSlots::new()
///     .on_gyroscope(|x, y, z, abs| println!("gyro {x} {y} {z} |{abs}|"));
/// ```
#[derive(Default)]
pub struct HandlerSlots {
    accelerometer: Slot,
    gyroscope: Slot,
    device_motion: Slot,
    magnetometer: Slot,
}

impl HandlerSlots {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn on_accelerometer(
        mut self,
        f: impl Fn(f64, f64, f64, f64) + Send + Sync + 'static,
    ) -> Self {
        self.accelerometer = Some(Box::new(f));
        self
    }

    pub fn on_gyroscope(
        mut self,
        f: impl Fn(f64, f64, f64, f64) + Send + Sync + 'static,
    ) -> Self {
        self.gyroscope = Some(Box::new(f));
        self
    }

    pub fn on_device_motion(
        mut self,
        f: impl Fn(f64, f64, f64, f64) + Send + Sync + 'static,
    ) -> Self {
        self.device_motion = Some(Box::new(f));
        self
    }

    pub fn on_magnetometer(
        mut self,
        f: impl Fn(f64, f64, f64, f64) + Send + Sync + 'static,
    ) -> Self {
        self.magnetometer = Some(Box::new(f));
        self
    }

    /// Whether a handler is installed for `kind`.
    pub fn handles(&self, kind: SensorKind) -> bool {
        self.slot(kind).is_some()
    }

    fn slot(&self, kind: SensorKind) -> &Slot {
        match kind {
            SensorKind::Accelerometer => &self.accelerometer,
            SensorKind::Gyroscope => &self.gyroscope,
            SensorKind::DeviceMotion => &self.device_motion,
            SensorKind::Magnetometer => &self.magnetometer,
        }
    }

    fn call(&self, kind: SensorKind, x: f64, y: f64, z: f64, absolute_value: f64) {
        if let Some(f) = self.slot(kind) {
            f(x, y, z, absolute_value);
        }
    }
}

impl MotionObserver for HandlerSlots {
    fn accelerometer_values(&self, x: f64, y: f64, z: f64, absolute_value: f64) {
        self.call(SensorKind::Accelerometer, x, y, z, absolute_value);
    }

    fn gyroscope_values(&self, x: f64, y: f64, z: f64, absolute_value: f64) {
        self.call(SensorKind::Gyroscope, x, y, z, absolute_value);
    }

    fn device_motion_values(&self, x: f64, y: f64, z: f64, absolute_value: f64) {
        self.call(SensorKind::DeviceMotion, x, y, z, absolute_value);
    }

    fn magnetometer_values(&self, x: f64, y: f64, z: f64, absolute_value: f64) {
        self.call(SensorKind::Magnetometer, x, y, z, absolute_value);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::types::Vector3;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::Arc;

    #[test]
    fn test_notify_routes_by_kind() {
        let hits = Arc::new(AtomicUsize::new(0));
        let h = hits.clone();
        let slots = HandlerSlots::new().on_device_motion(move |_, _, z, abs| {
            assert_eq!(z, -1.0);
            assert_eq!(abs, 1.0);
            h.fetch_add(1, Ordering::SeqCst);
        });
        assert!(slots.handles(SensorKind::DeviceMotion));
        assert!(!slots.handles(SensorKind::Accelerometer));

        let down = Vector3::new(0.0, 0.0, -1.0);
        let gravity = SensorReading::new(SensorKind::DeviceMotion, down, 0.0);
        let accel = SensorReading::new(SensorKind::Accelerometer, Vector3::new(1.0, 0.0, 0.0), 0.0);
        notify(&slots, &gravity);
        // Empty slot: skipped, not an error.
        notify(&slots, &accel);

        assert_eq!(hits.load(Ordering::SeqCst), 1);
    }
}
