use std::fmt;

/// One of the four motion sensors exposed by the platform manager.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum SensorKind {
    Accelerometer = 0,
    Gyroscope = 1,
    /// Fused device motion. Readings carry the gravity vector.
    DeviceMotion = 2,
    Magnetometer = 3,
}

impl SensorKind {
    pub const ALL: [SensorKind; 4] = [
        SensorKind::Accelerometer,
        SensorKind::Gyroscope,
        SensorKind::DeviceMotion,
        SensorKind::Magnetometer,
    ];

    /// Dense index, used for per-kind slot arrays.
    pub fn index(self) -> usize {
        self as usize
    }

    pub fn from_index(index: usize) -> Option<SensorKind> {
        Self::ALL.get(index).copied()
    }

    /// The single-bit set containing only this kind.
    pub fn as_set(self) -> SensorSet {
        match self {
            SensorKind::Accelerometer => SensorSet::ACCELEROMETER,
            SensorKind::Gyroscope => SensorSet::GYROSCOPE,
            SensorKind::DeviceMotion => SensorSet::DEVICE_MOTION,
            SensorKind::Magnetometer => SensorSet::MAGNETOMETER,
        }
    }

    /// Short lowercase name, used for worker thread names.
    pub fn name(self) -> &'static str {
        match self {
            SensorKind::Accelerometer => "accelerometer",
            SensorKind::Gyroscope => "gyroscope",
            SensorKind::DeviceMotion => "device-motion",
            SensorKind::Magnetometer => "magnetometer",
        }
    }
}

impl fmt::Display for SensorKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.pad(self.name())
    }
}

bitflags::bitflags! {
    /// Set of sensor kinds, e.g. the sensors a manager reports as available.
    #[derive(Debug, Clone, Copy, PartialEq, Eq)]
    #[repr(C)]
    pub struct SensorSet: u32 {
        const ACCELEROMETER = 1 << 0;
        const GYROSCOPE     = 1 << 1;
        const DEVICE_MOTION = 1 << 2;
        const MAGNETOMETER  = 1 << 3;
    }
}

impl SensorSet {
    /// Iterate the kinds contained in this set, in `SensorKind::ALL` order.
    pub fn kinds(self) -> impl Iterator<Item = SensorKind> {
        SensorKind::ALL
            .into_iter()
            .filter(move |k| self.contains(k.as_set()))
    }
}

/// Three-axis vector as reported by the platform.
#[repr(C)]
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Vector3 {
    pub x: f64,
    pub y: f64,
    pub z: f64,
}

impl Vector3 {
    pub const fn new(x: f64, y: f64, z: f64) -> Self {
        Self { x, y, z }
    }

    /// Euclidean norm.
    pub fn magnitude(&self) -> f64 {
        (self.x * self.x + self.y * self.y + self.z * self.z).sqrt()
    }
}

/// Raw sample pushed by a sensor manager, one variant per sensor kind.
///
/// Field names follow the platform result structs. Only one field of each
/// variant is turned into a [`SensorReading`]; see [`MotionData::axes`].
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum MotionData {
    Accelerometer {
        /// Acceleration in g.
        acceleration: Vector3,
    },
    Gyroscope {
        /// Rotation rate in rad/s.
        rotation_rate: Vector3,
    },
    DeviceMotion {
        /// Gravity component of the fused acceleration, in g.
        gravity: Vector3,
        /// Acceleration with gravity removed, in g.
        user_acceleration: Vector3,
        /// Bias-corrected rotation rate in rad/s.
        rotation_rate: Vector3,
    },
    Magnetometer {
        /// Magnetic field in microtesla.
        magnetic_field: Vector3,
    },
}

impl MotionData {
    pub fn kind(&self) -> SensorKind {
        match self {
            MotionData::Accelerometer { .. } => SensorKind::Accelerometer,
            MotionData::Gyroscope { .. } => SensorKind::Gyroscope,
            MotionData::DeviceMotion { .. } => SensorKind::DeviceMotion,
            MotionData::Magnetometer { .. } => SensorKind::Magnetometer,
        }
    }

    /// The vector delivered to consumers: acceleration, rotation rate,
    /// gravity or magnetic field depending on the variant.
    pub fn axes(&self) -> Vector3 {
        match *self {
            MotionData::Accelerometer { acceleration } => acceleration,
            MotionData::Gyroscope { rotation_rate } => rotation_rate,
            MotionData::DeviceMotion { gravity, .. } => gravity,
            MotionData::Magnetometer { magnetic_field } => magnetic_field,
        }
    }

    /// Build the variant for `kind` with `v` in its delivered field.
    /// Secondary device-motion fields are zeroed.
    pub fn from_axes(kind: SensorKind, v: Vector3) -> MotionData {
        match kind {
            SensorKind::Accelerometer => MotionData::Accelerometer { acceleration: v },
            SensorKind::Gyroscope => MotionData::Gyroscope { rotation_rate: v },
            SensorKind::DeviceMotion => MotionData::DeviceMotion {
                gravity: v,
                user_acceleration: Vector3::default(),
                rotation_rate: Vector3::default(),
            },
            SensorKind::Magnetometer => MotionData::Magnetometer { magnetic_field: v },
        }
    }
}

/// One delivered reading. Built fresh for every sample and not retained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct SensorReading {
    pub kind: SensorKind,
    pub x: f64,
    pub y: f64,
    pub z: f64,
    /// Euclidean norm of (x, y, z), always >= 0.
    pub absolute_value: f64,
    /// Host steady-clock seconds since the subscription started.
    pub host_timestamp_s: f64,
}

impl SensorReading {
    pub fn new(kind: SensorKind, v: Vector3, host_timestamp_s: f64) -> Self {
        Self {
            kind,
            x: v.x,
            y: v.y,
            z: v.z,
            absolute_value: v.magnitude(),
            host_timestamp_s,
        }
    }
}
