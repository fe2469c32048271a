use std::time::Duration;

/// Interval used when a start call does not name one.
pub const DEFAULT_UPDATE_INTERVAL: Duration = Duration::from_millis(100);

/// Capacity of each subscription's sample queue.
pub const DEFAULT_QUEUE_CAPACITY: usize = 256;

/// Session-wide settings.
#[derive(Debug, Clone, PartialEq)]
pub struct SessionConfig {
    pub default_interval: Duration,
    /// Samples buffered between the manager and the delivery thread.
    /// When full, new samples are dropped.
    pub queue_capacity: usize,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            default_interval: DEFAULT_UPDATE_INTERVAL,
            queue_capacity: DEFAULT_QUEUE_CAPACITY,
        }
    }
}

impl SessionConfig {
    /// Defaults, overridden by environment variables:
    /// - `MOTIONKIT_INTERVAL_MS`
    /// - `MOTIONKIT_QUEUE_CAPACITY` (0 is ignored)
    pub fn from_env() -> Self {
        let defaults = Self::default();
        let interval_ms = read_env_u64(
            "MOTIONKIT_INTERVAL_MS",
            defaults.default_interval.as_millis() as u64,
        );
        let queue_capacity = match read_env_u64("MOTIONKIT_QUEUE_CAPACITY", 0) {
            0 => defaults.queue_capacity,
            n => n as usize,
        };

        let config = Self {
            default_interval: Duration::from_millis(interval_ms),
            queue_capacity,
        };
        log::debug!(
            "motionkit config: interval={:?} queueCapacity={}",
            config.default_interval,
            config.queue_capacity
        );
        config
    }
}

fn read_env_u64(name: &str, default: u64) -> u64 {
    std::env::var(name)
        .ok()
        .and_then(|v| v.trim().parse::<u64>().ok())
        .unwrap_or(default)
}
