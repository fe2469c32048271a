//! Stream simulated readings from all four sensors to stdout.
//!
//! Usage: cargo run --example stream
//! Set MOTIONKIT_INTERVAL_MS to change the sampling interval.

use motionkit::{
    HandlerSlots, MotionData, MotionSession, SensorKind, SensorSet, SessionConfig, SimulatedManager,
    SimulatedSample, Vector3,
};
use std::sync::Arc;
use std::time::{Duration, Instant};

fn main() {
    env_logger::init();

    // No magnetometer, to show the unavailable path.
    let available = SensorSet::ACCELEROMETER | SensorSet::GYROSCOPE | SensorSet::DEVICE_MOTION;
    let spin = |seq: u64| {
        let t = seq as f64 * 0.1;
        let rate = Vector3::new(t.sin(), t.cos(), 0.0);
        SimulatedSample::ok(MotionData::from_axes(SensorKind::Gyroscope, rate))
    };
    let manager =
        Arc::new(SimulatedManager::new(available).with_source(SensorKind::Gyroscope, spin));

    let session = MotionSession::with_config(manager.clone(), SessionConfig::from_env());
    println!("Available: {:?}", session.available_sensors());

    let observer = Arc::new(
        HandlerSlots::new()
            .on_gyroscope(|x, y, z, abs| {
                println!("gyro   [{:+.3}, {:+.3}, {:+.3}]  |{:.3}|", x, y, z, abs);
            })
            .on_device_motion(|x, y, z, abs| {
                println!("motion [{:+.3}, {:+.3}, {:+.3}]  |{:.3}|", x, y, z, abs);
            }),
    );
    session.set_observer(&observer);

    session.start_accelerometer_updates(
        None,
        Some(Box::new(|x, y, z| {
            println!("accel  [{:+.3}, {:+.3}, {:+.3}]", x, y, z);
        })),
    );
    session.start_gyroscope_updates(None, None);
    session.start_device_motion_updates(None, None);
    session.start_magnetometer_updates(None, None);

    let start = Instant::now();
    std::thread::sleep(Duration::from_secs(2));
    session.stop_gyroscope_updates();
    println!("--- gyroscope stopped ---");
    std::thread::sleep(Duration::from_secs(1));
    session.stop_all();

    let elapsed = start.elapsed().as_secs_f64();
    for kind in SensorKind::ALL {
        let n = manager.samples_sent(kind);
        println!("{:<14} {:>4} samples ({:.1} Hz)", kind, n, n as f64 / elapsed);
    }
}
