//! C FFI layer for motionkit.
//!
//! Provides an opaque handle-based API for C/C++ consumers, backed by the
//! simulated sensor manager. The generated C header is written to
//! `include/motionkit.h` by cbindgen.

use crate::error::LastError;
use crate::{MotionError, Result};
use crate::observer::HandlerSlots;
use crate::session::MotionSession;
use crate::sim::SimulatedManager;
use crate::types::{SensorKind, SensorSet};
use std::ffi::{c_char, c_int, c_void};
use std::sync::Arc;
use std::time::Duration;

/// Last error message for C consumers.
static LAST_ERROR: LastError = LastError::new();

/// Opaque session handle for C consumers.
pub struct MkSession {
    session: MotionSession,
    // The session only keeps a weak reference; the handle owns the observer.
    observer: Option<Arc<HandlerSlots>>,
}

/// Per-call reading callback: `(user_data, x, y, z)`.
pub type MkReadingFn = Option<extern "C" fn(user_data: *mut c_void, x: f64, y: f64, z: f64)>;

/// Observer callback: `(user_data, x, y, z, absolute_value)`.
pub type MkObserverFn =
    Option<extern "C" fn(user_data: *mut c_void, x: f64, y: f64, z: f64, absolute_value: f64)>;

/// Observer in C-compatible layout. Any callback may be NULL.
#[repr(C)]
pub struct MkObserver {
    /// Passed back unchanged to every callback.
    pub user_data: *mut c_void,
    pub accelerometer: MkObserverFn,
    pub gyroscope: MkObserverFn,
    pub device_motion: MkObserverFn,
    pub magnetometer: MkObserverFn,
}

/// Caller-owned context pointer. The C side guarantees it is safe to use from
/// the update threads.
#[derive(Clone, Copy)]
struct UserData(*mut c_void);

unsafe impl Send for UserData {}
unsafe impl Sync for UserData {}

impl UserData {
    // Accessed through a method so closures capture the whole wrapper.
    fn get(self) -> *mut c_void {
        self.0
    }
}

fn slot(
    slots: HandlerSlots,
    kind: SensorKind,
    f: MkObserverFn,
    user_data: UserData,
) -> HandlerSlots {
    let Some(f) = f else {
        return slots;
    };
    let call = move |x, y, z, abs| f(user_data.get(), x, y, z, abs);
    match kind {
        SensorKind::Accelerometer => slots.on_accelerometer(call),
        SensorKind::Gyroscope => slots.on_gyroscope(call),
        SensorKind::DeviceMotion => slots.on_device_motion(call),
        SensorKind::Magnetometer => slots.on_magnetometer(call),
    }
}

fn kind_from_c(kind: c_int) -> Option<SensorKind> {
    usize::try_from(kind).ok().and_then(SensorKind::from_index)
}

/// Negative and non-finite values select the default. Finite values too
/// large for a `Duration` are rejected.
fn interval_from_c(interval_s: f64) -> Result<Option<Duration>> {
    if !interval_s.is_finite() || interval_s < 0.0 {
        return Ok(None);
    }
    Duration::try_from_secs_f64(interval_s)
        .map(Some)
        .map_err(|_| MotionError::InvalidInterval(interval_s))
}

/// Create a session over a simulated manager.
/// `available_mask`: bit 0 accelerometer, 1 gyroscope, 2 device motion, 3 magnetometer.
#[no_mangle]
pub extern "C" fn mk_session_new_simulated(available_mask: u32) -> *mut MkSession {
    let manager = Arc::new(SimulatedManager::new(SensorSet::from_bits_truncate(
        available_mask,
    )));
    Box::into_raw(Box::new(MkSession {
        session: MotionSession::new(manager),
        observer: None,
    }))
}

/// Stop all updates and free the session.
///
/// # Safety
/// `session` must be a pointer returned by `mk_session_new_simulated`, or null.
#[no_mangle]
pub unsafe extern "C" fn mk_session_free(session: *mut MkSession) {
    if !session.is_null() {
        drop(Box::from_raw(session));
    }
}

/// Whether sensor `kind` (0..=3) is available.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mk_is_available(session: *const MkSession, kind: c_int) -> bool {
    if session.is_null() {
        return false;
    }
    let session = &*session;
    kind_from_c(kind).is_some_and(|k| session.session.is_available(k))
}

/// Start updates for `kind` (0..=3). A negative or non-finite `interval_s`
/// selects the default interval; one too large to represent is an error.
/// `callback` may be NULL.
/// Returns 0 on success, -1 on error (check mk_last_error()).
///
/// # Safety
/// `session` must be a valid session pointer, or null. `user_data` must stay
/// valid until updates for `kind` are stopped.
#[no_mangle]
pub unsafe extern "C" fn mk_start_updates(
    session: *mut MkSession,
    kind: c_int,
    interval_s: f64,
    callback: MkReadingFn,
    user_data: *mut c_void,
) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &*session;
    let Some(kind) = kind_from_c(kind) else {
        log::warn!("mk_start_updates: unknown sensor kind {}", kind);
        return -1;
    };

    let user_data = UserData(user_data);
    let on_reading = callback.map(|f| -> crate::ReadingCallback {
        Box::new(move |x, y, z| f(user_data.get(), x, y, z))
    });

    let started = interval_from_c(interval_s)
        .and_then(|interval| session.session.try_start_updates(kind, interval, on_reading));
    match started {
        Ok(()) => 0,
        Err(e) => {
            log::warn!("{}", e);
            LAST_ERROR.set(&e);
            -1
        }
    }
}

/// Stop updates for `kind`. Stopping an inactive sensor succeeds.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mk_stop_updates(session: *mut MkSession, kind: c_int) -> c_int {
    if session.is_null() {
        return -1;
    }
    let session = &*session;
    match kind_from_c(kind) {
        Some(kind) => {
            session.session.stop_updates(kind);
            0
        }
        None => -1,
    }
}

/// Register an observer. The struct is copied; it may be freed after the call.
///
/// # Safety
/// `session` and `observer` must be valid pointers, or null. `user_data`
/// inside the observer must stay valid until the observer is cleared or the
/// session is freed.
#[no_mangle]
pub unsafe extern "C" fn mk_set_observer(
    session: *mut MkSession,
    observer: *const MkObserver,
) -> c_int {
    if session.is_null() || observer.is_null() {
        return -1;
    }
    let session = &mut *session;
    let observer = &*observer;
    let user_data = UserData(observer.user_data);

    let slots = HandlerSlots::new();
    let slots = slot(slots, SensorKind::Accelerometer, observer.accelerometer, user_data);
    let slots = slot(slots, SensorKind::Gyroscope, observer.gyroscope, user_data);
    let slots = slot(slots, SensorKind::DeviceMotion, observer.device_motion, user_data);
    let slots = slot(slots, SensorKind::Magnetometer, observer.magnetometer, user_data);

    let slots = Arc::new(slots);
    session.session.set_observer(&slots);
    session.observer = Some(slots);
    0
}

/// Remove the registered observer.
///
/// # Safety
/// `session` must be a valid session pointer, or null.
#[no_mangle]
pub unsafe extern "C" fn mk_clear_observer(session: *mut MkSession) {
    if session.is_null() {
        return;
    }
    let session = &mut *session;
    session.session.clear_observer();
    session.observer = None;
}

/// Get the last error message. Returns NULL if no error.
/// The returned pointer is valid until the next motionkit API call.
#[no_mangle]
pub extern "C" fn mk_last_error() -> *const c_char {
    LAST_ERROR.as_ptr()
}
