//! VHPI-compatible FFI entry points: `startup_simulation`, `update_signal`,
//! and `next_timetrigger`, named and shaped after the original VHDL
//! simulator glue so an existing shim can link against this crate as a
//! drop-in. All protocol logic lives in `cosim_core`; this crate only
//! marshals C ABI values across the boundary and keeps Rust panics from
//! unwinding into the host.

use std::ffi::{c_char, c_int, CStr};
use std::panic::{self, AssertUnwindSafe};
use std::sync::{Mutex, Once};

use tracing::{error, warn};
use tracing_subscriber::EnvFilter;

use cosim_core::{
    transport_from_env, Direction, LogicBit, LogicVector, ProtocolError, Session, SessionError,
    UpdateOutcome,
};

const UPDATE_ERROR: c_int = -1;
const UPDATE_END: c_int = 0;
const UPDATE_SIGNAL: c_int = 1;
const UPDATE_TIME: c_int = 2;
const UPDATE_DELTA: c_int = 3;

static SESSION: Mutex<Option<Session>> = Mutex::new(None);
static TRACING_INIT: Once = Once::new();

fn init_tracing() {
    TRACING_INIT.call_once(|| {
        let env_filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
        tracing_subscriber::fmt()
            .with_env_filter(env_filter)
            .with_target(false)
            .init();
    });
}

/// Called once at the start of simulation with the raw `FROM`/`TO` signal
/// lists. Returns `0` on success, `-1` on any configuration or handshake
/// failure, including re-entry on an already-initialized session.
///
/// # Safety
///
/// `from_signals` and `to_signals` must be non-null, NUL-terminated C
/// strings valid for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn startup_simulation(
    time: u64,
    time_res: u64,
    from_signals: *const c_char,
    to_signals: *const c_char,
) -> c_int {
    init_tracing();

    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let from_str = match CStr::from_ptr(from_signals).to_str() {
            Ok(s) => s,
            Err(_) => return Err("from_signals is not valid UTF-8".to_string()),
        };
        let to_str = match CStr::from_ptr(to_signals).to_str() {
            Ok(s) => s,
            Err(_) => return Err("to_signals is not valid UTF-8".to_string()),
        };

        let mut slot = SESSION.lock().expect("session mutex poisoned");
        if slot.is_some() {
            warn!("startup_simulation called again on an initialized session");
            return Err(SessionError::Protocol(ProtocolError::AlreadyInitialized).to_string());
        }

        let transport = transport_from_env().map_err(|e| e.to_string())?;
        let session = Session::startup(time, time_res, from_str, to_str, transport)
            .map_err(|e| e.to_string())?;
        *slot = Some(session);
        Ok(())
    }));

    match result {
        Ok(Ok(())) => 0,
        Ok(Err(msg)) => {
            error!(error = %msg, "startup_simulation failed");
            UPDATE_ERROR
        }
        Err(payload) => {
            error!(panic = %panic_message(&payload), "startup_simulation panicked");
            UPDATE_ERROR
        }
    }
}

/// Drives one update round. `datain`/`dataout` point to `datain_len`/
/// `dataout_len` bytes, one per bit in declared (MSB-first) order, each a
/// nine-valued logic digit (the `LogicBit` encoding).
///
/// # Safety
///
/// `datain` must be valid for `datain_len` reads and `dataout` valid for
/// `dataout_len` reads and writes, both for the duration of this call.
#[no_mangle]
pub unsafe extern "C" fn update_signal(
    datain: *mut u8,
    datain_len: usize,
    dataout: *mut u8,
    dataout_len: usize,
    time: u64,
) -> c_int {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let mut slot = SESSION.lock().expect("session mutex poisoned");
        let session = match slot.as_mut() {
            Some(s) => s,
            None => return Err("update_signal called before startup_simulation".to_string()),
        };

        // The flat C ABI of spec.md §6 carries no direction flag alongside
        // `datain`/`dataout`; a real VHPI shim would have to supply the
        // host vector's declared `to`/`downto` out of band (the loader
        // glue itself is out of scope per spec.md §1). `ToLeft` is the
        // conservative fixed assumption until that wiring exists.
        let datain_bytes = std::slice::from_raw_parts(datain, datain_len);
        let in_vector = LogicVector::new(bytes_to_bits(datain_bytes)?, Direction::ToLeft);

        let dataout_bytes = std::slice::from_raw_parts(dataout, dataout_len);
        let mut out_vector = LogicVector::new(bytes_to_bits(dataout_bytes)?, Direction::ToLeft);

        let outcome = session
            .update(&in_vector, &mut out_vector, time)
            .map_err(|e| e.to_string())?;

        let dataout_slice = std::slice::from_raw_parts_mut(dataout, dataout_len);
        bits_to_bytes(out_vector.as_slice(), dataout_slice);

        Ok(outcome)
    }));

    match result {
        Ok(Ok(outcome)) => match outcome {
            UpdateOutcome::End => UPDATE_END,
            UpdateOutcome::Signal => UPDATE_SIGNAL,
            UpdateOutcome::Time => UPDATE_TIME,
            UpdateOutcome::Delta => UPDATE_DELTA,
        },
        Ok(Err(msg)) => {
            error!(error = %msg, "update_signal failed");
            UPDATE_ERROR
        }
        Err(payload) => {
            error!(panic = %panic_message(&payload), "update_signal panicked");
            UPDATE_ERROR
        }
    }
}

/// Simulator-time delay until the next forced wake-up.
///
/// # Safety
///
/// None beyond the standard C ABI calling convention; this function touches
/// no raw pointers.
#[no_mangle]
pub unsafe extern "C" fn next_timetrigger(time: u64) -> u64 {
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        let slot = SESSION.lock().expect("session mutex poisoned");
        slot.as_ref().map(|s| s.next_delay(time))
    }));

    match result {
        Ok(Some(delay)) => delay,
        Ok(None) => {
            warn!("next_timetrigger called before startup_simulation");
            0
        }
        Err(payload) => {
            error!(panic = %panic_message(&payload), "next_timetrigger panicked");
            0
        }
    }
}

fn bytes_to_bits(bytes: &[u8]) -> Result<Vec<LogicBit>, String> {
    bytes
        .iter()
        .map(|&b| LogicBit::try_from(b).map_err(|e| e.to_string()))
        .collect()
}

fn bits_to_bytes(bits: &[LogicBit], out: &mut [u8]) {
    for (dst, bit) in out.iter_mut().zip(bits.iter()) {
        *dst = u8::from(*bit);
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "non-string panic payload".to_string()
    }
}
