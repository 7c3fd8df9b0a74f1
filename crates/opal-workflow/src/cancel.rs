//! Termination-signal capture.
//!
//! SIGINT/SIGTERM are recorded instead of killing the process, then
//! surfaced as [`RepairError::Interrupted`] at the next stage boundary.
//! Dying mid-stage would skip the freeze guard's Drop and could leave
//! the source filesystem frozen.

use opal_error::RepairError;
use std::sync::atomic::{AtomicBool, Ordering};

static INTERRUPTED: AtomicBool = AtomicBool::new(false);

extern "C" fn handle_signal(_signal: libc::c_int) {
    INTERRUPTED.store(true, Ordering::SeqCst);
}

/// Install the SIGINT/SIGTERM handlers. Call once at startup.
pub fn install_handlers() {
    use nix::sys::signal::{self, SigHandler, Signal};

    let handler = SigHandler::Handler(handle_signal);
    unsafe {
        let _ = signal::signal(Signal::SIGINT, handler);
        let _ = signal::signal(Signal::SIGTERM, handler);
    }
}

pub fn interrupted() -> bool {
    INTERRUPTED.load(Ordering::SeqCst)
}

/// Bail out between stages if a termination signal arrived.
pub fn check() -> Result<(), RepairError> {
    if interrupted() {
        return Err(RepairError::Interrupted);
    }
    Ok(())
}

#[cfg(test)]
pub fn set_interrupted_for_test(value: bool) {
    INTERRUPTED.store(value, Ordering::SeqCst);
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn check_reflects_the_flag() {
        let _lock = crate::test_env::lock();
        set_interrupted_for_test(false);
        assert!(check().is_ok());

        set_interrupted_for_test(true);
        assert!(matches!(check(), Err(RepairError::Interrupted)));

        set_interrupted_for_test(false);
    }
}
