//! Awaiting-operator terminal state.

use std::io::{self, BufRead};
use std::process;

/// Report a fatal condition and hold the process for the operator.
///
/// A destructive failure must never flow into an unattended reboot: the
/// console stays on the diagnostic until someone acknowledges it, at
/// which point the process exits with `code`. With no usable console the
/// process parks until killed externally.
pub fn await_operator(message: &str, code: i32) -> ! {
    log::error!("{message}");
    eprintln!();
    eprintln!("{message}");
    eprintln!("The device has NOT been rebooted.");

    if crate::ui::noninteractive() {
        park_forever();
    }

    eprintln!("Press Enter to acknowledge and exit.");
    let mut line = String::new();
    match io::stdin().lock().read_line(&mut line) {
        Ok(0) | Err(_) => park_forever(),
        Ok(_) => process::exit(code),
    }
}

fn park_forever() -> ! {
    loop {
        std::thread::park();
    }
}
