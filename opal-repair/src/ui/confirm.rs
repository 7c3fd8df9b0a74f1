//! Confirmation prompts for destructive operations.

use opal_error::RepairError;
use std::io::{self, BufRead, Write};

/// When set, prompts are replaced by informational log lines so the
/// repair can run unattended.
pub const NONINTERACTIVE_ENV: &str = "OPAL_NONINTERACTIVE";

pub fn noninteractive() -> bool {
    std::env::var_os(NONINTERACTIVE_ENV).is_some()
}

/// Typed confirmation gate: the operator must re-type the target disk
/// path before anything destructive happens to it.
pub fn confirm_disk_by_name(disk: &str, yes_i_know: bool) -> Result<(), RepairError> {
    if yes_i_know {
        log::warn!("--yes-i-know supplied. Skipping confirmation.");
        return Ok(());
    }
    if noninteractive() {
        log::info!("{NONINTERACTIVE_ENV} set; proceeding against {disk} without confirmation");
        return Ok(());
    }

    println!();
    println!("WARNING: you are about to ERASE {disk}.");
    println!("This action is IRREVERSIBLE.");
    print!("Type the disk path ({disk}) to continue: ");
    io::stdout().flush().map_err(RepairError::Io)?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(RepairError::Io)?;

    if input.trim() != disk {
        return Err(RepairError::Aborted);
    }

    Ok(())
}

/// What to do with the machine after a successful repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CompletionAction {
    Reboot,
    Poweroff,
    None,
}

/// Completion prompt offering reboot or poweroff.
pub fn completion_prompt() -> Result<CompletionAction, RepairError> {
    if noninteractive() {
        log::info!("Repair complete; reboot the device when ready.");
        return Ok(CompletionAction::None);
    }

    print!("Repair complete. [r]eboot, [p]oweroff, or Enter to exit: ");
    io::stdout().flush().map_err(RepairError::Io)?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(RepairError::Io)?;

    Ok(match input.trim() {
        "r" | "R" => CompletionAction::Reboot,
        "p" | "P" => CompletionAction::Poweroff,
        _ => CompletionAction::None,
    })
}
