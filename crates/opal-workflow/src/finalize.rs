//! Per-slot boot configuration and bootloader installation.

use crate::layout::{DiskTarget, Slot};
use crate::repair::RunOptions;
use opal_error::RepairError;
use opal_hal::ChrootOps;

const CONF_DIR: &str = "/esp/opal/conf";

/// Finalize both slots, then install the primary bootloader through
/// slot A's view of the ESP. No partial-finalization recovery exists;
/// an incompletely finalized slot is repaired by rerunning the whole
/// sequence.
pub fn run_finalize<H: ChrootOps + ?Sized>(
    hal: &H,
    target: &DiskTarget,
    opts: &RunOptions,
) -> Result<(), RepairError> {
    for slot in Slot::BOTH {
        finalize_slot(hal, target, slot, opts)?;
    }

    // The restricted, force-removable policy keeps the disk selectable
    // by firmware even when other removable media are present.
    log::info!("Installing primary bootloader via slot A");
    hal.run_in_slot(
        target.disk(),
        Slot::A.as_str(),
        &[
            "opal-efi-install",
            "--flags",
            "restricted",
            "--force-extra-removable",
        ],
        opts.dry_run,
    )?;

    Ok(())
}

fn finalize_slot<H: ChrootOps + ?Sized>(
    hal: &H,
    target: &DiskTarget,
    slot: Slot,
    opts: &RunOptions,
) -> Result<(), RepairError> {
    log::info!("Finalizing slot {}", slot);
    let partset = slot.as_str();
    let disk = target.disk();

    hal.run_in_slot(
        disk,
        partset,
        &["mkdir", "-p", "/esp", "/efi", "/boot"],
        opts.dry_run,
    )?;
    hal.run_in_slot(disk, partset, &["opal-partsets", "/efi"], opts.dry_run)?;
    hal.run_in_slot(
        disk,
        partset,
        &[
            "opal-bootconf",
            "create",
            "--image",
            partset,
            "--conf-dir",
            CONF_DIR,
            "--efi-dir",
            "/efi",
            "--set",
            "title",
            partset,
        ],
        opts.dry_run,
    )?;
    hal.run_in_slot(disk, partset, &["grub-mkimage"], opts.dry_run)?;
    hal.run_in_slot(disk, partset, &["update-grub"], opts.dry_run)?;

    Ok(())
}
