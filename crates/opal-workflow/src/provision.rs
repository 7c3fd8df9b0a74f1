//! Whole-disk partition table application.

use crate::layout::{self, DiskTarget, PARTITION_TABLE_VERSION};
use crate::repair::RunOptions;
use opal_error::RepairError;
use opal_hal::{PartitionOps, ProvisionOptions, SystemOps};

/// Apply the constant partition table to the target disk in one sfdisk
/// pass, replacing the existing layout unconditionally. There is no
/// recovery path for a half-written table; a failure here leaves the
/// device requiring a full reimage.
pub fn apply_partition_table<H>(
    hal: &H,
    target: &DiskTarget,
    opts: &RunOptions,
) -> Result<(), RepairError>
where
    H: PartitionOps + SystemOps + ?Sized,
{
    let script = layout::sfdisk_script(target);
    log::info!(
        "Applying partition table v{} to {}",
        PARTITION_TABLE_VERSION,
        target.disk().display()
    );

    hal.apply_layout(
        target.disk(),
        &script,
        &ProvisionOptions::new(opts.dry_run, opts.confirmed),
    )?;
    hal.sync()?;
    hal.udev_settle()?;

    Ok(())
}
