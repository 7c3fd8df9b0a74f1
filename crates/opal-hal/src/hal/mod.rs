//! HAL trait definitions and implementations.
//!
//! One trait per system concern, each with a real (LinuxHal) and a fake
//! (FakeHal) implementation.

pub mod chroot_ops;
pub mod fake_hal;
pub mod format_ops;
pub mod freeze_ops;
pub mod guards;
pub mod imaging_ops;
pub mod linux_hal;
pub mod mount_ops;
pub mod partition_ops;
pub mod probe_ops;
pub mod system_ops;

use chroot_ops::ChrootOps;
use format_ops::FormatOps;
use freeze_ops::FreezeOps;
use imaging_ops::ImagingOps;
use mount_ops::MountOps;
use partition_ops::PartitionOps;
use probe_ops::ProbeOps;
use system_ops::SystemOps;

/// Complete HAL combining every system operation trait the repair
/// workflow depends on.
pub trait RepairHal:
    ProbeOps
    + MountOps
    + FormatOps
    + PartitionOps
    + FreezeOps
    + ImagingOps
    + ChrootOps
    + SystemOps
    + Send
    + Sync
{
}

/// Automatically implement RepairHal for any type implementing all required traits.
impl<T> RepairHal for T where
    T: ProbeOps
        + MountOps
        + FormatOps
        + PartitionOps
        + FreezeOps
        + ImagingOps
        + ChrootOps
        + SystemOps
        + Send
        + Sync
{
}
