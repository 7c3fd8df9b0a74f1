//! Opal Hardware Abstraction Layer.
//!
//! Every interaction with block devices, external tooling, and the machine
//! itself goes through the capability traits defined here, so the repair
//! workflow can run against the real system (`LinuxHal`) or against an
//! operation-recording fake (`FakeHal`) in tests.

mod hal;

pub use opal_error::{HalError, HalResult};

pub use hal::chroot_ops::ChrootOps;
pub use hal::fake_hal::{FakeHal, Operation};
pub use hal::format_ops::{FormatOps, FormatOptions};
pub use hal::freeze_ops::FreezeOps;
pub use hal::guards::FreezeGuard;
pub use hal::imaging_ops::{ImagingOps, ImagingOptions};
pub use hal::linux_hal::LinuxHal;
pub use hal::mount_ops::MountOps;
pub use hal::partition_ops::{PartitionOps, ProvisionOptions};
pub use hal::probe_ops::{DiskInfo, ProbeOps};
pub use hal::system_ops::{PowerAction, SystemOps};
pub use hal::RepairHal;
