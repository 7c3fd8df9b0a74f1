//! Slot imaging engine: freeze, duplicate, retune, check.
//!
//! The highest-risk stage of a repair. The live source root is frozen
//! for the entire two-slot duplication so both copies observe one
//! point-in-time image; the freeze is held by a [`FreezeGuard`] created
//! before the first byte is copied and released only when the caller
//! drops it at the end of the run.

use crate::layout::{DiskTarget, Slot, ESP_LABEL};
use crate::repair::RunOptions;
use opal_error::RepairError;
use opal_hal::{FormatOps, FormatOptions, FreezeGuard, FreezeOps, ImagingOps, ImagingOptions};
use std::env;
use std::path::PathBuf;

/// Default device node of the live source root filesystem.
pub const SOURCE_ROOT_DEVICE: &str = "/dev/disk/by-label/opal-rootfs";

/// Default mountpoint of the live source root filesystem.
pub const SOURCE_ROOT_MOUNTPOINT: &str = "/run/opal/sysroot";

const SOURCE_DEVICE_ENV: &str = "OPAL_SOURCE_DEVICE";
const SOURCE_MOUNT_ENV: &str = "OPAL_SOURCE_MOUNT";

/// The live, currently-mounted root filesystem backing the running
/// installer: the sole source for both OS slot images.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct SourceRoot {
    pub device: PathBuf,
    pub mountpoint: PathBuf,
}

impl SourceRoot {
    /// Resolve the source root, failing if the backing device node is
    /// gone (e.g. the installer medium was disconnected). This is a
    /// precondition failure, distinct from any tool failure.
    pub fn resolve(
        device: impl Into<PathBuf>,
        mountpoint: impl Into<PathBuf>,
    ) -> Result<Self, RepairError> {
        let device = device.into();
        if !device.exists() {
            return Err(RepairError::SourceRootMissing(device));
        }
        Ok(Self {
            device,
            mountpoint: mountpoint.into(),
        })
    }

    /// Resolve using the built-in defaults, overridable through the
    /// OPAL_SOURCE_DEVICE / OPAL_SOURCE_MOUNT environment variables.
    pub fn resolve_default() -> Result<Self, RepairError> {
        let device = env::var_os(SOURCE_DEVICE_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(SOURCE_ROOT_DEVICE));
        let mountpoint = env::var_os(SOURCE_MOUNT_ENV)
            .map(PathBuf::from)
            .unwrap_or_else(|| PathBuf::from(SOURCE_ROOT_MOUNTPOINT));
        Self::resolve(device, mountpoint)
    }
}

/// Image both OS slots from the frozen source root.
///
/// Returns the freeze guard still holding the source frozen; the caller
/// keeps it alive until the whole run finishes so the thaw lands at the
/// very end, on success and failure alike.
pub fn run_imaging<'a, H>(
    hal: &'a H,
    target: &DiskTarget,
    source: &SourceRoot,
    opts: &RunOptions,
) -> Result<FreezeGuard<'a, H>, RepairError>
where
    H: FormatOps + FreezeOps + ImagingOps + ?Sized,
{
    let format_opts = FormatOptions::new(opts.dry_run, opts.confirmed);
    hal.format_vfat(&target.esp_device(), ESP_LABEL, &format_opts)?;
    for slot in Slot::BOTH {
        hal.format_vfat(&target.efi_device(slot), slot.efi_label(), &format_opts)?;
    }

    // The guard must exist before the first byte is copied: if anything
    // fails between freeze and copy, the source still thaws.
    log::info!("Freezing source root at {}", source.mountpoint.display());
    let guard = FreezeGuard::freeze(hal, source.mountpoint.clone())?;

    let imaging_opts = ImagingOptions::new(opts.dry_run, opts.confirmed);
    for slot in Slot::BOTH {
        let slot_device = target.rootfs_device(slot);
        log::info!(
            "Imaging slot {}: {} -> {}",
            slot,
            source.device.display(),
            slot_device.display()
        );
        hal.duplicate(&source.device, &slot_device, &imaging_opts)?;
        hal.refresh_uuid(&slot_device, &imaging_opts)?;
        hal.check_filesystem(&slot_device, &imaging_opts)?;
    }

    Ok(guard)
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_hal::{FakeHal, Operation};
    use std::path::Path;

    fn source() -> SourceRoot {
        SourceRoot {
            device: PathBuf::from("/dev/disk/by-label/opal-rootfs"),
            mountpoint: PathBuf::from("/run/opal/sysroot"),
        }
    }

    #[test]
    fn resolve_rejects_missing_device() {
        let dir = tempfile::tempdir().unwrap();
        let missing = dir.path().join("no-such-device");

        let err = SourceRoot::resolve(&missing, "/run/opal/sysroot").unwrap_err();
        assert!(matches!(err, RepairError::SourceRootMissing(_)));

        let present = dir.path().join("device");
        std::fs::write(&present, b"").unwrap();
        SourceRoot::resolve(&present, "/run/opal/sysroot").unwrap();
    }

    #[test]
    fn esp_and_efi_are_formatted_before_the_freeze() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");

        let guard = run_imaging(&hal, &target, &source(), &RunOptions::new(false, true)).unwrap();
        drop(guard);

        let ops = hal.operations();
        let freeze_pos = ops
            .iter()
            .position(|op| matches!(op, Operation::Freeze { .. }))
            .unwrap();
        let vfat_count = ops[..freeze_pos]
            .iter()
            .filter(|op| matches!(op, Operation::FormatVfat { .. }))
            .count();
        assert_eq!(vfat_count, 3);
        assert!(hal.has_operation(
            |op| matches!(op, Operation::FormatVfat { label, .. } if label == "esp")
        ));
        assert!(hal.has_operation(
            |op| matches!(op, Operation::FormatVfat { label, .. } if label == "efi-B")
        ));
    }

    #[test]
    fn both_slots_are_imaged_under_one_freeze() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");
        let source = source();
        hal.set_uuid(&source.device, "aaaa-bbbb");

        let guard = run_imaging(&hal, &target, &source, &RunOptions::new(false, true)).unwrap();
        assert!(hal.is_frozen(&source.mountpoint));
        assert_eq!(hal.thaw_count(), 0);
        drop(guard);

        assert_eq!(hal.freeze_count(), 1);
        assert_eq!(hal.thaw_count(), 1);

        // Slot A fully handled before slot B starts.
        let ops = hal.operations();
        let a_check = ops
            .iter()
            .position(|op| {
                matches!(op, Operation::CheckFilesystem { device } if *device == Path::new("/dev/sda4"))
            })
            .unwrap();
        let b_duplicate = ops
            .iter()
            .position(|op| {
                matches!(op, Operation::Duplicate { target, .. } if *target == Path::new("/dev/sda5"))
            })
            .unwrap();
        assert!(a_check < b_duplicate);
    }

    #[test]
    fn slot_uuids_are_distinct_from_source_and_sibling() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");
        let source = source();
        hal.set_uuid(&source.device, "aaaa-bbbb");

        let guard = run_imaging(&hal, &target, &source, &RunOptions::new(false, true)).unwrap();
        drop(guard);

        let source_uuid = hal.uuid_of(&source.device).unwrap();
        let a = hal.uuid_of(Path::new("/dev/sda4")).unwrap();
        let b = hal.uuid_of(Path::new("/dev/sda5")).unwrap();
        assert_ne!(a, source_uuid);
        assert_ne!(b, source_uuid);
        assert_ne!(a, b);
    }

    #[test]
    fn duplication_failure_still_thaws_exactly_once() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");
        hal.fail_on("duplicate");

        let err = run_imaging(&hal, &target, &source(), &RunOptions::new(false, true));
        assert!(err.is_err());
        assert_eq!(hal.freeze_count(), 1);
        assert_eq!(hal.thaw_count(), 1);
        assert!(!hal.is_frozen(&source().mountpoint));
    }

    #[test]
    fn failed_check_on_slot_a_never_touches_slot_b() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");
        hal.fail_on_device("check_filesystem", "/dev/sda4");

        let err = run_imaging(&hal, &target, &source(), &RunOptions::new(false, true));
        assert!(err.is_err());
        assert_eq!(hal.thaw_count(), 1);
        assert!(!hal.has_operation(
            |op| matches!(op, Operation::Duplicate { target, .. } if *target == Path::new("/dev/sda5"))
        ));
    }
}
