//! Target disk selection and pre-repair unmounting.

use crate::ui;
use opal_error::RepairError;
use opal_hal::{MountOps, ProbeOps};
use opal_workflow::DiskTarget;
use std::fs;
use std::io::{self, BufRead, Write};
use std::path::{Path, PathBuf};

/// Resolve the target disk from the CLI argument or an interactive
/// prompt, then check it actually exists as a block device.
pub fn select_disk<H: ProbeOps + ?Sized>(
    hal: &H,
    requested: Option<PathBuf>,
) -> Result<DiskTarget, RepairError> {
    let disk = match requested {
        Some(disk) => disk,
        None => prompt_for_disk(hal)?,
    };
    ensure_block_device(&disk)?;
    Ok(DiskTarget::new(disk))
}

/// Print the candidate disk table for `list-disks`.
pub fn print_disks<H: ProbeOps + ?Sized>(hal: &H) -> Result<(), RepairError> {
    for disk in hal.list_disks()? {
        println!(
            "{}  {}  {}",
            disk.path.display(),
            disk.size,
            disk.model
        );
    }
    Ok(())
}

/// Unmount anything auto-mounted from the target disk before touching it.
pub fn unmount_auto_mounted<H>(
    hal: &H,
    target: &DiskTarget,
    dry_run: bool,
) -> Result<(), RepairError>
where
    H: ProbeOps + MountOps + ?Sized,
{
    for mountpoint in hal.mountpoints(target.disk())? {
        log::info!("Unmounting {}", mountpoint.display());
        hal.unmount(&mountpoint, dry_run)?;
    }
    Ok(())
}

fn ensure_block_device(disk: &Path) -> Result<(), RepairError> {
    let not_found = || RepairError::DiskNotFound(disk.to_path_buf());
    let metadata = fs::metadata(disk).map_err(|_| not_found())?;

    #[cfg(unix)]
    {
        use std::os::unix::fs::FileTypeExt;
        if !metadata.file_type().is_block_device() {
            return Err(not_found());
        }
    }
    #[cfg(not(unix))]
    let _ = metadata;

    Ok(())
}

fn prompt_for_disk<H: ProbeOps + ?Sized>(hal: &H) -> Result<PathBuf, RepairError> {
    if ui::noninteractive() {
        log::error!("No --disk given and prompting is disabled");
        return Err(RepairError::Aborted);
    }

    println!("Available disks:");
    for disk in hal.list_disks()? {
        println!("  {}  {}  {}", disk.path.display(), disk.size, disk.model);
    }
    print!("Enter target disk (e.g. /dev/sda): ");
    io::stdout().flush().map_err(RepairError::Io)?;

    let mut input = String::new();
    io::stdin()
        .lock()
        .read_line(&mut input)
        .map_err(RepairError::Io)?;
    let input = input.trim();
    if input.is_empty() {
        return Err(RepairError::Aborted);
    }
    Ok(PathBuf::from(input))
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_hal::{FakeHal, Operation};
    use tempfile::tempdir;

    #[test]
    fn regular_files_are_not_disks() {
        let dir = tempdir().unwrap();
        let file = dir.path().join("not-a-disk");
        fs::write(&file, "x").unwrap();

        let err = ensure_block_device(&file).unwrap_err();
        assert!(matches!(err, RepairError::DiskNotFound(_)));
    }

    #[test]
    fn missing_paths_are_not_disks() {
        let err = ensure_block_device(Path::new("/dev/definitely-not-here")).unwrap_err();
        assert!(matches!(err, RepairError::DiskNotFound(_)));
    }

    #[test]
    fn auto_mounted_partitions_are_unmounted() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");
        hal.set_mountpoints(
            "/dev/sda",
            vec![PathBuf::from("/run/media/esp"), PathBuf::from("/run/media/home")],
        );

        unmount_auto_mounted(&hal, &target, false).unwrap();

        assert_eq!(
            hal.count_operations(|op| matches!(op, Operation::Unmount { .. })),
            2
        );
    }

    #[test]
    fn clean_disks_need_no_unmount() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");

        unmount_auto_mounted(&hal, &target, false).unwrap();

        assert!(!hal.has_operation(|op| matches!(op, Operation::Unmount { .. })));
    }
}
