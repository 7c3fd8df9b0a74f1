//! Fake HAL implementation for testing.
//!
//! Records all operations without executing them, allowing CI-safe
//! testing of the repair workflow without root privileges or real block
//! devices. Probe results, per-operation failures, and filesystem UUIDs
//! can be scripted per test.

use super::chroot_ops::ChrootOps;
use super::format_ops::{FormatOps, FormatOptions};
use super::freeze_ops::FreezeOps;
use super::imaging_ops::{ImagingOps, ImagingOptions};
use super::mount_ops::MountOps;
use super::partition_ops::{PartitionOps, ProvisionOptions};
use super::probe_ops::{DiskInfo, ProbeOps};
use super::system_ops::{PowerAction, SystemOps};
use opal_error::{HalError, HalResult};
use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

/// Operation records for testing and verification.
#[derive(Debug, Clone, PartialEq)]
pub enum Operation {
    ListDisks,
    Mountpoints {
        disk: PathBuf,
    },
    Fstype {
        device: PathBuf,
    },
    Partlabel {
        device: PathBuf,
    },
    Unmount {
        target: PathBuf,
    },
    FormatExt4 {
        device: PathBuf,
        extra_args: Vec<String>,
    },
    FormatVfat {
        device: PathBuf,
        label: String,
    },
    SetReservedPercent {
        device: PathBuf,
        percent: u8,
    },
    ApplyLayout {
        disk: PathBuf,
        script: String,
    },
    Freeze {
        mountpoint: PathBuf,
    },
    Thaw {
        mountpoint: PathBuf,
    },
    Duplicate {
        source: PathBuf,
        target: PathBuf,
    },
    RefreshUuid {
        device: PathBuf,
        uuid: String,
    },
    CheckFilesystem {
        device: PathBuf,
    },
    ChrootRun {
        disk: PathBuf,
        partset: String,
        command: Vec<String>,
    },
    Sync,
    UdevSettle,
    Power {
        action: PowerAction,
    },
}

impl Operation {
    /// True for operations that write to the device under repair.
    pub fn is_destructive(&self) -> bool {
        matches!(
            self,
            Operation::FormatExt4 { .. }
                | Operation::FormatVfat { .. }
                | Operation::SetReservedPercent { .. }
                | Operation::ApplyLayout { .. }
                | Operation::Duplicate { .. }
                | Operation::RefreshUuid { .. }
        )
    }
}

/// Shared state for FakeHal operations.
#[derive(Debug, Default)]
struct FakeHalState {
    /// All operations that were recorded
    operations: Vec<Operation>,
    /// Disks reported by list_disks
    disks: Vec<DiskInfo>,
    /// Mountpoints reported per disk
    mountpoints: HashMap<PathBuf, Vec<PathBuf>>,
    /// Scripted (fstype, partlabel) probe results per device
    probes: HashMap<PathBuf, (String, String)>,
    /// Filesystem UUID per device
    uuids: HashMap<PathBuf, String>,
    uuid_counter: u32,
    /// Currently frozen mountpoints
    frozen: HashSet<PathBuf>,
    /// Operation kinds scripted to fail unconditionally
    failures: HashSet<String>,
    /// (kind, device) pairs scripted to fail
    device_failures: HashSet<(String, PathBuf)>,
}

/// Fake HAL implementation that records operations without executing them.
#[derive(Debug, Clone, Default)]
pub struct FakeHal {
    state: Arc<Mutex<FakeHalState>>,
}

impl FakeHal {
    pub fn new() -> Self {
        Self {
            state: Arc::new(Mutex::new(FakeHalState::default())),
        }
    }

    /// Get all recorded operations.
    pub fn operations(&self) -> Vec<Operation> {
        self.state.lock().unwrap().operations.clone()
    }

    /// Get the number of operations recorded.
    pub fn operation_count(&self) -> usize {
        self.state.lock().unwrap().operations.len()
    }

    /// Check if a specific operation was recorded.
    pub fn has_operation(&self, check: impl Fn(&Operation) -> bool) -> bool {
        self.state.lock().unwrap().operations.iter().any(check)
    }

    /// Count recorded operations matching a predicate.
    pub fn count_operations(&self, check: impl Fn(&Operation) -> bool) -> usize {
        self.state
            .lock()
            .unwrap()
            .operations
            .iter()
            .filter(|op| check(op))
            .count()
    }

    /// Clear all recorded operations and scripted state.
    pub fn clear(&self) {
        let mut state = self.state.lock().unwrap();
        *state = FakeHalState::default();
    }

    /// Script the disks reported by `list_disks`.
    pub fn add_disk(&self, path: impl Into<PathBuf>, size: &str, model: &str) {
        self.state.lock().unwrap().disks.push(DiskInfo {
            path: path.into(),
            size: size.to_string(),
            model: model.to_string(),
        });
    }

    /// Script the mountpoints reported for `disk`.
    pub fn set_mountpoints(&self, disk: impl Into<PathBuf>, mountpoints: Vec<PathBuf>) {
        self.state
            .lock()
            .unwrap()
            .mountpoints
            .insert(disk.into(), mountpoints);
    }

    /// Script the blkid probe result for `device`.
    pub fn set_probe(&self, device: impl Into<PathBuf>, fstype: &str, partlabel: &str) {
        self.state
            .lock()
            .unwrap()
            .probes
            .insert(device.into(), (fstype.to_string(), partlabel.to_string()));
    }

    /// Script the filesystem UUID currently on `device`.
    pub fn set_uuid(&self, device: impl Into<PathBuf>, uuid: &str) {
        self.state
            .lock()
            .unwrap()
            .uuids
            .insert(device.into(), uuid.to_string());
    }

    /// Script every future operation of `kind` to fail.
    pub fn fail_on(&self, kind: &str) {
        self.state.lock().unwrap().failures.insert(kind.to_string());
    }

    /// Script operations of `kind` against `device` to fail.
    pub fn fail_on_device(&self, kind: &str, device: impl Into<PathBuf>) {
        self.state
            .lock()
            .unwrap()
            .device_failures
            .insert((kind.to_string(), device.into()));
    }

    /// The UUID currently recorded for `device`, if any.
    pub fn uuid_of(&self, device: &Path) -> Option<String> {
        self.state.lock().unwrap().uuids.get(device).cloned()
    }

    /// Whether `mountpoint` is currently frozen.
    pub fn is_frozen(&self, mountpoint: &Path) -> bool {
        self.state.lock().unwrap().frozen.contains(mountpoint)
    }

    /// Number of thaw operations observed.
    pub fn thaw_count(&self) -> usize {
        self.count_operations(|op| matches!(op, Operation::Thaw { .. }))
    }

    /// Number of freeze operations observed.
    pub fn freeze_count(&self) -> usize {
        self.count_operations(|op| matches!(op, Operation::Freeze { .. }))
    }

    fn record(&self, op: Operation) {
        self.state.lock().unwrap().operations.push(op);
    }

    fn check_failure(&self, kind: &str, device: Option<&Path>) -> HalResult<()> {
        let state = self.state.lock().unwrap();
        let scripted = state.failures.contains(kind)
            || device.is_some_and(|d| {
                state
                    .device_failures
                    .contains(&(kind.to_string(), d.to_path_buf()))
            });
        if scripted {
            return Err(HalError::CommandFailed {
                program: kind.to_string(),
                code: Some(1),
                stderr: format!("scripted failure: {kind}"),
            });
        }
        Ok(())
    }
}

impl ProbeOps for FakeHal {
    fn list_disks(&self) -> HalResult<Vec<DiskInfo>> {
        self.check_failure("list_disks", None)?;
        self.record(Operation::ListDisks);
        Ok(self.state.lock().unwrap().disks.clone())
    }

    fn mountpoints(&self, disk: &Path) -> HalResult<Vec<PathBuf>> {
        self.check_failure("mountpoints", Some(disk))?;
        self.record(Operation::Mountpoints {
            disk: disk.to_path_buf(),
        });
        Ok(self
            .state
            .lock()
            .unwrap()
            .mountpoints
            .get(disk)
            .cloned()
            .unwrap_or_default())
    }

    fn fstype(&self, device: &Path) -> HalResult<String> {
        self.check_failure("fstype", Some(device))?;
        self.record(Operation::Fstype {
            device: device.to_path_buf(),
        });
        Ok(self
            .state
            .lock()
            .unwrap()
            .probes
            .get(device)
            .map(|(fstype, _)| fstype.clone())
            .unwrap_or_default())
    }

    fn partlabel(&self, device: &Path) -> HalResult<String> {
        self.check_failure("partlabel", Some(device))?;
        self.record(Operation::Partlabel {
            device: device.to_path_buf(),
        });
        Ok(self
            .state
            .lock()
            .unwrap()
            .probes
            .get(device)
            .map(|(_, label)| label.clone())
            .unwrap_or_default())
    }
}

impl MountOps for FakeHal {
    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: unmount {}", target.display());
            return Ok(());
        }
        self.check_failure("unmount", Some(target))?;
        self.record(Operation::Unmount {
            target: target.to_path_buf(),
        });
        Ok(())
    }
}

impl FormatOps for FakeHal {
    fn format_ext4(&self, device: &Path, opts: &FormatOptions) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: mkfs.ext4 {}", device.display());
            return Ok(());
        }
        self.check_failure("format_ext4", Some(device))?;
        self.record(Operation::FormatExt4 {
            device: device.to_path_buf(),
            extra_args: opts.extra_args.clone(),
        });
        Ok(())
    }

    fn format_vfat(&self, device: &Path, label: &str, opts: &FormatOptions) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!(
                "FAKE HAL DRY RUN: mkfs.vfat {} ({})",
                device.display(),
                label
            );
            return Ok(());
        }
        self.check_failure("format_vfat", Some(device))?;
        self.record(Operation::FormatVfat {
            device: device.to_path_buf(),
            label: label.to_string(),
        });
        Ok(())
    }

    fn set_reserved_percent(
        &self,
        device: &Path,
        percent: u8,
        opts: &FormatOptions,
    ) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!(
                "FAKE HAL DRY RUN: tune2fs -m {} {}",
                percent,
                device.display()
            );
            return Ok(());
        }
        self.check_failure("set_reserved_percent", Some(device))?;
        self.record(Operation::SetReservedPercent {
            device: device.to_path_buf(),
            percent,
        });
        Ok(())
    }
}

impl PartitionOps for FakeHal {
    fn apply_layout(&self, disk: &Path, script: &str, opts: &ProvisionOptions) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: sfdisk {}", disk.display());
            return Ok(());
        }
        self.check_failure("apply_layout", Some(disk))?;
        self.record(Operation::ApplyLayout {
            disk: disk.to_path_buf(),
            script: script.to_string(),
        });
        Ok(())
    }
}

impl FreezeOps for FakeHal {
    fn freeze(&self, mountpoint: &Path) -> HalResult<()> {
        self.check_failure("freeze", Some(mountpoint))?;
        {
            let mut state = self.state.lock().unwrap();
            if !state.frozen.insert(mountpoint.to_path_buf()) {
                return Err(HalError::Other(format!(
                    "{} is already frozen",
                    mountpoint.display()
                )));
            }
        }
        self.record(Operation::Freeze {
            mountpoint: mountpoint.to_path_buf(),
        });
        Ok(())
    }

    fn thaw(&self, mountpoint: &Path) -> HalResult<()> {
        self.check_failure("thaw", Some(mountpoint))?;
        {
            let mut state = self.state.lock().unwrap();
            if !state.frozen.remove(mountpoint) {
                return Err(HalError::Other(format!(
                    "{} is not frozen",
                    mountpoint.display()
                )));
            }
        }
        self.record(Operation::Thaw {
            mountpoint: mountpoint.to_path_buf(),
        });
        Ok(())
    }
}

impl ImagingOps for FakeHal {
    fn duplicate(&self, source: &Path, target: &Path, opts: &ImagingOptions) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!(
                "FAKE HAL DRY RUN: duplicate {} -> {}",
                source.display(),
                target.display()
            );
            return Ok(());
        }
        self.check_failure("duplicate", Some(target))?;
        {
            // A raw copy carries the source UUID along.
            let mut state = self.state.lock().unwrap();
            let uuid = state
                .uuids
                .get(source)
                .cloned()
                .unwrap_or_else(|| "source-uuid".to_string());
            state.uuids.insert(target.to_path_buf(), uuid);
        }
        self.record(Operation::Duplicate {
            source: source.to_path_buf(),
            target: target.to_path_buf(),
        });
        Ok(())
    }

    fn refresh_uuid(&self, device: &Path, opts: &ImagingOptions) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: tune2fs -U random {}", device.display());
            return Ok(());
        }
        self.check_failure("refresh_uuid", Some(device))?;
        let uuid = {
            let mut state = self.state.lock().unwrap();
            state.uuid_counter += 1;
            let uuid = format!("fake-uuid-{:04}", state.uuid_counter);
            state.uuids.insert(device.to_path_buf(), uuid.clone());
            uuid
        };
        self.record(Operation::RefreshUuid {
            device: device.to_path_buf(),
            uuid,
        });
        Ok(())
    }

    fn check_filesystem(&self, device: &Path, opts: &ImagingOptions) -> HalResult<()> {
        if !opts.dry_run && !opts.confirmed {
            return Err(HalError::SafetyLock);
        }
        if opts.dry_run {
            log::info!("FAKE HAL DRY RUN: e2fsck -f -y {}", device.display());
            return Ok(());
        }
        self.check_failure("check_filesystem", Some(device))?;
        self.record(Operation::CheckFilesystem {
            device: device.to_path_buf(),
        });
        Ok(())
    }
}

impl ChrootOps for FakeHal {
    fn run_in_slot(
        &self,
        disk: &Path,
        partset: &str,
        command: &[&str],
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "FAKE HAL DRY RUN: chroot [{}] {}",
                partset,
                command.join(" ")
            );
            return Ok(());
        }
        self.check_failure("run_in_slot", Some(disk))?;
        self.record(Operation::ChrootRun {
            disk: disk.to_path_buf(),
            partset: partset.to_string(),
            command: command.iter().map(|s| s.to_string()).collect(),
        });
        Ok(())
    }
}

impl SystemOps for FakeHal {
    fn sync(&self) -> HalResult<()> {
        self.check_failure("sync", None)?;
        self.record(Operation::Sync);
        Ok(())
    }

    fn udev_settle(&self) -> HalResult<()> {
        self.check_failure("udev_settle", None)?;
        self.record(Operation::UdevSettle);
        Ok(())
    }

    fn power(&self, action: PowerAction, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("FAKE HAL DRY RUN: systemctl {}", action.as_str());
            return Ok(());
        }
        self.check_failure("power", None)?;
        self.record(Operation::Power { action });
        Ok(())
    }
}
