//! Linux HAL implementation using real system calls and tools.

use super::chroot_ops::ChrootOps;
use super::format_ops::{FormatOps, FormatOptions};
use super::freeze_ops::FreezeOps;
use super::imaging_ops::{ImagingOps, ImagingOptions};
use super::mount_ops::MountOps;
use super::partition_ops::{PartitionOps, ProvisionOptions};
use super::probe_ops::{DiskInfo, ProbeOps};
use super::system_ops::{PowerAction, SystemOps};
use opal_error::{HalError, HalResult};
use std::fs;
use std::io::{self, Read, Write};
use std::path::{Path, PathBuf};
use std::process::{Command, Output, Stdio};
use std::time::Duration;
use wait_timeout::ChildExt;

/// Real HAL implementation for Linux systems.
#[derive(Debug, Clone, Default)]
pub struct LinuxHal;

impl LinuxHal {
    pub fn new() -> Self {
        Self
    }
}

const PROBE_TIMEOUT: Duration = Duration::from_secs(10);
const SYNC_TIMEOUT: Duration = Duration::from_secs(60);
const FORMAT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const SFDISK_TIMEOUT: Duration = Duration::from_secs(5 * 60);
const FREEZE_TIMEOUT: Duration = Duration::from_secs(60);
const TUNE_TIMEOUT: Duration = Duration::from_secs(60);
const FSCK_TIMEOUT: Duration = Duration::from_secs(15 * 60);
const CHROOT_TIMEOUT: Duration = Duration::from_secs(10 * 60);
const POWER_TIMEOUT: Duration = Duration::from_secs(30);

fn map_command_err(program: &str, err: std::io::Error) -> HalError {
    if err.kind() == std::io::ErrorKind::NotFound {
        return HalError::CommandNotFound(program.to_string());
    }
    HalError::Io(err)
}

fn output_failed(program: &str, output: &Output) -> HalError {
    HalError::CommandFailed {
        program: program.to_string(),
        code: output.status.code(),
        stderr: String::from_utf8_lossy(&output.stderr).trim().to_string(),
    }
}

fn output_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<Output> {
    output_with_stdin_timeout(program, cmd, None, timeout)
}

fn output_with_stdin_timeout(
    program: &str,
    cmd: &mut Command,
    stdin_data: Option<&str>,
    timeout: Duration,
) -> HalResult<Output> {
    cmd.stdout(Stdio::piped()).stderr(Stdio::piped());
    if stdin_data.is_some() {
        cmd.stdin(Stdio::piped());
    }
    let mut child = cmd.spawn().map_err(|e| map_command_err(program, e))?;

    if let Some(data) = stdin_data {
        // Write the script and close the pipe so the tool sees EOF.
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(data.as_bytes())?;
        }
    }

    let mut stdout = child.stdout.take();
    let mut stderr = child.stderr.take();

    // Drain pipes concurrently to avoid deadlocks on large output.
    let stdout_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut out) = stdout.take() {
            let _ = out.read_to_end(&mut buf);
        }
        buf
    });
    let stderr_handle = std::thread::spawn(move || {
        let mut buf = Vec::new();
        if let Some(mut err) = stderr.take() {
            let _ = err.read_to_end(&mut buf);
        }
        buf
    });

    let status = match child.wait_timeout(timeout).map_err(HalError::Io)? {
        Some(status) => status,
        None => {
            let _ = child.kill();
            let _ = child.wait();
            let _ = stdout_handle.join();
            let _ = stderr_handle.join();
            return Err(HalError::CommandTimeout {
                program: program.to_string(),
                timeout_secs: timeout.as_secs(),
            });
        }
    };

    let stdout = stdout_handle.join().unwrap_or_default();
    let stderr = stderr_handle.join().unwrap_or_default();
    Ok(Output {
        status,
        stdout,
        stderr,
    })
}

fn status_with_timeout(program: &str, cmd: &mut Command, timeout: Duration) -> HalResult<()> {
    let output = output_with_timeout(program, cmd, timeout)?;
    if !output.status.success() {
        return Err(output_failed(program, &output));
    }
    Ok(())
}

fn map_nix_err(err: nix::errno::Errno) -> HalError {
    use nix::errno::Errno;
    match err {
        Errno::EACCES | Errno::EPERM => HalError::Other("permission denied".to_string()),
        other => HalError::Nix(other),
    }
}

/// Query one blkid tag. blkid exits 2 when the device carries no match
/// for the tag; that is "no value", not a failure.
fn blkid_value(tag: &str, device: &Path) -> HalResult<String> {
    let mut cmd = Command::new("blkid");
    cmd.args(["-s", tag, "-o", "value"]).arg(device);
    let output = output_with_timeout("blkid", &mut cmd, PROBE_TIMEOUT)?;

    if !output.status.success() {
        if output.status.code() == Some(2) {
            return Ok(String::new());
        }
        return Err(output_failed("blkid", &output));
    }

    Ok(String::from_utf8_lossy(&output.stdout).trim().to_string())
}

impl ProbeOps for LinuxHal {
    fn list_disks(&self) -> HalResult<Vec<DiskInfo>> {
        let mut cmd = Command::new("lsblk");
        cmd.args(["-dnpo", "NAME,SIZE,MODEL"]);
        let output = output_with_timeout("lsblk", &mut cmd, PROBE_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("lsblk", &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut disks = Vec::new();
        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            let mut fields = line.split_whitespace();
            let Some(name) = fields.next() else { continue };
            let size = fields.next().unwrap_or("").to_string();
            let model = fields.collect::<Vec<_>>().join(" ");
            disks.push(DiskInfo {
                path: PathBuf::from(name),
                size,
                model,
            });
        }
        Ok(disks)
    }

    fn mountpoints(&self, disk: &Path) -> HalResult<Vec<PathBuf>> {
        let mut cmd = Command::new("lsblk");
        cmd.args(["-lnpo", "MOUNTPOINT"]).arg(disk);
        let output = output_with_timeout("lsblk", &mut cmd, PROBE_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("lsblk", &output));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        let mut mountpoints = Vec::new();
        for line in stdout.lines().map(str::trim).filter(|l| !l.is_empty()) {
            mountpoints.push(PathBuf::from(line));
        }
        Ok(mountpoints)
    }

    fn fstype(&self, device: &Path) -> HalResult<String> {
        blkid_value("TYPE", device)
    }

    fn partlabel(&self, device: &Path) -> HalResult<String> {
        blkid_value("PARTLABEL", device)
    }
}

impl MountOps for LinuxHal {
    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: unmount {}", target.display());
            return Ok(());
        }

        nix::mount::umount2(target, nix::mount::MntFlags::empty()).map_err(map_nix_err)?;

        Ok(())
    }
}

impl FormatOps for LinuxHal {
    fn format_ext4(&self, device: &Path, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: mkfs.ext4 {}", device.display());
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut args: Vec<String> = vec!["-F".to_string()];
        args.extend(opts.extra_args.iter().cloned());
        args.push(device.display().to_string());

        let mut cmd = Command::new("mkfs.ext4");
        cmd.args(&args);
        let output = output_with_timeout("mkfs.ext4", &mut cmd, FORMAT_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("mkfs.ext4", &output));
        }

        Ok(())
    }

    fn format_vfat(&self, device: &Path, label: &str, opts: &FormatOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: mkfs.vfat {} ({})", device.display(), label);
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut args: Vec<String> = vec!["-F".to_string(), "32".to_string()];
        args.push("-n".to_string());
        args.push(label.to_string());
        args.extend(opts.extra_args.iter().cloned());
        args.push(device.display().to_string());

        let mut cmd = Command::new("mkfs.vfat");
        cmd.args(&args);
        let output = output_with_timeout("mkfs.vfat", &mut cmd, FORMAT_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("mkfs.vfat", &output));
        }

        Ok(())
    }

    fn set_reserved_percent(
        &self,
        device: &Path,
        percent: u8,
        opts: &FormatOptions,
    ) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: tune2fs -m {} {}", percent, device.display());
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut cmd = Command::new("tune2fs");
        cmd.args(["-m", &percent.to_string()]).arg(device);
        status_with_timeout("tune2fs", &mut cmd, TUNE_TIMEOUT)
    }
}

impl PartitionOps for LinuxHal {
    fn apply_layout(&self, disk: &Path, script: &str, opts: &ProvisionOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: sfdisk {}\n{}", disk.display(), script);
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut cmd = Command::new("sfdisk");
        cmd.arg(disk);
        let output = output_with_stdin_timeout("sfdisk", &mut cmd, Some(script), SFDISK_TIMEOUT)?;

        if !output.status.success() {
            return Err(output_failed("sfdisk", &output));
        }

        Ok(())
    }
}

impl FreezeOps for LinuxHal {
    fn freeze(&self, mountpoint: &Path) -> HalResult<()> {
        let mut cmd = Command::new("fsfreeze");
        cmd.arg("-f").arg(mountpoint);
        status_with_timeout("fsfreeze", &mut cmd, FREEZE_TIMEOUT)
    }

    fn thaw(&self, mountpoint: &Path) -> HalResult<()> {
        let mut cmd = Command::new("fsfreeze");
        cmd.arg("-u").arg(mountpoint);
        status_with_timeout("fsfreeze", &mut cmd, FREEZE_TIMEOUT)
    }
}

impl ImagingOps for LinuxHal {
    fn duplicate(&self, source: &Path, target: &Path, opts: &ImagingOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!(
                "DRY RUN: duplicate {} -> {}",
                source.display(),
                target.display()
            );
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        log::info!("Duplicating {} -> {}", source.display(), target.display());

        let mut input = fs::File::open(source)?;

        let mut out = fs::OpenOptions::new()
            .write(true)
            .create(true)
            .truncate(false)
            .open(target)?;

        io::copy(&mut input, &mut out)?;

        // Best-effort flush (block devices may ignore).
        out.sync_all().ok();

        Ok(())
    }

    fn refresh_uuid(&self, device: &Path, opts: &ImagingOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: tune2fs -U random {}", device.display());
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut cmd = Command::new("tune2fs");
        cmd.args(["-U", "random"]).arg(device);
        status_with_timeout("tune2fs", &mut cmd, TUNE_TIMEOUT)
    }

    fn check_filesystem(&self, device: &Path, opts: &ImagingOptions) -> HalResult<()> {
        if opts.dry_run {
            log::info!("DRY RUN: e2fsck -f -y {}", device.display());
            return Ok(());
        }

        if !opts.confirmed {
            return Err(HalError::SafetyLock);
        }

        let mut cmd = Command::new("e2fsck");
        cmd.args(["-f", "-y"]).arg(device);
        let output = output_with_timeout("e2fsck", &mut cmd, FSCK_TIMEOUT)?;

        // e2fsck contract: 0 = clean, 1 = errors corrected; both are a
        // structurally sound filesystem. Anything higher is a failure.
        match output.status.code() {
            Some(0) | Some(1) => Ok(()),
            _ => Err(output_failed("e2fsck", &output)),
        }
    }
}

impl ChrootOps for LinuxHal {
    fn run_in_slot(
        &self,
        disk: &Path,
        partset: &str,
        command: &[&str],
        dry_run: bool,
    ) -> HalResult<()> {
        if dry_run {
            log::info!(
                "DRY RUN: opal-chroot --no-overlay --disk {} --partset {} -- {}",
                disk.display(),
                partset,
                command.join(" ")
            );
            return Ok(());
        }

        let mut cmd = Command::new("opal-chroot");
        cmd.arg("--no-overlay")
            .arg("--disk")
            .arg(disk)
            .args(["--partset", partset, "--"])
            .args(command);
        status_with_timeout("opal-chroot", &mut cmd, CHROOT_TIMEOUT)
    }
}

impl SystemOps for LinuxHal {
    fn sync(&self) -> HalResult<()> {
        let mut cmd = Command::new("sync");
        status_with_timeout("sync", &mut cmd, SYNC_TIMEOUT)
    }

    fn udev_settle(&self) -> HalResult<()> {
        let mut cmd = Command::new("udevadm");
        cmd.arg("settle");
        status_with_timeout("udevadm", &mut cmd, SYNC_TIMEOUT)
    }

    fn power(&self, action: PowerAction, dry_run: bool) -> HalResult<()> {
        if dry_run {
            log::info!("DRY RUN: systemctl {}", action.as_str());
            return Ok(());
        }

        let mut cmd = Command::new("systemctl");
        cmd.arg(action.as_str());
        status_with_timeout("systemctl", &mut cmd, POWER_TIMEOUT)
    }
}
