//! Read-only block device queries.

use opal_error::HalResult;
use std::path::{Path, PathBuf};

/// A whole physical disk as reported by the block-device listing.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct DiskInfo {
    pub path: PathBuf,
    pub size: String,
    pub model: String,
}

/// Trait for read-only device probing.
pub trait ProbeOps {
    /// List whole disks (never partitions) visible to the system.
    fn list_disks(&self) -> HalResult<Vec<DiskInfo>>;

    /// Mountpoints currently backed by `disk` or any of its partitions.
    fn mountpoints(&self, disk: &Path) -> HalResult<Vec<PathBuf>>;

    /// Filesystem type of `device` as reported by blkid. Returns an empty
    /// string when the device carries no recognizable filesystem.
    fn fstype(&self, device: &Path) -> HalResult<String>;

    /// GPT partition label of `device` as reported by blkid. Returns an
    /// empty string when the device carries no label.
    fn partlabel(&self, device: &Path) -> HalResult<String>;
}
