//! Unmount operations.

use opal_error::HalResult;
use std::path::Path;

/// Trait for detaching filesystems from the mount tree.
pub trait MountOps {
    /// Unmount `target`.
    fn unmount(&self, target: &Path, dry_run: bool) -> HalResult<()>;
}
