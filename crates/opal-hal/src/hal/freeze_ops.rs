//! Filesystem freeze and thaw.

use opal_error::HalResult;
use std::path::Path;

/// Suspend and resume writes on a mounted filesystem.
///
/// A frozen filesystem presents an unchanging block image to readers of
/// its backing device, which is what makes raw duplication of a live
/// mount safe. Exactly one freeze may be active per mountpoint; callers
/// should hold the freeze through [`crate::FreezeGuard`] so the thaw is
/// guaranteed on every exit path.
pub trait FreezeOps {
    fn freeze(&self, mountpoint: &Path) -> HalResult<()>;

    fn thaw(&self, mountpoint: &Path) -> HalResult<()>;
}
