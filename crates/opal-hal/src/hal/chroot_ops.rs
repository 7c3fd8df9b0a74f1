//! Chrooted command execution inside a target OS slot.

use opal_error::HalResult;
use std::path::Path;

/// Run commands inside a target slot's filesystem tree.
///
/// The production implementation drives the external `opal-chroot`
/// helper, which mounts the slot's partition set for the given disk
/// without applying a live overlay. Exit-code contract: zero is success,
/// anything else is fatal to the caller.
pub trait ChrootOps {
    fn run_in_slot(
        &self,
        disk: &Path,
        partset: &str,
        command: &[&str],
        dry_run: bool,
    ) -> HalResult<()>;
}
