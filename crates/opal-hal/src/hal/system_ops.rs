//! Whole-system helper operations.

use opal_error::HalResult;

/// How to hand the machine back after a completed repair.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum PowerAction {
    Reboot,
    Poweroff,
}

impl PowerAction {
    pub fn as_str(&self) -> &'static str {
        match self {
            PowerAction::Reboot => "reboot",
            PowerAction::Poweroff => "poweroff",
        }
    }
}

/// Trait for system-wide side operations.
pub trait SystemOps {
    /// Flush dirty pages to disk.
    fn sync(&self) -> HalResult<()>;

    /// Wait for udev to settle device nodes after a table rewrite.
    fn udev_settle(&self) -> HalResult<()>;

    /// Hand the machine to the service manager for a reboot or poweroff.
    fn power(&self, action: PowerAction, dry_run: bool) -> HalResult<()>;
}
