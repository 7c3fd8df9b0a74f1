//! Partition table application.

use opal_error::HalResult;
use std::path::Path;

/// Trait for applying a declarative partition layout to a whole disk.
pub trait PartitionOps {
    /// Apply an sfdisk script to `disk`, replacing the entire partition
    /// layout in one pass. There is no partial application: the
    /// underlying tool either writes the whole table or fails.
    fn apply_layout(&self, disk: &Path, script: &str, opts: &ProvisionOptions) -> HalResult<()>;
}

/// Options for partition provisioning.
#[derive(Debug, Clone)]
pub struct ProvisionOptions {
    /// If true, log the operation but don't execute it
    pub dry_run: bool,
    /// If true, the user has confirmed the destructive operation
    pub confirmed: bool,
}

impl ProvisionOptions {
    pub fn new(dry_run: bool, confirmed: bool) -> Self {
        Self { dry_run, confirmed }
    }
}
