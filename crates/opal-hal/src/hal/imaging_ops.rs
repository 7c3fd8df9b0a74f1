//! Raw block duplication and post-copy filesystem tuning.

use opal_error::HalResult;
use std::path::Path;

/// Trait for duplicating a block image into an OS slot and making the
/// copy independent of its source.
pub trait ImagingOps {
    /// Copy the raw contents of `source` into `target`, byte for byte.
    fn duplicate(&self, source: &Path, target: &Path, opts: &ImagingOptions) -> HalResult<()>;

    /// Regenerate the filesystem UUID on `device`. A raw duplicate keeps
    /// the source's UUID; two filesystems sharing one breaks tooling
    /// that assumes uniqueness.
    fn refresh_uuid(&self, device: &Path, opts: &ImagingOptions) -> HalResult<()>;

    /// Structural consistency check of the filesystem on `device`.
    fn check_filesystem(&self, device: &Path, opts: &ImagingOptions) -> HalResult<()>;
}

/// Options for imaging operations.
#[derive(Debug, Clone)]
pub struct ImagingOptions {
    /// If true, log the operation but don't execute it
    pub dry_run: bool,
    /// If true, the user has confirmed the destructive operation
    pub confirmed: bool,
}

impl ImagingOptions {
    pub fn new(dry_run: bool, confirmed: bool) -> Self {
        Self { dry_run, confirmed }
    }
}
