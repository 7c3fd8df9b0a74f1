use crate::FreezeOps;
use std::path::{Path, PathBuf};

/// RAII guard holding a filesystem frozen, thawing it when dropped.
///
/// Acquiring the freeze through [`FreezeGuard::freeze`] guarantees the
/// matching thaw runs exactly once on every exit path: normal return,
/// error propagation out of the imaging sequence, or a termination
/// signal surfaced as an error further up the stack.
#[derive(Debug)]
pub struct FreezeGuard<'a, H: FreezeOps + ?Sized> {
    hal: &'a H,
    mountpoint: PathBuf,
}

impl<'a, H: FreezeOps + ?Sized> FreezeGuard<'a, H> {
    /// Freeze `mountpoint` and return the guard keeping it frozen.
    pub fn freeze(hal: &'a H, mountpoint: impl Into<PathBuf>) -> opal_error::HalResult<Self> {
        let mountpoint = mountpoint.into();
        hal.freeze(&mountpoint)?;
        Ok(Self { hal, mountpoint })
    }

    pub fn mountpoint(&self) -> &Path {
        &self.mountpoint
    }
}

impl<'a, H: FreezeOps + ?Sized> Drop for FreezeGuard<'a, H> {
    fn drop(&mut self) {
        if let Err(err) = self.hal.thaw(&self.mountpoint) {
            log::warn!(
                "freeze guard failed to thaw {}: {}",
                self.mountpoint.display(),
                err
            );
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{FakeHal, Operation};
    use std::path::Path;

    #[test]
    fn freeze_guard_thaws_on_drop() {
        let hal = FakeHal::new();
        let mountpoint = Path::new("/run/opal/sysroot");

        {
            let guard = FreezeGuard::freeze(&hal, mountpoint).unwrap();
            assert_eq!(guard.mountpoint(), mountpoint);
            assert!(hal.is_frozen(mountpoint));
        }

        assert!(!hal.is_frozen(mountpoint));
        let thaws = hal
            .operations()
            .iter()
            .filter(|op| matches!(op, Operation::Thaw { .. }))
            .count();
        assert_eq!(thaws, 1);
    }

    #[test]
    fn failed_freeze_produces_no_guard_and_no_thaw() {
        let hal = FakeHal::new();
        hal.fail_on("freeze");

        let err = FreezeGuard::freeze(&hal, Path::new("/run/opal/sysroot"));
        assert!(err.is_err());
        assert!(!hal.has_operation(|op| matches!(op, Operation::Thaw { .. })));
    }
}
