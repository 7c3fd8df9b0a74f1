//! Top-level repair driver.
//!
//! Strictly sequential: verification gate, partition provisioner,
//! format stage, slot imaging engine, finalization, final sync. No
//! stage is retried; the first failure propagates out, and the freeze
//! guard held across the destructive stages thaws the source on every
//! path.

use crate::layout::DiskTarget;
use crate::plan::ExecutionPlan;
use crate::imaging::SourceRoot;
use crate::{cancel, finalize, format, imaging, provision, verify};
use opal_error::RepairError;
use opal_hal::RepairHal;

/// Options threaded through every stage of a run.
#[derive(Debug, Clone, Copy)]
pub struct RunOptions {
    /// If true, log intended operations but don't execute them
    pub dry_run: bool,
    /// If true, the user has confirmed the destructive run
    pub confirmed: bool,
}

impl RunOptions {
    pub fn new(dry_run: bool, confirmed: bool) -> Self {
        Self { dry_run, confirmed }
    }
}

/// Execute `plan` against `target`, imaging from `source`.
pub fn run_repair<H: RepairHal + ?Sized>(
    hal: &H,
    target: &DiskTarget,
    plan: &ExecutionPlan,
    source: &SourceRoot,
    opts: &RunOptions,
) -> Result<(), RepairError> {
    if plan.is_noop() {
        log::info!("Nothing to do; no rewrite intent set");
        return Ok(());
    }

    verify::verify_plan_targets(hal, target, plan)?;

    cancel::check()?;
    if plan.rewrite_partition_table {
        provision::apply_partition_table(hal, target, opts)?;
    }

    cancel::check()?;
    format::run_format_stage(hal, target, plan, opts)?;

    // The guard (and with it the freeze) lives until this function
    // returns, so finalization runs against the same point-in-time
    // source and the thaw is the last thing to happen.
    let _freeze_guard = if plan.rewrite_os {
        cancel::check()?;
        let guard = imaging::run_imaging(hal, target, source, opts)?;

        cancel::check()?;
        finalize::run_finalize(hal, target, opts)?;
        Some(guard)
    } else {
        None
    };

    hal.sync()?;
    log::info!("Repair complete for {}", target.disk().display());
    Ok(())
}
