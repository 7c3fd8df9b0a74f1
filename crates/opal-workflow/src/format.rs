//! Auxiliary partition formatting.

use crate::layout::{DiskTarget, Slot};
use crate::plan::ExecutionPlan;
use crate::repair::RunOptions;
use opal_error::RepairError;
use opal_hal::{FormatOps, FormatOptions};

/// Format var and home per the plan's intents. var is recreated under
/// either rewrite intent; home additionally gets case-insensitive
/// directory lookups, larger inodes, and a zero reserved-block
/// reservation.
pub fn run_format_stage<H: FormatOps + ?Sized>(
    hal: &H,
    target: &DiskTarget,
    plan: &ExecutionPlan,
    opts: &RunOptions,
) -> Result<(), RepairError> {
    let format_opts = FormatOptions::new(opts.dry_run, opts.confirmed);

    if plan.formats_var() {
        for slot in Slot::BOTH {
            let device = target.var_device(slot);
            log::info!("Formatting {} (var-{})", device.display(), slot);
            hal.format_ext4(&device, &format_opts)?;
        }
    }

    if plan.rewrite_home {
        let device = target.home_device();
        log::info!("Formatting {} (home)", device.display());
        // casefold wants the larger inode size for its directory hashes.
        let home_opts = FormatOptions::new(opts.dry_run, opts.confirmed).with_args(vec![
            "-O".to_string(),
            "casefold".to_string(),
            "-I".to_string(),
            "512".to_string(),
        ]);
        hal.format_ext4(&device, &home_opts)?;
        hal.set_reserved_percent(&device, 0, &format_opts)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_hal::{FakeHal, Operation};
    use std::path::PathBuf;

    #[test]
    fn os_intent_formats_both_var_partitions() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");

        run_format_stage(
            &hal,
            &target,
            &ExecutionPlan::os_only(),
            &RunOptions::new(false, true),
        )
        .unwrap();

        for index in [6u32, 7] {
            let device = target.partition_device(index);
            assert!(hal.has_operation(
                |op| matches!(op, Operation::FormatExt4 { device: d, .. } if *d == device)
            ));
        }
        assert!(!hal.has_operation(
            |op| matches!(op, Operation::FormatExt4 { device, .. } if *device == PathBuf::from("/dev/sda8"))
        ));
    }

    #[test]
    fn home_intent_formats_home_with_casefold_then_drops_reserve() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");

        run_format_stage(
            &hal,
            &target,
            &ExecutionPlan::home_only(),
            &RunOptions::new(false, true),
        )
        .unwrap();

        let home = target.home_device();
        let ops = hal.operations();
        let format_pos = ops
            .iter()
            .position(|op| {
                matches!(op, Operation::FormatExt4 { device, extra_args }
                    if *device == home
                        && extra_args == &["-O", "casefold", "-I", "512"])
            })
            .expect("home formatted with casefold and large inodes");
        let reserve_pos = ops
            .iter()
            .position(|op| {
                matches!(op, Operation::SetReservedPercent { device, percent }
                    if *device == home && *percent == 0)
            })
            .expect("home reserved blocks dropped to zero");
        assert!(format_pos < reserve_pos);
    }

    #[test]
    fn noop_plan_formats_nothing() {
        let hal = FakeHal::new();
        let target = DiskTarget::new("/dev/sda");
        let plan = ExecutionPlan {
            rewrite_partition_table: false,
            rewrite_os: false,
            rewrite_home: false,
            verify: true,
        };

        run_format_stage(&hal, &target, &plan, &RunOptions::new(false, true)).unwrap();
        assert_eq!(hal.operation_count(), 0);
    }
}
