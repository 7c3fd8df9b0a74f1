//! Pre-flight verification gate.
//!
//! A partial repair writes into an existing layout, so every partition it
//! is about to touch must look exactly as expected first. A mismatch
//! means the on-disk layout has diverged from assumptions and any further
//! destructive action is unsafe; the resulting error is terminal, not
//! retryable.

use crate::layout::{DiskTarget, ExpectedPartition, VERIFIED_PARTITIONS};
use crate::plan::ExecutionPlan;
use opal_error::RepairError;
use opal_hal::ProbeOps;
use std::path::Path;

/// Check one partition's filesystem type and label against expectations.
pub fn verify_partition<H: ProbeOps + ?Sized>(
    hal: &H,
    device: &Path,
    expected: &ExpectedPartition,
) -> Result<(), RepairError> {
    let actual_type = hal.fstype(device)?;
    if actual_type != expected.fstype {
        return Err(RepairError::TypeMismatch {
            device: device.to_path_buf(),
            expected: expected.fstype.to_string(),
            actual: actual_type,
        });
    }

    let actual_label = hal.partlabel(device)?;
    if actual_label != expected.label {
        return Err(RepairError::LabelMismatch {
            device: device.to_path_buf(),
            expected: expected.label.to_string(),
            actual: actual_label,
        });
    }

    Ok(())
}

/// Partition indices the plan will write to, in physical order.
fn target_indices(plan: &ExecutionPlan) -> Vec<u32> {
    let mut indices = Vec::new();
    if plan.rewrite_os {
        // ESP, both EFI partitions, and both var partitions.
        indices.extend([1, 2, 3, 6, 7]);
    }
    if plan.rewrite_home {
        for index in [6, 7, 8] {
            if !indices.contains(&index) {
                indices.push(index);
            }
        }
    }
    indices.sort_unstable();
    indices
}

/// Gate a partial repair: every partition the plan touches must match
/// the expected layout before any destructive step runs.
pub fn verify_plan_targets<H: ProbeOps + ?Sized>(
    hal: &H,
    target: &DiskTarget,
    plan: &ExecutionPlan,
) -> Result<(), RepairError> {
    if !plan.verification_enabled() {
        log::info!("Verification skipped");
        return Ok(());
    }

    let indices = target_indices(plan);
    for expected in VERIFIED_PARTITIONS
        .iter()
        .filter(|expected| indices.contains(&expected.index))
    {
        let device = target.partition_device(expected.index);
        log::info!(
            "Verifying {} (expect {} \"{}\")",
            device.display(),
            expected.fstype,
            expected.label
        );
        verify_partition(hal, &device, expected)?;
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use opal_hal::{FakeHal, Operation};

    fn conformant_hal(target: &DiskTarget) -> FakeHal {
        let hal = FakeHal::new();
        for expected in &VERIFIED_PARTITIONS {
            hal.set_probe(
                target.partition_device(expected.index),
                expected.fstype,
                expected.label,
            );
        }
        hal
    }

    #[test]
    fn conformant_layout_passes() {
        let target = DiskTarget::new("/dev/sda");
        let hal = conformant_hal(&target);

        verify_plan_targets(&hal, &target, &ExecutionPlan::os_only()).unwrap();
        verify_plan_targets(&hal, &target, &ExecutionPlan::home_only()).unwrap();
    }

    #[test]
    fn type_mismatch_is_reported_with_both_values() {
        let target = DiskTarget::new("/dev/sda");
        let hal = conformant_hal(&target);
        hal.set_probe("/dev/sda6", "btrfs", "var-A");

        let err = verify_plan_targets(&hal, &target, &ExecutionPlan::os_only()).unwrap_err();
        match err {
            RepairError::TypeMismatch {
                device,
                expected,
                actual,
            } => {
                assert_eq!(device, target.partition_device(6));
                assert_eq!(expected, "ext4");
                assert_eq!(actual, "btrfs");
            }
            other => panic!("expected type mismatch, got {other:?}"),
        }
    }

    #[test]
    fn label_mismatch_is_distinct_from_type_mismatch() {
        let target = DiskTarget::new("/dev/sda");
        let hal = conformant_hal(&target);
        hal.set_probe("/dev/sda6", "ext4", "var-B");

        let err = verify_plan_targets(&hal, &target, &ExecutionPlan::home_only()).unwrap_err();
        assert!(matches!(err, RepairError::LabelMismatch { .. }));
    }

    #[test]
    fn disabled_verification_probes_nothing() {
        let target = DiskTarget::new("/dev/sda");
        let hal = FakeHal::new();

        let mut plan = ExecutionPlan::os_only();
        plan.verify = false;
        verify_plan_targets(&hal, &target, &plan).unwrap();

        let full = ExecutionPlan::full_reimage();
        verify_plan_targets(&hal, &target, &full).unwrap();

        assert!(!hal.has_operation(|op| matches!(
            op,
            Operation::Fstype { .. } | Operation::Partlabel { .. }
        )));
    }

    #[test]
    fn home_plan_gates_var_and_home_only() {
        let plan = ExecutionPlan::home_only();
        assert_eq!(target_indices(&plan), vec![6, 7, 8]);

        let os = ExecutionPlan::os_only();
        assert_eq!(target_indices(&os), vec![1, 2, 3, 6, 7]);
    }
}
