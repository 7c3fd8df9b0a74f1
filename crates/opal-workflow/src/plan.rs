//! Execution intents for one repair run.

use std::fmt;

/// The three independent rewrite intents plus the verification toggle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ExecutionPlan {
    /// Rewrite the whole partition table (full reimage).
    pub rewrite_partition_table: bool,
    /// Re-image both OS slots from the live source root.
    pub rewrite_os: bool,
    /// Reformat the home and var user data.
    pub rewrite_home: bool,
    /// Pre-flight verification of partition types and labels.
    pub verify: bool,
}

impl ExecutionPlan {
    pub fn full_reimage() -> Self {
        Self {
            rewrite_partition_table: true,
            rewrite_os: true,
            rewrite_home: true,
            verify: true,
        }
    }

    pub fn os_only() -> Self {
        Self {
            rewrite_partition_table: false,
            rewrite_os: true,
            rewrite_home: false,
            verify: true,
        }
    }

    pub fn home_only() -> Self {
        Self {
            rewrite_partition_table: false,
            rewrite_os: false,
            rewrite_home: true,
            verify: true,
        }
    }

    /// Verification is skipped when the table itself is rewritten: the
    /// table write establishes ground truth.
    pub fn verification_enabled(&self) -> bool {
        self.verify && !self.rewrite_partition_table
    }

    /// var is reformatted under either rewrite intent; a freshly imaged
    /// OS slot expects a clean var.
    pub fn formats_var(&self) -> bool {
        self.rewrite_os || self.rewrite_home
    }

    pub fn is_noop(&self) -> bool {
        !self.rewrite_partition_table && !self.rewrite_os && !self.rewrite_home
    }

    pub fn summary_lines(&self) -> Vec<String> {
        let on_off = |flag: bool| if flag { "yes" } else { "no" };
        vec![
            "Execution plan:".to_string(),
            format!("01. Partition table rewrite — {}", on_off(self.rewrite_partition_table)),
            format!("02. OS slot reimage — {}", on_off(self.rewrite_os)),
            format!("03. Home/var rewrite — {}", on_off(self.rewrite_home)),
            format!(
                "04. Pre-flight verification — {}",
                on_off(self.verification_enabled())
            ),
        ]
    }
}

impl fmt::Display for ExecutionPlan {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for line in self.summary_lines() {
            writeln!(f, "{}", line)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn table_rewrite_disables_verification() {
        let plan = ExecutionPlan::full_reimage();
        assert!(plan.verify);
        assert!(!plan.verification_enabled());
    }

    #[test]
    fn partial_plans_keep_verification() {
        assert!(ExecutionPlan::os_only().verification_enabled());
        assert!(ExecutionPlan::home_only().verification_enabled());
    }

    #[test]
    fn var_is_formatted_under_either_intent() {
        assert!(ExecutionPlan::os_only().formats_var());
        assert!(ExecutionPlan::home_only().formats_var());
        assert!(!ExecutionPlan {
            rewrite_partition_table: false,
            rewrite_os: false,
            rewrite_home: false,
            verify: true,
        }
        .formats_var());
    }

    #[test]
    fn summary_reflects_effective_verification() {
        let lines = ExecutionPlan::full_reimage().summary_lines();
        assert!(lines
            .iter()
            .any(|l| l.contains("Pre-flight verification — no")));
    }
}
