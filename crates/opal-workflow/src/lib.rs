//! Repair orchestration for dual-boot-slot Opal devices.
//!
//! The entry point is [`repair::run_repair`], which sequences the
//! verification gate, partition provisioner, format stage, slot imaging
//! engine, and finalization against any [`opal_hal::RepairHal`].

pub mod cancel;
pub mod finalize;
pub mod format;
pub mod imaging;
pub mod layout;
pub mod plan;
pub mod provision;
pub mod repair;
#[cfg(test)]
mod test_env;
pub mod verify;

pub use imaging::SourceRoot;
pub use layout::{DiskTarget, PartitionSpec, Slot, PARTITION_TABLE};
pub use plan::ExecutionPlan;
pub use repair::{run_repair, RunOptions};
