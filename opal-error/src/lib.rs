use std::io;
use std::path::PathBuf;
use thiserror::Error;

pub type HalResult<T> = Result<T, HalError>;
pub type RepairResult<T> = Result<T, RepairError>;

#[derive(Error, Debug)]
pub enum HalError {
    #[error("Safety lock engaged. Confirm the destructive operation to proceed.")]
    SafetyLock,

    #[error("Command not found: {0}")]
    CommandNotFound(String),

    #[error("Command failed: {program} (exit={code:?}): {stderr}")]
    CommandFailed {
        program: String,
        code: Option<i32>,
        stderr: String,
    },

    #[error("Command timed out: {program} after {timeout_secs}s")]
    CommandTimeout { program: String, timeout_secs: u64 },

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("nix errno: {0}")]
    Nix(#[from] nix::errno::Errno),

    #[error("{0}")]
    Other(String),
}

#[derive(Error, Debug)]
pub enum RepairError {
    #[error(transparent)]
    Hal(#[from] HalError),

    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    #[error("{device}: filesystem type is {actual:?}, expected {expected:?}")]
    TypeMismatch {
        device: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("{device}: partition label is {actual:?}, expected {expected:?}")]
    LabelMismatch {
        device: PathBuf,
        expected: String,
        actual: String,
    },

    #[error("Source root device {0} not found. Is the installer medium still attached?")]
    SourceRootMissing(PathBuf),

    #[error("Disk {0} does not exist or is not a block device")]
    DiskNotFound(PathBuf),

    #[error("Interrupted by termination signal")]
    Interrupted,

    #[error("Operation aborted by user")]
    Aborted,
}

impl RepairError {
    /// Process exit code reported once the operator acknowledges the failure.
    pub fn exit_code(&self) -> i32 {
        match self {
            RepairError::TypeMismatch { .. } => 3,
            RepairError::LabelMismatch { .. } => 4,
            RepairError::SourceRootMissing(_) | RepairError::DiskNotFound(_) => 2,
            _ => 1,
        }
    }
}
