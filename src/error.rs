//! Error taxonomy for the harness
//!
//! Infrastructure failures (startup, configuration) abort the whole run.
//! Bucket creation failures other than already-exists are fatal. Assertion
//! failures are reported per scenario step and never retried.

use thiserror::Error;

/// Errors surfaced by the harness.
#[derive(Debug, Error)]
pub enum HarnessError {
    /// The emulator image could not be obtained, the container could not be
    /// launched, or the readiness probe did not succeed within its timeout.
    #[error("emulator startup failed: {0}")]
    Startup(String),

    /// The client could not be bound to the emulator address.
    #[error("client configuration failed: {0}")]
    Configuration(String),

    /// Bucket creation failed for a reason other than the bucket already
    /// existing. Already-exists is tolerated by the ensure-bucket step and
    /// never reaches this variant.
    #[error("bucket creation failed: {0}")]
    Creation(String),

    /// A storage operation failed at the transport level.
    #[error("storage operation failed: {0}")]
    Storage(String),

    /// Observed state did not match what a scenario step expected.
    #[error("assertion failed: {0}")]
    Assertion(String),
}

impl HarnessError {
    /// True for failures that abort the run before any scenario step.
    pub fn is_infrastructure(&self) -> bool {
        matches!(self, HarnessError::Startup(_) | HarnessError::Configuration(_))
    }
}
