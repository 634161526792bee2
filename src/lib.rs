//! fake_gcs_harness - integration-test harness for emulated object storage
//!
//! Starts a storage emulator (fsouza/fake-gcs-server) in a disposable
//! container, waits for readiness, binds an anonymous client to it, and
//! runs ordered black-box scenario steps against the backend. Storage
//! semantics are the emulator's; this crate only orchestrates.

pub mod client;
pub mod config;
pub mod emulator;
pub mod error;
pub mod scenario;

pub use client::{BucketCreation, BucketMeta, ObjectMeta, StorageClient, StorageOps};
pub use config::{ClientSettings, ConfigError, CredentialsMode, EmulatorConfig, HarnessConfig};
pub use emulator::{Emulator, ReadinessProbe};
pub use error::HarnessError;
pub use scenario::{
    EnsureBucket, Scenario, ScenarioContext, ScenarioState, ScenarioStep, WriteObject,
    SCENARIO_BUCKET, SCENARIO_OBJECT, SCENARIO_PAYLOAD,
};

/// Install a tracing subscriber for harness runs. RUST_LOG wins when set;
/// safe to call from multiple tests, only the first call installs.
pub fn init_test_logging() {
    use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

    let _ = tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| "fake_gcs_harness=debug".into()),
        )
        .with(tracing_subscriber::fmt::layer())
        .try_init();
}
