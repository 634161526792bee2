//! Shared test infrastructure for emulator integration tests
//!
//! Provides the shared emulator instance, client construction, unique
//! bucket names, and Docker availability gating.

#![allow(dead_code)]

use fake_gcs_harness::{ClientSettings, Emulator, EmulatorConfig, StorageClient};
use std::process::Command;
use std::sync::atomic::{AtomicU64, Ordering};
use tokio::sync::OnceCell;

/// Shared emulator for all tests in this binary.
/// Wrapped in `EmulatorGuard` to ensure Docker cleanup even though statics
/// never drop.
static EMULATOR: OnceCell<EmulatorGuard> = OnceCell::const_new();

/// Counter for unique bucket names
static BUCKET_COUNTER: AtomicU64 = AtomicU64::new(0);

/// Wrapper that registers an atexit handler to remove the emulator
/// container. `static` values are never dropped in Rust, so the container
/// handle's own teardown never fires. This guard captures the container ID
/// at creation and registers a synchronous `docker rm -f` via
/// `libc::atexit`.
struct EmulatorGuard {
    inner: Emulator,
}

impl EmulatorGuard {
    fn new(emulator: Emulator) -> Self {
        let id = emulator
            .container_id()
            .expect("running emulator has a container id")
            .to_string();
        // The closure must be 'static; intentionally leak the id String.
        let id_leaked: &'static str = String::leak(id);
        unsafe {
            libc::atexit(cleanup_container_trampoline);
        }
        CONTAINER_ID_FOR_CLEANUP
            .set(id_leaked)
            .unwrap_or_else(|_| panic!("EmulatorGuard created more than once"));

        Self { inner: emulator }
    }
}

/// The container ID to clean up at exit.
static CONTAINER_ID_FOR_CLEANUP: std::sync::OnceLock<&'static str> = std::sync::OnceLock::new();

/// C-compatible atexit callback — force-removes the emulator container.
extern "C" fn cleanup_container_trampoline() {
    if let Some(id) = CONTAINER_ID_FOR_CLEANUP.get() {
        let _ = Command::new("docker")
            .args(["rm", "-f", id])
            .stdout(std::process::Stdio::null())
            .stderr(std::process::Stdio::null())
            .status();
    }
}

/// Get or start the shared emulator for this test binary.
pub async fn shared_emulator() -> &'static Emulator {
    let guard = EMULATOR
        .get_or_init(|| async {
            fake_gcs_harness::init_test_logging();
            let emulator = Emulator::start(&EmulatorConfig::default())
                .await
                .expect("Failed to start storage emulator");
            EmulatorGuard::new(emulator)
        })
        .await;
    &guard.inner
}

/// Configure a fresh anonymous client against the shared emulator.
pub async fn shared_client() -> StorageClient {
    let emulator = shared_emulator().await;
    StorageClient::configure(emulator, &ClientSettings::default())
        .expect("Failed to configure storage client")
}

/// Generate a unique bucket name to isolate a test's state in the shared
/// emulator.
pub fn unique_bucket(label: &str) -> String {
    let counter = BUCKET_COUNTER.fetch_add(1, Ordering::SeqCst);
    let timestamp = std::time::SystemTime::now()
        .duration_since(std::time::UNIX_EPOCH)
        .unwrap()
        .as_millis();
    format!("{}-{}-{}", label, timestamp, counter)
}

/// Check if Docker is available by running `docker version`
pub fn docker_available() -> bool {
    Command::new("docker")
        .arg("version")
        .stdout(std::process::Stdio::null())
        .stderr(std::process::Stdio::null())
        .status()
        .map(|s| s.success())
        .unwrap_or(false)
}

/// Macro to skip a test if Docker is not available.
/// Use at the start of any test that requires the emulator container.
#[macro_export]
macro_rules! skip_unless_docker {
    () => {
        if !common::docker_available() {
            eprintln!("Docker not available, skipping test");
            return;
        }
    };
}
