//! Ordered scenario pipeline
//!
//! Scenario state is threaded through an explicit context instead of
//! process-wide statics, and each step checks its own precondition rather
//! than trusting declared ordering alone. Steps run strictly in declared
//! order; the first failure stops the run.

use crate::client::{BucketCreation, StorageOps};
use crate::error::HarnessError;
use async_trait::async_trait;
use std::sync::Arc;
use tracing::{info, warn};

/// Bucket used by the canonical storage scenario.
pub const SCENARIO_BUCKET: &str = "BUCKET_TEST";

/// Object name written by the canonical storage scenario.
pub const SCENARIO_OBJECT: &str = "test.txt";

/// Payload written by the canonical storage scenario.
pub const SCENARIO_PAYLOAD: &[u8] = b"Hello, World!";

/// Progress of one scenario run. Transitions are one-way within a run;
/// only `EmulatorReady` can outlive a run, via container reuse.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum ScenarioState {
    NotStarted,
    EmulatorReady,
    ClientConfigured,
    BucketEnsured,
    ObjectWritten,
}

/// Explicit state shared by scenario steps: the client handle, the target
/// bucket, and how far the run has progressed.
pub struct ScenarioContext {
    client: Arc<dyn StorageOps>,
    bucket: String,
    state: ScenarioState,
}

impl ScenarioContext {
    /// Build a context around a configured client.
    ///
    /// Emulator startup and client configuration precede context
    /// construction (the client handle cannot exist otherwise), so the
    /// machine begins at `ClientConfigured`.
    pub fn new(client: Arc<dyn StorageOps>, bucket: impl Into<String>) -> Self {
        Self {
            client,
            bucket: bucket.into(),
            state: ScenarioState::ClientConfigured,
        }
    }

    /// Current position in the state machine.
    pub fn state(&self) -> ScenarioState {
        self.state
    }

    /// Bucket targeted by the run.
    pub fn bucket(&self) -> &str {
        &self.bucket
    }

    /// The configured client handle.
    pub fn client(&self) -> &dyn StorageOps {
        self.client.as_ref()
    }

    fn advance(&mut self, next: ScenarioState) {
        debug_assert!(next > self.state, "scenario transitions are one-way");
        self.state = next;
    }
}

/// A single ordered scenario step.
#[async_trait]
pub trait ScenarioStep: Send + Sync {
    /// Short name used in logs and failure reports.
    fn name(&self) -> &'static str;

    async fn run(&self, cx: &mut ScenarioContext) -> Result<(), HarnessError>;
}

/// Fixed, ordered sequence of steps sharing one context.
#[derive(Default)]
pub struct Scenario {
    steps: Vec<Box<dyn ScenarioStep>>,
}

impl Scenario {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a step; steps run in the order they are appended.
    pub fn step(mut self, step: impl ScenarioStep + 'static) -> Self {
        self.steps.push(Box::new(step));
        self
    }

    /// The canonical two-step storage scenario: ensure `BUCKET_TEST`, then
    /// write `test.txt` with `"Hello, World!"` and verify it.
    pub fn canonical() -> Self {
        Self::new()
            .step(EnsureBucket)
            .step(WriteObject::new(SCENARIO_OBJECT, SCENARIO_PAYLOAD))
    }

    /// Run every step in declared order against the context. Stops at the
    /// first failure; no step is retried and no completed step is undone.
    pub async fn run(&self, cx: &mut ScenarioContext) -> Result<(), HarnessError> {
        for step in &self.steps {
            info!(step = step.name(), bucket = %cx.bucket, "running scenario step");
            if let Err(e) = step.run(cx).await {
                warn!(step = step.name(), error = %e, "scenario step failed");
                return Err(e);
            }
        }
        Ok(())
    }
}

/// Create the scenario bucket and verify it is observable.
///
/// Create-or-already-exists semantics: an already-existing bucket is logged
/// and tolerated, every other creation failure is propagated as fatal. The
/// step then requires `get_bucket` to see the bucket regardless of which
/// path was taken.
pub struct EnsureBucket;

#[async_trait]
impl ScenarioStep for EnsureBucket {
    fn name(&self) -> &'static str {
        "ensure-bucket"
    }

    async fn run(&self, cx: &mut ScenarioContext) -> Result<(), HarnessError> {
        match cx.client.create_bucket(&cx.bucket).await? {
            BucketCreation::Created => info!(bucket = %cx.bucket, "bucket created"),
            BucketCreation::AlreadyExists => {
                warn!(bucket = %cx.bucket, "bucket already exists, continuing")
            }
        }

        if cx.client.get_bucket(&cx.bucket).await?.is_none() {
            return Err(HarnessError::Assertion(format!(
                "bucket {} not observable after creation",
                cx.bucket
            )));
        }

        cx.advance(ScenarioState::BucketEnsured);
        Ok(())
    }
}

/// Write a payload into the scenario bucket and verify presence and a
/// byte-exact round trip.
///
/// Depends on [`EnsureBucket`] having run; the dependency is checked
/// explicitly instead of being implied by step order.
pub struct WriteObject {
    object: String,
    payload: Vec<u8>,
}

impl WriteObject {
    pub fn new(object: impl Into<String>, payload: impl Into<Vec<u8>>) -> Self {
        Self {
            object: object.into(),
            payload: payload.into(),
        }
    }
}

#[async_trait]
impl ScenarioStep for WriteObject {
    fn name(&self) -> &'static str {
        "write-object"
    }

    async fn run(&self, cx: &mut ScenarioContext) -> Result<(), HarnessError> {
        if cx.state < ScenarioState::BucketEnsured {
            return Err(HarnessError::Assertion(format!(
                "write-object requires an ensured bucket, run is at {:?}",
                cx.state
            )));
        }

        if cx.client.get_bucket(&cx.bucket).await?.is_none() {
            return Err(HarnessError::Assertion(format!(
                "bucket {} disappeared before object write",
                cx.bucket
            )));
        }

        let written = cx
            .client
            .write_object(&cx.bucket, &self.object, &self.payload)
            .await?;
        info!(
            bucket = %cx.bucket,
            object = %self.object,
            size = written.size,
            "object written"
        );

        if cx.client.get_object(&cx.bucket, &self.object).await?.is_none() {
            return Err(HarnessError::Assertion(format!(
                "object {}/{} absent after write",
                cx.bucket, self.object
            )));
        }

        let read_back = cx.client.read_object(&cx.bucket, &self.object).await?;
        if read_back != self.payload {
            return Err(HarnessError::Assertion(format!(
                "object {}/{} payload mismatch: wrote {} bytes, read {} bytes",
                cx.bucket,
                self.object,
                self.payload.len(),
                read_back.len()
            )));
        }

        cx.advance(ScenarioState::ObjectWritten);
        Ok(())
    }
}
