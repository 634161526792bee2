//! Emulator container lifecycle
//!
//! Starts the storage emulator in a disposable container, polls it until it
//! reports ready, and exposes the mapped (host, port) address. Any failure
//! to start is fatal to the whole run; there is no partial-start recovery.

use crate::config::EmulatorConfig;
use crate::error::HarnessError;
use std::time::{Duration, Instant};
use testcontainers::core::{IntoContainerPort, ReuseDirective};
use testcontainers::runners::AsyncRunner;
use testcontainers::{ContainerAsync, GenericImage, ImageExt};
use tracing::{debug, info, warn};

/// Polling readiness predicate: GET `path` on the emulator until the
/// response status equals `expect_status` or `timeout` elapses.
#[derive(Debug, Clone)]
pub struct ReadinessProbe {
    path: String,
    expect_status: u16,
    timeout: Duration,
}

impl ReadinessProbe {
    /// Per-request timeout for a single probe attempt.
    const ATTEMPT_TIMEOUT: Duration = Duration::from_secs(2);

    /// Backoff starts here and doubles per attempt.
    const INITIAL_BACKOFF: Duration = Duration::from_millis(100);

    /// Backoff is capped so a slow emulator is still probed regularly.
    const MAX_BACKOFF: Duration = Duration::from_secs(2);

    pub fn new(path: impl Into<String>, expect_status: u16, timeout: Duration) -> Self {
        Self {
            path: path.into(),
            expect_status,
            timeout,
        }
    }

    /// Poll `base_url` until the expected status is observed. Suspends the
    /// caller between attempts with capped exponential backoff; fails with
    /// a startup error once the timeout is exceeded.
    pub async fn wait_until_ready(&self, base_url: &str) -> Result<(), HarnessError> {
        let url = format!("{}{}", base_url.trim_end_matches('/'), self.path);
        let http = reqwest::Client::builder()
            .timeout(Self::ATTEMPT_TIMEOUT)
            .build()
            .map_err(|e| HarnessError::Startup(format!("building probe client: {}", e)))?;

        let deadline = Instant::now() + self.timeout;
        let mut backoff = Self::INITIAL_BACKOFF;
        let mut attempts = 0u32;

        loop {
            attempts += 1;
            match http.get(&url).send().await {
                Ok(resp) if resp.status().as_u16() == self.expect_status => {
                    debug!(attempts, %url, "readiness probe succeeded");
                    return Ok(());
                }
                Ok(resp) => {
                    debug!(
                        attempts,
                        status = resp.status().as_u16(),
                        expected = self.expect_status,
                        "readiness probe returned unexpected status"
                    );
                }
                Err(e) => {
                    debug!(attempts, error = %e, "readiness probe request failed");
                }
            }

            if Instant::now() >= deadline {
                return Err(HarnessError::Startup(format!(
                    "emulator not ready after {:?} ({} probe attempts against {})",
                    self.timeout, attempts, url
                )));
            }

            tokio::time::sleep(backoff).await;
            backoff = (backoff * 2).min(Self::MAX_BACKOFF);
        }
    }
}

/// A running storage emulator reachable at (host, port).
///
/// Created by [`Emulator::start`]; the value only exists once the readiness
/// probe has passed. Dropping the emulator without calling [`Emulator::stop`]
/// still removes the container via the container handle's own teardown.
#[derive(Debug)]
pub struct Emulator {
    container: Option<ContainerAsync<GenericImage>>,
    host: String,
    port: u16,
    scheme: String,
    reuse: bool,
}

impl Emulator {
    /// Launch the emulator container and block until the readiness probe
    /// succeeds against the mapped port.
    ///
    /// With `reuse` enabled a still-running container from a prior run that
    /// matches the same image and configuration is picked up instead of a
    /// fresh start. That is a speed optimization only: leftover buckets and
    /// objects from earlier runs remain visible.
    pub async fn start(config: &EmulatorConfig) -> Result<Self, HarnessError> {
        info!(
            image = %config.image,
            tag = %config.tag,
            reuse = config.reuse,
            "starting storage emulator"
        );

        let image = GenericImage::new(config.image.clone(), config.tag.clone())
            .with_exposed_port(config.internal_port.tcp());

        let mut request = image.with_cmd(config.launch_args());
        if config.reuse {
            request = request.with_reuse(ReuseDirective::Always);
        }

        let container = request
            .start()
            .await
            .map_err(|e| HarnessError::Startup(format!("launching container: {}", e)))?;

        let host = container
            .get_host()
            .await
            .map_err(|e| HarnessError::Startup(format!("resolving container host: {}", e)))?
            .to_string();
        let port = container
            .get_host_port_ipv4(config.internal_port.tcp())
            .await
            .map_err(|e| HarnessError::Startup(format!("resolving mapped port: {}", e)))?;

        let endpoint = format!("{}://{}:{}", config.scheme, host, port);
        let probe = ReadinessProbe::new(
            config.readiness_path.clone(),
            config.readiness_status,
            Duration::from_secs(config.startup_timeout_secs),
        );

        if let Err(e) = probe.wait_until_ready(&endpoint).await {
            // No partial-start recovery: remove the half-started container
            // and abort the run.
            if let Err(rm_err) = container.rm().await {
                warn!(error = %rm_err, "failed to remove unready emulator container");
            }
            return Err(e);
        }

        info!(%endpoint, "storage emulator ready");
        Ok(Self {
            container: Some(container),
            host,
            port,
            scheme: config.scheme.clone(),
            reuse: config.reuse,
        })
    }

    /// Host the emulator is reachable at from the test process.
    pub fn host(&self) -> &str {
        &self.host
    }

    /// Host-side mapped port.
    pub fn port(&self) -> u16 {
        self.port
    }

    /// Full endpoint URL (`scheme://host:port`).
    pub fn endpoint(&self) -> String {
        format!("{}://{}:{}", self.scheme, self.host, self.port)
    }

    /// Container id, while the instance is still attached.
    pub fn container_id(&self) -> Option<&str> {
        self.container.as_ref().map(|c| c.id())
    }

    /// Tear down the emulator unless reuse left it running. Idempotent:
    /// calling stop on an already-stopped instance is a no-op. Teardown
    /// failures are logged, not surfaced; the run is already over.
    pub async fn stop(&mut self) {
        match self.container.take() {
            None => {}
            Some(container) if self.reuse => {
                debug!(
                    id = container.id(),
                    "reuse enabled, leaving emulator container running"
                );
                // The handle's teardown would remove the container; forget
                // it so the instance survives for the next run.
                std::mem::forget(container);
            }
            Some(container) => {
                let id = container.id().to_string();
                if let Err(e) = container.rm().await {
                    warn!(id = %id, error = %e, "failed to remove emulator container");
                } else {
                    info!(id = %id, "emulator container removed");
                }
            }
        }
    }
}
