//! Configuration for the emulated-storage test harness

use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Emulator container configuration
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmulatorConfig {
    /// Container image for the storage emulator
    #[serde(default = "default_image")]
    pub image: String,

    /// Image tag
    #[serde(default = "default_tag")]
    pub tag: String,

    /// Port the emulator listens on inside the container
    #[serde(default = "default_internal_port")]
    pub internal_port: u16,

    /// URL scheme the emulator serves. The emulator runs plain HTTP so the
    /// client does not need to trust a self-signed certificate.
    #[serde(default = "default_scheme")]
    pub scheme: String,

    /// Path probed for readiness
    #[serde(default = "default_readiness_path")]
    pub readiness_path: String,

    /// Status code that signals readiness. fake-gcs-server has no handler
    /// for "/" and answers 404 once it is serving.
    #[serde(default = "default_readiness_status")]
    pub readiness_status: u16,

    /// Seconds to wait for the emulator to become ready before the run is
    /// aborted with a startup error
    #[serde(default = "default_startup_timeout_secs")]
    pub startup_timeout_secs: u64,

    /// Reuse a still-running container from a prior run instead of starting
    /// a new one. Trades isolation for speed: emulator state can leak
    /// between runs. Off by default; never rely on it for correctness.
    #[serde(default)]
    pub reuse: bool,
}

/// Storage client settings
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ClientSettings {
    /// Synthetic project identity presented to the emulator
    #[serde(default = "default_project_id")]
    pub project_id: String,

    /// Credentials mode. Only anonymous access is supported; the emulator
    /// performs no authentication.
    #[serde(default)]
    pub credentials: CredentialsMode,
}

/// How the client authenticates against the backend.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum CredentialsMode {
    /// No credentials; requests are sent unauthenticated (emulator-only).
    #[default]
    None,
}

/// Top-level harness configuration
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct HarnessConfig {
    /// Emulator container settings
    #[serde(default)]
    pub emulator: EmulatorConfig,

    /// Storage client settings
    #[serde(default)]
    pub client: ClientSettings,
}

// Default value functions for serde
fn default_image() -> String {
    "fsouza/fake-gcs-server".to_string()
}

fn default_tag() -> String {
    "latest".to_string()
}

fn default_internal_port() -> u16 {
    8888
}

fn default_scheme() -> String {
    "http".to_string()
}

fn default_readiness_path() -> String {
    "/".to_string()
}

fn default_readiness_status() -> u16 {
    404
}

fn default_startup_timeout_secs() -> u64 {
    60
}

fn default_project_id() -> String {
    "TEST_LOCAL".to_string()
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            image: default_image(),
            tag: default_tag(),
            internal_port: default_internal_port(),
            scheme: default_scheme(),
            readiness_path: default_readiness_path(),
            readiness_status: default_readiness_status(),
            startup_timeout_secs: default_startup_timeout_secs(),
            reuse: false,
        }
    }
}

impl Default for ClientSettings {
    fn default() -> Self {
        Self {
            project_id: default_project_id(),
            credentials: CredentialsMode::None,
        }
    }
}

impl EmulatorConfig {
    /// Command-line arguments passed to the emulator process.
    pub fn launch_args(&self) -> Vec<String> {
        vec![
            "-port".to_string(),
            self.internal_port.to_string(),
            "-scheme".to_string(),
            self.scheme.clone(),
        ]
    }
}

impl HarnessConfig {
    /// Load configuration from a TOML file
    pub fn from_file(path: &str) -> Result<Self, ConfigError> {
        let content = std::fs::read_to_string(path).map_err(|e| ConfigError::Io(e.to_string()))?;
        let config: HarnessConfig =
            toml::from_str(&content).map_err(|e| ConfigError::Parse(e.to_string()))?;
        Ok(config)
    }

    /// Load configuration from environment variables
    pub fn from_env() -> Self {
        let mut config = Self::default();

        if let Ok(image) = std::env::var("FGH_IMAGE") {
            config.emulator.image = image;
        }

        if let Ok(tag) = std::env::var("FGH_TAG") {
            config.emulator.tag = tag;
        }

        if let Ok(port) = std::env::var("FGH_INTERNAL_PORT") {
            if let Ok(parsed) = port.parse() {
                config.emulator.internal_port = parsed;
            }
        }

        if let Ok(timeout) = std::env::var("FGH_STARTUP_TIMEOUT_SECS") {
            if let Ok(parsed) = timeout.parse() {
                config.emulator.startup_timeout_secs = parsed;
            }
        }

        if let Ok(reuse) = std::env::var("FGH_REUSE") {
            config.emulator.reuse = reuse == "true" || reuse == "1";
        }

        if let Ok(project) = std::env::var("FGH_PROJECT_ID") {
            config.client.project_id = project;
        }

        config
    }

    /// Load configuration from file if it exists, otherwise from environment
    pub fn load() -> Self {
        if let Ok(path) = std::env::var("FGH_CONFIG") {
            if let Ok(config) = Self::from_file(&path) {
                return config;
            }
        }

        if std::path::Path::new("fake_gcs_harness.toml").exists() {
            if let Ok(config) = Self::from_file("fake_gcs_harness.toml") {
                return config;
            }
        }

        Self::from_env()
    }
}

/// Configuration loading errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("IO error: {0}")]
    Io(String),

    #[error("Parse error: {0}")]
    Parse(String),
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_config() {
        let config = HarnessConfig::default();
        assert_eq!(config.emulator.image, "fsouza/fake-gcs-server");
        assert_eq!(config.emulator.internal_port, 8888);
        assert_eq!(config.emulator.readiness_status, 404);
        assert!(!config.emulator.reuse);
        assert_eq!(config.client.project_id, "TEST_LOCAL");
        assert_eq!(config.client.credentials, CredentialsMode::None);
    }

    #[test]
    fn test_launch_args() {
        let config = EmulatorConfig::default();
        assert_eq!(
            config.launch_args(),
            vec!["-port", "8888", "-scheme", "http"]
        );
    }

    #[test]
    fn test_config_parse_toml() {
        let toml = r#"
            [emulator]
            image = "fsouza/fake-gcs-server"
            tag = "1.52.2"
            internal_port = 4443
            startup_timeout_secs = 30
            reuse = true

            [client]
            project_id = "other-project"
        "#;

        let config: HarnessConfig = toml::from_str(toml).unwrap();
        assert_eq!(config.emulator.tag, "1.52.2");
        assert_eq!(config.emulator.internal_port, 4443);
        assert_eq!(config.emulator.startup_timeout_secs, 30);
        assert!(config.emulator.reuse);
        assert_eq!(config.client.project_id, "other-project");
        // Unspecified fields fall back to serde defaults
        assert_eq!(config.emulator.readiness_path, "/");
        assert_eq!(config.emulator.readiness_status, 404);
    }

    #[test]
    fn test_config_parse_empty_toml() {
        let config: HarnessConfig = toml::from_str("").unwrap();
        assert_eq!(config.emulator.image, "fsouza/fake-gcs-server");
        assert_eq!(config.client.project_id, "TEST_LOCAL");
    }

    #[test]
    fn test_config_from_file() {
        use std::io::Write;

        let mut file = tempfile::NamedTempFile::new().unwrap();
        writeln!(file, "[emulator]\ntag = \"pinned\"").unwrap();

        let config = HarnessConfig::from_file(file.path().to_str().unwrap()).unwrap();
        assert_eq!(config.emulator.tag, "pinned");
    }

    #[test]
    fn test_config_from_missing_file() {
        let result = HarnessConfig::from_file("/nonexistent/fake_gcs_harness.toml");
        assert!(matches!(result, Err(ConfigError::Io(_))));
    }

    #[test]
    fn test_credentials_mode_parse() {
        let settings: ClientSettings = toml::from_str("credentials = \"none\"").unwrap();
        assert_eq!(settings.credentials, CredentialsMode::None);
    }
}
