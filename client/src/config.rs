use std::path::Path;
use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::{Result, SurveyError};

/// Runtime settings for the client.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SurveyConfig {
    /// Chain the decryption signatures are bound to
    pub chain_id: u64,
    /// How long a decryption signature stays valid (days)
    pub signature_validity_days: u64,
    /// Upper bound on a single oracle round trip (milliseconds)
    pub oracle_timeout_ms: u64,
    /// How long a settled decryption outcome stays shared (milliseconds)
    pub settled_ttl_ms: u64,
    /// Fallback tracing filter when RUST_LOG is unset
    pub log_filter: String,
}

impl Default for SurveyConfig {
    fn default() -> Self {
        Self {
            chain_id: 31337,
            signature_validity_days: 365,
            oracle_timeout_ms: 30_000,
            settled_ttl_ms: 60_000,
            log_filter: "info".to_string(),
        }
    }
}

impl SurveyConfig {
    pub fn from_toml_str(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| SurveyError::Config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn from_file(path: impl AsRef<Path>) -> Result<Self> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path)
            .map_err(|e| SurveyError::Config(format!("{}: {e}", path.display())))?;
        Self::from_toml_str(&raw)
    }

    pub fn validate(&self) -> Result<()> {
        if self.oracle_timeout_ms == 0 {
            return Err(SurveyError::Config("oracle_timeout_ms must be positive".into()));
        }
        if self.signature_validity_days == 0 {
            return Err(SurveyError::Config(
                "signature_validity_days must be positive".into(),
            ));
        }
        Ok(())
    }

    pub fn oracle_timeout(&self) -> Duration {
        Duration::from_millis(self.oracle_timeout_ms)
    }

    pub fn settled_ttl(&self) -> Duration {
        Duration::from_millis(self.settled_ttl_ms)
    }
}
