//! Core configuration.
//!
//! The core reads no environment variables and no files. Hosts build a
//! [`CoreConfig`] themselves, or parse one from the JSON they already ship
//! in their own settings.

use serde::{Deserialize, Serialize};

use crate::error::{CoreError, Result};
use crate::payload::EncryptionMode;

/// Iteration count used when the host does not choose one.
pub const DEFAULT_PBKDF2_ITERATIONS: u32 = 100_000;

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default, rename_all = "camelCase", deny_unknown_fields)]
pub struct CoreConfig {
    /// Mode stamped into the metadata of every payload the engine produces.
    pub mode: EncryptionMode,
    /// Iterations for password derivation when the caller does not pass
    /// an explicit count.
    pub pbkdf2_iterations: u32,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            mode: EncryptionMode::E2ee,
            pbkdf2_iterations: DEFAULT_PBKDF2_ITERATIONS,
        }
    }
}

impl CoreConfig {
    /// Configuration for server-held keys (data at rest).
    pub fn server() -> Self {
        Self {
            mode: EncryptionMode::Server,
            ..Self::default()
        }
    }

    /// Parse and validate a JSON configuration. Missing fields take their
    /// defaults; unknown fields are rejected.
    pub fn from_json(json: &str) -> Result<Self> {
        let config: Self =
            serde_json::from_str(json).map_err(|e| CoreError::InvalidConfig(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<()> {
        if self.pbkdf2_iterations == 0 {
            return Err(CoreError::InvalidConfig(
                "pbkdf2Iterations must be at least 1".into(),
            ));
        }
        Ok(())
    }
}
