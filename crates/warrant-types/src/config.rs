//! Warrant configuration
//!
//! Bounds that keep the bulk and scanning paths within a predictable cost,
//! plus sizing for the observability layer.

use serde::{Deserialize, Serialize};

use crate::{Result, WarrantError};

const DEFAULT_MAX_BATCH_SIZE: usize = 1024;
const DEFAULT_MAX_SELECTORS_PER_GRANT: usize = 256;
const DEFAULT_EVENT_BUFFER: usize = 1024;

/// Main Warrant configuration
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct WarrantConfig {
    /// Maximum number of ids accepted by one batch revoke
    pub max_batch_size: usize,
    /// Maximum number of selectors on one grant
    pub max_selectors_per_grant: usize,
    /// Capacity of the live event bus
    pub event_buffer: usize,
    /// Retention bound of the audit journal (unbounded when absent)
    pub audit_max_entries: Option<usize>,
}

impl Default for WarrantConfig {
    fn default() -> Self {
        Self {
            max_batch_size: DEFAULT_MAX_BATCH_SIZE,
            max_selectors_per_grant: DEFAULT_MAX_SELECTORS_PER_GRANT,
            event_buffer: DEFAULT_EVENT_BUFFER,
            audit_max_entries: None,
        }
    }
}

impl WarrantConfig {
    /// Create config from environment variables, reading `.env` if present.
    ///
    /// Unset or unparsable variables fall back to defaults.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        let config = Self {
            max_batch_size: env_or("WARRANT_MAX_BATCH_SIZE", DEFAULT_MAX_BATCH_SIZE),
            max_selectors_per_grant: env_or(
                "WARRANT_MAX_SELECTORS_PER_GRANT",
                DEFAULT_MAX_SELECTORS_PER_GRANT,
            ),
            event_buffer: env_or("WARRANT_EVENT_BUFFER", DEFAULT_EVENT_BUFFER),
            audit_max_entries: std::env::var("WARRANT_AUDIT_MAX_ENTRIES")
                .ok()
                .and_then(|s| s.parse().ok()),
        };
        config.validate()?;
        Ok(config)
    }

    /// Parse config from TOML. Missing keys take their defaults.
    pub fn from_toml_str(s: &str) -> Result<Self> {
        let config: Self = toml::from_str(s).map_err(|e| WarrantError::config(e.to_string()))?;
        config.validate()?;
        Ok(config)
    }

    /// Reject bounds that would make an operation unusable
    pub fn validate(&self) -> Result<()> {
        if self.max_batch_size == 0 {
            return Err(WarrantError::config("max_batch_size must be greater than zero"));
        }
        if self.max_selectors_per_grant == 0 {
            return Err(WarrantError::config(
                "max_selectors_per_grant must be greater than zero",
            ));
        }
        if self.event_buffer == 0 {
            return Err(WarrantError::config("event_buffer must be greater than zero"));
        }
        if self.audit_max_entries == Some(0) {
            return Err(WarrantError::config("audit_max_entries must be greater than zero"));
        }
        Ok(())
    }
}

fn env_or(key: &str, default: usize) -> usize {
    std::env::var(key)
        .ok()
        .and_then(|s| s.parse().ok())
        .unwrap_or(default)
}
