//! Pipeline configuration.

use serde::{Deserialize, Serialize};
use tinct_core::AllocateMethod;

use crate::error::ConfigError;

/// Environment variable selecting the allocate method.
pub const ALLOCATE_METHOD_ENV: &str = "TINCT_ALLOCATE_METHOD";
/// Environment variable whose presence disables the dirty retry.
pub const NO_RETRY_ENV: &str = "TINCT_NO_RETRY";

/// Runtime configuration for pipeline runs.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// How a ticket without an array gets one.
    pub allocate_method: AllocateMethod,
    /// Retry once when a failed run was marked dirty.
    pub retry_on_dirty: bool,
    /// Copy results back into the output image when they live elsewhere.
    pub writeback: bool,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self::from_lookup(|key| std::env::var(key).ok())
    }
}

impl PipelineConfig {
    /// Defaults with overrides taken from `lookup`.
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Self {
        let allocate_method = match lookup(ALLOCATE_METHOD_ENV) {
            Some(value) => parse_allocate_method(&value).unwrap_or_else(|e| {
                tracing::warn!("ignoring {ALLOCATE_METHOD_ENV}: {e}");
                AllocateMethod::Alias
            }),
            None => AllocateMethod::Alias,
        };
        Self {
            allocate_method,
            retry_on_dirty: lookup(NO_RETRY_ENV).is_none(),
            writeback: true,
        }
    }

    pub fn from_json(json: &str) -> Result<Self, ConfigError> {
        Ok(serde_json::from_str(json)?)
    }
}

/// Parse a method name (`alias`, `copy`, `reserve`) or code (`0`, `1`, `2`).
pub fn parse_allocate_method(value: &str) -> Result<AllocateMethod, ConfigError> {
    let value = value.trim();
    let method = match value.to_ascii_lowercase().as_str() {
        "alias" => Some(AllocateMethod::Alias),
        "copy" => Some(AllocateMethod::Copy),
        "reserve" => Some(AllocateMethod::Reserve),
        code => code.parse().ok().and_then(AllocateMethod::from_code),
    };
    method.ok_or_else(|| ConfigError::AllocateMethod(value.to_string()))
}
