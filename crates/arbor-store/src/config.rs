use serde::{Deserialize, Serialize};

use crate::error::{StoreError, StoreResult};

/// Tuning for [`Fetcher`](crate::Fetcher).
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct FetchConfig {
    /// Digests requested per store round-trip.
    pub batch_size: usize,
    /// Upper bound on fetch rounds. Each round goes one level deeper.
    pub max_rounds: usize,
}

impl Default for FetchConfig {
    fn default() -> Self {
        Self {
            batch_size: 64,
            max_rounds: 1024,
        }
    }
}

impl FetchConfig {
    pub fn from_toml_str(text: &str) -> StoreResult<Self> {
        toml::from_str(text).map_err(|e| StoreError::Config(e.to_string()))
    }

    pub fn to_toml_string(&self) -> StoreResult<String> {
        toml::to_string(self).map_err(|e| StoreError::Config(e.to_string()))
    }
}
