//! Engine configuration.

use serde::{Deserialize, Serialize};

const DEFAULT_UPDATE_RATE: u32 = 25;

/// Serialized configuration for an [`crate::AudioEngine`].
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineSettings {
    /// Extraction cycles per second driven by the update scheduler.
    pub update_rate: u32,
    /// Run a background update thread instead of caller-driven updates.
    pub auto_update: bool,
}

impl EngineSettings {
    /// Settings for an engine the caller updates explicitly.
    pub fn manual() -> Self {
        Self {
            auto_update: false,
            ..Self::default()
        }
    }

    /// Update rate clamped to something the scheduler can honor.
    pub fn effective_update_rate(&self) -> u32 {
        self.update_rate.max(1)
    }
}

impl Default for EngineSettings {
    fn default() -> Self {
        Self {
            update_rate: DEFAULT_UPDATE_RATE,
            auto_update: true,
        }
    }
}
