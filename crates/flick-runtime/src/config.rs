//! Playback session configuration.

use serde::{Deserialize, Serialize};

/// Tunables for a playback session.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PlayerConfig {
    /// How many movie ticks of timing samples each profiler retains.
    pub profile_retention_ticks: u32,
    /// Start with frame advancement halted; rendering still follows
    /// redraw requests.
    pub start_stopped: bool,
}

impl Default for PlayerConfig {
    fn default() -> Self {
        Self {
            profile_retention_ticks: 120,
            start_stopped: false,
        }
    }
}
