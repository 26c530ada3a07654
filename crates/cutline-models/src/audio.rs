//! Audio frame model.

use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

/// One fixed-hop analysis frame of the audio track.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, JsonSchema)]
#[serde(rename_all = "camelCase")]
pub struct AudioFrame {
    /// Frame position in seconds (`index * hop / sample_rate`).
    pub time: f64,
    /// Root-mean-square amplitude over the frame window.
    pub energy: f32,
    /// Energy in dB relative to the track's own peak, clamped at the floor.
    pub level_db: f32,
}

impl AudioFrame {
    /// Create a frame whose level has not been computed yet.
    ///
    /// The level is filled in by the threshold estimator once the peak
    /// energy of the whole track is known.
    pub fn new(time: f64, energy: f32) -> Self {
        Self {
            time,
            energy,
            level_db: 0.0,
        }
    }
}
