//! Engine configuration.

use serde::{Deserialize, Serialize};

/// Tunables for the body engine.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct BodyConfig {
    /// Sound played when a body is gibbed, unless its layout names one.
    pub gib_sound: String,

    /// Random pitch deviation applied to the gib sound.
    pub gib_audio_variation: f32,

    /// Radius within which observers hear the gib.
    pub audible_range: f32,

    /// Maximum distance released items are scattered from the body.
    pub scatter_radius: f32,

    /// Fixed seed for scatter offsets; random when unset.
    pub rng_seed: Option<u64>,
}

impl Default for BodyConfig {
    fn default() -> Self {
        Self {
            gib_sound: "/Audio/Effects/gib.ogg".to_string(),
            gib_audio_variation: 0.025,
            audible_range: 25.0,
            scatter_radius: 0.25,
            rng_seed: None,
        }
    }
}

impl BodyConfig {
    /// Parse a configuration; missing keys keep their defaults.
    pub fn from_toml_str(source: &str) -> Result<Self, toml::de::Error> {
        toml::from_str(source)
    }
}
