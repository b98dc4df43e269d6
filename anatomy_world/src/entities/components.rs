//! Component definitions for actors.

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use uuid::Uuid;

use crate::mechanics::VisualLayer;
use crate::world_state::SimTime;

/// Coarse health state of a mob.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub enum MobState {
    #[default]
    Alive,
    Critical,
    Dead,
}

impl MobState {
    pub fn is_dead(&self) -> bool {
        matches!(self, MobState::Dead)
    }
}

/// Identifier of a controlling consciousness.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MindId(pub Uuid);

impl MindId {
    pub fn new() -> Self {
        Self(Uuid::new_v4())
    }
}

impl Default for MindId {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Display for MindId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// A consciousness controlling an actor.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MindComponent {
    pub id: MindId,
    /// Set once, the first time the owner is observed dead.
    pub time_of_death: Option<SimTime>,
    /// Whether the mind may re-enter its body after spectating.
    pub can_return: bool,
}

impl MindComponent {
    pub fn new() -> Self {
        Self {
            id: MindId::new(),
            time_of_death: None,
            can_return: true,
        }
    }
}

impl Default for MindComponent {
    fn default() -> Self {
        Self::new()
    }
}

/// Visual state of an actor made of toggleable layers.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct AppearanceComponent {
    pub hidden_layers: HashSet<VisualLayer>,
    /// Layers hidden with `permanent` set; only a permanent show reveals them.
    pub permanently_hidden: HashSet<VisualLayer>,
}

impl AppearanceComponent {
    /// Check whether a layer is currently drawn.
    pub fn is_visible(&self, layer: VisualLayer) -> bool {
        !self.hidden_layers.contains(&layer)
    }

    /// Toggle visibility for a set of layers.
    pub fn set_layers_visible(&mut self, layers: &[VisualLayer], visible: bool, permanent: bool) {
        for layer in layers {
            if visible {
                if self.permanently_hidden.contains(layer) && !permanent {
                    continue;
                }
                self.permanently_hidden.remove(layer);
                self.hidden_layers.remove(layer);
            } else {
                self.hidden_layers.insert(*layer);
                if permanent {
                    self.permanently_hidden.insert(*layer);
                }
            }
        }
    }
}
