//! World placement of entities.

use rand::Rng;
use serde::{Deserialize, Serialize};

use crate::entities::EntityId;

/// Identifier of a map (one coordinate frame per map).
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
pub struct MapId(pub u32);

/// A 2D position in distance units.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Position {
    pub fn new(x: f32, y: f32) -> Self {
        Self { x, y }
    }

    pub fn offset(&self, dx: f32, dy: f32) -> Self {
        Self::new(self.x + dx, self.y + dy)
    }

    pub fn distance(&self, other: &Position) -> f32 {
        ((self.x - other.x).powi(2) + (self.y - other.y).powi(2)).sqrt()
    }
}

/// Where an entity sits. With a `parent`, `position` is local to the parent.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize, Default)]
pub struct Placement {
    pub map: MapId,
    pub position: Position,
    pub parent: Option<EntityId>,
}

impl Placement {
    /// A placement directly on a map.
    pub fn on_map(map: MapId, x: f32, y: f32) -> Self {
        Self {
            map,
            position: Position::new(x, y),
            parent: None,
        }
    }

    /// A placement riding along with another entity.
    pub fn attached_to(parent: EntityId, map: MapId) -> Self {
        Self {
            map,
            position: Position::default(),
            parent: Some(parent),
        }
    }

    /// Shift by a random offset of at most `max_distance` in a random direction.
    pub fn with_random_offset(mut self, max_distance: f32, rng: &mut impl Rng) -> Self {
        if max_distance <= 0.0 {
            return self;
        }
        let angle: f32 = rng.gen_range(0.0..std::f32::consts::TAU);
        let distance: f32 = rng.gen_range(0.0..=max_distance);
        self.position = self
            .position
            .offset(angle.cos() * distance, angle.sin() * distance);
        self
    }
}
