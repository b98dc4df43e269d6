//! Actor definitions.

use serde::{Deserialize, Serialize};

use super::{AppearanceComponent, EntityId, MindComponent, MobState};

/// A living (or formerly living) actor that can own a body.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Actor {
    pub id: EntityId,
    pub name: String,
    pub mob_state: MobState,
    pub mind: Option<MindComponent>,
    /// Present only for actors drawn with toggleable layers.
    pub appearance: Option<AppearanceComponent>,
}

impl Actor {
    /// Create a new living actor with no mind and no appearance.
    pub fn new(id: EntityId, name: impl Into<String>) -> Self {
        Self {
            id,
            name: name.into(),
            mob_state: MobState::Alive,
            mind: None,
            appearance: None,
        }
    }

    /// Attach a controlling mind.
    pub fn with_mind(mut self, mind: MindComponent) -> Self {
        self.mind = Some(mind);
        self
    }

    /// Give the actor a layered appearance.
    pub fn with_appearance(mut self) -> Self {
        self.appearance = Some(AppearanceComponent::default());
        self
    }

    /// Check if the actor is dead.
    pub fn is_dead(&self) -> bool {
        self.mob_state.is_dead()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_actor() {
        let actor = Actor::new(EntityId::new(), "Test Subject");
        assert_eq!(actor.name, "Test Subject");
        assert!(!actor.is_dead());
        assert!(actor.mind.is_none());
        assert!(actor.appearance.is_none());
    }

    #[test]
    fn test_actor_death() {
        let mut actor = Actor::new(EntityId::new(), "Doomed").with_mind(MindComponent::new());
        actor.mob_state = MobState::Dead;
        assert!(actor.is_dead());
        assert!(actor.mind.as_ref().unwrap().time_of_death.is_none());
    }
}
