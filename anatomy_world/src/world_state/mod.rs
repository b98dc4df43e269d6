//! World state: entity records, actors, placement, containment and deferred deletion.

mod containment;
mod placement;

pub use containment::*;
pub use placement::*;

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use tracing::{debug, trace};

use crate::entities::{Actor, EntityId, EntityKind, Lifecycle};

/// Simulation time in seconds.
#[derive(Debug, Clone, Copy, PartialEq, PartialOrd, Serialize, Deserialize, Default)]
pub struct SimTime(pub f64);

impl SimTime {
    pub fn seconds(&self) -> f64 {
        self.0
    }
}

/// Tick counter and clock.
#[derive(Debug, Clone, Copy, Serialize, Deserialize)]
pub struct WorldTime {
    pub tick: u64,
    pub now: SimTime,
    /// Seconds per tick.
    pub tick_length: f64,
}

impl WorldTime {
    pub fn new(tick_length: f64) -> Self {
        Self {
            tick: 0,
            now: SimTime(0.0),
            tick_length,
        }
    }

    /// Advance the clock by one tick.
    pub fn advance(&mut self) {
        self.tick += 1;
        self.now = SimTime(self.tick as f64 * self.tick_length);
    }
}

impl Default for WorldTime {
    fn default() -> Self {
        // 30 ticks per second
        Self::new(1.0 / 30.0)
    }
}

/// Bookkeeping for one entity.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EntityRecord {
    pub id: EntityId,
    pub prototype: String,
    pub kind: EntityKind,
    pub placement: Placement,
    pub lifecycle: Lifecycle,
}

/// A request to move a mind out of its body into a spectator.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct SpectateRequest {
    pub mind: crate::entities::MindId,
    pub body: EntityId,
    pub can_return: bool,
    pub requested_at: SimTime,
}

/// The complete state of the world the body engine works against.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct WorldState {
    pub time: WorldTime,

    entities: HashMap<EntityId, EntityRecord>,

    actors: HashMap<EntityId, Actor>,

    pub containers: ContainerStore,

    /// Deletions requested this tick, flushed by `end_tick`.
    deletion_queue: Vec<EntityId>,

    pub(crate) spectate_requests: Vec<SpectateRequest>,
}

impl WorldState {
    /// Create a new empty world.
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an entity from a prototype id at a placement.
    pub fn spawn(
        &mut self,
        prototype: impl Into<String>,
        kind: EntityKind,
        placement: Placement,
    ) -> EntityId {
        let id = EntityId::new();
        let prototype = prototype.into();
        trace!(entity = %id, prototype = %prototype, ?kind, "spawned entity");
        self.entities.insert(
            id,
            EntityRecord {
                id,
                prototype,
                kind,
                placement,
                lifecycle: Lifecycle::Active,
            },
        );
        id
    }

    /// Spawn an actor entity and register its actor component.
    pub fn spawn_actor(&mut self, name: impl Into<String>, placement: Placement) -> EntityId {
        let name = name.into();
        let id = self.spawn(name.clone(), EntityKind::Actor, placement);
        self.actors.insert(id, Actor::new(id, name));
        id
    }

    /// Replace the actor component of an existing actor entity.
    pub fn set_actor(&mut self, actor: Actor) -> bool {
        if !self.entities.contains_key(&actor.id) {
            return false;
        }
        self.actors.insert(actor.id, actor);
        true
    }

    pub fn entity(&self, id: EntityId) -> Option<&EntityRecord> {
        self.entities.get(&id)
    }

    /// Check whether an entity record exists (queued deletions still exist).
    pub fn exists(&self, id: EntityId) -> bool {
        self.entities.contains_key(&id)
    }

    pub fn entity_count(&self) -> usize {
        self.entities.len()
    }

    pub fn actor(&self, id: EntityId) -> Option<&Actor> {
        self.actors.get(&id)
    }

    pub fn actor_mut(&mut self, id: EntityId) -> Option<&mut Actor> {
        self.actors.get_mut(&id)
    }

    /// Request deletion at the end of the tick.
    ///
    /// Returns `false` if the entity is unknown or already queued.
    pub fn queue_delete(&mut self, id: EntityId) -> bool {
        match self.entities.get_mut(&id) {
            Some(record) if record.lifecycle == Lifecycle::Active => {
                record.lifecycle = Lifecycle::QueuedForDeletion;
                self.deletion_queue.push(id);
                debug!(entity = %id, "queued entity for deletion");
                true
            }
            _ => false,
        }
    }

    pub fn is_queued_for_deletion(&self, id: EntityId) -> bool {
        self.entities
            .get(&id)
            .map(|r| r.lifecycle == Lifecycle::QueuedForDeletion)
            .unwrap_or(false)
    }

    /// Flush the deletion queue, then advance the clock.
    ///
    /// Container contents of deleted entities are deleted with them.
    /// Returns every entity that was removed, in deletion order.
    pub fn end_tick(&mut self) -> Vec<EntityId> {
        let mut deleted = Vec::new();
        let mut pending: Vec<EntityId> = std::mem::take(&mut self.deletion_queue);

        while let Some(id) = pending.pop() {
            if self.entities.remove(&id).is_none() {
                continue;
            }
            self.actors.remove(&id);
            if let Some((owner, name)) = self
                .containers
                .container_of(id)
                .map(|(owner, name)| (owner, name.to_string()))
            {
                self.containers.force_remove(owner, &name, id);
            }
            pending.extend(self.containers.remove_owner(id));
            deleted.push(id);
        }

        if !deleted.is_empty() {
            debug!(count = deleted.len(), tick = self.time.tick, "flushed deletions");
        }
        self.time.advance();
        deleted
    }

    pub fn placement(&self, id: EntityId) -> Option<Placement> {
        self.entities.get(&id).map(|r| r.placement)
    }

    pub fn set_placement(&mut self, id: EntityId, placement: Placement) -> bool {
        match self.entities.get_mut(&id) {
            Some(record) => {
                record.placement = placement;
                true
            }
            None => false,
        }
    }

    /// Resolve a placement to map coordinates by walking up the parent chain.
    pub fn world_placement(&self, id: EntityId) -> Option<Placement> {
        let mut placement = self.placement(id)?;
        let mut current = placement;
        // Bounded walk; parent chains are shallow and must not loop.
        for _ in 0..self.entities.len() {
            let Some(parent) = current.parent else {
                break;
            };
            let Some(parent_placement) = self.placement(parent) else {
                current.parent = None;
                break;
            };
            current = Placement {
                map: parent_placement.map,
                position: parent_placement
                    .position
                    .offset(current.position.x, current.position.y),
                parent: parent_placement.parent,
            };
        }
        placement.map = current.map;
        placement.position = current.position;
        placement.parent = None;
        Some(placement)
    }

    /// Re-anchor an entity to its map frame, keeping its world position.
    ///
    /// Evicts the entity from any container it sits in.
    pub fn attach_to_grid_or_map(&mut self, id: EntityId) -> bool {
        let Some(world) = self.world_placement(id) else {
            return false;
        };
        if let Some((owner, name)) = self
            .containers
            .container_of(id)
            .map(|(owner, name)| (owner, name.to_string()))
        {
            self.containers.force_remove(owner, &name, id);
        }
        self.set_placement(id, world)
    }

    /// Insert an item into an owner's container and parent its placement to the owner.
    pub fn insert_into_container(
        &mut self,
        owner: EntityId,
        name: &str,
        item: EntityId,
    ) -> Result<(), ContainmentError> {
        if !self.exists(owner) {
            return Err(ContainmentError::UnknownEntity(owner));
        }
        let map = match self.placement(item) {
            Some(placement) => placement.map,
            None => return Err(ContainmentError::UnknownEntity(item)),
        };
        self.containers.insert(owner, name, item)?;
        self.set_placement(item, Placement::attached_to(owner, map));
        Ok(())
    }

    /// Drain the spectate requests issued since the last call.
    pub fn take_spectate_requests(&mut self) -> Vec<SpectateRequest> {
        std::mem::take(&mut self.spectate_requests)
    }

    pub fn pending_spectate_requests(&self) -> &[SpectateRequest] {
        &self.spectate_requests
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_deletion_is_deferred_until_end_of_tick() {
        let mut world = WorldState::new();
        let id = world.spawn("crate", EntityKind::Item, Placement::default());

        assert!(world.queue_delete(id));
        assert!(!world.queue_delete(id));
        assert!(world.exists(id));
        assert!(world.is_queued_for_deletion(id));

        let deleted = world.end_tick();
        assert_eq!(deleted, vec![id]);
        assert!(!world.exists(id));
        assert_eq!(world.time.tick, 1);
    }

    #[test]
    fn test_deleting_owner_deletes_contents() {
        let mut world = WorldState::new();
        let owner = world.spawn_actor("Owner", Placement::on_map(MapId(1), 0.0, 0.0));
        let item = world.spawn("wallet", EntityKind::Item, Placement::default());
        world.insert_into_container(owner, "pocket", item).unwrap();

        world.queue_delete(owner);
        let deleted = world.end_tick();

        assert_eq!(deleted.len(), 2);
        assert!(!world.exists(item));
        assert!(world.actor(owner).is_none());
    }

    #[test]
    fn test_world_placement_follows_parent() {
        let mut world = WorldState::new();
        let owner = world.spawn_actor("Owner", Placement::on_map(MapId(2), 5.0, 3.0));
        let item = world.spawn("hat", EntityKind::Item, Placement::default());
        world.insert_into_container(owner, "head", item).unwrap();

        let placement = world.world_placement(item).unwrap();
        assert_eq!(placement.map, MapId(2));
        assert_eq!(placement.position, Position::new(5.0, 3.0));
        assert!(placement.parent.is_none());
    }

    #[test]
    fn test_attach_to_grid_or_map_evicts_and_keeps_position() {
        let mut world = WorldState::new();
        let owner = world.spawn_actor("Owner", Placement::on_map(MapId(1), -2.0, 8.0));
        let item = world.spawn("toolbox", EntityKind::Item, Placement::default());
        world.insert_into_container(owner, "hand", item).unwrap();

        assert!(world.attach_to_grid_or_map(item));
        assert!(world.containers.container_of(item).is_none());
        let placement = world.placement(item).unwrap();
        assert!(placement.parent.is_none());
        assert_eq!(placement.position, Position::new(-2.0, 8.0));
    }

    #[test]
    fn test_time_advances_per_tick() {
        let mut world = WorldState::new();
        world.time = WorldTime::new(0.5);
        world.end_tick();
        world.end_tick();
        assert_eq!(world.time.tick, 2);
        assert_eq!(world.time.now, SimTime(1.0));
    }
}
