//! Event Relay Layer - stimuli on the whole body routed to the engine or to organs.
//!
//! Three stimuli are handled:
//! 1. **Movement input**: a dead actor trying to move leaves its body
//! 2. **Metabolic multiplier**: broadcast to every organ in the body
//! 3. **Microwaving**: destructive heat gibs the body
//!
//! For microwaving, the body relay is the first observer. Observers running
//! after it must check [`MicrowavedEvent::handled`] before acting.

use anatomy_world::{AudioSink, EntityId, SpectatorService, WorldState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use crate::body::{BodySystem, OrganError};

/// An actor attempted to move.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MoveInputEvent {
    pub actor: EntityId,
}

/// Scale (or, with `apply = false`, unscale) the metabolism of every organ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct MetabolicMultiplierEvent {
    pub actor: EntityId,
    pub multiplier: f32,
    pub apply: bool,
}

/// The actor is being cooked.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct MicrowavedEvent {
    pub actor: EntityId,
    pub microwave: EntityId,
    pub user: Option<EntityId>,
    /// Set by the first observer that acts on the event.
    pub handled: bool,
}

impl MicrowavedEvent {
    pub fn new(actor: EntityId, microwave: EntityId) -> Self {
        Self {
            actor,
            microwave,
            user: None,
            handled: false,
        }
    }
}

impl BodySystem {
    /// Movement from a dead actor stamps its mind's time of death once and
    /// sends the mind to spectate.
    ///
    /// Returns `true` if the stamp (and spectate request) happened.
    pub fn on_move_input(&mut self, world: &mut WorldState, event: &MoveInputEvent) -> bool {
        if !self.has_body(event.actor) {
            return false;
        }
        let now = world.time.now;
        let Some(actor) = world.actor_mut(event.actor) else {
            return false;
        };
        if !actor.is_dead() {
            return false;
        }
        let Some(mind) = actor.mind.as_mut() else {
            return false;
        };
        if mind.time_of_death.is_some() {
            return false;
        }

        mind.time_of_death = Some(now);
        let mind = mind.clone();
        info!(body = %event.actor, mind = %mind.id, time_of_death = now.seconds(), "dead actor moved, leaving body");
        world.request_spectate(event.actor, &mind);
        true
    }

    /// Apply a metabolic multiplier to every organ in the body.
    ///
    /// Organs fail independently; failures are returned and never stop the
    /// broadcast to the remaining organs.
    pub fn on_metabolic_multiplier(&mut self, event: &MetabolicMultiplierEvent) -> Vec<OrganError> {
        let organs: Vec<EntityId> = self.organs_of(event.actor).map(|o| o.id).collect();
        let mut failures = Vec::new();
        for id in organs {
            let Some(organ) = self.organs.get_mut(&id) else {
                continue;
            };
            if let Err(err) = organ.apply_metabolic_multiplier(event.multiplier, event.apply) {
                warn!(body = %event.actor, organ = %id, error = %err, "organ rejected metabolic multiplier");
                failures.push(err);
            }
        }
        debug!(
            body = %event.actor,
            multiplier = event.multiplier,
            apply = event.apply,
            failures = failures.len(),
            "relayed metabolic multiplier"
        );
        failures
    }

    /// Destructive heat: re-anchor the body to its map and gib it, organs kept in parts.
    ///
    /// Skipped when another observer already handled the event or the actor
    /// has no body. Marks the event handled when it acts.
    pub fn on_microwaved(
        &mut self,
        world: &mut WorldState,
        audio: &mut dyn AudioSink,
        event: &mut MicrowavedEvent,
    ) -> HashSet<EntityId> {
        if event.handled || !self.has_body(event.actor) {
            return HashSet::new();
        }
        world.attach_to_grid_or_map(event.actor);
        let released = self.gib_body(world, audio, event.actor, false, false);
        event.handled = true;
        released
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::body::tests::setup;
    use crate::body::SlotRef;
    use anatomy_world::{AudioQueue, EntityKind, MindComponent, MobState, Placement, SimTime};

    fn kill(world: &mut WorldState, actor: EntityId) -> anatomy_world::MindId {
        let mind = MindComponent::new();
        let id = mind.id;
        let mut dead = world.actor(actor).cloned().unwrap().with_mind(mind);
        dead.mob_state = MobState::Dead;
        world.set_actor(dead);
        id
    }

    #[test]
    fn test_dead_actor_moving_leaves_body_once() {
        let (mut world, mut system, actor) = setup();
        system.create_body(&mut world, actor, "torso").unwrap();
        let mind = kill(&mut world, actor);
        world.end_tick();
        world.end_tick();
        let now = world.time.now;

        assert!(system.on_move_input(&mut world, &MoveInputEvent { actor }));
        let stamped = world.actor(actor).unwrap().mind.as_ref().unwrap().time_of_death;
        assert_eq!(stamped, Some(now));

        world.end_tick();
        assert!(!system.on_move_input(&mut world, &MoveInputEvent { actor }));
        let still = world.actor(actor).unwrap().mind.as_ref().unwrap().time_of_death;
        assert_eq!(still, Some(now));

        let requests = world.take_spectate_requests();
        assert_eq!(requests.len(), 1);
        assert_eq!(requests[0].mind, mind);
        assert_eq!(requests[0].body, actor);
    }

    #[test]
    fn test_living_or_mindless_actor_moving_is_ignored() {
        let (mut world, mut system, actor) = setup();
        system.create_body(&mut world, actor, "torso").unwrap();
        let with_mind = world.actor(actor).cloned().unwrap().with_mind(MindComponent::new());
        world.set_actor(with_mind);

        assert!(!system.on_move_input(&mut world, &MoveInputEvent { actor }));

        let mut dead = world.actor(actor).cloned().unwrap();
        dead.mob_state = MobState::Dead;
        dead.mind = None;
        world.set_actor(dead);
        assert!(!system.on_move_input(&mut world, &MoveInputEvent { actor }));
        assert!(world.pending_spectate_requests().is_empty());
    }

    #[test]
    fn test_existing_time_of_death_is_kept() {
        let (mut world, mut system, actor) = setup();
        system.create_body(&mut world, actor, "torso").unwrap();
        kill(&mut world, actor);
        if let Some(mind) = world.actor_mut(actor).and_then(|a| a.mind.as_mut()) {
            mind.time_of_death = Some(SimTime(3.0));
        }
        world.end_tick();

        assert!(!system.on_move_input(&mut world, &MoveInputEvent { actor }));
        let mind = world.actor(actor).unwrap().mind.clone().unwrap();
        assert_eq!(mind.time_of_death, Some(SimTime(3.0)));
    }

    #[test]
    fn test_metabolic_multiplier_reaches_every_organ() {
        let (mut world, mut system, actor) = setup();
        let torso = system.create_body(&mut world, actor, "torso").unwrap();
        let head = system.spawn_part(&mut world, "head", Placement::default()).unwrap();
        system.attach_part(&mut world, &SlotRef::on_part(torso, "head"), head).unwrap();

        let failures = system.on_metabolic_multiplier(&MetabolicMultiplierEvent {
            actor,
            multiplier: 2.0,
            apply: true,
        });

        assert!(failures.is_empty());
        let intervals: Vec<Option<f32>> = system
            .organs_of(actor)
            .map(|o| o.metabolizer.map(|m| m.update_interval))
            .collect();
        // heart, lungs, brain (no metabolism)
        assert_eq!(intervals, vec![Some(2.0), Some(4.0), None]);

        system.on_metabolic_multiplier(&MetabolicMultiplierEvent {
            actor,
            multiplier: 2.0,
            apply: false,
        });
        let heart = system.organs_of(actor).next().unwrap();
        assert_eq!(heart.metabolizer.unwrap().update_interval, 1.0);
    }

    #[test]
    fn test_metabolic_failure_is_organ_local() {
        let (mut world, mut system, actor) = setup();
        let torso = system.create_body(&mut world, actor, "torso").unwrap();
        let stalled = system.part(torso).unwrap().organs[0];
        system.organs.get_mut(&stalled).unwrap().metabolizer = Some(crate::body::Metabolizer::new(0.0));

        let failures = system.on_metabolic_multiplier(&MetabolicMultiplierEvent {
            actor,
            multiplier: 0.5,
            apply: true,
        });

        assert_eq!(failures.len(), 1);
        assert!(matches!(failures[0], OrganError::InvalidInterval { organ, .. } if organ == stalled));
        let lungs = system.part(torso).unwrap().organs[1];
        assert_eq!(system.organ(lungs).unwrap().metabolizer.unwrap().update_interval, 1.0);
    }

    #[test]
    fn test_multiplier_on_missing_body_is_noop() {
        let (_, mut system, _) = setup();
        let failures = system.on_metabolic_multiplier(&MetabolicMultiplierEvent {
            actor: EntityId::new(),
            multiplier: 2.0,
            apply: true,
        });
        assert!(failures.is_empty());
    }

    #[test]
    fn test_microwave_gibs_once() {
        let (mut world, mut system, actor) = setup();
        let torso = system.create_body(&mut world, actor, "torso").unwrap();
        let microwave = world.spawn("microwave", EntityKind::Item, Placement::default());
        let mut audio = AudioQueue::new();

        let mut event = MicrowavedEvent::new(actor, microwave);
        let released = system.on_microwaved(&mut world, &mut audio, &mut event);

        assert!(event.handled);
        assert_eq!(released, [torso].into_iter().collect());
        assert_eq!(system.part(torso).unwrap().organs.len(), 2);
        assert!(world.is_queued_for_deletion(actor));

        let mut again = MicrowavedEvent::new(actor, microwave);
        assert!(system.on_microwaved(&mut world, &mut audio, &mut again).is_empty());
        assert!(!again.handled);
        assert_eq!(audio.played().len(), 1);
    }

    #[test]
    fn test_microwave_already_handled_is_skipped() {
        let (mut world, mut system, actor) = setup();
        system.create_body(&mut world, actor, "torso").unwrap();
        let mut event = MicrowavedEvent::new(actor, EntityId::new());
        event.handled = true;

        assert!(system
            .on_microwaved(&mut world, &mut AudioQueue::new(), &mut event)
            .is_empty());
        assert!(system.has_body(actor));
        assert!(!world.is_queued_for_deletion(actor));
    }

    #[test]
    fn test_microwave_reanchors_contained_body() {
        let (mut world, mut system, actor) = setup();
        system.create_body(&mut world, actor, "torso").unwrap();
        let microwave = world.spawn("microwave", EntityKind::Item, Placement::on_map(anatomy_world::MapId(1), 9.0, 9.0));
        world.insert_into_container(microwave, "cooking", actor).unwrap();
        let mut audio = AudioQueue::new();

        system.on_microwaved(&mut world, &mut audio, &mut MicrowavedEvent::new(actor, microwave));

        assert!(world.containers.container_of(actor).is_none());
        assert_eq!(audio.played()[0].placement.position, anatomy_world::Position::new(9.0, 9.0));
    }
}
