//! Decomposition Engine - gibbing a body into free-standing parts and organs.

use anatomy_world::{Audience, AudioParams, AudioSink, EntityId, WorldState};
use std::collections::HashSet;
use tracing::{debug, info, warn};

use super::BodySystem;
use crate::events::BodyEvent;

impl BodySystem {
    /// Tear a body apart.
    ///
    /// Every reachable part is detached (and every organ removed when
    /// `include_organs` is set), the gib sound plays at the body, contained
    /// items are scattered around it or deleted, `BodyGibbed` is raised and
    /// the actor is queued for deletion. With `delete_items` the released
    /// parts and organs are queued for deletion too.
    ///
    /// Returns the released parts and organs. A body that is missing or was
    /// already gibbed yields an empty set.
    pub fn gib_body(
        &mut self,
        world: &mut WorldState,
        audio: &mut dyn AudioSink,
        actor: EntityId,
        include_organs: bool,
        delete_items: bool,
    ) -> HashSet<EntityId> {
        let Some(gib_sound) = self.bodies.get(&actor).map(|b| b.gib_sound.clone()) else {
            debug!(body = %actor, "gib requested for entity without a body");
            return HashSet::new();
        };

        // Structural teardown first; side effects run once the graph is settled.
        let parts: Vec<EntityId> = self.parts_reachable_from(actor).map(|p| p.id).collect();
        let mut released_order = Vec::with_capacity(parts.len());
        let mut detached = Vec::with_capacity(parts.len());
        for part in parts.iter().rev() {
            match self.unlink_part(*part) {
                Ok(change) => {
                    released_order.push(*part);
                    detached.push(change);
                }
                Err(err) => warn!(body = %actor, part = %part, error = %err, "failed to detach part"),
            }
        }

        let mut removed_organs = Vec::new();
        if include_organs {
            for part in &parts {
                let organs = self.parts.get(part).map(|p| p.organs.clone()).unwrap_or_default();
                for organ in organs {
                    match self.unlink_organ(organ) {
                        Ok(change) => {
                            released_order.push(organ);
                            removed_organs.push(change);
                        }
                        Err(err) => warn!(body = %actor, organ = %organ, error = %err, "failed to remove organ"),
                    }
                }
            }
        }

        for change in detached {
            self.announce_detach(world, change);
        }
        for change in removed_organs {
            self.announce_organ_removal(world, change);
        }

        let placement = world.world_placement(actor);
        if let Some(placement) = placement {
            let params = AudioParams::default().with_variation(self.config.gib_audio_variation);
            let audience = Audience::InRange {
                range: self.config.audible_range,
            };
            if let Err(err) = audio.play(&gib_sound, audience, placement, params) {
                warn!(body = %actor, error = %err, "gib sound failed");
            }
        }

        for id in &released_order {
            if delete_items {
                // Organs still hosted by a deleted part go with it.
                if let Some(part) = self.parts.get(id) {
                    for organ in &part.organs {
                        world.queue_delete(*organ);
                    }
                }
                world.queue_delete(*id);
            } else if let Some(placement) = placement {
                let scattered = placement.with_random_offset(self.config.scatter_radius, &mut self.rng);
                world.set_placement(*id, scattered);
            }
        }

        let containers: Vec<(String, Vec<EntityId>)> = world
            .containers
            .containers_of(actor)
            .iter()
            .map(|c| (c.name.clone(), c.contents.clone()))
            .collect();
        for (name, contents) in containers {
            for item in contents {
                if delete_items {
                    world.queue_delete(item);
                    continue;
                }
                world.containers.force_remove(actor, &name, item);
                if let Some(placement) = placement {
                    let scattered = placement.with_random_offset(self.config.scatter_radius, &mut self.rng);
                    world.set_placement(item, scattered);
                }
            }
        }

        let released: HashSet<EntityId> = released_order.into_iter().collect();
        self.events.raise(
            world,
            BodyEvent::BodyGibbed {
                body: actor,
                released: released.clone(),
            },
        );

        self.bodies.remove(&actor);
        world.queue_delete(actor);
        info!(body = %actor, released = released.len(), include_organs, delete_items, "gibbed body");
        released
    }
}
