//! Attachment Engine - the only place slots and part back-references change.
//!
//! Every mutation is split in two: a structural `link`/`unlink` step that
//! validates before touching anything, and an announce step that runs the
//! side effects (placement, presentation layers, notifications). Callers that
//! batch mutations, like gibbing, finish every structural step first.

use anatomy_world::{EntityId, LayerContext, Placement, Presentation, VisualLayer, WorldState};
use tracing::{debug, warn};

use super::{BodySystem, SlotOwner, SlotRef};
use crate::error::{BodyError, Result};
use crate::events::BodyEvent;

/// A committed slot change whose side effects have not run yet.
#[derive(Debug, Clone)]
pub(crate) struct SlotChange {
    pub part: EntityId,
    pub slot: SlotRef,
    /// Body after an attach, previous body after a detach.
    pub body: Option<EntityId>,
    /// The moved part and everything below it.
    pub subtree: Vec<EntityId>,
}

/// A committed organ removal whose side effects have not run yet.
#[derive(Debug, Clone)]
pub(crate) struct OrganChange {
    pub organ: EntityId,
    pub part: EntityId,
    pub body: Option<EntityId>,
}

impl BodySystem {
    /// Check whether `part` could be attached into `slot` right now.
    pub fn can_attach(&self, slot: &SlotRef, part: EntityId) -> Result<()> {
        self.validate_attach(slot, part, false)
    }

    /// Attach a free part into an empty slot.
    ///
    /// The part's descendants and organs join the slot's body with it. If that
    /// body's actor is layered, the layers of every moved part become visible.
    pub fn attach_part(&mut self, world: &mut WorldState, slot: &SlotRef, part: EntityId) -> Result<()> {
        let change = self.link_part(slot, part)?;
        self.announce_attach(world, change);
        Ok(())
    }

    /// Attach a free part into a slot, detaching whatever occupied it.
    ///
    /// Returns the displaced part.
    pub fn replace_part(
        &mut self,
        world: &mut WorldState,
        slot: &SlotRef,
        part: EntityId,
    ) -> Result<Option<EntityId>> {
        self.validate_attach(slot, part, true)?;
        let displaced = self.slot(slot).and_then(|s| s.child);
        let unlinked = match displaced {
            Some(old) => Some(self.unlink_part(old)?),
            None => None,
        };
        let linked = match self.link_part(slot, part) {
            Ok(linked) => linked,
            Err(err) => {
                if let Some(old) = displaced {
                    if let Err(relink) = self.link_part(slot, old) {
                        warn!(part = %old, slot = %slot.slot, error = %relink, "failed to restore displaced part");
                    }
                }
                return Err(err);
            }
        };

        if let Some(unlinked) = unlinked {
            self.announce_detach(world, unlinked);
        }
        self.announce_attach(world, linked);
        Ok(displaced)
    }

    /// Detach a part from its slot. Its descendants and organs stay with it.
    ///
    /// Returns the body the part belonged to before, if any.
    pub fn detach_part(&mut self, world: &mut WorldState, part: EntityId) -> Result<Option<EntityId>> {
        let change = self.unlink_part(part)?;
        let previous = change.body;
        self.announce_detach(world, change);
        Ok(previous)
    }

    /// Limb loss: detach a part and drop it next to the body it came from.
    pub fn drop_part(&mut self, world: &mut WorldState, part: EntityId) -> Result<()> {
        let previous = self.detach_part(world, part)?;
        if let Some(anchor) = previous.and_then(|body| world.world_placement(body)) {
            let dropped = anchor.with_random_offset(self.config.scatter_radius, &mut self.rng);
            world.set_placement(part, dropped);
        }
        Ok(())
    }

    /// Put a free organ inside a part. The organ joins the part's body.
    pub fn insert_organ(&mut self, world: &mut WorldState, part: EntityId, organ: EntityId) -> Result<()> {
        let body = self.parts.get(&part).ok_or(BodyError::UnknownPart(part))?.body;
        let instance = self.organs.get_mut(&organ).ok_or(BodyError::UnknownOrgan(organ))?;
        if instance.part.is_some() {
            return Err(BodyError::OrganAlreadyInserted(organ));
        }
        instance.part = Some(part);
        instance.body = body;
        if let Some(host) = self.parts.get_mut(&part) {
            host.organs.push(organ);
        }

        evict_from_container(world, organ);
        let map = world.placement(part).map(|p| p.map).unwrap_or_default();
        world.set_placement(organ, Placement::attached_to(part, map));
        self.events.raise(world, BodyEvent::OrganInserted { body, part, organ });
        Ok(())
    }

    /// Take an organ out of its part, leaving it free-standing in the world.
    ///
    /// Returns the part it was removed from.
    pub fn remove_organ(&mut self, world: &mut WorldState, organ: EntityId) -> Result<EntityId> {
        let change = self.unlink_organ(organ)?;
        let part = change.part;
        self.announce_organ_removal(world, change);
        Ok(part)
    }

    pub(crate) fn validate_attach(&self, slot: &SlotRef, part: EntityId, allow_occupied: bool) -> Result<()> {
        let candidate = self.parts.get(&part).ok_or(BodyError::UnknownPart(part))?;
        if candidate.parent_slot.is_some() || candidate.body.is_some() {
            return Err(BodyError::PartAlreadyAttached(part));
        }

        let target = self.slot(slot).ok_or_else(|| BodyError::UnknownSlot {
            owner: slot.owner.entity(),
            slot: slot.slot.clone(),
        })?;
        if let Some(occupant) = target.child {
            if !allow_occupied {
                return Err(BodyError::SlotOccupied {
                    owner: slot.owner.entity(),
                    slot: slot.slot.clone(),
                    occupant,
                });
            }
        }
        if target.part_type != candidate.part_type() {
            return Err(BodyError::SlotTypeMismatch {
                slot: slot.slot.clone(),
                expected: target.part_type,
                actual: candidate.part_type(),
            });
        }

        if let SlotOwner::Part(owner) = slot.owner {
            let mut current = Some(owner);
            while let Some(id) = current {
                if id == part {
                    return Err(BodyError::WouldCreateCycle {
                        part,
                        slot: slot.slot.clone(),
                    });
                }
                current = self.parent_part_of(id);
            }
        }
        Ok(())
    }

    /// Structural half of an attach. Validates fully before mutating.
    pub(crate) fn link_part(&mut self, slot: &SlotRef, part: EntityId) -> Result<SlotChange> {
        self.validate_attach(slot, part, false)?;
        let body = match slot.owner {
            SlotOwner::Body(body) => Some(body),
            SlotOwner::Part(owner) => self.parts.get(&owner).and_then(|p| p.body),
        };

        if let Some(target) = self.slot_mut(slot) {
            target.child = Some(part);
        }
        if let Some(instance) = self.parts.get_mut(&part) {
            instance.parent_slot = Some(slot.clone());
        }
        let subtree = self.set_subtree_body(part, body);

        Ok(SlotChange {
            part,
            slot: slot.clone(),
            body,
            subtree,
        })
    }

    /// Structural half of a detach.
    pub(crate) fn unlink_part(&mut self, part: EntityId) -> Result<SlotChange> {
        let instance = self.parts.get(&part).ok_or(BodyError::UnknownPart(part))?;
        let slot = instance.parent_slot.clone().ok_or(BodyError::NotAttached(part))?;
        let previous_body = instance.body;

        if let Some(target) = self.slot_mut(&slot) {
            if target.child == Some(part) {
                target.child = None;
            }
        }
        if let Some(instance) = self.parts.get_mut(&part) {
            instance.parent_slot = None;
        }
        let subtree = self.set_subtree_body(part, None);

        Ok(SlotChange {
            part,
            slot,
            body: previous_body,
            subtree,
        })
    }

    pub(crate) fn unlink_organ(&mut self, organ: EntityId) -> Result<OrganChange> {
        let instance = self.organs.get_mut(&organ).ok_or(BodyError::UnknownOrgan(organ))?;
        let part = instance.part.take().ok_or(BodyError::OrganNotInserted(organ))?;
        let body = instance.body.take();
        if let Some(host) = self.parts.get_mut(&part) {
            host.organs.retain(|o| *o != organ);
        }
        Ok(OrganChange { organ, part, body })
    }

    pub(crate) fn announce_attach(&mut self, world: &mut WorldState, change: SlotChange) {
        let parent = change.slot.owner.entity();
        evict_from_container(world, change.part);
        let map = world.placement(parent).map(|p| p.map).unwrap_or_default();
        world.set_placement(change.part, Placement::attached_to(parent, map));

        if let Some(body) = change.body {
            self.set_layers_visible(world, body, &change.subtree, true, LayerContext::PartAttached);
        }
        debug!(part = %change.part, slot = %change.slot.slot, body = ?change.body, "attached part");
        self.events.raise(
            world,
            BodyEvent::PartAttached {
                body: change.body,
                part: change.part,
                parent,
                slot: change.slot.slot,
            },
        );
    }

    pub(crate) fn announce_detach(&mut self, world: &mut WorldState, change: SlotChange) {
        world.attach_to_grid_or_map(change.part);

        if let Some(body) = change.body {
            self.set_layers_visible(world, body, &change.subtree, false, LayerContext::PartDetached);
        }
        debug!(part = %change.part, slot = %change.slot.slot, body = ?change.body, "detached part");
        self.events.raise(
            world,
            BodyEvent::PartDetached {
                body: change.body,
                part: change.part,
                parent: change.slot.owner.entity(),
                slot: change.slot.slot,
            },
        );
    }

    pub(crate) fn announce_organ_removal(&mut self, world: &mut WorldState, change: OrganChange) {
        world.attach_to_grid_or_map(change.organ);
        self.events.raise(
            world,
            BodyEvent::OrganRemoved {
                body: change.body,
                part: change.part,
                organ: change.organ,
            },
        );
    }

    /// Toggle the layers of `parts` on a body's actor, if it is drawn in layers.
    fn set_layers_visible(
        &self,
        world: &mut WorldState,
        body: EntityId,
        parts: &[EntityId],
        visible: bool,
        context: LayerContext,
    ) {
        let layered = world
            .actor(body)
            .map(|a| a.appearance.is_some())
            .unwrap_or(false);
        if !layered {
            return;
        }
        let layers: Vec<VisualLayer> = parts
            .iter()
            .filter_map(|id| self.parts.get(id))
            .flat_map(|p| p.definition.layers.iter().copied())
            .collect();
        if !layers.is_empty() {
            world.set_layers_visible(body, &layers, visible, false, context);
        }
    }
}

fn evict_from_container(world: &mut WorldState, entity: EntityId) {
    if let Some((owner, name)) = world
        .containers
        .container_of(entity)
        .map(|(owner, name)| (owner, name.to_string()))
    {
        world.containers.force_remove(owner, &name, entity);
    }
}
