//! Body graph data: slots, part instances, organs and traversal.
//!
//! Parts and organs live in arenas keyed by entity id. Slots hold ids, never
//! ownership, and `owner` / `body` back-references are lookups only.

use anatomy_world::{EntityId, OrganKind, PartType, SoundSpec};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use thiserror::Error;

use crate::registry::{OrganDefinition, PartDefinition};

/// Id of the single slot a body offers for its root part.
pub const ROOT_SLOT: &str = "root";

/// What a slot hangs off.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SlotOwner {
    /// The root slot of the body owned by this actor.
    Body(EntityId),
    /// A child slot offered by this part.
    Part(EntityId),
}

impl SlotOwner {
    pub fn entity(&self) -> EntityId {
        match self {
            SlotOwner::Body(id) | SlotOwner::Part(id) => *id,
        }
    }
}

/// Address of a slot: its owner plus its id.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct SlotRef {
    pub owner: SlotOwner,
    pub slot: String,
}

impl SlotRef {
    /// The root slot of an actor's body.
    pub fn root(body: EntityId) -> Self {
        Self {
            owner: SlotOwner::Body(body),
            slot: ROOT_SLOT.to_string(),
        }
    }

    /// A named child slot on a part.
    pub fn on_part(part: EntityId, slot: impl Into<String>) -> Self {
        Self {
            owner: SlotOwner::Part(part),
            slot: slot.into(),
        }
    }
}

/// A typed attachment point holding at most one part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BodyPartSlot {
    pub id: String,
    pub part_type: PartType,
    pub owner: SlotOwner,
    pub child: Option<EntityId>,
}

impl BodyPartSlot {
    pub fn new(id: impl Into<String>, part_type: PartType, owner: SlotOwner) -> Self {
        Self {
            id: id.into(),
            part_type,
            owner,
            child: None,
        }
    }

    pub fn is_empty(&self) -> bool {
        self.child.is_none()
    }

    pub fn slot_ref(&self) -> SlotRef {
        SlotRef {
            owner: self.owner,
            slot: self.id.clone(),
        }
    }
}

/// A concrete part. Belongs to at most one body and sits in at most one slot.
#[derive(Debug, Clone)]
pub struct BodyPart {
    pub id: EntityId,
    pub definition: Arc<PartDefinition>,
    /// Body whose root this part is reachable from.
    pub body: Option<EntityId>,
    /// Slot currently holding this part.
    pub parent_slot: Option<SlotRef>,
    /// Child slots, in declaration order.
    pub slots: Vec<BodyPartSlot>,
    pub organs: Vec<EntityId>,
}

impl BodyPart {
    pub fn part_type(&self) -> PartType {
        self.definition.part_type
    }

    pub fn slot(&self, id: &str) -> Option<&BodyPartSlot> {
        self.slots.iter().find(|s| s.id == id)
    }

    pub(crate) fn slot_mut(&mut self, id: &str) -> Option<&mut BodyPartSlot> {
        self.slots.iter_mut().find(|s| s.id == id)
    }

    /// Parts held by this part's slots, in slot order.
    pub fn children(&self) -> impl Iterator<Item = EntityId> + '_ {
        self.slots.iter().filter_map(|s| s.child)
    }
}

/// Per-organ failure during a broadcast.
#[derive(Debug, Error, PartialEq)]
pub enum OrganError {
    #[error("organ {organ} rejected metabolic multiplier {multiplier}")]
    InvalidMultiplier { organ: EntityId, multiplier: f32 },

    #[error("organ {organ} has an unusable metabolism interval {interval}")]
    InvalidInterval { organ: EntityId, interval: f32 },
}

/// Periodic metabolism state of an organ.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Metabolizer {
    /// Seconds between updates.
    pub update_interval: f32,
    /// Seconds accumulated towards the next update.
    pub accumulated: f32,
}

impl Metabolizer {
    pub fn new(update_interval: f32) -> Self {
        Self {
            update_interval,
            accumulated: 0.0,
        }
    }

    /// Scale the update interval; `apply = false` reverts an earlier application.
    pub fn apply_multiplier(
        &mut self,
        organ: EntityId,
        multiplier: f32,
        apply: bool,
    ) -> Result<(), OrganError> {
        if !multiplier.is_finite() || multiplier <= 0.0 {
            return Err(OrganError::InvalidMultiplier { organ, multiplier });
        }
        let next = if apply {
            self.update_interval * multiplier
        } else {
            self.update_interval / multiplier
        };
        if !next.is_finite() || next <= 0.0 {
            return Err(OrganError::InvalidInterval {
                organ,
                interval: self.update_interval,
            });
        }
        self.update_interval = next;
        if !apply && self.accumulated >= next {
            self.accumulated = next;
        }
        Ok(())
    }
}

/// A sub-entity hosted by a part. Travels with its part.
#[derive(Debug, Clone)]
pub struct Organ {
    pub id: EntityId,
    pub definition: Arc<OrganDefinition>,
    pub body: Option<EntityId>,
    pub part: Option<EntityId>,
    pub metabolizer: Option<Metabolizer>,
}

impl Organ {
    pub fn kind(&self) -> OrganKind {
        self.definition.kind
    }

    /// React to a metabolic multiplier. Organs without metabolism ignore it.
    pub fn apply_metabolic_multiplier(&mut self, multiplier: f32, apply: bool) -> Result<(), OrganError> {
        match self.metabolizer.as_mut() {
            Some(metabolizer) => metabolizer.apply_multiplier(self.id, multiplier, apply),
            None => Ok(()),
        }
    }
}

/// The body of one actor: a root slot and per-body metadata.
#[derive(Debug, Clone)]
pub struct BodyGraph {
    /// Actor owning the body. Its containers park the body's contents.
    pub owner: EntityId,
    pub root: BodyPartSlot,
    pub layout: Option<String>,
    pub gib_sound: SoundSpec,
}

impl BodyGraph {
    pub fn new(owner: EntityId, root_type: PartType, gib_sound: SoundSpec) -> Self {
        Self {
            owner,
            root: BodyPartSlot::new(ROOT_SLOT, root_type, SlotOwner::Body(owner)),
            layout: None,
            gib_sound,
        }
    }

    pub fn root_part(&self) -> Option<EntityId> {
        self.root.child
    }
}

/// Depth-first walk over the attachment tree, children in slot order.
///
/// Lazy and finite; build a new one to restart.
pub struct PartsIter<'a> {
    parts: &'a HashMap<EntityId, BodyPart>,
    stack: Vec<EntityId>,
}

impl<'a> PartsIter<'a> {
    pub(crate) fn new(parts: &'a HashMap<EntityId, BodyPart>, start: Option<EntityId>) -> Self {
        Self {
            parts,
            stack: start.into_iter().collect(),
        }
    }
}

impl<'a> Iterator for PartsIter<'a> {
    type Item = &'a BodyPart;

    fn next(&mut self) -> Option<Self::Item> {
        while let Some(id) = self.stack.pop() {
            let Some(part) = self.parts.get(&id) else {
                continue;
            };
            let children: Vec<EntityId> = part.children().collect();
            self.stack.extend(children.into_iter().rev());
            return Some(part);
        }
        None
    }
}
