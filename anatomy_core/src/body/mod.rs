//! Body Graph Model - the arena of parts, organs and bodies, plus creation and queries.
//!
//! All structural mutation goes through the attachment engine in
//! [`attachment`]; this module only creates free-standing parts and organs
//! and answers questions about the graph.

mod attachment;
mod decomposition;
mod graph;

pub use attachment::*;
pub use graph::*;

use anatomy_world::{EntityId, EntityKind, PartType, Placement, SoundSpec, WorldState};
use rand::SeedableRng;
use rand_chacha::ChaCha8Rng;
use std::collections::HashMap;
use tracing::{debug, info, warn};

use crate::config::BodyConfig;
use crate::error::{BodyError, Result};
use crate::events::{BodyObserver, EventBus};
use crate::registry::PartRegistry;

/// Owner of every body graph in a world.
#[derive(Debug)]
pub struct BodySystem {
    registry: PartRegistry,
    config: BodyConfig,

    /// Body graphs by owning actor.
    bodies: HashMap<EntityId, BodyGraph>,

    /// Every part instance, attached or free-standing.
    parts: HashMap<EntityId, BodyPart>,

    /// Every organ, inserted or free-standing.
    pub(crate) organs: HashMap<EntityId, Organ>,

    events: EventBus,
    rng: ChaCha8Rng,
}

impl BodySystem {
    /// Create a body system over a populated registry.
    pub fn new(registry: PartRegistry, config: BodyConfig) -> Self {
        let rng = match config.rng_seed {
            Some(seed) => ChaCha8Rng::seed_from_u64(seed),
            None => ChaCha8Rng::from_entropy(),
        };
        Self {
            registry,
            config,
            bodies: HashMap::new(),
            parts: HashMap::new(),
            organs: HashMap::new(),
            events: EventBus::new(),
            rng,
        }
    }

    /// Create a body system with default configuration.
    pub fn with_defaults(registry: PartRegistry) -> Self {
        Self::new(registry, BodyConfig::default())
    }

    pub fn registry(&self) -> &PartRegistry {
        &self.registry
    }

    pub fn config(&self) -> &BodyConfig {
        &self.config
    }

    /// Register an observer for body notifications.
    pub fn subscribe(&mut self, observer: impl BodyObserver + 'static) {
        self.events.subscribe(observer);
    }

    pub fn events(&self) -> &EventBus {
        &self.events
    }

    /// Spawn a free-standing part with empty slots and its declared organs.
    pub fn spawn_part(
        &mut self,
        world: &mut WorldState,
        part_type: &str,
        placement: Placement,
    ) -> Result<EntityId> {
        let definition = self.registry.definition_for(part_type)?;
        let organ_definitions = definition
            .organs
            .iter()
            .map(|organ| self.registry.organ_definition_for(organ))
            .collect::<Result<Vec<_>>>()?;

        let id = world.spawn(definition.id.clone(), EntityKind::BodyPart, placement);
        let slots = definition
            .slots
            .iter()
            .map(|s| BodyPartSlot::new(s.id.clone(), s.part_type, SlotOwner::Part(id)))
            .collect();

        let mut organs = Vec::with_capacity(organ_definitions.len());
        for organ_definition in organ_definitions {
            let organ_id = world.spawn(
                organ_definition.id.clone(),
                EntityKind::Organ,
                Placement::attached_to(id, placement.map),
            );
            self.organs.insert(
                organ_id,
                Organ {
                    id: organ_id,
                    metabolizer: organ_definition.metabolism_interval.map(Metabolizer::new),
                    definition: organ_definition,
                    body: None,
                    part: Some(id),
                },
            );
            organs.push(organ_id);
        }

        debug!(part = %id, part_type, organs = organs.len(), "spawned part");
        self.parts.insert(
            id,
            BodyPart {
                id,
                definition,
                body: None,
                parent_slot: None,
                slots,
                organs,
            },
        );
        Ok(id)
    }

    /// Spawn a free-standing organ.
    pub fn spawn_organ(
        &mut self,
        world: &mut WorldState,
        organ_type: &str,
        placement: Placement,
    ) -> Result<EntityId> {
        let definition = self.registry.organ_definition_for(organ_type)?;
        let id = world.spawn(definition.id.clone(), EntityKind::Organ, placement);
        self.organs.insert(
            id,
            Organ {
                id,
                metabolizer: definition.metabolism_interval.map(Metabolizer::new),
                definition,
                body: None,
                part: None,
            },
        );
        Ok(id)
    }

    /// Give an actor a body whose root is a new part of `root_part_type`.
    ///
    /// Returns the root part. On failure the actor is left without a body.
    pub fn create_body(
        &mut self,
        world: &mut WorldState,
        actor: EntityId,
        root_part_type: &str,
    ) -> Result<EntityId> {
        if !world.exists(actor) {
            return Err(BodyError::EntityNotFound(actor));
        }
        if self.bodies.contains_key(&actor) {
            return Err(BodyError::BodyAlreadyExists { actor });
        }
        let map = world.placement(actor).map(|p| p.map).unwrap_or_default();
        let root = self
            .spawn_part(world, root_part_type, Placement::attached_to(actor, map))
            .map_err(|source| BodyError::InvalidPrototype {
                actor,
                source: Box::new(source),
            })?;
        let root_type = self.parts[&root].part_type();

        self.bodies.insert(
            actor,
            BodyGraph::new(actor, root_type, SoundSpec::new(self.config.gib_sound.clone())),
        );
        if let Err(err) = self.attach_part(world, &SlotRef::root(actor), root) {
            self.bodies.remove(&actor);
            self.discard_free_part(world, root);
            return Err(BodyError::InvalidPrototype {
                actor,
                source: Box::new(err),
            });
        }

        info!(body = %actor, root = %root, root_part_type, "created body");
        Ok(root)
    }

    /// Create a body from a registered layout: the root plus every layout attachment.
    ///
    /// Each attachment fills the first empty slot with its id, in traversal order.
    /// Attachments with no matching free slot are skipped.
    pub fn spawn_body_from_layout(
        &mut self,
        world: &mut WorldState,
        actor: EntityId,
        layout: &str,
    ) -> Result<EntityId> {
        let invalid = |source: BodyError| BodyError::InvalidPrototype {
            actor,
            source: Box::new(source),
        };
        let layout = self.registry.layout_for(layout).map_err(invalid)?;
        for attachment in &layout.attachments {
            let definition = self.registry.definition_for(&attachment.part).map_err(invalid)?;
            for organ in &definition.organs {
                self.registry.organ_definition_for(organ).map_err(invalid)?;
            }
        }

        let root = self.create_body(world, actor, &layout.root)?;
        if let Some(graph) = self.bodies.get_mut(&actor) {
            graph.layout = Some(layout.id.clone());
            if let Some(sound) = &layout.gib_sound {
                graph.gib_sound = SoundSpec::new(sound.clone());
            }
        }

        let map = world.placement(actor).map(|p| p.map).unwrap_or_default();
        for attachment in &layout.attachments {
            let Some(slot) = self.first_free_slot(actor, &attachment.slot) else {
                warn!(body = %actor, slot = %attachment.slot, "layout slot unavailable, skipping");
                continue;
            };
            let part = match self.spawn_part(world, &attachment.part, Placement::attached_to(slot.owner.entity(), map)) {
                Ok(part) => part,
                Err(err) => {
                    self.discard_body(world, actor);
                    return Err(invalid(err));
                }
            };
            if let Err(err) = self.attach_part(world, &slot, part) {
                warn!(body = %actor, slot = %attachment.slot, error = %err, "layout attachment rejected");
                self.discard_free_part(world, part);
            }
        }
        Ok(root)
    }

    /// Delete a part that never made it into a graph, with its organs.
    fn discard_free_part(&mut self, world: &mut WorldState, part: EntityId) {
        if let Some(removed) = self.parts.remove(&part) {
            for organ in removed.organs {
                self.organs.remove(&organ);
                world.queue_delete(organ);
            }
        }
        world.queue_delete(part);
    }

    /// Remove a half-built body and delete every part it reached.
    fn discard_body(&mut self, world: &mut WorldState, actor: EntityId) {
        let parts: Vec<EntityId> = self.parts_reachable_from(actor).map(|p| p.id).collect();
        self.bodies.remove(&actor);
        for part in parts {
            self.discard_free_part(world, part);
        }
        warn!(body = %actor, "discarded partially built body");
    }

    fn first_free_slot(&self, body: EntityId, slot: &str) -> Option<SlotRef> {
        self.parts_reachable_from(body)
            .find_map(|part| part.slot(slot).filter(|s| s.is_empty()).map(|s| s.slot_ref()))
    }

    pub fn has_body(&self, actor: EntityId) -> bool {
        self.bodies.contains_key(&actor)
    }

    pub fn body(&self, actor: EntityId) -> Option<&BodyGraph> {
        self.bodies.get(&actor)
    }

    pub fn part(&self, id: EntityId) -> Option<&BodyPart> {
        self.parts.get(&id)
    }

    pub fn organ(&self, id: EntityId) -> Option<&Organ> {
        self.organs.get(&id)
    }

    pub fn root_part_of(&self, actor: EntityId) -> Option<EntityId> {
        self.bodies.get(&actor).and_then(|b| b.root_part())
    }

    /// The body a part currently belongs to.
    pub fn body_of(&self, part: EntityId) -> Option<EntityId> {
        self.parts.get(&part).and_then(|p| p.body)
    }

    /// The part whose slot holds this part, if any.
    pub fn parent_part_of(&self, part: EntityId) -> Option<EntityId> {
        match self.parts.get(&part)?.parent_slot.as_ref()?.owner {
            SlotOwner::Part(parent) => Some(parent),
            SlotOwner::Body(_) => None,
        }
    }

    /// Parts held directly by a part's slots, in slot order.
    pub fn children_of(&self, part: EntityId) -> Vec<EntityId> {
        self.parts
            .get(&part)
            .map(|p| p.children().collect())
            .unwrap_or_default()
    }

    pub fn slots_of(&self, part: EntityId) -> &[BodyPartSlot] {
        self.parts.get(&part).map(|p| p.slots.as_slice()).unwrap_or(&[])
    }

    pub fn slot(&self, slot: &SlotRef) -> Option<&BodyPartSlot> {
        match slot.owner {
            SlotOwner::Body(body) => self
                .bodies
                .get(&body)
                .map(|b| &b.root)
                .filter(|root| root.id == slot.slot),
            SlotOwner::Part(part) => self.parts.get(&part).and_then(|p| p.slot(&slot.slot)),
        }
    }

    pub(crate) fn slot_mut(&mut self, slot: &SlotRef) -> Option<&mut BodyPartSlot> {
        match slot.owner {
            SlotOwner::Body(body) => self
                .bodies
                .get_mut(&body)
                .map(|b| &mut b.root)
                .filter(|root| root.id == slot.slot),
            SlotOwner::Part(part) => self.parts.get_mut(&part).and_then(|p| p.slot_mut(&slot.slot)),
        }
    }

    /// Add a child slot to an existing part. Returns `false` if it already exists.
    pub fn add_slot(&mut self, part: EntityId, slot: &str, part_type: PartType) -> Result<bool> {
        let instance = self.parts.get_mut(&part).ok_or(BodyError::UnknownPart(part))?;
        if instance.slot(slot).is_some() {
            return Ok(false);
        }
        instance
            .slots
            .push(BodyPartSlot::new(slot, part_type, SlotOwner::Part(part)));
        Ok(true)
    }

    /// Parts reachable from the body's root, depth-first in slot order.
    ///
    /// Empty when the actor has no body.
    pub fn parts_reachable_from(&self, actor: EntityId) -> PartsIter<'_> {
        PartsIter::new(&self.parts, self.root_part_of(actor))
    }

    /// Parts reachable from a part, the part itself first.
    pub fn subtree_of(&self, part: EntityId) -> PartsIter<'_> {
        let start = self.parts.contains_key(&part).then_some(part);
        PartsIter::new(&self.parts, start)
    }

    /// Organs of every reachable part, in part order then organ order.
    pub fn organs_of(&self, actor: EntityId) -> impl Iterator<Item = &Organ> + '_ {
        self.parts_reachable_from(actor)
            .flat_map(|part| part.organs.iter())
            .filter_map(|id| self.organs.get(id))
    }

    /// Drop arena entries for entities the world has deleted.
    ///
    /// Anything still linked to a deleted entity is unlinked first so the
    /// graph stays a consistent tree.
    pub fn forget_deleted(&mut self, deleted: &[EntityId]) {
        for id in deleted {
            if let Some(graph) = self.bodies.remove(id) {
                if let Some(root) = graph.root_part() {
                    self.orphan_subtree(root);
                }
                debug!(body = %id, "forgot deleted body");
            }
        }

        for id in deleted {
            let Some(part) = self.parts.get(id) else {
                continue;
            };
            let parent_slot = part.parent_slot.clone();
            let children: Vec<EntityId> = part.children().collect();
            let organs = part.organs.clone();

            if let Some(slot) = parent_slot {
                if let Some(slot) = self.slot_mut(&slot) {
                    slot.child = None;
                }
            }
            for child in children {
                self.orphan_subtree(child);
            }
            for organ in organs {
                if let Some(organ) = self.organs.get_mut(&organ) {
                    organ.part = None;
                    organ.body = None;
                }
            }
            self.parts.remove(id);
        }

        for id in deleted {
            let Some(organ) = self.organs.remove(id) else {
                continue;
            };
            if let Some(part) = organ.part.and_then(|p| self.parts.get_mut(&p)) {
                part.organs.retain(|o| o != id);
            }
        }
    }

    /// Cut a part loose from its slot and clear body links below it.
    fn orphan_subtree(&mut self, part: EntityId) {
        if let Some(instance) = self.parts.get_mut(&part) {
            instance.parent_slot = None;
        }
        self.set_subtree_body(part, None);
    }

    /// Point a part, its descendants and their organs at `body`.
    pub(crate) fn set_subtree_body(&mut self, part: EntityId, body: Option<EntityId>) -> Vec<EntityId> {
        let subtree: Vec<EntityId> = self.subtree_of(part).map(|p| p.id).collect();
        for id in &subtree {
            if let Some(instance) = self.parts.get_mut(id) {
                instance.body = body;
                for organ in &instance.organs {
                    if let Some(organ) = self.organs.get_mut(organ) {
                        organ.body = body;
                    }
                }
            }
        }
        subtree
    }
}

#[cfg(test)]
pub(crate) mod tests {
    use super::*;
    use crate::registry::{OrganDefinition, PartDefinition};
    use anatomy_world::{MapId, OrganKind, PartSymmetry};

    /// Torso with head and two arm slots; arms offer a hand slot; torso holds heart and lungs.
    pub(crate) fn human_registry() -> PartRegistry {
        let mut registry = PartRegistry::new();
        registry.register_part(
            PartDefinition::new("torso", PartType::Torso, PartSymmetry::None)
                .with_slot("head", PartType::Head)
                .with_slot("left_arm", PartType::Arm)
                .with_slot("right_arm", PartType::Arm)
                .with_organ("heart")
                .with_organ("lungs"),
        );
        registry.register_part(
            PartDefinition::new("head", PartType::Head, PartSymmetry::None).with_organ("brain"),
        );
        registry.register_part(
            PartDefinition::new("left_arm", PartType::Arm, PartSymmetry::Left)
                .with_slot("hand", PartType::Hand),
        );
        registry.register_part(
            PartDefinition::new("right_arm", PartType::Arm, PartSymmetry::Right)
                .with_slot("hand", PartType::Hand),
        );
        registry.register_part(PartDefinition::new("left_hand", PartType::Hand, PartSymmetry::Left));
        registry.register_part(PartDefinition::new("left_leg", PartType::Leg, PartSymmetry::Left));
        registry.register_part(
            PartDefinition::new("broken", PartType::Torso, PartSymmetry::None).with_organ("appendix"),
        );
        registry.register_organ(OrganDefinition::new("heart", OrganKind::Heart, Some(1.0)));
        registry.register_organ(OrganDefinition::new("lungs", OrganKind::Lungs, Some(2.0)));
        registry.register_organ(OrganDefinition::new("brain", OrganKind::Brain, None));
        registry
    }

    pub(crate) fn test_config() -> BodyConfig {
        BodyConfig {
            rng_seed: Some(42),
            ..BodyConfig::default()
        }
    }

    pub(crate) fn setup() -> (WorldState, BodySystem, EntityId) {
        let mut world = WorldState::new();
        let actor = world.spawn_actor("Urist", Placement::on_map(MapId(1), 4.0, 7.0));
        let system = BodySystem::new(human_registry(), test_config());
        (world, system, actor)
    }

    #[test]
    fn test_create_body_has_only_root() {
        let (mut world, mut system, actor) = setup();
        let root = system.create_body(&mut world, actor, "torso").unwrap();

        let reachable: Vec<EntityId> = system.parts_reachable_from(actor).map(|p| p.id).collect();
        assert_eq!(reachable, vec![root]);
        assert_eq!(system.body_of(root), Some(actor));
        assert_eq!(system.root_part_of(actor), Some(root));
        assert!(system.body(actor).unwrap().root.child == Some(root));
    }

    #[test]
    fn test_create_body_unknown_root_is_invalid_prototype() {
        let (mut world, mut system, actor) = setup();
        let err = system.create_body(&mut world, actor, "tentacle").unwrap_err();

        assert!(matches!(err, BodyError::InvalidPrototype { .. }));
        assert!(!system.has_body(actor));
    }

    #[test]
    fn test_create_body_with_missing_organ_definition_fails_cleanly() {
        let (mut world, mut system, actor) = setup();
        let entities_before = world.entity_count();

        let err = system.create_body(&mut world, actor, "broken").unwrap_err();
        match err {
            BodyError::InvalidPrototype { source, .. } => {
                assert_eq!(*source, BodyError::UnknownOrganType("appendix".into()))
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert_eq!(world.entity_count(), entities_before);
    }

    #[test]
    fn test_create_body_twice_rejected() {
        let (mut world, mut system, actor) = setup();
        system.create_body(&mut world, actor, "torso").unwrap();
        assert_eq!(
            system.create_body(&mut world, actor, "torso").unwrap_err(),
            BodyError::BodyAlreadyExists { actor }
        );
    }

    #[test]
    fn test_create_body_for_missing_actor() {
        let (mut world, mut system, _) = setup();
        let ghost = EntityId::new();
        assert_eq!(
            system.create_body(&mut world, ghost, "torso").unwrap_err(),
            BodyError::EntityNotFound(ghost)
        );
    }

    #[test]
    fn test_spawned_part_carries_declared_organs() {
        let (mut world, mut system, _) = setup();
        let torso = system.spawn_part(&mut world, "torso", Placement::default()).unwrap();

        let part = system.part(torso).unwrap();
        assert_eq!(part.slots.len(), 3);
        assert_eq!(part.organs.len(), 2);
        assert!(part.slots.iter().all(|s| s.is_empty() && s.owner == SlotOwner::Part(torso)));
        for organ in &part.organs {
            assert_eq!(system.organ(*organ).unwrap().part, Some(torso));
        }
    }

    #[test]
    fn test_organs_of_follow_part_order() {
        let (mut world, mut system, actor) = setup();
        let torso = system.create_body(&mut world, actor, "torso").unwrap();
        let head = system.spawn_part(&mut world, "head", Placement::default()).unwrap();
        system.attach_part(&mut world, &SlotRef::on_part(torso, "head"), head).unwrap();

        let kinds: Vec<OrganKind> = system.organs_of(actor).map(|o| o.kind()).collect();
        assert_eq!(kinds, vec![OrganKind::Heart, OrganKind::Lungs, OrganKind::Brain]);
        assert!(system.organs_of(actor).all(|o| o.body == Some(actor)));
        assert_eq!(system.organs_of(EntityId::new()).count(), 0);
    }

    #[test]
    fn test_layout_builds_full_tree() {
        let (mut world, _, actor) = setup();
        let mut registry = human_registry();
        registry.register_layout(crate::registry::BodyLayout {
            id: "human".into(),
            root: "torso".into(),
            attachments: vec![
                anatomy_world::LayoutAttachment { slot: "left_arm".into(), part: "left_arm".into() },
                anatomy_world::LayoutAttachment { slot: "hand".into(), part: "left_hand".into() },
                anatomy_world::LayoutAttachment { slot: "tail".into(), part: "left_hand".into() },
            ],
            gib_sound: Some("/Audio/squelch.ogg".into()),
        });
        let mut system = BodySystem::new(registry, test_config());

        system.spawn_body_from_layout(&mut world, actor, "human").unwrap();

        let types: Vec<PartType> = system.parts_reachable_from(actor).map(|p| p.part_type()).collect();
        assert_eq!(types, vec![PartType::Torso, PartType::Arm, PartType::Hand]);
        let graph = system.body(actor).unwrap();
        assert_eq!(graph.layout.as_deref(), Some("human"));
        assert_eq!(graph.gib_sound, SoundSpec::new("/Audio/squelch.ogg"));
    }

    #[test]
    fn test_layout_with_unknown_part_creates_nothing() {
        let (mut world, _, actor) = setup();
        let mut registry = human_registry();
        registry.register_layout(crate::registry::BodyLayout {
            id: "odd".into(),
            root: "torso".into(),
            attachments: vec![anatomy_world::LayoutAttachment {
                slot: "left_arm".into(),
                part: "wing".into(),
            }],
            gib_sound: None,
        });
        let mut system = BodySystem::new(registry, test_config());

        let err = system.spawn_body_from_layout(&mut world, actor, "odd").unwrap_err();
        assert!(matches!(err, BodyError::InvalidPrototype { .. }));
        assert!(!system.has_body(actor));
    }

    #[test]
    fn test_layout_with_unknown_organ_creates_nothing() {
        let (mut world, _, actor) = setup();
        let mut registry = human_registry();
        registry.register_part(
            PartDefinition::new("gilled_arm", PartType::Arm, PartSymmetry::Left).with_organ("gills"),
        );
        registry.register_layout(crate::registry::BodyLayout {
            id: "fishman".into(),
            root: "torso".into(),
            attachments: vec![anatomy_world::LayoutAttachment {
                slot: "left_arm".into(),
                part: "gilled_arm".into(),
            }],
            gib_sound: None,
        });
        let mut system = BodySystem::new(registry, test_config());
        let entities_before = world.entity_count();

        let err = system.spawn_body_from_layout(&mut world, actor, "fishman").unwrap_err();
        match err {
            BodyError::InvalidPrototype { source, .. } => {
                assert_eq!(*source, BodyError::UnknownOrganType("gills".into()))
            }
            other => panic!("unexpected error {other:?}"),
        }
        assert!(!system.has_body(actor));
        assert_eq!(world.entity_count(), entities_before);
    }

    #[test]
    fn test_add_slot() {
        let (mut world, mut system, _) = setup();
        let hand = system.spawn_part(&mut world, "left_hand", Placement::default()).unwrap();
        assert!(system.add_slot(hand, "ring", PartType::Other).unwrap());
        assert!(!system.add_slot(hand, "ring", PartType::Other).unwrap());
        assert_eq!(system.slots_of(hand).len(), 1);
        assert!(matches!(
            system.add_slot(EntityId::new(), "x", PartType::Other),
            Err(BodyError::UnknownPart(_))
        ));
    }

    #[test]
    fn test_forget_deleted_part_unlinks_it() {
        let (mut world, mut system, actor) = setup();
        let torso = system.create_body(&mut world, actor, "torso").unwrap();
        let arm = system.spawn_part(&mut world, "left_arm", Placement::default()).unwrap();
        let hand = system.spawn_part(&mut world, "left_hand", Placement::default()).unwrap();
        system.attach_part(&mut world, &SlotRef::on_part(torso, "left_arm"), arm).unwrap();
        system.attach_part(&mut world, &SlotRef::on_part(arm, "hand"), hand).unwrap();
        assert_eq!(system.children_of(arm), vec![hand]);

        world.queue_delete(arm);
        let deleted = world.end_tick();
        system.forget_deleted(&deleted);

        assert!(system.part(arm).is_none());
        assert!(system.slot(&SlotRef::on_part(torso, "left_arm")).unwrap().is_empty());
        let hand = system.part(hand).unwrap();
        assert!(hand.body.is_none());
        assert!(hand.parent_slot.is_none());
        assert_eq!(system.parts_reachable_from(actor).count(), 1);
    }

    #[test]
    fn test_forget_deleted_body_frees_parts() {
        let (mut world, mut system, actor) = setup();
        let torso = system.create_body(&mut world, actor, "torso").unwrap();

        world.queue_delete(actor);
        let deleted = world.end_tick();
        system.forget_deleted(&deleted);

        assert!(!system.has_body(actor));
        let torso = system.part(torso).unwrap();
        assert!(torso.body.is_none());
        assert!(torso.parent_slot.is_none());
        assert!(torso.organs.iter().all(|o| system.organ(*o).unwrap().body.is_none()));
    }
}
