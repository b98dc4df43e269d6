//! Part Registry - canonical, read-only lookup of part, organ and body definitions.
//!
//! Definitions are populated once at startup and shared by reference.

use anatomy_world::{
    BodyPrototype, LayoutAttachment, OrganKind, OrganPrototype, PartPrototype, PartSymmetry,
    PartType, PrototypeSet, VisualLayer,
};
use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use std::sync::Arc;
use tracing::debug;

use crate::error::{BodyError, Result};

/// A child slot a part offers.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotDefinition {
    pub id: String,
    pub part_type: PartType,
}

/// A part archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartDefinition {
    pub id: String,
    pub part_type: PartType,
    pub symmetry: PartSymmetry,
    /// Child slots, in declaration order.
    pub slots: Vec<SlotDefinition>,
    /// Organ definitions spawned inside the part.
    pub organs: Vec<String>,
    /// Presentation layers shown while the part is attached.
    pub layers: Vec<VisualLayer>,
}

impl PartDefinition {
    /// A definition with no slots and no organs.
    pub fn new(id: impl Into<String>, part_type: PartType, symmetry: PartSymmetry) -> Self {
        Self {
            id: id.into(),
            part_type,
            symmetry,
            slots: Vec::new(),
            organs: Vec::new(),
            layers: VisualLayer::defaults_for(part_type, symmetry),
        }
    }

    pub fn with_slot(mut self, id: impl Into<String>, part_type: PartType) -> Self {
        self.slots.push(SlotDefinition {
            id: id.into(),
            part_type,
        });
        self
    }

    pub fn with_organ(mut self, organ: impl Into<String>) -> Self {
        self.organs.push(organ.into());
        self
    }
}

impl From<&PartPrototype> for PartDefinition {
    fn from(proto: &PartPrototype) -> Self {
        Self {
            id: proto.id.clone(),
            part_type: proto.part_type,
            symmetry: proto.symmetry,
            slots: proto
                .slots
                .iter()
                .map(|s| SlotDefinition {
                    id: s.id.clone(),
                    part_type: s.part_type,
                })
                .collect(),
            organs: proto.organs.clone(),
            layers: proto
                .layers
                .clone()
                .unwrap_or_else(|| VisualLayer::defaults_for(proto.part_type, proto.symmetry)),
        }
    }
}

/// An organ archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganDefinition {
    pub id: String,
    pub kind: OrganKind,
    pub metabolism_interval: Option<f32>,
}

impl OrganDefinition {
    pub fn new(id: impl Into<String>, kind: OrganKind, metabolism_interval: Option<f32>) -> Self {
        Self {
            id: id.into(),
            kind,
            metabolism_interval,
        }
    }
}

impl From<&OrganPrototype> for OrganDefinition {
    fn from(proto: &OrganPrototype) -> Self {
        Self::new(proto.id.clone(), proto.kind, proto.metabolism_interval)
    }
}

/// A full body layout: root part plus ordered attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyLayout {
    pub id: String,
    pub root: String,
    pub attachments: Vec<LayoutAttachment>,
    pub gib_sound: Option<String>,
}

impl From<&BodyPrototype> for BodyLayout {
    fn from(proto: &BodyPrototype) -> Self {
        Self {
            id: proto.id.clone(),
            root: proto.root.clone(),
            attachments: proto.attachments.clone(),
            gib_sound: proto.gib_sound.clone(),
        }
    }
}

/// Lookup of every known definition, keyed by id.
#[derive(Debug, Clone, Default)]
pub struct PartRegistry {
    parts: HashMap<String, Arc<PartDefinition>>,
    organs: HashMap<String, Arc<OrganDefinition>>,
    layouts: HashMap<String, Arc<BodyLayout>>,
}

impl PartRegistry {
    /// Create an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Build a registry from a loaded prototype set.
    pub fn from_prototypes(prototypes: &PrototypeSet) -> Self {
        let mut registry = Self::new();
        for part in &prototypes.parts {
            registry.register_part(PartDefinition::from(part));
        }
        for organ in &prototypes.organs {
            registry.register_organ(OrganDefinition::from(organ));
        }
        for body in &prototypes.bodies {
            registry.register_layout(BodyLayout::from(body));
        }
        debug!(
            parts = registry.parts.len(),
            organs = registry.organs.len(),
            layouts = registry.layouts.len(),
            "part registry populated"
        );
        registry
    }

    /// Register a part definition (startup only). Replaces an existing id.
    pub fn register_part(&mut self, definition: PartDefinition) {
        self.parts.insert(definition.id.clone(), Arc::new(definition));
    }

    pub fn register_organ(&mut self, definition: OrganDefinition) {
        self.organs.insert(definition.id.clone(), Arc::new(definition));
    }

    pub fn register_layout(&mut self, layout: BodyLayout) {
        self.layouts.insert(layout.id.clone(), Arc::new(layout));
    }

    /// Look up a part definition.
    pub fn definition_for(&self, part_type: &str) -> Result<Arc<PartDefinition>> {
        self.parts
            .get(part_type)
            .cloned()
            .ok_or_else(|| BodyError::UnknownPartType(part_type.to_string()))
    }

    pub fn organ_definition_for(&self, organ_type: &str) -> Result<Arc<OrganDefinition>> {
        self.organs
            .get(organ_type)
            .cloned()
            .ok_or_else(|| BodyError::UnknownOrganType(organ_type.to_string()))
    }

    pub fn layout_for(&self, layout: &str) -> Result<Arc<BodyLayout>> {
        self.layouts
            .get(layout)
            .cloned()
            .ok_or_else(|| BodyError::UnknownBodyLayout(layout.to_string()))
    }

    pub fn part_count(&self) -> usize {
        self.parts.len()
    }
}
