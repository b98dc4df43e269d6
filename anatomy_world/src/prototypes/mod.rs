//! Declarative prototypes for parts, organs and body layouts, loaded from TOML.
//!
//! ```toml
//! [[parts]]
//! id = "torso"
//! part_type = "torso"
//! slots = [{ id = "left_arm", part_type = "arm" }]
//! organs = ["heart"]
//!
//! [[organs]]
//! id = "heart"
//! kind = "heart"
//! metabolism_interval = 1.0
//!
//! [[bodies]]
//! id = "human"
//! root = "torso"
//! attachments = [{ slot = "left_arm", part = "left_arm" }]
//! ```

use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use thiserror::Error;

use crate::mechanics::{OrganKind, PartSymmetry, PartType, VisualLayer};

/// Errors raised while loading prototypes.
#[derive(Debug, Error)]
pub enum PrototypeError {
    #[error("failed to parse prototypes: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("duplicate {kind} prototype '{id}'")]
    DuplicateId { kind: &'static str, id: String },

    #[error("{owner} references unknown {kind} prototype '{id}'")]
    DanglingReference {
        owner: String,
        kind: &'static str,
        id: String,
    },
}

/// A child attachment point offered by a part.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SlotPrototype {
    pub id: String,
    pub part_type: PartType,
}

/// A body part archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PartPrototype {
    pub id: String,
    pub part_type: PartType,
    #[serde(default)]
    pub symmetry: PartSymmetry,
    #[serde(default)]
    pub slots: Vec<SlotPrototype>,
    /// Organ prototypes spawned inside the part.
    #[serde(default)]
    pub organs: Vec<String>,
    /// Overrides the default layers for the part's type and side.
    #[serde(default)]
    pub layers: Option<Vec<VisualLayer>>,
}

/// An organ archetype.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct OrganPrototype {
    pub id: String,
    pub kind: OrganKind,
    /// Seconds between metabolism updates; `None` for organs that do not metabolize.
    #[serde(default)]
    pub metabolism_interval: Option<f32>,
}

/// Fill the first empty slot named `slot` with a new `part`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LayoutAttachment {
    pub slot: String,
    pub part: String,
}

/// A complete body: a root part plus ordered attachments.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BodyPrototype {
    pub id: String,
    pub root: String,
    #[serde(default)]
    pub attachments: Vec<LayoutAttachment>,
    #[serde(default)]
    pub gib_sound: Option<String>,
}

/// Everything loaded from one prototype source.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PrototypeSet {
    #[serde(default)]
    pub parts: Vec<PartPrototype>,
    #[serde(default)]
    pub organs: Vec<OrganPrototype>,
    #[serde(default)]
    pub bodies: Vec<BodyPrototype>,
}

impl PrototypeSet {
    /// Parse and validate a TOML prototype document.
    pub fn from_toml_str(source: &str) -> Result<Self, PrototypeError> {
        let set: PrototypeSet = toml::from_str(source)?;
        set.validate()?;
        Ok(set)
    }

    /// Check for duplicate ids and references to unknown prototypes.
    pub fn validate(&self) -> Result<(), PrototypeError> {
        let part_ids = unique_ids("part", self.parts.iter().map(|p| p.id.as_str()))?;
        let organ_ids = unique_ids("organ", self.organs.iter().map(|o| o.id.as_str()))?;
        unique_ids("body", self.bodies.iter().map(|b| b.id.as_str()))?;

        for part in &self.parts {
            for organ in &part.organs {
                if !organ_ids.contains(organ.as_str()) {
                    return Err(PrototypeError::DanglingReference {
                        owner: format!("part '{}'", part.id),
                        kind: "organ",
                        id: organ.clone(),
                    });
                }
            }
        }

        for body in &self.bodies {
            let parts = std::iter::once(&body.root).chain(body.attachments.iter().map(|a| &a.part));
            for part in parts {
                if !part_ids.contains(part.as_str()) {
                    return Err(PrototypeError::DanglingReference {
                        owner: format!("body '{}'", body.id),
                        kind: "part",
                        id: part.clone(),
                    });
                }
            }
        }

        Ok(())
    }
}

fn unique_ids<'a>(
    kind: &'static str,
    ids: impl Iterator<Item = &'a str>,
) -> Result<HashSet<&'a str>, PrototypeError> {
    let mut seen = HashSet::new();
    for id in ids {
        if !seen.insert(id) {
            return Err(PrototypeError::DuplicateId {
                kind,
                id: id.to_string(),
            });
        }
    }
    Ok(seen)
}
