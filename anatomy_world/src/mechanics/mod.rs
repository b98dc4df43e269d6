//! Body taxonomy: part types, symmetry, organ kinds and visual layers.

use serde::{Deserialize, Serialize};

/// Structural category of a body part. Slots accept exactly one category.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PartType {
    Torso,
    Head,
    Arm,
    Hand,
    Leg,
    Foot,
    Tail,
    Other,
}

impl PartType {
    pub fn label(&self) -> &'static str {
        match self {
            PartType::Torso => "torso",
            PartType::Head => "head",
            PartType::Arm => "arm",
            PartType::Hand => "hand",
            PartType::Leg => "leg",
            PartType::Foot => "foot",
            PartType::Tail => "tail",
            PartType::Other => "other",
        }
    }
}

impl std::fmt::Display for PartType {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which side of the body a part sits on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum PartSymmetry {
    #[default]
    None,
    Left,
    Right,
}

/// Kinds of organs. Only some of them metabolize.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OrganKind {
    Brain,
    Eyes,
    Heart,
    Lungs,
    Stomach,
    Liver,
    Kidneys,
    Other,
}

/// Named visual sub-elements of a layered actor sprite.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum VisualLayer {
    Chest,
    Head,
    Hair,
    FacialHair,
    Eyes,
    LeftArm,
    LeftHand,
    RightArm,
    RightHand,
    LeftLeg,
    LeftFoot,
    RightLeg,
    RightFoot,
    Tail,
}

impl VisualLayer {
    /// Layers drawn for a part of the given type and side.
    pub fn defaults_for(part_type: PartType, symmetry: PartSymmetry) -> Vec<VisualLayer> {
        use PartSymmetry::{Left, Right};
        match (part_type, symmetry) {
            (PartType::Torso, _) => vec![VisualLayer::Chest],
            (PartType::Head, _) => vec![
                VisualLayer::Head,
                VisualLayer::Hair,
                VisualLayer::FacialHair,
                VisualLayer::Eyes,
            ],
            (PartType::Arm, Left) => vec![VisualLayer::LeftArm],
            (PartType::Arm, Right) => vec![VisualLayer::RightArm],
            (PartType::Hand, Left) => vec![VisualLayer::LeftHand],
            (PartType::Hand, Right) => vec![VisualLayer::RightHand],
            (PartType::Leg, Left) => vec![VisualLayer::LeftLeg],
            (PartType::Leg, Right) => vec![VisualLayer::RightLeg],
            (PartType::Foot, Left) => vec![VisualLayer::LeftFoot],
            (PartType::Foot, Right) => vec![VisualLayer::RightFoot],
            (PartType::Tail, _) => vec![VisualLayer::Tail],
            _ => Vec::new(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_default_layers_follow_symmetry() {
        assert_eq!(
            VisualLayer::defaults_for(PartType::Arm, PartSymmetry::Left),
            vec![VisualLayer::LeftArm]
        );
        assert_eq!(
            VisualLayer::defaults_for(PartType::Foot, PartSymmetry::Right),
            vec![VisualLayer::RightFoot]
        );
        assert!(VisualLayer::defaults_for(PartType::Arm, PartSymmetry::None).is_empty());
        assert_eq!(VisualLayer::defaults_for(PartType::Head, PartSymmetry::None).len(), 4);
    }

    #[test]
    fn test_part_type_labels() {
        assert_eq!(PartType::Torso.to_string(), "torso");
        assert_eq!(PartType::Hand.label(), "hand");
    }
}
