//! Error taxonomy of the body engine.

use anatomy_world::{EntityId, PartType};
use thiserror::Error;

/// Structural errors surfaced to the caller of a body operation.
///
/// The graph is left unchanged whenever one of these is returned.
#[derive(Debug, Error, PartialEq)]
pub enum BodyError {
    #[error("unknown part type '{0}'")]
    UnknownPartType(String),

    #[error("unknown organ type '{0}'")]
    UnknownOrganType(String),

    #[error("unknown body layout '{0}'")]
    UnknownBodyLayout(String),

    #[error("cannot build body for {actor}: {source}")]
    InvalidPrototype {
        actor: EntityId,
        #[source]
        source: Box<BodyError>,
    },

    #[error("{actor} already has a body")]
    BodyAlreadyExists { actor: EntityId },

    #[error("entity {0} does not exist")]
    EntityNotFound(EntityId),

    #[error("part {0} is not known to the body system")]
    UnknownPart(EntityId),

    #[error("organ {0} is not known to the body system")]
    UnknownOrgan(EntityId),

    #[error("part {0} already occupies a slot")]
    PartAlreadyAttached(EntityId),

    #[error("part {0} is not attached")]
    NotAttached(EntityId),

    #[error("slot '{slot}' does not exist on {owner}")]
    UnknownSlot { owner: EntityId, slot: String },

    #[error("slot '{slot}' on {owner} is already occupied by {occupant}")]
    SlotOccupied {
        owner: EntityId,
        slot: String,
        occupant: EntityId,
    },

    #[error("slot '{slot}' accepts {expected} parts, got {actual}")]
    SlotTypeMismatch {
        slot: String,
        expected: PartType,
        actual: PartType,
    },

    #[error("attaching {part} to slot '{slot}' would create a cycle")]
    WouldCreateCycle { part: EntityId, slot: String },

    #[error("organ {0} is already inside a part")]
    OrganAlreadyInserted(EntityId),

    #[error("organ {0} is not inside any part")]
    OrganNotInserted(EntityId),
}

pub type Result<T> = std::result::Result<T, BodyError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_invalid_prototype_keeps_cause() {
        let actor = EntityId::nil();
        let err = BodyError::InvalidPrototype {
            actor,
            source: Box::new(BodyError::UnknownPartType("tentacle".into())),
        };
        let message = err.to_string();
        assert!(message.contains("tentacle"));
        assert!(std::error::Error::source(&err).is_some());
    }

    #[test]
    fn test_slot_mismatch_message() {
        let err = BodyError::SlotTypeMismatch {
            slot: "left_arm".into(),
            expected: PartType::Arm,
            actual: PartType::Leg,
        };
        assert_eq!(err.to_string(), "slot 'left_arm' accepts arm parts, got leg");
    }
}
