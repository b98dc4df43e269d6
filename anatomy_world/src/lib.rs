//! # Anatomy World
//!
//! The world-side collaborators of the body engine: entity identities, actor
//! components, part and organ taxonomy, placement, containment, deferred
//! deletion and the declarative prototype loader.
//! This crate holds no body-graph logic; `anatomy_core` consumes it.

pub mod capabilities;
pub mod entities;
pub mod mechanics;
pub mod prototypes;
pub mod world_state;

pub use capabilities::*;
pub use entities::*;
pub use mechanics::*;
pub use prototypes::*;
pub use world_state::*;
