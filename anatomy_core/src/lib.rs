//! # Anatomy Core
//!
//! The body decomposition and part-attachment engine. An actor's body is a
//! tree of typed slots holding part instances, with organs hanging off parts.
//!
//! ## Core Components
//!
//! - **registry**: Read-only part, organ and body layout definitions
//! - **body**: The body graph arena, the attachment engine and gibbing
//! - **relay**: Movement, metabolism and heat stimuli routed into the body
//! - **events**: Notifications raised after every structural change
//!
//! ## Invariants
//!
//! - A part sits in at most one slot, and its `body` is set exactly when it is
//!   reachable from that body's root
//! - Slots and back-references change only inside the attachment engine
//! - Deletion is always deferred to the end of the tick

pub mod body;
pub mod config;
pub mod error;
pub mod events;
pub mod registry;
pub mod relay;

pub use body::*;
pub use config::*;
pub use error::*;
pub use events::*;
pub use registry::*;
pub use relay::*;
