//! Body notifications and the observer bus they are raised on.
//!
//! Observers run synchronously, in subscription order, after the structural
//! change they describe has been committed.

use anatomy_world::{EntityId, WorldState};
use serde::{Deserialize, Serialize};
use std::collections::HashSet;
use tracing::trace;

/// Notifications raised by the body engine.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum BodyEvent {
    PartAttached {
        body: Option<EntityId>,
        part: EntityId,
        /// Entity offering the slot: the body actor or a parent part.
        parent: EntityId,
        slot: String,
    },
    PartDetached {
        body: Option<EntityId>,
        part: EntityId,
        parent: EntityId,
        slot: String,
    },
    OrganInserted {
        body: Option<EntityId>,
        part: EntityId,
        organ: EntityId,
    },
    OrganRemoved {
        body: Option<EntityId>,
        part: EntityId,
        organ: EntityId,
    },
    /// Raised once per gib, before the body actor is queued for deletion.
    BodyGibbed {
        body: EntityId,
        released: HashSet<EntityId>,
    },
}

impl BodyEvent {
    /// The body the event concerns, if any.
    pub fn body(&self) -> Option<EntityId> {
        match self {
            BodyEvent::PartAttached { body, .. }
            | BodyEvent::PartDetached { body, .. }
            | BodyEvent::OrganInserted { body, .. }
            | BodyEvent::OrganRemoved { body, .. } => *body,
            BodyEvent::BodyGibbed { body, .. } => Some(*body),
        }
    }
}

/// Something that wants to hear about body changes.
pub trait BodyObserver {
    fn on_body_event(&mut self, world: &WorldState, event: &BodyEvent);
}

impl<F> BodyObserver for F
where
    F: FnMut(&WorldState, &BodyEvent),
{
    fn on_body_event(&mut self, world: &WorldState, event: &BodyEvent) {
        self(world, event)
    }
}

/// Ordered list of observers.
#[derive(Default)]
pub struct EventBus {
    observers: Vec<Box<dyn BodyObserver>>,
    raised: u64,
}

impl EventBus {
    pub fn new() -> Self {
        Self::default()
    }

    /// Register an observer. Observers are called in subscription order.
    pub fn subscribe(&mut self, observer: impl BodyObserver + 'static) {
        self.observers.push(Box::new(observer));
    }

    /// Deliver an event to every observer.
    pub fn raise(&mut self, world: &WorldState, event: BodyEvent) {
        trace!(?event, observers = self.observers.len(), "raising body event");
        self.raised += 1;
        for observer in &mut self.observers {
            observer.on_body_event(world, &event);
        }
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Total number of events raised so far.
    pub fn raised_count(&self) -> u64 {
        self.raised
    }
}

impl std::fmt::Debug for EventBus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("EventBus")
            .field("observers", &self.observers.len())
            .field("raised", &self.raised)
            .finish()
    }
}
