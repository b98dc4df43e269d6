//! Named containers owned by entities (clothing, inventory, storage).

use serde::{Deserialize, Serialize};
use std::collections::HashMap;
use thiserror::Error;

use crate::entities::EntityId;

/// Errors raised by container operations.
#[derive(Debug, Error, PartialEq, Eq)]
pub enum ContainmentError {
    #[error("entity {0} does not exist")]
    UnknownEntity(EntityId),

    #[error("entity {item} is already inside container '{container}' of {owner}")]
    AlreadyContained {
        item: EntityId,
        owner: EntityId,
        container: String,
    },

    #[error("an entity cannot contain itself")]
    SelfContainment,
}

/// A single named container.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Container {
    pub name: String,
    pub contents: Vec<EntityId>,
}

impl Container {
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            contents: Vec::new(),
        }
    }

    pub fn contains(&self, item: EntityId) -> bool {
        self.contents.contains(&item)
    }
}

/// All containers in the world, keyed by owner.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct ContainerStore {
    by_owner: HashMap<EntityId, Vec<Container>>,

    /// Reverse index: item -> (owner, container name).
    location: HashMap<EntityId, (EntityId, String)>,
}

impl ContainerStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Get or create a named container on an owner.
    pub fn ensure_container(&mut self, owner: EntityId, name: &str) -> &mut Container {
        let containers = self.by_owner.entry(owner).or_default();
        let index = match containers.iter().position(|c| c.name == name) {
            Some(index) => index,
            None => {
                containers.push(Container::new(name));
                containers.len() - 1
            }
        };
        &mut containers[index]
    }

    /// All containers of an owner, in creation order.
    pub fn containers_of(&self, owner: EntityId) -> &[Container] {
        self.by_owner.get(&owner).map(|v| v.as_slice()).unwrap_or(&[])
    }

    /// Every entity held by any container of the owner.
    pub fn all_contents(&self, owner: EntityId) -> Vec<EntityId> {
        self.containers_of(owner)
            .iter()
            .flat_map(|c| c.contents.iter().copied())
            .collect()
    }

    /// Put an item into an owner's container, creating the container if needed.
    pub fn insert(
        &mut self,
        owner: EntityId,
        name: &str,
        item: EntityId,
    ) -> Result<(), ContainmentError> {
        if owner == item {
            return Err(ContainmentError::SelfContainment);
        }
        if let Some((current_owner, container)) = self.location.get(&item) {
            return Err(ContainmentError::AlreadyContained {
                item,
                owner: *current_owner,
                container: container.clone(),
            });
        }
        self.ensure_container(owner, name).contents.push(item);
        self.location.insert(item, (owner, name.to_string()));
        Ok(())
    }

    /// Remove an item regardless of any insertion rules.
    ///
    /// Returns `false` if the item was not in that container.
    pub fn force_remove(&mut self, owner: EntityId, name: &str, item: EntityId) -> bool {
        let Some(container) = self
            .by_owner
            .get_mut(&owner)
            .and_then(|containers| containers.iter_mut().find(|c| c.name == name))
        else {
            return false;
        };
        let before = container.contents.len();
        container.contents.retain(|e| *e != item);
        let removed = container.contents.len() != before;
        if removed {
            self.location.remove(&item);
        }
        removed
    }

    /// Find which container holds an item.
    pub fn container_of(&self, item: EntityId) -> Option<(EntityId, &str)> {
        self.location
            .get(&item)
            .map(|(owner, name)| (*owner, name.as_str()))
    }

    /// Drop every container of an owner, returning what they held.
    pub fn remove_owner(&mut self, owner: EntityId) -> Vec<EntityId> {
        let contents: Vec<EntityId> = self
            .by_owner
            .remove(&owner)
            .unwrap_or_default()
            .into_iter()
            .flat_map(|c| c.contents)
            .collect();
        for item in &contents {
            self.location.remove(item);
        }
        contents
    }
}
