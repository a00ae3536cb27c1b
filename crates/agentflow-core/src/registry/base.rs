//! Base registry trait and implementation.
//!
//! Shared by the agent-type registry, the runtime's agent directory, and the
//! workflow engine's definition store.

use dashmap::mapref::entry::Entry;
use dashmap::DashMap;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use agentflow_protocols::RegistryError;

/// Trait for items that can be stored in a registry.
///
/// Each registerable item must provide a unique ID.
pub trait Registerable: Send + Sync {
    /// Returns the unique identifier for this item.
    fn registry_id(&self) -> &str;
}

struct Slot<T: ?Sized> {
    seq: u64,
    item: Arc<T>,
}

/// Generic registry for managing items by ID.
///
/// Listing operations return items in registration order. Replacing an
/// item keeps its original position.
pub struct BaseRegistry<T: ?Sized + Registerable> {
    items: DashMap<String, Slot<T>>,
    next_seq: AtomicU64,
}

impl<T: ?Sized + Registerable> BaseRegistry<T> {
    /// Create a new empty registry.
    pub fn new() -> Self {
        Self {
            items: DashMap::new(),
            next_seq: AtomicU64::new(0),
        }
    }

    fn checked_id(item: &T) -> Result<String, RegistryError> {
        let id = item.registry_id();
        if id.trim().is_empty() {
            return Err(RegistryError::InvalidId(id.to_string()));
        }
        Ok(id.to_string())
    }

    /// Register an item.
    ///
    /// Returns an error if an item with the same ID is already registered.
    pub fn register(&self, item: Arc<T>) -> Result<(), RegistryError> {
        let id = Self::checked_id(&item)?;

        match self.items.entry(id) {
            Entry::Occupied(e) => Err(RegistryError::AlreadyRegistered(e.key().clone())),
            Entry::Vacant(e) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                e.insert(Slot { seq, item });
                Ok(())
            }
        }
    }

    /// Register an item, replacing any existing one with the same ID.
    ///
    /// Returns the replaced item.
    pub fn register_or_replace(&self, item: Arc<T>) -> Result<Option<Arc<T>>, RegistryError> {
        let id = Self::checked_id(&item)?;

        match self.items.entry(id) {
            Entry::Occupied(mut e) => {
                let previous = std::mem::replace(&mut e.get_mut().item, item);
                Ok(Some(previous))
            }
            Entry::Vacant(e) => {
                let seq = self.next_seq.fetch_add(1, Ordering::SeqCst);
                e.insert(Slot { seq, item });
                Ok(None)
            }
        }
    }

    /// Unregister an item by ID.
    ///
    /// Returns an error if no item with the given ID exists.
    pub fn unregister(&self, id: &str) -> Result<Arc<T>, RegistryError> {
        self.items
            .remove(id)
            .map(|(_, slot)| slot.item)
            .ok_or_else(|| RegistryError::NotFound(id.to_string()))
    }

    /// Get an item by ID.
    pub fn get(&self, id: &str) -> Option<Arc<T>> {
        self.items.get(id).map(|slot| slot.item.clone())
    }

    /// Check if an item with the given ID is registered.
    pub fn contains(&self, id: &str) -> bool {
        self.items.contains_key(id)
    }

    /// List all registered item IDs.
    pub fn list_ids(&self) -> Vec<String> {
        self.list()
            .iter()
            .map(|item| item.registry_id().to_string())
            .collect()
    }

    /// All items in registration order.
    pub fn list(&self) -> Vec<Arc<T>> {
        let mut slots: Vec<(u64, Arc<T>)> = self
            .items
            .iter()
            .map(|entry| (entry.seq, entry.item.clone()))
            .collect();
        slots.sort_by_key(|(seq, _)| *seq);
        slots.into_iter().map(|(_, item)| item).collect()
    }

    /// Remove every item.
    pub fn clear(&self) {
        self.items.clear();
    }

    /// Get the number of registered items.
    pub fn len(&self) -> usize {
        self.items.len()
    }

    /// Check if the registry is empty.
    pub fn is_empty(&self) -> bool {
        self.items.is_empty()
    }
}

impl<T: ?Sized + Registerable> Default for BaseRegistry<T> {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
#[path = "base_tests.rs"]
mod tests;
