//! Append-only component storage
//!
//! Components live in a dense `Vec<T>`; a map sends entity ids to slots in it. Several
//! ids may map to the same slot (see [`ComponentStore::insert_existing`]), which is how
//! shared meshes, materials and cameras are represented. There is no removal: a scene
//! is built once and only mutated in place afterwards.

use std::collections::HashMap;

use super::{Component, EntityId};

/// Errors from store lookups
#[derive(thiserror::Error, Debug, Clone, PartialEq, Eq)]
pub enum StoreError {
    /// The entity has no component in this store
    #[error("entity {0} has no component in this store")]
    Unmapped(EntityId),

    /// Aliasing target does not exist
    #[error("cannot alias entity {id} onto slot {index}: store holds {len} components")]
    IndexOutOfRange {
        /// Entity being aliased
        id: EntityId,
        /// Requested slot
        index: usize,
        /// Current number of stored components
        len: usize,
    },
}

/// Dense component array keyed by entity id
#[derive(Debug, Clone)]
pub struct ComponentStore<T: Component> {
    index: HashMap<EntityId, usize>,
    data: Vec<T>,
}

impl<T: Component> Default for ComponentStore<T> {
    fn default() -> Self {
        Self {
            index: HashMap::new(),
            data: Vec::new(),
        }
    }
}

impl<T: Component> ComponentStore<T> {
    /// Empty store
    pub fn new() -> Self {
        Self::default()
    }

    /// Component of `id`
    pub fn get(&self, id: EntityId) -> Result<&T, StoreError> {
        let slot = self.slot(id)?;
        self.data.get(slot).ok_or(StoreError::Unmapped(id))
    }

    /// Mutable component of `id`; writes are seen by every alias of the slot
    pub fn get_mut(&mut self, id: EntityId) -> Result<&mut T, StoreError> {
        let slot = self.slot(id)?;
        self.data.get_mut(slot).ok_or(StoreError::Unmapped(id))
    }

    /// Append `value` and map `id` to it, returning the new slot.
    /// An id that was already mapped now points at the new slot.
    pub fn insert(&mut self, id: EntityId, value: T) -> usize {
        let slot = self.data.len();
        self.data.push(value);
        self.index.insert(id, slot);
        slot
    }

    /// Map `id` onto a slot that already holds a component
    pub fn insert_existing(&mut self, id: EntityId, slot: usize) -> Result<(), StoreError> {
        if slot >= self.data.len() {
            return Err(StoreError::IndexOutOfRange {
                id,
                index: slot,
                len: self.data.len(),
            });
        }
        self.index.insert(id, slot);
        Ok(())
    }

    /// Whether `id` has a component here
    pub fn contains(&self, id: EntityId) -> bool {
        self.index.contains_key(&id)
    }

    /// Slot `id` maps to
    pub fn slot(&self, id: EntityId) -> Result<usize, StoreError> {
        self.index.get(&id).copied().ok_or(StoreError::Unmapped(id))
    }

    /// Iterate `(id, slot)` pairs of the id map
    pub fn mappings(&self) -> impl Iterator<Item = (EntityId, usize)> + '_ {
        self.index.iter().map(|(&id, &slot)| (id, slot))
    }

    /// Iterate `(id, component)` pairs, visiting shared components once per alias
    pub fn iter(&self) -> impl Iterator<Item = (EntityId, &T)> + '_ {
        self.index
            .iter()
            .filter_map(|(&id, &slot)| self.data.get(slot).map(|value| (id, value)))
    }

    /// Dense component array, each stored instance once
    pub fn values(&self) -> &[T] {
        &self.data
    }

    /// Number of stored component instances
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Whether no component has been stored
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Number of ids mapped into this store
    pub fn mapped_count(&self) -> usize {
        self.index.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Tag(&'static str);
    impl Component for Tag {}

    #[test]
    fn test_insert_and_get() {
        let mut store = ComponentStore::new();
        assert_eq!(store.insert(7, Tag("a")), 0);
        assert_eq!(store.insert(9, Tag("b")), 1);
        assert_eq!(store.get(7).unwrap(), &Tag("a"));
        assert_eq!(store.get(9).unwrap(), &Tag("b"));
        assert!(store.contains(7));
        assert!(!store.contains(8));
    }

    #[test]
    fn test_get_unmapped_is_error() {
        let store: ComponentStore<Tag> = ComponentStore::new();
        assert_eq!(store.get(1), Err(StoreError::Unmapped(1)));
    }

    #[test]
    fn test_insert_existing_aliases_slot() {
        let mut store = ComponentStore::new();
        let slot = store.insert(1, Tag("shared"));
        store.insert_existing(2, slot).unwrap();

        assert_eq!(store.len(), 1);
        assert_eq!(store.mapped_count(), 2);
        assert_eq!(store.slot(1).unwrap(), store.slot(2).unwrap());

        store.get_mut(2).unwrap().0 = "changed";
        assert_eq!(store.get(1).unwrap(), &Tag("changed"));
    }

    #[test]
    fn test_insert_existing_out_of_range() {
        let mut store: ComponentStore<Tag> = ComponentStore::new();
        assert_eq!(
            store.insert_existing(4, 0),
            Err(StoreError::IndexOutOfRange { id: 4, index: 0, len: 0 })
        );
    }

    #[test]
    fn test_every_mapped_slot_is_in_bounds() {
        let mut store = ComponentStore::new();
        for id in 0..4 {
            store.insert(id, Tag("x"));
        }
        store.insert_existing(10, 2).unwrap();
        assert!(store.mappings().all(|(_, slot)| slot < store.len()));
        assert_eq!(store.iter().count(), 5);
        assert_eq!(store.values().len(), 4);
    }
}
