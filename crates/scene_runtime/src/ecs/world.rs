//! Entity registry
//!
//! The [`World`] owns the monotonic id counter. Every scene built against the same
//! world draws ids from one sequence, so ids stay unique across scenes; separate
//! worlds are fully independent.

use super::{Entity, EntityId};

/// Hands out entity ids in strictly increasing order
#[derive(Debug, Default)]
pub struct World {
    next_entity_id: EntityId,
}

impl World {
    /// Create a new world
    pub fn new() -> Self {
        Self::default()
    }

    /// Create a new entity with default flags
    pub fn create_entity(&mut self) -> Entity {
        let entity = Entity::new(self.next_entity_id);
        self.next_entity_id += 1;
        entity
    }

    /// Number of entities created so far
    pub const fn entity_count(&self) -> u32 {
        self.next_entity_id
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ids_strictly_increase() {
        let mut world = World::new();
        let ids: Vec<_> = (0..5).map(|_| world.create_entity().id()).collect();
        assert_eq!(ids, vec![0, 1, 2, 3, 4]);
        assert_eq!(world.entity_count(), 5);
    }

    #[test]
    fn test_worlds_are_independent() {
        let mut a = World::new();
        let mut b = World::new();
        a.create_entity();
        assert_eq!(b.create_entity().id(), 0);
    }
}
