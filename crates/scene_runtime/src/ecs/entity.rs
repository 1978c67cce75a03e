//! Entity implementation

use bitflags::bitflags;

/// Raw entity identifier
pub type EntityId = u32;

bitflags! {
    /// Capability hints carried by an entity.
    ///
    /// These answer "does this entity have X" without a store lookup; the stores stay
    /// the source of truth for the data itself.
    #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
    pub struct EntityFlags: u32 {
        /// Participates in per-frame evaluation
        const ENABLED = 1 << 0;
        /// Transform never changes after load
        const STATIC = 1 << 1;
        /// Transform is written by at least one driver
        const DRIVER_ANIMATED = 1 << 2;
        /// Has a Mesh component
        const HAS_MESH = 1 << 3;
        /// Has a Light component
        const HAS_LIGHT = 1 << 4;
        /// Has a Camera component
        const HAS_CAMERA = 1 << 5;
        /// Has an OrbitControl component
        const HAS_ORBIT_CONTROL = 1 << 6;
        /// Has an Environment component
        const HAS_ENVIRONMENT = 1 << 7;
    }
}

impl Default for EntityFlags {
    fn default() -> Self {
        Self::ENABLED | Self::STATIC
    }
}

/// Entity identifier plus its capability flags
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct Entity {
    id: EntityId,
    flags: EntityFlags,
}

impl Entity {
    /// Create a new entity with the given ID
    pub(super) fn new(id: EntityId) -> Self {
        Self {
            id,
            flags: EntityFlags::default(),
        }
    }

    /// Get the entity ID
    pub const fn id(&self) -> EntityId {
        self.id
    }

    /// Current flags
    pub const fn flags(&self) -> EntityFlags {
        self.flags
    }

    /// Whether every flag in `flags` is set
    pub const fn has(&self, flags: EntityFlags) -> bool {
        self.flags.contains(flags)
    }

    /// Turn flags on or off
    pub fn set(&mut self, flags: EntityFlags, on: bool) {
        self.flags.set(flags, on);
    }

    /// Whether per-frame evaluation should touch this entity
    pub const fn is_enabled(&self) -> bool {
        self.has(EntityFlags::ENABLED)
    }

    /// Mark as animated by a driver; an animated entity is no longer static
    pub fn mark_driver_animated(&mut self) {
        self.flags.insert(EntityFlags::DRIVER_ANIMATED);
        self.flags.remove(EntityFlags::STATIC);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_new_entity_is_enabled_and_static() {
        let entity = Entity::new(3);
        assert_eq!(entity.id(), 3);
        assert!(entity.is_enabled());
        assert!(entity.has(EntityFlags::STATIC));
        assert!(!entity.has(EntityFlags::HAS_MESH));
    }

    #[test]
    fn test_driver_animated_clears_static() {
        let mut entity = Entity::new(0);
        entity.mark_driver_animated();
        assert!(entity.has(EntityFlags::DRIVER_ANIMATED));
        assert!(!entity.has(EntityFlags::STATIC));
    }

    #[test]
    fn test_set_flags() {
        let mut entity = Entity::new(0);
        entity.set(EntityFlags::HAS_CAMERA | EntityFlags::HAS_ORBIT_CONTROL, true);
        assert!(entity.has(EntityFlags::HAS_CAMERA));
        entity.set(EntityFlags::ENABLED, false);
        assert!(!entity.is_enabled());
    }
}
