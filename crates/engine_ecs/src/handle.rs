//! Entity handles.

use engine_component::{Component, Entity};

use crate::error::EcsError;
use crate::registry::Registry;

/// A borrowed view of one entity that forwards to its [`Registry`].
///
/// The handle is an id plus a registry borrow. It does not keep the entity
/// alive; every method behaves exactly like the registry call it forwards
/// to, including on stale ids.
#[derive(Debug)]
pub struct EntityMut<'r> {
    registry: &'r mut Registry,
    entity: Entity,
}

impl Registry {
    /// A handle for `entity`.
    pub fn entity(&mut self, entity: Entity) -> EntityMut<'_> {
        EntityMut { registry: self, entity }
    }
}

impl EntityMut<'_> {
    #[must_use]
    pub fn id(&self) -> Entity {
        self.entity
    }

    #[must_use]
    pub fn exists(&self) -> bool {
        self.registry.entity_exists(self.entity)
    }

    pub fn kill(&mut self) -> bool {
        self.registry.kill_entity(self.entity)
    }

    /// Kill this entity and its subtree. See [`Registry::kill_entity_runtime`].
    pub fn kill_runtime(&mut self) -> usize {
        self.registry.kill_entity_runtime(self.entity)
    }

    /// # Errors
    ///
    /// See [`Registry::tag_entity`].
    pub fn tag(&mut self, tag: &str) -> Result<&mut Self, EcsError> {
        self.registry.tag_entity(self.entity, tag)?;
        Ok(self)
    }

    #[must_use]
    pub fn has_tag(&self, tag: &str) -> bool {
        self.registry.entity_has_tag(self.entity, tag)
    }

    #[must_use]
    pub fn get_tag(&self) -> Option<&str> {
        self.registry.entity_tag(self.entity)
    }

    pub fn remove_tag(&mut self) -> Option<String> {
        self.registry.remove_entity_tag(self.entity)
    }

    /// # Errors
    ///
    /// See [`Registry::group_entity`].
    pub fn group(&mut self, group: &str) -> Result<&mut Self, EcsError> {
        self.registry.group_entity(self.entity, group)?;
        Ok(self)
    }

    #[must_use]
    pub fn belongs_to_group(&self, group: &str) -> bool {
        self.registry.entity_belongs_to_group(self.entity, group)
    }

    #[must_use]
    pub fn get_group(&self) -> Option<&str> {
        self.registry.entity_group(self.entity)
    }

    pub fn remove_group(&mut self) -> Option<String> {
        self.registry.remove_entity_group(self.entity)
    }

    /// Duplicate this entity through the registry's clone collaborator.
    ///
    /// # Errors
    ///
    /// See [`Registry::clone_entity`].
    pub fn clone_entity(&mut self) -> Result<Entity, EcsError> {
        self.registry.clone_entity(self.entity)
    }

    #[must_use]
    pub fn cloned_from(&self) -> Option<Entity> {
        self.registry.cloned_from(self.entity)
    }

    /// # Errors
    ///
    /// See [`Registry::add_component`].
    pub fn add_component<T: Component>(&mut self, value: T) -> Result<&mut Self, EcsError> {
        self.registry.add_component(self.entity, value)?;
        Ok(self)
    }

    pub fn remove_component<T: Component>(&mut self) -> Option<T> {
        self.registry.remove_component::<T>(self.entity)
    }

    #[must_use]
    pub fn has_component<T: Component>(&self) -> bool {
        self.registry.has_component::<T>(self.entity)
    }

    #[must_use]
    pub fn get_component<T: Component>(&self) -> Option<&T> {
        self.registry.get_component::<T>(self.entity)
    }

    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self) -> Option<&mut T> {
        self.registry.get_component_mut::<T>(self.entity)
    }
}

impl PartialEq<Entity> for EntityMut<'_> {
    fn eq(&self, other: &Entity) -> bool {
        self.entity == *other
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::builtin::Transform;

    #[derive(Debug, Clone, PartialEq)]
    struct Name(&'static str);
    impl Component for Name {}

    #[test]
    fn test_handle_forwards_to_registry() {
        let mut registry = Registry::new();
        let e = registry.create_entity();

        let mut handle = registry.entity(e);
        handle
            .tag("hero")
            .unwrap()
            .group("party")
            .unwrap()
            .add_component(Name("Ayla"))
            .unwrap();
        assert!(handle.exists());
        assert!(handle.has_tag("hero"));
        assert_eq!(handle.get_group(), Some("party"));
        assert!(handle.has_component::<Transform>());
        assert_eq!(handle.get_component::<Name>(), Some(&Name("Ayla")));
        assert!(handle == e);

        let copy = handle.clone_entity().unwrap();
        assert_eq!(registry.entity(copy).cloned_from(), Some(e));
        assert_eq!(registry.get_component::<Name>(copy), Some(&Name("Ayla")));
    }

    #[test]
    fn test_handles_with_same_id_are_interchangeable() {
        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.update();

        registry.entity(Entity::from_raw(e.id())).kill();
        assert!(registry.is_pending_kill(e));
        registry.update();

        let mut stale = registry.entity(e);
        assert!(!stale.exists());
        assert!(!stale.kill());
        assert_eq!(stale.remove_component::<Transform>(), None);
        assert!(stale.tag("late").is_err());
    }
}
