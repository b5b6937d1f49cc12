//! Tag and group indices.
//!
//! A tag names at most one entity and an entity carries at most one tag.
//! A group holds any number of entities and an entity belongs to at most one
//! group. Both indices are bidirectional so lookups in either direction are
//! O(1) and an entity's entries can be purged when it is destroyed.

use std::collections::{BTreeSet, HashMap};

use engine_component::Entity;
use tracing::{debug, warn};

use crate::error::EcsError;
use crate::registry::Registry;

/// One-to-one mapping between tag names and entities.
#[derive(Debug, Default, Clone)]
pub(crate) struct TagIndex {
    tag_of: HashMap<Entity, String>,
    entity_of: HashMap<String, Entity>,
}

impl TagIndex {
    /// Bind `tag` to `entity`, dropping the entity's previous tag and taking
    /// the tag away from any entity that held it. Returns the entity that
    /// lost the tag, if any.
    pub(crate) fn insert(&mut self, entity: Entity, tag: &str) -> Option<Entity> {
        self.remove(entity);
        let previous = self.entity_of.insert(tag.to_owned(), entity);
        if let Some(previous) = previous {
            self.tag_of.remove(&previous);
        }
        self.tag_of.insert(entity, tag.to_owned());
        previous
    }

    pub(crate) fn remove(&mut self, entity: Entity) -> Option<String> {
        let tag = self.tag_of.remove(&entity)?;
        self.entity_of.remove(&tag);
        Some(tag)
    }

    pub(crate) fn tag_of(&self, entity: Entity) -> Option<&str> {
        self.tag_of.get(&entity).map(String::as_str)
    }

    pub(crate) fn entity_of(&self, tag: &str) -> Option<Entity> {
        self.entity_of.get(tag).copied()
    }

    pub(crate) fn clear(&mut self) {
        self.tag_of.clear();
        self.entity_of.clear();
    }
}

/// Many-to-one mapping from entities to group names.
#[derive(Debug, Default, Clone)]
pub(crate) struct GroupIndex {
    group_of: HashMap<Entity, String>,
    members: HashMap<String, BTreeSet<Entity>>,
}

impl GroupIndex {
    /// Move `entity` into `group`, leaving its previous group.
    pub(crate) fn insert(&mut self, entity: Entity, group: &str) {
        self.remove(entity);
        self.members.entry(group.to_owned()).or_default().insert(entity);
        self.group_of.insert(entity, group.to_owned());
    }

    pub(crate) fn remove(&mut self, entity: Entity) -> Option<String> {
        let group = self.group_of.remove(&entity)?;
        if let Some(members) = self.members.get_mut(&group) {
            members.remove(&entity);
            if members.is_empty() {
                self.members.remove(&group);
            }
        }
        Some(group)
    }

    pub(crate) fn group_of(&self, entity: Entity) -> Option<&str> {
        self.group_of.get(&entity).map(String::as_str)
    }

    pub(crate) fn members(&self, group: &str) -> Vec<Entity> {
        self.members
            .get(group)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub(crate) fn clear(&mut self) {
        self.group_of.clear();
        self.members.clear();
    }
}

impl Registry {
    /// Give `entity` the unique tag `tag`.
    ///
    /// Any previous tag on `entity` is dropped. If another entity already
    /// carries `tag`, it loses it.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if `entity` is not allocated.
    pub fn tag_entity(&mut self, entity: Entity, tag: &str) -> Result<(), EcsError> {
        if !self.is_allocated(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.bind_tag(entity, tag);
        debug!(%entity, tag, "entity tagged");
        Ok(())
    }

    /// Bind `tag` to an allocated `entity`, warning if it moves away from
    /// another entity.
    pub(crate) fn bind_tag(&mut self, entity: Entity, tag: &str) {
        if let Some(previous) = self.tags.insert(entity, tag) {
            warn!(tag, from = %previous, to = %entity, "tag moved to another entity");
        }
    }

    /// Returns `true` if `entity` carries exactly `tag`.
    #[must_use]
    pub fn entity_has_tag(&self, entity: Entity, tag: &str) -> bool {
        self.tags.tag_of(entity) == Some(tag)
    }

    /// The tag `entity` carries.
    #[must_use]
    pub fn entity_tag(&self, entity: Entity) -> Option<&str> {
        self.tags.tag_of(entity)
    }

    /// The entity carrying `tag`.
    #[must_use]
    pub fn get_entity_by_tag(&self, tag: &str) -> Option<Entity> {
        self.tags.entity_of(tag)
    }

    /// Drop `entity`'s tag, returning it.
    pub fn remove_entity_tag(&mut self, entity: Entity) -> Option<String> {
        self.tags.remove(entity)
    }

    /// Put `entity` into `group`, leaving any group it was in.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if `entity` is not allocated.
    pub fn group_entity(&mut self, entity: Entity, group: &str) -> Result<(), EcsError> {
        if !self.is_allocated(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        self.groups.insert(entity, group);
        debug!(%entity, group, "entity grouped");
        Ok(())
    }

    /// Returns `true` if `entity` is in `group`.
    #[must_use]
    pub fn entity_belongs_to_group(&self, entity: Entity, group: &str) -> bool {
        self.groups.group_of(entity) == Some(group)
    }

    /// The group `entity` belongs to.
    #[must_use]
    pub fn entity_group(&self, entity: Entity) -> Option<&str> {
        self.groups.group_of(entity)
    }

    /// Members of `group`, in id order. Unknown groups are empty.
    #[must_use]
    pub fn get_entities_by_group(&self, group: &str) -> Vec<Entity> {
        self.groups.members(group)
    }

    /// Take `entity` out of its group, returning the group name.
    pub fn remove_entity_group(&mut self, entity: Entity) -> Option<String> {
        self.groups.remove(entity)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_tag_index_is_one_to_one() {
        let mut tags = TagIndex::default();
        assert_eq!(tags.insert(Entity(1), "camera"), None);
        assert_eq!(tags.insert(Entity(2), "camera"), Some(Entity(1)));
        assert_eq!(tags.tag_of(Entity(1)), None);
        assert_eq!(tags.entity_of("camera"), Some(Entity(2)));

        tags.insert(Entity(2), "player");
        assert_eq!(tags.entity_of("camera"), None);
        assert_eq!(tags.remove(Entity(2)), Some("player".to_owned()));
        assert_eq!(tags.remove(Entity(2)), None);
    }

    #[test]
    fn test_group_index_drops_empty_groups() {
        let mut groups = GroupIndex::default();
        groups.insert(Entity(1), "enemies");
        groups.insert(Entity(2), "enemies");
        groups.insert(Entity(1), "allies");

        assert_eq!(groups.members("enemies"), vec![Entity(2)]);
        assert_eq!(groups.members("allies"), vec![Entity(1)]);
        groups.remove(Entity(2));
        assert!(!groups.members.contains_key("enemies"));
        assert!(groups.members("enemies").is_empty());
    }

    #[test]
    fn test_registry_tags() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();

        registry.tag_entity(a, "player").unwrap();
        assert!(registry.entity_has_tag(a, "player"));
        assert_eq!(registry.entity_tag(a), Some("player"));
        assert_eq!(registry.get_entity_by_tag("player"), Some(a));
        assert_eq!(registry.get_entity_by_tag("nobody"), None);

        registry.tag_entity(b, "player").unwrap();
        assert!(!registry.entity_has_tag(a, "player"));
        assert_eq!(registry.get_entity_by_tag("player"), Some(b));

        assert_eq!(registry.remove_entity_tag(b).as_deref(), Some("player"));
        assert_eq!(registry.get_entity_by_tag("player"), None);
        assert_eq!(
            registry.tag_entity(Entity(40), "ghost"),
            Err(EcsError::EntityNotFound(Entity(40)))
        );
    }

    #[test]
    fn test_registry_groups() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        let c = registry.create_entity();
        registry.group_entity(c, "enemies").unwrap();
        registry.group_entity(a, "enemies").unwrap();
        registry.group_entity(b, "pickups").unwrap();

        assert_eq!(registry.get_entities_by_group("enemies"), vec![a, c]);
        assert!(registry.entity_belongs_to_group(b, "pickups"));
        assert!(!registry.entity_belongs_to_group(b, "enemies"));
        assert_eq!(registry.entity_group(a), Some("enemies"));

        assert_eq!(registry.remove_entity_group(a).as_deref(), Some("enemies"));
        assert_eq!(registry.get_entities_by_group("enemies"), vec![c]);
        assert_eq!(registry.entity_group(a), None);
        assert!(registry.get_entities_by_group("nobody").is_empty());
    }
}
