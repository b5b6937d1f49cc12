//! Entity duplication.

use std::collections::{BTreeSet, HashMap};

use engine_component::{Entity, Signature};

use crate::error::EcsError;
use crate::hierarchy::{Children, Parent};
use crate::registry::Registry;

/// Duplicates entities on behalf of [`Registry::clone_entity`].
///
/// The registry holds exactly one cloner. Replace it with
/// [`Registry::set_cloner`] to change what a clone carries over.
pub trait EntityCloner {
    /// Create a copy of `source` and return it. The copy is pending until the
    /// next [`Registry::update`].
    ///
    /// # Errors
    ///
    /// Implementations return [`EcsError::EntityNotFound`] for entities that
    /// are not allocated.
    fn clone_entity(
        &mut self,
        registry: &mut Registry,
        source: Entity,
    ) -> Result<Entity, EcsError>;
}

/// Copies every component, the group membership and the whole child
/// subtree. Tags are unique and are not copied.
///
/// A cloned root is attached to the same parent as its source, so cloning a
/// child produces a sibling.
#[derive(Debug, Default, Clone, Copy)]
pub struct DeepCloner;

impl DeepCloner {
    fn copy_one(registry: &mut Registry, source: Entity) -> Result<Entity, EcsError> {
        let copy = registry.create_placeholder()?;
        registry.cloned_from.insert(copy, source);

        let mut relations = Signature::EMPTY;
        let types = registry.component_types();
        for id in [types.id_of::<Parent>(), types.id_of::<Children>()]
            .into_iter()
            .flatten()
        {
            relations.set(id, true);
        }
        registry.copy_components(source, copy, relations);

        if let Some(group) = registry.entity_group(source).map(str::to_owned) {
            registry.group_entity(copy, &group)?;
        }
        Ok(copy)
    }
}

impl EntityCloner for DeepCloner {
    fn clone_entity(
        &mut self,
        registry: &mut Registry,
        source: Entity,
    ) -> Result<Entity, EcsError> {
        if !registry.is_allocated(source) {
            return Err(EcsError::EntityNotFound(source));
        }
        // Pre-order and deduplicated, so cyclic relation data terminates.
        let subtree = registry.subtree(source);
        let mut copies = HashMap::with_capacity(subtree.len());
        for &member in &subtree {
            copies.insert(member, Self::copy_one(registry, member)?);
        }

        let root = copies[&source];
        if let Some(parent) = registry.parent_of(source) {
            registry.set_parent(root, parent)?;
        }
        let mut linked = BTreeSet::from([source]);
        for &member in &subtree {
            for child in registry.children_of(member) {
                if let Some(&child_copy) = copies.get(&child) {
                    if linked.insert(child) {
                        registry.set_parent(child_copy, copies[&member])?;
                    }
                }
            }
        }
        Ok(root)
    }
}

#[cfg(test)]
mod tests {
    use engine_component::Component;

    use super::*;
    use crate::builtin::Transform;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);
    impl Component for Health {}

    struct ShallowCloner;

    impl EntityCloner for ShallowCloner {
        fn clone_entity(
            &mut self,
            registry: &mut Registry,
            source: Entity,
        ) -> Result<Entity, EcsError> {
            registry.create_entity_from(Some(source), None)
        }
    }

    #[test]
    fn test_deep_clone_copies_components_and_group() {
        let mut registry = Registry::new();
        let source = registry.create_entity();
        registry.add_component(source, Health(7)).unwrap();
        registry.tag_entity(source, "boss").unwrap();
        registry.group_entity(source, "enemies").unwrap();
        registry.update();

        let copy = registry.clone_entity(source).unwrap();
        assert_ne!(copy, source);
        assert_eq!(registry.get_component::<Health>(copy), Some(&Health(7)));
        assert_eq!(registry.entity_signature(copy), registry.entity_signature(source));
        assert_eq!(registry.cloned_from(copy), Some(source));
        assert_eq!(registry.get_entities_by_group("enemies"), vec![source, copy]);
        assert_eq!(registry.get_entity_by_tag("boss"), Some(source));
        assert!(!registry.is_active(copy));

        // The copy is independent of its source.
        registry.get_component_mut::<Health>(copy).unwrap().0 = 1;
        assert_eq!(registry.get_component::<Health>(source), Some(&Health(7)));
    }

    #[test]
    fn test_deep_clone_copies_subtree() {
        let mut registry = Registry::new();
        let root = registry.create_entity();
        let child = registry.create_entity();
        let grandchild = registry.create_entity();
        registry.set_parent(child, root).unwrap();
        registry.set_parent(grandchild, child).unwrap();
        registry.update();

        let copy = registry.clone_entity(root).unwrap();
        let copied_children = registry.children_of(copy);
        assert_eq!(copied_children.len(), 1);
        let child_copy = copied_children[0];
        assert_ne!(child_copy, child);
        assert_eq!(registry.cloned_from(child_copy), Some(child));
        assert_eq!(registry.descendants_of(copy).len(), 2);

        // Originals keep their own links.
        assert_eq!(registry.children_of(root), vec![child]);
        assert_eq!(registry.parent_of(copy), None);
    }

    #[test]
    fn test_cloning_a_child_makes_a_sibling() {
        let mut registry = Registry::new();
        let parent = registry.create_entity();
        let child = registry.create_entity();
        registry.set_parent(child, parent).unwrap();

        let copy = registry.clone_entity(child).unwrap();
        assert_eq!(registry.parent_of(copy), Some(parent));
        assert_eq!(registry.children_of(parent), vec![child, copy]);
    }

    #[test]
    fn test_clone_survives_cyclic_children() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();
        registry.add_component(a, Children(vec![b])).unwrap();
        registry.add_component(b, Children(vec![a])).unwrap();

        let copy = registry.clone_entity(a).unwrap();
        assert_eq!(registry.cloned_from(copy), Some(a));
        let copied_children = registry.children_of(copy);
        assert_eq!(copied_children.len(), 1);
        assert_eq!(registry.cloned_from(copied_children[0]), Some(b));
        // The back edge is not reproduced.
        assert!(registry.children_of(copied_children[0]).is_empty());
        assert_eq!(registry.pending_add_count(), 4);
    }

    #[test]
    fn test_clone_missing_entity_fails() {
        let mut registry = Registry::new();
        assert_eq!(
            registry.clone_entity(Entity(4)),
            Err(EcsError::EntityNotFound(Entity(4)))
        );
    }

    #[test]
    fn test_cloner_is_replaceable() {
        let mut registry = Registry::new();
        let source = registry.create_entity();
        registry.add_component(source, Health(3)).unwrap();
        registry.set_cloner(ShallowCloner);

        let copy = registry.clone_entity(source).unwrap();
        assert!(registry.has_component::<Transform>(copy));
        assert!(!registry.has_component::<Health>(copy));
        assert_eq!(registry.cloned_from(copy), Some(source));
    }
}
