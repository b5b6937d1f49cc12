//! Preserving entities across a scene reload.
//!
//! [`Registry::stash_persistent_entities`] lifts a set of entities out of the
//! registry without destroying them: their component values, tag and group
//! move into [`StashedEntity`] records, they leave every system, and their ids
//! return to the free list. No destroy notification fires. After the scene is
//! torn down and reloaded, [`Registry::restore_persistent_entities`] recreates
//! each record as a new entity with the same signature.

use std::any::Any;
use std::collections::{BTreeSet, HashMap};

use engine_component::{ComponentTypeId, Entity, Signature};
use tracing::{error, info, warn};

use crate::hierarchy::{Children, Parent};
use crate::registry::Registry;

/// One entity lifted out of a registry.
pub struct StashedEntity {
    original: Entity,
    signature: Signature,
    components: Vec<(ComponentTypeId, Box<dyn Any>)>,
    tag: Option<String>,
    group: Option<String>,
}

impl StashedEntity {
    /// The id the entity had when it was stashed.
    #[must_use]
    pub fn original(&self) -> Entity {
        self.original
    }

    /// The component signature at stash time.
    #[must_use]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// The tag at stash time.
    #[must_use]
    pub fn tag(&self) -> Option<&str> {
        self.tag.as_deref()
    }

    /// The group at stash time.
    #[must_use]
    pub fn group(&self) -> Option<&str> {
        self.group.as_deref()
    }
}

impl std::fmt::Debug for StashedEntity {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("StashedEntity")
            .field("original", &self.original)
            .field("signature", &self.signature)
            .field("components", &self.components.len())
            .field("tag", &self.tag)
            .field("group", &self.group)
            .finish()
    }
}

impl Registry {
    /// Lift `entities` out of the registry.
    ///
    /// Entities that are not allocated are skipped. Parent/child links
    /// between stashed entities survive the round trip; links to entities
    /// left behind are cut.
    pub fn stash_persistent_entities(&mut self, entities: &[Entity]) -> Vec<StashedEntity> {
        let mut keep = BTreeSet::new();
        let mut order = Vec::with_capacity(entities.len());
        for &entity in entities {
            if !self.is_allocated(entity) {
                warn!(%entity, "cannot stash an entity that does not exist");
            } else if keep.insert(entity) {
                order.push(entity);
            }
        }
        for &entity in &order {
            self.detach_hierarchy(entity, &keep);
        }

        let stashed: Vec<StashedEntity> =
            order.into_iter().map(|entity| self.stash_one(entity)).collect();
        info!(count = stashed.len(), "entities stashed");
        stashed
    }

    fn stash_one(&mut self, entity: Entity) -> StashedEntity {
        self.leave_systems(entity);
        let signature = self.entity_signature(entity).unwrap_or_default();

        let mut components = Vec::with_capacity(signature.len());
        for id in signature.iter() {
            if let Some(value) = self.any_pool_mut(id).and_then(|pool| pool.take_boxed(entity)) {
                components.push((id, value));
            }
        }
        let tag = self.tags.remove(entity);
        let group = self.groups.remove(entity);

        self.clear_signature(entity);
        self.release(entity);

        StashedEntity {
            original: entity,
            signature,
            components,
            tag,
            group,
        }
    }

    /// Recreate stashed entities, returning the new ids in the same order.
    ///
    /// The new entities are pending and become active at the next
    /// [`Registry::update`]. No baseline components are added; each entity
    /// gets exactly the components it was stashed with. Records that cannot
    /// get an id because the entity limit is reached are logged and dropped.
    pub fn restore_persistent_entities(&mut self, stashed: Vec<StashedEntity>) -> Vec<Entity> {
        let mut remap = HashMap::with_capacity(stashed.len());
        for record in &stashed {
            match self.create_placeholder() {
                Ok(entity) => {
                    remap.insert(record.original, entity);
                }
                Err(err) => {
                    error!(original = %record.original, %err, "could not restore entity");
                }
            }
        }
        let parent_id = self.component_types().id_of::<Parent>();
        let children_id = self.component_types().id_of::<Children>();

        let mut restored = Vec::with_capacity(stashed.len());
        for record in stashed {
            let Some(&entity) = remap.get(&record.original) else {
                continue;
            };
            for (id, mut value) in record.components {
                let any: &mut dyn Any = &mut *value;
                if Some(id) == parent_id {
                    let Some(parent) = any.downcast_mut::<Parent>() else {
                        continue;
                    };
                    match remap.get(&parent.0) {
                        Some(&mapped) => parent.0 = mapped,
                        None => continue,
                    }
                } else if Some(id) == children_id {
                    let Some(children) = any.downcast_mut::<Children>() else {
                        continue;
                    };
                    children.0 = children
                        .0
                        .iter()
                        .filter_map(|c| remap.get(c).copied())
                        .collect();
                    if children.0.is_empty() {
                        continue;
                    }
                }

                let inserted = match self.any_pool_mut(id) {
                    Some(pool) => pool.insert_boxed(entity, value).is_ok(),
                    None => false,
                };
                if inserted {
                    self.mark_component(entity, id);
                } else {
                    warn!(
                        %entity,
                        component = self.component_types().name(id),
                        "could not restore component"
                    );
                }
            }
            if let Some(tag) = record.tag {
                self.bind_tag(entity, &tag);
            }
            if let Some(group) = record.group {
                self.groups.insert(entity, &group);
            }
            restored.push(entity);
        }
        info!(count = restored.len(), "entities restored");
        restored
    }
}

#[cfg(test)]
mod tests {
    use engine_component::Component;

    use super::*;
    use crate::builtin::Transform;
    use crate::system::{System, SystemBase};

    #[derive(Debug, Clone, PartialEq)]
    struct Score(u32);
    impl Component for Score {}

    struct Scoring {
        base: SystemBase,
    }

    impl System for Scoring {
        fn base(&self) -> &SystemBase {
            &self.base
        }
        fn base_mut(&mut self) -> &mut SystemBase {
            &mut self.base
        }
    }

    fn registry_with_scoring() -> Registry {
        let mut registry = Registry::new();
        registry
            .add_system_with(|types| {
                let mut base = SystemBase::new();
                base.require_component::<Score>(types)?;
                Ok(Scoring { base })
            })
            .unwrap();
        registry
    }

    #[test]
    fn test_stash_then_restore_preserves_signature() {
        let mut registry = registry_with_scoring();
        let player = registry.create_entity();
        registry.add_component(player, Score(12)).unwrap();
        registry.tag_entity(player, "player").unwrap();
        registry.group_entity(player, "persistent").unwrap();
        registry.update();
        let signature = registry.entity_signature(player).unwrap();

        let stashed = registry.stash_persistent_entities(&[player]);
        assert_eq!(stashed.len(), 1);
        assert_eq!(stashed[0].signature(), signature);
        assert_eq!(stashed[0].tag(), Some("player"));
        assert!(!registry.is_allocated(player));
        assert!(!registry.entity_exists(player));
        assert!(registry.get_system::<Scoring>().unwrap().base().is_empty());
        assert_eq!(registry.get_entity_by_tag("player"), None);

        // Scene reload.
        registry.kill_all_entities();
        registry.create_entity();

        let restored = registry.restore_persistent_entities(stashed);
        let player = restored[0];
        assert_eq!(registry.entity_signature(player), Some(signature));
        assert_eq!(registry.get_component::<Score>(player), Some(&Score(12)));
        assert_eq!(registry.get_component::<Transform>(player), Some(&Transform::IDENTITY));
        assert_eq!(registry.get_entity_by_tag("player"), Some(player));
        assert!(registry.entity_belongs_to_group(player, "persistent"));

        assert!(!registry.get_system::<Scoring>().unwrap().base().has_entity(player));
        registry.update();
        assert!(registry.get_system::<Scoring>().unwrap().base().has_entity(player));
    }

    #[test]
    fn test_stash_does_not_notify_destroy_and_frees_id() {
        struct Panicky;
        impl crate::lifecycle::LifecycleListener for Panicky {
            fn on_entity_destroyed(&mut self, _registry: &Registry, entity: Entity) {
                panic!("{entity} must not be destroyed");
            }
        }

        let mut registry = Registry::new();
        let e = registry.create_entity();
        registry.update();
        registry.add_listener(Panicky);

        registry.stash_persistent_entities(&[e, e, Entity(50)]);
        assert_eq!(registry.free_id_count(), 1);
        assert_eq!(registry.entity_count(), 0);
        registry.update();
    }

    #[test]
    fn test_hierarchy_inside_stash_is_remapped() {
        let mut registry = Registry::new();
        let outsider = registry.create_entity();
        let parent = registry.create_entity();
        let child = registry.create_entity();
        registry.set_parent(parent, outsider).unwrap();
        registry.set_parent(child, parent).unwrap();
        registry.update();

        let stashed = registry.stash_persistent_entities(&[parent, child]);
        assert!(registry.children_of(outsider).is_empty());

        registry.kill_all_entities();
        let filler = registry.create_entity();
        let restored = registry.restore_persistent_entities(stashed);
        let (new_parent, new_child) = (restored[0], restored[1]);
        assert!(!restored.contains(&filler));

        assert_eq!(registry.parent_of(new_child), Some(new_parent));
        assert_eq!(registry.children_of(new_parent), vec![new_child]);
        assert_eq!(registry.parent_of(new_parent), None);
    }

    #[test]
    fn test_restored_tag_takes_over_from_current_holder() {
        let mut registry = Registry::new();
        let player = registry.create_entity();
        registry.tag_entity(player, "player").unwrap();
        let stashed = registry.stash_persistent_entities(&[player]);

        let impostor = registry.create_entity();
        registry.tag_entity(impostor, "player").unwrap();

        let restored = registry.restore_persistent_entities(stashed);
        assert_eq!(registry.get_entity_by_tag("player"), Some(restored[0]));
        assert!(!registry.entity_has_tag(impostor, "player"));
    }

    #[test]
    fn test_restore_drops_records_past_entity_limit() {
        let config = crate::RegistryConfig::default().with_max_entities(2);
        let mut registry = Registry::with_config(config);
        let a = registry.create_entity();
        let b = registry.create_entity();
        registry.add_component(a, Score(1)).unwrap();
        let stashed = registry.stash_persistent_entities(&[a, b]);

        // The scene that replaces them takes one of the two ids.
        registry.create_entity();
        let restored = registry.restore_persistent_entities(stashed);
        assert_eq!(restored.len(), 1);
        assert_eq!(registry.get_component::<Score>(restored[0]), Some(&Score(1)));
    }
}
