//! Parent/child relations and the runtime kill cascade.
//!
//! Relations are plain entity ids stored in two components: a child carries
//! [`Parent`], a parent carries [`Children`]. Neither owns the other, so a
//! subtree is just a graph walk over ids and a stale id is harmless.

use std::collections::BTreeSet;

use engine_component::{Component, Entity};
use serde::{Deserialize, Serialize};
use tracing::debug;

use crate::error::EcsError;
use crate::registry::Registry;

/// The parent of the entity carrying this component.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Parent(pub Entity);

impl Component for Parent {
    fn type_name() -> &'static str {
        "Parent"
    }
}

/// The direct children of the entity carrying this component, in the order
/// they were attached.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Children(pub Vec<Entity>);

impl Component for Children {
    fn type_name() -> &'static str {
        "Children"
    }
}

impl Registry {
    /// Make `parent` the parent of `child`, detaching `child` from any
    /// previous parent.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if either entity is not allocated
    /// and [`EcsError::HierarchyCycle`] if `child` is `parent` or one of its
    /// ancestors.
    pub fn set_parent(&mut self, child: Entity, parent: Entity) -> Result<(), EcsError> {
        for entity in [child, parent] {
            if !self.is_allocated(entity) {
                return Err(EcsError::EntityNotFound(entity));
            }
        }
        if self.is_ancestor_or_self(child, parent) {
            return Err(EcsError::HierarchyCycle { child, parent });
        }

        self.remove_parent(child);
        self.add_component(child, Parent(parent))?;
        match self.get_component_mut::<Children>(parent) {
            Some(children) => children.0.push(child),
            None => self.add_component(parent, Children(vec![child]))?,
        }
        debug!(%child, %parent, "entity parented");
        Ok(())
    }

    /// Detach `child` from its parent, returning the former parent.
    ///
    /// The parent drops its [`Children`] component once the last child is
    /// gone.
    pub fn remove_parent(&mut self, child: Entity) -> Option<Entity> {
        let Parent(parent) = self.remove_component::<Parent>(child)?;
        let now_empty = match self.get_component_mut::<Children>(parent) {
            Some(children) => {
                children.0.retain(|&c| c != child);
                children.0.is_empty()
            }
            None => false,
        };
        if now_empty {
            self.remove_component::<Children>(parent);
        }
        Some(parent)
    }

    /// The parent of `entity`.
    #[must_use]
    pub fn parent_of(&self, entity: Entity) -> Option<Entity> {
        self.get_component::<Parent>(entity).map(|p| p.0)
    }

    /// The direct children of `entity`.
    #[must_use]
    pub fn children_of(&self, entity: Entity) -> Vec<Entity> {
        self.get_component::<Children>(entity)
            .map(|children| children.0.clone())
            .unwrap_or_default()
    }

    /// Every descendant of `entity`, depth first, parents before children.
    /// `entity` itself is not included.
    #[must_use]
    pub fn descendants_of(&self, entity: Entity) -> Vec<Entity> {
        let mut subtree = self.subtree(entity);
        subtree.remove(0);
        subtree
    }

    /// `root` followed by its descendants in pre-order. Each entity appears
    /// once even if the relation data contains a cycle.
    pub(crate) fn subtree(&self, root: Entity) -> Vec<Entity> {
        let mut order = Vec::new();
        let mut visited = BTreeSet::new();
        let mut stack = vec![root];
        while let Some(entity) = stack.pop() {
            if !visited.insert(entity) {
                continue;
            }
            order.push(entity);
            // Reversed so the first child is visited first.
            stack.extend(self.children_of(entity).into_iter().rev());
        }
        order
    }

    fn is_ancestor_or_self(&self, candidate: Entity, entity: Entity) -> bool {
        let mut visited = BTreeSet::new();
        let mut current = Some(entity);
        while let Some(e) = current {
            if e == candidate {
                return true;
            }
            if !visited.insert(e) {
                return false;
            }
            current = self.parent_of(e);
        }
        false
    }

    /// Queue `entity` and its whole subtree for destruction.
    ///
    /// Runs in two passes. First every entity of the subtree is announced
    /// through [`LifecycleListener::on_kill_requested`], top-down. Then the
    /// subtree is walked bottom-up: each entity is unlinked from its parent's
    /// [`Children`] and queued. Children are therefore always detached before
    /// their parent is finalized. Returns the number of entities queued.
    ///
    /// [`LifecycleListener::on_kill_requested`]: crate::LifecycleListener::on_kill_requested
    pub fn kill_entity_runtime(&mut self, entity: Entity) -> usize {
        if !self.is_allocated(entity) {
            return 0;
        }
        let subtree = self.subtree(entity);

        for &member in &subtree {
            self.notify_kill_requested(member);
        }

        let mut queued = 0;
        for &member in subtree.iter().rev() {
            self.remove_parent(member);
            if self.kill_entity(member) {
                queued += 1;
            }
        }
        debug!(%entity, queued, "subtree queued for destruction");
        queued
    }

    /// Drop relations between `entity` and any entity outside `keep`.
    pub(crate) fn detach_hierarchy(&mut self, entity: Entity, keep: &BTreeSet<Entity>) {
        if self.parent_of(entity).is_some_and(|parent| !keep.contains(&parent)) {
            self.remove_parent(entity);
        }
        for child in self.children_of(entity) {
            if !keep.contains(&child) {
                self.remove_parent(child);
            }
        }
    }
}
