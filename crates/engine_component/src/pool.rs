//! Component pools.
//!
//! A [`ComponentPool`] stores every instance of one component type as a
//! sparse set: values are packed densely in insertion order, and a sparse
//! table indexed by entity id points into the dense array. Lookups, inserts
//! and removals are O(1); removal swaps the last value into the hole.
//!
//! ```text
//! sparse:  [ -, 1, -, 0 ]          (indexed by entity id)
//! dense:   [ e3, e1 ]              (owning entity per slot)
//! values:  [ v3, v1 ]
//! ```
//!
//! The registry keeps pools of different types side by side as
//! `Box<dyn AnyPool>` and uses the [`AnyPool`] methods for work that does not
//! care about the concrete type, such as tearing an entity down.

use std::any::Any;

use crate::component::Component;
use crate::entity::Entity;

/// Type-erased view of a [`ComponentPool`].
pub trait AnyPool {
    /// Remove `entity`'s value, if any. Absent and out-of-range entities are
    /// ignored. Returns `true` if a value was removed.
    fn remove_entity(&mut self, entity: Entity) -> bool;

    /// Returns `true` if `entity` has a value in this pool.
    fn has_entity(&self, entity: Entity) -> bool;

    /// Copy `from`'s value onto `to`, replacing any existing value.
    /// Returns `false` if `from` has no value.
    fn copy_entity(&mut self, from: Entity, to: Entity) -> bool;

    /// Move `entity`'s value out of the pool.
    fn take_boxed(&mut self, entity: Entity) -> Option<Box<dyn Any>>;

    /// Insert a value previously produced by [`AnyPool::take_boxed`].
    /// Returns the value back if its type does not belong to this pool.
    fn insert_boxed(&mut self, entity: Entity, value: Box<dyn Any>) -> Result<(), Box<dyn Any>>;

    /// Drop every value.
    fn clear(&mut self);

    /// Number of stored values.
    fn len(&self) -> usize;

    /// Returns `true` if the pool stores nothing.
    fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Name of the stored component type.
    fn type_name(&self) -> &'static str;

    /// Upcast for typed downcasting.
    fn as_any(&self) -> &dyn Any;

    /// Mutable upcast for typed downcasting.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

/// Dense storage for a single component type, keyed by entity id.
#[derive(Debug, Clone)]
pub struct ComponentPool<T> {
    sparse: Vec<Option<usize>>,
    dense: Vec<Entity>,
    values: Vec<T>,
}

impl<T> Default for ComponentPool<T> {
    fn default() -> Self {
        Self {
            sparse: Vec::new(),
            dense: Vec::new(),
            values: Vec::new(),
        }
    }
}

impl<T: Component> ComponentPool<T> {
    /// Create an empty pool.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Create an empty pool whose sparse table already covers `entities` ids.
    #[must_use]
    pub fn with_capacity(entities: usize) -> Self {
        Self {
            sparse: vec![None; entities],
            dense: Vec::new(),
            values: Vec::new(),
        }
    }

    fn slot(&self, entity: Entity) -> Option<usize> {
        self.sparse.get(entity.index()).copied().flatten()
    }

    /// Attach `value` to `entity`, returning the value it replaced.
    pub fn add(&mut self, entity: Entity, value: T) -> Option<T> {
        if let Some(slot) = self.slot(entity) {
            return Some(std::mem::replace(&mut self.values[slot], value));
        }
        if entity.index() >= self.sparse.len() {
            self.sparse.resize(entity.index() + 1, None);
        }
        self.sparse[entity.index()] = Some(self.values.len());
        self.dense.push(entity);
        self.values.push(value);
        None
    }

    /// Detach and return `entity`'s value. Absent entities yield `None`.
    pub fn remove(&mut self, entity: Entity) -> Option<T> {
        let slot = self.slot(entity)?;
        self.sparse[entity.index()] = None;
        self.dense.swap_remove(slot);
        let value = self.values.swap_remove(slot);
        if let Some(&moved) = self.dense.get(slot) {
            self.sparse[moved.index()] = Some(slot);
        }
        Some(value)
    }

    /// Returns a reference to `entity`'s value.
    #[must_use]
    pub fn get(&self, entity: Entity) -> Option<&T> {
        self.slot(entity).map(|slot| &self.values[slot])
    }

    /// Returns a mutable reference to `entity`'s value.
    #[must_use]
    pub fn get_mut(&mut self, entity: Entity) -> Option<&mut T> {
        self.slot(entity).map(|slot| &mut self.values[slot])
    }

    /// Returns `true` if `entity` has a value.
    #[must_use]
    pub fn has(&self, entity: Entity) -> bool {
        self.slot(entity).is_some()
    }

    /// Number of stored values.
    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    /// Returns `true` if the pool stores nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }

    /// Iterate over `(entity, value)` pairs in dense order.
    pub fn iter(&self) -> impl Iterator<Item = (Entity, &T)> {
        self.dense.iter().copied().zip(self.values.iter())
    }

    /// Iterate mutably over `(entity, value)` pairs in dense order.
    pub fn iter_mut(&mut self) -> impl Iterator<Item = (Entity, &mut T)> {
        self.dense.iter().copied().zip(self.values.iter_mut())
    }

    /// Drop every value.
    pub fn clear(&mut self) {
        self.sparse.clear();
        self.dense.clear();
        self.values.clear();
    }
}

impl<T: Component> AnyPool for ComponentPool<T> {
    fn remove_entity(&mut self, entity: Entity) -> bool {
        self.remove(entity).is_some()
    }

    fn has_entity(&self, entity: Entity) -> bool {
        self.has(entity)
    }

    fn copy_entity(&mut self, from: Entity, to: Entity) -> bool {
        match self.get(from).cloned() {
            Some(value) => {
                self.add(to, value);
                true
            }
            None => false,
        }
    }

    fn take_boxed(&mut self, entity: Entity) -> Option<Box<dyn Any>> {
        self.remove(entity).map(|value| Box::new(value) as Box<dyn Any>)
    }

    fn insert_boxed(&mut self, entity: Entity, value: Box<dyn Any>) -> Result<(), Box<dyn Any>> {
        let value = value.downcast::<T>()?;
        self.add(entity, *value);
        Ok(())
    }

    fn clear(&mut self) {
        ComponentPool::clear(self);
    }

    fn len(&self) -> usize {
        self.values.len()
    }

    fn type_name(&self) -> &'static str {
        T::type_name()
    }

    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Clone, PartialEq)]
    struct Health(u32);

    impl Component for Health {
        fn type_name() -> &'static str {
            "Health"
        }
    }

    #[test]
    fn test_add_get_replace() {
        let mut pool = ComponentPool::new();
        assert_eq!(pool.add(Entity(4), Health(10)), None);
        assert_eq!(pool.get(Entity(4)), Some(&Health(10)));
        assert_eq!(pool.add(Entity(4), Health(7)), Some(Health(10)));
        assert_eq!(pool.len(), 1);

        pool.get_mut(Entity(4)).unwrap().0 += 1;
        assert_eq!(pool.get(Entity(4)), Some(&Health(8)));
    }

    #[test]
    fn test_remove_keeps_other_entities_addressable() {
        let mut pool = ComponentPool::new();
        pool.add(Entity(0), Health(0));
        pool.add(Entity(1), Health(1));
        pool.add(Entity(2), Health(2));

        assert_eq!(pool.remove(Entity(0)), Some(Health(0)));
        assert!(!pool.has(Entity(0)));
        assert_eq!(pool.get(Entity(1)), Some(&Health(1)));
        assert_eq!(pool.get(Entity(2)), Some(&Health(2)));
        assert_eq!(pool.len(), 2);

        let mut seen: Vec<_> = pool.iter().map(|(e, h)| (e.id(), h.0)).collect();
        seen.sort_unstable();
        assert_eq!(seen, vec![(1, 1), (2, 2)]);
    }

    #[test]
    fn test_remove_absent_or_out_of_range_is_noop() {
        let mut pool: ComponentPool<Health> = ComponentPool::with_capacity(4);
        assert_eq!(pool.remove(Entity(2)), None);
        assert_eq!(pool.remove(Entity(1_000)), None);
        assert!(!pool.remove_entity(Entity::INVALID));
        assert!(pool.is_empty());
    }

    #[test]
    fn test_type_erased_access() {
        let mut boxed: Box<dyn AnyPool> = Box::new(ComponentPool::<Health>::new());
        boxed
            .as_any_mut()
            .downcast_mut::<ComponentPool<Health>>()
            .unwrap()
            .add(Entity(3), Health(30));

        assert_eq!(boxed.type_name(), "Health");
        assert!(boxed.has_entity(Entity(3)));
        assert!(boxed.copy_entity(Entity(3), Entity(9)));
        assert!(!boxed.copy_entity(Entity(5), Entity(6)));
        assert_eq!(boxed.len(), 2);

        let taken = boxed.take_boxed(Entity(3)).unwrap();
        assert!(!boxed.has_entity(Entity(3)));
        boxed.insert_boxed(Entity(11), taken).unwrap();
        let typed = boxed.as_any().downcast_ref::<ComponentPool<Health>>().unwrap();
        assert_eq!(typed.get(Entity(11)), Some(&Health(30)));

        assert!(boxed.insert_boxed(Entity(12), Box::new(5_u8)).is_err());

        assert!(boxed.remove_entity(Entity(9)));
        boxed.clear();
        assert!(boxed.is_empty());
    }
}
