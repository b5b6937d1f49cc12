//! Systems and their membership bookkeeping.
//!
//! A system declares the components it needs by building a required
//! [`Signature`]. The registry keeps each system's entity set equal to the
//! active entities whose signature contains that requirement. What a system
//! does with those entities is up to the concrete type.

use std::any::Any;
use std::collections::BTreeSet;

use engine_component::{Component, ComponentError, ComponentTypes, Entity, Signature};

/// Upcast helper so registered systems can be downcast to their concrete type.
pub trait AsAny: Any {
    /// Upcast to `&dyn Any`.
    fn as_any(&self) -> &dyn Any;
    /// Upcast to `&mut dyn Any`.
    fn as_any_mut(&mut self) -> &mut dyn Any;
}

impl<T: Any> AsAny for T {
    fn as_any(&self) -> &dyn Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn Any {
        self
    }
}

/// A registered system.
///
/// # Examples
///
/// ```rust
/// use engine_ecs::{EcsError, Registry, System, SystemBase, Transform};
///
/// struct Renderer {
///     base: SystemBase,
/// }
///
/// impl System for Renderer {
///     fn base(&self) -> &SystemBase { &self.base }
///     fn base_mut(&mut self) -> &mut SystemBase { &mut self.base }
/// }
///
/// let mut registry = Registry::new();
/// registry.add_system_with(|types| {
///     let mut base = SystemBase::new();
///     base.require_component::<Transform>(types)?;
///     Ok::<_, EcsError>(Renderer { base })
/// })?;
/// # Ok::<(), EcsError>(())
/// ```
pub trait System: AsAny {
    /// The membership bookkeeping for this system.
    fn base(&self) -> &SystemBase;

    /// Mutable access to the membership bookkeeping.
    fn base_mut(&mut self) -> &mut SystemBase;

    /// A human-readable name, for logs.
    fn name(&self) -> &'static str {
        std::any::type_name::<Self>()
    }
}

/// Required signature plus the set of entities currently matching it.
#[derive(Debug, Clone, Default)]
pub struct SystemBase {
    signature: Signature,
    entities: BTreeSet<Entity>,
}

impl SystemBase {
    /// A system base requiring nothing.
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// A system base with a prebuilt requirement.
    #[must_use]
    pub fn with_signature(signature: Signature) -> Self {
        Self {
            signature,
            entities: BTreeSet::new(),
        }
    }

    /// Require component `T`, registering it in `types` if needed.
    ///
    /// # Errors
    ///
    /// Fails if `types` has no free component slot left.
    pub fn require_component<T: Component>(
        &mut self,
        types: &mut ComponentTypes,
    ) -> Result<(), ComponentError> {
        let id = types.register::<T>()?;
        self.signature.set(id, true);
        Ok(())
    }

    /// The required signature.
    #[must_use]
    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Start tracking `entity`. Returns `false` if it was already tracked.
    pub fn add_entity(&mut self, entity: Entity) -> bool {
        self.entities.insert(entity)
    }

    /// Stop tracking `entity`. Returns `false` if it was not tracked.
    pub fn remove_entity(&mut self, entity: Entity) -> bool {
        self.entities.remove(&entity)
    }

    /// Returns `true` if `entity` is tracked.
    #[must_use]
    pub fn has_entity(&self, entity: Entity) -> bool {
        self.entities.contains(&entity)
    }

    /// A snapshot of the tracked entities, in id order.
    #[must_use]
    pub fn system_entities(&self) -> Vec<Entity> {
        self.entities.iter().copied().collect()
    }

    /// Iterate over the tracked entities without copying.
    pub fn iter(&self) -> impl Iterator<Item = Entity> + '_ {
        self.entities.iter().copied()
    }

    /// Number of tracked entities.
    #[must_use]
    pub fn len(&self) -> usize {
        self.entities.len()
    }

    /// Returns `true` if nothing is tracked.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.entities.is_empty()
    }

    /// Forget every tracked entity.
    pub fn clear(&mut self) {
        self.entities.clear();
    }

    /// Returns `true` if an entity with `signature` belongs in this system.
    #[must_use]
    pub fn wants(&self, signature: Signature) -> bool {
        signature.contains(self.signature)
    }
}

#[cfg(test)]
mod tests {
    use engine_component::ComponentTypeId;

    use super::*;

    #[derive(Clone)]
    struct Position;
    impl Component for Position {}

    #[derive(Clone)]
    struct Velocity;
    impl Component for Velocity {}

    #[test]
    fn test_require_component_builds_signature() {
        let mut types = ComponentTypes::new();
        let mut base = SystemBase::new();
        base.require_component::<Position>(&mut types).unwrap();
        base.require_component::<Velocity>(&mut types).unwrap();

        let expected = Signature::EMPTY.with(ComponentTypeId(0)).with(ComponentTypeId(1));
        assert_eq!(base.signature(), expected);
        assert!(base.wants(expected.with(ComponentTypeId(5))));
        assert!(!base.wants(Signature::EMPTY.with(ComponentTypeId(0))));
    }

    #[test]
    fn test_membership_is_idempotent() {
        let mut base = SystemBase::new();
        assert!(base.add_entity(Entity(2)));
        assert!(!base.add_entity(Entity(2)));
        assert_eq!(base.len(), 1);

        assert!(base.remove_entity(Entity(2)));
        assert!(!base.remove_entity(Entity(2)));
        assert!(!base.remove_entity(Entity(40)));
        assert!(base.is_empty());
    }

    #[test]
    fn test_system_entities_is_a_snapshot() {
        let mut base = SystemBase::new();
        base.add_entity(Entity(3));
        base.add_entity(Entity(1));

        let snapshot = base.system_entities();
        base.remove_entity(Entity(1));

        assert_eq!(snapshot, vec![Entity(1), Entity(3)]);
        assert_eq!(base.system_entities(), vec![Entity(3)]);
    }
}
