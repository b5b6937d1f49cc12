//! The entity registry.
//!
//! The [`Registry`] owns entity ids, per-entity signatures, component pools
//! and registered systems. Structural changes are deferred: new entities sit
//! in a pending-add set and killed entities in a pending-kill set until the
//! next [`Registry::update`], which is the only point where systems see
//! entities appear or disappear.
//!
//! ## Entity states
//!
//! ```text
//! Free ──create──▶ PendingAdd ──update──▶ Active
//!   ▲                                     │ kill
//!   └────────────update────────── PendingKill ◀┘
//! ```
//!
//! Ids are recycled through a FIFO free list. An id only returns to the free
//! list once its entity has been fully torn down, so an id is never handed
//! out while still pending destruction.

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap, VecDeque};

use engine_component::{
    AnyPool, Component, ComponentPool, ComponentTypeId, ComponentTypes, Entity, Signature,
};
use tracing::{debug, error, info, trace};

use crate::clone::{DeepCloner, EntityCloner};
use crate::config::RegistryConfig;
use crate::error::EcsError;
use crate::index::{GroupIndex, TagIndex};
use crate::lifecycle::LifecycleListener;
use crate::system::System;

/// How far past the end of the entity table an explicit id may land.
///
/// Every skipped slot goes on the free list, so an unbounded gap lets one
/// corrupt id exhaust memory.
pub const MAX_ID_GAP: usize = 1 << 20;

/// What a flush applied.
#[derive(Debug, Default, Clone, PartialEq, Eq)]
pub struct UpdateSummary {
    /// Entities that became active, in activation order.
    pub created: Vec<Entity>,
    /// Entities that were torn down and whose ids were recycled.
    pub destroyed: Vec<Entity>,
    /// Kill requests for entities that were already gone.
    pub skipped: Vec<Entity>,
}

impl UpdateSummary {
    /// Returns `true` if the flush changed nothing.
    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.created.is_empty() && self.destroyed.is_empty() && self.skipped.is_empty()
    }
}

struct SystemSlot {
    type_id: TypeId,
    name: &'static str,
    /// `None` while the system is detached by [`Registry::with_system`].
    system: Option<Box<dyn System>>,
}

/// The central authority over entities, components and systems.
pub struct Registry {
    config: RegistryConfig,
    types: ComponentTypes,
    pools: Vec<Option<Box<dyn AnyPool>>>,
    signatures: Vec<Signature>,
    free_ids: VecDeque<Entity>,
    live: BTreeSet<Entity>,
    pending_add: BTreeSet<Entity>,
    pending_kill: BTreeSet<Entity>,
    pub(crate) tags: TagIndex,
    pub(crate) groups: GroupIndex,
    pub(crate) cloned_from: HashMap<Entity, Entity>,
    systems: Vec<SystemSlot>,
    listeners: Vec<Box<dyn LifecycleListener>>,
    cloner: Option<Box<dyn EntityCloner>>,
}

impl Registry {
    /// Create a registry with the default configuration.
    #[must_use]
    pub fn new() -> Self {
        Self::with_config(RegistryConfig::default())
    }

    /// Create a registry with the given configuration.
    #[must_use]
    pub fn with_config(config: RegistryConfig) -> Self {
        Self {
            signatures: Vec::with_capacity(config.initial_capacity),
            config,
            types: ComponentTypes::new(),
            pools: Vec::new(),
            free_ids: VecDeque::new(),
            live: BTreeSet::new(),
            pending_add: BTreeSet::new(),
            pending_kill: BTreeSet::new(),
            tags: TagIndex::default(),
            groups: GroupIndex::default(),
            cloned_from: HashMap::new(),
            systems: Vec::new(),
            listeners: Vec::new(),
            cloner: Some(Box::new(DeepCloner)),
        }
    }

    /// The configuration this registry was built with.
    #[must_use]
    pub fn config(&self) -> &RegistryConfig {
        &self.config
    }

    // -- Entity creation --

    /// Create a new entity with the baseline components.
    ///
    /// The id is taken from the front of the free list, or appended to the
    /// table if the free list is empty. The entity stays invisible to systems
    /// until the next [`Registry::update`].
    ///
    /// Once [`RegistryConfig::max_entities`] ids are in use this logs an
    /// error and returns [`Entity::INVALID`], which every other registry
    /// call treats as a stale id.
    pub fn create_entity(&mut self) -> Entity {
        match self.allocate_id() {
            Ok(entity) => {
                self.admit(entity, None);
                self.seed_baseline(entity);
                entity
            }
            Err(err) => {
                error!(%err, "cannot create entity");
                Entity::INVALID
            }
        }
    }

    /// Create an entity at an explicit id and/or with a recorded origin.
    ///
    /// Used for deserialisation (`id`) and prefab instantiation or cloning
    /// (`origin`). Requesting an id beyond the end of the table grows it and
    /// puts every skipped slot on the free list.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::DuplicateEntityId`] if `id` is already occupied,
    /// [`EcsError::InvalidEntity`] if `id` is the invalid sentinel,
    /// [`EcsError::EntityIdOutOfRange`] if `id` is implausibly far past the
    /// end of the table, and [`EcsError::EntityLimitReached`] if no id is
    /// left.
    pub fn create_entity_from(
        &mut self,
        origin: Option<Entity>,
        id: Option<Entity>,
    ) -> Result<Entity, EcsError> {
        let entity = match id {
            None => self.allocate_id()?,
            Some(requested) => self.claim_id(requested)?,
        };
        self.admit(entity, origin);
        self.seed_baseline(entity);
        Ok(entity)
    }

    fn allocate_id(&mut self) -> Result<Entity, EcsError> {
        if let Some(entity) = self.free_ids.pop_front() {
            return Ok(entity);
        }
        let max = self.config.max_entities;
        if self.signatures.len() >= max as usize {
            return Err(EcsError::EntityLimitReached(max));
        }
        // Below `max_entities`, which never exceeds the sentinel.
        let entity = Entity::from_raw(self.signatures.len() as u32);
        self.signatures.push(Signature::EMPTY);
        Ok(entity)
    }

    fn claim_id(&mut self, requested: Entity) -> Result<Entity, EcsError> {
        if !requested.is_valid() {
            return Err(EcsError::InvalidEntity);
        }
        if self.is_allocated(requested) {
            error!(entity = %requested, "explicit entity id already in use, scene is corrupt");
            return Err(EcsError::DuplicateEntityId(requested));
        }
        let reach = self.signatures.len().saturating_add(MAX_ID_GAP);
        let limit = self
            .config
            .max_entities
            .min(u32::try_from(reach).unwrap_or(u32::MAX));
        if requested.id() >= limit {
            error!(entity = %requested, limit, "explicit entity id out of range, scene is corrupt");
            return Err(EcsError::EntityIdOutOfRange {
                entity: requested,
                limit,
            });
        }
        if requested.index() >= self.signatures.len() {
            for skipped in self.signatures.len()..requested.index() {
                self.free_ids.push_back(Entity::from_raw(skipped as u32));
            }
            self.signatures.resize(requested.index() + 1, Signature::EMPTY);
        } else {
            self.free_ids.retain(|&free| free != requested);
        }
        Ok(requested)
    }

    /// Place an allocated id in the pending-add set without any components.
    pub(crate) fn admit(&mut self, entity: Entity, origin: Option<Entity>) {
        self.pending_add.insert(entity);
        if let Some(origin) = origin {
            self.cloned_from.insert(entity, origin);
        }
        debug!(%entity, origin = origin.map(|o| o.id()), "entity pending add");
    }

    /// Allocate a fresh id and admit it with no components.
    pub(crate) fn create_placeholder(&mut self) -> Result<Entity, EcsError> {
        let entity = self.allocate_id()?;
        self.admit(entity, None);
        Ok(entity)
    }

    fn seed_baseline(&mut self, entity: Entity) {
        let baseline = self.config.baseline.clone();
        for component in baseline {
            if let Err(err) = (component.seed)(self, entity) {
                error!(
                    %entity,
                    component = component.name,
                    %err,
                    "failed to attach baseline component"
                );
            }
        }
    }

    // -- Entity destruction --

    /// Queue `entity` for destruction at the next [`Registry::update`].
    ///
    /// Returns `false` (and does nothing) if the entity is already gone.
    pub fn kill_entity(&mut self, entity: Entity) -> bool {
        if !self.is_allocated(entity) {
            trace!(%entity, "kill ignored, entity already gone");
            return false;
        }
        if self.pending_kill.insert(entity) {
            debug!(%entity, "entity pending kill");
        }
        true
    }

    /// Withdraw a pending kill. Returns `true` if one was withdrawn.
    pub fn cancel_kill(&mut self, entity: Entity) -> bool {
        let cancelled = self.pending_kill.remove(&entity);
        if cancelled {
            debug!(%entity, "pending kill cancelled");
        }
        cancelled
    }

    /// Returns `true` if `entity` is queued for destruction.
    #[must_use]
    pub fn is_pending_kill(&self, entity: Entity) -> bool {
        self.pending_kill.contains(&entity)
    }

    /// Immediately tear down every entity and reset the id space.
    ///
    /// Active entities receive a destroy notification first. Afterwards the
    /// free list is empty and the next entity created gets id 0. Returns the
    /// number of entities removed.
    pub fn kill_all_entities(&mut self) -> usize {
        let live: Vec<Entity> = self.live.iter().copied().collect();
        for &entity in &live {
            self.notify(|listener, registry| listener.on_entity_destroyed(registry, entity));
        }
        let count = live.len() + self.pending_add.len();

        for slot in &mut self.systems {
            if let Some(system) = slot.system.as_mut() {
                system.base_mut().clear();
            }
        }
        for pool in self.pools.iter_mut().flatten() {
            pool.clear();
        }
        self.signatures.clear();
        self.free_ids.clear();
        self.live.clear();
        self.pending_add.clear();
        self.pending_kill.clear();
        self.tags.clear();
        self.groups.clear();
        self.cloned_from.clear();

        info!(count, "killed all entities");
        count
    }

    // -- Flush --

    /// Apply every pending creation and destruction.
    ///
    /// Pending entities are matched against every system and announced to
    /// listeners. Then every pending kill that still refers to a live entity
    /// is torn down: listeners are notified, the entity leaves all systems,
    /// its signature is cleared, every pool drops its value, tag and group
    /// entries are purged and its id goes to the back of the free list.
    /// Must be called once per tick by the owning loop.
    pub fn update(&mut self) -> UpdateSummary {
        let mut summary = self.activate_pending();

        let doomed = std::mem::take(&mut self.pending_kill);
        for entity in doomed {
            if self.destroy(entity) {
                summary.destroyed.push(entity);
            } else {
                summary.skipped.push(entity);
            }
        }

        if !summary.is_empty() {
            debug!(
                created = summary.created.len(),
                destroyed = summary.destroyed.len(),
                skipped = summary.skipped.len(),
                "registry flushed"
            );
        }
        summary
    }

    /// Activate pending creations now, leaving pending kills for the next
    /// [`Registry::update`].
    ///
    /// For runtime instantiation that must be visible within the current
    /// call. Do not call this while iterating a system's entities.
    pub fn runtime_update(&mut self) -> UpdateSummary {
        self.activate_pending()
    }

    /// Activate one pending entity immediately. Returns `false` if `entity`
    /// was not pending.
    pub fn force_runtime_update(&mut self, entity: Entity) -> bool {
        if !self.pending_add.remove(&entity) {
            return false;
        }
        self.activate(entity);
        true
    }

    fn activate_pending(&mut self) -> UpdateSummary {
        let pending = std::mem::take(&mut self.pending_add);
        let mut summary = UpdateSummary::default();
        for entity in pending {
            self.activate(entity);
            summary.created.push(entity);
        }
        summary
    }

    fn activate(&mut self, entity: Entity) {
        self.live.insert(entity);
        self.refresh_membership(entity);
        self.notify(|listener, registry| listener.on_entity_created(registry, entity));
    }

    fn destroy(&mut self, entity: Entity) -> bool {
        if !self.is_allocated(entity) {
            trace!(%entity, "skipping kill of recycled entity");
            return false;
        }
        self.notify(|listener, registry| listener.on_entity_destroyed(registry, entity));
        self.detach_hierarchy(entity, &BTreeSet::new());

        for slot in &mut self.systems {
            if let Some(system) = slot.system.as_mut() {
                system.base_mut().remove_entity(entity);
            }
        }
        self.signatures[entity.index()].reset();
        for pool in self.pools.iter_mut().flatten() {
            pool.remove_entity(entity);
        }
        self.release(entity);
        debug!(%entity, "entity destroyed");
        true
    }

    /// Return an id whose components are already gone to the free list.
    pub(crate) fn release(&mut self, entity: Entity) {
        self.tags.remove(entity);
        self.groups.remove(entity);
        self.cloned_from.remove(&entity);
        self.live.remove(&entity);
        self.pending_add.remove(&entity);
        self.pending_kill.remove(&entity);
        self.free_ids.push_back(entity);
    }

    fn notify<F>(&mut self, mut f: F)
    where
        F: FnMut(&mut dyn LifecycleListener, &Registry),
    {
        if self.listeners.is_empty() {
            return;
        }
        let mut listeners = std::mem::take(&mut self.listeners);
        for listener in &mut listeners {
            f(listener.as_mut(), self);
        }
        self.listeners = listeners;
    }

    pub(crate) fn notify_kill_requested(&mut self, entity: Entity) {
        self.notify(|listener, registry| listener.on_kill_requested(registry, entity));
    }

    // -- Queries --

    /// Returns `true` if `entity` is in range and has at least one component.
    #[must_use]
    pub fn entity_exists(&self, entity: Entity) -> bool {
        self.signatures
            .get(entity.index())
            .is_some_and(|signature| !signature.is_empty())
    }

    /// Returns `true` if `entity` currently owns its id, whether pending or
    /// active.
    #[must_use]
    pub fn is_allocated(&self, entity: Entity) -> bool {
        self.live.contains(&entity) || self.pending_add.contains(&entity)
    }

    /// Returns `true` if `entity` is active (visible to systems).
    #[must_use]
    pub fn is_active(&self, entity: Entity) -> bool {
        self.live.contains(&entity)
    }

    /// Look up an entity by raw id. Logs an error if it does not exist.
    #[must_use]
    pub fn get_entity_by_id(&self, id: u32) -> Option<Entity> {
        let entity = Entity::from_raw(id);
        if self.entity_exists(entity) {
            Some(entity)
        } else {
            error!(id, "entity does not exist");
            None
        }
    }

    /// The component signature of `entity`, if it is in range.
    #[must_use]
    pub fn entity_signature(&self, entity: Entity) -> Option<Signature> {
        self.signatures.get(entity.index()).copied()
    }

    /// The entity `entity` was cloned or instantiated from, if recorded.
    #[must_use]
    pub fn cloned_from(&self, entity: Entity) -> Option<Entity> {
        self.cloned_from.get(&entity).copied()
    }

    /// Active entities, in id order.
    #[must_use]
    pub fn live_entities(&self) -> Vec<Entity> {
        self.live.iter().copied().collect()
    }

    /// Number of active entities.
    #[must_use]
    pub fn entity_count(&self) -> usize {
        self.live.len()
    }

    /// Number of entities waiting to be activated.
    #[must_use]
    pub fn pending_add_count(&self) -> usize {
        self.pending_add.len()
    }

    /// Number of entities waiting to be destroyed.
    #[must_use]
    pub fn pending_kill_count(&self) -> usize {
        self.pending_kill.len()
    }

    /// Number of recyclable ids.
    #[must_use]
    pub fn free_id_count(&self) -> usize {
        self.free_ids.len()
    }

    // -- Components --

    /// The component type table.
    #[must_use]
    pub fn component_types(&self) -> &ComponentTypes {
        &self.types
    }

    /// Register `T` and return its id.
    ///
    /// # Errors
    ///
    /// Fails when every component slot is taken.
    pub fn register_component<T: Component>(&mut self) -> Result<ComponentTypeId, EcsError> {
        Ok(self.types.register::<T>()?)
    }

    fn pool_mut_or_insert<T: Component>(
        &mut self,
        id: ComponentTypeId,
    ) -> Option<&mut ComponentPool<T>> {
        if self.pools.len() <= id.index() {
            self.pools.resize_with(id.index() + 1, || None);
        }
        let capacity = self.signatures.len();
        let pool: &mut dyn AnyPool = self.pools[id.index()]
            .get_or_insert_with(|| {
                Box::new(ComponentPool::<T>::with_capacity(capacity)) as Box<dyn AnyPool>
            })
            .as_mut();
        pool.as_any_mut().downcast_mut::<ComponentPool<T>>()
    }

    /// The typed pool for `T`, if any value of `T` was ever stored.
    #[must_use]
    pub fn pool<T: Component>(&self) -> Option<&ComponentPool<T>> {
        let id = self.types.id_of::<T>()?;
        let pool: &dyn AnyPool = self.pools.get(id.index())?.as_deref()?;
        pool.as_any().downcast_ref::<ComponentPool<T>>()
    }

    fn pool_mut<T: Component>(&mut self) -> Option<&mut ComponentPool<T>> {
        let id = self.types.id_of::<T>()?;
        self.any_pool_mut(id)?.as_any_mut().downcast_mut::<ComponentPool<T>>()
    }

    pub(crate) fn any_pool_mut(&mut self, id: ComponentTypeId) -> Option<&mut dyn AnyPool> {
        let pool: &mut dyn AnyPool = self.pools.get_mut(id.index())?.as_deref_mut()?;
        Some(pool)
    }

    /// Attach `value` to `entity`, replacing any existing `T`.
    ///
    /// On an active entity, system membership is re-evaluated immediately.
    /// On a pending entity only the signature changes.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::EntityNotFound`] if the entity is not allocated,
    /// or a component error if `T` cannot be registered.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), EcsError> {
        if !self.is_allocated(entity) {
            return Err(EcsError::EntityNotFound(entity));
        }
        let id = self.register_component::<T>()?;
        if let Some(pool) = self.pool_mut_or_insert::<T>(id) {
            pool.add(entity, value);
        }
        let signature = &mut self.signatures[entity.index()];
        let added = !signature.test(id);
        signature.set(id, true);
        if added && self.live.contains(&entity) {
            self.refresh_membership(entity);
        }
        trace!(%entity, component = T::type_name(), "component added");
        Ok(())
    }

    /// Detach and return `entity`'s `T`. Absent components and stale
    /// entities yield `None`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Option<T> {
        let id = self.types.id_of::<T>()?;
        let value = self.pool_mut::<T>()?.remove(entity)?;
        if let Some(signature) = self.signatures.get_mut(entity.index()) {
            signature.set(id, false);
        }
        if self.live.contains(&entity) {
            self.refresh_membership(entity);
        }
        trace!(%entity, component = T::type_name(), "component removed");
        Some(value)
    }

    /// Returns `entity`'s `T`.
    #[must_use]
    pub fn get_component<T: Component>(&self, entity: Entity) -> Option<&T> {
        self.pool::<T>()?.get(entity)
    }

    /// Returns `entity`'s `T` mutably.
    #[must_use]
    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Option<&mut T> {
        self.pool_mut::<T>()?.get_mut(entity)
    }

    /// Returns `true` if `entity` has a `T`.
    #[must_use]
    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        self.types
            .id_of::<T>()
            .zip(self.entity_signature(entity))
            .is_some_and(|(id, signature)| signature.test(id))
    }

    /// Copy every component of `source` onto `target`, except those in
    /// `except`. Both must be allocated.
    pub(crate) fn copy_components(&mut self, source: Entity, target: Entity, except: Signature) {
        let Some(signature) = self.entity_signature(source) else {
            return;
        };
        for id in signature.iter().filter(|&id| !except.test(id)) {
            let copied = self
                .any_pool_mut(id)
                .is_some_and(|pool| pool.copy_entity(source, target));
            if copied {
                self.signatures[target.index()].set(id, true);
            }
        }
        if self.live.contains(&target) {
            self.refresh_membership(target);
        }
    }

    /// Set signature bits directly after an untyped insert.
    pub(crate) fn mark_component(&mut self, entity: Entity, id: ComponentTypeId) {
        if let Some(signature) = self.signatures.get_mut(entity.index()) {
            signature.set(id, true);
        }
    }

    /// Clear the signature of an entity whose components were moved out.
    pub(crate) fn clear_signature(&mut self, entity: Entity) {
        if let Some(signature) = self.signatures.get_mut(entity.index()) {
            signature.reset();
        }
    }

    /// Re-evaluate `entity`'s system membership and then flush.
    ///
    /// Call after changing an active entity's component set from outside the
    /// normal component API (for example from a scripting bridge) so systems
    /// observe a consistent entity list in the same step.
    pub fn entity_signature_changed(&mut self, entity: Entity) -> UpdateSummary {
        if self.live.contains(&entity) {
            self.refresh_membership(entity);
        }
        self.update()
    }

    fn refresh_membership(&mut self, entity: Entity) {
        let signature = self.signatures[entity.index()];
        for slot in &mut self.systems {
            let Some(system) = slot.system.as_mut() else {
                continue;
            };
            let base = system.base_mut();
            if base.wants(signature) {
                if base.add_entity(entity) {
                    trace!(%entity, system = slot.name, "entity joined system");
                }
            } else if base.remove_entity(entity) {
                trace!(%entity, system = slot.name, "entity left system");
            }
        }
    }

    /// Detach `entity` from every system, without touching its components.
    pub(crate) fn leave_systems(&mut self, entity: Entity) {
        for slot in &mut self.systems {
            if let Some(system) = slot.system.as_mut() {
                system.base_mut().remove_entity(entity);
            }
        }
    }

    // -- Systems --

    fn system_index<S: System>(&self) -> Option<usize> {
        let type_id = TypeId::of::<S>();
        self.systems.iter().position(|slot| slot.type_id == type_id)
    }

    /// Register `system`. It immediately tracks every matching active entity.
    ///
    /// # Errors
    ///
    /// Returns [`EcsError::SystemAlreadyRegistered`] if a system of type `S`
    /// is already registered.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EcsError> {
        let name = std::any::type_name::<S>();
        if self.system_index::<S>().is_some() {
            return Err(EcsError::SystemAlreadyRegistered(name));
        }
        let mut boxed: Box<dyn System> = Box::new(system);
        self.sync_system(boxed.as_mut());
        info!(system = name, tracked = boxed.base().len(), "system registered");
        self.systems.push(SystemSlot {
            type_id: TypeId::of::<S>(),
            name,
            system: Some(boxed),
        });
        Ok(())
    }

    /// Build a system with access to the component type table and register
    /// it.
    ///
    /// # Errors
    ///
    /// Propagates errors from `build` and from [`Registry::add_system`].
    pub fn add_system_with<S, F>(&mut self, build: F) -> Result<(), EcsError>
    where
        S: System,
        F: FnOnce(&mut ComponentTypes) -> Result<S, EcsError>,
    {
        let system = build(&mut self.types)?;
        self.add_system(system)
    }

    /// Unregister the system of type `S`. Returns `true` if one was removed.
    pub fn remove_system<S: System>(&mut self) -> bool {
        match self.system_index::<S>() {
            Some(index) => {
                let slot = self.systems.remove(index);
                info!(system = slot.name, "system removed");
                true
            }
            None => false,
        }
    }

    /// Returns `true` if a system of type `S` is registered.
    #[must_use]
    pub fn has_system<S: System>(&self) -> bool {
        self.system_index::<S>().is_some()
    }

    /// Returns the system of type `S`.
    #[must_use]
    pub fn get_system<S: System>(&self) -> Option<&S> {
        let index = self.system_index::<S>()?;
        let system: &dyn System = self.systems[index].system.as_deref()?;
        system.as_any().downcast_ref::<S>()
    }

    /// Returns the system of type `S` mutably.
    #[must_use]
    pub fn get_system_mut<S: System>(&mut self) -> Option<&mut S> {
        let index = self.system_index::<S>()?;
        let system: &mut dyn System = self.systems[index].system.as_deref_mut()?;
        system.as_any_mut().downcast_mut::<S>()
    }

    /// Run `f` with the system of type `S` and the registry at the same time.
    ///
    /// The system is detached while `f` runs and its membership is
    /// re-synchronised when it is re-attached, so component changes made by
    /// `f` are never lost. Returns `None` if `S` is not registered.
    pub fn with_system<S, R, F>(&mut self, f: F) -> Option<R>
    where
        S: System,
        F: FnOnce(&mut S, &mut Registry) -> R,
    {
        let index = self.system_index::<S>()?;
        let mut boxed = self.systems[index].system.take()?;

        let result = {
            let system: &mut dyn System = boxed.as_mut();
            system.as_any_mut().downcast_mut::<S>().map(|typed| f(typed, self))
        };

        // `f` may have removed the system; only re-attach if the slot survives.
        if let Some(index) = self.system_index::<S>() {
            self.sync_system(boxed.as_mut());
            self.systems[index].system = Some(boxed);
        }
        result
    }

    fn sync_system(&self, system: &mut dyn System) {
        let base = system.base_mut();
        let stale: Vec<Entity> = base.iter().filter(|e| !self.live.contains(e)).collect();
        for entity in stale {
            base.remove_entity(entity);
        }
        for &entity in &self.live {
            if base.wants(self.signatures[entity.index()]) {
                base.add_entity(entity);
            } else {
                base.remove_entity(entity);
            }
        }
    }

    /// Names of the registered systems, in registration order.
    #[must_use]
    pub fn system_names(&self) -> Vec<&'static str> {
        self.systems.iter().map(|slot| slot.name).collect()
    }

    // -- Collaborators --

    /// Register a lifecycle listener.
    pub fn add_listener(&mut self, listener: impl LifecycleListener + 'static) {
        self.listeners.push(Box::new(listener));
    }

    /// Number of registered listeners.
    #[must_use]
    pub fn listener_count(&self) -> usize {
        self.listeners.len()
    }

    /// Replace the clone collaborator used by [`Registry::clone_entity`].
    pub fn set_cloner(&mut self, cloner: impl EntityCloner + 'static) {
        self.cloner = Some(Box::new(cloner));
    }

    /// Duplicate `entity` through the clone collaborator.
    ///
    /// # Errors
    ///
    /// Propagates the collaborator's error, typically
    /// [`EcsError::EntityNotFound`].
    pub fn clone_entity(&mut self, entity: Entity) -> Result<Entity, EcsError> {
        let mut cloner = self.cloner.take().unwrap_or_else(|| Box::new(DeepCloner));
        let result = cloner.clone_entity(self, entity);
        self.cloner = Some(cloner);
        if let Ok(copy) = result {
            debug!(source = %entity, %copy, "entity cloned");
        }
        result
    }
}

impl Default for Registry {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Registry {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Registry")
            .field("live", &self.live.len())
            .field("pending_add", &self.pending_add.len())
            .field("pending_kill", &self.pending_kill.len())
            .field("free_ids", &self.free_ids.len())
            .field("component_types", &self.types.len())
            .field("systems", &self.system_names())
            .finish_non_exhaustive()
    }
}
