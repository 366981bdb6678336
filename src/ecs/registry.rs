//! Entity registry: id allocation, component routing, deferred mutation,
//! tag/group indices, and the system collection

use std::any::TypeId;
use std::collections::{BTreeSet, HashMap, VecDeque};

use log::debug;

use super::component::{Component, ComponentTypes, Signature};
use super::entity::{Entity, EntityState};
use super::pool::{AnyPool, Pool};
use super::system::{System, SystemContext};
use crate::error::EcsError;
use crate::events::EventBus;

/// Owns all entity and component state: the pools, the signature table, the
/// free list, tag and group indices, and the registered systems.
///
/// Structural mutation is deferred: `create_entity` and `kill_entity` only
/// enqueue, and [`Registry::flush`] applies the queues at the tick boundary.
/// System entity lists are therefore never invalidated mid-iteration.
#[derive(Default)]
pub struct Registry {
    types: ComponentTypes,
    /// Indexed by component type id; entries are created lazily on first
    /// use of each component type.
    pools: Vec<Option<Box<dyn AnyPool>>>,
    /// Indexed by entity id.
    signatures: Vec<Signature>,
    states: Vec<EntityState>,
    next_id: u32,
    free_ids: VecDeque<u32>,

    pending_create: BTreeSet<Entity>,
    pending_destroy: BTreeSet<Entity>,
    /// Active entities whose signature changed since the last flush and
    /// whose system memberships must be re-evaluated.
    pending_refresh: BTreeSet<Entity>,

    tag_to_entity: HashMap<String, Entity>,
    entity_to_tag: HashMap<u32, String>,
    group_members: HashMap<String, BTreeSet<Entity>>,
    entity_to_group: HashMap<u32, String>,

    systems: HashMap<TypeId, Box<dyn System>>,
    system_order: Vec<(TypeId, &'static str)>,
}

impl Registry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Component type table, needed by system constructors to resolve their
    /// required signature.
    pub fn types_mut(&mut self) -> &mut ComponentTypes {
        &mut self.types
    }

    pub fn types(&self) -> &ComponentTypes {
        &self.types
    }

    // ---- entity lifecycle -------------------------------------------------

    /// Allocate an entity handle, recycling freed ids first.
    ///
    /// The handle is immediately usable for component attachment and
    /// tagging, but no system sees the entity until the next flush.
    pub fn create_entity(&mut self) -> Entity {
        let id = self.free_ids.pop_front().unwrap_or_else(|| {
            let id = self.next_id;
            self.next_id += 1;
            id
        });
        let idx = id as usize;
        if idx >= self.states.len() {
            self.signatures.resize(idx + 1, Signature::new());
            self.states.resize(idx + 1, EntityState::Free);
        }
        self.signatures[idx].clear_all();
        self.states[idx] = EntityState::Pending;
        let entity = Entity::new(id);
        self.pending_create.insert(entity);
        debug!("entity {id} created");
        entity
    }

    /// Queue the entity for destruction at the next flush. Idempotent.
    pub fn kill_entity(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.ensure_live(entity)?;
        self.states[entity.id() as usize] = EntityState::PendingDestroy;
        self.pending_destroy.insert(entity);
        debug!("entity {} queued for destruction", entity.id());
        Ok(())
    }

    pub fn is_alive(&self, entity: Entity) -> bool {
        !matches!(
            self.states.get(entity.id() as usize),
            Some(EntityState::Free) | None
        )
    }

    pub fn state(&self, entity: Entity) -> EntityState {
        self.states
            .get(entity.id() as usize)
            .copied()
            .unwrap_or(EntityState::Free)
    }

    /// Number of live entities, pending ones included.
    pub fn entity_count(&self) -> usize {
        self.states
            .iter()
            .filter(|s| !matches!(s, EntityState::Free))
            .count()
    }

    /// Apply queued structural mutations. Called once per tick, before any
    /// system runs.
    ///
    /// Order within one flush: creations are matched into systems first,
    /// then active entities with changed signatures are re-matched, then
    /// destructions are applied. An entity created and killed in the same
    /// tick is briefly added to its systems and removed again here.
    pub fn flush(&mut self) {
        let created = std::mem::take(&mut self.pending_create);
        for entity in created {
            self.match_entity(entity);
            let state = &mut self.states[entity.id() as usize];
            if *state == EntityState::Pending {
                *state = EntityState::Active;
            }
        }

        let refreshed = std::mem::take(&mut self.pending_refresh);
        for entity in refreshed {
            if self.state(entity) == EntityState::Active {
                self.match_entity(entity);
            }
        }

        let destroyed = std::mem::take(&mut self.pending_destroy);
        for entity in destroyed {
            self.remove_entity_from_systems(entity);
            for pool in self.pools.iter_mut().flatten() {
                pool.remove_entity(entity.id());
            }
            self.signatures[entity.id() as usize].clear_all();
            self.remove_tag(entity);
            self.remove_from_group(entity);
            self.states[entity.id() as usize] = EntityState::Free;
            self.free_ids.push_back(entity.id());
            debug!("entity {} destroyed", entity.id());
        }
    }

    fn ensure_live(&self, entity: Entity) -> Result<(), EcsError> {
        if self.is_alive(entity) {
            Ok(())
        } else {
            Err(EcsError::UnknownEntity { id: entity.id() })
        }
    }

    // ---- components -------------------------------------------------------

    /// Attach or overwrite a component on the entity and set its signature
    /// bit. The pool for `T` is created lazily on first use.
    pub fn add_component<T: Component>(
        &mut self,
        entity: Entity,
        value: T,
    ) -> Result<(), EcsError> {
        self.ensure_live(entity)?;
        let type_id = self.types.id_of::<T>()?;
        if type_id >= self.pools.len() {
            self.pools.resize_with(type_id + 1, || None);
        }
        let pool = self.pools[type_id].get_or_insert_with(|| Box::new(Pool::<T>::new()));
        let pool = pool
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
            .expect("pool type matches its component type id");
        pool.set(entity.id(), value);
        self.signatures[entity.id() as usize].set(type_id);
        self.mark_refresh(entity);
        debug!(
            "component {} added to entity {}",
            std::any::type_name::<T>(),
            entity.id()
        );
        Ok(())
    }

    /// Detach a component and clear its signature bit. A no-op if the entity
    /// has no instance of `T`.
    pub fn remove_component<T: Component>(&mut self, entity: Entity) -> Result<(), EcsError> {
        self.ensure_live(entity)?;
        let Some(type_id) = self.types.lookup::<T>() else {
            return Ok(());
        };
        let Some(pool) = self.typed_pool_mut::<T>(type_id) else {
            return Ok(());
        };
        if pool.remove(entity.id()).is_none() {
            return Ok(());
        }
        self.signatures[entity.id() as usize].clear(type_id);
        self.mark_refresh(entity);
        debug!(
            "component {} removed from entity {}",
            std::any::type_name::<T>(),
            entity.id()
        );
        Ok(())
    }

    pub fn has_component<T: Component>(&self, entity: Entity) -> bool {
        let Some(type_id) = self.types.lookup::<T>() else {
            return false;
        };
        self.signatures
            .get(entity.id() as usize)
            .map(|s| s.test(type_id))
            .unwrap_or(false)
            && self.is_alive(entity)
    }

    pub fn get_component<T: Component>(&self, entity: Entity) -> Result<&T, EcsError> {
        self.ensure_live(entity)?;
        self.types
            .lookup::<T>()
            .and_then(|type_id| self.typed_pool::<T>(type_id))
            .and_then(|pool| pool.get(entity.id()))
            .ok_or(EcsError::MissingComponent {
                entity: entity.id(),
                component: std::any::type_name::<T>(),
            })
    }

    pub fn get_component_mut<T: Component>(&mut self, entity: Entity) -> Result<&mut T, EcsError> {
        self.ensure_live(entity)?;
        let missing = EcsError::MissingComponent {
            entity: entity.id(),
            component: std::any::type_name::<T>(),
        };
        let Some(type_id) = self.types.lookup::<T>() else {
            return Err(missing);
        };
        let Some(pool) = self.typed_pool_mut::<T>(type_id) else {
            return Err(missing);
        };
        pool.get_mut(entity.id()).ok_or(missing)
    }

    fn typed_pool<T: Component>(&self, type_id: usize) -> Option<&Pool<T>> {
        self.pools
            .get(type_id)?
            .as_ref()?
            .as_any()
            .downcast_ref::<Pool<T>>()
    }

    fn typed_pool_mut<T: Component>(&mut self, type_id: usize) -> Option<&mut Pool<T>> {
        self.pools
            .get_mut(type_id)?
            .as_mut()?
            .as_any_mut()
            .downcast_mut::<Pool<T>>()
    }

    /// Component mutations on an active entity re-match its system
    /// memberships at the next flush.
    fn mark_refresh(&mut self, entity: Entity) {
        if self.state(entity) == EntityState::Active {
            self.pending_refresh.insert(entity);
        }
    }

    // ---- tags and groups --------------------------------------------------

    /// Tag the entity with a unique name. A name already owned by another
    /// entity is transferred: the prior owner's record is removed from both
    /// sides of the index.
    pub fn tag(&mut self, entity: Entity, name: &str) -> Result<(), EcsError> {
        self.ensure_live(entity)?;
        if let Some(prev) = self.tag_to_entity.get(name).copied() {
            if prev != entity {
                self.entity_to_tag.remove(&prev.id());
            }
        }
        if let Some(old) = self.entity_to_tag.insert(entity.id(), name.to_string()) {
            if old != name {
                self.tag_to_entity.remove(&old);
            }
        }
        self.tag_to_entity.insert(name.to_string(), entity);
        Ok(())
    }

    pub fn has_tag(&self, entity: Entity, name: &str) -> bool {
        self.entity_to_tag
            .get(&entity.id())
            .map(|t| t == name)
            .unwrap_or(false)
    }

    pub fn entity_by_tag(&self, name: &str) -> Option<Entity> {
        self.tag_to_entity.get(name).copied()
    }

    pub fn remove_tag(&mut self, entity: Entity) {
        if let Some(tag) = self.entity_to_tag.remove(&entity.id()) {
            self.tag_to_entity.remove(&tag);
        }
    }

    /// Put the entity into a group. An entity belongs to at most one group;
    /// regrouping moves it.
    pub fn group(&mut self, entity: Entity, name: &str) -> Result<(), EcsError> {
        self.ensure_live(entity)?;
        if let Some(old) = self.entity_to_group.insert(entity.id(), name.to_string()) {
            if old != name {
                if let Some(members) = self.group_members.get_mut(&old) {
                    members.remove(&entity);
                }
            }
        }
        self.group_members
            .entry(name.to_string())
            .or_default()
            .insert(entity);
        Ok(())
    }

    pub fn in_group(&self, entity: Entity, name: &str) -> bool {
        self.entity_to_group
            .get(&entity.id())
            .map(|g| g == name)
            .unwrap_or(false)
    }

    /// Members of a group, ordered by entity id.
    pub fn entities_in_group(&self, name: &str) -> Vec<Entity> {
        self.group_members
            .get(name)
            .map(|members| members.iter().copied().collect())
            .unwrap_or_default()
    }

    pub fn remove_from_group(&mut self, entity: Entity) {
        if let Some(group) = self.entity_to_group.remove(&entity.id()) {
            if let Some(members) = self.group_members.get_mut(&group) {
                members.remove(&entity);
            }
        }
    }

    // ---- systems ----------------------------------------------------------

    /// Register a system. One instance per system type; a duplicate is
    /// rejected rather than silently replacing the prior instance.
    pub fn add_system<S: System>(&mut self, system: S) -> Result<(), EcsError> {
        let type_id = TypeId::of::<S>();
        if self.systems.contains_key(&type_id) {
            return Err(EcsError::DuplicateSystem {
                name: system.name(),
            });
        }
        self.system_order.push((type_id, system.name()));
        self.systems.insert(type_id, Box::new(system));
        Ok(())
    }

    pub fn remove_system<S: System>(&mut self) -> Result<(), EcsError> {
        let type_id = TypeId::of::<S>();
        if self.systems.remove(&type_id).is_none() {
            return Err(EcsError::UnknownSystem {
                name: std::any::type_name::<S>(),
            });
        }
        self.system_order.retain(|(id, _)| *id != type_id);
        Ok(())
    }

    pub fn has_system<S: System>(&self) -> bool {
        self.systems.contains_key(&TypeId::of::<S>())
    }

    pub fn system<S: System>(&self) -> Option<&S> {
        self.systems
            .get(&TypeId::of::<S>())?
            .as_any()
            .downcast_ref::<S>()
    }

    pub fn system_mut<S: System>(&mut self) -> Option<&mut S> {
        self.systems
            .get_mut(&TypeId::of::<S>())?
            .as_any_mut()
            .downcast_mut::<S>()
    }

    /// Registered systems in registration order, for the driver loop.
    pub fn system_order(&self) -> Vec<(TypeId, &'static str)> {
        self.system_order.clone()
    }

    /// Run every system's per-tick `subscribe` hook against a freshly reset
    /// event bus.
    pub fn subscribe_systems(&self, bus: &mut EventBus) {
        for (type_id, _) in &self.system_order {
            if let Some(system) = self.systems.get(type_id) {
                system.subscribe(bus);
            }
        }
    }

    /// Run one system's `update`. The system is taken out of the collection
    /// for the duration of the call so it can borrow the registry mutably.
    pub fn run_system(
        &mut self,
        type_id: TypeId,
        bus: &mut EventBus,
        dt: f32,
        tick: u64,
    ) -> anyhow::Result<()> {
        let mut system = self.systems.remove(&type_id).ok_or_else(|| {
            let name = self
                .system_order
                .iter()
                .find(|(id, _)| *id == type_id)
                .map(|(_, name)| *name)
                .unwrap_or("unknown");
            EcsError::UnknownSystem { name }
        })?;
        let result = {
            let mut ctx = SystemContext {
                registry: &mut *self,
                events: bus,
                dt,
                tick,
            };
            system.update(&mut ctx)
        };
        self.systems.insert(type_id, system);
        result
    }

    /// Match the entity into every system whose required signature its
    /// current signature contains, and out of every system it no longer
    /// qualifies for.
    fn match_entity(&mut self, entity: Entity) {
        let signature = self.signatures[entity.id() as usize];
        for system in self.systems.values_mut() {
            if signature.contains(system.core().signature()) {
                system.core_mut().add_entity(entity);
            } else {
                system.core_mut().remove_entity(entity);
            }
        }
    }

    fn remove_entity_from_systems(&mut self, entity: Entity) {
        for system in self.systems.values_mut() {
            system.core_mut().remove_entity(entity);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, PartialEq)]
    struct Position {
        x: f32,
        y: f32,
    }
    impl Component for Position {}

    #[derive(Debug, PartialEq)]
    struct Velocity {
        x: f32,
        y: f32,
    }
    impl Component for Velocity {}

    #[test]
    fn test_component_roundtrip() {
        let mut registry = Registry::new();
        let entity = registry.create_entity();

        registry
            .add_component(entity, Position { x: 1.0, y: 2.0 })
            .unwrap();
        assert!(registry.has_component::<Position>(entity));
        assert!(!registry.has_component::<Velocity>(entity));

        let pos = registry.get_component::<Position>(entity).unwrap();
        assert_eq!(*pos, Position { x: 1.0, y: 2.0 });

        registry
            .get_component_mut::<Position>(entity)
            .unwrap()
            .x = 5.0;
        assert_eq!(registry.get_component::<Position>(entity).unwrap().x, 5.0);

        registry.remove_component::<Position>(entity).unwrap();
        assert!(!registry.has_component::<Position>(entity));
        assert_eq!(
            registry.get_component::<Position>(entity),
            Err(EcsError::MissingComponent {
                entity: entity.id(),
                component: std::any::type_name::<Position>(),
            })
        );
    }

    #[test]
    fn test_unknown_entity_is_an_error() {
        let mut registry = Registry::new();
        let entity = registry.create_entity();
        registry.kill_entity(entity).unwrap();
        registry.flush();

        assert_eq!(
            registry.add_component(entity, Position { x: 0.0, y: 0.0 }),
            Err(EcsError::UnknownEntity { id: entity.id() })
        );
        assert_eq!(
            registry.kill_entity(entity),
            Err(EcsError::UnknownEntity { id: entity.id() })
        );
    }

    #[test]
    fn test_free_list_reuses_lowest_id_first() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let _b = registry.create_entity();
        registry.flush();

        registry.add_component(a, Position { x: 1.0, y: 1.0 }).unwrap();
        registry.kill_entity(a).unwrap();
        registry.flush();

        let c = registry.create_entity();
        assert_eq!(c.id(), a.id());
        // recycled id starts clean
        assert!(!registry.has_component::<Position>(c));
        assert_eq!(registry.state(c), EntityState::Pending);
    }

    #[test]
    fn test_tag_overwrite_transfers_ownership() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();

        registry.tag(a, "player").unwrap();
        assert_eq!(registry.entity_by_tag("player"), Some(a));

        registry.tag(b, "player").unwrap();
        assert_eq!(registry.entity_by_tag("player"), Some(b));
        assert!(!registry.has_tag(a, "player"));
        assert!(registry.has_tag(b, "player"));
    }

    #[test]
    fn test_retagging_clears_previous_name() {
        let mut registry = Registry::new();
        let a = registry.create_entity();

        registry.tag(a, "player").unwrap();
        registry.tag(a, "boss").unwrap();

        assert_eq!(registry.entity_by_tag("player"), None);
        assert_eq!(registry.entity_by_tag("boss"), Some(a));
        assert!(registry.has_tag(a, "boss"));
    }

    #[test]
    fn test_groups_hold_many_entities() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        let b = registry.create_entity();

        registry.group(a, "enemies").unwrap();
        registry.group(b, "enemies").unwrap();
        assert_eq!(registry.entities_in_group("enemies"), vec![a, b]);

        // regrouping moves the entity out of its old group
        registry.group(b, "projectiles").unwrap();
        assert_eq!(registry.entities_in_group("enemies"), vec![a]);
        assert!(registry.in_group(b, "projectiles"));
        assert!(!registry.in_group(b, "enemies"));
    }

    #[test]
    fn test_destroy_releases_tag_and_group() {
        let mut registry = Registry::new();
        let a = registry.create_entity();
        registry.tag(a, "player").unwrap();
        registry.group(a, "world").unwrap();
        registry.flush();

        registry.kill_entity(a).unwrap();
        registry.flush();

        assert_eq!(registry.entity_by_tag("player"), None);
        assert!(registry.entities_in_group("world").is_empty());
        assert_eq!(registry.entity_count(), 0);
    }
}
