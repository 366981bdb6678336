//! Component type identity and entity signatures

use std::any::TypeId;
use std::collections::HashMap;

use crate::error::EcsError;

/// Width of a [`Signature`]: the maximum number of distinct component types
/// one registry can track.
pub const MAX_COMPONENT_TYPES: usize = 32;

/// Marker trait for component types.
///
/// Components are plain data; the registry owns every instance and hands out
/// references for the duration of a system's update only.
pub trait Component: Send + Sync + 'static {}

/// Small integer identifier for a component type, valid within the registry
/// that assigned it.
pub type ComponentTypeId = usize;

/// Assigns a stable small integer id to each distinct component type on
/// first use.
///
/// This is an owned object rather than a static counter so that independent
/// registries (and unit tests) never share id state. Ids are assigned lazily
/// and monotonically and are never reused.
#[derive(Default)]
pub struct ComponentTypes {
    ids: HashMap<TypeId, ComponentTypeId>,
    names: Vec<&'static str>,
}

impl ComponentTypes {
    pub fn new() -> Self {
        Self::default()
    }

    /// Return the id for `T`, assigning the next free one on first use.
    pub fn id_of<T: Component>(&mut self) -> Result<ComponentTypeId, EcsError> {
        if let Some(&id) = self.ids.get(&TypeId::of::<T>()) {
            return Ok(id);
        }
        let id = self.names.len();
        if id >= MAX_COMPONENT_TYPES {
            return Err(EcsError::ComponentTypeLimit {
                limit: MAX_COMPONENT_TYPES,
            });
        }
        self.ids.insert(TypeId::of::<T>(), id);
        self.names.push(std::any::type_name::<T>());
        Ok(id)
    }

    /// Look up the id for `T` without assigning one.
    pub fn lookup<T: Component>(&self) -> Option<ComponentTypeId> {
        self.ids.get(&TypeId::of::<T>()).copied()
    }

    /// Number of component types registered so far.
    pub fn len(&self) -> usize {
        self.names.len()
    }

    pub fn is_empty(&self) -> bool {
        self.names.is_empty()
    }

    /// Human-readable name for a type id, for diagnostics.
    pub fn name(&self, id: ComponentTypeId) -> Option<&'static str> {
        self.names.get(id).copied()
    }
}

/// Bitset over component type ids.
///
/// An entity's signature has bit `i` set iff the entity currently has a
/// component with type id `i`; a system's required signature has bit `i` set
/// iff the system requires that type.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct Signature(u32);

impl Signature {
    pub fn new() -> Self {
        Self(0)
    }

    pub fn set(&mut self, id: ComponentTypeId) {
        debug_assert!(id < MAX_COMPONENT_TYPES);
        self.0 |= 1 << id;
    }

    pub fn clear(&mut self, id: ComponentTypeId) {
        debug_assert!(id < MAX_COMPONENT_TYPES);
        self.0 &= !(1 << id);
    }

    pub fn test(&self, id: ComponentTypeId) -> bool {
        debug_assert!(id < MAX_COMPONENT_TYPES);
        self.0 & (1 << id) != 0
    }

    /// Subset test: does `self` contain every bit of `required`?
    pub fn contains(&self, required: Signature) -> bool {
        self.0 & required.0 == required.0
    }

    pub fn clear_all(&mut self) {
        self.0 = 0;
    }

    pub fn is_empty(&self) -> bool {
        self.0 == 0
    }
}
