//! Dense per-type component storage

use std::any::Any;
use std::collections::HashMap;

use super::component::Component;

/// Type-erased view of a component pool.
///
/// The registry holds one `Box<dyn AnyPool>` per registered component type,
/// indexed by that type's id, and downcasts to the concrete [`Pool<T>`]
/// through `as_any` guarded by the same id. The erased surface is only what
/// the registry needs to iterate all pools generically during a flush.
pub trait AnyPool: Send + Sync {
    fn remove_entity(&mut self, entity_id: u32);
    fn has(&self, entity_id: u32) -> bool;
    fn len(&self) -> usize;
    fn clear(&mut self);
    fn as_any(&self) -> &dyn Any;
    fn as_any_mut(&mut self) -> &mut dyn Any;

    fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// Dense storage for one component type.
///
/// Component values live contiguously in `data` with no gaps. Two index
/// mappings keep each other inverse: `entity_to_slot[e] == i` iff
/// `slot_to_entity[i] == e`. Removal swaps the hole with the last live
/// element, so every operation is O(1) amortized and iteration order
/// reflects insertion/removal history rather than entity id order.
pub struct Pool<T: Component> {
    data: Vec<T>,
    entity_to_slot: HashMap<u32, usize>,
    slot_to_entity: Vec<u32>,
}

impl<T: Component> Pool<T> {
    pub fn new() -> Self {
        Self {
            data: Vec::new(),
            entity_to_slot: HashMap::new(),
            slot_to_entity: Vec::new(),
        }
    }

    /// Insert or overwrite the entity's component value.
    pub fn set(&mut self, entity_id: u32, value: T) {
        if let Some(&slot) = self.entity_to_slot.get(&entity_id) {
            self.data[slot] = value;
            return;
        }
        let slot = self.data.len();
        self.entity_to_slot.insert(entity_id, slot);
        self.slot_to_entity.push(entity_id);
        self.data.push(value);
    }

    pub fn get(&self, entity_id: u32) -> Option<&T> {
        let slot = *self.entity_to_slot.get(&entity_id)?;
        self.data.get(slot)
    }

    pub fn get_mut(&mut self, entity_id: u32) -> Option<&mut T> {
        let slot = *self.entity_to_slot.get(&entity_id)?;
        self.data.get_mut(slot)
    }

    /// Swap-with-last removal. Returns the removed value, or `None` if the
    /// entity has no slot here.
    pub fn remove(&mut self, entity_id: u32) -> Option<T> {
        let slot = self.entity_to_slot.remove(&entity_id)?;
        let removed = self.data.swap_remove(slot);
        self.slot_to_entity.swap_remove(slot);
        if slot < self.data.len() {
            let moved = self.slot_to_entity[slot];
            self.entity_to_slot.insert(moved, slot);
        }
        Some(removed)
    }

    pub fn contains(&self, entity_id: u32) -> bool {
        self.entity_to_slot.contains_key(&entity_id)
    }

    pub fn len(&self) -> usize {
        self.data.len()
    }

    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    pub fn clear(&mut self) {
        self.data.clear();
        self.entity_to_slot.clear();
        self.slot_to_entity.clear();
    }

    pub fn iter(&self) -> impl Iterator<Item = (u32, &T)> {
        self.slot_to_entity
            .iter()
            .copied()
            .zip(self.data.iter())
    }
}

impl<T: Component> Default for Pool<T> {
    fn default() -> Self {
        Self::new()
    }
}

impl<T: Component> AnyPool for Pool<T> {
    fn remove_entity(&mut self, entity_id: u32) {
        self.remove(entity_id);
    }

    fn has(&self, entity_id: u32) -> bool {
        self.contains(entity_id)
    }

    fn len(&self) -> usize {
        self.data.len()
    }

    fn clear(&mut self) {
        Pool::clear(self);
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

    #[derive(Debug, PartialEq)]
    struct Health {
        current: i32,
    }
    impl Component for Health {}

    #[test]
    fn test_set_get_roundtrip() {
        let mut pool = Pool::<Health>::new();
        pool.set(4, Health { current: 10 });
        pool.set(7, Health { current: 20 });

        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(4), Some(&Health { current: 10 }));
        assert_eq!(pool.get(7), Some(&Health { current: 20 }));
        assert_eq!(pool.get(1), None);

        // overwrite keeps the slot count
        pool.set(4, Health { current: 5 });
        assert_eq!(pool.len(), 2);
        assert_eq!(pool.get(4), Some(&Health { current: 5 }));
    }

    #[test]
    fn test_swap_remove_keeps_pool_dense() {
        let mut pool = Pool::<Health>::new();
        for id in 0..4 {
            pool.set(id, Health { current: id as i32 });
        }

        // removing a non-last entity moves the last one into its slot
        assert_eq!(pool.remove(1), Some(Health { current: 1 }));
        assert_eq!(pool.len(), 3);
        assert!(!pool.contains(1));
        for id in [0u32, 2, 3] {
            assert_eq!(pool.get(id), Some(&Health { current: id as i32 }));
        }

        // index maps stay inverse after the swap
        for (entity, value) in pool.iter() {
            assert_eq!(value.current, entity as i32);
        }
    }

    #[test]
    fn test_remove_last_shrinks() {
        let mut pool = Pool::<Health>::new();
        pool.set(1, Health { current: 1 });
        pool.set(2, Health { current: 2 });

        assert_eq!(pool.remove(2), Some(Health { current: 2 }));
        assert_eq!(pool.len(), 1);
        assert_eq!(pool.get(1), Some(&Health { current: 1 }));
        assert_eq!(pool.remove(2), None);
    }

    #[test]
    fn test_erased_removal() {
        let mut pool = Pool::<Health>::new();
        pool.set(9, Health { current: 1 });

        let erased: &mut dyn AnyPool = &mut pool;
        assert!(erased.has(9));
        erased.remove_entity(9);
        erased.remove_entity(9); // absent id is a no-op
        assert!(erased.is_empty());
    }
}
