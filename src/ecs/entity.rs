//! Entity handles and lifecycle state

/// Opaque entity handle.
///
/// An entity carries no data of its own; all of its state lives in the
/// registry's pools and signature table. Every operation on an entity takes
/// the registry as an explicit argument, so a handle never embeds a
/// back-reference to the registry it came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
pub struct Entity {
    id: u32,
}

impl Entity {
    pub(crate) fn new(id: u32) -> Self {
        Self { id }
    }

    pub fn id(&self) -> u32 {
        self.id
    }
}

/// Lifecycle of an entity id.
///
/// `Pending` entities have been handed out by `create_entity` but are not
/// yet visible to any system; `flush` promotes them to `Active`. A killed
/// entity stays `PendingDestroy` until the next flush returns its id to the
/// free list as `Free`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityState {
    Free,
    Pending,
    Active,
    PendingDestroy,
}
