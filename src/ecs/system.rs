//! System trait and per-system bookkeeping

use std::any::Any;

use anyhow::Result;

use super::component::{Component, ComponentTypes, Signature};
use super::entity::Entity;
use super::registry::Registry;
use crate::events::EventBus;

/// Per-tick context handed to a system's `update`.
///
/// The registry and event bus are passed explicitly; systems hold no
/// references back into the registry between ticks.
pub struct SystemContext<'a> {
    pub registry: &'a mut Registry,
    pub events: &'a mut EventBus,
    /// Seconds elapsed since the previous tick.
    pub dt: f32,
    pub tick: u64,
}

/// Required signature and current entity list of one system.
///
/// Every system struct embeds one of these; only the registry mutates the
/// entity list, during flush. The required signature is fixed at
/// construction time via [`SystemCore::require`].
#[derive(Default)]
pub struct SystemCore {
    signature: Signature,
    entities: Vec<Entity>,
}

impl SystemCore {
    pub fn new() -> Self {
        Self::default()
    }

    /// OR the component type's bit into the required signature. Called from
    /// system constructors, before the system is registered.
    pub fn require<T: Component>(
        &mut self,
        types: &mut ComponentTypes,
    ) -> Result<(), crate::error::EcsError> {
        let id = types.id_of::<T>()?;
        self.signature.set(id);
        Ok(())
    }

    pub fn signature(&self) -> Signature {
        self.signature
    }

    /// Entities matched to this system as of the last flush.
    pub fn entities(&self) -> &[Entity] {
        &self.entities
    }

    pub(crate) fn add_entity(&mut self, entity: Entity) {
        if !self.entities.contains(&entity) {
            self.entities.push(entity);
        }
    }

    pub(crate) fn remove_entity(&mut self, entity: Entity) {
        self.entities.retain(|e| *e != entity);
    }
}

/// A named unit of per-tick logic.
///
/// Implementations embed a [`SystemCore`] holding their required signature
/// and matched entity list, and expose it through `core`/`core_mut`. The
/// `subscribe` hook runs once per tick after the event bus is reset, so
/// subscription lifetime is a single tick by convention.
pub trait System: Any {
    fn name(&self) -> &'static str;

    fn core(&self) -> &SystemCore;

    fn core_mut(&mut self) -> &mut SystemCore;

    /// Register interest in events for the current tick.
    fn subscribe(&self, _bus: &mut EventBus) {}

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()>;

    fn as_any(&self) -> &dyn Any;

    fn as_any_mut(&mut self) -> &mut dyn Any;
}
