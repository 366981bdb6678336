use anyhow::Result;

use log::warn;

use crate::components::{BoxCollider, Health};
use crate::ecs::{ComponentTypes, Entity, Registry, System, SystemContext, SystemCore};
use crate::error::EcsError;
use crate::events::{CollisionEvent, EventBus};

/// Damage applied to each participant of a collision.
const CONTACT_DAMAGE: i32 = 10;

/// Applies contact damage when collisions are reported.
///
/// All of its work happens in the collision handler; `update` has nothing
/// to do. Kills are deferred by the registry, so a handler firing for an
/// entity that another collision already doomed this tick is harmless.
pub struct DamageSystem {
    core: SystemCore,
}

impl DamageSystem {
    pub fn new(types: &mut ComponentTypes) -> Result<Self, EcsError> {
        let mut core = SystemCore::new();
        core.require::<BoxCollider>(types)?;
        Ok(Self { core })
    }

    fn on_collision(event: &CollisionEvent, registry: &mut Registry) {
        for entity in [event.a, event.b] {
            Self::apply_contact_damage(entity, registry);
        }
    }

    fn apply_contact_damage(entity: Entity, registry: &mut Registry) {
        let dead = match registry.get_component_mut::<Health>(entity) {
            Ok(health) => {
                health.current -= CONTACT_DAMAGE;
                health.current <= 0
            }
            // no health pool means the entity does not survive contact
            Err(EcsError::MissingComponent { .. }) => true,
            Err(err) => {
                warn!("damage handler skipped entity {}: {err}", entity.id());
                false
            }
        };
        if dead {
            if let Err(err) = registry.kill_entity(entity) {
                warn!("damage handler could not kill entity {}: {err}", entity.id());
            }
        }
    }
}

impl System for DamageSystem {
    fn name(&self) -> &'static str {
        "damage"
    }

    fn core(&self) -> &SystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SystemCore {
        &mut self.core
    }

    fn subscribe(&self, bus: &mut EventBus) {
        bus.subscribe::<CollisionEvent>(Self::on_collision);
    }

    fn update(&mut self, _ctx: &mut SystemContext<'_>) -> Result<()> {
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
