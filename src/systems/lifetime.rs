use anyhow::Result;

use crate::components::Lifetime;
use crate::ecs::{ComponentTypes, System, SystemContext, SystemCore};
use crate::error::EcsError;

/// Counts down each entity's remaining lifetime and queues expired ones for
/// destruction. Used for projectiles and other short-lived spawns.
pub struct LifetimeSystem {
    core: SystemCore,
}

impl LifetimeSystem {
    pub fn new(types: &mut ComponentTypes) -> Result<Self, EcsError> {
        let mut core = SystemCore::new();
        core.require::<Lifetime>(types)?;
        Ok(Self { core })
    }
}

impl System for LifetimeSystem {
    fn name(&self) -> &'static str {
        "lifetime"
    }

    fn core(&self) -> &SystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SystemCore {
        &mut self.core
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        for entity in self.core.entities().to_vec() {
            let lifetime = ctx.registry.get_component_mut::<Lifetime>(entity)?;
            lifetime.remaining -= ctx.dt;
            if lifetime.remaining <= 0.0 {
                ctx.registry.kill_entity(entity)?;
            }
        }
        Ok(())
    }

    fn as_any(&self) -> &dyn std::any::Any {
        self
    }

    fn as_any_mut(&mut self) -> &mut dyn std::any::Any {
        self
    }
}
