use anyhow::Result;

use crate::components::{Position, Velocity};
use crate::ecs::{ComponentTypes, System, SystemContext, SystemCore};
use crate::error::EcsError;

/// Integrates velocity into position for every entity that has both.
pub struct MovementSystem {
    core: SystemCore,
}

impl MovementSystem {
    pub fn new(types: &mut ComponentTypes) -> Result<Self, EcsError> {
        let mut core = SystemCore::new();
        core.require::<Position>(types)?;
        core.require::<Velocity>(types)?;
        Ok(Self { core })
    }
}

impl System for MovementSystem {
    fn name(&self) -> &'static str {
        "movement"
    }

    fn core(&self) -> &SystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SystemCore {
        &mut self.core
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        for entity in self.core.entities().to_vec() {
            let velocity = *ctx.registry.get_component::<Velocity>(entity)?;
            let position = ctx.registry.get_component_mut::<Position>(entity)?;
            position.x += velocity.x * ctx.dt;
            position.y += velocity.y * ctx.dt;
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
