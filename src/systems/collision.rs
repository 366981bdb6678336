use anyhow::Result;

use crate::components::{BoxCollider, Position};
use crate::ecs::{ComponentTypes, Entity, Registry, System, SystemContext, SystemCore};
use crate::error::EcsError;
use crate::events::CollisionEvent;

/// Pairwise AABB overlap test over every entity with a position and a
/// collider. Each overlapping pair is reported once per tick as a
/// [`CollisionEvent`]; resolving the collision is left to subscribers.
pub struct CollisionSystem {
    core: SystemCore,
}

impl CollisionSystem {
    pub fn new(types: &mut ComponentTypes) -> Result<Self, EcsError> {
        let mut core = SystemCore::new();
        core.require::<Position>(types)?;
        core.require::<BoxCollider>(types)?;
        Ok(Self { core })
    }

    fn aabb(registry: &Registry, entity: Entity) -> Result<(f32, f32, f32, f32), EcsError> {
        let position = registry.get_component::<Position>(entity)?;
        let collider = registry.get_component::<BoxCollider>(entity)?;
        let x = position.x + collider.offset_x;
        let y = position.y + collider.offset_y;
        Ok((x, y, collider.width, collider.height))
    }

    fn overlaps(a: (f32, f32, f32, f32), b: (f32, f32, f32, f32)) -> bool {
        a.0 < b.0 + b.2 && a.0 + a.2 > b.0 && a.1 < b.1 + b.3 && a.1 + a.3 > b.1
    }
}

impl System for CollisionSystem {
    fn name(&self) -> &'static str {
        "collision"
    }

    fn core(&self) -> &SystemCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut SystemCore {
        &mut self.core
    }

    fn update(&mut self, ctx: &mut SystemContext<'_>) -> Result<()> {
        let entities = self.core.entities().to_vec();
        for (i, &a) in entities.iter().enumerate() {
            let box_a = Self::aabb(ctx.registry, a)?;
            for &b in &entities[i + 1..] {
                let box_b = Self::aabb(ctx.registry, b)?;
                if Self::overlaps(box_a, box_b) {
                    ctx.events.emit(CollisionEvent { a, b }, ctx.registry);
                }
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
