//! YAML scene loading
//!
//! A scene describes the entities of a level: which components each one
//! starts with and its optional tag and group. The loader only calls the
//! registry's public surface; the registry itself never touches a file.

use std::{
    fs,
    path::{Path, PathBuf},
};

use anyhow::{Context, Result};
use serde::Deserialize;

use crate::components::{BoxCollider, Health, Lifetime, Position, Velocity};
use crate::ecs::Registry;

fn default_dt() -> f32 {
    1.0 / 60.0
}

#[derive(Debug, Clone, Deserialize)]
pub struct Scene {
    pub name: String,
    pub description: Option<String>,
    #[serde(default = "default_dt")]
    pub dt: f32,
    #[serde(default)]
    pub ticks: Option<u64>,
    pub entities: Vec<SceneEntity>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SceneEntity {
    #[serde(default)]
    pub tag: Option<String>,
    #[serde(default)]
    pub group: Option<String>,
    #[serde(default)]
    pub position: Option<PositionInit>,
    #[serde(default)]
    pub velocity: Option<VelocityInit>,
    #[serde(default)]
    pub collider: Option<ColliderInit>,
    #[serde(default)]
    pub health: Option<HealthInit>,
    #[serde(default)]
    pub lifetime: Option<f32>,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct PositionInit {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct VelocityInit {
    pub x: f32,
    pub y: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct ColliderInit {
    pub width: f32,
    pub height: f32,
    #[serde(default)]
    pub offset_x: f32,
    #[serde(default)]
    pub offset_y: f32,
}

#[derive(Debug, Clone, Copy, Deserialize)]
pub struct HealthInit {
    pub max: i32,
}

pub struct SceneLoader {
    base_dir: PathBuf,
}

impl SceneLoader {
    pub fn new(base_dir: impl AsRef<Path>) -> Self {
        Self {
            base_dir: base_dir.as_ref().to_path_buf(),
        }
    }

    pub fn load(&self, file: impl AsRef<Path>) -> Result<Scene> {
        let path = self.base_dir.join(file);
        let data = fs::read_to_string(&path)
            .with_context(|| format!("Failed to read scene file {}", path.display()))?;
        let scene: Scene = serde_yaml::from_str(&data)
            .with_context(|| format!("Failed to parse {}", path.display()))?;
        Ok(scene)
    }
}

impl Scene {
    /// Create the scene's entities in the registry. They become
    /// system-visible at the registry's next flush.
    pub fn populate(&self, registry: &mut Registry) -> Result<()> {
        for entry in &self.entities {
            let entity = registry.create_entity();
            if let Some(p) = entry.position {
                registry.add_component(entity, Position { x: p.x, y: p.y })?;
            }
            if let Some(v) = entry.velocity {
                registry.add_component(entity, Velocity { x: v.x, y: v.y })?;
            }
            if let Some(c) = entry.collider {
                registry.add_component(
                    entity,
                    BoxCollider {
                        width: c.width,
                        height: c.height,
                        offset_x: c.offset_x,
                        offset_y: c.offset_y,
                    },
                )?;
            }
            if let Some(h) = entry.health {
                registry.add_component(entity, Health::full(h.max))?;
            }
            if let Some(remaining) = entry.lifetime {
                registry.add_component(entity, Lifetime { remaining })?;
            }
            if let Some(tag) = &entry.tag {
                registry.tag(entity, tag)?;
            }
            if let Some(group) = &entry.group {
                registry.group(entity, group)?;
            }
        }
        Ok(())
    }

    pub fn ticks(&self, override_ticks: Option<u64>) -> u64 {
        override_ticks.or(self.ticks).unwrap_or(120)
    }
}
