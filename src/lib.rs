pub mod components;
pub mod ecs;
pub mod error;
pub mod events;
pub mod scene;
pub mod scheduler;
pub mod systems;

pub use ecs::{Component, ComponentTypes, Entity, Registry, Signature, System, SystemContext};
pub use error::EcsError;
pub use events::{EventBus, EventPayload};
pub use scene::{Scene, SceneLoader};
pub use scheduler::{Scheduler, TickStats};
