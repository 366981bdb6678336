//! Demo gameplay systems built on the registry core

pub mod collision;
pub mod damage;
pub mod lifetime;
pub mod movement;

pub use collision::CollisionSystem;
pub use damage::DamageSystem;
pub use lifetime::LifetimeSystem;
pub use movement::MovementSystem;
