//! Signature-based entity/component registry
//!
//! Entities are opaque ids; their state is the set of components stored in
//! dense per-type pools plus a signature bitset. Systems declare a required
//! signature and receive the matching entity list from the registry at each
//! flush.

pub mod component;
pub mod entity;
pub mod pool;
pub mod registry;
pub mod system;

pub use component::{Component, ComponentTypeId, ComponentTypes, Signature, MAX_COMPONENT_TYPES};
pub use entity::{Entity, EntityState};
pub use pool::{AnyPool, Pool};
pub use registry::Registry;
pub use system::{System, SystemContext, SystemCore};
