//! Demo gameplay components
//!
//! Plain data consumed by the systems in [`crate::systems`]. The registry
//! does not know about any of these; they exist to exercise the core.

use crate::ecs::Component;

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Position {
    pub x: f32,
    pub y: f32,
}

impl Component for Position {}

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Velocity {
    pub x: f32,
    pub y: f32,
}

impl Component for Velocity {}

/// Axis-aligned collision box, positioned relative to the entity's
/// [`Position`].
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BoxCollider {
    pub width: f32,
    pub height: f32,
    pub offset_x: f32,
    pub offset_y: f32,
}

impl BoxCollider {
    pub fn new(width: f32, height: f32) -> Self {
        Self {
            width,
            height,
            offset_x: 0.0,
            offset_y: 0.0,
        }
    }
}

impl Component for BoxCollider {}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Health {
    pub current: i32,
    pub max: i32,
}

impl Health {
    pub fn full(max: i32) -> Self {
        Self { current: max, max }
    }
}

impl Component for Health {}

/// Remaining lifetime in seconds; the lifetime system despawns the entity
/// when it reaches zero.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Lifetime {
    pub remaining: f32,
}

impl Component for Lifetime {}
