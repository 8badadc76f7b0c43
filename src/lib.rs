//! RexEngine: a deterministic 2D platformer character core.
//!
//! `physics` steps raycast-resolved kinematic bodies against terrain,
//! `controller` arbitrates movement states on top of one body, `combat` gates
//! attacks against those states, and `actor` ties the three together with
//! health and damage. Everything below the plugins is plain Rust driven by
//! `PhysicsWorld::step`, so scenarios can be ticked without an `App`.

pub mod actor;
pub mod ai;
pub mod animation;
pub mod combat;
pub mod config;
pub mod controller;
pub mod core;
pub mod physics;

use bevy::prelude::*;

pub use actor::ActorPlugin;
pub use controller::ControllerPlugin;
pub use physics::PhysicsPlugin;

/// Physics, controller input and actor plugins in one.
pub struct RexEnginePlugin;

impl Plugin for RexEnginePlugin {
    fn build(&self, app: &mut App) {
        app.add_plugins((PhysicsPlugin, ControllerPlugin, ActorPlugin));
    }
}
