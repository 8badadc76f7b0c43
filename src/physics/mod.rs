//! Physics domain: raycast-resolved kinematic bodies, terrain, moving platforms
//! and the fixed-step scheduler.
//!
//! The simulation types are plain Rust and can be driven without an `App`;
//! `PhysicsPlugin` only wires them onto Bevy's fixed schedule.

mod body;
mod helpers;
mod layers;
mod platform;
mod resolve;
mod scheduler;
mod systems;
mod terrain;

#[cfg(test)]
mod tests;

use bevy::prelude::*;

pub use body::{
    BodyId, BodyProperties, BodySettings, CollisionEvent, GravitySettings, KinematicBody,
    PhysicsEvent, RaycastSettings,
};
pub use helpers::{
    LedgeInfo, detect_ledge_on_wall, drop_through_floor_below, is_next_to_ledge,
    is_under_overhang, surface_collider_with_layer,
};
pub use layers::{CollisionMasks, GameLayer, mask_contains, mask_of};
pub use platform::{MovingPlatform, MovingPlatformSettings};
pub use resolve::{PlatformMotion, StepEnv};
pub use scheduler::{PhysicsScheduler, PhysicsSettings, PhysicsWorld, UpdateType};
pub use systems::PhysicsBody;
pub use terrain::{Aabb, ColliderId, RayHit, Shape, Terrain, TerrainCollider, angle_from_right};

/// Ordering of the fixed-step simulation.
#[derive(SystemSet, Debug, Clone, PartialEq, Eq, Hash)]
pub enum SimulationSet {
    /// Platforms, then bodies.
    Physics,
    /// Contact events and actor-to-actor overlaps.
    Contacts,
    /// Movement controllers and attacks.
    Controllers,
}

pub struct PhysicsPlugin;

impl Plugin for PhysicsPlugin {
    fn build(&self, app: &mut App) {
        let settings = PhysicsSettings::default();
        app.insert_resource(Time::<Fixed>::from_seconds(settings.fixed_delta_time as f64))
            .insert_resource(settings)
            .configure_sets(
                FixedUpdate,
                (
                    SimulationSet::Physics,
                    SimulationSet::Contacts,
                    SimulationSet::Controllers,
                )
                    .chain(),
            )
            .add_systems(
                FixedUpdate,
                systems::step_physics
                    .in_set(SimulationSet::Physics)
                    .run_if(resource_exists::<PhysicsWorld>),
            )
            .add_systems(
                Update,
                (
                    systems::update_camera_view,
                    systems::step_physics_per_frame,
                    systems::sync_transforms,
                )
                    .chain()
                    .run_if(resource_exists::<PhysicsWorld>),
            );
    }
}
