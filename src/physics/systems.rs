//! Physics domain: Bevy systems driving the world on the fixed schedule.

use bevy::prelude::*;

use super::body::BodyId;
use super::scheduler::{PhysicsWorld, UpdateType};
use super::terrain::Aabb;

/// Links an entity to its simulated body.
#[derive(Component, Debug, Clone, Copy, PartialEq, Eq)]
pub struct PhysicsBody(pub BodyId);

pub(crate) fn step_physics(mut world: ResMut<PhysicsWorld>) {
    if world.scheduler().settings().update_type == UpdateType::Update {
        return;
    }
    world.step();
}

pub(crate) fn step_physics_per_frame(mut world: ResMut<PhysicsWorld>) {
    if world.scheduler().settings().update_type != UpdateType::Update {
        return;
    }
    world.step();
}

pub(crate) fn sync_transforms(
    world: Res<PhysicsWorld>,
    time: Res<Time<Fixed>>,
    mut query: Query<(&PhysicsBody, &mut Transform)>,
) {
    let alpha = time.overstep_fraction();
    for (body, mut transform) in &mut query {
        if let Some(position) = world.render_position(body.0, alpha) {
            transform.translation.x = position.x;
            transform.translation.y = position.y;
        }
    }
}

/// Mirrors the camera's visible area into the scheduler for off-camera culling.
pub(crate) fn update_camera_view(
    mut world: ResMut<PhysicsWorld>,
    cameras: Query<(&Transform, &Projection), With<Camera2d>>,
    windows: Query<&Window>,
) {
    let Ok((transform, projection)) = cameras.single() else {
        return;
    };
    let Ok(window) = windows.single() else {
        return;
    };
    let scale = match projection {
        Projection::Orthographic(ortho) => ortho.scale,
        _ => 1.0,
    };
    let size = Vec2::new(window.width(), window.height()) * scale;
    let view = Aabb::from_center_size(transform.translation.truncate(), size);
    world.scheduler_mut().set_camera_view(Some(view));
}
