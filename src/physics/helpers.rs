//! Physics domain: one-off raycast queries used by movement states.

use bevy::prelude::*;

use super::body::KinematicBody;
use super::layers::{GameLayer, mask_of};
use super::terrain::{ColliderId, Terrain};
use crate::core::{Horizontal, Vertical, gravity_sign};

#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct LedgeInfo {
    pub did_hit: bool,
    pub hit_y: f32,
}

/// Collider center with the Y offset mirrored for the current gravity.
fn cast_origin(body: &KinematicBody) -> Vec2 {
    let position = body.position();
    Vec2::new(
        position.x,
        position.y + body.offset().y * gravity_sign(body.gravity_scale()),
    )
}

fn vertical_dir(direction: Vertical) -> Vec2 {
    Vec2::new(0.0, direction.sign())
}

/// True when nothing is underfoot just past the body's edge on `direction`.
pub fn is_next_to_ledge(
    body: &KinematicBody,
    terrain: &Terrain,
    direction: Horizontal,
    vertical: Vertical,
) -> bool {
    let mask = mask_of(&[GameLayer::Terrain, GameLayer::PassThroughBottom]);
    let length = body.size().y * 0.5 + 0.1;
    let origin = cast_origin(body) + Vec2::new(direction.sign() * body.size().x * 0.5, 0.0);
    terrain
        .raycast(origin, vertical_dir(vertical), length, mask, None)
        .is_none()
}

/// Casts along a wall one body-width out to find where the wall ends.
///
/// `vertical` is the cast direction; the ray starts `offset` beyond the body
/// on the opposite end so it sweeps the whole height.
pub fn detect_ledge_on_wall(
    body: &KinematicBody,
    terrain: &Terrain,
    direction: Horizontal,
    vertical: Vertical,
    velocity_to_check: f32,
    offset: f32,
) -> LedgeInfo {
    let mask = mask_of(&[GameLayer::Terrain]);
    let size = body.size();
    let rect = body.aabb();
    let length = size.y + velocity_to_check.abs() + offset;
    let x = body.position().x + direction.sign() * size.x;
    let y = match vertical {
        Vertical::Up => rect.min.y - offset,
        Vertical::Down => rect.max.y + offset,
    };

    match terrain.raycast(Vec2::new(x, y), vertical_dir(vertical), length, mask, None) {
        Some(hit) => LedgeInfo {
            did_hit: true,
            hit_y: hit.point.y,
        },
        None => LedgeInfo::default(),
    }
}

/// First collider of `layer` directly beneath (or above) the body, probing
/// its left edge, center and right edge.
pub fn surface_collider_with_layer(
    body: &KinematicBody,
    terrain: &Terrain,
    layer: GameLayer,
    vertical: Vertical,
) -> Option<ColliderId> {
    let mask = mask_of(&[layer]);
    let length = body.size().y * 0.5 + 0.25;
    let spacing = body.size().x * 0.5;
    let origin = cast_origin(body);

    (0..3).find_map(|i| {
        let ray_origin = origin + Vec2::new(-spacing + spacing * i as f32, 0.0);
        terrain
            .raycast(ray_origin, vertical_dir(vertical), length, mask, None)
            .filter(|hit| hit.layer == layer)
            .map(|hit| hit.collider)
    })
}

/// True when solid terrain sits within reach of a collider of `size` standing at `position`.
pub fn is_under_overhang(terrain: &Terrain, vertical: Vertical, size: Vec2, position: Vec2) -> bool {
    let mask = mask_of(&[GameLayer::Terrain]);
    // Pulled in from the sides so crouching next to an overhang doesn't count.
    let side_buffer = 0.025;
    let length = size.y * 0.5 + 0.25;
    let spacing = size.x * 0.5 - side_buffer;

    (0..3).any(|i| {
        let origin = position + Vec2::new(-spacing + spacing * i as f32, 0.0);
        terrain
            .raycast(origin, vertical_dir(vertical), length, mask, None)
            .is_some()
    })
}

/// True when the body is standing on a one-way platform.
pub fn drop_through_floor_below(body: &KinematicBody, terrain: &Terrain, vertical: Vertical) -> bool {
    let mask = mask_of(&[GameLayer::PassThroughBottom]);
    let length = body.size().y * 0.5 + 0.05;
    let spacing = body.size().x * 0.5;
    let origin = cast_origin(body);

    (0..3).any(|i| {
        let ray_origin = origin + Vec2::new(-spacing + spacing * i as f32, 0.0);
        terrain
            .raycast(ray_origin, vertical_dir(vertical), length, mask, None)
            .is_some()
    })
}
