//! Physics domain: the static and platform-owned collider set that bodies raycast against.

use avian2d::prelude::LayerMask;
use bevy::prelude::*;

use super::body::BodyId;
use super::layers::{GameLayer, mask_contains};
use crate::core::Horizontal;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ColliderId(pub u32);

/// Axis-aligned bounds.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct Aabb {
    pub min: Vec2,
    pub max: Vec2,
}

impl Aabb {
    pub fn from_center_size(center: Vec2, size: Vec2) -> Self {
        let half = size * 0.5;
        Self {
            min: center - half,
            max: center + half,
        }
    }

    pub fn center(&self) -> Vec2 {
        (self.min + self.max) * 0.5
    }

    pub fn size(&self) -> Vec2 {
        self.max - self.min
    }

    pub fn width(&self) -> f32 {
        self.max.x - self.min.x
    }

    pub fn height(&self) -> f32 {
        self.max.y - self.min.y
    }

    /// Strict overlap; boxes that only share an edge do not intersect.
    pub fn intersects(&self, other: &Aabb) -> bool {
        self.min.x < other.max.x
            && self.max.x > other.min.x
            && self.min.y < other.max.y
            && self.max.y > other.min.y
    }

    pub fn contains(&self, point: Vec2) -> bool {
        point.x >= self.min.x && point.x <= self.max.x && point.y >= self.min.y && point.y <= self.max.y
    }

    pub fn expanded(&self, margin: f32) -> Self {
        Self {
            min: self.min - Vec2::splat(margin),
            max: self.max + Vec2::splat(margin),
        }
    }
}

/// Collider geometry. Slopes are right triangles filling the lower half of
/// their bounds, rising toward `rising`.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Shape {
    Box { half_extents: Vec2 },
    Slope { half_extents: Vec2, rising: Horizontal },
}

impl Shape {
    pub fn half_extents(&self) -> Vec2 {
        match *self {
            Shape::Box { half_extents } | Shape::Slope { half_extents, .. } => half_extents,
        }
    }

    /// Counter-clockwise vertices around `center`.
    fn vertices(&self, center: Vec2) -> ([Vec2; 4], usize) {
        let half = self.half_extents();
        let (min, max) = (center - half, center + half);
        match *self {
            Shape::Box { .. } => (
                [
                    min,
                    Vec2::new(max.x, min.y),
                    max,
                    Vec2::new(min.x, max.y),
                ],
                4,
            ),
            Shape::Slope {
                rising: Horizontal::Right,
                ..
            } => ([min, Vec2::new(max.x, min.y), max, Vec2::ZERO], 3),
            Shape::Slope {
                rising: Horizontal::Left,
                ..
            } => (
                [min, Vec2::new(max.x, min.y), Vec2::new(min.x, max.y), Vec2::ZERO],
                3,
            ),
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub struct TerrainCollider {
    pub id: ColliderId,
    pub center: Vec2,
    pub shape: Shape,
    pub layer: GameLayer,
    /// Body this collider moves with, for moving platforms.
    pub owner: Option<BodyId>,
    pub enabled: bool,
}

impl TerrainCollider {
    pub fn aabb(&self) -> Aabb {
        Aabb::from_center_size(self.center, self.shape.half_extents() * 2.0)
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct RayHit {
    pub collider: ColliderId,
    pub layer: GameLayer,
    pub owner: Option<BodyId>,
    pub point: Vec2,
    pub distance: f32,
    /// Distance as a fraction of the ray length, in (0, 1].
    pub fraction: f32,
}

#[derive(Debug, Clone, Default)]
pub struct Terrain {
    colliders: Vec<TerrainCollider>,
    next_id: u32,
}

impl Terrain {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn add(&mut self, center: Vec2, shape: Shape, layer: GameLayer) -> ColliderId {
        self.insert(center, shape, layer, None)
    }

    pub fn add_box(&mut self, center: Vec2, size: Vec2, layer: GameLayer) -> ColliderId {
        self.add(
            center,
            Shape::Box {
                half_extents: size * 0.5,
            },
            layer,
        )
    }

    pub fn add_owned(
        &mut self,
        center: Vec2,
        shape: Shape,
        layer: GameLayer,
        owner: BodyId,
    ) -> ColliderId {
        self.insert(center, shape, layer, Some(owner))
    }

    fn insert(
        &mut self,
        center: Vec2,
        shape: Shape,
        layer: GameLayer,
        owner: Option<BodyId>,
    ) -> ColliderId {
        let id = ColliderId(self.next_id);
        self.next_id += 1;
        self.colliders.push(TerrainCollider {
            id,
            center,
            shape,
            layer,
            owner,
            enabled: true,
        });
        id
    }

    pub fn remove(&mut self, id: ColliderId) -> Option<TerrainCollider> {
        let index = self.colliders.iter().position(|c| c.id == id)?;
        Some(self.colliders.remove(index))
    }

    pub fn get(&self, id: ColliderId) -> Option<&TerrainCollider> {
        self.colliders.iter().find(|c| c.id == id)
    }

    pub fn get_mut(&mut self, id: ColliderId) -> Option<&mut TerrainCollider> {
        self.colliders.iter_mut().find(|c| c.id == id)
    }

    pub fn set_center(&mut self, id: ColliderId, center: Vec2) {
        if let Some(collider) = self.get_mut(id) {
            collider.center = center;
        }
    }

    pub fn iter(&self) -> impl Iterator<Item = &TerrainCollider> {
        self.colliders.iter()
    }

    pub fn len(&self) -> usize {
        self.colliders.len()
    }

    pub fn is_empty(&self) -> bool {
        self.colliders.is_empty()
    }

    /// Nearest hit along `direction` within `length`, filtered by `mask`.
    ///
    /// A ray starting inside or on the boundary of a collider does not hit it.
    /// Equal distances resolve to the collider added first.
    pub fn raycast(
        &self,
        origin: Vec2,
        direction: Vec2,
        length: f32,
        mask: LayerMask,
        ignore_owner: Option<BodyId>,
    ) -> Option<RayHit> {
        let direction = direction.normalize_or_zero();
        if direction == Vec2::ZERO || length <= 0.0 {
            return None;
        }

        let mut best: Option<RayHit> = None;
        for collider in &self.colliders {
            if !collider.enabled || !mask_contains(mask, collider.layer) {
                continue;
            }
            if ignore_owner.is_some() && collider.owner == ignore_owner {
                continue;
            }
            let (vertices, count) = collider.shape.vertices(collider.center);
            let Some(distance) = ray_convex(origin, direction, length, &vertices[..count]) else {
                continue;
            };
            match best {
                Some(ref hit) if distance >= hit.distance => {}
                _ => {
                    best = Some(RayHit {
                        collider: collider.id,
                        layer: collider.layer,
                        owner: collider.owner,
                        point: origin + direction * distance,
                        distance,
                        fraction: distance / length,
                    })
                }
            }
        }
        best
    }

    /// Enabled colliders in `mask` whose bounds overlap `area`.
    pub fn overlapping<'a>(
        &'a self,
        area: Aabb,
        mask: LayerMask,
    ) -> impl Iterator<Item = &'a TerrainCollider> + 'a {
        self.colliders.iter().filter(move |c| {
            c.enabled && mask_contains(mask, c.layer) && c.aabb().intersects(&area)
        })
    }
}

/// Entry distance of a ray into a convex counter-clockwise polygon.
fn ray_convex(origin: Vec2, direction: Vec2, length: f32, vertices: &[Vec2]) -> Option<f32> {
    let mut t_enter = f32::NEG_INFINITY;
    let mut t_exit = f32::INFINITY;

    for (i, &a) in vertices.iter().enumerate() {
        let b = vertices[(i + 1) % vertices.len()];
        let edge = b - a;
        let outward = Vec2::new(edge.y, -edge.x);
        let offset = outward.dot(origin - a);
        let approach = outward.dot(direction);

        if approach.abs() <= f32::EPSILON {
            if offset > 0.0 {
                return None;
            }
            continue;
        }

        let t = -offset / approach;
        if approach < 0.0 {
            t_enter = t_enter.max(t);
        } else {
            t_exit = t_exit.min(t);
        }
        if t_enter > t_exit {
            return None;
        }
    }

    if t_enter <= 0.0 || t_enter > length {
        return None;
    }
    Some(t_enter)
}

/// Unsigned angle in degrees between `v` and the world right axis.
pub fn angle_from_right(v: Vec2) -> f32 {
    if v.length_squared() <= f32::EPSILON * f32::EPSILON {
        return 0.0;
    }
    v.normalize().dot(Vec2::X).clamp(-1.0, 1.0).acos().to_degrees()
}
