//! Physics domain: the per-tick raycast resolver.
//!
//! Each axis is resolved separately: horizontal rays clamp X motion, then
//! gravity or vertical acceleration is applied and vertical rays clamp Y motion.

use bevy::prelude::*;

use super::body::{BodyId, CollisionEvent, KinematicBody, PhysicsEvent};
use super::layers::GameLayer;
use super::terrain::{RayHit, Terrain, angle_from_right};
use crate::core::{CollisionKind, Horizontal, Side, Vertical, world_down};

/// Motion published by the platform a body is riding.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct PlatformMotion {
    pub velocity: Vec2,
    pub move_distance: Vec2,
}

/// Everything a body needs from the world for one step.
pub struct StepEnv<'a> {
    pub terrain: &'a Terrain,
    pub fixed_dt: f32,
    pub self_id: BodyId,
    pub platform: Option<PlatformMotion>,
    pub on_camera: bool,
}

/// Position along a ray fan, in [0, 1].
fn fan_spacing(index: u32, count: u32) -> f32 {
    if count <= 1 {
        0.5
    } else {
        index as f32 / (count - 1) as f32
    }
}

impl KinematicBody {
    /// Advances the body by one fixed tick.
    pub fn step(&mut self, env: &StepEnv) {
        let skip = self.settings.raycasts.skip_when_off_camera && !env.on_camera;
        if !skip {
            self.translate_for_platform(env.platform);

            if self.properties.acceleration.x.abs() > 0.0 && self.properties.velocity_cap.x.abs() > 0.0
            {
                self.apply_acceleration_x();
            }
            self.apply_deceleration_x();

            let dx = (self.properties.velocity.x + self.properties.external_velocity.x) * env.fixed_dt;
            self.check_horizontal_collisions(dx, env);
            self.apply_horizontal_velocity(env.fixed_dt);

            if self.snap_to_floor_pending {
                self.anchor_to_floor(env.terrain, env.self_id);
                self.snap_to_floor_pending = false;
            } else {
                if self.settings.gravity.uses_gravity && !self.gravity_frozen_for_frame {
                    self.apply_gravity();
                } else {
                    if self.properties.acceleration.y.abs() > 0.0
                        && self.properties.velocity_cap.y.abs() > 0.0
                    {
                        self.apply_acceleration_y();
                    }
                    self.apply_deceleration_y();
                }

                let dy = (self.properties.velocity.y + self.properties.external_velocity.y) * env.fixed_dt;
                self.check_vertical_collisions(dy, env);
                if self.settings.raycasts.detailed_slope_collisions {
                    self.check_for_slopes_in_other_direction(env);
                }
                self.apply_vertical_velocity(env.fixed_dt);
            }
        }

        self.properties.external_velocity = Vec2::ZERO;
        self.single_frame_velocity = Vec2::ZERO;
        self.x_frozen_for_frame = false;
        self.y_frozen_for_frame = false;
        self.gravity_frozen_for_frame = false;
    }

    fn translate_for_platform(&mut self, platform: Option<PlatformMotion>) {
        let Some(platform) = platform else {
            return;
        };
        // X goes through external velocity so walls still block; Y is a direct
        // translation so gravity never sees it.
        self.properties.external_velocity.x = platform.velocity.x;
        self.properties.position.y += platform.move_distance.y;
    }

    fn apply_acceleration_x(&mut self) {
        let cap = self.properties.velocity_cap.x;
        let mut velocity = self.properties.velocity.x + self.properties.acceleration.x;
        if cap > 0.0 && velocity > cap {
            velocity = cap;
        } else if cap < 0.0 && velocity < cap {
            velocity = cap;
        }
        self.properties.velocity.x = velocity;
    }

    fn apply_acceleration_y(&mut self) {
        let cap = self.properties.velocity_cap.y;
        let mut velocity = self.properties.velocity.y + self.properties.acceleration.y;
        if cap > 0.0 && velocity > cap {
            velocity = cap;
        } else if cap < 0.0 && velocity < cap {
            velocity = cap;
        }
        self.properties.velocity.y = velocity;
    }

    fn apply_deceleration_x(&mut self) {
        self.properties.velocity.x =
            decelerate(self.properties.velocity.x, self.properties.deceleration.x);
    }

    fn apply_deceleration_y(&mut self) {
        self.properties.velocity.y =
            decelerate(self.properties.velocity.y, self.properties.deceleration.y);
    }

    fn apply_gravity(&mut self) {
        let gravity = &self.settings.gravity;
        let pull = gravity.gravity * self.gravity_scale;
        if self.single_frame_velocity.y.abs() > 0.0 {
            self.properties.velocity.y = self.single_frame_velocity.y - pull;
        } else if self.gravity_scale >= 0.0 {
            self.properties.velocity.y = (self.properties.velocity.y - pull).max(-gravity.max_fall_speed);
        } else {
            self.properties.velocity.y = (self.properties.velocity.y - pull).min(gravity.max_fall_speed);
        }

        let velocity = self.properties.velocity.y;
        if (velocity < 0.0 && self.gravity_scale > 0.0 && !self.properties.is_grounded)
            || (velocity > 0.0 && self.gravity_scale < 0.0 && !self.properties.is_against_ceiling)
        {
            self.properties.is_falling = true;
        }
    }

    fn apply_horizontal_velocity(&mut self, fixed_dt: f32) {
        if !self.settings.freeze_movement_x && !self.x_frozen_for_frame {
            self.properties.position.x +=
                (self.properties.velocity.x + self.properties.external_velocity.x) * fixed_dt;
        }
    }

    fn apply_vertical_velocity(&mut self, fixed_dt: f32) {
        if !self.settings.freeze_movement_y && !self.y_frozen_for_frame {
            self.properties.position.y +=
                (self.properties.velocity.y + self.properties.external_velocity.y) * fixed_dt;
        }
    }

    // -------------------------------------------------------------------------
    // Horizontal
    // -------------------------------------------------------------------------

    fn check_horizontal_collisions(&mut self, displacement: f32, env: &StepEnv) {
        self.properties.is_against_left_wall = false;
        self.properties.is_against_right_wall = false;

        if displacement == 0.0 {
            self.check_for_wall_contact(Horizontal::Left, env);
            self.check_for_wall_contact(Horizontal::Right, env);
            return;
        }

        let rect = self.aabb();
        // While carried, the lowest ray sits above the edge of the platform being ridden.
        let lift = if env.platform.is_some() {
            self.settings.raycasts.horizontal_edge_buffer
        } else {
            0.0
        };
        let start = Vec2::new(rect.center().x, rect.min.y + lift);
        let end = Vec2::new(rect.center().x, rect.max.y);
        let count = self.settings.raycasts.horizontal;
        let length = rect.width() * 0.5 + displacement.abs();
        let direction = if displacement > 0.0 {
            Horizontal::Right
        } else {
            Horizontal::Left
        };
        let nudge = !self.settings.sticks_to_platforms && count > 3;

        let mut previous_hit: Option<Vec2> = None;
        for i in 0..count {
            // The second and second-to-last rays sit just inside the first and
            // last, so a flat floor edge never reads as a wall.
            let t = if nudge && i == 1 {
                0.005
            } else if nudge && i == count - 2 {
                1.0 - 0.005
            } else {
                fan_spacing(i, count)
            };
            let origin = start.lerp(end, t);
            let Some(hit) = env.terrain.raycast(
                origin,
                Vec2::new(direction.sign(), 0.0),
                length,
                self.masks.solid,
                Some(env.self_id),
            ) else {
                continue;
            };

            if let Some(previous) = previous_hit
                && self.is_wall_angle(hit.point - previous)
            {
                self.block_horizontally(direction, &hit, rect.width(), displacement);
                break;
            }
            previous_hit = Some(hit.point);
        }
    }

    fn is_wall_angle(&self, between_hits: Vec2) -> bool {
        (angle_from_right(between_hits) - 90.0).abs() < self.settings.raycasts.slope_angle_tolerance
    }

    fn block_horizontally(
        &mut self,
        direction: Horizontal,
        hit: &RayHit,
        width: f32,
        displacement: f32,
    ) {
        match direction {
            Horizontal::Right => self.properties.is_against_right_wall = true,
            Horizontal::Left => self.properties.is_against_left_wall = true,
        }
        if self.settings.sticks_to_platforms {
            self.riding = hit.owner;
        }

        self.properties.position.x += direction.sign() * (hit.distance - width * 0.5);
        self.properties.velocity.x = 0.0;
        self.properties.external_velocity.x = 0.0;

        if direction == Horizontal::Left && self.did_hit_left_wall_this_frame() && displacement < 0.0 {
            self.notify_of_collision(hit, Side::Left);
        } else if direction == Horizontal::Right
            && self.did_hit_right_wall_this_frame()
            && displacement > 0.0
        {
            self.notify_of_collision(hit, Side::Right);
        }
    }

    /// Casts one side with a tiny margin so wall flags stay accurate while standing still.
    fn check_for_wall_contact(&mut self, direction: Horizontal, env: &StepEnv) -> bool {
        let rect = self.aabb();
        let start = Vec2::new(rect.center().x, rect.min.y);
        let end = Vec2::new(rect.center().x, rect.max.y);
        let count = self.settings.raycasts.horizontal;
        let length = rect.width() * 0.5 + self.settings.raycasts.wall_contact_margin;

        let mut previous_hit: Option<Vec2> = None;
        for i in 0..count {
            let origin = start.lerp(end, fan_spacing(i, count));
            let Some(hit) = env.terrain.raycast(
                origin,
                Vec2::new(direction.sign(), 0.0),
                length,
                self.masks.solid,
                Some(env.self_id),
            ) else {
                continue;
            };
            if let Some(previous) = previous_hit
                && self.is_wall_angle(hit.point - previous)
            {
                match direction {
                    Horizontal::Right => self.properties.is_against_right_wall = true,
                    Horizontal::Left => self.properties.is_against_left_wall = true,
                }
                return true;
            }
            previous_hit = Some(hit.point);
        }
        false
    }

    /// One-shot horizontal snap onto the nearest wall in `direction`.
    pub fn snap_to_nearest_wall(&mut self, direction: Horizontal, terrain: &Terrain, fixed_dt: f32) {
        self.properties.is_against_left_wall = false;
        self.properties.is_against_right_wall = false;

        let rect = self.aabb();
        let buffer = self.settings.raycasts.wall_snap_buffer;
        let start = Vec2::new(rect.center().x, rect.min.y - buffer);
        let end = Vec2::new(rect.center().x, rect.max.y + buffer);
        let count = self.settings.raycasts.horizontal;
        let length = rect.width() * 0.5 + (direction.sign() * fixed_dt).abs();

        let mut previous_hit: Option<Vec2> = None;
        for i in 0..count {
            let origin = start.lerp(end, fan_spacing(i, count));
            let Some(hit) = terrain.raycast(
                origin,
                Vec2::new(direction.sign(), 0.0),
                length,
                self.masks.solid,
                None,
            ) else {
                continue;
            };
            if let Some(previous) = previous_hit
                && self.is_wall_angle(hit.point - previous)
            {
                match direction {
                    Horizontal::Right => self.properties.is_against_right_wall = true,
                    Horizontal::Left => self.properties.is_against_left_wall = true,
                }
                self.properties.position.x += direction.sign() * (hit.distance - rect.width() * 0.5);
                self.properties.velocity.x = 0.0;
                break;
            }
            previous_hit = Some(hit.point);
        }
    }

    // -------------------------------------------------------------------------
    // Vertical
    // -------------------------------------------------------------------------

    fn vertical_fan(&self) -> (Vec2, Vec2) {
        let rect = self.aabb();
        let buffer = self.settings.raycasts.vertical_edge_buffer;
        (
            Vec2::new(rect.min.x + buffer, rect.center().y),
            Vec2::new(rect.max.x - buffer, rect.center().y),
        )
    }

    /// Closest hit over a fan of `count` rays; ties keep the earliest ray.
    fn closest_vertical_hit(
        &self,
        env: &StepEnv,
        count: u32,
        direction: Vertical,
        length: f32,
        mask: avian2d::prelude::LayerMask,
    ) -> Option<RayHit> {
        let (start, end) = self.vertical_fan();
        let mut best: Option<RayHit> = None;
        for i in 0..count {
            let origin = start.lerp(end, fan_spacing(i, count));
            let Some(hit) = env.terrain.raycast(
                origin,
                Vec2::new(0.0, direction.sign()),
                length,
                mask,
                Some(env.self_id),
            ) else {
                continue;
            };
            if best.is_none_or(|b| hit.fraction < b.fraction) {
                best = Some(hit);
            }
        }
        best
    }

    fn check_vertical_collisions(&mut self, displacement: f32, env: &StepEnv) {
        if !self.settings.sticks_to_platforms {
            self.riding = None;
        }
        if displacement == 0.0 {
            return;
        }

        let rect = self.aabb();
        let direction = if displacement <= 0.0 {
            Vertical::Down
        } else {
            Vertical::Up
        };
        let resting = (self.properties.is_grounded && direction == Vertical::Down)
            || (self.properties.is_against_ceiling && direction == Vertical::Up);
        let length = rect.height() * 0.5
            + if resting {
                self.slope_detection_margin
            } else {
                displacement.abs()
            };
        let toward_floor = (direction == Vertical::Down && self.gravity_scale > 0.0)
            || (direction == Vertical::Up && self.gravity_scale <= 0.0);
        let mask = if toward_floor {
            self.masks.down
        } else {
            self.masks.solid
        };

        let mut best =
            self.closest_vertical_hit(env, self.settings.raycasts.vertical, direction, length, mask);

        // A body that walked off a one-way platform and drifted back under its
        // top must not pop back up onto it.
        if let Some(hit) = best
            && hit.layer == GameLayer::PassThroughBottom
            && let Some(platform) = env.terrain.get(hit.collider)
        {
            let bounds = platform.aabb();
            let clearance = self.settings.raycasts.one_way_clearance;
            if (self.gravity_scale > 0.0 && rect.min.y < bounds.max.y - clearance)
                || (self.gravity_scale <= 0.0 && rect.max.y > bounds.min.y + clearance)
            {
                best = None;
            }
        }

        if best.is_none() && self.settings.raycasts.redundant_vertical_collisions {
            let count = (self.settings.raycasts.vertical as f32 * 0.5).ceil() as u32;
            best = self.closest_vertical_hit(env, count, direction, length, self.masks.solid);
        }

        let Some(hit) = best else {
            self.properties.is_against_ceiling = false;
            self.properties.is_grounded = false;
            return;
        };

        self.properties.velocity.y = 0.0;
        self.properties.external_velocity.y = 0.0;
        let correction = hit.distance - rect.height() * 0.5;

        match direction {
            Vertical::Down => {
                self.properties.is_grounded = true;
                self.snap_to_floor_pending = false;
                self.properties.is_falling = false;
                self.properties.is_against_ceiling = false;
                self.properties.position.y -= correction;
                self.riding = hit.owner;
            }
            Vertical::Up => {
                if self.settings.sticks_to_platforms {
                    self.riding = hit.owner;
                }
                self.properties.is_against_ceiling = true;
                self.properties.is_falling = self.gravity_scale > 0.0;
                self.properties.position.y += correction;
            }
        }

        if self.did_land_this_frame() {
            let side = if self.gravity_scale >= 0.0 {
                Side::Bottom
            } else {
                Side::Top
            };
            self.notify_of_collision(&hit, side);
        }
        if self.did_hit_ceiling_this_frame() {
            let side = if self.gravity_scale >= 0.0 {
                Side::Top
            } else {
                Side::Bottom
            };
            self.notify_of_collision(&hit, side);
        }
    }

    /// Nudges the body back out of a slope it was pushed into from the other side.
    fn check_for_slopes_in_other_direction(&mut self, env: &StepEnv) {
        let total = self.properties.velocity.y + self.properties.external_velocity.y;
        if total == 0.0 {
            return;
        }
        let direction = if total <= 0.0 {
            Vertical::Up
        } else {
            Vertical::Down
        };
        let length = self.aabb().height() * 0.5 + self.slope_detection_margin;
        let Some(hit) = self.closest_vertical_hit(
            env,
            self.settings.raycasts.vertical,
            direction,
            length,
            self.masks.solid,
        ) else {
            return;
        };

        let correction = hit.distance - self.aabb().height() * 0.5;
        match direction {
            Vertical::Down => {
                let candidate = self.properties.position.y - correction;
                if self.properties.position.y < candidate {
                    self.properties.position.y = candidate;
                }
            }
            Vertical::Up => {
                let candidate = self.properties.position.y + correction;
                if self.properties.position.y > candidate {
                    self.properties.position.y = candidate;
                }
            }
        }
    }

    /// One-shot snap onto the nearest surface in the gravity direction.
    pub fn anchor_to_floor(&mut self, terrain: &Terrain, self_id: BodyId) {
        let rect = self.aabb();
        let down = world_down(self.gravity_scale);
        let start = Vec2::new(rect.min.x, rect.center().y);
        let end = Vec2::new(rect.max.x, rect.center().y);
        let count = self.settings.raycasts.vertical;
        let length = rect.height() * 0.5 + 200.0;
        let mask = self.masks.down;

        let mut best: Option<RayHit> = None;
        for i in 0..count {
            let origin = start.lerp(end, fan_spacing(i, count));
            if let Some(hit) =
                terrain.raycast(origin, Vec2::new(0.0, down.sign()), length, mask, Some(self_id))
                && best.is_none_or(|b| hit.fraction < b.fraction)
            {
                best = Some(hit);
            }
        }

        if let Some(hit) = best {
            match down {
                Vertical::Down => self.properties.is_grounded = true,
                Vertical::Up => self.properties.is_against_ceiling = true,
            }
            self.properties.position.y += down.sign() * (hit.distance - rect.height() * 0.5);
            self.snap_to_floor_pending = false;
        }
    }

    fn notify_of_collision(&mut self, hit: &RayHit, side: Side) {
        self.push_event(PhysicsEvent::Collision(CollisionEvent {
            collider: Some(hit.collider),
            body: hit.owner,
            layer: hit.layer,
            side,
            kind: CollisionKind::Enter,
        }));
    }
}

fn decelerate(velocity: f32, deceleration: f32) -> f32 {
    if velocity > 0.0 {
        (velocity - deceleration).max(0.0)
    } else if velocity < 0.0 {
        (velocity + deceleration).min(0.0)
    } else {
        0.0
    }
}
