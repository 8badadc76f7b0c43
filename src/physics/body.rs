//! Physics domain: the kinematic box body, its settings and its read-only query surface.
//!
//! The stepping algorithm itself lives in `resolve.rs`.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::layers::{CollisionMasks, GameLayer};
use super::terrain::{Aabb, ColliderId};
use crate::config::{ConfigError, vec2_serde};
use crate::core::{CollisionKind, Side, gravity_sign};

/// Handle to a body registered with a `PhysicsWorld`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Default)]
pub struct BodyId(pub u32);

/// Per-tick kinematic state. Flags are outputs of the resolver.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct BodyProperties {
    pub position: Vec2,
    pub velocity: Vec2,
    pub external_velocity: Vec2,
    pub velocity_cap: Vec2,
    pub acceleration: Vec2,
    pub deceleration: Vec2,
    pub is_grounded: bool,
    pub is_against_ceiling: bool,
    pub is_against_left_wall: bool,
    pub is_against_right_wall: bool,
    pub is_falling: bool,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct GravitySettings {
    /// Velocity removed per tick; heavier bodies fall faster.
    pub gravity: f32,
    pub max_fall_speed: f32,
    pub uses_gravity: bool,
}

impl Default for GravitySettings {
    fn default() -> Self {
        Self {
            gravity: 1.0,
            max_fall_speed: 15.0,
            uses_gravity: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct RaycastSettings {
    pub horizontal: u32,
    pub vertical: u32,
    pub detailed_slope_collisions: bool,
    pub redundant_vertical_collisions: bool,
    pub skip_when_off_camera: bool,
    /// Hits whose surface is within this many degrees of vertical count as walls.
    pub slope_angle_tolerance: f32,
    pub vertical_edge_buffer: f32,
    /// Lift of the lowest horizontal ray while a platform carries the body.
    pub horizontal_edge_buffer: f32,
    pub wall_contact_margin: f32,
    pub wall_snap_buffer: f32,
    /// Depth a body may sink below a one-way platform's top before it stops landing on it.
    pub one_way_clearance: f32,
}

impl Default for RaycastSettings {
    fn default() -> Self {
        Self {
            horizontal: 7,
            vertical: 5,
            detailed_slope_collisions: false,
            redundant_vertical_collisions: false,
            skip_when_off_camera: false,
            slope_angle_tolerance: 10.0,
            vertical_edge_buffer: 0.025,
            horizontal_edge_buffer: 0.05,
            wall_contact_margin: 0.001,
            wall_snap_buffer: 0.25,
            one_way_clearance: 0.1,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BodySettings {
    #[serde(with = "vec2_serde")]
    pub size: Vec2,
    #[serde(with = "vec2_serde")]
    pub offset: Vec2,
    pub gravity: GravitySettings,
    pub raycasts: RaycastSettings,
    pub is_moving_platform: bool,
    pub sticks_to_platforms: bool,
    pub freeze_movement_x: bool,
    pub freeze_movement_y: bool,
    pub snap_to_floor_on_start: bool,
    pub ignores_terrain: bool,
    /// Players also collide with level boundaries.
    pub collides_with_boundaries: bool,
}

impl Default for BodySettings {
    fn default() -> Self {
        Self {
            size: Vec2::ONE,
            offset: Vec2::ZERO,
            gravity: GravitySettings::default(),
            raycasts: RaycastSettings::default(),
            is_moving_platform: false,
            sticks_to_platforms: false,
            freeze_movement_x: false,
            freeze_movement_y: false,
            snap_to_floor_on_start: false,
            ignores_terrain: false,
            collides_with_boundaries: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub struct CollisionEvent {
    /// Terrain collider that was hit, if the contact came from a raycast.
    pub collider: Option<ColliderId>,
    /// Body on the other side of the contact, if any.
    pub body: Option<BodyId>,
    pub layer: GameLayer,
    pub side: Side,
    pub kind: CollisionKind,
}

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum PhysicsEvent {
    Collision(CollisionEvent),
    GravityScaleChanged(f32),
}

#[derive(Debug, Clone)]
pub struct KinematicBody {
    pub(crate) settings: BodySettings,
    pub(crate) size: Vec2,
    pub(crate) offset: Vec2,
    pub(crate) properties: BodyProperties,
    pub(crate) previous: BodyProperties,
    pub(crate) gravity_scale: f32,
    forced_gravity_scale: Option<f32>,
    pub(crate) masks: CollisionMasks,
    pub(crate) single_frame_velocity: Vec2,
    pub(crate) x_frozen_for_frame: bool,
    pub(crate) y_frozen_for_frame: bool,
    pub(crate) gravity_frozen_for_frame: bool,
    pub(crate) riding: Option<BodyId>,
    pub(crate) is_enabled: bool,
    pub(crate) snap_to_floor_pending: bool,
    pub(crate) slope_detection_margin: f32,
    pub(crate) events: Vec<PhysicsEvent>,
}

impl KinematicBody {
    pub fn new(settings: BodySettings, position: Vec2) -> Result<Self, ConfigError> {
        crate::config::validate_body(&settings)?;

        let mut masks = CollisionMasks::default();
        if settings.collides_with_boundaries {
            masks.add(GameLayer::Boundaries);
        }
        if settings.ignores_terrain {
            masks.remove(GameLayer::Terrain);
        }

        let properties = BodyProperties {
            position,
            ..default()
        };

        Ok(Self {
            size: settings.size,
            offset: settings.offset,
            slope_detection_margin: settings.size.y * 0.5,
            snap_to_floor_pending: settings.snap_to_floor_on_start,
            settings,
            properties,
            previous: properties,
            gravity_scale: 1.0,
            forced_gravity_scale: None,
            masks,
            single_frame_velocity: Vec2::ZERO,
            x_frozen_for_frame: false,
            y_frozen_for_frame: false,
            gravity_frozen_for_frame: false,
            riding: None,
            is_enabled: true,
            events: Vec::new(),
        })
    }

    pub fn settings(&self) -> &BodySettings {
        &self.settings
    }

    pub fn properties(&self) -> &BodyProperties {
        &self.properties
    }

    pub fn previous(&self) -> &BodyProperties {
        &self.previous
    }

    pub fn position(&self) -> Vec2 {
        self.properties.position
    }

    pub fn previous_position(&self) -> Vec2 {
        self.previous.position
    }

    pub fn velocity(&self) -> Vec2 {
        self.properties.velocity
    }

    pub fn size(&self) -> Vec2 {
        self.size
    }

    pub fn offset(&self) -> Vec2 {
        self.offset
    }

    pub fn masks(&self) -> CollisionMasks {
        self.masks
    }

    pub fn riding(&self) -> Option<BodyId> {
        self.riding
    }

    pub fn is_enabled(&self) -> bool {
        self.is_enabled
    }

    pub fn set_enabled(&mut self, enabled: bool) {
        self.is_enabled = enabled;
    }

    /// Collider bounds at the current position; the Y offset mirrors under inverted gravity.
    pub fn aabb(&self) -> Aabb {
        self.aabb_at(self.properties.position)
    }

    pub(crate) fn aabb_at(&self, position: Vec2) -> Aabb {
        let offset = Vec2::new(self.offset.x, self.offset.y * gravity_sign(self.gravity_scale));
        Aabb::from_center_size(position + offset, self.size)
    }

    /// Swaps the collider shape, e.g. for crouching.
    pub fn set_collider(&mut self, size: Vec2, offset: Vec2) {
        self.size = size;
        self.offset = offset;
        self.slope_detection_margin = size.y * 0.5;
    }

    pub fn reset_collider(&mut self) {
        self.set_collider(self.settings.size, self.settings.offset);
    }

    // -------------------------------------------------------------------------
    // Setters
    // -------------------------------------------------------------------------

    pub fn set_velocity_x(&mut self, velocity: f32) {
        self.properties.velocity.x = velocity;
    }

    pub fn set_velocity_y(&mut self, velocity: f32) {
        self.properties.velocity.y = velocity;
    }

    pub fn set_acceleration(&mut self, acceleration: Vec2) {
        self.properties.acceleration = acceleration;
    }

    pub fn set_acceleration_x(&mut self, acceleration: f32) {
        self.properties.acceleration.x = acceleration;
    }

    pub fn set_deceleration(&mut self, deceleration: Vec2) {
        self.properties.deceleration = deceleration;
    }

    pub fn set_deceleration_x(&mut self, deceleration: f32) {
        self.properties.deceleration.x = deceleration;
    }

    pub fn set_acceleration_y(&mut self, acceleration: f32) {
        self.properties.acceleration.y = acceleration;
    }

    pub fn set_deceleration_y(&mut self, deceleration: f32) {
        self.properties.deceleration.y = deceleration;
    }

    pub fn set_acceleration_cap_x(&mut self, cap: f32) {
        self.properties.velocity_cap.x = cap;
    }

    pub fn set_acceleration_cap_y(&mut self, cap: f32) {
        self.properties.velocity_cap.y = cap;
    }

    pub fn add_velocity_for_single_frame(&mut self, velocity: Vec2) {
        self.single_frame_velocity += velocity;
    }

    pub fn clear_single_frame_velocity(&mut self) {
        self.single_frame_velocity = Vec2::ZERO;
    }

    pub fn freeze_x_movement_for_single_frame(&mut self) {
        self.x_frozen_for_frame = true;
    }

    pub fn freeze_y_movement_for_single_frame(&mut self) {
        self.y_frozen_for_frame = true;
    }

    pub fn freeze_gravity_for_single_frame(&mut self) {
        self.gravity_frozen_for_frame = true;
    }

    pub fn set_uses_gravity(&mut self, uses_gravity: bool) {
        self.settings.gravity.uses_gravity = uses_gravity;
    }

    pub fn set_max_fall_speed(&mut self, speed: f32) {
        self.settings.gravity.max_fall_speed = speed;
    }

    pub fn enable_one_way_platforms(&mut self) {
        self.masks.enable_one_way_platforms();
    }

    pub fn disable_one_way_platforms(&mut self) {
        self.masks.disable_one_way_platforms();
    }

    pub fn add_to_collisions(&mut self, layer: GameLayer) {
        self.masks.add(layer);
    }

    pub fn remove_from_collisions(&mut self, layer: GameLayer) {
        self.masks.remove(layer);
    }

    /// Teleports the body; the previous position moves too so nothing interpolates across the jump.
    pub fn set_position(&mut self, position: Vec2) {
        self.properties.position = position;
        self.previous.position = position;
    }

    pub(crate) fn translate_y(&mut self, amount: f32) {
        self.properties.position.y += amount;
    }

    /// Clears all motion, used on death and stun.
    pub fn stop(&mut self) {
        self.properties.velocity = Vec2::ZERO;
        self.properties.acceleration = Vec2::ZERO;
        self.properties.deceleration = Vec2::ZERO;
        self.single_frame_velocity = Vec2::ZERO;
    }

    /// Jumps and bounces start rising immediately, before gravity gets a say.
    pub fn clear_falling(&mut self) {
        self.properties.is_falling = false;
    }

    /// Copies the current properties into the previous-tick slot.
    pub fn reset_flags(&mut self) {
        self.previous = self.properties;
    }

    // -------------------------------------------------------------------------
    // Gravity scale
    // -------------------------------------------------------------------------

    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    /// Overrides the world gravity scale for this body only; `None` follows the world again.
    pub fn force_gravity_scale(&mut self, scale: Option<f32>, world_scale: f32) {
        self.forced_gravity_scale = scale;
        self.sync_gravity_scale(world_scale);
    }

    pub fn sync_gravity_scale(&mut self, world_scale: f32) {
        let scale = self.forced_gravity_scale.unwrap_or(world_scale);
        if scale != self.gravity_scale {
            self.events.push(PhysicsEvent::GravityScaleChanged(scale));
        }
        self.gravity_scale = scale;
    }

    // -------------------------------------------------------------------------
    // Queries
    // -------------------------------------------------------------------------

    /// On the floor under normal gravity, or on the ceiling under inverted gravity.
    pub fn is_on_surface(&self) -> bool {
        (self.properties.is_grounded && self.gravity_scale > 0.0)
            || (self.properties.is_against_ceiling && self.gravity_scale < 0.0)
    }

    pub fn did_land_this_frame(&self) -> bool {
        (self.properties.is_grounded && !self.previous.is_grounded && self.gravity_scale > 0.0)
            || (self.properties.is_against_ceiling
                && !self.previous.is_against_ceiling
                && self.gravity_scale <= 0.0)
    }

    pub fn did_hit_ceiling_this_frame(&self) -> bool {
        (self.properties.is_grounded && !self.previous.is_grounded && self.gravity_scale < 0.0)
            || (self.properties.is_against_ceiling
                && !self.previous.is_against_ceiling
                && self.gravity_scale >= 0.0)
    }

    pub fn did_hit_left_wall_this_frame(&self) -> bool {
        self.properties.is_against_left_wall && !self.previous.is_against_left_wall
    }

    pub fn did_hit_right_wall_this_frame(&self) -> bool {
        self.properties.is_against_right_wall && !self.previous.is_against_right_wall
    }

    pub fn did_hit_either_wall_this_frame(&self) -> bool {
        self.did_hit_left_wall_this_frame() || self.did_hit_right_wall_this_frame()
    }

    pub fn is_against_either_wall(&self) -> bool {
        self.properties.is_against_left_wall || self.properties.is_against_right_wall
    }

    pub fn is_falling(&self) -> bool {
        self.properties.is_falling
    }

    // -------------------------------------------------------------------------
    // Events
    // -------------------------------------------------------------------------

    pub fn events(&self) -> &[PhysicsEvent] {
        &self.events
    }

    pub fn drain_events(&mut self) -> Vec<PhysicsEvent> {
        std::mem::take(&mut self.events)
    }

    pub(crate) fn push_event(&mut self, event: PhysicsEvent) {
        self.events.push(event);
    }
}
