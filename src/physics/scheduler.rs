//! Physics domain: fixed-step scheduler and the world that owns every body.

use std::collections::HashMap;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::body::{BodyId, BodySettings, CollisionEvent, KinematicBody, PhysicsEvent};
use super::layers::GameLayer;
use super::platform::{MovingPlatform, MovingPlatformSettings};
use super::resolve::{PlatformMotion, StepEnv};
use super::terrain::{Aabb, Shape, Terrain};
use crate::config::{ConfigError, validate_physics};
use crate::core::interpolate;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum UpdateType {
    /// Step once per rendered frame.
    Update,
    /// Step on the fixed schedule and draw the latest state.
    Fixed,
    /// Step on the fixed schedule and draw between the last two states.
    #[default]
    FixedWithInterpolation,
}

#[derive(Resource, Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PhysicsSettings {
    pub fixed_delta_time: f32,
    pub update_type: UpdateType,
    pub gravity_scale: f32,
    /// Extra distance around the camera view inside which bodies count as visible.
    pub camera_margin: f32,
}

impl Default for PhysicsSettings {
    fn default() -> Self {
        Self {
            fixed_delta_time: 0.01667,
            update_type: UpdateType::FixedWithInterpolation,
            gravity_scale: 1.0,
            camera_margin: 6.0,
        }
    }
}

/// Step order and the world gravity scale.
///
/// Holds ids only; bodies live in the `PhysicsWorld` arena.
#[derive(Debug, Clone)]
pub struct PhysicsScheduler {
    settings: PhysicsSettings,
    gravity_scale: f32,
    previous_gravity_scale: f32,
    platforms: Vec<BodyId>,
    bodies: Vec<BodyId>,
    camera_view: Option<Aabb>,
    pub is_paused: bool,
}

impl PhysicsScheduler {
    pub fn new(settings: PhysicsSettings) -> Self {
        Self {
            gravity_scale: settings.gravity_scale,
            previous_gravity_scale: settings.gravity_scale,
            settings,
            platforms: Vec::new(),
            bodies: Vec::new(),
            camera_view: None,
            is_paused: false,
        }
    }

    pub fn settings(&self) -> &PhysicsSettings {
        &self.settings
    }

    pub fn fixed_dt(&self) -> f32 {
        self.settings.fixed_delta_time
    }

    pub fn gravity_scale(&self) -> f32 {
        self.gravity_scale
    }

    pub fn platforms(&self) -> &[BodyId] {
        &self.platforms
    }

    pub fn bodies(&self) -> &[BodyId] {
        &self.bodies
    }

    pub fn register(&mut self, id: BodyId, is_platform: bool) {
        let list = if is_platform {
            &mut self.platforms
        } else {
            &mut self.bodies
        };
        if !list.contains(&id) {
            list.push(id);
        }
    }

    /// Returns false when `id` was never registered.
    pub fn unregister(&mut self, id: BodyId) -> bool {
        let before = self.platforms.len() + self.bodies.len();
        self.platforms.retain(|p| *p != id);
        self.bodies.retain(|b| *b != id);
        before != self.platforms.len() + self.bodies.len()
    }

    pub fn is_registered(&self, id: BodyId) -> bool {
        self.platforms.contains(&id) || self.bodies.contains(&id)
    }

    pub fn set_camera_view(&mut self, view: Option<Aabb>) {
        self.camera_view = view;
    }

    pub fn is_on_camera(&self, position: Vec2) -> bool {
        match self.camera_view {
            Some(view) => view.expanded(self.settings.camera_margin).contains(position),
            None => true,
        }
    }

    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.gravity_scale = scale;
    }

    pub fn flip_gravity(&mut self) {
        self.gravity_scale = -self.gravity_scale;
    }

    /// True once per change, after the tick in which the scale was changed.
    fn take_gravity_change(&mut self) -> bool {
        let changed = self.gravity_scale != self.previous_gravity_scale;
        self.previous_gravity_scale = self.gravity_scale;
        changed
    }
}

/// All simulated bodies, the terrain they collide with, and the scheduler that orders them.
#[derive(Resource, Debug, Clone)]
pub struct PhysicsWorld {
    pub terrain: Terrain,
    scheduler: PhysicsScheduler,
    bodies: HashMap<BodyId, KinematicBody>,
    platforms: HashMap<BodyId, MovingPlatform>,
    next_id: u32,
    tick: u64,
}

impl PhysicsWorld {
    pub fn new(settings: PhysicsSettings, terrain: Terrain) -> Result<Self, ConfigError> {
        validate_physics(&settings)?;
        Ok(Self {
            terrain,
            scheduler: PhysicsScheduler::new(settings),
            bodies: HashMap::new(),
            platforms: HashMap::new(),
            next_id: 0,
            tick: 0,
        })
    }

    pub fn scheduler(&self) -> &PhysicsScheduler {
        &self.scheduler
    }

    pub fn scheduler_mut(&mut self) -> &mut PhysicsScheduler {
        &mut self.scheduler
    }

    pub fn fixed_dt(&self) -> f32 {
        self.scheduler.fixed_dt()
    }

    pub fn tick_count(&self) -> u64 {
        self.tick
    }

    pub fn gravity_scale(&self) -> f32 {
        self.scheduler.gravity_scale()
    }

    /// Takes effect for every body at the end of the next step.
    pub fn set_gravity_scale(&mut self, scale: f32) {
        self.scheduler.set_gravity_scale(scale);
    }

    pub fn flip_gravity(&mut self) {
        self.scheduler.flip_gravity();
    }

    fn allocate_id(&mut self) -> BodyId {
        let id = BodyId(self.next_id);
        self.next_id += 1;
        id
    }

    pub fn spawn_body(&mut self, settings: BodySettings, position: Vec2) -> Result<BodyId, ConfigError> {
        let mut body = KinematicBody::new(settings, position)?;
        body.sync_gravity_scale(self.scheduler.gravity_scale());
        let id = self.allocate_id();
        self.bodies.insert(id, body);
        self.scheduler.register(id, false);
        debug!("Spawned body {:?} at {:?}", id, position);
        Ok(id)
    }

    /// Spawns a gravity-free body carrying a terrain collider of `layer` that passengers can ride.
    pub fn spawn_platform(
        &mut self,
        mut settings: BodySettings,
        position: Vec2,
        layer: GameLayer,
        platform: MovingPlatformSettings,
    ) -> Result<BodyId, ConfigError> {
        settings.is_moving_platform = true;
        settings.gravity.uses_gravity = false;
        let mut body = KinematicBody::new(settings, position)?;
        body.sync_gravity_scale(self.scheduler.gravity_scale());

        let id = self.allocate_id();
        let collider = self.terrain.add_owned(
            body.aabb().center(),
            Shape::Box {
                half_extents: body.size() * 0.5,
            },
            layer,
            id,
        );
        self.bodies.insert(id, body);
        self.platforms.insert(id, MovingPlatform::new(platform, collider));
        self.scheduler.register(id, true);
        debug!("Spawned platform {:?} at {:?}", id, position);
        Ok(id)
    }

    pub fn despawn_body(&mut self, id: BodyId) {
        let registered = self.scheduler.unregister(id);
        debug_assert!(registered, "despawn of unregistered body {:?}", id);
        if !registered {
            return;
        }
        self.bodies.remove(&id);
        if let Some(platform) = self.platforms.remove(&id) {
            self.terrain.remove(platform.collider);
        }
    }

    pub fn body(&self, id: BodyId) -> Option<&KinematicBody> {
        let body = self.bodies.get(&id);
        debug_assert!(body.is_some(), "unregistered body {:?}", id);
        body
    }

    pub fn body_mut(&mut self, id: BodyId) -> Option<&mut KinematicBody> {
        let body = self.bodies.get_mut(&id);
        debug_assert!(body.is_some(), "unregistered body {:?}", id);
        body
    }

    pub fn contains(&self, id: BodyId) -> bool {
        self.bodies.contains_key(&id)
    }

    /// Split borrow of one body and the terrain, for controllers.
    pub fn body_and_terrain(&mut self, id: BodyId) -> Option<(&mut KinematicBody, &Terrain)> {
        let body = self.bodies.get_mut(&id);
        debug_assert!(body.is_some(), "unregistered body {:?}", id);
        body.map(|b| (b, &self.terrain))
    }

    pub fn platform(&self, id: BodyId) -> Option<&MovingPlatform> {
        self.platforms.get(&id)
    }

    pub fn platform_mut(&mut self, id: BodyId) -> Option<&mut MovingPlatform> {
        self.platforms.get_mut(&id)
    }

    /// Position to draw at, `alpha` of the way from the previous tick to the current one.
    pub fn render_position(&self, id: BodyId, alpha: f32) -> Option<Vec2> {
        let body = self.bodies.get(&id)?;
        Some(match self.scheduler.settings.update_type {
            UpdateType::FixedWithInterpolation => {
                interpolate(body.previous_position(), body.position(), alpha)
            }
            UpdateType::Update | UpdateType::Fixed => body.position(),
        })
    }

    /// One fixed tick: platforms first, then everything else, then contact mirroring
    /// and gravity resync.
    pub fn step(&mut self) {
        if self.scheduler.is_paused {
            return;
        }
        let fixed_dt = self.scheduler.fixed_dt();

        for id in self.scheduler.platforms.clone() {
            let (Some(body), Some(platform)) = (self.bodies.get_mut(&id), self.platforms.get_mut(&id))
            else {
                continue;
            };
            if !body.is_enabled() {
                continue;
            }
            platform.drive(body);
            body.reset_flags();
            let env = StepEnv {
                terrain: &self.terrain,
                fixed_dt,
                self_id: id,
                platform: None,
                on_camera: self.scheduler.is_on_camera(body.position()),
            };
            body.step(&env);
            platform.move_distance = body.position() - body.previous_position();
            let center = body.aabb().center();
            let collider = platform.collider;
            self.terrain.set_center(collider, center);
        }

        let mut mirrored: Vec<(BodyId, CollisionEvent)> = Vec::new();
        for id in self.scheduler.bodies.clone() {
            let Some(body) = self.bodies.get_mut(&id) else {
                continue;
            };
            if !body.is_enabled() {
                continue;
            }
            body.reset_flags();
            let motion = body.riding().and_then(|p| {
                let velocity = self.bodies.get(&p).map(|b| b.velocity())?;
                let platform = self.platforms.get(&p)?;
                Some(PlatformMotion {
                    velocity,
                    move_distance: platform.move_distance,
                })
            });
            let Some(body) = self.bodies.get_mut(&id) else {
                continue;
            };
            let env = StepEnv {
                terrain: &self.terrain,
                fixed_dt,
                self_id: id,
                platform: motion,
                on_camera: self.scheduler.is_on_camera(body.position()),
            };
            let before = body.events().len();
            body.step(&env);

            for event in &body.events()[before..] {
                if let PhysicsEvent::Collision(collision) = event
                    && let Some(other) = collision.body
                {
                    mirrored.push((
                        other,
                        CollisionEvent {
                            collider: None,
                            body: Some(id),
                            layer: GameLayer::Default,
                            side: collision.side.opposite(),
                            kind: collision.kind,
                        },
                    ));
                }
            }

            if body.properties().is_grounded
                && let Some(platform) = body.riding().and_then(|p| self.platforms.get_mut(&p))
            {
                platform.notify_object_on_top();
            }
        }

        for (other, event) in mirrored {
            if let Some(body) = self.bodies.get_mut(&other) {
                body.push_event(PhysicsEvent::Collision(event));
            }
        }

        if self.scheduler.take_gravity_change() {
            let scale = self.scheduler.gravity_scale();
            info!("Gravity scale changed to {}", scale);
            for id in self.scheduler.bodies.clone() {
                if let Some(body) = self.bodies.get_mut(&id) {
                    body.sync_gravity_scale(scale);
                }
            }
        }

        self.tick += 1;
    }
}
