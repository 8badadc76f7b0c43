//! Controller domain: bouncing off the top of another actor.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::controller::StateId;
use crate::controller::context::{ControllerEvent, Request, StateContext};
use crate::physics::{Aabb, KinematicBody};

/// How far below the other actor's top the bouncer's feet may be and still bounce.
const BELOW_BUFFER: f32 = 1.0;
/// Gap left between the two actors after snapping out of the overlap.
const SEPARATION: f32 = 0.05;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct BounceSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    /// The bounce rises for at least this many ticks, then only while jump is held.
    pub min_frames: u32,
    pub max_frames: u32,
    pub speed: f32,
    /// Damage dealt to the actor bounced on.
    pub damage_dealt: i32,
}

impl Default for BounceSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            min_frames: 6,
            max_frames: 15,
            speed: 8.0,
            damage_dealt: 1,
        }
    }
}

#[derive(Debug, Clone)]
pub struct BounceState {
    core: StateCore,
    pub settings: BounceSettings,
    current_frame: u32,
    active: bool,
}

impl BounceState {
    pub fn new(settings: BounceSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            current_frame: 0,
            active: false,
        }
    }

    pub fn is_active(&self) -> bool {
        self.active
    }

    /// True when `body` is airborne and coming down onto `other` from above
    /// (below, under inverted gravity).
    pub fn can_bounce(&self, body: &KinematicBody, other: Aabb, controller_enabled: bool) -> bool {
        if !(self.core.enabled && controller_enabled) || body.is_on_surface() {
            return false;
        }
        let bouncer = body.aabb();
        if body.gravity_scale() >= 0.0 {
            bouncer.min.y >= other.max.y - BELOW_BUFFER
        } else {
            bouncer.max.y <= other.min.y + BELOW_BUFFER
        }
    }

    /// Starts a bounce off `other`, lifting the body clear of it.
    pub(crate) fn start(&mut self, ctx: &mut StateContext<'_>, other: Aabb) {
        if self.active {
            return;
        }
        ctx.begin(StateId::Bouncing);
        self.current_frame = 0;
        self.active = true;
        ctx.body.clear_falling();
        ctx.body.set_velocity_y(0.0);

        let bouncer = ctx.body.aabb();
        let shift = if ctx.body.gravity_scale() >= 0.0 {
            (bouncer.min.y - other.max.y).abs() + SEPARATION
        } else {
            -(other.min.y - bouncer.max.y).abs() - SEPARATION
        };
        let position = ctx.body.position();
        ctx.body.set_position(Vec2::new(position.x, position.y + shift));
    }
}

impl MovementState for BounceState {
    fn id(&self) -> StateId {
        StateId::Bouncing
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        ctx.request(Request::Bounced);
    }

    fn on_ended(&mut self, _ctx: &mut StateContext<'_>) {
        self.active = false;
    }

    fn on_state_changed(&mut self, ctx: &mut StateContext<'_>) {
        match ctx.current() {
            StateId::Jumping => {
                self.active = false;
                self.current_frame = 0;
                self.end(ctx);
            }
            StateId::Knockback => self.end(ctx),
            _ => {}
        }
    }

    fn update_movement(&mut self, ctx: &mut StateContext<'_>) {
        if !self.active {
            return;
        }
        self.current_frame += 1;
        let released = !ctx.input.jump.down && self.current_frame >= self.settings.min_frames;
        if self.current_frame >= self.settings.max_frames || released {
            self.current_frame = 0;
            self.active = false;
            ctx.emit(ControllerEvent::JumpCrested);
            ctx.body.set_velocity_y(0.0);
            self.end(ctx);
        } else {
            let rise = self.settings.speed * ctx.gravity_sign();
            ctx.body.add_velocity_for_single_frame(Vec2::new(0.0, rise));
        }
    }
}
