//! Controller domain: clinging to, sliding down and climbing walls, with wall jumps
//! and ledge hangs.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::combat::ActionType;
use crate::controller::StateId;
use crate::controller::context::{Request, StateContext};
use crate::core::{Horizontal, Vertical};
use crate::physics::detect_ledge_on_wall;

/// Ticks after letting go of a wall before it can be grabbed again.
const COOLDOWN_FRAMES: u32 = 20;
const LEDGE_CHECK_OFFSET: f32 = 0.25;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WallClingSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub enable_wall_jump: bool,
    /// Ticks after leaving the wall during which a wall jump is still accepted.
    pub wall_jump_grace_frames: u32,
    /// Ticks a wall jump locks horizontal travel away from the wall.
    pub wall_jump_kickback_frames: u32,
    pub enable_climbing: bool,
    pub climb_speed: f32,
    pub enable_ledge_grab: bool,
    pub can_ledge_jump: bool,
    pub enable_cling_while_jumping: bool,
    pub cling_requires_directional_hold: bool,
    pub can_disengage_with_directional_press: bool,
    /// 0 with climbing disabled means the wall can't be held at all.
    pub wall_slide_speed: f32,
    pub attacks_reverse_on_wall: bool,
    pub climb_moving_clip: Option<String>,
    pub climb_stopped_clip: Option<String>,
    pub ledge_hang_clip: Option<String>,
}

impl Default for WallClingSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            enable_wall_jump: true,
            wall_jump_grace_frames: 3,
            wall_jump_kickback_frames: 7,
            enable_climbing: false,
            climb_speed: 5.0,
            enable_ledge_grab: false,
            can_ledge_jump: true,
            enable_cling_while_jumping: false,
            cling_requires_directional_hold: true,
            can_disengage_with_directional_press: true,
            wall_slide_speed: 1.0,
            attacks_reverse_on_wall: true,
            climb_moving_clip: None,
            climb_stopped_clip: None,
            ledge_hang_clip: None,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum WallClingSubstate {
    #[default]
    None,
    Sliding,
    Climbing,
    Stopped,
    LedgeHanging,
}

/// Where the wall ends above or below the body.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
struct BufferZone {
    ledge_detected: bool,
    in_buffer: bool,
    /// Body Y at which the body lines up with the wall's end.
    cutoff: f32,
}

#[derive(Debug, Clone)]
pub struct WallClingState {
    core: StateCore,
    pub settings: WallClingSettings,
    substate: WallClingSubstate,
    is_clinging: bool,
    cooldown: u32,
    grace: u32,
    is_dropping: bool,
    wall_jump_direction: Horizontal,
}

impl WallClingState {
    pub fn new(settings: WallClingSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            substate: WallClingSubstate::None,
            is_clinging: false,
            cooldown: 0,
            grace: 0,
            is_dropping: false,
            wall_jump_direction: Horizontal::Right,
        }
    }

    pub fn substate(&self) -> WallClingSubstate {
        self.substate
    }

    pub fn is_clinging(&self) -> bool {
        self.is_clinging
    }

    pub fn is_wall_jump_possible(&self) -> bool {
        (self.settings.enable_wall_jump && self.grace > 0)
            || self.substate == WallClingSubstate::LedgeHanging
    }

    fn is_cooldown_complete(&self) -> bool {
        self.cooldown == 0
    }

    fn is_pressing_into_wall(&self, ctx: &StateContext<'_>) -> bool {
        let properties = ctx.body.properties();
        let axis = ctx.status.axis.x;
        let free_hold = !self.settings.cling_requires_directional_hold;
        let direction = ctx.status.direction;
        (properties.is_against_right_wall
            && direction == Horizontal::Right
            && (axis == 1.0 || free_hold))
            || (properties.is_against_left_wall
                && direction == Horizontal::Left
                && (axis == -1.0 || free_hold))
    }

    fn is_cling_allowed(&self, ctx: &StateContext<'_>) -> bool {
        if !self.is_cooldown_complete() {
            return false;
        }
        if self.is_dropping {
            // After letting go, only pushing back into the wall grabs it again.
            let properties = ctx.body.properties();
            let axis = ctx.status.axis.x;
            return (properties.is_against_right_wall && axis == 1.0)
                || (properties.is_against_left_wall && axis == -1.0);
        }
        true
    }

    fn is_jump_blocking(&self, ctx: &StateContext<'_>) -> bool {
        ctx.facts.jump_active && !self.settings.enable_cling_while_jumping
    }

    fn check_for_wall_cling(&mut self, ctx: &mut StateContext<'_>, handle_jump: bool) {
        if ctx.current() == StateId::Knockback || ctx.status.is_stunned {
            self.is_clinging = false;
            return;
        }

        let properties = ctx.body.properties();
        let (right, left) = (properties.is_against_right_wall, properties.is_against_left_wall);
        if right {
            self.wall_jump_direction = Horizontal::Left;
        } else if left {
            self.wall_jump_direction = Horizontal::Right;
        }

        let on_surface = ctx.is_on_surface();
        self.is_clinging = false;
        if !on_surface
            && self.is_pressing_into_wall(ctx)
            && self.is_cling_allowed(ctx)
            && !(ctx.current() == StateId::Jumping && !self.settings.enable_cling_while_jumping)
        {
            self.is_clinging = true;
            self.grace = self.settings.wall_jump_grace_frames;
        }

        if handle_jump && ctx.input.jump.pressed_this_frame {
            self.handle_jump_press(ctx, right || left, on_surface);
        }

        let axis = ctx.status.axis.x;
        if self.settings.can_disengage_with_directional_press
            && ((right && axis == -1.0) || (left && axis == 1.0))
        {
            self.is_clinging = false;
            if ctx.current() == StateId::WallCling {
                ctx.to_default();
            }
        }

        if self.is_clinging {
            self.is_dropping = false;
        }
    }

    fn handle_jump_press(&mut self, ctx: &mut StateContext<'_>, against_wall: bool, on_surface: bool) {
        let settings = &self.settings;
        let hanging = self.substate == WallClingSubstate::LedgeHanging;
        let wall_jump = (against_wall || self.grace > 0)
            && settings.enable_wall_jump
            && (!ctx.facts.jump_active || settings.enable_cling_while_jumping)
            && !on_surface
            && !hanging
            && self.is_cooldown_complete();
        let ledge_jump = hanging && settings.can_ledge_jump && !on_surface;

        if wall_jump || ledge_jump {
            if ctx.facts.has_jump {
                ctx.request(Request::WallJump {
                    frames: settings.wall_jump_kickback_frames,
                    direction: self.wall_jump_direction,
                });
                self.is_clinging = false;
            }
            return;
        }

        let can_let_go = settings.enable_climbing || hanging;
        if !(settings.enable_wall_jump && !hanging)
            || (hanging && !settings.can_ledge_jump && can_let_go)
        {
            self.cooldown = COOLDOWN_FRAMES;
            self.is_clinging = false;
            if self.substate != WallClingSubstate::None {
                self.is_dropping = true;
            }
            ctx.to_default();
        }
    }

    /// Casts along the wall toward `vertical` (relative to the body's own up)
    /// for the wall's end.
    fn buffer_zone(&self, ctx: &StateContext<'_>, vertical: Vertical) -> BufferZone {
        let settings = &self.settings;
        if !(settings.enable_climbing || settings.enable_ledge_grab) {
            return BufferZone::default();
        }

        let world = match vertical {
            Vertical::Down => ctx.world_down(),
            Vertical::Up => ctx.world_up(),
        };
        let direction = ctx.status.direction;
        let velocity_y = ctx.body.velocity().y;
        let travel = velocity_y * ctx.fixed_dt;
        let mut ledge = detect_ledge_on_wall(
            ctx.body,
            ctx.terrain,
            direction,
            world,
            travel,
            LEDGE_CHECK_OFFSET,
        );
        if !ledge.did_hit {
            ledge = detect_ledge_on_wall(ctx.body, ctx.terrain, direction, world, travel, 0.0);
        }
        if !ledge.did_hit {
            return BufferZone::default();
        }

        // Lines the body's edge up with the wall's end.
        let cutoff = ledge.hit_y + ctx.body.size().y * 0.5 * world.sign();
        let predicted = ctx.body.position().y - travel * vertical.sign();
        let past_end = match world {
            Vertical::Down => predicted > cutoff,
            Vertical::Up => predicted < cutoff,
        };
        BufferZone {
            ledge_detected: true,
            in_buffer: past_end,
            cutoff,
        }
    }

    fn snap_y(ctx: &mut StateContext<'_>, y: f32) {
        let x = ctx.body.position().x;
        ctx.body.set_position(Vec2::new(x, y));
    }

    fn hang_on_ledge(&mut self, ctx: &mut StateContext<'_>) {
        if !self.settings.enable_ledge_grab {
            return;
        }
        if self.substate != WallClingSubstate::LedgeHanging && !ctx.is_attacking() {
            ctx.play_secondary(self.settings.ledge_hang_clip.as_deref(), false);
        }
        self.substate = WallClingSubstate::LedgeHanging;
    }

    fn update_cooldowns(&mut self) {
        self.cooldown = self.cooldown.saturating_sub(1);
        self.grace = self.grace.saturating_sub(1);
    }

    fn cling(&mut self, ctx: &mut StateContext<'_>, top: BufferZone, bottom: BufferZone, climbable: f32) {
        self.grace = self.settings.wall_jump_grace_frames;
        let g = ctx.gravity_sign();
        let mut is_current = ctx.current() == StateId::WallCling;

        if !is_current
            && !self.is_jump_blocking(ctx)
            && ctx.current() != StateId::Ladder
            && self.is_cooldown_complete()
            && !top.in_buffer
            && (!(bottom.ledge_detected && bottom.in_buffer && self.settings.enable_climbing)
                || climbable < 0.0)
        {
            ctx.begin(StateId::WallCling);
            ctx.body.set_velocity_x(0.0);
            // The switch lands after this callback; assume it takes unless something blocks it.
            is_current = !ctx.status.is_knockback_active
                && !ctx.status.is_dead
                && !ctx.is_locked_for_attack(ActionType::WallClinging);
        }

        if is_current {
            let slide = self.settings.wall_slide_speed;
            if slide.abs() > 0.0 {
                ctx.body.freeze_gravity_for_single_frame();
                ctx.body.set_velocity_y(-slide * g);
                if !self.settings.enable_climbing
                    && self.substate != WallClingSubstate::LedgeHanging
                    && !ctx.is_attacking()
                {
                    if self.substate != WallClingSubstate::Sliding {
                        self.play_animation(ctx);
                    }
                    self.substate = WallClingSubstate::Sliding;
                }
            }
            if self.settings.enable_climbing || self.substate == WallClingSubstate::LedgeHanging {
                ctx.body.freeze_gravity_for_single_frame();
                ctx.body.set_velocity_y(0.0);
            }
        }

        let axis = ctx.status.axis.y;
        if self.settings.enable_climbing && axis.abs() > 0.0 && is_current {
            self.climb(ctx, top, bottom, climbable, axis);
        } else if self.settings.enable_climbing
            && !top.in_buffer
            && !matches!(
                self.substate,
                WallClingSubstate::LedgeHanging | WallClingSubstate::Sliding
            )
        {
            if self.substate != WallClingSubstate::Stopped && !ctx.is_attacking() {
                ctx.play_secondary(self.settings.climb_stopped_clip.as_deref(), false);
            }
            self.substate = WallClingSubstate::Stopped;
        }
    }

    fn climb(
        &mut self,
        ctx: &mut StateContext<'_>,
        top: BufferZone,
        bottom: BufferZone,
        climbable: f32,
        axis: f32,
    ) {
        let g = ctx.gravity_sign();
        let mut velocity = axis * self.settings.climb_speed * g;
        if climbable < ctx.body.size().y {
            velocity = 0.0;
        }

        let next = ctx.body.position().y + velocity * ctx.fixed_dt;
        if top.ledge_detected {
            let past_top = if g > 0.0 { next > top.cutoff } else { next < top.cutoff };
            if past_top {
                Self::snap_y(ctx, top.cutoff);
                velocity = 0.0;
                self.hang_on_ledge(ctx);
            }
        } else if bottom.ledge_detected {
            let past_bottom = if g > 0.0 { next < bottom.cutoff } else { next > bottom.cutoff };
            if past_bottom {
                Self::snap_y(ctx, bottom.cutoff);
                velocity = 0.0;
            }
        }
        ctx.body.set_velocity_y(velocity);

        if !(self.substate == WallClingSubstate::LedgeHanging && axis > 0.0) {
            if self.substate != WallClingSubstate::Climbing && !ctx.is_attacking() {
                ctx.play_secondary(self.settings.climb_moving_clip.as_deref(), false);
            }
            self.substate = WallClingSubstate::Climbing;
        }
    }
}

impl MovementState for WallClingState {
    fn id(&self) -> StateId {
        StateId::WallCling
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn can_initiate(&mut self, ctx: &mut StateContext<'_>) -> bool {
        !ctx.is_locked_for_attack(ActionType::WallClinging)
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        ctx.attacks.cancel_if(|c| c.on_wall_cling);
    }

    fn on_ended(&mut self, _ctx: &mut StateContext<'_>) {
        self.is_clinging = false;
        self.substate = WallClingSubstate::None;
    }

    fn on_state_changed(&mut self, _ctx: &mut StateContext<'_>) {
        self.is_clinging = false;
        self.substate = WallClingSubstate::None;
    }

    fn poll(&mut self, ctx: &mut StateContext<'_>) {
        if !(self.core.enabled && ctx.status.is_enabled) {
            self.is_clinging = false;
            return;
        }
        self.check_for_wall_cling(ctx, true);
    }

    fn fixed_update(&mut self, ctx: &mut StateContext<'_>) {
        if !self.core.enabled || ctx.attacks.cancels(|c| c.wall_clinging) {
            self.grace = 0;
            self.cooldown = 0;
            self.is_clinging = false;
            return;
        }

        if ctx.current() != StateId::Falling
            && !ctx.status.is_knockback_active
            && !ctx.status.is_stunned
        {
            self.is_dropping = false;
        }

        self.check_for_wall_cling(ctx, false);

        let g = ctx.gravity_sign();
        let top = self.buffer_zone(ctx, Vertical::Down);
        let bottom = self.buffer_zone(ctx, Vertical::Up);
        let rising = ctx.body.velocity().y * g;
        let is_current = ctx.current() == StateId::WallCling;

        if self.is_pressing_into_wall(ctx)
            && self.is_cling_allowed(ctx)
            && !self.is_dropping
            && !self.is_jump_blocking(ctx)
            && !is_current
        {
            if top.ledge_detected && !top.in_buffer {
                if rising < 0.0 {
                    Self::snap_y(ctx, top.cutoff);
                    self.hang_on_ledge(ctx);
                }
            } else if bottom.ledge_detected
                && !bottom.in_buffer
                && self.settings.enable_climbing
                && !top.ledge_detected
                && rising > 0.0
            {
                Self::snap_y(ctx, bottom.cutoff);
            }
        }

        let both = top.ledge_detected && bottom.ledge_detected;
        let climbable = if both {
            (top.cutoff - bottom.cutoff) * g
        } else {
            ctx.body.size().y
        };

        let leaving_top = top.ledge_detected && top.in_buffer && rising < 0.0;
        let leaving_bottom = bottom.ledge_detected && bottom.in_buffer && rising >= 0.0;
        if leaving_top || leaving_bottom {
            // A wall shorter than the body is all buffer; stay put at its top.
            let y = ctx.body.position().y;
            let wall_is_all_buffer = both
                && climbable < 0.0
                && ((g > 0.0 && y <= top.cutoff) || (g < 0.0 && y >= top.cutoff));
            if !wall_is_all_buffer || !self.is_cooldown_complete() || self.is_dropping {
                self.is_clinging = false;
            }
        }

        if self.settings.wall_slide_speed == 0.0
            && !self.settings.enable_climbing
            && self.substate != WallClingSubstate::LedgeHanging
        {
            self.is_clinging = false;
        }

        if self.is_clinging {
            self.cling(ctx, top, bottom, climbable);
        } else if is_current {
            ctx.to_default();
        }

        self.update_cooldowns();
    }

    fn plays_animation_on_begin(&self) -> bool {
        false
    }

    fn play_animation_for_substate(&mut self, ctx: &mut StateContext<'_>) {
        let clip = match self.substate {
            WallClingSubstate::Climbing => self.settings.climb_moving_clip.as_deref(),
            WallClingSubstate::Stopped => self.settings.climb_stopped_clip.as_deref(),
            WallClingSubstate::LedgeHanging => self.settings.ledge_hang_clip.as_deref(),
            WallClingSubstate::Sliding | WallClingSubstate::None => self.core.clip.as_deref(),
        };
        ctx.play_secondary(clip, false);
    }
}
