//! Controller domain: variable-height jumps, multi-jumps and wall-jump kickback.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::combat::ActionType;
use crate::controller::StateId;
use crate::controller::context::{ControllerEvent, StateContext};
use crate::core::Horizontal;
use crate::physics::drop_through_floor_below;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum JumpType {
    /// Up to `multiple_jump_number` jumps before landing.
    #[default]
    Finite,
    Infinite,
    None,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum JumpSubstate {
    #[default]
    Starting,
    Body,
    Cresting,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct JumpSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub speed: f32,
    pub jump_type: JumpType,
    pub multiple_jump_number: u32,
    pub can_multi_jump_out_of_fall: bool,
    /// The jump keeps rising for at least this many ticks, even if released.
    pub min_frames: u32,
    pub max_frames: u32,
    /// Locks horizontal travel to the direction held when the jump started.
    pub freeze_horizontal_movement: bool,
    pub starting_clip: Option<String>,
    pub cresting_clip: Option<String>,
}

impl Default for JumpSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            speed: 12.0,
            jump_type: JumpType::Finite,
            multiple_jump_number: 1,
            can_multi_jump_out_of_fall: true,
            min_frames: 12,
            max_frames: 15,
            freeze_horizontal_movement: false,
            starting_clip: None,
            cresting_clip: None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct JumpState {
    core: StateCore,
    pub settings: JumpSettings,
    substate: JumpSubstate,
    direction: f32,
    grounded_with_button_up: bool,
    frames_frozen_for_wall_jump: u32,
    released_since_jump: bool,
    current_frame: u32,
    current_jump: u32,
    active: bool,
    wall_jump_kickback: bool,
    /// The starting clip has been requested; the body phase begins next tick.
    body_pending: bool,
    allows_direction_change: bool,
}

impl JumpState {
    pub fn new(settings: JumpSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            substate: JumpSubstate::Starting,
            direction: 0.0,
            grounded_with_button_up: false,
            frames_frozen_for_wall_jump: 0,
            released_since_jump: false,
            current_frame: 0,
            current_jump: 0,
            active: false,
            wall_jump_kickback: false,
            body_pending: false,
            allows_direction_change: true,
        }
    }

    pub fn substate(&self) -> JumpSubstate {
        self.substate
    }

    pub fn current_jump(&self) -> u32 {
        self.current_jump
    }

    pub fn is_jump_active(&self) -> bool {
        self.active
    }

    /// A jump may end on landing only after it has risen for a tick.
    pub fn can_end(&self) -> bool {
        self.current_frame > 1
    }

    pub fn is_horizontal_movement_frozen(&self) -> bool {
        self.settings.freeze_horizontal_movement || self.wall_jump_kickback
    }

    /// Sign of the locked horizontal travel: -1, 0 or 1.
    pub fn direction(&self) -> f32 {
        self.direction
    }

    pub fn on_bounce(&mut self) {
        self.current_jump = 1;
    }

    pub fn on_ladder_exit(&mut self) {
        self.current_jump = 0;
    }

    pub(crate) fn prepare_wall_jump(&mut self, frames: u32, direction: Horizontal) {
        self.direction = direction.sign();
        self.frames_frozen_for_wall_jump = frames;
    }

    pub(crate) fn finish_wall_jump(&mut self) {
        self.current_jump = 0;
        self.wall_jump_kickback = true;
    }

    fn crest(&mut self, ctx: &mut StateContext<'_>) {
        self.substate = JumpSubstate::Cresting;
        self.active = false;
        if !ctx.is_attacking() && ctx.current() == StateId::Jumping {
            ctx.play_secondary(self.settings.cresting_clip.as_deref(), false);
        }
        ctx.emit(ControllerEvent::JumpCrested);
    }

    fn reset_flags(&mut self, ctx: &StateContext<'_>) {
        let on_surface = ctx.is_on_surface();
        if on_surface && !ctx.input.jump.down && !self.active {
            self.grounded_with_button_up = true;
        } else if !on_surface || self.active {
            self.grounded_with_button_up = false;
        }
        if on_surface && !self.active {
            self.current_jump = 0;
        }
    }

    fn admit_jump_count(&mut self) -> bool {
        let limit = self.settings.multiple_jump_number;
        match self.settings.jump_type {
            JumpType::None => false,
            JumpType::Infinite => {
                self.current_jump += 1;
                true
            }
            JumpType::Finite if limit == 0 => false,
            JumpType::Finite => {
                let first = self.current_jump == 0 && self.grounded_with_button_up;
                let follow_up = self.current_jump > 0 && self.current_jump < limit;
                if first || follow_up {
                    self.current_jump += 1;
                    true
                } else if limit > 1
                    && !self.active
                    && self.settings.can_multi_jump_out_of_fall
                    && self.current_jump < limit
                {
                    // Walking off a ledge spends the ground jump.
                    self.current_jump += 2;
                    true
                } else {
                    false
                }
            }
        }
    }
}

impl MovementState for JumpState {
    fn id(&self) -> StateId {
        StateId::Jumping
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn can_initiate(&mut self, ctx: &mut StateContext<'_>) -> bool {
        if self.settings.jump_type == JumpType::None {
            return false;
        }
        let facts = ctx.facts;
        if ctx.current() == StateId::Crouching && (!facts.crouch_can_exit || !facts.crouch_can_jump) {
            return false;
        }
        // Down + jump on a one-way platform drops through it instead.
        if ctx.input.axis.y == -1.0
            && drop_through_floor_below(ctx.body, ctx.terrain, ctx.world_down())
        {
            return false;
        }
        if ctx.is_locked_for_attack(ActionType::Jumping)
            || ctx.status.is_knockback_active
            || ctx.status.is_stunned
            || (ctx.status.is_dashing && !facts.dash_can_jump)
            || ctx.current() == StateId::Ladder
            || ctx.status.frames_since_drop < 2
            || facts.wall_jump_possible
        {
            return false;
        }
        self.admit_jump_count()
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        self.current_frame = 0;
        self.active = true;
        self.released_since_jump = false;
        self.grounded_with_button_up = false;
        ctx.body.clear_falling();
        ctx.attacks.cancel_if(|c| c.on_jump);
        if self.settings.freeze_horizontal_movement {
            self.direction = ctx.input.axis.x;
        }

        self.substate = JumpSubstate::Starting;
        if !ctx.is_attacking() {
            ctx.play_secondary(self.settings.starting_clip.as_deref(), false);
        }
        self.body_pending = true;
        debug!("Jump {} started", self.current_jump);
        ctx.emit(ControllerEvent::Jumped {
            jump_number: self.current_jump,
        });
    }

    fn on_ended(&mut self, _ctx: &mut StateContext<'_>) {
        self.current_frame = 0;
        self.active = false;
        self.frames_frozen_for_wall_jump = 0;
        self.body_pending = false;
    }

    fn on_state_changed(&mut self, ctx: &mut StateContext<'_>) {
        match ctx.current() {
            StateId::Dashing => {
                self.current_frame = 0;
                self.frames_frozen_for_wall_jump = 0;
            }
            StateId::Ladder | StateId::Knockback => self.end(ctx),
            _ => {}
        }
    }

    fn poll(&mut self, ctx: &mut StateContext<'_>) {
        if !ctx.status.is_enabled {
            return;
        }
        self.allows_direction_change = !(self.active && self.settings.freeze_horizontal_movement);
        if ctx.input.jump.pressed_this_frame {
            ctx.begin_interrupt(StateId::Jumping);
        }
        if self.active && !ctx.input.jump.down {
            self.released_since_jump = true;
        }
    }

    fn update_movement(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.status.is_knockback_active {
            self.current_frame = 0;
            self.active = false;
            return;
        }
        let holding = ctx.input.jump.down && !self.released_since_jump;
        if holding || (self.current_frame < self.settings.min_frames && self.active) {
            if !self.active {
                return;
            }
            self.current_frame += 1;
            if self.current_frame >= self.settings.max_frames
                || ctx.body.did_hit_ceiling_this_frame()
            {
                self.crest(ctx);
            } else {
                let rise = self.settings.speed * ctx.gravity_sign();
                ctx.body.add_velocity_for_single_frame(Vec2::new(0.0, rise));
            }
        } else if self.active {
            self.crest(ctx);
        }
    }

    fn fixed_update(&mut self, ctx: &mut StateContext<'_>) {
        self.reset_flags(ctx);
        if self.frames_frozen_for_wall_jump == 0 {
            self.wall_jump_kickback = false;
        } else {
            self.frames_frozen_for_wall_jump -= 1;
        }

        if self.body_pending {
            self.body_pending = false;
            if self.active {
                self.substate = JumpSubstate::Body;
                if !ctx.is_attacking() {
                    self.play_animation(ctx);
                }
            }
        }
    }

    fn will_allow_direction_change(&self) -> bool {
        self.allows_direction_change
    }

    fn plays_animation_on_begin(&self) -> bool {
        false
    }

    fn play_animation_for_substate(&mut self, ctx: &mut StateContext<'_>) {
        let clip = match self.substate {
            JumpSubstate::Starting => self.settings.starting_clip.as_deref(),
            JumpSubstate::Body => self.core.clip.as_deref(),
            JumpSubstate::Cresting => self.settings.cresting_clip.as_deref(),
        };
        if ctx.current() == StateId::Jumping {
            ctx.play_secondary(clip, false);
        }
    }
}
