//! Controller domain: crouching, with a shorter collider and an overhang check on exit.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::combat::ActionType;
use crate::config::vec2_serde;
use crate::controller::StateId;
use crate::controller::context::StateContext;
use crate::physics::is_under_overhang;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CrouchSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub moving_clip: Option<String>,
    #[serde(with = "vec2_serde")]
    pub collider_size: Vec2,
    #[serde(with = "vec2_serde")]
    pub collider_offset: Vec2,
    pub move_speed: f32,
    /// Stand up as soon as down is released, instead of waiting for up.
    pub rise_with_release: bool,
    pub can_move: bool,
    pub can_jump: bool,
    pub must_release_to_move: bool,
    pub kill_deceleration: bool,
    pub allow_acceleration_on_move: bool,
}

impl Default for CrouchSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            moving_clip: None,
            collider_size: Vec2::new(1.0, 0.9),
            collider_offset: Vec2::new(0.0, -0.48),
            move_speed: 5.0,
            rise_with_release: false,
            can_move: false,
            can_jump: false,
            must_release_to_move: true,
            kill_deceleration: true,
            allow_acceleration_on_move: false,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum CrouchSubstate {
    #[default]
    Stopped,
    Moving,
}

#[derive(Debug, Clone)]
pub struct CrouchState {
    core: StateCore,
    pub settings: CrouchSettings,
    substate: CrouchSubstate,
    skid_complete: bool,
    released_horizontal: bool,
    stopped_since_crouch: bool,
}

impl CrouchState {
    pub fn new(settings: CrouchSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            substate: CrouchSubstate::Stopped,
            skid_complete: false,
            released_horizontal: false,
            stopped_since_crouch: false,
        }
    }

    pub fn is_skid_complete(&self) -> bool {
        self.skid_complete
    }

    /// Whether horizontal input may move the body while crouched.
    pub fn will_allow_movement(&self) -> bool {
        let must_release = self.settings.must_release_to_move;
        self.settings.can_move
            && !(must_release && !self.released_horizontal)
            && !(must_release && !self.stopped_since_crouch)
            && self.skid_complete
    }

    /// False while solid terrain above would not fit the standing collider.
    pub fn can_exit(&self, ctx: &StateContext<'_>) -> bool {
        !is_under_overhang(
            ctx.terrain,
            ctx.world_up(),
            ctx.body.settings().size,
            ctx.body.position(),
        )
    }

    fn exit(&mut self, ctx: &mut StateContext<'_>) {
        ctx.to_default();
        ctx.body.reset_collider();
    }
}

impl MovementState for CrouchState {
    fn id(&self) -> StateId {
        StateId::Crouching
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn can_initiate(&mut self, ctx: &mut StateContext<'_>) -> bool {
        !ctx.is_locked_for_attack(ActionType::Crouching)
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        ctx.attacks.cancel_if(|c| c.on_crouch);
        ctx.body
            .set_collider(self.settings.collider_size, self.settings.collider_offset);

        self.skid_complete = false;
        if self.settings.kill_deceleration {
            ctx.body.set_velocity_x(0.0);
            self.skid_complete = true;
        }
        if ctx.facts.walk_deceleration == 0.0 {
            self.skid_complete = true;
        }

        let still = ctx.body.velocity().x.abs() <= 0.0;
        if self.settings.must_release_to_move {
            self.stopped_since_crouch = still;
        }
        if !self.settings.can_move || self.settings.must_release_to_move {
            self.released_horizontal = ctx.status.axis.x == 0.0;
        }
    }

    fn on_state_changed(&mut self, ctx: &mut StateContext<'_>) {
        ctx.body.reset_collider();
        if ctx.current() == StateId::Jumping {
            self.end(ctx);
        }
    }

    fn poll(&mut self, ctx: &mut StateContext<'_>) {
        if !self.core.enabled || !ctx.status.is_enabled {
            return;
        }
        let axis = ctx.status.axis;
        let current = ctx.current();
        if axis.y == -1.0 {
            if ctx.is_on_surface()
                && !matches!(current, StateId::Ladder | StateId::Jumping | StateId::Knockback)
            {
                ctx.begin(StateId::Crouching);
            }
        } else if current == StateId::Crouching
            && self.can_exit(ctx)
            && (self.settings.rise_with_release || axis.y == 1.0)
        {
            self.exit(ctx);
        }

        if current == StateId::Crouching {
            if self.settings.can_move && ctx.body.velocity().x.abs() > 0.0 {
                if self.substate != CrouchSubstate::Moving {
                    self.substate = CrouchSubstate::Moving;
                    ctx.play_secondary(self.settings.moving_clip.as_deref(), false);
                }
            } else if self.substate != CrouchSubstate::Stopped {
                self.substate = CrouchSubstate::Stopped;
                self.play_animation(ctx);
            }
            if axis.x == 0.0 {
                self.released_horizontal = true;
            }
        }
    }

    fn update_movement(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.body.velocity().x == 0.0 {
            self.stopped_since_crouch = true;
            self.skid_complete = true;
        }
        if ctx.attacks.cancels(|c| c.crouch) && self.can_exit(ctx) {
            self.exit(ctx);
        }
    }

    fn play_animation_for_substate(&mut self, ctx: &mut StateContext<'_>) {
        match self.substate {
            CrouchSubstate::Stopped => self.play_animation(ctx),
            CrouchSubstate::Moving => {
                ctx.play_secondary(self.settings.moving_clip.as_deref(), false)
            }
        }
    }
}
