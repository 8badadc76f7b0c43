//! Controller domain: fixed-speed dashes with a minimum and maximum length.

use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::combat::ActionType;
use crate::controller::StateId;
use crate::controller::context::StateContext;
use crate::core::Horizontal;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DashSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub speed: f32,
    pub min_frames: u32,
    pub max_frames: u32,
    pub can_jump: bool,
    pub canceled_by_jump: bool,
    pub momentum_retained_on_jump: bool,
    pub can_change_direction: bool,
    pub canceled_by_direction_change: bool,
    pub require_hold_for_momentum: bool,
    pub can_start_in_air: bool,
    pub can_dash_from_ladders: bool,
    pub stop_on_landing: bool,
    pub max_air_dashes: u32,
    pub freeze_vertical_on_air_dash: bool,
    pub canceled_by_wall_contact: bool,
}

impl Default for DashSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            speed: 14.0,
            min_frames: 6,
            max_frames: 12,
            can_jump: true,
            canceled_by_jump: false,
            momentum_retained_on_jump: false,
            can_change_direction: false,
            canceled_by_direction_change: false,
            require_hold_for_momentum: false,
            can_start_in_air: true,
            can_dash_from_ladders: false,
            stop_on_landing: false,
            max_air_dashes: 1,
            freeze_vertical_on_air_dash: true,
            canceled_by_wall_contact: true,
        }
    }
}

#[derive(Debug, Clone)]
pub struct DashState {
    core: StateCore,
    pub settings: DashSettings,
    current_air_dash: u32,
    current_frame: u32,
    started_in_air: bool,
    released_since_dash: bool,
    allows_direction_change: bool,
}

impl DashState {
    pub fn new(settings: DashSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            current_air_dash: 0,
            current_frame: 0,
            started_in_air: false,
            released_since_dash: true,
            allows_direction_change: true,
        }
    }

    pub fn current_frame(&self) -> u32 {
        self.current_frame
    }

    pub fn air_dashes_used(&self) -> u32 {
        self.current_air_dash
    }

    fn should_cancel(&self, ctx: &mut StateContext<'_>, input: f32) -> bool {
        let settings = &self.settings;
        let facing = if input > 0.0 {
            Horizontal::Right
        } else {
            Horizontal::Left
        };
        let changed_direction = facing != ctx.status.direction && input != 0.0;
        let attack_cancels = ctx.attacks.cancels(|c| c.dash);

        let mut cancel = (self.current_frame >= settings.min_frames && !ctx.input.dash.down)
            || attack_cancels
            || self.current_frame >= settings.max_frames;

        if settings.can_change_direction && changed_direction {
            ctx.face_direction(facing);
            if settings.canceled_by_direction_change {
                cancel = true;
            }
        }

        if settings.momentum_retained_on_jump && !ctx.is_on_surface() {
            if settings.require_hold_for_momentum && input == 0.0 {
                cancel = true;
            } else if changed_direction && settings.canceled_by_direction_change {
                cancel = true;
            } else if !self.started_in_air {
                cancel = false;
            }
        }

        (settings.stop_on_landing && ctx.body.did_land_this_frame())
            || attack_cancels
            || (settings.canceled_by_wall_contact && ctx.body.is_against_either_wall())
            || cancel
    }

    fn continue_dash(&mut self, ctx: &mut StateContext<'_>, input: f32) {
        if ctx.input.dash.down || ctx.status.is_dashing {
            if ctx.status.is_dashing {
                self.current_frame += 1;
                if self.should_cancel(ctx, input) {
                    if !self.core.has_ended && ctx.current() == StateId::Dashing {
                        ctx.to_default();
                    }
                    self.end(ctx);
                    ctx.status.is_dashing = false;
                    ctx.body.set_velocity_x(0.0);
                } else {
                    let velocity = self.settings.speed * ctx.status.direction.sign();
                    ctx.body.set_velocity_x(velocity);
                    ctx.body.set_acceleration_cap_x(velocity);
                    if self.settings.freeze_vertical_on_air_dash
                        && self.started_in_air
                        && !ctx.is_on_surface()
                        && ctx.current() == StateId::Dashing
                    {
                        ctx.body.freeze_y_movement_for_single_frame();
                    }
                }
            }
        } else {
            self.released_since_dash = true;
        }

        if self.current_air_dash != 0 && ctx.is_on_surface() {
            self.current_air_dash = 0;
        }
    }
}

impl MovementState for DashState {
    fn id(&self) -> StateId {
        StateId::Dashing
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn can_initiate(&mut self, ctx: &mut StateContext<'_>) -> bool {
        let settings = &self.settings;
        let has_air_dash =
            settings.can_start_in_air && self.current_air_dash < settings.max_air_dashes;
        !ctx.status.is_dashing
            && !ctx.status.is_stunned
            && self.released_since_dash
            && !ctx.is_locked_for_attack(ActionType::Dashing)
            && (settings.can_dash_from_ladders || ctx.current() != StateId::Ladder)
            && (ctx.is_on_surface() || has_air_dash)
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        ctx.status.is_dashing = true;
        self.released_since_dash = false;
        self.current_frame = 0;
        let velocity = self.settings.speed * ctx.status.direction.sign();
        ctx.body.set_velocity_x(velocity);
        ctx.body.set_acceleration_cap_x(velocity);
        ctx.attacks.cancel_if(|c| c.on_dash);

        self.started_in_air = !ctx.is_on_surface();
        if self.started_in_air {
            self.current_air_dash += 1;
            if self.settings.freeze_vertical_on_air_dash {
                ctx.body.freeze_y_movement_for_single_frame();
            }
        }
    }

    fn on_ended(&mut self, ctx: &mut StateContext<'_>) {
        ctx.body.set_velocity_x(0.0);
        ctx.status.is_dashing = false;
        self.current_frame = 0;
    }

    fn on_state_changed(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.current() == StateId::Ladder {
            self.end(ctx);
        }
        if self.settings.canceled_by_jump && ctx.current() == StateId::Jumping {
            ctx.status.is_dashing = false;
        }
    }

    fn poll(&mut self, ctx: &mut StateContext<'_>) {
        self.allows_direction_change = !(ctx.status.is_dashing && !self.settings.can_change_direction);
        if ctx.input.dash.down {
            ctx.begin(StateId::Dashing);
        }
    }

    fn update_movement(&mut self, ctx: &mut StateContext<'_>) {
        let input = ctx.status.axis.x;
        self.continue_dash(ctx, input);
    }

    fn will_allow_direction_change(&self) -> bool {
        self.allows_direction_change
    }
}
