//! Controller domain: walking and running, layered under whatever state is current.

use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::combat::ActionType;
use crate::controller::StateId;
use crate::controller::context::StateContext;
use crate::core::Horizontal;

/// Moving along both axes at once scales each axis by this so overall speed holds.
const DIAGONAL_MULTIPLIER: f32 = 0.707;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovementSpeed {
    pub speed: f32,
    /// 0 snaps straight to `speed`.
    pub acceleration: f32,
    /// 0 stops immediately on release.
    pub deceleration: f32,
}

impl Default for MovementSpeed {
    fn default() -> Self {
        Self {
            speed: 8.0,
            acceleration: 0.0,
            deceleration: 0.0,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub walk: MovementSpeed,
    pub run: MovementSpeed,
    pub can_run: bool,
    pub run_can_start_in_air: bool,
    pub run_clip: Option<String>,
    /// Up and down input moves the body too, with gravity ignored for landing logic.
    pub can_move_vertically: bool,
    pub maintain_speed_on_diagonal: bool,
}

impl Default for MovingSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            walk: MovementSpeed::default(),
            run: MovementSpeed {
                speed: 12.0,
                ..MovementSpeed::default()
            },
            can_run: false,
            run_can_start_in_air: false,
            run_clip: None,
            can_move_vertically: false,
            maintain_speed_on_diagonal: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum MoveType {
    #[default]
    Walking,
    Running,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum MovementAxis {
    Horizontal,
    Vertical,
}

#[derive(Debug, Clone)]
pub struct MovingState {
    core: StateCore,
    pub settings: MovingSettings,
    move_type: MoveType,
    slowing_from_run: bool,
}

impl MovingState {
    pub fn new(settings: MovingSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            move_type: MoveType::Walking,
            slowing_from_run: false,
        }
    }

    pub fn is_running(&self) -> bool {
        self.move_type == MoveType::Running
    }

    fn apply_horizontal_jump(&self, ctx: &mut StateContext<'_>) {
        let velocity = self.settings.walk.speed * ctx.facts.jump_direction;
        ctx.body.set_acceleration_cap_x(velocity);
        ctx.body.set_velocity_x(velocity);
        ctx.body.set_acceleration_x(0.0);
        ctx.body.set_deceleration_x(0.0);
    }

    fn update_move_type(&mut self, ctx: &mut StateContext<'_>, input: f32) -> bool {
        let on_surface = ctx.is_on_surface();
        let run_held = self.settings.can_run && ctx.input.run.down;
        let walk_speed = self.settings.walk.speed;

        let is_running = run_held
            && (on_surface || self.settings.run_can_start_in_air || self.is_running());
        if is_running {
            self.slowing_from_run = false;
            if self.settings.run_clip.is_some()
                && !self.is_running()
                && input != 0.0
                && on_surface
                && ctx.current() == StateId::Moving
            {
                ctx.play_secondary(self.settings.run_clip.as_deref(), self.turn_has_priority());
            }
            self.move_type = MoveType::Running;
        } else {
            if self.is_running() && ctx.body.velocity().x.abs() > walk_speed {
                self.slowing_from_run = true;
                self.play_animation(ctx);
            }
            self.move_type = MoveType::Walking;
        }

        if ctx.body.velocity().x.abs() <= walk_speed {
            self.slowing_from_run = false;
        }
        is_running
    }

    fn can_play_animation(&self, ctx: &StateContext<'_>, axis: MovementAxis) -> bool {
        let can_move_vertically = self.settings.can_move_vertically;
        let grounded_move = ctx.is_on_surface() && !can_move_vertically;
        let free_move = can_move_vertically && axis == MovementAxis::Horizontal;
        (grounded_move || free_move)
            && !matches!(
                ctx.current(),
                StateId::Moving | StateId::Jumping | StateId::Ladder | StateId::Crouching
            )
    }

    fn apply_movement(&mut self, ctx: &mut StateContext<'_>, input: f32, axis: MovementAxis) {
        let on_surface = ctx.is_on_surface();
        let locked = ctx.is_locked_for_attack(if on_surface {
            ActionType::GroundMoving
        } else {
            ActionType::AirMoving
        });
        let is_running = self.update_move_type(ctx, input);

        if ctx.status.is_dashing
            || ctx.status.is_knockback_active
            || ctx.status.is_stunned
            || ctx.current() == StateId::WallCling
        {
            return;
        }

        if !on_surface && ctx.facts.jump_horizontal_frozen {
            self.apply_horizontal_jump(ctx);
            return;
        }

        let settings = &self.settings;
        let (base_speed, base_acceleration) = if is_running {
            (settings.run.speed, settings.run.acceleration)
        } else {
            (settings.walk.speed, settings.walk.acceleration)
        };
        let base_deceleration = if is_running || self.slowing_from_run {
            settings.run.deceleration
        } else {
            settings.walk.deceleration
        };
        let diagonal = settings.can_move_vertically
            && settings.maintain_speed_on_diagonal
            && ctx.status.axis.x != 0.0
            && ctx.status.axis.y != 0.0;
        let multiplier = if diagonal { DIAGONAL_MULTIPLIER } else { 1.0 };
        let mut speed = base_speed * multiplier;
        let mut acceleration = base_acceleration * multiplier;
        let mut deceleration = base_deceleration;

        let crouching = ctx.current() == StateId::Crouching;
        if crouching && ctx.facts.crouch_skid_complete {
            if !ctx.facts.crouch_accelerates_on_move {
                acceleration = 0.0;
                deceleration = 0.0;
            }
            speed = ctx.facts.crouch_move_speed;
        }
        let overridden_by_crouch = crouching && !ctx.facts.crouch_allows_movement;
        let can_move_vertically = settings.can_move_vertically;

        if input != 0.0
            && !ctx.status.is_knockback_active
            && !locked
            && !overridden_by_crouch
            && !self.slowing_from_run
        {
            if axis == MovementAxis::Horizontal {
                let direction = if input > 0.0 {
                    Horizontal::Right
                } else {
                    Horizontal::Left
                };
                ctx.face_direction(direction);
            }
            self.core.has_ended = false;
            if self.can_play_animation(ctx, axis) {
                ctx.begin(StateId::Moving);
            }
            ctx.attacks.cancel_if(|c| c.on_move);

            let body = &mut *ctx.body;
            match (axis, acceleration != 0.0) {
                (MovementAxis::Horizontal, true) => {
                    body.set_acceleration_cap_x(speed * input);
                    body.set_acceleration_x(acceleration * input);
                    body.set_deceleration_x(0.0);
                }
                (MovementAxis::Horizontal, false) => {
                    body.set_acceleration_cap_x(speed * input);
                    body.set_velocity_x(speed * input);
                    body.set_acceleration_x(0.0);
                    body.set_deceleration_x(0.0);
                }
                (MovementAxis::Vertical, true) => {
                    body.set_acceleration_cap_y(speed * input);
                    body.set_acceleration_y(acceleration * input);
                    body.set_deceleration_y(0.0);
                }
                (MovementAxis::Vertical, false) => {
                    body.set_acceleration_cap_y(speed * input);
                    body.set_velocity_y(speed * input);
                    body.set_acceleration_y(0.0);
                    body.set_deceleration_y(0.0);
                }
            }
            return;
        }

        let can_settle = on_surface || can_move_vertically;
        match axis {
            MovementAxis::Horizontal if deceleration != 0.0 => {
                ctx.body.set_acceleration_x(0.0);
                ctx.body.set_deceleration_x(deceleration);
                if ctx.body.velocity().x.abs() <= 0.0 && can_settle {
                    if !self.core.has_ended
                        && !ctx.status.is_knockback_active
                        && ctx.current() != StateId::Ladder
                    {
                        ctx.to_default();
                    }
                    self.end(ctx);
                }
            }
            MovementAxis::Horizontal => {
                ctx.body.set_acceleration_x(0.0);
                ctx.body.set_deceleration_x(0.0);
                ctx.body.set_velocity_x(0.0);
                if !self.core.has_ended
                    && !ctx.status.is_knockback_active
                    && ctx.current() != StateId::Ladder
                    && can_settle
                    && !crouching
                {
                    ctx.to_default();
                }
                self.end(ctx);
            }
            MovementAxis::Vertical if deceleration != 0.0 => {
                ctx.body.set_acceleration_y(0.0);
                ctx.body.set_deceleration_y(deceleration);
            }
            MovementAxis::Vertical => {
                ctx.body.set_acceleration_y(0.0);
                ctx.body.set_deceleration_y(0.0);
                ctx.body.set_velocity_y(0.0);
            }
        }
    }
}

impl MovementState for MovingState {
    fn id(&self) -> StateId {
        StateId::Moving
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn on_begin(&mut self, _ctx: &mut StateContext<'_>) {
        self.slowing_from_run = false;
        self.move_type = MoveType::Walking;
    }

    fn on_ended(&mut self, _ctx: &mut StateContext<'_>) {
        self.slowing_from_run = false;
        self.move_type = MoveType::Walking;
    }

    fn on_state_changed(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.current() == StateId::Ladder {
            self.end(ctx);
        }
    }

    fn update_movement(&mut self, ctx: &mut StateContext<'_>) {
        let axis = ctx.status.axis;
        self.apply_movement(ctx, axis.x, MovementAxis::Horizontal);
        if self.settings.can_move_vertically {
            self.apply_movement(ctx, axis.y, MovementAxis::Vertical);
        }
    }

    fn turn_has_priority(&self) -> bool {
        true
    }

    fn play_animation_for_substate(&mut self, ctx: &mut StateContext<'_>) {
        if self.is_running() && self.settings.run_clip.is_some() {
            ctx.play_secondary(self.settings.run_clip.as_deref(), self.turn_has_priority());
        } else {
            self.play_animation(ctx);
        }
    }
}
