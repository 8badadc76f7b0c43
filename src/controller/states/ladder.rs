//! Controller domain: mounting, climbing and leaving ladders.
//!
//! Ladders are terrain colliders on the `Ladder` layer. They never block
//! movement; the state tracks overlap with them itself each poll.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::combat::ActionType;
use crate::controller::StateId;
use crate::controller::context::{FRAMES_SINCE_DROP_CAP, Request, StateContext};
use crate::physics::{Aabb, ColliderId, GameLayer, mask_of, surface_collider_with_layer};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LadderSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub climb_speed: f32,
    pub can_turn: bool,
    pub moving_clip: Option<String>,
    pub cresting_clip: Option<String>,
    /// Distance inside each end of the ladder where the crest begins.
    pub crest_buffer: f32,
    /// Maximum horizontal distance from the ladder's center to mount it.
    pub centering_tolerance: f32,
    pub top_buffer: f32,
    /// How far into the ladder a mount from the top places the body.
    pub mount_from_top_shift: f32,
}

impl Default for LadderSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            climb_speed: 5.0,
            can_turn: true,
            moving_clip: None,
            cresting_clip: None,
            crest_buffer: 0.15,
            centering_tolerance: 0.675,
            top_buffer: 0.1,
            mount_from_top_shift: 0.25,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum LadderSubstate {
    #[default]
    Stopped,
    Moving,
    Cresting,
    Attacking,
}

#[derive(Debug, Clone, Copy, PartialEq)]
struct ActiveLadder {
    x: f32,
    top_crest: f32,
    bottom_crest: f32,
}

#[derive(Debug, Clone)]
pub struct LadderState {
    core: StateCore,
    pub settings: LadderSettings,
    substate: LadderSubstate,
    is_touching: bool,
    is_climbing: bool,
    allows_direction_change: bool,
    overlapping: Option<ColliderId>,
    ladder: Option<ActiveLadder>,
}

impl LadderState {
    pub fn new(settings: LadderSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            substate: LadderSubstate::Stopped,
            is_touching: false,
            is_climbing: false,
            allows_direction_change: true,
            overlapping: None,
            ladder: None,
        }
    }

    pub fn is_climbing(&self) -> bool {
        self.is_climbing
    }

    pub fn is_touching(&self) -> bool {
        self.is_touching
    }

    fn set_ladder_values(&mut self, bounds: Aabb, x: f32) {
        let crest = self.settings.crest_buffer;
        self.ladder = Some(ActiveLadder {
            x,
            top_crest: bounds.max.y - crest,
            bottom_crest: bounds.min.y + crest,
        });
    }

    fn is_centered(&self, ctx: &StateContext<'_>) -> bool {
        self.ladder.is_some_and(|ladder| {
            (ctx.body.position().x - ladder.x).abs() < self.settings.centering_tolerance
        })
    }

    fn detect_overlaps(&mut self, ctx: &mut StateContext<'_>) {
        let touching = ctx
            .terrain
            .overlapping(ctx.body.aabb(), mask_of(&[GameLayer::Ladder]))
            .next()
            .map(|c| (c.id, c.aabb(), c.center.x));
        let next = touching.map(|(id, _, _)| id);
        if next == self.overlapping {
            return;
        }
        if let Some(previous) = self.overlapping {
            let bounds = ctx.terrain.get(previous).map(|c| c.aabb());
            self.on_ladder_left(ctx, bounds);
        }
        self.overlapping = next;
        if let Some((_, bounds, x)) = touching {
            self.on_ladder_touched(ctx, bounds, x);
        }
    }

    fn on_ladder_touched(&mut self, ctx: &StateContext<'_>, ladder: Aabb, x: f32) {
        let bounds = ctx.body.aabb();
        let buffer = self.settings.top_buffer;
        let on_top = if ctx.gravity_sign() > 0.0 {
            bounds.min.y >= ladder.max.y - buffer
        } else {
            bounds.max.y <= ladder.min.y + buffer
        };
        if !on_top {
            self.is_touching = true;
            self.set_ladder_values(ladder, x);
        }
    }

    fn on_ladder_left(&mut self, ctx: &mut StateContext<'_>, ladder: Option<Aabb>) {
        if self.is_touching
            && self.core.enabled
            && self.is_climbing
            && let Some(ladder) = ladder
        {
            self.on_ladder_exited(ctx, ladder);
        }
        self.is_climbing = false;
        self.allows_direction_change = true;
        self.is_touching = false;
    }

    fn on_ladder_exited(&mut self, ctx: &mut StateContext<'_>, ladder: Aabb) {
        let g = ctx.gravity_sign();
        let bounds = ctx.body.aabb();
        let on_top = if g > 0.0 {
            bounds.min.y >= ladder.max.y
        } else {
            bounds.max.y <= ladder.min.y
        };
        if on_top {
            self.is_climbing = false;
            self.allows_direction_change = true;
            self.core.has_ended = true;
            ctx.body.set_velocity_y(0.0);
            let half = ctx.body.size().y * 0.5;
            let shift = ctx.body.offset().y * g;
            let y = if g > 0.0 {
                ladder.max.y + half - shift
            } else {
                ladder.min.y - half - shift
            };
            let x = ctx.body.position().x;
            ctx.body.set_position(Vec2::new(x, y));
        }
        ctx.to_default();
    }

    fn check_ladders(&mut self, ctx: &mut StateContext<'_>, input: f32) {
        let g = ctx.gravity_sign();
        if self.is_climbing
            && self.core.enabled
            && let Some(ladder) = self.ladder
        {
            let bounds = ctx.body.aabb();
            let buffer = self.settings.top_buffer;
            let on_top = if g > 0.0 {
                bounds.min.y >= ladder.top_crest - buffer
            } else {
                bounds.max.y <= ladder.bottom_crest + buffer
            };
            if !on_top {
                self.is_touching = true;
            }
        }

        if !self.core.enabled && self.is_climbing {
            self.drop(ctx);
        }
        if !self.core.enabled || ctx.status.frames_since_drop < FRAMES_SINCE_DROP_CAP {
            return;
        }

        let locked = ctx.is_locked_for_attack(ActionType::Climbing);
        if self.is_touching {
            if input == 1.0
                && !locked
                && !ctx.status.is_knockback_active
                && !ctx.status.is_stunned
                && !self.is_climbing
                && self.is_centered(ctx)
            {
                ctx.begin(StateId::Ladder);
                ctx.body.set_velocity_x(0.0);
                self.is_climbing = true;
                self.allows_direction_change = false;
            } else if ctx.input.jump.pressed_this_frame && self.is_climbing {
                self.drop(ctx);
            } else if input == -1.0 && ctx.is_on_surface() && self.is_climbing {
                self.end(ctx);
            }
            return;
        }

        if ctx.status.is_knockback_active || input != -1.0 || locked {
            return;
        }
        // Standing on top of a ladder and pressing down climbs onto it.
        let below = surface_collider_with_layer(ctx.body, ctx.terrain, GameLayer::Ladder, ctx.world_down())
            .and_then(|id| ctx.terrain.get(id))
            .map(|c| (c.aabb(), c.center.x));
        let Some((bounds, x)) = below else {
            return;
        };
        self.set_ladder_values(bounds, x);
        if !self.is_centered(ctx) {
            return;
        }
        let y = ctx.body.position().y;
        ctx.body.set_position(Vec2::new(x, y));
        ctx.body.set_velocity_x(0.0);
        self.is_climbing = true;
        self.allows_direction_change = false;
        ctx.begin(StateId::Ladder);
        let shifted = y - self.settings.mount_from_top_shift * g;
        ctx.body.set_position(Vec2::new(x, shifted));
    }

    /// Lets go of the ladder mid-climb.
    fn drop(&mut self, ctx: &mut StateContext<'_>) {
        self.substate = LadderSubstate::Stopped;
        self.is_climbing = false;
        self.allows_direction_change = true;
        self.core.has_ended = true;
        ctx.status.frames_since_drop = 0;
        ctx.request(Request::LadderExited);
        ctx.to_default();
    }

    fn set_substate(&mut self, ctx: &mut StateContext<'_>, substate: LadderSubstate) {
        if self.substate != substate && !ctx.is_attacking() {
            match substate {
                LadderSubstate::Cresting => {
                    ctx.play_secondary(self.settings.cresting_clip.as_deref(), false)
                }
                LadderSubstate::Moving => {
                    ctx.play_secondary(self.settings.moving_clip.as_deref(), false)
                }
                LadderSubstate::Stopped | LadderSubstate::Attacking => self.play_animation(ctx),
            }
        }
        self.substate = substate;
    }
}

impl MovementState for LadderState {
    fn id(&self) -> StateId {
        StateId::Ladder
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn on_ended(&mut self, ctx: &mut StateContext<'_>) {
        self.substate = LadderSubstate::Stopped;
        ctx.status.aerial_peak = ctx.body.position().y;
        self.is_climbing = false;
        self.allows_direction_change = true;
        ctx.to_default();
    }

    fn poll(&mut self, ctx: &mut StateContext<'_>) {
        self.allows_direction_change = !(!self.settings.can_turn && self.is_climbing);
        self.detect_overlaps(ctx);
        let input = ctx.status.axis.y;
        self.check_ladders(ctx, input);
    }

    fn update_movement(&mut self, ctx: &mut StateContext<'_>) {
        if self.is_climbing {
            ctx.body.freeze_gravity_for_single_frame();
            ctx.body.set_velocity_x(0.0);
            ctx.body.freeze_x_movement_for_single_frame();
        }
        if !(self.is_touching && self.is_climbing) {
            return;
        }
        let Some(ladder) = self.ladder else {
            return;
        };

        let g = ctx.gravity_sign();
        let y = ctx.body.position().y;
        ctx.body.set_position(Vec2::new(ladder.x, y));
        let axis = ctx.status.axis.y;
        ctx.body.set_velocity_y(self.settings.climb_speed * axis * g);

        let at_crest = if g > 0.0 {
            y >= ladder.top_crest
        } else {
            y <= ladder.bottom_crest
        };
        let substate = if at_crest {
            LadderSubstate::Cresting
        } else if axis != 0.0 {
            LadderSubstate::Moving
        } else {
            LadderSubstate::Stopped
        };
        self.set_substate(ctx, substate);
        if ctx.is_attacking() {
            self.substate = LadderSubstate::Attacking;
        }
    }

    fn will_allow_direction_change(&self) -> bool {
        self.allows_direction_change
    }

    fn play_animation_for_substate(&mut self, ctx: &mut StateContext<'_>) {
        match self.substate {
            LadderSubstate::Cresting => {
                ctx.play_secondary(self.settings.cresting_clip.as_deref(), false)
            }
            LadderSubstate::Moving => ctx.play_secondary(self.settings.moving_clip.as_deref(), false),
            LadderSubstate::Stopped | LadderSubstate::Attacking => self.play_animation(ctx),
        }
    }
}
