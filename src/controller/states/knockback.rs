//! Controller domain: being knocked away from a damage source.

use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::controller::StateId;
use crate::controller::context::StateContext;
use crate::core::{Countdown, Horizontal};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct KnockbackSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub speed: f32,
    /// Upward speed given on the first tick; 0 keeps the body level.
    pub vertical_speed: f32,
    pub duration_frames: u32,
}

impl Default for KnockbackSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            speed: 6.0,
            vertical_speed: 4.0,
            duration_frames: 12,
        }
    }
}

#[derive(Debug, Clone)]
pub struct KnockbackState {
    core: StateCore,
    pub settings: KnockbackSettings,
    direction: Horizontal,
    remaining: Countdown,
}

impl KnockbackState {
    pub fn new(settings: KnockbackSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            direction: Horizontal::Left,
            remaining: Countdown::default(),
        }
    }

    /// Direction the body will be pushed on the next knockback.
    pub fn set_direction(&mut self, direction: Horizontal) {
        self.direction = direction;
    }

    pub fn direction(&self) -> Horizontal {
        self.direction
    }

    pub fn remaining_ticks(&self) -> u32 {
        self.remaining.remaining()
    }
}

impl MovementState for KnockbackState {
    fn id(&self) -> StateId {
        StateId::Knockback
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        ctx.attacks.cancel_if(|c| c.on_knockback);
        self.remaining = Countdown::from_ticks(self.settings.duration_frames.max(1));
        ctx.body.set_velocity_x(self.settings.speed * self.direction.sign());
        ctx.body.set_acceleration_x(0.0);
        ctx.body.set_deceleration_x(0.0);
        if self.settings.vertical_speed != 0.0 {
            let g = ctx.gravity_sign();
            ctx.body.set_velocity_y(self.settings.vertical_speed * g);
        }
    }

    fn on_ended(&mut self, ctx: &mut StateContext<'_>) {
        self.remaining.cancel();
        if ctx.current() != StateId::Knockback {
            ctx.status.is_knockback_active = false;
        }
    }

    fn on_state_changed(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.current() != StateId::Knockback {
            ctx.status.is_knockback_active = false;
            self.remaining.cancel();
        }
    }

    fn fixed_update(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.current() != StateId::Knockback || !self.remaining.is_active() {
            return;
        }
        if self.remaining.tick() {
            ctx.status.is_knockback_active = false;
            ctx.body.set_velocity_x(0.0);
            self.end(ctx);
            ctx.to_default();
        }
    }

    fn will_allow_direction_change(&self) -> bool {
        false
    }
}
