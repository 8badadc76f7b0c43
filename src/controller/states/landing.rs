//! Controller domain: the short recovery after touching down from a fall.

use serde::{Deserialize, Serialize};

use super::{MovementState, StateCore};
use crate::controller::StateId;
use crate::controller::context::StateContext;
use crate::core::{Countdown, secs_to_ticks};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct LandingSettings {
    pub clip: Option<String>,
    pub knockback_enabled: bool,
    pub stunned_clip: Option<String>,
    /// Falls at least this long stun the actor; 0 disables the stun.
    pub fall_distance_for_stun: f32,
}

impl Default for LandingSettings {
    fn default() -> Self {
        Self {
            clip: None,
            knockback_enabled: true,
            stunned_clip: None,
            fall_distance_for_stun: 0.0,
        }
    }
}

#[derive(Debug, Clone)]
pub struct LandingState {
    core: StateCore,
    pub settings: LandingSettings,
    will_stun: bool,
    remaining: Countdown,
}

impl LandingState {
    pub fn new(settings: LandingSettings) -> Self {
        Self {
            core: StateCore::new(settings.clip.clone(), settings.knockback_enabled),
            settings,
            will_stun: false,
            remaining: Countdown::default(),
        }
    }

    /// Decides whether the upcoming landing stuns, from how far the actor fell.
    pub fn check_stun(&mut self, distance_fallen: f32) {
        let threshold = self.settings.fall_distance_for_stun;
        self.will_stun = threshold.abs() > 0.0 && distance_fallen >= threshold;
    }

    pub fn will_stun(&self) -> bool {
        self.will_stun
    }
}

impl MovementState for LandingState {
    fn id(&self) -> StateId {
        StateId::Landing
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn plays_animation_on_begin(&self) -> bool {
        false
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        if self.will_stun {
            ctx.stun();
        }
        let stunned_clip = self.settings.stunned_clip.as_deref().filter(|_| self.will_stun);
        let clip = stunned_clip.or(self.core.clip.as_deref());
        let length = ctx.clip_length(clip).unwrap_or(0.0);
        if stunned_clip.is_some() {
            ctx.play_secondary(stunned_clip, false);
        } else {
            self.play_animation(ctx);
        }
        self.remaining = Countdown::from_ticks(secs_to_ticks(length, ctx.fixed_dt).max(1));
    }

    fn on_ended(&mut self, ctx: &mut StateContext<'_>) {
        self.remaining.cancel();
        ctx.to_default();
    }

    fn on_state_changed(&mut self, _ctx: &mut StateContext<'_>) {
        self.remaining.cancel();
    }

    fn fixed_update(&mut self, ctx: &mut StateContext<'_>) {
        if self.remaining.tick() {
            self.end(ctx);
        }
    }
}
