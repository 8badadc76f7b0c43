//! Controller domain: the three states every controller has.

use super::{MovementState, StateCore};
use crate::controller::StateId;
use crate::controller::context::StateContext;
use crate::core::{Countdown, secs_to_ticks};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
enum IdlePhase {
    #[default]
    Waiting,
    Playing,
}

/// Standing still. Plays the idle clip after a stretch of inactivity.
#[derive(Debug, Clone)]
pub struct DefaultState {
    core: StateCore,
    idle_clip: Option<String>,
    idle_phase: IdlePhase,
    idle: Countdown,
}

impl DefaultState {
    pub fn new(clip: Option<String>, idle_clip: Option<String>) -> Self {
        Self {
            core: StateCore::new(clip, true),
            idle_clip,
            idle_phase: IdlePhase::Waiting,
            idle: Countdown::default(),
        }
    }

    pub fn is_idling(&self) -> bool {
        self.idle_phase == IdlePhase::Playing && self.idle.is_active()
    }

    fn start_waiting(&mut self, ctx: &StateContext<'_>) {
        self.idle_phase = IdlePhase::Waiting;
        self.idle = if self.idle_clip.is_some() {
            Countdown::from_secs(ctx.settings.idle_timeout, ctx.fixed_dt)
        } else {
            Countdown::default()
        };
    }

    fn cancel_idle(&mut self) {
        self.idle.cancel();
        self.idle_phase = IdlePhase::Waiting;
    }
}

impl MovementState for DefaultState {
    fn id(&self) -> StateId {
        StateId::Default
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        self.start_waiting(ctx);
    }

    fn on_ended(&mut self, _ctx: &mut StateContext<'_>) {
        self.cancel_idle();
    }

    fn on_state_changed(&mut self, _ctx: &mut StateContext<'_>) {
        self.cancel_idle();
    }

    fn fixed_update(&mut self, ctx: &mut StateContext<'_>) {
        if ctx.current() != StateId::Default || !self.idle.tick() {
            return;
        }
        match self.idle_phase {
            IdlePhase::Waiting => {
                let clip = self.idle_clip.as_deref();
                ctx.play_secondary(clip, self.turn_has_priority());
                let length = ctx.clip_length(clip).unwrap_or(0.0);
                self.idle = Countdown::from_ticks(secs_to_ticks(length, ctx.fixed_dt).max(1));
                self.idle_phase = IdlePhase::Playing;
            }
            IdlePhase::Playing => {
                self.play_animation(ctx);
                self.start_waiting(ctx);
            }
        }
    }

    fn turn_has_priority(&self) -> bool {
        true
    }
}

#[derive(Debug, Clone)]
pub struct FallingState {
    core: StateCore,
}

impl FallingState {
    pub fn new(clip: Option<String>) -> Self {
        Self {
            core: StateCore::new(clip, true),
        }
    }
}

impl MovementState for FallingState {
    fn id(&self) -> StateId {
        StateId::Falling
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn turn_has_priority(&self) -> bool {
        true
    }
}

/// Terminal until the controller is revived. Disables the body on entry.
#[derive(Debug, Clone)]
pub struct DeathState {
    core: StateCore,
}

impl DeathState {
    pub fn new(clip: Option<String>) -> Self {
        Self {
            core: StateCore::new(clip, false),
        }
    }
}

impl MovementState for DeathState {
    fn id(&self) -> StateId {
        StateId::Death
    }

    fn core(&self) -> &StateCore {
        &self.core
    }

    fn core_mut(&mut self) -> &mut StateCore {
        &mut self.core
    }

    fn on_begin(&mut self, ctx: &mut StateContext<'_>) {
        ctx.body.set_enabled(false);
    }

    fn will_allow_direction_change(&self) -> bool {
        false
    }
}
