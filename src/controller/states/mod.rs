//! Controller domain: the fixed set of movement states and the hooks they share.
//!
//! Every state implements `MovementState`. The controller owns one `StateSet`
//! and addresses states by `StateId`; states never hold references to each
//! other. When a state needs to know something about a sibling it reads the
//! `StateFacts` snapshot on its context, and when it needs a sibling to act it
//! pushes a `Request`.

mod basic;
mod bounce;
mod crouch;
mod dash;
mod jump;
mod knockback;
mod ladder;
mod landing;
mod moving;
mod wall_cling;

pub use basic::{DeathState, DefaultState, FallingState};
pub use bounce::{BounceSettings, BounceState};
pub use crouch::{CrouchSettings, CrouchState};
pub use dash::{DashSettings, DashState};
pub use jump::{JumpSettings, JumpState, JumpSubstate, JumpType};
pub use knockback::{KnockbackSettings, KnockbackState};
pub use ladder::{LadderSettings, LadderState};
pub use landing::{LandingSettings, LandingState};
pub use moving::{MovementSpeed, MovingSettings, MovingState};
pub use wall_cling::{WallClingSettings, WallClingState, WallClingSubstate};

use super::StateId;
use super::context::StateContext;
use super::settings::{ControllerSettings, StateSettings};

/// Bookkeeping every state carries.
#[derive(Debug, Clone, PartialEq)]
pub struct StateCore {
    pub enabled: bool,
    pub has_ended: bool,
    /// Whether knockback may interrupt this state while it is current.
    pub knockback_enabled: bool,
    pub clip: Option<String>,
}

impl StateCore {
    pub fn new(clip: Option<String>, knockback_enabled: bool) -> Self {
        Self {
            enabled: true,
            has_ended: false,
            knockback_enabled,
            clip,
        }
    }
}

/// Hooks the controller drives. Defaults do nothing.
pub trait MovementState: Send + Sync {
    fn id(&self) -> StateId;

    fn core(&self) -> &StateCore;

    fn core_mut(&mut self) -> &mut StateCore;

    /// Admission check run before the controller is asked to switch.
    /// May update counters, so it takes `&mut self`.
    fn can_initiate(&mut self, _ctx: &mut StateContext<'_>) -> bool {
        true
    }

    fn on_begin(&mut self, _ctx: &mut StateContext<'_>) {}

    fn on_ended(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Called on the outgoing state after the controller switched.
    fn on_state_changed(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Per-tick movement, run for the current state and every concurrent state.
    fn update_movement(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Per-tick bookkeeping, run for every enabled state.
    fn fixed_update(&mut self, _ctx: &mut StateContext<'_>) {}

    /// Input polling, run once per tick before `fixed_update`.
    fn poll(&mut self, _ctx: &mut StateContext<'_>) {}

    fn will_allow_direction_change(&self) -> bool {
        true
    }

    /// When true, a turn in progress keeps playing instead of this state's clips.
    fn turn_has_priority(&self) -> bool {
        false
    }

    fn plays_animation_on_begin(&self) -> bool {
        true
    }

    fn play_animation(&self, ctx: &mut StateContext<'_>) {
        ctx.play_state_clip(self.core().clip.as_deref(), self.turn_has_priority());
    }

    fn play_animation_for_substate(&mut self, ctx: &mut StateContext<'_>) {
        self.play_animation(ctx);
    }

    fn end(&mut self, ctx: &mut StateContext<'_>) {
        self.core_mut().has_ended = true;
        self.on_ended(ctx);
    }
}

/// Read-only view of sibling states, refreshed before every state callback.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct StateFacts {
    pub has_jump: bool,
    pub wall_jump_possible: bool,
    pub crouch_can_exit: bool,
    pub crouch_can_jump: bool,
    pub crouch_allows_movement: bool,
    pub crouch_skid_complete: bool,
    pub crouch_accelerates_on_move: bool,
    pub crouch_move_speed: f32,
    pub jump_active: bool,
    pub jump_can_end: bool,
    pub jump_horizontal_frozen: bool,
    /// -1, 0 or 1; 0 means a frozen jump goes straight up.
    pub jump_direction: f32,
    pub dash_can_jump: bool,
    pub can_move_vertically: bool,
    pub walk_speed: f32,
    pub walk_deceleration: f32,
    pub current_allows_direction_change: bool,
    pub current_turn_priority: bool,
}

/// Storage for one controller's states. Default, Falling and Death always exist.
#[derive(Debug, Clone)]
pub struct StateSet {
    pub default: DefaultState,
    pub falling: FallingState,
    pub death: DeathState,
    pub landing: Option<LandingState>,
    pub moving: Option<MovingState>,
    pub jump: Option<JumpState>,
    pub dash: Option<DashState>,
    pub ladder: Option<LadderState>,
    pub wall_cling: Option<WallClingState>,
    pub crouch: Option<CrouchState>,
    pub knockback: Option<KnockbackState>,
    pub bounce: Option<BounceState>,
}

impl StateSet {
    pub fn new(settings: &ControllerSettings, states: &StateSettings) -> Self {
        let clips = &settings.clips;
        Self {
            default: DefaultState::new(clips.default.clone(), clips.idle.clone()),
            falling: FallingState::new(clips.falling.clone()),
            death: DeathState::new(clips.death.clone()),
            landing: states.landing.clone().map(LandingState::new),
            moving: states.moving.clone().map(MovingState::new),
            jump: states.jump.clone().map(JumpState::new),
            dash: states.dash.clone().map(DashState::new),
            ladder: states.ladder.clone().map(LadderState::new),
            wall_cling: states.wall_cling.clone().map(WallClingState::new),
            crouch: states.crouch.clone().map(CrouchState::new),
            knockback: states.knockback.clone().map(KnockbackState::new),
            bounce: states.bounce.clone().map(BounceState::new),
        }
    }

    pub fn contains(&self, id: StateId) -> bool {
        self.get(id).is_some()
    }

    pub fn get(&self, id: StateId) -> Option<&dyn MovementState> {
        match id {
            StateId::Default => Some(&self.default),
            StateId::Falling => Some(&self.falling),
            StateId::Death => Some(&self.death),
            StateId::Landing => self.landing.as_ref().map(|s| s as &dyn MovementState),
            StateId::Moving => self.moving.as_ref().map(|s| s as &dyn MovementState),
            StateId::Jumping => self.jump.as_ref().map(|s| s as &dyn MovementState),
            StateId::Dashing => self.dash.as_ref().map(|s| s as &dyn MovementState),
            StateId::Ladder => self.ladder.as_ref().map(|s| s as &dyn MovementState),
            StateId::WallCling => self.wall_cling.as_ref().map(|s| s as &dyn MovementState),
            StateId::Crouching => self.crouch.as_ref().map(|s| s as &dyn MovementState),
            StateId::Knockback => self.knockback.as_ref().map(|s| s as &dyn MovementState),
            StateId::Bouncing => self.bounce.as_ref().map(|s| s as &dyn MovementState),
        }
    }

    pub fn get_mut(&mut self, id: StateId) -> Option<&mut dyn MovementState> {
        match id {
            StateId::Default => Some(&mut self.default),
            StateId::Falling => Some(&mut self.falling),
            StateId::Death => Some(&mut self.death),
            StateId::Landing => self.landing.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::Moving => self.moving.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::Jumping => self.jump.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::Dashing => self.dash.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::Ladder => self.ladder.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::WallCling => self.wall_cling.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::Crouching => self.crouch.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::Knockback => self.knockback.as_mut().map(|s| s as &mut dyn MovementState),
            StateId::Bouncing => self.bounce.as_mut().map(|s| s as &mut dyn MovementState),
        }
    }

    pub fn is_enabled(&self, id: StateId) -> bool {
        self.get(id).is_some_and(|s| s.core().enabled)
    }

    pub fn facts(&self, ctx: &StateContext<'_>) -> StateFacts {
        let current = self.get(ctx.status.current);
        let moving = self.moving.as_ref().map(|m| &m.settings);
        StateFacts {
            has_jump: self.jump.is_some(),
            wall_jump_possible: self
                .wall_cling
                .as_ref()
                .is_some_and(|w| w.is_wall_jump_possible()),
            crouch_can_exit: self.crouch.as_ref().is_none_or(|c| c.can_exit(ctx)),
            crouch_can_jump: self.crouch.as_ref().is_some_and(|c| c.settings.can_jump),
            crouch_allows_movement: self
                .crouch
                .as_ref()
                .is_none_or(|c| c.will_allow_movement()),
            crouch_skid_complete: self.crouch.as_ref().is_some_and(|c| c.is_skid_complete()),
            crouch_accelerates_on_move: self
                .crouch
                .as_ref()
                .is_some_and(|c| c.settings.allow_acceleration_on_move),
            crouch_move_speed: self.crouch.as_ref().map_or(0.0, |c| c.settings.move_speed),
            jump_active: self.jump.as_ref().is_some_and(|j| j.is_jump_active()),
            jump_can_end: self.jump.as_ref().is_none_or(|j| j.can_end()),
            jump_horizontal_frozen: self
                .jump
                .as_ref()
                .is_some_and(|j| j.is_horizontal_movement_frozen()),
            jump_direction: self.jump.as_ref().map_or(0.0, |j| j.direction()),
            dash_can_jump: self.dash.as_ref().is_none_or(|d| d.settings.can_jump),
            can_move_vertically: moving.is_some_and(|m| m.can_move_vertically),
            walk_speed: moving.map_or(0.0, |m| m.walk.speed),
            walk_deceleration: moving.map_or(0.0, |m| m.walk.deceleration),
            current_allows_direction_change: current
                .is_none_or(|s| s.will_allow_direction_change()),
            current_turn_priority: current.is_some_and(|s| s.turn_has_priority()),
        }
    }
}
