//! Controller domain: shared status, outgoing events and the context handed to states.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::StateId;
use super::input::InputSnapshot;
use super::settings::ControllerSettings;
use super::states::StateFacts;
use crate::animation::Animator;
use crate::combat::{ActionType, AttackContext, AttackSet};
use crate::core::{
    Countdown, Horizontal, Vertical, gravity_sign, secs_to_ticks, world_down, world_up,
};
use crate::physics::{KinematicBody, Terrain};

/// Ticks counted after a ladder drop before the counter stops.
pub(crate) const FRAMES_SINCE_DROP_CAP: u32 = 10;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub(crate) enum TurnKind {
    #[default]
    Turn,
    GravityFlip,
}

/// Controller-wide flags every state may read and some may write.
#[derive(Debug, Clone, PartialEq)]
pub struct ControllerStatus {
    pub current: StateId,
    pub previous: StateId,
    pub axis: Vec2,
    pub direction: Horizontal,
    pub is_enabled: bool,
    pub is_turning: bool,
    pub is_knockback_active: bool,
    pub is_stunned: bool,
    pub is_dashing: bool,
    pub is_dead: bool,
    /// Furthest point from the ground reached since last standing on it.
    pub aerial_peak: f32,
    pub frames_since_drop: u32,
    /// Gravity scale seen on the last tick, used to detect flips.
    pub gravity_scale: f32,
    pub(crate) turn: Countdown,
    pub(crate) turn_kind: TurnKind,
    pub(crate) stun: Countdown,
    pub(crate) drop_through: Countdown,
}

impl Default for ControllerStatus {
    fn default() -> Self {
        Self {
            current: StateId::Default,
            previous: StateId::Default,
            axis: Vec2::ZERO,
            direction: Horizontal::Right,
            is_enabled: true,
            is_turning: false,
            is_knockback_active: false,
            is_stunned: false,
            is_dashing: false,
            is_dead: false,
            aerial_peak: 0.0,
            frames_since_drop: FRAMES_SINCE_DROP_CAP,
            gravity_scale: 1.0,
            turn: Countdown::default(),
            turn_kind: TurnKind::Turn,
            stun: Countdown::default(),
            drop_through: Countdown::default(),
        }
    }
}

/// Things that happened inside the controller this tick, drained by the owner.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ControllerEvent {
    StateChanged { from: StateId, to: StateId },
    Landed { fall_distance: f32 },
    Jumped { jump_number: u32 },
    JumpCrested,
    Turned(Horizontal),
    Stunned,
    GravityChanged(f32),
}

/// Work a state asks the controller to do once the current callback returns.
#[derive(Debug, Clone, Copy, PartialEq)]
pub(crate) enum Request {
    Begin { id: StateId, interrupt: bool },
    Force(StateId),
    ToDefault { interrupt: bool },
    End(StateId),
    WallJump { frames: u32, direction: Horizontal },
    LadderExited,
    Bounced,
}

/// The collaborators a controller works against for one call.
pub struct ControllerEnv<'a> {
    pub body: &'a mut KinematicBody,
    pub terrain: &'a Terrain,
    pub input: &'a InputSnapshot,
    pub attacks: &'a mut AttackSet,
    pub animator: &'a mut (dyn Animator + 'static),
    pub fixed_dt: f32,
}

/// Everything a state callback may touch.
pub struct StateContext<'a> {
    pub status: &'a mut ControllerStatus,
    pub settings: &'a ControllerSettings,
    pub body: &'a mut KinematicBody,
    pub terrain: &'a Terrain,
    pub input: &'a InputSnapshot,
    pub attacks: &'a mut AttackSet,
    pub animator: &'a mut (dyn Animator + 'static),
    pub fixed_dt: f32,
    pub facts: StateFacts,
    pub(crate) requests: VecDeque<Request>,
    pub(crate) events: &'a mut Vec<ControllerEvent>,
}

impl StateContext<'_> {
    pub(crate) fn request(&mut self, request: Request) {
        self.requests.push_back(request);
    }

    /// Asks to switch to `id` if it admits itself.
    pub fn begin(&mut self, id: StateId) {
        self.request(Request::Begin {
            id,
            interrupt: false,
        });
    }

    /// Like `begin`, but restarts `id` even if it is already current.
    pub fn begin_interrupt(&mut self, id: StateId) {
        self.request(Request::Begin {
            id,
            interrupt: true,
        });
    }

    /// Switches to `id` without asking it first.
    pub fn force(&mut self, id: StateId) {
        self.request(Request::Force(id));
    }

    pub fn to_default(&mut self) {
        self.request(Request::ToDefault { interrupt: false });
    }

    pub fn end_state(&mut self, id: StateId) {
        self.request(Request::End(id));
    }

    pub fn emit(&mut self, event: ControllerEvent) {
        self.events.push(event);
    }

    pub fn current(&self) -> StateId {
        self.status.current
    }

    pub fn gravity_sign(&self) -> f32 {
        gravity_sign(self.body.gravity_scale())
    }

    pub fn world_up(&self) -> Vertical {
        world_up(self.body.gravity_scale())
    }

    pub fn world_down(&self) -> Vertical {
        world_down(self.body.gravity_scale())
    }

    pub fn is_on_surface(&self) -> bool {
        self.body.is_on_surface()
    }

    pub fn is_attacking(&self) -> bool {
        self.attacks.is_attacking()
    }

    pub fn is_locked_for_attack(&self, action: ActionType) -> bool {
        self.attacks.is_locked_for(action)
    }

    pub fn clip_length(&self, clip: Option<&str>) -> Option<f32> {
        clip.and_then(|c| self.animator.clip_length(c))
    }

    /// Plays a one-off clip unless knockback or a prioritized turn owns the animator.
    pub fn play_secondary(&mut self, clip: Option<&str>, turn_priority: bool) {
        if self.status.is_knockback_active || (self.status.is_turning && turn_priority) {
            return;
        }
        if let Some(clip) = clip {
            self.animator.play(clip, 0.0);
        }
    }

    /// Plays a state's primary clip, swapped for the attack's actor clip while attacking.
    pub fn play_state_clip(&mut self, clip: Option<&str>, turn_priority: bool) {
        if self.status.is_turning && turn_priority {
            return;
        }
        let clip = if self.attacks.is_attacking() {
            self.attacks.actor_clip_for(self.status.current)
        } else {
            clip
        };
        if let Some(clip) = clip {
            self.animator.play(clip, 0.0);
        }
    }

    pub fn can_change_direction(&self) -> bool {
        !self.status.is_knockback_active
            && !self.attacks.is_locked_for(ActionType::Turning)
            && self.facts.current_allows_direction_change
    }

    /// Turns to face `direction` if it differs and turning is currently allowed.
    pub fn face_direction(&mut self, direction: Horizontal) {
        if direction != self.status.direction && self.can_change_direction() {
            self.turn();
        }
    }

    fn turn(&mut self) {
        self.status.direction = self.status.direction.flipped();
        self.attacks.cancel_if(|c| c.on_turn);

        let settings = self.settings;
        let clips = &settings.clips;
        let clip = if self.status.current == StateId::Crouching {
            clips.turn_crouch.as_deref()
        } else if self.body.is_on_surface() {
            clips.turn_ground.as_deref()
        } else {
            clips.turn_air.as_deref()
        };
        let length = self.clip_length(clip).unwrap_or(0.0);
        if self.status.current != StateId::Ladder
            && let Some(clip) = clip
        {
            self.animator.play(clip, 0.0);
        }

        self.status.turn = Countdown::from_ticks(secs_to_ticks(length, self.fixed_dt).max(1));
        self.status.turn_kind = TurnKind::Turn;
        self.status.is_turning = true;
        let direction = self.status.direction;
        self.emit(ControllerEvent::Turned(direction));
    }

    pub fn cancel_turn(&mut self) {
        self.status.turn.cancel();
        self.status.is_turning = false;
    }

    /// Freezes the body and blocks input-driven actions for the stun duration.
    pub fn stun(&mut self) {
        self.status.stun = Countdown::from_secs(self.settings.stun_duration, self.fixed_dt);
        self.status.is_stunned = true;
        self.body.set_velocity_x(0.0);
        self.body.set_velocity_y(0.0);
        debug!("Stunned for {} ticks", self.status.stun.remaining());
        self.emit(ControllerEvent::Stunned);
    }

    pub fn attack_context(&self, reverse_on_wall: bool) -> AttackContext {
        AttackContext {
            state: self.status.current,
            incapacitated: self.status.is_knockback_active
                || self.status.is_stunned
                || self.status.is_dead,
            reverse_on_wall,
            fixed_dt: self.fixed_dt,
        }
    }
}
