//! Combat domain: attack admission, interrupt permissions and timed playback.
//!
//! An attack never moves the body itself. It gates what the movement
//! controller may do while it plays and is canceled by specific transitions.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use crate::animation::Animator;
use crate::config::vec2_serde;
use crate::controller::{InputSnapshot, StateId};
use crate::core::{Countdown, Horizontal};
use crate::physics::Aabb;

/// Actions an in-progress attack may or may not allow.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum ActionType {
    GroundMoving,
    AirMoving,
    Jumping,
    Turning,
    Attacking,
    Dashing,
    Climbing,
    Crouching,
    WallClinging,
}

/// Transitions that end the attack early.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanceledBy {
    pub on_move: bool,
    pub on_jump: bool,
    pub on_turn: bool,
    pub on_knockback: bool,
    pub on_dash: bool,
    pub on_crouch: bool,
    pub on_wall_cling: bool,
}

/// Movement the attack ends when it starts.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct Cancels {
    pub dash: bool,
    pub crouch: bool,
    pub wall_clinging: bool,
}

#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActionsAllowedDuringAttack {
    pub ground_moving: bool,
    pub air_moving: bool,
    pub jumping: bool,
    pub turning: bool,
    pub attacking: bool,
    pub dashing: bool,
    pub climbing: bool,
    pub crouching: bool,
    pub wall_clinging: bool,
}

impl ActionsAllowedDuringAttack {
    pub fn allows(&self, action: ActionType) -> bool {
        match action {
            ActionType::GroundMoving => self.ground_moving,
            ActionType::AirMoving => self.air_moving,
            ActionType::Jumping => self.jumping,
            ActionType::Turning => self.turning,
            ActionType::Attacking => self.attacking,
            ActionType::Dashing => self.dashing,
            ActionType::Climbing => self.climbing,
            ActionType::Crouching => self.crouching,
            ActionType::WallClinging => self.wall_clinging,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CanInitiateFrom {
    pub standing: bool,
    pub moving: bool,
    pub jumping: bool,
    pub dashing: bool,
    pub climbing: bool,
    pub crouching: bool,
    pub wall_clinging: bool,
}

impl Default for CanInitiateFrom {
    fn default() -> Self {
        Self {
            standing: true,
            moving: true,
            jumping: true,
            dashing: false,
            climbing: false,
            crouching: false,
            wall_clinging: false,
        }
    }
}

impl CanInitiateFrom {
    pub fn allows(&self, state: StateId) -> bool {
        match state {
            StateId::Default | StateId::Landing => self.standing,
            StateId::Moving => self.moving,
            StateId::Jumping | StateId::Falling => self.jumping,
            StateId::Dashing => self.dashing,
            StateId::Ladder => self.climbing,
            StateId::Crouching => self.crouching,
            StateId::WallCling => self.wall_clinging,
            StateId::Knockback | StateId::Bouncing | StateId::Death => true,
        }
    }
}

/// One clip name per movement situation.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackClips {
    pub standing: Option<String>,
    pub moving: Option<String>,
    pub jumping: Option<String>,
    pub dashing: Option<String>,
    pub climbing: Option<String>,
    pub crouching: Option<String>,
    pub wall_clinging: Option<String>,
}

impl AttackClips {
    pub fn for_state(&self, state: StateId) -> Option<&str> {
        let clip = match state {
            StateId::Default | StateId::Landing => &self.standing,
            StateId::Moving => &self.moving,
            StateId::Jumping | StateId::Falling => &self.jumping,
            StateId::Dashing => &self.dashing,
            StateId::Ladder => &self.climbing,
            StateId::Crouching => &self.crouching,
            StateId::WallCling => &self.wall_clinging,
            StateId::Knockback | StateId::Bouncing | StateId::Death => return None,
        };
        clip.as_deref()
    }
}

/// Which attack button starts the attack.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum AttackInput {
    #[default]
    Primary,
    Sub,
    Both,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum AttackDirection {
    #[default]
    Ahead,
    Behind,
}

/// Damage box placed relative to the attacker, mirrored by facing.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HitboxSettings {
    #[serde(with = "vec2_serde")]
    pub size: Vec2,
    #[serde(with = "vec2_serde")]
    pub offset: Vec2,
    pub damage: i32,
    pub knockback: bool,
}

impl Default for HitboxSettings {
    fn default() -> Self {
        Self {
            size: Vec2::new(1.0, 1.0),
            offset: Vec2::new(0.75, 0.0),
            damage: 1,
            knockback: true,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct AttackSettings {
    pub name: String,
    pub enabled: bool,
    pub input: AttackInput,
    /// Ticks before the attack can start again.
    pub cooldown_frames: u32,
    /// Maximum spawned instances alive at once; 0 means unlimited.
    pub limit_instances: u32,
    /// Clips for the attack's own effect, used for duration.
    pub attack_clips: AttackClips,
    /// Clips the actor plays while attacking.
    pub actor_clips: AttackClips,
    pub actions_allowed: ActionsAllowedDuringAttack,
    pub canceled_by: CanceledBy,
    pub cancels: Cancels,
    pub can_initiate_from: CanInitiateFrom,
    /// Seconds the attack lasts when neither clip exists.
    pub fallback_duration: f32,
    pub hitbox: Option<HitboxSettings>,
}

impl Default for AttackSettings {
    fn default() -> Self {
        Self {
            name: "attack".to_string(),
            enabled: true,
            input: AttackInput::Primary,
            cooldown_frames: 0,
            limit_instances: 0,
            attack_clips: AttackClips::default(),
            actor_clips: AttackClips::default(),
            actions_allowed: ActionsAllowedDuringAttack::default(),
            canceled_by: CanceledBy::default(),
            cancels: Cancels::default(),
            can_initiate_from: CanInitiateFrom::default(),
            fallback_duration: 0.5,
            hitbox: None,
        }
    }
}

/// Controller facts an attack needs to decide whether it may start.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct AttackContext {
    pub state: StateId,
    /// Knocked back, stunned or dead.
    pub incapacitated: bool,
    pub reverse_on_wall: bool,
    pub fixed_dt: f32,
}

#[derive(Debug, Clone)]
pub struct Attack {
    pub settings: AttackSettings,
    /// Spawned sub-objects still alive; kept up to date by whoever spawns them.
    pub spawned_instances: u32,
    cooldown: u32,
    duration: Countdown,
    is_active: bool,
    direction: AttackDirection,
}

impl Attack {
    pub fn new(settings: AttackSettings) -> Self {
        Self {
            settings,
            spawned_instances: 0,
            cooldown: 0,
            duration: Countdown::default(),
            is_active: false,
            direction: AttackDirection::Ahead,
        }
    }

    pub fn is_active(&self) -> bool {
        self.is_active
    }

    pub fn cooldown_remaining(&self) -> u32 {
        self.cooldown
    }

    pub fn direction(&self) -> AttackDirection {
        self.direction
    }

    /// Ticks left before the attack completes.
    pub fn remaining_ticks(&self) -> u32 {
        self.duration.remaining()
    }

    /// World-space damage box for an attacker at `position` facing `facing`.
    pub fn hitbox(&self, position: Vec2, facing: Horizontal) -> Option<Aabb> {
        let hitbox = self.settings.hitbox.as_ref()?;
        let mut sign = facing.sign();
        if self.direction == AttackDirection::Behind {
            sign = -sign;
        }
        let center = position + Vec2::new(hitbox.offset.x * sign, hitbox.offset.y);
        Some(Aabb::from_center_size(center, hitbox.size))
    }

    fn reset(&mut self) {
        self.is_active = false;
        self.duration.cancel();
        self.direction = AttackDirection::Ahead;
    }

    fn accepts(&self, input: &InputSnapshot) -> bool {
        let primary = matches!(self.settings.input, AttackInput::Primary | AttackInput::Both);
        let sub = matches!(self.settings.input, AttackInput::Sub | AttackInput::Both);
        (input.attack.pressed_this_frame && primary) || (input.sub_attack.pressed_this_frame && sub)
    }
}

/// Every attack an actor owns, plus which one is playing.
#[derive(Debug, Clone, Default)]
pub struct AttackSet {
    attacks: Vec<Attack>,
    current: Option<usize>,
}

impl AttackSet {
    pub fn new(settings: Vec<AttackSettings>) -> Self {
        Self {
            attacks: settings.into_iter().map(Attack::new).collect(),
            current: None,
        }
    }

    pub fn len(&self) -> usize {
        self.attacks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.attacks.is_empty()
    }

    pub fn get(&self, index: usize) -> Option<&Attack> {
        self.attacks.get(index)
    }

    pub fn get_mut(&mut self, index: usize) -> Option<&mut Attack> {
        self.attacks.get_mut(index)
    }

    pub fn find(&self, name: &str) -> Option<usize> {
        self.attacks.iter().position(|a| a.settings.name == name)
    }

    pub fn current(&self) -> Option<&Attack> {
        self.current.and_then(|i| self.attacks.get(i))
    }

    pub fn current_index(&self) -> Option<usize> {
        self.current
    }

    pub fn is_attacking(&self) -> bool {
        self.current.is_some()
    }

    pub fn can_initiate(&self, index: usize, ctx: &AttackContext) -> bool {
        let Some(attack) = self.attacks.get(index) else {
            return false;
        };
        if attack.cooldown > 0 {
            return false;
        }
        if attack.settings.limit_instances > 0
            && attack.spawned_instances >= attack.settings.limit_instances
        {
            return false;
        }
        if (attack.is_active || self.current.is_some()) && !attack.settings.actions_allowed.attacking {
            return false;
        }
        if !attack.settings.enabled || ctx.incapacitated || ctx.state == StateId::Death {
            return false;
        }
        attack.settings.can_initiate_from.allows(ctx.state)
    }

    /// Starts the attack if it is admissible. Returns whether it started.
    pub fn begin(&mut self, index: usize, ctx: &AttackContext, animator: &mut dyn Animator) -> bool {
        if !self.can_initiate(index, ctx) {
            return false;
        }
        self.force_begin(index, ctx, animator);
        true
    }

    /// Starts the attack without admission checks.
    pub fn force_begin(&mut self, index: usize, ctx: &AttackContext, animator: &mut dyn Animator) {
        if let Some(previous) = self.current
            && previous != index
            && let Some(attack) = self.attacks.get_mut(previous)
        {
            attack.reset();
        }
        let Some(attack) = self.attacks.get_mut(index) else {
            return;
        };
        attack.reset();
        attack.is_active = true;
        attack.cooldown = attack.settings.cooldown_frames;
        if ctx.state == StateId::WallCling && ctx.reverse_on_wall {
            attack.direction = AttackDirection::Behind;
        }

        let attack_clip = attack.settings.attack_clips.for_state(ctx.state);
        let actor_clip = attack.settings.actor_clips.for_state(ctx.state);
        let attack_length = attack_clip.and_then(|c| animator.clip_length(c));
        let actor_length = actor_clip.and_then(|c| animator.clip_length(c));
        if let Some(clip) = actor_clip {
            animator.play(clip, 0.0);
        }
        let duration = match (attack_length, actor_length) {
            (None, None) => attack.settings.fallback_duration,
            (a, b) => a.unwrap_or(0.0).max(b.unwrap_or(0.0)),
        };
        attack.duration = Countdown::from_secs(duration, ctx.fixed_dt);
        debug!(
            "Attack '{}' began from {:?} for {} ticks",
            attack.settings.name,
            ctx.state,
            attack.duration.remaining()
        );
        self.current = Some(index);
    }

    /// Stops the current attack immediately.
    pub fn cancel(&mut self) {
        if let Some(index) = self.current.take()
            && let Some(attack) = self.attacks.get_mut(index)
        {
            debug!("Attack '{}' canceled", attack.settings.name);
            attack.reset();
        }
    }

    /// Cancels the current attack when `rule` says its cancel table covers the transition.
    pub fn cancel_if(&mut self, rule: impl Fn(&CanceledBy) -> bool) -> bool {
        let canceled = self
            .current()
            .is_some_and(|attack| rule(&attack.settings.canceled_by));
        if canceled {
            self.cancel();
        }
        canceled
    }

    /// Whether the current attack shuts down a kind of movement.
    pub fn cancels(&self, rule: impl Fn(&Cancels) -> bool) -> bool {
        self.current()
            .is_some_and(|attack| rule(&attack.settings.cancels))
    }

    pub fn can_interrupt(&self, action: ActionType) -> bool {
        match self.current() {
            Some(attack) => attack.settings.actions_allowed.allows(action),
            None => true,
        }
    }

    /// True while an attack is playing that does not allow `action`.
    pub fn is_locked_for(&self, action: ActionType) -> bool {
        !self.can_interrupt(action)
    }

    pub fn actor_clip_for(&self, state: StateId) -> Option<&str> {
        self.current()
            .and_then(|attack| attack.settings.actor_clips.for_state(state))
    }

    /// Advances cooldowns and the playing attack. Returns the attack that
    /// completed this tick, if any.
    pub fn fixed_update(&mut self) -> Option<usize> {
        for attack in &mut self.attacks {
            attack.cooldown = attack.cooldown.saturating_sub(1);
        }
        let index = self.current?;
        let attack = self.attacks.get_mut(index)?;
        if attack.duration.tick() || !attack.duration.is_active() {
            debug!("Attack '{}' complete", attack.settings.name);
            attack.reset();
            self.current = None;
            return Some(index);
        }
        None
    }

    /// Starts the first attack whose button was pressed this frame and that is admissible.
    pub fn poll(
        &mut self,
        input: &InputSnapshot,
        ctx: &AttackContext,
        animator: &mut dyn Animator,
    ) -> Option<usize> {
        let index = (0..self.attacks.len()).find(|&i| {
            self.attacks[i].accepts(input) && self.can_initiate(i, ctx)
        })?;
        self.force_begin(index, ctx, animator);
        Some(index)
    }
}
