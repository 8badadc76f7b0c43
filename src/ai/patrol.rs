//! AI domain: a walker that paces back and forth, hopping and swinging on timers.

use bevy::prelude::*;
use rand::{Rng, SeedableRng};
use rand_chacha::ChaCha8Rng;
use serde::{Deserialize, Serialize};

use crate::actor::Actor;
use crate::controller::{ButtonState, InputSnapshot};
use crate::core::{Countdown, Horizontal, world_down};
use crate::physics::{PhysicsWorld, is_next_to_ledge};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PatrolSettings {
    pub turn_on_wall: bool,
    pub turn_at_ledge: bool,
    /// Seconds between jumps; 0 never jumps.
    pub jump_interval: f32,
    /// Ticks the jump button stays down after each press.
    pub jump_hold_frames: u32,
    /// Each wait before the next attack is drawn from this range, in seconds.
    /// A max of 0 never attacks.
    pub attack_interval_min: f32,
    pub attack_interval_max: f32,
    pub seed: u64,
}

impl Default for PatrolSettings {
    fn default() -> Self {
        Self {
            turn_on_wall: true,
            turn_at_ledge: true,
            jump_interval: 0.0,
            jump_hold_frames: 8,
            attack_interval_min: 1.5,
            attack_interval_max: 3.0,
            seed: 0,
        }
    }
}

/// Produces the input an enemy actor would get from a player's hands.
#[derive(Component, Debug, Clone)]
pub struct PatrolBrain {
    pub settings: PatrolSettings,
    walking: Horizontal,
    jump_timer: Countdown,
    jump_hold: u32,
    attack_timer: Countdown,
    rng: ChaCha8Rng,
    started: bool,
}

impl PatrolBrain {
    pub fn new(settings: PatrolSettings) -> Self {
        Self {
            rng: ChaCha8Rng::seed_from_u64(settings.seed),
            settings,
            walking: Horizontal::Right,
            jump_timer: Countdown::default(),
            jump_hold: 0,
            attack_timer: Countdown::default(),
            started: false,
        }
    }

    /// Direction the brain is currently walking.
    pub fn walking(&self) -> Horizontal {
        self.walking
    }

    /// Ticks until the next attack press, 0 when attacks are off.
    pub fn ticks_until_attack(&self) -> u32 {
        self.attack_timer.remaining()
    }

    /// Decides this tick's input for `actor`.
    pub fn think(&mut self, world: &PhysicsWorld, actor: &Actor) -> InputSnapshot {
        if actor.is_dead() {
            return InputSnapshot::default();
        }
        let Some(body) = world.body(actor.body()) else {
            return InputSnapshot::default();
        };
        let fixed_dt = world.fixed_dt();
        if !self.started {
            self.started = true;
            self.walking = actor.controller().direction();
            self.jump_timer = Countdown::from_secs(self.settings.jump_interval, fixed_dt);
            self.roll_attack(fixed_dt);
        }

        let flags = body.properties();
        let blocked = match self.walking {
            Horizontal::Left => flags.is_against_left_wall,
            Horizontal::Right => flags.is_against_right_wall,
        };
        let at_ledge = body.is_on_surface()
            && is_next_to_ledge(
                body,
                &world.terrain,
                self.walking,
                world_down(body.gravity_scale()),
            );
        if (self.settings.turn_on_wall && blocked) || (self.settings.turn_at_ledge && at_ledge) {
            self.walking = self.walking.flipped();
            debug!("Patrol turned to {:?}", self.walking);
        }

        let mut input = InputSnapshot::with_axis(Vec2::new(self.walking.sign(), 0.0));

        if self.jump_timer.tick() {
            input.jump = ButtonState::pressed();
            self.jump_hold = self.settings.jump_hold_frames.saturating_sub(1);
            self.jump_timer = Countdown::from_secs(self.settings.jump_interval, fixed_dt);
        } else if self.jump_hold > 0 {
            self.jump_hold -= 1;
            input.jump = ButtonState::held();
        }

        if self.attack_timer.tick() {
            input.attack = ButtonState::pressed();
            self.roll_attack(fixed_dt);
        }
        input
    }

    fn roll_attack(&mut self, fixed_dt: f32) {
        let (min, max) = (self.settings.attack_interval_min, self.settings.attack_interval_max);
        if max <= 0.0 {
            self.attack_timer = Countdown::default();
            return;
        }
        let secs = if max > min {
            self.rng.random_range(min..max)
        } else {
            max
        };
        self.attack_timer = Countdown::from_secs(secs, fixed_dt);
    }
}
