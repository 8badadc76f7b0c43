//! Actor domain: one controlled body with health, attacks and an animator.

use bevy::prelude::*;

use super::ActorSettings;
use crate::animation::Animator;
use crate::combat::{AttackSet, AttackSettings, Team};
use crate::config::{ConfigError, MovesetConfig};
use crate::controller::{
    ControllerEnv, ControllerEvent, ControllerSettings, InputSnapshot, MovementController,
    StateId, StateSettings,
};
use crate::core::{Countdown, Horizontal};
use crate::physics::{Aabb, BodyId, PhysicsWorld};

/// Something that happened to an actor since its events were last drained.
#[derive(Debug, Clone, Copy, PartialEq)]
pub enum ActorEvent {
    StateChanged { from: StateId, to: StateId },
    Damaged { amount: i32, hp: i32, source: Vec2 },
    Died,
    Landed { fall_distance: f32 },
}

#[derive(Component)]
pub struct Actor {
    pub settings: ActorSettings,
    body: BodyId,
    controller: MovementController,
    attacks: AttackSet,
    animator: Box<dyn Animator>,
    hp: i32,
    invincibility: Countdown,
    /// Bodies the current attack already hit.
    struck: Vec<BodyId>,
    events: Vec<ActorEvent>,
}

impl Actor {
    pub fn new(
        settings: ActorSettings,
        body: BodyId,
        controller: ControllerSettings,
        states: &StateSettings,
        attacks: Vec<AttackSettings>,
        animator: Box<dyn Animator>,
    ) -> Self {
        Self {
            hp: settings.max_hp,
            settings,
            body,
            controller: MovementController::new(controller, states),
            attacks: AttackSet::new(attacks),
            animator,
            invincibility: Countdown::default(),
            struck: Vec::new(),
            events: Vec::new(),
        }
    }

    /// Spawns the moveset's body at `position` and builds an actor around it.
    pub fn spawn(
        world: &mut PhysicsWorld,
        moveset: &MovesetConfig,
        position: Vec2,
        animator: Box<dyn Animator>,
    ) -> Result<Self, ConfigError> {
        let body = world.spawn_body(moveset.body.clone(), position)?;
        debug!("Spawned actor '{}' at {:?}", moveset.name, position);
        Ok(Self::new(
            moveset.actor.clone(),
            body,
            moveset.controller.clone(),
            &moveset.states,
            moveset.attacks.clone(),
            animator,
        ))
    }

    pub fn body(&self) -> BodyId {
        self.body
    }

    pub fn controller(&self) -> &MovementController {
        &self.controller
    }

    pub fn controller_mut(&mut self) -> &mut MovementController {
        &mut self.controller
    }

    pub fn attacks(&self) -> &AttackSet {
        &self.attacks
    }

    pub fn attacks_mut(&mut self) -> &mut AttackSet {
        &mut self.attacks
    }

    pub fn animator(&self) -> &dyn Animator {
        self.animator.as_ref()
    }

    pub fn hp(&self) -> i32 {
        self.hp
    }

    pub fn team(&self) -> Team {
        self.settings.team
    }

    pub fn is_dead(&self) -> bool {
        self.controller.status().is_dead
    }

    pub fn is_invincible(&self) -> bool {
        self.settings.always_invincible || self.invincibility.is_active()
    }

    pub fn drain_events(&mut self) -> Vec<ActorEvent> {
        std::mem::take(&mut self.events)
    }

    /// One fixed tick for the controller and attacks. The world must already
    /// have stepped this tick.
    pub fn tick(&mut self, world: &mut PhysicsWorld, input: &InputSnapshot) {
        let ran = with_env(
            world,
            self.body,
            input,
            &mut self.attacks,
            self.animator.as_mut(),
            |env| {
                self.controller.poll(env);
                self.controller.fixed_update(env);
                if env.attacks.fixed_update().is_some() {
                    self.controller.on_attack_complete(env);
                }
            },
        );
        if ran.is_none() {
            return;
        }
        self.invincibility.tick();
        if !self.attacks.is_attacking() {
            self.struck.clear();
        }
        self.collect_controller_events();
    }

    /// Deals `amount` damage from something at `source`. Returns false when the
    /// hit was ignored.
    pub fn damage(
        &mut self,
        world: &mut PhysicsWorld,
        amount: i32,
        source: Vec2,
        knockback: bool,
    ) -> bool {
        if amount <= 0 || self.is_dead() || self.is_invincible() {
            return false;
        }
        self.hp = (self.hp - amount).max(0);
        debug!("Actor {:?} took {} damage, {} hp left", self.body, amount, self.hp);
        self.events.push(ActorEvent::Damaged {
            amount,
            hp: self.hp,
            source,
        });
        if self.hp == 0 {
            self.die(world);
            return true;
        }

        self.invincibility = Countdown::from_secs(self.settings.damaged_invincibility, world.fixed_dt());
        // An attack that knockback doesn't cancel also keeps the actor in place.
        let knockback = knockback
            && self
                .attacks
                .current()
                .is_none_or(|attack| attack.settings.canceled_by.on_knockback);
        if knockback && let Some(body) = world.body(self.body) {
            // Pushed away from the source; a source straight above or below pushes back.
            let offset = body.position().x - source.x;
            let direction = if offset > 0.0 {
                Horizontal::Right
            } else if offset < 0.0 {
                Horizontal::Left
            } else {
                self.controller.direction().flipped()
            };
            with_env(
                world,
                self.body,
                &InputSnapshot::default(),
                &mut self.attacks,
                self.animator.as_mut(),
                |env| self.controller.knockback(env, direction),
            );
        }
        self.collect_controller_events();
        true
    }

    pub fn die(&mut self, world: &mut PhysicsWorld) {
        if self.is_dead() {
            return;
        }
        self.hp = 0;
        with_env(
            world,
            self.body,
            &InputSnapshot::default(),
            &mut self.attacks,
            self.animator.as_mut(),
            |env| self.controller.set_to_dead(env),
        );
        self.struck.clear();
        info!("Actor {:?} died", self.body);
        self.collect_controller_events();
        self.events.push(ActorEvent::Died);
    }

    pub fn revive(&mut self, world: &mut PhysicsWorld) {
        self.hp = self.settings.max_hp;
        self.invincibility.cancel();
        with_env(
            world,
            self.body,
            &InputSnapshot::default(),
            &mut self.attacks,
            self.animator.as_mut(),
            |env| self.controller.set_to_alive(env),
        );
        info!("Actor {:?} revived with {} hp", self.body, self.hp);
        self.collect_controller_events();
    }

    /// Teleports the body. Interpolation and the fall height restart from here.
    pub fn set_position(&mut self, world: &mut PhysicsWorld, position: Vec2) {
        let Some(body) = world.body_mut(self.body) else {
            debug_assert!(false, "actor body {:?} is not registered", self.body);
            return;
        };
        body.set_position(position);
        self.controller.reset_aerial_peak(position.y);
    }

    pub(crate) fn start_bounce(&mut self, world: &mut PhysicsWorld, other: Aabb) {
        with_env(
            world,
            self.body,
            &InputSnapshot::default(),
            &mut self.attacks,
            self.animator.as_mut(),
            |env| self.controller.start_bounce(env, other),
        );
        self.collect_controller_events();
    }

    /// Records that the current attack hit `body`. False if it already had.
    pub(crate) fn strike(&mut self, body: BodyId) -> bool {
        if self.struck.contains(&body) {
            return false;
        }
        self.struck.push(body);
        true
    }

    fn collect_controller_events(&mut self) {
        for event in self.controller.drain_events() {
            match event {
                ControllerEvent::StateChanged { from, to } => {
                    self.events.push(ActorEvent::StateChanged { from, to });
                }
                ControllerEvent::Landed { fall_distance } => {
                    self.events.push(ActorEvent::Landed { fall_distance });
                }
                _ => {}
            }
        }
    }
}

/// Runs `f` against `body` and the world's terrain. `None` when the body is
/// not registered.
fn with_env<R>(
    world: &mut PhysicsWorld,
    id: BodyId,
    input: &InputSnapshot,
    attacks: &mut AttackSet,
    animator: &mut (dyn Animator + 'static),
    f: impl FnOnce(&mut ControllerEnv<'_>) -> R,
) -> Option<R> {
    let fixed_dt = world.fixed_dt();
    let Some((body, terrain)) = world.body_and_terrain(id) else {
        debug_assert!(false, "actor body {:?} is not registered", id);
        return None;
    };
    let mut env = ControllerEnv {
        body,
        terrain,
        input,
        attacks,
        animator,
        fixed_dt,
    };
    Some(f(&mut env))
}
