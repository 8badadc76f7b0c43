//! Controller domain: scenario tests driving a controller against a real body and terrain.

use std::collections::VecDeque;

use bevy::prelude::*;

use super::{
    ButtonState, ControllerEnv, ControllerEvent, ControllerSettings, CrouchSettings,
    InputSnapshot, JumpSettings, KnockbackSettings, MovementController, MovementState,
    StateContext, StateFacts, StateId, StateSettings,
};
use crate::animation::NullAnimator;
use crate::combat::AttackSet;
use crate::core::Horizontal;
use crate::physics::{
    BodyId, BodySettings, GameLayer, KinematicBody, PhysicsSettings, PhysicsWorld, Terrain,
};

/// One controlled body in a small world, stepped the way the game loop steps it.
struct Rig {
    world: PhysicsWorld,
    id: BodyId,
    controller: MovementController,
    attacks: AttackSet,
    animator: NullAnimator,
    events: Vec<ControllerEvent>,
}

impl Rig {
    fn new(terrain: Terrain, position: Vec2, states: StateSettings) -> Self {
        let mut world = PhysicsWorld::new(PhysicsSettings::default(), terrain).unwrap();
        let id = world.spawn_body(BodySettings::default(), position).unwrap();
        Self {
            world,
            id,
            controller: MovementController::new(ControllerSettings::default(), &states),
            attacks: AttackSet::new(Vec::new()),
            animator: NullAnimator,
            events: Vec::new(),
        }
    }

    /// A 1x1 body standing on a wide floor whose top is y = 0.
    fn on_floor(states: StateSettings) -> Self {
        let mut rig = Self::new(floor(), Vec2::new(0.0, 0.5), states);
        rig.settle();
        rig
    }

    fn settle(&mut self) {
        for _ in 0..5 {
            self.tick(InputSnapshot::default());
        }
        assert!(self.body().is_on_surface(), "body should rest on the floor");
        self.events.clear();
    }

    fn tick(&mut self, input: InputSnapshot) {
        self.world.step();
        let fixed_dt = self.world.fixed_dt();
        let (body, terrain) = self.world.body_and_terrain(self.id).unwrap();
        let mut env = ControllerEnv {
            body,
            terrain,
            input: &input,
            attacks: &mut self.attacks,
            animator: &mut self.animator,
            fixed_dt,
        };
        self.controller.poll(&mut env);
        self.controller.fixed_update(&mut env);
        self.events.extend(self.controller.drain_events());
    }

    fn with_env(&mut self, f: impl FnOnce(&mut MovementController, &mut ControllerEnv<'_>)) {
        let fixed_dt = self.world.fixed_dt();
        let input = InputSnapshot::default();
        let (body, terrain) = self.world.body_and_terrain(self.id).unwrap();
        let mut env = ControllerEnv {
            body,
            terrain,
            input: &input,
            attacks: &mut self.attacks,
            animator: &mut self.animator,
            fixed_dt,
        };
        f(&mut self.controller, &mut env);
        self.events.extend(self.controller.drain_events());
    }

    fn body(&self) -> &KinematicBody {
        self.world.body(self.id).unwrap()
    }

    fn jumps(&self) -> usize {
        self.events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::Jumped { .. }))
            .count()
    }

    fn entered(&self, id: StateId) -> bool {
        self.events
            .iter()
            .any(|e| matches!(e, ControllerEvent::StateChanged { to, .. } if *to == id))
    }
}

fn floor() -> Terrain {
    let mut terrain = Terrain::new();
    terrain.add_box(Vec2::new(0.0, -0.5), Vec2::new(40.0, 1.0), GameLayer::Terrain);
    terrain
}

fn input(axis: Vec2, jump: ButtonState) -> InputSnapshot {
    InputSnapshot {
        axis,
        jump,
        ..default()
    }
}

fn dash(button: ButtonState) -> InputSnapshot {
    InputSnapshot {
        dash: button,
        ..default()
    }
}

// -----------------------------------------------------------------------------
// Arbitration tests
// -----------------------------------------------------------------------------

#[test]
fn test_controller_starts_in_default_facing_right() {
    let rig = Rig::on_floor(StateSettings::default());
    assert_eq!(rig.controller.current(), StateId::Default);
    assert_eq!(rig.controller.direction(), Horizontal::Right);
}

#[test]
fn test_jump_becomes_current_while_moving_keeps_running() {
    let mut rig = Rig::on_floor(StateSettings::default());
    rig.tick(input(Vec2::X, ButtonState::pressed()));

    assert_eq!(rig.controller.current(), StateId::Jumping);
    // Moving is concurrent, so horizontal input still drives the body.
    let walk = rig.controller.states().moving.as_ref().unwrap().settings.walk.speed;
    assert_eq!(rig.body().velocity().x, walk);
    assert!(rig.entered(StateId::Jumping));
    assert!(!rig.entered(StateId::Moving));
}

#[test]
fn test_pressing_away_turns_the_controller() {
    let mut rig = Rig::on_floor(StateSettings::default());
    rig.tick(input(Vec2::NEG_X, ButtonState::default()));

    assert_eq!(rig.controller.direction(), Horizontal::Left);
    assert!(rig.events.contains(&ControllerEvent::Turned(Horizontal::Left)));
}

#[test]
fn test_disabled_state_is_never_entered() {
    let mut rig = Rig::on_floor(StateSettings {
        jump: None,
        ..default()
    });
    rig.tick(input(Vec2::ZERO, ButtonState::pressed()));

    assert_eq!(rig.controller.current(), StateId::Default);
    assert!(rig.body().is_on_surface());
}

// -----------------------------------------------------------------------------
// Jump tests
// -----------------------------------------------------------------------------

#[test]
fn test_third_press_is_rejected_with_two_jumps() {
    let mut rig = Rig::on_floor(StateSettings {
        jump: Some(JumpSettings {
            multiple_jump_number: 2,
            ..default()
        }),
        ..default()
    });

    for press in 0..3 {
        rig.tick(input(Vec2::ZERO, ButtonState::pressed()));
        for _ in 0..2 {
            rig.tick(input(Vec2::ZERO, ButtonState::held()));
        }
        for _ in 0..4 {
            rig.tick(InputSnapshot::default());
        }
        assert!(!rig.body().is_on_surface(), "still airborne after press {press}");
    }

    assert_eq!(rig.jumps(), 2);
    assert_eq!(rig.controller.states().jump.as_ref().unwrap().current_jump(), 2);
    assert!(!jump_admits(&mut rig));

    for _ in 0..240 {
        rig.tick(InputSnapshot::default());
        if rig.body().is_on_surface() {
            break;
        }
    }
    rig.tick(InputSnapshot::default());
    assert!(jump_admits(&mut rig));
}

/// Runs a copy of the jump state's admission check against the rig as it stands.
fn jump_admits(rig: &mut Rig) -> bool {
    let mut jump = rig.controller.states().jump.clone().unwrap();
    let states = rig.controller.states().clone();
    let settings = rig.controller.settings().clone();
    let mut status = rig.controller.status().clone();
    let fixed_dt = rig.world.fixed_dt();
    let input = InputSnapshot::default();
    let mut events = Vec::new();
    let (body, terrain) = rig.world.body_and_terrain(rig.id).unwrap();
    let mut ctx = StateContext {
        status: &mut status,
        settings: &settings,
        body,
        terrain,
        input: &input,
        attacks: &mut rig.attacks,
        animator: &mut rig.animator,
        fixed_dt,
        facts: StateFacts::default(),
        requests: VecDeque::new(),
        events: &mut events,
    };
    ctx.facts = states.facts(&ctx);
    jump.can_initiate(&mut ctx)
}

#[test]
fn test_jump_rises_and_lands_back_in_default() {
    let mut rig = Rig::on_floor(StateSettings::default());
    rig.tick(input(Vec2::ZERO, ButtonState::pressed()));
    for _ in 0..14 {
        rig.tick(input(Vec2::ZERO, ButtonState::held()));
    }
    assert!(rig.body().position().y > 1.0);

    for _ in 0..240 {
        rig.tick(InputSnapshot::default());
        if rig.body().is_on_surface() {
            break;
        }
    }
    rig.tick(InputSnapshot::default());
    assert!(rig.body().is_on_surface());
    assert_eq!(rig.controller.current(), StateId::Default);
    assert!(rig.events.iter().any(|e| matches!(e, ControllerEvent::Landed { .. })));
}

// -----------------------------------------------------------------------------
// Landing tests
// -----------------------------------------------------------------------------

#[test]
fn test_landing_without_clip_lasts_one_tick() {
    let mut rig = Rig::new(floor(), Vec2::new(0.0, 3.0), StateSettings::default());
    for _ in 0..240 {
        rig.tick(InputSnapshot::default());
        if rig.entered(StateId::Landing) {
            break;
        }
    }

    assert!(rig.entered(StateId::Landing));
    // Landing ends inside the same tick it began.
    assert_eq!(rig.controller.current(), StateId::Default);
    assert!(rig.events.iter().any(|e| matches!(e, ControllerEvent::Landed { fall_distance } if *fall_distance > 2.0)));
}

// -----------------------------------------------------------------------------
// Dash tests
// -----------------------------------------------------------------------------

fn ticks_until_dash_ends(release_after: Option<u32>) -> u32 {
    let mut rig = Rig::on_floor(StateSettings::default());
    for tick in 1..=30 {
        let button = match (tick, release_after) {
            (1, _) => ButtonState::pressed(),
            (t, Some(limit)) if t > limit => ButtonState::default(),
            _ => ButtonState::held(),
        };
        rig.tick(dash(button));
        if tick == 1 {
            assert_eq!(rig.controller.current(), StateId::Dashing);
        }
        if !rig.controller.status().is_dashing {
            return tick;
        }
    }
    panic!("dash never ended");
}

#[test]
fn test_held_dash_runs_to_max_frames() {
    assert_eq!(ticks_until_dash_ends(None), 12);
}

#[test]
fn test_released_dash_stops_at_min_frames() {
    assert_eq!(ticks_until_dash_ends(Some(3)), 6);
}

#[test]
fn test_held_dash_does_not_restart() {
    let mut rig = Rig::on_floor(StateSettings::default());
    rig.tick(dash(ButtonState::pressed()));
    for _ in 0..20 {
        rig.tick(dash(ButtonState::held()));
    }
    assert!(!rig.controller.status().is_dashing);
    assert_eq!(
        rig.events
            .iter()
            .filter(|e| matches!(e, ControllerEvent::StateChanged { to: StateId::Dashing, .. }))
            .count(),
        1
    );
}

// -----------------------------------------------------------------------------
// One-way platform tests
// -----------------------------------------------------------------------------

#[test]
fn test_drop_through_window_lasts_fifteen_ticks() {
    let mut terrain = floor();
    terrain.add_box(
        Vec2::new(0.0, 2.75),
        Vec2::new(6.0, 0.5),
        GameLayer::PassThroughBottom,
    );
    let mut rig = Rig::new(terrain, Vec2::new(0.0, 3.5), StateSettings::default());
    rig.settle();
    assert!(rig.body().position().y > 3.0);

    rig.tick(input(Vec2::NEG_Y, ButtonState::pressed()));
    assert!(!rig.body().masks().one_way_platforms_enabled());
    for _ in 0..13 {
        rig.tick(InputSnapshot::default());
    }
    assert!(!rig.body().masks().one_way_platforms_enabled());

    rig.tick(InputSnapshot::default());
    assert!(rig.body().masks().one_way_platforms_enabled());
    assert!(rig.body().position().y < 3.0, "body should be below the platform");

    // Once the window closes the platform holds the body again.
    rig.world
        .body_mut(rig.id)
        .unwrap()
        .set_position(Vec2::new(0.0, 4.0));
    rig.controller.reset_aerial_peak(4.0);
    for _ in 0..60 {
        rig.tick(InputSnapshot::default());
    }
    assert!(rig.body().is_on_surface());
    assert!((rig.body().position().y - 3.5).abs() < 1e-4);
}

// -----------------------------------------------------------------------------
// Knockback tests
// -----------------------------------------------------------------------------

fn crouched_under_overhang(knockback_enabled: bool) -> Rig {
    let mut terrain = floor();
    terrain.add_box(Vec2::new(0.0, 1.6), Vec2::new(4.0, 1.0), GameLayer::Terrain);
    let mut rig = Rig::new(
        terrain,
        Vec2::new(0.0, 0.5),
        StateSettings {
            crouch: Some(CrouchSettings {
                knockback_enabled,
                collider_size: Vec2::new(1.0, 0.5),
                collider_offset: Vec2::new(0.0, -0.25),
                ..default()
            }),
            knockback: Some(KnockbackSettings::default()),
            ..default()
        },
    );
    rig.settle();
    rig.tick(input(Vec2::NEG_Y, ButtonState::default()));
    rig.tick(InputSnapshot::default());
    assert_eq!(rig.controller.current(), StateId::Crouching);
    rig
}

#[test]
fn test_crouch_under_overhang_cannot_stand() {
    let mut rig = crouched_under_overhang(true);
    rig.tick(input(Vec2::Y, ButtonState::default()));
    assert_eq!(rig.controller.current(), StateId::Crouching);
}

#[test]
fn test_knockback_accepted_from_crouch_when_enabled() {
    let mut rig = crouched_under_overhang(true);
    rig.with_env(|controller, env| controller.knockback(env, Horizontal::Left));

    assert_eq!(rig.controller.current(), StateId::Knockback);
    assert!(rig.controller.status().is_knockback_active);
    assert_eq!(rig.body().velocity().x, -KnockbackSettings::default().speed);

    for _ in 0..KnockbackSettings::default().duration_frames {
        rig.tick(InputSnapshot::default());
    }
    assert!(!rig.controller.status().is_knockback_active);
    assert_ne!(rig.controller.current(), StateId::Knockback);
}

#[test]
fn test_knockback_rejected_from_crouch_when_disabled() {
    let mut rig = crouched_under_overhang(false);
    rig.with_env(|controller, env| controller.knockback(env, Horizontal::Left));

    assert_eq!(rig.controller.current(), StateId::Crouching);
    assert!(!rig.controller.status().is_knockback_active);
}

// -----------------------------------------------------------------------------
// Ladder and wall tests
// -----------------------------------------------------------------------------

#[test]
fn test_pressing_up_on_ladder_climbs() {
    let mut terrain = floor();
    terrain.add_box(Vec2::new(0.0, 2.5), Vec2::new(1.0, 5.0), GameLayer::Ladder);
    let mut rig = Rig::new(terrain, Vec2::new(0.0, 0.5), StateSettings::default());
    rig.settle();

    rig.tick(input(Vec2::Y, ButtonState::default()));
    assert_eq!(rig.controller.current(), StateId::Ladder);
    let start = rig.body().position().y;
    for _ in 0..10 {
        rig.tick(input(Vec2::Y, ButtonState::default()));
    }
    assert!(rig.body().position().y > start + 0.5);
    assert!(rig.controller.states().ladder.as_ref().unwrap().is_climbing());

    rig.tick(input(Vec2::ZERO, ButtonState::pressed()));
    assert_ne!(rig.controller.current(), StateId::Ladder);
    assert_eq!(rig.controller.status().frames_since_drop, 1);
}

#[test]
fn test_wall_cling_then_wall_jump_kicks_away() {
    let mut terrain = floor();
    terrain.add_box(Vec2::new(2.5, 5.0), Vec2::new(1.0, 10.0), GameLayer::Terrain);
    let mut rig = Rig::new(terrain, Vec2::new(1.3, 5.0), StateSettings::default());

    for _ in 0..10 {
        rig.tick(input(Vec2::X, ButtonState::default()));
        if rig.controller.current() == StateId::WallCling {
            break;
        }
    }
    assert_eq!(rig.controller.current(), StateId::WallCling);
    rig.tick(input(Vec2::X, ButtonState::default()));
    let slide = rig.controller.states().wall_cling.as_ref().unwrap().settings.wall_slide_speed;
    assert_eq!(rig.body().velocity().y, -slide);

    rig.tick(input(Vec2::X, ButtonState::pressed()));
    assert_eq!(rig.controller.current(), StateId::Jumping);
    assert!(rig.body().velocity().x < 0.0);
    assert_eq!(rig.jumps(), 1);
}

// -----------------------------------------------------------------------------
// Life-cycle tests
// -----------------------------------------------------------------------------

#[test]
fn test_dead_controller_ignores_input_until_revived() {
    let mut rig = Rig::on_floor(StateSettings::default());
    rig.with_env(|controller, env| controller.set_to_dead(env));
    assert_eq!(rig.controller.current(), StateId::Death);
    assert!(rig.controller.status().is_dead);

    rig.tick(input(Vec2::X, ButtonState::pressed()));
    assert_eq!(rig.controller.current(), StateId::Death);

    rig.with_env(|controller, env| controller.set_to_alive(env));
    assert!(!rig.controller.status().is_dead);
    assert_eq!(rig.controller.current(), StateId::Default);
}

#[test]
fn test_stun_sets_and_clears_flag() {
    let mut rig = Rig::on_floor(StateSettings::default());
    rig.with_env(|controller, env| controller.stun(env));
    assert!(rig.controller.status().is_stunned);
    assert!(rig.events.contains(&ControllerEvent::Stunned));

    for _ in 0..61 {
        rig.tick(InputSnapshot::default());
    }
    assert!(!rig.controller.status().is_stunned);
}
