//! AI domain: tests for the patrol brain driving a real actor.

use bevy::prelude::*;

use super::{PatrolBrain, PatrolSettings};
use crate::actor::{Actor, ActorSettings};
use crate::animation::NullAnimator;
use crate::combat::Team;
use crate::config::MovesetConfig;
use crate::controller::{InputSnapshot, StateId};
use crate::core::Horizontal;
use crate::physics::{GameLayer, PhysicsSettings, PhysicsWorld, Terrain};

fn world_with(floor_width: f32, wall_x: Option<f32>) -> PhysicsWorld {
    let mut terrain = Terrain::new();
    terrain.add_box(
        Vec2::new(0.0, -0.5),
        Vec2::new(floor_width, 1.0),
        GameLayer::Terrain,
    );
    if let Some(x) = wall_x {
        terrain.add_box(Vec2::new(x + 0.5, 5.0), Vec2::new(1.0, 10.0), GameLayer::Terrain);
    }
    PhysicsWorld::new(PhysicsSettings::default(), terrain).unwrap()
}

fn enemy(world: &mut PhysicsWorld) -> Actor {
    let config = MovesetConfig {
        actor: ActorSettings {
            team: Team::Enemy,
            ..default()
        },
        ..default()
    };
    Actor::spawn(world, &config, Vec2::new(0.0, 0.5), Box::new(NullAnimator)).unwrap()
}

fn quiet() -> PatrolSettings {
    PatrolSettings {
        attack_interval_max: 0.0,
        ..default()
    }
}

/// Steps the world and the actor once with the brain's input.
fn step(world: &mut PhysicsWorld, actor: &mut Actor, brain: &mut PatrolBrain) -> InputSnapshot {
    world.step();
    let input = brain.think(world, actor);
    actor.tick(world, &input);
    input
}

// -----------------------------------------------------------------------------
// Walking tests
// -----------------------------------------------------------------------------

#[test]
fn test_patrol_walks_the_way_the_actor_faces() {
    let mut world = world_with(40.0, None);
    let mut actor = enemy(&mut world);
    let mut brain = PatrolBrain::new(quiet());

    let input = step(&mut world, &mut actor, &mut brain);
    assert_eq!(input.axis, Vec2::X);
    assert_eq!(brain.walking(), Horizontal::Right);
}

#[test]
fn test_patrol_turns_around_at_wall() {
    let mut world = world_with(40.0, Some(3.0));
    let mut actor = enemy(&mut world);
    let mut brain = PatrolBrain::new(quiet());

    let mut turned = false;
    for _ in 0..120 {
        step(&mut world, &mut actor, &mut brain);
        turned |= brain.walking() == Horizontal::Left;
    }
    assert!(turned);
    assert!(world.body(actor.body()).unwrap().position().x < 3.0);
}

#[test]
fn test_patrol_never_walks_off_a_ledge() {
    let mut world = world_with(4.0, None);
    let mut actor = enemy(&mut world);
    let mut brain = PatrolBrain::new(quiet());

    let mut saw_left = false;
    for _ in 0..300 {
        step(&mut world, &mut actor, &mut brain);
        saw_left |= brain.walking() == Horizontal::Left;
    }
    let body = world.body(actor.body()).unwrap();
    assert!(saw_left);
    assert!(body.is_on_surface());
    assert!(body.position().x.abs() < 2.0);
}

#[test]
fn test_dead_actor_gets_no_input() {
    let mut world = world_with(40.0, None);
    let mut actor = enemy(&mut world);
    let mut brain = PatrolBrain::new(quiet());
    actor.die(&mut world);

    assert_eq!(brain.think(&world, &actor), InputSnapshot::default());
}

// -----------------------------------------------------------------------------
// Timer tests
// -----------------------------------------------------------------------------

#[test]
fn test_jumps_on_interval() {
    let mut world = world_with(40.0, None);
    let mut actor = enemy(&mut world);
    let mut brain = PatrolBrain::new(PatrolSettings {
        jump_interval: 0.5,
        ..quiet()
    });

    let mut presses = Vec::new();
    for tick in 1..=95 {
        let input = step(&mut world, &mut actor, &mut brain);
        if input.jump.pressed_this_frame {
            presses.push(tick);
            assert_eq!(actor.controller().current(), StateId::Jumping);
        }
    }
    assert_eq!(presses, vec![30, 60, 90]);
}

fn attack_ticks(seed: u64) -> Vec<u32> {
    let mut world = world_with(40.0, None);
    let mut actor = enemy(&mut world);
    let mut brain = PatrolBrain::new(PatrolSettings {
        seed,
        ..default()
    });
    (1..=600)
        .filter(|_| step(&mut world, &mut actor, &mut brain).attack.pressed_this_frame)
        .collect()
}

#[test]
fn test_same_seed_gives_same_attack_schedule() {
    let first = attack_ticks(7);
    assert!(!first.is_empty());
    assert_eq!(first, attack_ticks(7));
}

#[test]
fn test_attack_waits_stay_within_range() {
    let ticks = attack_ticks(42);
    assert!(ticks.len() >= 3);
    let mut previous = 0;
    for tick in ticks {
        let wait = tick - previous;
        assert!((90..=180).contains(&wait), "wait of {wait} ticks");
        previous = tick;
    }
}

#[test]
fn test_attacks_off_when_interval_is_zero() {
    let mut world = world_with(40.0, None);
    let mut actor = enemy(&mut world);
    let mut brain = PatrolBrain::new(quiet());
    for _ in 0..400 {
        let input = step(&mut world, &mut actor, &mut brain);
        assert!(!input.attack.pressed_this_frame);
    }
    assert_eq!(brain.ticks_until_attack(), 0);
}
