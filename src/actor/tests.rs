//! Actor domain: tests for damage, death and actor-to-actor contact.

use bevy::prelude::*;

use super::{Actor, ActorEvent, ActorSettings, resolve_contact};
use crate::animation::NullAnimator;
use crate::combat::{AttackSettings, CanceledBy, HitboxSettings, Team};
use crate::config::MovesetConfig;
use crate::controller::{ButtonState, InputSnapshot, StateId};
use crate::physics::{GameLayer, PhysicsSettings, PhysicsWorld, Terrain};

fn world() -> PhysicsWorld {
    let mut terrain = Terrain::new();
    terrain.add_box(Vec2::new(0.0, -0.5), Vec2::new(40.0, 1.0), GameLayer::Terrain);
    PhysicsWorld::new(PhysicsSettings::default(), terrain).unwrap()
}

fn moveset(actor: ActorSettings, attacks: Vec<AttackSettings>) -> MovesetConfig {
    MovesetConfig {
        actor,
        attacks,
        ..default()
    }
}

fn spawn(world: &mut PhysicsWorld, config: &MovesetConfig, position: Vec2) -> Actor {
    Actor::spawn(world, config, position, Box::new(NullAnimator)).unwrap()
}

fn player_settings() -> ActorSettings {
    ActorSettings {
        team: Team::Player,
        ..default()
    }
}

fn enemy_settings() -> ActorSettings {
    ActorSettings {
        team: Team::Enemy,
        contact_damage: 1,
        ..default()
    }
}

fn tick_all(world: &mut PhysicsWorld, actors: &mut [&mut Actor], input: &InputSnapshot) {
    world.step();
    for actor in actors.iter_mut() {
        actor.tick(world, input);
    }
}

fn settle(world: &mut PhysicsWorld, actors: &mut [&mut Actor]) {
    for _ in 0..5 {
        tick_all(world, actors, &InputSnapshot::default());
    }
    for actor in actors.iter_mut() {
        actor.drain_events();
    }
}

fn attack_press() -> InputSnapshot {
    InputSnapshot {
        attack: ButtonState::pressed(),
        ..default()
    }
}

// -----------------------------------------------------------------------------
// Damage tests
// -----------------------------------------------------------------------------

#[test]
fn test_damage_reduces_hp_and_knocks_away_from_source() {
    let mut world = world();
    let mut actor = spawn(&mut world, &moveset(player_settings(), vec![]), Vec2::new(0.0, 0.5));
    settle(&mut world, &mut [&mut actor]);

    assert!(actor.damage(&mut world, 1, Vec2::new(2.0, 0.5), true));
    assert_eq!(actor.hp(), 2);
    assert_eq!(actor.controller().current(), StateId::Knockback);
    assert!(world.body(actor.body()).unwrap().velocity().x < 0.0);

    let events = actor.drain_events();
    assert!(events.contains(&ActorEvent::Damaged {
        amount: 1,
        hp: 2,
        source: Vec2::new(2.0, 0.5),
    }));
    assert!(events.contains(&ActorEvent::StateChanged {
        from: StateId::Default,
        to: StateId::Knockback,
    }));
}

#[test]
fn test_invincibility_window_blocks_repeat_hits() {
    let mut world = world();
    let mut actor = spawn(&mut world, &moveset(player_settings(), vec![]), Vec2::new(0.0, 0.5));
    settle(&mut world, &mut [&mut actor]);

    assert!(actor.damage(&mut world, 1, Vec2::ZERO, false));
    assert!(actor.is_invincible());
    assert!(!actor.damage(&mut world, 1, Vec2::ZERO, false));

    // 0.15 s at the default step is 9 ticks.
    for _ in 0..9 {
        tick_all(&mut world, &mut [&mut actor], &InputSnapshot::default());
    }
    assert!(!actor.is_invincible());
    assert!(actor.damage(&mut world, 1, Vec2::ZERO, false));
    assert_eq!(actor.hp(), 1);
}

#[test]
fn test_always_invincible_ignores_damage() {
    let mut world = world();
    let settings = ActorSettings {
        always_invincible: true,
        ..player_settings()
    };
    let mut actor = spawn(&mut world, &moveset(settings, vec![]), Vec2::new(0.0, 0.5));
    assert!(!actor.damage(&mut world, 5, Vec2::ZERO, true));
    assert_eq!(actor.hp(), 3);
}

#[test]
fn test_knockback_cancels_attack_that_allows_it() {
    let mut world = world();
    let attack = AttackSettings {
        canceled_by: CanceledBy {
            on_knockback: true,
            ..default()
        },
        ..default()
    };
    let mut actor = spawn(&mut world, &moveset(player_settings(), vec![attack]), Vec2::new(0.0, 0.5));
    settle(&mut world, &mut [&mut actor]);

    tick_all(&mut world, &mut [&mut actor], &attack_press());
    assert!(actor.attacks().is_attacking());

    actor.damage(&mut world, 1, Vec2::new(-2.0, 0.5), true);
    assert!(!actor.attacks().is_attacking());
    assert_eq!(actor.attacks().current_index(), None);
    assert_eq!(actor.controller().current(), StateId::Knockback);
}

#[test]
fn test_attack_that_ignores_knockback_absorbs_it() {
    let mut world = world();
    let mut actor = spawn(
        &mut world,
        &moveset(player_settings(), vec![AttackSettings::default()]),
        Vec2::new(0.0, 0.5),
    );
    settle(&mut world, &mut [&mut actor]);

    tick_all(&mut world, &mut [&mut actor], &attack_press());
    assert!(actor.attacks().is_attacking());
    let velocity_x = world.body(actor.body()).unwrap().velocity().x;

    assert!(actor.damage(&mut world, 1, Vec2::new(-2.0, 0.5), true));
    assert_eq!(actor.hp(), 2);
    assert!(actor.attacks().is_attacking());
    assert_ne!(actor.controller().current(), StateId::Knockback);
    assert!(!actor.controller().status().is_knockback_active);
    assert_eq!(world.body(actor.body()).unwrap().velocity().x, velocity_x);
}

// -----------------------------------------------------------------------------
// Death tests
// -----------------------------------------------------------------------------

#[test]
fn test_lethal_damage_kills_then_revive_restores() {
    let mut world = world();
    let settings = ActorSettings {
        max_hp: 1,
        ..player_settings()
    };
    let mut actor = spawn(&mut world, &moveset(settings, vec![]), Vec2::new(0.0, 0.5));
    settle(&mut world, &mut [&mut actor]);

    assert!(actor.damage(&mut world, 4, Vec2::ZERO, true));
    assert_eq!(actor.hp(), 0);
    assert!(actor.is_dead());
    assert_eq!(actor.controller().current(), StateId::Death);
    assert!(actor.drain_events().contains(&ActorEvent::Died));
    assert!(!actor.damage(&mut world, 1, Vec2::ZERO, false));

    actor.revive(&mut world);
    assert!(!actor.is_dead());
    assert_eq!(actor.hp(), 1);
    assert_eq!(actor.controller().current(), StateId::Default);
    assert!(world.body(actor.body()).unwrap().is_enabled());
}

#[test]
fn test_set_position_resets_fall_height() {
    let mut world = world();
    let mut actor = spawn(&mut world, &moveset(player_settings(), vec![]), Vec2::new(0.0, 0.5));
    settle(&mut world, &mut [&mut actor]);

    actor.set_position(&mut world, Vec2::new(3.0, 8.0));
    assert_eq!(world.body(actor.body()).unwrap().position(), Vec2::new(3.0, 8.0));
    assert_eq!(actor.controller().status().aerial_peak, 8.0);
}

// -----------------------------------------------------------------------------
// Contact tests
// -----------------------------------------------------------------------------

#[test]
fn test_touching_hostile_deals_contact_damage() {
    let mut world = world();
    let mut player = spawn(&mut world, &moveset(player_settings(), vec![]), Vec2::new(0.0, 0.5));
    let mut enemy = spawn(&mut world, &moveset(enemy_settings(), vec![]), Vec2::new(0.5, 0.5));
    settle(&mut world, &mut [&mut player, &mut enemy]);

    resolve_contact(&mut player, &mut enemy, &mut world);
    resolve_contact(&mut enemy, &mut player, &mut world);
    assert_eq!(player.hp(), 2);
    assert_eq!(enemy.hp(), 3);
    assert_eq!(player.controller().current(), StateId::Knockback);

    // Still invincible on the next contact.
    resolve_contact(&mut player, &mut enemy, &mut world);
    assert_eq!(player.hp(), 2);
}

#[test]
fn test_same_team_contact_is_harmless() {
    let mut world = world();
    let mut a = spawn(&mut world, &moveset(enemy_settings(), vec![]), Vec2::new(0.0, 0.5));
    let mut b = spawn(&mut world, &moveset(enemy_settings(), vec![]), Vec2::new(0.5, 0.5));

    resolve_contact(&mut a, &mut b, &mut world);
    resolve_contact(&mut b, &mut a, &mut world);
    assert_eq!(a.hp(), 3);
    assert_eq!(b.hp(), 3);
}

#[test]
fn test_falling_onto_bounceable_actor_bounces_and_damages_it() {
    let mut world = world();
    let target = ActorSettings {
        can_bounce_on: true,
        ..enemy_settings()
    };
    let mut enemy = spawn(&mut world, &moveset(target, vec![]), Vec2::new(0.0, 0.5));
    let mut player = spawn(&mut world, &moveset(player_settings(), vec![]), Vec2::new(0.0, 1.45));

    resolve_contact(&mut player, &mut enemy, &mut world);
    assert_eq!(player.controller().current(), StateId::Bouncing);
    assert!(player.controller().states().bounce.as_ref().unwrap().is_active());
    assert_eq!(player.hp(), 3);
    assert_eq!(enemy.hp(), 2);

    // Lifted clear of the enemy's head.
    let feet = world.body(player.body()).unwrap().aabb().min.y;
    assert!(feet > 1.0);
}

#[test]
fn test_attack_hitbox_strikes_each_target_once() {
    let mut world = world();
    let attack = AttackSettings {
        hitbox: Some(HitboxSettings {
            knockback: false,
            ..default()
        }),
        ..default()
    };
    let mut player = spawn(&mut world, &moveset(player_settings(), vec![attack]), Vec2::new(0.0, 0.5));
    let enemy_config = moveset(
        ActorSettings {
            contact_damage: 0,
            ..enemy_settings()
        },
        vec![],
    );
    let mut enemy = spawn(&mut world, &enemy_config, Vec2::new(1.2, 0.5));
    settle(&mut world, &mut [&mut player, &mut enemy]);

    world.step();
    player.tick(&mut world, &attack_press());
    enemy.tick(&mut world, &InputSnapshot::default());
    assert!(player.attacks().is_attacking());

    resolve_contact(&mut player, &mut enemy, &mut world);
    assert_eq!(enemy.hp(), 2);

    for _ in 0..10 {
        tick_all(&mut world, &mut [&mut player, &mut enemy], &InputSnapshot::default());
    }
    assert!(!enemy.is_invincible());
    assert!(player.attacks().is_attacking());
    resolve_contact(&mut player, &mut enemy, &mut world);
    assert_eq!(enemy.hp(), 2);
}
