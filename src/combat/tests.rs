//! Combat domain: tests for attack admission, playback and cancel tables.

use std::sync::Arc;

use bevy::prelude::*;

use super::{
    ActionType, ActionsAllowedDuringAttack, AttackClips, AttackContext, AttackDirection,
    AttackInput, AttackSet, AttackSettings, CanceledBy, HitboxSettings, Team,
};
use crate::animation::{ClipLibrary, ClipManifest, NullAnimator};
use crate::controller::{ButtonState, InputSnapshot, StateId};
use crate::core::Horizontal;

const DT: f32 = 0.01667;

fn ctx(state: StateId) -> AttackContext {
    AttackContext {
        state,
        incapacitated: false,
        reverse_on_wall: true,
        fixed_dt: DT,
    }
}

fn slash() -> AttackSettings {
    AttackSettings {
        name: "slash".to_string(),
        ..default()
    }
}

fn attack_press() -> InputSnapshot {
    InputSnapshot {
        attack: ButtonState::pressed(),
        ..default()
    }
}

// -----------------------------------------------------------------------------
// Admission tests
// -----------------------------------------------------------------------------

#[test]
fn test_attack_starts_from_standing() {
    let mut set = AttackSet::new(vec![slash()]);
    let started = set.poll(&attack_press(), &ctx(StateId::Default), &mut NullAnimator);
    assert_eq!(started, Some(0));
    assert!(set.is_attacking());
    assert!(set.get(0).unwrap().is_active());
}

#[test]
fn test_attack_needs_a_press_this_frame() {
    let mut set = AttackSet::new(vec![slash()]);
    let held = InputSnapshot {
        attack: ButtonState::held(),
        ..default()
    };
    assert_eq!(set.poll(&held, &ctx(StateId::Default), &mut NullAnimator), None);
}

#[test]
fn test_sub_attack_button_only_starts_sub_attacks() {
    let sub = AttackSettings {
        name: "throw".to_string(),
        input: AttackInput::Sub,
        ..default()
    };
    let mut set = AttackSet::new(vec![slash(), sub]);
    let press = InputSnapshot {
        sub_attack: ButtonState::pressed(),
        ..default()
    };
    assert_eq!(set.poll(&press, &ctx(StateId::Default), &mut NullAnimator), Some(1));
}

#[test]
fn test_attack_rejected_from_disallowed_state() {
    let set = AttackSet::new(vec![slash()]);
    assert!(!set.can_initiate(0, &ctx(StateId::Dashing)));
    assert!(!set.can_initiate(0, &ctx(StateId::Death)));
    assert!(set.can_initiate(0, &ctx(StateId::Jumping)));
}

#[test]
fn test_attack_rejected_while_incapacitated_or_disabled() {
    let mut disabled = slash();
    disabled.enabled = false;
    let set = AttackSet::new(vec![slash(), disabled]);

    let mut stunned = ctx(StateId::Default);
    stunned.incapacitated = true;
    assert!(!set.can_initiate(0, &stunned));
    assert!(!set.can_initiate(1, &ctx(StateId::Default)));
}

#[test]
fn test_attack_cannot_restart_itself_unless_allowed() {
    let mut combo = slash();
    combo.actions_allowed.attacking = true;
    let mut set = AttackSet::new(vec![slash(), combo]);

    assert!(set.begin(0, &ctx(StateId::Default), &mut NullAnimator));
    assert!(!set.can_initiate(0, &ctx(StateId::Default)));
    assert!(set.can_initiate(1, &ctx(StateId::Default)));
}

#[test]
fn test_cooldown_blocks_until_spent() {
    let mut settings = slash();
    settings.cooldown_frames = 5;
    settings.fallback_duration = DT;
    let mut set = AttackSet::new(vec![settings]);

    assert!(set.begin(0, &ctx(StateId::Default), &mut NullAnimator));
    assert_eq!(set.fixed_update(), Some(0));
    assert!(!set.can_initiate(0, &ctx(StateId::Default)));
    for _ in 0..4 {
        set.fixed_update();
    }
    assert!(set.can_initiate(0, &ctx(StateId::Default)));
}

#[test]
fn test_instance_limit_counts_spawned_objects() {
    let mut settings = slash();
    settings.limit_instances = 2;
    let mut set = AttackSet::new(vec![settings]);
    set.get_mut(0).unwrap().spawned_instances = 2;
    assert!(!set.can_initiate(0, &ctx(StateId::Default)));

    set.get_mut(0).unwrap().spawned_instances = 1;
    assert!(set.can_initiate(0, &ctx(StateId::Default)));
}

// -----------------------------------------------------------------------------
// Playback tests
// -----------------------------------------------------------------------------

#[test]
fn test_attack_without_clips_runs_fallback_duration() {
    let mut set = AttackSet::new(vec![slash()]);
    set.begin(0, &ctx(StateId::Default), &mut NullAnimator);
    assert_eq!(set.current().unwrap().remaining_ticks(), 30);

    for _ in 0..29 {
        assert_eq!(set.fixed_update(), None);
    }
    assert_eq!(set.fixed_update(), Some(0));
    assert!(!set.is_attacking());
}

#[test]
fn test_attack_duration_uses_longer_clip() {
    let manifest = ClipManifest::from_json(
        r#"{
            "version": 1,
            "clips": {
                "slash_fx": { "frames": 6, "fps": 60.0 },
                "hero_slash": { "frames": 12, "fps": 60.0 }
            }
        }"#,
    )
    .unwrap();
    let mut library = ClipLibrary::new(Arc::new(manifest));
    let mut settings = slash();
    settings.attack_clips = AttackClips {
        standing: Some("slash_fx".to_string()),
        ..default()
    };
    settings.actor_clips = AttackClips {
        standing: Some("hero_slash".to_string()),
        ..default()
    };
    let mut set = AttackSet::new(vec![settings]);

    set.begin(0, &ctx(StateId::Default), &mut library);
    assert_eq!(set.current().unwrap().remaining_ticks(), 12);
    assert_eq!(library.current_clip(), Some("hero_slash"));
}

#[test]
fn test_wall_cling_attack_faces_behind() {
    let mut settings = slash();
    settings.can_initiate_from.wall_clinging = true;
    settings.hitbox = Some(HitboxSettings::default());
    let mut set = AttackSet::new(vec![settings]);

    set.begin(0, &ctx(StateId::WallCling), &mut NullAnimator);
    let attack = set.current().unwrap();
    assert_eq!(attack.direction(), AttackDirection::Behind);

    let hitbox = attack.hitbox(Vec2::ZERO, Horizontal::Right).unwrap();
    assert!(hitbox.center().x < 0.0);
}

#[test]
fn test_hitbox_mirrors_with_facing() {
    let mut settings = slash();
    settings.hitbox = Some(HitboxSettings {
        offset: Vec2::new(1.0, 0.5),
        ..default()
    });
    let set = AttackSet::new(vec![settings]);
    let attack = set.get(0).unwrap();

    let right = attack.hitbox(Vec2::new(2.0, 0.0), Horizontal::Right).unwrap();
    let left = attack.hitbox(Vec2::new(2.0, 0.0), Horizontal::Left).unwrap();
    assert_eq!(right.center(), Vec2::new(3.0, 0.5));
    assert_eq!(left.center(), Vec2::new(1.0, 0.5));
}

// -----------------------------------------------------------------------------
// Interrupt and cancel tests
// -----------------------------------------------------------------------------

#[test]
fn test_locks_follow_allowed_actions() {
    let mut settings = slash();
    settings.actions_allowed = ActionsAllowedDuringAttack {
        air_moving: true,
        ..default()
    };
    let mut set = AttackSet::new(vec![settings]);
    assert!(!set.is_locked_for(ActionType::Jumping));

    set.begin(0, &ctx(StateId::Default), &mut NullAnimator);
    assert!(set.is_locked_for(ActionType::Jumping));
    assert!(set.is_locked_for(ActionType::GroundMoving));
    assert!(!set.is_locked_for(ActionType::AirMoving));
}

#[test]
fn test_cancel_if_respects_cancel_table() {
    let mut settings = slash();
    settings.canceled_by = CanceledBy {
        on_knockback: true,
        ..default()
    };
    let mut set = AttackSet::new(vec![settings]);
    set.begin(0, &ctx(StateId::Default), &mut NullAnimator);

    assert!(!set.cancel_if(|c| c.on_jump));
    assert!(set.is_attacking());
    assert!(set.cancel_if(|c| c.on_knockback));
    assert!(!set.is_attacking());
    assert_eq!(set.current_index(), None);
}

// -----------------------------------------------------------------------------
// Team tests
// -----------------------------------------------------------------------------

#[test]
fn test_only_opposing_teams_are_hostile() {
    assert!(Team::Player.is_hostile_to(Team::Enemy));
    assert!(Team::Enemy.is_hostile_to(Team::Player));
    assert!(!Team::Enemy.is_hostile_to(Team::Enemy));
    assert!(!Team::Neutral.is_hostile_to(Team::Player));
}
