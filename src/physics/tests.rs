//! Physics domain: tests for the raycast resolver, the scheduler and platforms.

use bevy::prelude::*;

use super::*;
use crate::config::ConfigError;
use crate::core::{CollisionKind, Horizontal, Side, Vertical};

fn floor_terrain() -> Terrain {
    let mut terrain = Terrain::new();
    terrain.add_box(Vec2::new(0.0, -0.5), Vec2::new(40.0, 1.0), GameLayer::Terrain);
    terrain
}

fn world_with(terrain: Terrain) -> PhysicsWorld {
    PhysicsWorld::new(PhysicsSettings::default(), terrain).unwrap()
}

fn step_n(world: &mut PhysicsWorld, ticks: u32) {
    for _ in 0..ticks {
        world.step();
    }
}

fn landings(events: &[PhysicsEvent], side: Side) -> usize {
    events
        .iter()
        .filter(|e| {
            matches!(e, PhysicsEvent::Collision(c) if c.side == side && c.kind == CollisionKind::Enter)
        })
        .count()
}

// -----------------------------------------------------------------------------
// Terrain raycast tests
// -----------------------------------------------------------------------------

#[test]
fn test_raycast_returns_closest_hit() {
    let mut terrain = Terrain::new();
    let far = terrain.add_box(Vec2::new(0.0, -3.0), Vec2::new(4.0, 1.0), GameLayer::Terrain);
    let near = terrain.add_box(Vec2::new(0.0, -0.5), Vec2::new(4.0, 1.0), GameLayer::Terrain);
    let mask = mask_of(&[GameLayer::Terrain]);

    let hit = terrain
        .raycast(Vec2::new(0.0, 1.0), Vec2::NEG_Y, 10.0, mask, None)
        .unwrap();
    assert_eq!(hit.collider, near);
    assert!((hit.distance - 1.0).abs() < 1e-5);
    assert!((hit.fraction - 0.1).abs() < 1e-5);

    terrain.get_mut(near).unwrap().enabled = false;
    let hit = terrain
        .raycast(Vec2::new(0.0, 1.0), Vec2::NEG_Y, 10.0, mask, None)
        .unwrap();
    assert_eq!(hit.collider, far);
}

#[test]
fn test_raycast_respects_mask_and_length() {
    let mut terrain = Terrain::new();
    terrain.add_box(Vec2::new(0.0, -0.5), Vec2::new(4.0, 1.0), GameLayer::PassThroughBottom);

    let solid = mask_of(&[GameLayer::Terrain]);
    let down = CollisionMasks::default().down;
    assert!(terrain.raycast(Vec2::new(0.0, 1.0), Vec2::NEG_Y, 5.0, solid, None).is_none());
    assert!(terrain.raycast(Vec2::new(0.0, 1.0), Vec2::NEG_Y, 0.5, down, None).is_none());
    assert!(terrain.raycast(Vec2::new(0.0, 1.0), Vec2::NEG_Y, 5.0, down, None).is_some());
}

#[test]
fn test_ray_starting_inside_collider_does_not_hit_it() {
    let mut terrain = Terrain::new();
    terrain.add_box(Vec2::ZERO, Vec2::new(4.0, 4.0), GameLayer::Terrain);
    let mask = mask_of(&[GameLayer::Terrain]);
    assert!(terrain.raycast(Vec2::ZERO, Vec2::X, 10.0, mask, None).is_none());
}

#[test]
fn test_angle_from_right() {
    assert_eq!(angle_from_right(Vec2::X), 0.0);
    assert!((angle_from_right(Vec2::Y) - 90.0).abs() < 1e-4);
    assert!((angle_from_right(Vec2::new(1.0, 1.0)) - 45.0).abs() < 1e-4);
}

// -----------------------------------------------------------------------------
// Body resolution tests
// -----------------------------------------------------------------------------

#[test]
fn test_falling_body_lands_exactly_once() {
    let mut world = world_with(floor_terrain());
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 3.0)).unwrap();

    let mut landed_ticks = 0;
    let mut events = Vec::new();
    for _ in 0..120 {
        world.step();
        let body = world.body_mut(id).unwrap();
        if body.did_land_this_frame() {
            landed_ticks += 1;
        }
        events.extend(body.drain_events());
    }

    let body = world.body(id).unwrap();
    assert_eq!(landed_ticks, 1);
    assert_eq!(landings(&events, Side::Bottom), 1);
    assert!(body.is_on_surface());
    assert!(!body.is_falling());
    assert!((body.position().y - 0.5).abs() < 1e-4);
}

#[test]
fn test_resting_body_stays_put() {
    let mut world = world_with(floor_terrain());
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 0.5)).unwrap();
    step_n(&mut world, 3);
    world.body_mut(id).unwrap().drain_events();
    let rest = world.body(id).unwrap().position();

    for _ in 0..30 {
        world.step();
        let body = world.body(id).unwrap();
        assert!(!body.did_land_this_frame());
        assert!((body.position() - rest).length() < 1e-5);
    }
    assert!(world.body(id).unwrap().events().is_empty());
}

#[test]
fn test_zero_motion_without_gravity_is_a_no_op() {
    let mut world = world_with(Terrain::new());
    let settings = BodySettings {
        gravity: GravitySettings {
            uses_gravity: false,
            ..default()
        },
        ..default()
    };
    let id = world.spawn_body(settings, Vec2::new(2.0, 2.0)).unwrap();
    step_n(&mut world, 10);

    let body = world.body(id).unwrap();
    assert_eq!(body.position(), Vec2::new(2.0, 2.0));
    assert_eq!(body.velocity(), Vec2::ZERO);
    assert!(body.events().is_empty());
}

#[test]
fn test_wall_blocks_and_flags_contact() {
    let mut terrain = floor_terrain();
    terrain.add_box(Vec2::new(3.5, 5.0), Vec2::new(1.0, 10.0), GameLayer::Terrain);
    let mut world = world_with(terrain);
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 0.5)).unwrap();
    world.body_mut(id).unwrap().set_velocity_x(4.0);

    let mut events = Vec::new();
    for _ in 0..60 {
        world.step();
        events.extend(world.body_mut(id).unwrap().drain_events());
    }

    let body = world.body(id).unwrap();
    assert!(body.properties().is_against_right_wall);
    assert!(!body.properties().is_against_left_wall);
    assert_eq!(body.velocity().x, 0.0);
    assert!((body.position().x - 2.5).abs() < 1e-4);
    assert_eq!(landings(&events, Side::Right), 1);
}

#[test]
fn test_slope_is_climbed_not_treated_as_wall() {
    let mut terrain = floor_terrain();
    terrain.add(
        Vec2::new(2.0, 1.0),
        Shape::Slope {
            half_extents: Vec2::new(2.0, 1.0),
            rising: Horizontal::Right,
        },
        GameLayer::Terrain,
    );
    let mut world = world_with(terrain);
    let id = world.spawn_body(BodySettings::default(), Vec2::new(-1.0, 0.5)).unwrap();
    world.body_mut(id).unwrap().set_velocity_x(4.0);

    for _ in 0..30 {
        world.step();
        assert!(!world.body(id).unwrap().properties().is_against_right_wall);
    }
    let body = world.body(id).unwrap();
    assert!(body.position().x > 0.5);
    assert!(body.position().y > 0.75);
    assert!(body.is_on_surface());
}

/// Drives a body right at a slope rising to the right at `degrees`, whose foot is at x = 2.
fn run_at_slope(degrees: f32, ticks: u32) -> (PhysicsWorld, BodyId, Vec<PhysicsEvent>) {
    let half_height = 0.5 * degrees.to_radians().tan();
    let mut terrain = floor_terrain();
    terrain.add(
        Vec2::new(2.5, half_height),
        Shape::Slope {
            half_extents: Vec2::new(0.5, half_height),
            rising: Horizontal::Right,
        },
        GameLayer::Terrain,
    );
    let mut world = world_with(terrain);
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 0.5)).unwrap();
    world.body_mut(id).unwrap().set_velocity_x(4.0);

    let mut events = Vec::new();
    for _ in 0..ticks {
        world.step();
        events.extend(world.body_mut(id).unwrap().drain_events());
    }
    (world, id, events)
}

#[test]
fn test_slope_within_wall_tolerance_blocks() {
    let (world, id, events) = run_at_slope(85.0, 60);

    let body = world.body(id).unwrap();
    assert_eq!(landings(&events, Side::Right), 1);
    assert_eq!(body.velocity().x, 0.0);
    assert!((body.position().x - 1.5).abs() < 0.01);
    assert!((body.position().y - 0.5).abs() < 1e-4);
}

#[test]
fn test_steep_slope_outside_wall_tolerance_is_climbed() {
    let (world, id, events) = run_at_slope(75.0, 30);

    let body = world.body(id).unwrap();
    assert_eq!(landings(&events, Side::Right), 0);
    assert!(body.position().x > 1.8);
    assert!(body.position().y > 1.5);
    assert!(body.is_on_surface());
}

#[test]
fn test_uneven_floor_rests_on_the_highest_hit() {
    let mut terrain = floor_terrain();
    // Raised steps under the right edge of one body and the left edge of the other.
    terrain.add_box(Vec2::new(1.15, 0.15), Vec2::new(1.7, 0.3), GameLayer::Terrain);
    terrain.add_box(Vec2::new(8.85, 0.15), Vec2::new(1.7, 0.3), GameLayer::Terrain);
    let mut world = world_with(terrain);
    let right = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 2.0)).unwrap();
    let left = world.spawn_body(BodySettings::default(), Vec2::new(10.0, 2.0)).unwrap();
    step_n(&mut world, 120);

    for id in [right, left] {
        let body = world.body(id).unwrap();
        assert!(body.is_on_surface());
        assert!((body.position().y - 0.8).abs() < 1e-4);
    }
}

/// Moves a body right into a 0.04-high lip for 20 ticks, by its own velocity or
/// by a platform carrying it. Returns the body and whether it ever hit a wall.
fn push_toward_lip(carried: bool) -> (KinematicBody, bool) {
    let mut terrain = floor_terrain();
    terrain.add_box(Vec2::new(1.2, 0.02), Vec2::new(1.0, 0.04), GameLayer::Terrain);
    let mut body = KinematicBody::new(BodySettings::default(), Vec2::new(0.0, 0.5)).unwrap();
    let fixed_dt = PhysicsSettings::default().fixed_delta_time;
    let platform = carried.then_some(PlatformMotion {
        velocity: Vec2::new(3.0, 0.0),
        move_distance: Vec2::ZERO,
    });
    if !carried {
        body.set_velocity_x(3.0);
    }

    let mut blocked = false;
    for _ in 0..20 {
        body.reset_flags();
        body.step(&StepEnv {
            terrain: &terrain,
            fixed_dt,
            self_id: BodyId(99),
            platform,
            on_camera: true,
        });
        blocked |= body.properties().is_against_right_wall;
    }
    (body, blocked)
}

#[test]
fn test_walking_body_is_stopped_by_a_low_lip() {
    let (body, blocked) = push_toward_lip(false);
    assert!(blocked);
    assert!((body.position().x - 0.2).abs() < 0.01);
    assert!((body.position().y - 0.5).abs() < 1e-4);
}

#[test]
fn test_carried_body_rides_over_a_low_lip() {
    let (body, blocked) = push_toward_lip(true);
    assert!(!blocked);
    assert!(body.position().x > 0.95);
    assert!((body.position().y - 0.54).abs() < 1e-3);
    assert!(body.is_on_surface());
}

#[test]
fn test_one_way_platform_is_solid_only_from_above() {
    let mut terrain = floor_terrain();
    terrain.add_box(
        Vec2::new(0.0, 2.0),
        Vec2::new(4.0, 0.5),
        GameLayer::PassThroughBottom,
    );
    let mut world = world_with(terrain);
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 0.5)).unwrap();
    step_n(&mut world, 2);

    // Jumps up through the underside and lands on top.
    world.body_mut(id).unwrap().set_velocity_y(20.0);
    step_n(&mut world, 120);
    let body = world.body(id).unwrap();
    assert!(body.is_on_surface());
    assert!((body.position().y - 2.75).abs() < 1e-4);

    // Dropping through once the platforms are masked out.
    world.body_mut(id).unwrap().disable_one_way_platforms();
    step_n(&mut world, 120);
    let body = world.body(id).unwrap();
    assert!(body.is_on_surface());
    assert!((body.position().y - 0.5).abs() < 1e-4);
}

#[test]
fn test_crouch_collider_swap_and_reset() {
    let mut body = KinematicBody::new(BodySettings::default(), Vec2::ZERO).unwrap();
    body.set_collider(Vec2::new(1.0, 0.5), Vec2::new(0.0, -0.25));
    assert_eq!(body.aabb().max.y, 0.0);
    body.reset_collider();
    assert_eq!(body.size(), Vec2::ONE);
    assert_eq!(body.aabb().max.y, 0.5);
}

// -----------------------------------------------------------------------------
// Scheduler tests
// -----------------------------------------------------------------------------

#[test]
fn test_gravity_flip_sends_bodies_to_the_ceiling() {
    let mut terrain = floor_terrain();
    terrain.add_box(Vec2::new(0.0, 6.0), Vec2::new(40.0, 1.0), GameLayer::Terrain);
    let mut world = world_with(terrain);
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 0.5)).unwrap();
    step_n(&mut world, 2);
    world.body_mut(id).unwrap().drain_events();

    world.flip_gravity();
    let mut events = Vec::new();
    let mut landed_ticks = 0;
    for _ in 0..120 {
        world.step();
        let body = world.body_mut(id).unwrap();
        if body.did_land_this_frame() {
            landed_ticks += 1;
        }
        events.extend(body.drain_events());
    }

    let body = world.body(id).unwrap();
    assert_eq!(body.gravity_scale(), -1.0);
    assert!(events.contains(&PhysicsEvent::GravityScaleChanged(-1.0)));
    assert_eq!(landed_ticks, 1);
    assert_eq!(landings(&events, Side::Top), 1);
    assert!(body.is_on_surface());
    assert!((body.position().y - 5.0).abs() < 1e-4);
}

#[test]
fn test_forced_gravity_scale_ignores_world_flip() {
    let mut world = world_with(floor_terrain());
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 0.5)).unwrap();
    let scale = world.gravity_scale();
    world.body_mut(id).unwrap().force_gravity_scale(Some(1.0), scale);

    world.flip_gravity();
    step_n(&mut world, 5);
    assert_eq!(world.body(id).unwrap().gravity_scale(), 1.0);
    assert!(world.body(id).unwrap().is_on_surface());
}

#[test]
fn test_paused_world_does_not_step() {
    let mut world = world_with(floor_terrain());
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 3.0)).unwrap();
    world.scheduler_mut().is_paused = true;
    step_n(&mut world, 10);
    assert_eq!(world.tick_count(), 0);
    assert_eq!(world.body(id).unwrap().position(), Vec2::new(0.0, 3.0));
}

#[test]
fn test_render_position_interpolates_between_ticks() {
    let mut world = world_with(floor_terrain());
    let id = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 3.0)).unwrap();
    step_n(&mut world, 3);

    let body = world.body(id).unwrap();
    let expected = body.previous_position().lerp(body.position(), 0.5);
    let drawn = world.render_position(id, 0.5).unwrap();
    assert!((drawn - expected).length() < 1e-6);
    assert_ne!(body.previous_position(), body.position());
}

#[test]
fn test_invalid_body_settings_are_rejected() {
    let mut world = world_with(Terrain::new());
    let mut settings = BodySettings::default();
    settings.raycasts.horizontal = 0;
    assert_eq!(
        world.spawn_body(settings, Vec2::ZERO),
        Err(ConfigError::ZeroRaycastCount { axis: "horizontal" })
    );

    let settings = BodySettings {
        size: Vec2::new(-1.0, 1.0),
        ..default()
    };
    assert!(world.spawn_body(settings, Vec2::ZERO).is_err());
    assert!(world.scheduler().bodies().is_empty());
}

// -----------------------------------------------------------------------------
// Moving platform tests
// -----------------------------------------------------------------------------

fn platform_world(motion: MovingPlatformSettings) -> (PhysicsWorld, BodyId) {
    let mut world = world_with(Terrain::new());
    let platform = world
        .spawn_platform(
            BodySettings {
                size: Vec2::new(4.0, 0.5),
                ..default()
            },
            Vec2::new(0.0, 2.0),
            GameLayer::Terrain,
            motion,
        )
        .unwrap();
    (world, platform)
}

#[test]
fn test_platform_carries_its_passenger() {
    let (mut world, platform) = platform_world(MovingPlatformSettings {
        move_speed: Vec2::new(3.0, 0.0),
        ..default()
    });
    let passenger = world.spawn_body(BodySettings::default(), Vec2::new(0.0, 2.75)).unwrap();
    step_n(&mut world, 60);

    let platform_x = world.body(platform).unwrap().position().x;
    let body = world.body(passenger).unwrap();
    assert!((platform_x - 3.0).abs() < 0.01);
    assert!(body.is_on_surface());
    assert_eq!(body.riding(), Some(platform));
    assert!((body.position().x - platform_x).abs() < 0.1);
    assert!(world.platform(platform).unwrap().has_passenger_on_top());
}

#[test]
fn test_platform_waits_for_a_passenger() {
    let (mut world, platform) = platform_world(MovingPlatformSettings {
        move_speed: Vec2::new(3.0, 0.0),
        starts_when_passenger_on_top: true,
        ..default()
    });
    step_n(&mut world, 10);
    assert!(!world.platform(platform).unwrap().is_moving());
    assert_eq!(world.body(platform).unwrap().position(), Vec2::new(0.0, 2.0));

    world.spawn_body(BodySettings::default(), Vec2::new(0.0, 2.75)).unwrap();
    step_n(&mut world, 10);
    assert!(world.platform(platform).unwrap().is_moving());
    assert!(world.body(platform).unwrap().position().x > 0.0);
}

#[test]
fn test_platform_turns_at_distance_limits() {
    let (mut world, platform) = platform_world(MovingPlatformSettings {
        move_speed: Vec2::new(6.0, 0.0),
        turns_on_distance: true,
        min_position: Vec2::new(-1.0, 0.0),
        max_position: Vec2::new(1.0, 0.0),
        ..default()
    });
    step_n(&mut world, 20);
    let state = world.platform(platform).unwrap();
    assert_eq!(state.direction_x(), Horizontal::Left);
    assert_eq!(state.direction_y(), Vertical::Up);
    assert!(world.body(platform).unwrap().position().x <= 1.0 + 0.11);
}

#[test]
fn test_despawned_platform_takes_its_collider() {
    let (mut world, platform) = platform_world(MovingPlatformSettings::default());
    assert_eq!(world.terrain.len(), 1);
    world.despawn_body(platform);
    assert!(world.terrain.is_empty());
    assert!(!world.contains(platform));
    assert!(world.scheduler().platforms().is_empty());
}

// -----------------------------------------------------------------------------
// Raycast helper tests
// -----------------------------------------------------------------------------

#[test]
fn test_ledge_check_sees_missing_floor() {
    let mut terrain = Terrain::new();
    terrain.add_box(Vec2::new(0.0, -0.5), Vec2::new(4.0, 1.0), GameLayer::Terrain);
    let body = KinematicBody::new(BodySettings::default(), Vec2::new(1.6, 0.5)).unwrap();

    assert!(is_next_to_ledge(&body, &terrain, Horizontal::Right, Vertical::Down));
    assert!(!is_next_to_ledge(&body, &terrain, Horizontal::Left, Vertical::Down));
}

#[test]
fn test_overhang_check() {
    let mut terrain = Terrain::new();
    terrain.add_box(Vec2::new(0.0, 1.6), Vec2::new(4.0, 1.0), GameLayer::Terrain);
    assert!(is_under_overhang(&terrain, Vertical::Up, Vec2::ONE, Vec2::new(0.0, 0.5)));
    assert!(!is_under_overhang(&terrain, Vertical::Up, Vec2::ONE, Vec2::new(5.0, 0.5)));
}
