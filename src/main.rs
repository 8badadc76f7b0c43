use std::path::Path;
use std::sync::Arc;

use bevy::ecs::message::MessageReader;
use bevy::prelude::*;
use bevy::window::WindowResolution;

use rex_engine::RexEnginePlugin;
use rex_engine::actor::{Actor, DeathEvent, LandedEvent};
use rex_engine::ai::{PatrolBrain, PatrolSettings};
use rex_engine::animation::{ClipLibrary, ClipManifest};
use rex_engine::combat::Team;
use rex_engine::config::{
    MovesetConfig, StageConfig, TerrainDef, TerrainShapeDef, Vec2Def, load_moveset,
    load_physics_settings, load_stage,
};
use rex_engine::controller::PlayerInput;
use rex_engine::core::Horizontal;
use rex_engine::physics::{GameLayer, PhysicsBody, PhysicsSettings, PhysicsWorld, SimulationSet};

const CONFIG_DIR: &str = "assets/config";
const CLIP_MANIFEST: &str = "assets/animation/clips.json";
/// Pixels per world unit.
const PIXELS_PER_UNIT: f32 = 32.0;

fn main() {
    App::new()
        .add_plugins(DefaultPlugins.set(WindowPlugin {
            primary_window: Some(Window {
                title: "RexEngine".to_string(),
                resolution: WindowResolution::new(1280, 720),
                resizable: true,
                ..default()
            }),
            ..default()
        }))
        .add_plugins((RexEnginePlugin, DemoPlugin))
        .run();
}

/// Loads the stage and movesets from `assets/config/` and spawns a player and
/// patrolling enemies into it.
struct DemoPlugin;

impl Plugin for DemoPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Startup, setup_demo)
            .add_systems(
                FixedUpdate,
                respawn_fallen_player
                    .after(SimulationSet::Controllers)
                    .run_if(resource_exists::<PhysicsWorld>),
            )
            .add_systems(Update, (face_sprites, log_hard_landings));

        #[cfg(feature = "dev-tools")]
        app.add_systems(
            Update,
            flip_gravity_on_key.run_if(resource_exists::<PhysicsWorld>),
        );
    }
}

/// Where the player comes back after dying.
#[derive(Resource, Debug, Clone, Copy)]
struct PlayerSpawn(Vec2);

fn config_path(file: &str) -> std::path::PathBuf {
    Path::new(CONFIG_DIR).join(file)
}

/// A flat floor with a step and a one-way ledge, for running without a stage file.
fn fallback_stage() -> StageConfig {
    let floor = |x: f32, y: f32, w: f32, h: f32, layer: GameLayer| TerrainDef {
        center: Vec2Def { x, y },
        shape: TerrainShapeDef::Box {
            size: Vec2Def { x: w, y: h },
        },
        layer,
    };
    StageConfig {
        terrain: vec![
            floor(0.0, -0.5, 40.0, 1.0, GameLayer::Terrain),
            floor(8.0, 1.0, 4.0, 2.0, GameLayer::Terrain),
            floor(-6.0, 2.5, 4.0, 0.5, GameLayer::PassThroughBottom),
        ],
        player_spawn: Vec2Def { x: 0.0, y: 1.0 },
        enemy_spawns: vec![Vec2Def { x: -4.0, y: 1.0 }],
        ..default()
    }
}

fn player_fallback() -> MovesetConfig {
    let mut config = MovesetConfig {
        name: "player".to_string(),
        ..default()
    };
    config.body.size = Vec2::new(1.0, 1.9);
    config.body.collides_with_boundaries = true;
    config.actor.team = Team::Player;
    config
}

fn enemy_fallback() -> MovesetConfig {
    let mut config = MovesetConfig {
        name: "enemy".to_string(),
        patrol: Some(PatrolSettings::default()),
        ..default()
    };
    config.actor.team = Team::Enemy;
    config.actor.contact_damage = 1;
    config.actor.can_bounce_on = true;
    config
}

fn layer_color(layer: GameLayer) -> Color {
    match layer {
        GameLayer::PassThroughBottom => Color::srgb(0.45, 0.55, 0.35),
        GameLayer::Ladder => Color::srgb(0.6, 0.45, 0.25),
        GameLayer::Boundaries => Color::srgba(0.2, 0.2, 0.2, 0.3),
        _ => Color::srgb(0.35, 0.35, 0.4),
    }
}

fn setup_demo(mut commands: Commands) {
    let settings = match load_physics_settings(&config_path("physics.ron")) {
        Ok(settings) => settings,
        Err(e) => {
            warn!("{}; using defaults", e);
            PhysicsSettings::default()
        }
    };
    let stage = match load_stage(&config_path("stage.ron")) {
        Ok(stage) => stage,
        Err(e) => {
            warn!("{}; using the built-in stage", e);
            fallback_stage()
        }
    };
    let mut world = match stage.build_world(settings.clone()) {
        Ok(world) => world,
        Err(e) => {
            error!("Stage could not be built: {}", e);
            return;
        }
    };

    let player_config = match load_moveset(&config_path("moveset.ron")) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            player_fallback()
        }
    };
    let enemy_config = match load_moveset(&config_path("enemy.ron")) {
        Ok(config) => config,
        Err(e) => {
            warn!("{}; using defaults", e);
            enemy_fallback()
        }
    };
    let manifest = Arc::new(ClipManifest::load_from_file(Path::new(CLIP_MANIFEST)));

    commands.spawn((
        Camera2d,
        Projection::from(OrthographicProjection {
            scale: 1.0 / PIXELS_PER_UNIT,
            ..OrthographicProjection::default_2d()
        }),
        Transform::from_xyz(0.0, 4.0, 0.0),
    ));

    for collider in world.terrain.iter().filter(|c| c.owner.is_none()) {
        let bounds = collider.aabb();
        commands.spawn((
            Sprite::from_color(layer_color(collider.layer), bounds.size()),
            Transform::from_translation(bounds.center().extend(-1.0)),
        ));
    }
    for &id in world.scheduler().platforms() {
        let Some(body) = world.body(id) else {
            continue;
        };
        commands.spawn((
            Name::new("Platform"),
            PhysicsBody(id),
            Sprite::from_color(Color::srgb(0.5, 0.5, 0.6), body.size()),
            Transform::from_translation(body.position().extend(-0.5)),
        ));
    }

    let player_spawn: Vec2 = stage.player_spawn.into();
    match Actor::spawn(
        &mut world,
        &player_config,
        player_spawn,
        Box::new(ClipLibrary::new(manifest.clone())),
    ) {
        Ok(actor) => {
            let body = actor.body();
            commands.spawn((
                Name::new("Player"),
                PhysicsBody(body),
                PlayerInput::default(),
                Sprite::from_color(Color::srgb(0.9, 0.75, 0.3), player_config.body.size),
                Transform::from_translation(player_spawn.extend(1.0)),
                actor,
            ));
        }
        Err(e) => error!("Player could not be spawned: {}", e),
    }

    let patrol = enemy_config.patrol.clone().unwrap_or_default();
    for (index, spawn) in stage.enemy_spawns.iter().enumerate() {
        let position: Vec2 = (*spawn).into();
        let actor = match Actor::spawn(
            &mut world,
            &enemy_config,
            position,
            Box::new(ClipLibrary::new(manifest.clone())),
        ) {
            Ok(actor) => actor,
            Err(e) => {
                error!("Enemy {} could not be spawned: {}", index, e);
                continue;
            }
        };
        let brain = PatrolBrain::new(PatrolSettings {
            seed: patrol.seed.wrapping_add(index as u64),
            ..patrol.clone()
        });
        commands.spawn((
            Name::new(format!("Enemy {}", index)),
            PhysicsBody(actor.body()),
            brain,
            Sprite::from_color(Color::srgb(0.8, 0.3, 0.3), enemy_config.body.size),
            Transform::from_translation(position.extend(0.5)),
            actor,
        ));
    }

    info!(
        "Demo ready: {} terrain pieces, {} enemies",
        world.terrain.len(),
        stage.enemy_spawns.len()
    );
    commands.insert_resource(Time::<Fixed>::from_seconds(settings.fixed_delta_time as f64));
    commands.insert_resource(settings);
    commands.insert_resource(PlayerSpawn(player_spawn));
    commands.insert_resource(world);
}

fn respawn_fallen_player(
    mut deaths: MessageReader<DeathEvent>,
    mut world: ResMut<PhysicsWorld>,
    spawn: Res<PlayerSpawn>,
    mut players: Query<&mut Actor, With<PlayerInput>>,
) {
    for death in deaths.read() {
        let Ok(mut actor) = players.get_mut(death.entity) else {
            info!("Enemy {:?} defeated", death.entity);
            continue;
        };
        info!("Player died, respawning at {:?}", spawn.0);
        actor.revive(&mut world);
        actor.set_position(&mut world, spawn.0);
    }
}

fn face_sprites(mut actors: Query<(&Actor, &mut Sprite)>) {
    for (actor, mut sprite) in &mut actors {
        sprite.flip_x = actor.controller().direction() == Horizontal::Left;
    }
}

fn log_hard_landings(mut landings: MessageReader<LandedEvent>) {
    for landing in landings.read() {
        if landing.fall_distance > 4.0 {
            debug!(
                "{:?} landed after falling {:.2}",
                landing.entity, landing.fall_distance
            );
        }
    }
}

#[cfg(feature = "dev-tools")]
fn flip_gravity_on_key(keyboard: Res<ButtonInput<KeyCode>>, mut world: ResMut<PhysicsWorld>) {
    if keyboard.just_pressed(KeyCode::KeyG) {
        world.flip_gravity();
    }
}
