//! Data definitions for RON config files.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::Vec2Def;
use super::validation::ConfigError;
use crate::actor::ActorSettings;
use crate::ai::PatrolSettings;
use crate::combat::AttackSettings;
use crate::controller::{ControllerSettings, StateSettings};
use crate::core::Horizontal;
use crate::physics::{
    BodySettings, GameLayer, MovingPlatformSettings, PhysicsSettings, PhysicsWorld, Shape, Terrain,
};

// =============================================================================
// Movesets
// =============================================================================

/// Everything needed to build one actor: its body, controller, movement states
/// and attacks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovesetConfig {
    pub name: String,
    pub body: BodySettings,
    pub controller: ControllerSettings,
    pub states: StateSettings,
    pub attacks: Vec<AttackSettings>,
    pub actor: ActorSettings,
    /// Present for AI-driven actors.
    pub patrol: Option<PatrolSettings>,
}

impl Default for MovesetConfig {
    fn default() -> Self {
        Self {
            name: "default".to_string(),
            body: BodySettings::default(),
            controller: ControllerSettings::default(),
            states: StateSettings::default(),
            attacks: Vec::new(),
            actor: ActorSettings::default(),
            patrol: None,
        }
    }
}

// =============================================================================
// Stages
// =============================================================================

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum TerrainShapeDef {
    Box { size: Vec2Def },
    /// Right triangle filling `size`; `rising` is the side the high end sits on.
    Slope { size: Vec2Def, rising: Horizontal },
}

impl TerrainShapeDef {
    pub fn to_shape(&self) -> Shape {
        match self {
            TerrainShapeDef::Box { size } => Shape::Box {
                half_extents: Vec2::from(*size) * 0.5,
            },
            TerrainShapeDef::Slope { size, rising } => Shape::Slope {
                half_extents: Vec2::from(*size) * 0.5,
                rising: *rising,
            },
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TerrainDef {
    pub center: Vec2Def,
    pub shape: TerrainShapeDef,
    #[serde(default = "default_terrain_layer")]
    pub layer: GameLayer,
}

fn default_terrain_layer() -> GameLayer {
    GameLayer::Terrain
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct PlatformDef {
    pub position: Vec2Def,
    pub size: Vec2Def,
    #[serde(default = "default_terrain_layer")]
    pub layer: GameLayer,
    #[serde(default)]
    pub motion: MovingPlatformSettings,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StageConfig {
    pub terrain: Vec<TerrainDef>,
    pub platforms: Vec<PlatformDef>,
    pub player_spawn: Vec2Def,
    pub enemy_spawns: Vec<Vec2Def>,
}

impl Default for StageConfig {
    fn default() -> Self {
        Self {
            terrain: Vec::new(),
            platforms: Vec::new(),
            player_spawn: Vec2Def { x: 0.0, y: 0.0 },
            enemy_spawns: Vec::new(),
        }
    }
}

impl StageConfig {
    pub fn build_terrain(&self) -> Terrain {
        let mut terrain = Terrain::new();
        for def in &self.terrain {
            terrain.add(def.center.into(), def.shape.to_shape(), def.layer);
        }
        terrain
    }

    /// Terrain plus every moving platform, ready to step.
    pub fn build_world(&self, settings: PhysicsSettings) -> Result<PhysicsWorld, ConfigError> {
        let mut world = PhysicsWorld::new(settings, self.build_terrain())?;
        for platform in &self.platforms {
            let body = BodySettings {
                size: platform.size.into(),
                ..default()
            };
            world.spawn_platform(
                body,
                platform.position.into(),
                platform.layer,
                platform.motion.clone(),
            )?;
        }
        Ok(world)
    }
}
