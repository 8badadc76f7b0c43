//! Config domain: RON-backed tuning, validation of invalid values, and the
//! serde helpers shared by every settings struct.

mod data;
mod loader;
mod validation;


use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub use data::{MovesetConfig, PlatformDef, StageConfig, TerrainDef, TerrainShapeDef};
pub use loader::{ConfigLoadError, load_moveset, load_physics_settings, load_ron_file, load_stage};
pub use validation::{ConfigError, validate_body, validate_moveset, validate_physics};

/// Serializable Vec2 for config files.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Vec2Def {
    pub x: f32,
    pub y: f32,
}

impl From<Vec2Def> for Vec2 {
    fn from(v: Vec2Def) -> Self {
        Vec2::new(v.x, v.y)
    }
}

impl From<Vec2> for Vec2Def {
    fn from(v: Vec2) -> Self {
        Vec2Def { x: v.x, y: v.y }
    }
}

/// `#[serde(with = "vec2_serde")]` for `Vec2` fields.
pub mod vec2_serde {
    use bevy::prelude::Vec2;
    use serde::{Deserialize, Deserializer, Serialize, Serializer};

    use super::Vec2Def;

    pub fn serialize<S: Serializer>(value: &Vec2, serializer: S) -> Result<S::Ok, S::Error> {
        Vec2Def::from(*value).serialize(serializer)
    }

    pub fn deserialize<'de, D: Deserializer<'de>>(deserializer: D) -> Result<Vec2, D::Error> {
        Vec2Def::deserialize(deserializer).map(Vec2::from)
    }
}
