//! Loader for RON config files.

use bevy::prelude::*;
use ron::Options;
use std::fs;
use std::path::Path;

use super::data::{MovesetConfig, StageConfig};
use super::validation::validate_moveset;
use crate::physics::PhysicsSettings;

/// Error type for config loading failures.
#[derive(Debug)]
pub struct ConfigLoadError {
    pub file: String,
    pub message: String,
}

impl std::fmt::Display for ConfigLoadError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "Failed to load {}: {}", self.file, self.message)
    }
}

impl std::error::Error for ConfigLoadError {}

/// Create RON options with extensions enabled for more flexible parsing.
fn ron_options() -> Options {
    Options::default().with_default_extension(ron::extensions::Extensions::IMPLICIT_SOME)
}

pub(crate) fn parse_ron<T>(file: &str, contents: &str) -> Result<T, ConfigLoadError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    ron_options().from_str(contents).map_err(|e| ConfigLoadError {
        file: file.to_string(),
        message: format!("Parse error: {}", e),
    })
}

/// Load a single RON struct.
pub fn load_ron_file<T>(path: &Path) -> Result<T, ConfigLoadError>
where
    T: for<'de> serde::Deserialize<'de>,
{
    let file_name = path.display().to_string();
    let contents = fs::read_to_string(path).map_err(|e| ConfigLoadError {
        file: file_name.clone(),
        message: format!("IO error: {}", e),
    })?;

    parse_ron(&file_name, &contents)
}

/// Load and validate a moveset. Validation failures are reported as one error
/// listing every problem.
pub fn load_moveset(path: &Path) -> Result<MovesetConfig, ConfigLoadError> {
    let config: MovesetConfig = load_ron_file(path)?;
    let errors = validate_moveset(&config);
    if !errors.is_empty() {
        for error in &errors {
            warn!("Moveset '{}': {}", config.name, error);
        }
        let message = errors
            .iter()
            .map(|e| e.to_string())
            .collect::<Vec<_>>()
            .join("; ");
        return Err(ConfigLoadError {
            file: path.display().to_string(),
            message: format!("Validation error: {}", message),
        });
    }
    info!(
        "Loaded moveset '{}' with {} attacks",
        config.name,
        config.attacks.len()
    );
    Ok(config)
}

pub fn load_physics_settings(path: &Path) -> Result<PhysicsSettings, ConfigLoadError> {
    let settings: PhysicsSettings = load_ron_file(path)?;
    crate::config::validate_physics(&settings).map_err(|e| ConfigLoadError {
        file: path.display().to_string(),
        message: format!("Validation error: {}", e),
    })?;
    Ok(settings)
}

pub fn load_stage(path: &Path) -> Result<StageConfig, ConfigLoadError> {
    let stage: StageConfig = load_ron_file(path)?;
    info!(
        "Loaded stage with {} terrain pieces and {} platforms",
        stage.terrain.len(),
        stage.platforms.len()
    );
    Ok(stage)
}
