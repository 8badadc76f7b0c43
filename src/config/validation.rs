//! Validation for tuning values that would break the simulation.

use super::data::MovesetConfig;
use crate::physics::{BodySettings, PhysicsSettings};

/// An invalid configuration value, caught before anything is simulated.
#[derive(Debug, Clone, PartialEq)]
pub enum ConfigError {
    ZeroRaycastCount { axis: &'static str },
    NonPositiveExtent { field: &'static str, value: f32 },
    NonPositiveDeltaTime(f32),
    InvertedFrameWindow {
        state: &'static str,
        min: u32,
        max: u32,
    },
}

impl std::fmt::Display for ConfigError {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ConfigError::ZeroRaycastCount { axis } => {
                write!(f, "{} raycast count must be at least 1", axis)
            }
            ConfigError::NonPositiveExtent { field, value } => {
                write!(f, "{} must be greater than zero, got {}", field, value)
            }
            ConfigError::NonPositiveDeltaTime(value) => {
                write!(f, "fixed delta time must be greater than zero, got {}", value)
            }
            ConfigError::InvertedFrameWindow { state, min, max } => {
                write!(
                    f,
                    "{} min frames ({}) is greater than max frames ({})",
                    state, min, max
                )
            }
        }
    }
}

impl std::error::Error for ConfigError {}

/// Helper macro for min/max frame windows
macro_rules! check_window {
    ($errors:expr, $state:expr, $min:expr, $max:expr) => {
        if $min > $max {
            $errors.push(ConfigError::InvertedFrameWindow {
                state: $state,
                min: $min,
                max: $max,
            });
        }
    };
}

fn body_errors(settings: &BodySettings) -> Vec<ConfigError> {
    let mut errors = Vec::new();
    if settings.raycasts.horizontal == 0 {
        errors.push(ConfigError::ZeroRaycastCount { axis: "horizontal" });
    }
    if settings.raycasts.vertical == 0 {
        errors.push(ConfigError::ZeroRaycastCount { axis: "vertical" });
    }
    if settings.size.x <= 0.0 {
        errors.push(ConfigError::NonPositiveExtent {
            field: "size.x",
            value: settings.size.x,
        });
    }
    if settings.size.y <= 0.0 {
        errors.push(ConfigError::NonPositiveExtent {
            field: "size.y",
            value: settings.size.y,
        });
    }
    errors
}

/// Checks raycast counts and collider extents. Returns the first problem found.
pub fn validate_body(settings: &BodySettings) -> Result<(), ConfigError> {
    match body_errors(settings).into_iter().next() {
        Some(error) => Err(error),
        None => Ok(()),
    }
}

pub fn validate_physics(settings: &PhysicsSettings) -> Result<(), ConfigError> {
    if settings.fixed_delta_time <= 0.0 {
        return Err(ConfigError::NonPositiveDeltaTime(settings.fixed_delta_time));
    }
    Ok(())
}

/// Validate a whole moveset.
/// Returns a list of validation errors, empty if everything is usable.
pub fn validate_moveset(config: &MovesetConfig) -> Vec<ConfigError> {
    let mut errors = body_errors(&config.body);
    let states = &config.states;

    if let Some(jump) = &states.jump {
        check_window!(errors, "Jumping", jump.min_frames, jump.max_frames);
    }
    if let Some(dash) = &states.dash {
        check_window!(errors, "Dashing", dash.min_frames, dash.max_frames);
    }
    if let Some(bounce) = &states.bounce {
        check_window!(errors, "Bouncing", bounce.min_frames, bounce.max_frames);
    }
    if let Some(crouch) = &states.crouch {
        if crouch.collider_size.x <= 0.0 {
            errors.push(ConfigError::NonPositiveExtent {
                field: "crouch.collider_size.x",
                value: crouch.collider_size.x,
            });
        }
        if crouch.collider_size.y <= 0.0 {
            errors.push(ConfigError::NonPositiveExtent {
                field: "crouch.collider_size.y",
                value: crouch.collider_size.y,
            });
        }
    }
    if config.actor.max_hp <= 0 {
        errors.push(ConfigError::NonPositiveExtent {
            field: "actor.max_hp",
            value: config.actor.max_hp as f32,
        });
    }

    errors
}
