//! Controller domain: tuning for the controller itself and for each movement state.

use serde::{Deserialize, Serialize};

use super::states::{
    BounceSettings, CrouchSettings, DashSettings, JumpSettings, KnockbackSettings,
    LadderSettings, LandingSettings, MovingSettings, WallClingSettings,
};
use crate::core::Horizontal;

/// Clips owned by the controller rather than by a single state.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerClips {
    pub default: Option<String>,
    pub falling: Option<String>,
    pub death: Option<String>,
    /// Played after standing still in Default for `idle_timeout` seconds.
    pub idle: Option<String>,
    pub turn_ground: Option<String>,
    pub turn_air: Option<String>,
    pub turn_crouch: Option<String>,
    pub gravity_flip: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ControllerSettings {
    /// Minimum fall distance, in world units, that counts as a landing.
    pub landing_fall_threshold: f32,
    pub stun_duration: f32,
    /// Seconds one-way platforms stay disabled after dropping through one.
    pub drop_through_window: f32,
    pub idle_timeout: f32,
    /// Replaces the body's max fall speed when positive.
    pub override_max_fall_speed: f32,
    pub starting_direction: Horizontal,
    pub clips: ControllerClips,
}

impl Default for ControllerSettings {
    fn default() -> Self {
        Self {
            landing_fall_threshold: 0.125,
            stun_duration: 1.0,
            drop_through_window: 0.25,
            idle_timeout: 7.5,
            override_max_fall_speed: 0.0,
            starting_direction: Horizontal::Right,
            clips: ControllerClips::default(),
        }
    }
}

/// Which optional states a controller has, and how each is tuned.
///
/// Default, Falling and Death always exist. A `None` entry leaves the state
/// out entirely.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateSettings {
    pub landing: Option<LandingSettings>,
    pub moving: Option<MovingSettings>,
    pub jump: Option<JumpSettings>,
    pub dash: Option<DashSettings>,
    pub crouch: Option<CrouchSettings>,
    pub ladder: Option<LadderSettings>,
    pub wall_cling: Option<WallClingSettings>,
    pub knockback: Option<KnockbackSettings>,
    pub bounce: Option<BounceSettings>,
}

impl Default for StateSettings {
    fn default() -> Self {
        Self {
            landing: Some(LandingSettings::default()),
            moving: Some(MovingSettings::default()),
            jump: Some(JumpSettings::default()),
            dash: Some(DashSettings::default()),
            crouch: Some(CrouchSettings::default()),
            ladder: Some(LadderSettings::default()),
            wall_cling: Some(WallClingSettings::default()),
            knockback: Some(KnockbackSettings::default()),
            bounce: Some(BounceSettings::default()),
        }
    }
}

impl StateSettings {
    /// Only the always-present states.
    pub fn none() -> Self {
        Self {
            landing: None,
            moving: None,
            jump: None,
            dash: None,
            crouch: None,
            ladder: None,
            wall_cling: None,
            knockback: None,
            bounce: None,
        }
    }
}
