//! Controller domain: the movement state machine layered over a kinematic body.
//!
//! A `MovementController` owns one instance of each configured movement state
//! and decides, tick by tick, which of them drives the body. It never owns the
//! body, terrain, attacks or animator; those arrive through `ControllerEnv`
//! for the duration of each call.

mod context;
mod input;
mod machine;
mod settings;
mod states;

#[cfg(test)]
mod tests;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub use context::{ControllerEnv, ControllerEvent, ControllerStatus, StateContext};
pub use input::{ButtonState, InputSnapshot, PlayerInput};
pub use machine::MovementController;
pub use settings::{ControllerClips, ControllerSettings, StateSettings};
pub use states::*;

/// Identifies one movement state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum StateId {
    #[default]
    Default,
    Falling,
    Death,
    Landing,
    Moving,
    Jumping,
    Dashing,
    Ladder,
    WallCling,
    Crouching,
    Knockback,
    Bouncing,
}

impl StateId {
    pub const ALL: [StateId; 12] = [
        StateId::Default,
        StateId::Falling,
        StateId::Death,
        StateId::Landing,
        StateId::Moving,
        StateId::Jumping,
        StateId::Dashing,
        StateId::Ladder,
        StateId::WallCling,
        StateId::Crouching,
        StateId::Knockback,
        StateId::Bouncing,
    ];

    /// Concurrent states keep updating in the background while another state is current.
    pub fn is_concurrent(self) -> bool {
        matches!(
            self,
            StateId::Moving | StateId::Jumping | StateId::Dashing | StateId::Bouncing
        )
    }
}

pub struct ControllerPlugin;

impl Plugin for ControllerPlugin {
    fn build(&self, app: &mut App) {
        app.add_systems(Update, input::read_input);
    }
}
