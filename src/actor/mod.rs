//! Actor domain: health, damage and death layered over a movement controller.
//!
//! `Actor` is plain Rust and ticks against a `PhysicsWorld` directly.
//! `ActorPlugin` runs every actor entity on the fixed schedule and republishes
//! what happened to them as Bevy messages.

mod contacts;
mod events;
mod runtime;
mod systems;

#[cfg(test)]
mod tests;

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

pub use contacts::resolve_contact;
pub use events::{DamagedEvent, DeathEvent, LandedEvent, StateChangedEvent};
pub use runtime::{Actor, ActorEvent};

use crate::combat::Team;
use crate::physics::{PhysicsWorld, SimulationSet};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ActorSettings {
    pub max_hp: i32,
    /// Seconds of invincibility after taking a hit.
    pub damaged_invincibility: f32,
    pub always_invincible: bool,
    /// Other actors may bounce off this one's head.
    pub can_bounce_on: bool,
    /// Damage dealt to hostile actors that touch this one.
    pub contact_damage: i32,
    pub team: Team,
}

impl Default for ActorSettings {
    fn default() -> Self {
        Self {
            max_hp: 3,
            damaged_invincibility: 0.15,
            always_invincible: false,
            can_bounce_on: false,
            contact_damage: 0,
            team: Team::Neutral,
        }
    }
}

pub struct ActorPlugin;

impl Plugin for ActorPlugin {
    fn build(&self, app: &mut App) {
        app.add_message::<StateChangedEvent>()
            .add_message::<DamagedEvent>()
            .add_message::<DeathEvent>()
            .add_message::<LandedEvent>()
            .add_systems(
                FixedUpdate,
                systems::resolve_contacts
                    .in_set(SimulationSet::Contacts)
                    .run_if(resource_exists::<PhysicsWorld>),
            )
            .add_systems(
                FixedUpdate,
                (systems::tick_actors, systems::publish_actor_events)
                    .chain()
                    .in_set(SimulationSet::Controllers)
                    .run_if(resource_exists::<PhysicsWorld>),
            );
    }
}
