//! Actor domain: messages published for other systems to react to.

use bevy::ecs::message::Message;
use bevy::prelude::*;

use crate::controller::StateId;

/// An actor's movement controller switched states.
#[derive(Debug)]
pub struct StateChangedEvent {
    pub entity: Entity,
    pub from: StateId,
    pub to: StateId,
}

impl Message for StateChangedEvent {}

#[derive(Debug)]
pub struct DamagedEvent {
    pub entity: Entity,
    pub amount: i32,
    pub hp: i32,
    /// Where the hit came from.
    pub source: Vec2,
}

impl Message for DamagedEvent {}

#[derive(Debug)]
pub struct DeathEvent {
    pub entity: Entity,
}

impl Message for DeathEvent {}

/// An actor touched down after falling further than the landing threshold.
#[derive(Debug)]
pub struct LandedEvent {
    pub entity: Entity,
    pub fall_distance: f32,
}

impl Message for LandedEvent {}
