//! Actor domain: fixed-step systems for actor entities.

use bevy::ecs::message::MessageWriter;
use bevy::prelude::*;

use super::contacts::resolve_contact;
use super::events::{DamagedEvent, DeathEvent, LandedEvent, StateChangedEvent};
use super::runtime::{Actor, ActorEvent};
use crate::ai::PatrolBrain;
use crate::controller::{InputSnapshot, PlayerInput};
use crate::physics::PhysicsWorld;

pub(crate) fn resolve_contacts(mut world: ResMut<PhysicsWorld>, mut actors: Query<&mut Actor>) {
    let mut pairs = actors.iter_combinations_mut();
    while let Some([mut a, mut b]) = pairs.fetch_next() {
        resolve_contact(&mut a, &mut b, &mut world);
        resolve_contact(&mut b, &mut a, &mut world);
    }
}

/// Feeds each actor its input for this tick, from the keyboard or its brain.
pub(crate) fn tick_actors(
    mut world: ResMut<PhysicsWorld>,
    mut actors: Query<(&mut Actor, Option<&mut PlayerInput>, Option<&mut PatrolBrain>)>,
) {
    for (mut actor, player, brain) in &mut actors {
        let input = match (player, brain) {
            (Some(mut player), _) => player.latched.take(),
            (None, Some(mut brain)) => brain.think(&world, &actor),
            (None, None) => InputSnapshot::default(),
        };
        actor.tick(&mut world, &input);
    }
}

pub(crate) fn publish_actor_events(
    mut actors: Query<(Entity, &mut Actor)>,
    mut state_changed: MessageWriter<StateChangedEvent>,
    mut damaged: MessageWriter<DamagedEvent>,
    mut deaths: MessageWriter<DeathEvent>,
    mut landed: MessageWriter<LandedEvent>,
) {
    for (entity, mut actor) in &mut actors {
        for event in actor.drain_events() {
            match event {
                ActorEvent::StateChanged { from, to } => {
                    state_changed.write(StateChangedEvent { entity, from, to });
                }
                ActorEvent::Damaged { amount, hp, source } => {
                    damaged.write(DamagedEvent {
                        entity,
                        amount,
                        hp,
                        source,
                    });
                }
                ActorEvent::Died => {
                    deaths.write(DeathEvent { entity });
                }
                ActorEvent::Landed { fall_distance } => {
                    landed.write(LandedEvent {
                        entity,
                        fall_distance,
                    });
                }
            }
        }
    }
}
