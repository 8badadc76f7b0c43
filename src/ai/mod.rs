//! AI domain: input sources for actors nobody is holding a controller for.
//!
//! A brain only ever emits an `InputSnapshot`, so AI actors run through the
//! exact same movement states and attack gating as the player.

mod patrol;

#[cfg(test)]
mod tests;

pub use patrol::{PatrolBrain, PatrolSettings};
