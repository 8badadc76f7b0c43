//! Combat domain: attacks, their gating tables and which side an actor fights on.

mod attack;

#[cfg(test)]
mod tests;

use serde::{Deserialize, Serialize};

pub use attack::{
    ActionType, ActionsAllowedDuringAttack, Attack, AttackClips, AttackContext, AttackDirection,
    AttackInput, AttackSet, AttackSettings, CanInitiateFrom, CanceledBy, Cancels, HitboxSettings,
};

/// Which side an actor is on. Only opposing sides damage each other.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Team {
    Player,
    Enemy,
    #[default]
    Neutral,
}

impl Team {
    pub fn is_hostile_to(self, other: Team) -> bool {
        matches!(
            (self, other),
            (Team::Player, Team::Enemy) | (Team::Enemy, Team::Player)
        )
    }
}
