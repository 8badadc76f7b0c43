//! Core domain: directions, contact sides, gravity orientation and tick countdowns.
//!
//! Everything here is shared by the physics, controller and actor domains.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};


/// Facing or travel direction along the X axis.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Horizontal {
    Left,
    #[default]
    Right,
}

impl Horizontal {
    pub fn sign(self) -> f32 {
        match self {
            Horizontal::Left => -1.0,
            Horizontal::Right => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Horizontal::Left => Horizontal::Right,
            Horizontal::Right => Horizontal::Left,
        }
    }

    /// Direction of a nonzero axis value; `None` when the axis is neutral.
    pub fn from_axis(value: f32) -> Option<Self> {
        if value > 0.0 {
            Some(Horizontal::Right)
        } else if value < 0.0 {
            Some(Horizontal::Left)
        } else {
            None
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Vertical {
    #[default]
    Down,
    Up,
}

impl Vertical {
    pub fn sign(self) -> f32 {
        match self {
            Vertical::Down => -1.0,
            Vertical::Up => 1.0,
        }
    }

    pub fn flipped(self) -> Self {
        match self {
            Vertical::Down => Vertical::Up,
            Vertical::Up => Vertical::Down,
        }
    }
}

/// Side of a body that a contact was made on.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Side {
    Left,
    Right,
    Top,
    Bottom,
}

impl Side {
    /// The side the other party of a contact sees.
    pub fn opposite(self) -> Self {
        match self {
            Side::Left => Side::Right,
            Side::Right => Side::Left,
            Side::Top => Side::Bottom,
            Side::Bottom => Side::Top,
        }
    }
}

/// Contacts are edge-triggered, so only entry is reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CollisionKind {
    Enter,
}

// -----------------------------------------------------------------------------
// Gravity orientation
// -----------------------------------------------------------------------------

/// Sign used for every gravity-relative decision: 1 for normal gravity,
/// -1 for zero or inverted gravity.
pub fn gravity_sign(gravity_scale: f32) -> f32 {
    if gravity_scale > 0.0 { 1.0 } else { -1.0 }
}

/// World-space "up" for the given gravity scale.
pub fn world_up(gravity_scale: f32) -> Vertical {
    if gravity_scale > 0.0 {
        Vertical::Up
    } else {
        Vertical::Down
    }
}

/// World-space "down" for the given gravity scale.
pub fn world_down(gravity_scale: f32) -> Vertical {
    world_up(gravity_scale).flipped()
}

// -----------------------------------------------------------------------------
// Countdown
// -----------------------------------------------------------------------------

/// Tick-counted timer advanced once per fixed step.
///
/// Durations given in seconds are rounded up to whole ticks, so a nonzero
/// duration always lasts at least one tick.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct Countdown {
    remaining: u32,
}

impl Countdown {
    pub fn from_ticks(ticks: u32) -> Self {
        Self { remaining: ticks }
    }

    pub fn from_secs(secs: f32, fixed_dt: f32) -> Self {
        Self::from_ticks(secs_to_ticks(secs, fixed_dt))
    }

    /// Advances by one tick. Returns `true` on the tick the countdown expires.
    pub fn tick(&mut self) -> bool {
        if self.remaining == 0 {
            return false;
        }
        self.remaining -= 1;
        self.remaining == 0
    }

    pub fn is_active(&self) -> bool {
        self.remaining > 0
    }

    pub fn remaining(&self) -> u32 {
        self.remaining
    }

    pub fn cancel(&mut self) {
        self.remaining = 0;
    }
}

pub fn secs_to_ticks(secs: f32, fixed_dt: f32) -> u32 {
    if secs <= 0.0 || fixed_dt <= 0.0 {
        return 0;
    }
    // Absorb float noise so 0.25 / 0.01667 style ratios don't round up a whole extra tick.
    let ticks = secs / fixed_dt;
    (ticks - 1.0e-3).ceil().max(1.0) as u32
}

/// Linear interpolation used for render smoothing between two fixed steps.
pub fn interpolate(previous: Vec2, current: Vec2, alpha: f32) -> Vec2 {
    previous.lerp(current, alpha.clamp(0.0, 1.0))
}
