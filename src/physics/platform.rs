//! Physics domain: moving platform driver.

use bevy::prelude::*;
use serde::{Deserialize, Serialize};

use super::body::KinematicBody;
use super::terrain::ColliderId;
use crate::config::vec2_serde;
use crate::core::{Horizontal, Vertical};

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct MovingPlatformSettings {
    #[serde(with = "vec2_serde")]
    pub move_speed: Vec2,
    pub is_movement_enabled: bool,
    pub starts_when_passenger_on_top: bool,
    pub turns_on_wall_contact: bool,
    pub turns_on_distance: bool,
    pub starting_direction_x: Horizontal,
    pub starting_direction_y: Vertical,
    #[serde(with = "vec2_serde")]
    pub min_position: Vec2,
    #[serde(with = "vec2_serde")]
    pub max_position: Vec2,
}

impl Default for MovingPlatformSettings {
    fn default() -> Self {
        Self {
            move_speed: Vec2::ONE,
            is_movement_enabled: true,
            starts_when_passenger_on_top: false,
            turns_on_wall_contact: false,
            turns_on_distance: false,
            starting_direction_x: Horizontal::Right,
            starting_direction_y: Vertical::Up,
            min_position: Vec2::ZERO,
            max_position: Vec2::ZERO,
        }
    }
}

/// Sets a platform body's velocity every tick and publishes how far it moved
/// so passengers can follow in the same tick.
#[derive(Debug, Clone)]
pub struct MovingPlatform {
    pub settings: MovingPlatformSettings,
    pub(crate) collider: ColliderId,
    pub(crate) move_distance: Vec2,
    direction_x: Horizontal,
    direction_y: Vertical,
    is_moving: bool,
    has_passenger_on_top: bool,
}

impl MovingPlatform {
    pub fn new(settings: MovingPlatformSettings, collider: ColliderId) -> Self {
        let is_moving = !settings.starts_when_passenger_on_top && settings.is_movement_enabled;
        Self {
            direction_x: settings.starting_direction_x,
            direction_y: settings.starting_direction_y,
            settings,
            collider,
            move_distance: Vec2::ZERO,
            is_moving,
            has_passenger_on_top: false,
        }
    }

    pub fn collider(&self) -> ColliderId {
        self.collider
    }

    pub fn move_distance(&self) -> Vec2 {
        self.move_distance
    }

    pub fn direction_x(&self) -> Horizontal {
        self.direction_x
    }

    pub fn direction_y(&self) -> Vertical {
        self.direction_y
    }

    pub fn is_moving(&self) -> bool {
        self.is_moving
    }

    pub fn has_passenger_on_top(&self) -> bool {
        self.has_passenger_on_top
    }

    pub fn notify_object_on_top(&mut self) {
        self.has_passenger_on_top = true;
    }

    /// Runs before the platform body is stepped, while last tick's contact flags are still readable.
    pub fn drive(&mut self, body: &mut KinematicBody) {
        if self.is_moving && self.settings.is_movement_enabled {
            self.move_horizontal(body);
            self.move_vertical(body);
        }
        if self.settings.starts_when_passenger_on_top
            && self.has_passenger_on_top
            && !self.is_moving
            && self.settings.is_movement_enabled
        {
            self.is_moving = true;
        }
    }

    fn move_horizontal(&mut self, body: &mut KinematicBody) {
        let position = body.position();
        let min = self.settings.min_position.x;
        let max = self.settings.max_position.x;

        let mut turn = false;
        if self.settings.turns_on_wall_contact && body.did_hit_either_wall_this_frame() {
            turn = true;
        } else if self.settings.turns_on_distance && self.settings.move_speed.x != 0.0 {
            let past_max = position.x >= max && self.direction_x == Horizontal::Right;
            let past_min = position.x <= min && self.direction_x == Horizontal::Left;
            if past_max || past_min {
                turn = true;
                let snap = if past_max { max } else { min };
                body.set_position(Vec2::new(snap, position.y));
            }
        }

        if turn {
            self.direction_x = self.direction_x.flipped();
        }
        body.set_velocity_x(self.settings.move_speed.x * self.direction_x.sign());
    }

    fn move_vertical(&mut self, body: &mut KinematicBody) {
        let position = body.position();
        let min = self.settings.min_position.y;
        let max = self.settings.max_position.y;

        let mut turn = false;
        if self.settings.turns_on_wall_contact && body.is_on_surface() {
            turn = true;
        } else if self.settings.turns_on_distance && self.settings.move_speed.y != 0.0 {
            let past_max = position.y >= max && self.direction_y == Vertical::Up;
            let past_min = position.y <= min && self.direction_y == Vertical::Down;
            if past_max || past_min {
                turn = true;
                let snap = if past_max { max } else { min };
                body.set_position(Vec2::new(position.x, snap));
            }
        }

        if turn {
            self.direction_y = self.direction_y.flipped();
        }
        body.set_velocity_y(self.settings.move_speed.y * self.direction_y.sign());
    }
}
