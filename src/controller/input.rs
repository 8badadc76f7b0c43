//! Controller domain: per-tick input snapshots and keyboard sampling.

use bevy::prelude::*;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct ButtonState {
    pub down: bool,
    pub pressed_this_frame: bool,
}

impl ButtonState {
    pub fn held() -> Self {
        Self {
            down: true,
            pressed_this_frame: false,
        }
    }

    pub fn pressed() -> Self {
        Self {
            down: true,
            pressed_this_frame: true,
        }
    }
}

/// Everything a controller reads from its input source in one tick.
///
/// Each axis is quantized to -1, 0 or 1.
#[derive(Debug, Clone, Copy, PartialEq, Default)]
pub struct InputSnapshot {
    pub axis: Vec2,
    pub jump: ButtonState,
    pub attack: ButtonState,
    pub sub_attack: ButtonState,
    pub dash: ButtonState,
    pub run: ButtonState,
}

impl InputSnapshot {
    pub fn with_axis(axis: Vec2) -> Self {
        Self {
            axis: quantize(axis),
            ..default()
        }
    }

    /// Folds a later sample into this one: levels come from `next`, presses
    /// are kept until consumed.
    pub fn latch(&mut self, next: &InputSnapshot) {
        self.axis = quantize(next.axis);
        for (held, sample) in [
            (&mut self.jump, next.jump),
            (&mut self.attack, next.attack),
            (&mut self.sub_attack, next.sub_attack),
            (&mut self.dash, next.dash),
            (&mut self.run, next.run),
        ] {
            held.down = sample.down;
            held.pressed_this_frame |= sample.pressed_this_frame;
        }
    }

    /// Returns the snapshot for this tick and clears the latched presses.
    pub fn take(&mut self) -> InputSnapshot {
        let snapshot = *self;
        for button in [
            &mut self.jump,
            &mut self.attack,
            &mut self.sub_attack,
            &mut self.dash,
            &mut self.run,
        ] {
            button.pressed_this_frame = false;
        }
        snapshot
    }
}

fn quantize(axis: Vec2) -> Vec2 {
    Vec2::new(quantize_axis(axis.x), quantize_axis(axis.y))
}

fn quantize_axis(value: f32) -> f32 {
    if value > 0.0 {
        1.0
    } else if value < 0.0 {
        -1.0
    } else {
        0.0
    }
}

/// Marks the keyboard-driven actor and latches presses between fixed ticks.
#[derive(Component, Debug, Default)]
pub struct PlayerInput {
    pub latched: InputSnapshot,
}

fn button(keyboard: &ButtonInput<KeyCode>, keys: &[KeyCode]) -> ButtonState {
    ButtonState {
        down: keys.iter().any(|k| keyboard.pressed(*k)),
        pressed_this_frame: keys.iter().any(|k| keyboard.just_pressed(*k)),
    }
}

pub(crate) fn read_input(
    keyboard: Res<ButtonInput<KeyCode>>,
    mut players: Query<&mut PlayerInput>,
) {
    // Horizontal axis
    let mut x = 0.0;
    if keyboard.pressed(KeyCode::KeyA) || keyboard.pressed(KeyCode::ArrowLeft) {
        x -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyD) || keyboard.pressed(KeyCode::ArrowRight) {
        x += 1.0;
    }

    // Vertical axis (ladders, crouching, drop-through)
    let mut y = 0.0;
    if keyboard.pressed(KeyCode::KeyS) || keyboard.pressed(KeyCode::ArrowDown) {
        y -= 1.0;
    }
    if keyboard.pressed(KeyCode::KeyW) || keyboard.pressed(KeyCode::ArrowUp) {
        y += 1.0;
    }

    let sample = InputSnapshot {
        axis: Vec2::new(x, y),
        jump: button(&keyboard, &[KeyCode::Space, KeyCode::KeyK]),
        attack: button(&keyboard, &[KeyCode::KeyL]),
        sub_attack: button(&keyboard, &[KeyCode::KeyI]),
        dash: button(&keyboard, &[KeyCode::ShiftLeft, KeyCode::KeyJ]),
        run: button(&keyboard, &[KeyCode::ShiftRight, KeyCode::KeyU]),
    };

    for mut player in &mut players {
        player.latched.latch(&sample);
    }
}
