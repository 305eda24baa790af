use std::collections::HashSet;

use winit::keyboard::KeyCode;

use crate::camera::ControlIntent;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum KeyOutcome {
    Continue,
    Quit,
}

/// Held keys plus focal-length presses not yet handed to the integrator.
#[derive(Debug, Default)]
pub struct KeyState {
    held: HashSet<KeyCode>,
    focal_steps: i32,
}

impl KeyState {
    /// Record a key press. Q and E count every press, including auto-repeat.
    pub fn press(&mut self, code: KeyCode) -> KeyOutcome {
        match code {
            KeyCode::Escape => return KeyOutcome::Quit,
            KeyCode::KeyQ => self.focal_steps += 1,
            KeyCode::KeyE => self.focal_steps -= 1,
            _ => {
                self.held.insert(code);
            }
        }
        KeyOutcome::Continue
    }

    pub fn release(&mut self, code: KeyCode) {
        self.held.remove(&code);
    }

    /// Build this tick's intent and drain pending focal presses.
    pub fn take_intent(&mut self, focal_step: f64) -> ControlIntent {
        let axis = |pos: KeyCode, neg: KeyCode| -> i8 {
            self.held.contains(&pos) as i8 - self.held.contains(&neg) as i8
        };
        let intent = ControlIntent {
            forward: axis(KeyCode::KeyW, KeyCode::KeyS),
            turn: axis(KeyCode::KeyD, KeyCode::KeyA),
            focal_delta: self.focal_steps as f64 * focal_step,
        };
        self.focal_steps = 0;
        intent
    }
}
