// Input dispatch: buttons, held keys and the direct-motor panel -> intents
//
// Key repeats are not debounced: every press or repeat the terminal delivers
// becomes an intent. The direct-motor sliders only emit on an explicit GO.

use crossterm::event::KeyCode;
use serde::{Deserialize, Serialize};

use crate::config::SLIDER_STEP;
use crate::mode::ControlMode;
use crate::motor::{Intent, MOTOR_LIMIT};

/// Directional panel buttons (discrete commands, release is not tracked)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Button {
    Forward,
    Backward,
    Left,
    Right,
    Stop,
}

impl From<Button> for Intent {
    fn from(button: Button) -> Self {
        match button {
            Button::Forward => Intent::Forward,
            Button::Backward => Intent::Backward,
            Button::Left => Intent::TurnLeft,
            Button::Right => Intent::TurnRight,
            Button::Stop => Intent::Stop,
        }
    }
}

/// Slider on the direct-motor panel
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MotorSlot {
    M1,
    M2,
    M3,
}

impl MotorSlot {
    pub const ALL: [MotorSlot; 3] = [MotorSlot::M1, MotorSlot::M2, MotorSlot::M3];

    fn index(&self) -> usize {
        match self {
            MotorSlot::M1 => 0,
            MotorSlot::M2 => 1,
            MotorSlot::M3 => 2,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum InputEvent {
    Button(Button),
    /// Key press or auto-repeat
    KeyDown(KeyCode),
    /// Slider drag or numeric entry; never emits on its own
    Slider { slot: MotorSlot, value: i32 },
    /// Direct panel GO: send the slider values
    Go,
    /// Direct panel STOP: always a stop, whatever the sliders say
    DirectStop,
}

/// Map a key to its directional intent (w/a/s/d, arrows, space)
pub fn intent_for_key(code: KeyCode) -> Option<Intent> {
    match code {
        KeyCode::Up => Some(Intent::Forward),
        KeyCode::Down => Some(Intent::Backward),
        KeyCode::Left => Some(Intent::TurnLeft),
        KeyCode::Right => Some(Intent::TurnRight),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'w' => Some(Intent::Forward),
            's' => Some(Intent::Backward),
            'a' => Some(Intent::TurnLeft),
            'd' => Some(Intent::TurnRight),
            ' ' => Some(Intent::Stop),
            _ => None,
        },
        _ => None,
    }
}

#[derive(Debug, Default)]
pub struct InputDispatcher {
    sliders: [i32; 3],
}

impl InputDispatcher {
    pub fn new() -> Self {
        Self::default()
    }

    /// Turn one input event into at most one intent
    ///
    /// Everything is discarded unless the operator owns the robot.
    pub fn dispatch(&mut self, mode: ControlMode, event: InputEvent) -> Option<Intent> {
        if !mode.is_manual() {
            return None;
        }

        match event {
            InputEvent::Button(button) => Some(button.into()),
            InputEvent::KeyDown(code) => intent_for_key(code),
            InputEvent::Slider { slot, value } => {
                self.sliders[slot.index()] = value.clamp(-(MOTOR_LIMIT as i32), MOTOR_LIMIT as i32);
                None
            }
            InputEvent::Go => {
                let [m1, m2, m3] = self.sliders;
                Some(Intent::Direct(m1, m2, m3))
            }
            InputEvent::DirectStop => Some(Intent::Stop),
        }
    }

    pub fn slider(&self, slot: MotorSlot) -> i32 {
        self.sliders[slot.index()]
    }

    pub fn sliders(&self) -> [i32; 3] {
        self.sliders
    }

    /// Slider event moving `slot` by `steps` slider steps from its current value
    pub fn nudge(&self, slot: MotorSlot, steps: i32) -> InputEvent {
        InputEvent::Slider {
            slot,
            value: self.slider(slot) + steps * SLIDER_STEP,
        }
    }
}

/// Operator commands that are not intents
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Command {
    Connect,
    Disconnect,
    EmergencyStop,
    Reset,
    ToggleAutonomous,
    SpeedUp,
    SpeedDown,
    Quit,
}

/// What a terminal key does
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    Command(Command),
    SelectSlot(MotorSlot),
    /// Move the selected slider by this many steps
    Nudge(i32),
    Input(InputEvent),
}

/// Terminal key map
pub fn action_for_key(code: KeyCode) -> Option<KeyAction> {
    if intent_for_key(code).is_some() {
        return Some(KeyAction::Input(InputEvent::KeyDown(code)));
    }

    let action = match code {
        KeyCode::Esc => KeyAction::Command(Command::EmergencyStop),
        KeyCode::Char(c) => match c.to_ascii_lowercase() {
            'c' => KeyAction::Command(Command::Connect),
            'v' => KeyAction::Command(Command::Disconnect),
            'e' => KeyAction::Command(Command::EmergencyStop),
            'r' => KeyAction::Command(Command::Reset),
            'm' => KeyAction::Command(Command::ToggleAutonomous),
            '+' | '=' => KeyAction::Command(Command::SpeedUp),
            '-' => KeyAction::Command(Command::SpeedDown),
            'q' => KeyAction::Command(Command::Quit),
            '1' => KeyAction::SelectSlot(MotorSlot::M1),
            '2' => KeyAction::SelectSlot(MotorSlot::M2),
            '3' => KeyAction::SelectSlot(MotorSlot::M3),
            ',' => KeyAction::Nudge(-1),
            '.' => KeyAction::Nudge(1),
            'g' => KeyAction::Input(InputEvent::Go),
            'x' => KeyAction::Input(InputEvent::DirectStop),
            _ => return None,
        },
        _ => return None,
    };
    Some(action)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_key_map() {
        assert_eq!(intent_for_key(KeyCode::Char('w')), Some(Intent::Forward));
        assert_eq!(intent_for_key(KeyCode::Char('W')), Some(Intent::Forward));
        assert_eq!(intent_for_key(KeyCode::Up), Some(Intent::Forward));
        assert_eq!(intent_for_key(KeyCode::Char('s')), Some(Intent::Backward));
        assert_eq!(intent_for_key(KeyCode::Down), Some(Intent::Backward));
        assert_eq!(intent_for_key(KeyCode::Char('a')), Some(Intent::TurnLeft));
        assert_eq!(intent_for_key(KeyCode::Left), Some(Intent::TurnLeft));
        assert_eq!(intent_for_key(KeyCode::Char('d')), Some(Intent::TurnRight));
        assert_eq!(intent_for_key(KeyCode::Right), Some(Intent::TurnRight));
        assert_eq!(intent_for_key(KeyCode::Char(' ')), Some(Intent::Stop));
        assert_eq!(intent_for_key(KeyCode::Char('z')), None);
        assert_eq!(intent_for_key(KeyCode::Enter), None);
    }

    #[test]
    fn test_repeats_are_not_suppressed() {
        let mut d = InputDispatcher::new();
        let intents: Vec<_> = (0..5)
            .filter_map(|_| d.dispatch(ControlMode::ManualActive, InputEvent::KeyDown(KeyCode::Up)))
            .collect();
        assert_eq!(intents, vec![Intent::Forward; 5]);
    }

    #[test]
    fn test_buttons() {
        let mut d = InputDispatcher::new();
        assert_eq!(
            d.dispatch(ControlMode::ManualIdle, InputEvent::Button(Button::Left)),
            Some(Intent::TurnLeft)
        );
        assert_eq!(
            d.dispatch(ControlMode::ManualIdle, InputEvent::Button(Button::Stop)),
            Some(Intent::Stop)
        );
    }

    #[test]
    fn test_sliders_only_emit_on_go() {
        let mut d = InputDispatcher::new();
        let mode = ControlMode::ManualIdle;
        assert_eq!(d.dispatch(mode, InputEvent::Slider { slot: MotorSlot::M1, value: 120 }), None);
        assert_eq!(d.dispatch(mode, InputEvent::Slider { slot: MotorSlot::M3, value: -999 }), None);
        assert_eq!(d.sliders(), [120, 0, -255]);

        assert_eq!(d.dispatch(mode, InputEvent::Go), Some(Intent::Direct(120, 0, -255)));
        // STOP ignores the slider values
        assert_eq!(d.dispatch(mode, InputEvent::DirectStop), Some(Intent::Stop));
        assert_eq!(d.sliders(), [120, 0, -255]);
    }

    #[test]
    fn test_nudge() {
        let mut d = InputDispatcher::new();
        let ev = d.nudge(MotorSlot::M2, 3);
        assert_eq!(ev, InputEvent::Slider { slot: MotorSlot::M2, value: 15 });
        d.dispatch(ControlMode::ManualIdle, ev);
        assert_eq!(d.slider(MotorSlot::M2), 15);
    }

    #[test]
    fn test_disabled_outside_manual_modes() {
        let mut d = InputDispatcher::new();
        for mode in [
            ControlMode::Disconnected,
            ControlMode::Autonomous,
            ControlMode::EmergencyStopped,
        ] {
            assert_eq!(d.dispatch(mode, InputEvent::KeyDown(KeyCode::Char('w'))), None);
            assert_eq!(d.dispatch(mode, InputEvent::Button(Button::Stop)), None);
            assert_eq!(d.dispatch(mode, InputEvent::Slider { slot: MotorSlot::M1, value: 50 }), None);
            assert_eq!(d.dispatch(mode, InputEvent::Go), None);
        }
        // Slider changes while disabled were discarded
        assert_eq!(d.sliders(), [0, 0, 0]);
    }

    #[test]
    fn test_action_for_key() {
        assert_eq!(
            action_for_key(KeyCode::Char('w')),
            Some(KeyAction::Input(InputEvent::KeyDown(KeyCode::Char('w'))))
        );
        assert_eq!(action_for_key(KeyCode::Esc), Some(KeyAction::Command(Command::EmergencyStop)));
        assert_eq!(action_for_key(KeyCode::Char('M')), Some(KeyAction::Command(Command::ToggleAutonomous)));
        assert_eq!(action_for_key(KeyCode::Char('2')), Some(KeyAction::SelectSlot(MotorSlot::M2)));
        assert_eq!(action_for_key(KeyCode::Char('.')), Some(KeyAction::Nudge(1)));
        assert_eq!(action_for_key(KeyCode::Char('g')), Some(KeyAction::Input(InputEvent::Go)));
        assert_eq!(action_for_key(KeyCode::Tab), None);
    }
}
