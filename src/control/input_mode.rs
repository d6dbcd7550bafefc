//! # Input Mode State Machine
//!
//! Tracks how operator input is interpreted and turns key presses into
//! command strings.
//!
//! ## Modes
//!
//! | Mode | Input | Directional keys |
//! |------|-------|------------------|
//! | `string` | typed lines | n/a |
//! | `key` | single keys | fixed-size `forward 40`, `cw 90`, ... |
//! | `joystick` | single keys | ±step on one RC axis, re-sends `rc a b c d` |
//!
//! ## RC Axes
//!
//! `rc <lateral> <longitudinal> <vertical> <yaw>`, each in -100..=100.
//! Right, forward, up and clockwise are positive.
//!
//! ## Mode-independent Keys
//!
//! | Key | Result |
//! |-----|--------|
//! | `c` | `command` |
//! | `t` | `takeoff` (RC reset to neutral first) |
//! | `l` | `land` |
//! | `p` | `emergency`, sent immediately |
//! | `h` / `5` | `stop`, sent immediately; zeroes RC in joystick mode |
//! | `?` / F1 | help |
//! | F2 | `state 1` |
//! | `k` / `j` | key / joystick mode |
//! | Esc | string mode |
//! | `-` `+` | halve / double distance |
//! | `/` `*` | halve / double angle |

use std::fmt;

use super::keys::{Direction, KeyEvent};
use crate::config::ControlConfig;

/// Limit of every RC axis.
pub const RC_LIMIT: i32 = 100;

/// How raw operator input is interpreted.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum InputMode {
    /// Typed command lines
    #[default]
    Text,
    /// Single keys mapped to discrete moves
    Key,
    /// Single keys adjusting the RC vector
    Joystick,
}

impl fmt::Display for InputMode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            InputMode::Text => "string",
            InputMode::Key => "key",
            InputMode::Joystick => "joystick",
        };
        f.write_str(name)
    }
}

/// One axis of the RC vector.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RcAxis {
    Lateral,
    Longitudinal,
    Vertical,
    Yaw,
}

/// Simulated joystick position.
///
/// # Examples
///
/// ```
/// use tello_console::control::input_mode::{RcAxis, RcVector};
///
/// let mut rc = RcVector::neutral();
/// for _ in 0..3 {
///     rc.adjust(RcAxis::Longitudinal, 10);
/// }
/// assert_eq!(rc.command(), "rc 0 30 0 0");
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub struct RcVector {
    pub lateral: i32,
    pub longitudinal: i32,
    pub vertical: i32,
    pub yaw: i32,
}

impl RcVector {
    #[must_use]
    pub fn neutral() -> Self {
        Self::default()
    }

    /// Add `delta` to one axis, clamped to ±[`RC_LIMIT`].
    pub fn adjust(&mut self, axis: RcAxis, delta: i32) {
        let slot = match axis {
            RcAxis::Lateral => &mut self.lateral,
            RcAxis::Longitudinal => &mut self.longitudinal,
            RcAxis::Vertical => &mut self.vertical,
            RcAxis::Yaw => &mut self.yaw,
        };
        *slot = slot.saturating_add(delta).clamp(-RC_LIMIT, RC_LIMIT);
    }

    pub fn reset(&mut self) {
        *self = Self::neutral();
    }

    #[must_use]
    pub fn is_neutral(&self) -> bool {
        *self == Self::neutral()
    }

    /// The `rc` command carrying all four axes.
    #[must_use]
    pub fn command(&self) -> String {
        format!(
            "rc {} {} {} {}",
            self.lateral, self.longitudinal, self.vertical, self.yaw
        )
    }
}

/// A step size kept within `[min, max]`.
///
/// # Examples
///
/// ```
/// use tello_console::control::input_mode::StepSetting;
///
/// let mut distance = StepSetting::new(40, 20, 500);
/// distance.halve();
/// distance.halve();
/// distance.halve();
/// assert_eq!(distance.value(), 20);
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct StepSetting {
    value: u32,
    min: u32,
    max: u32,
}

impl StepSetting {
    #[must_use]
    pub fn new(value: u32, min: u32, max: u32) -> Self {
        Self {
            value: value.clamp(min, max),
            min,
            max,
        }
    }

    #[must_use]
    pub fn value(&self) -> u32 {
        self.value
    }

    /// Set a new value, clamped. Returns the stored value.
    pub fn set(&mut self, value: u32) -> u32 {
        self.value = value.clamp(self.min, self.max);
        self.value
    }

    pub fn halve(&mut self) -> u32 {
        self.set(self.value / 2)
    }

    pub fn double(&mut self) -> u32 {
        self.set(self.value.saturating_mul(2))
    }
}

/// What a key press asks the dispatch loop to do.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum KeyAction {
    /// Nothing to send
    None,
    /// Stage a command string for normal processing
    Stage(String),
    /// Send now, bypassing readiness gating
    Immediate(String),
}

/// Input mode, RC vector and step settings.
#[derive(Debug, Clone)]
pub struct InputState {
    mode: InputMode,
    rc: RcVector,
    distance: StepSetting,
    angle: StepSetting,
    rc_step: i32,
}

impl Default for InputState {
    fn default() -> Self {
        Self::new(&ControlConfig::default())
    }
}

impl InputState {
    #[must_use]
    pub fn new(config: &ControlConfig) -> Self {
        Self {
            mode: InputMode::Text,
            rc: RcVector::neutral(),
            distance: StepSetting::new(config.distance, config.distance_min, config.distance_max),
            angle: StepSetting::new(config.angle, config.angle_min, config.angle_max),
            rc_step: config.rc_step,
        }
    }

    #[must_use]
    pub fn mode(&self) -> InputMode {
        self.mode
    }

    /// Switch mode. Entering joystick mode resets the RC vector; leaving it
    /// does not.
    pub fn set_mode(&mut self, mode: InputMode) {
        if mode == InputMode::Joystick {
            self.rc.reset();
        }
        self.mode = mode;
    }

    #[must_use]
    pub fn rc(&self) -> &RcVector {
        &self.rc
    }

    #[must_use]
    pub fn distance(&self) -> u32 {
        self.distance.value()
    }

    #[must_use]
    pub fn angle(&self) -> u32 {
        self.angle.value()
    }

    pub fn set_distance(&mut self, value: u32) -> u32 {
        self.distance.set(value)
    }

    pub fn set_angle(&mut self, value: u32) -> u32 {
        self.angle.set(value)
    }

    /// Translate one key press according to the current mode.
    ///
    /// In string mode every key is ignored.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_console::control::input_mode::{InputMode, InputState, KeyAction};
    /// use tello_console::control::keys::KeyEvent;
    ///
    /// let mut input = InputState::default();
    /// input.set_mode(InputMode::Key);
    /// assert_eq!(input.translate(KeyEvent::Up), KeyAction::Stage("forward 40".into()));
    /// assert_eq!(input.translate(KeyEvent::Char('p')), KeyAction::Immediate("emergency".into()));
    /// ```
    pub fn translate(&mut self, key: KeyEvent) -> KeyAction {
        if self.mode == InputMode::Text {
            return KeyAction::None;
        }

        if let Some(direction) = key.direction() {
            return match self.mode {
                InputMode::Joystick => self.nudge(direction),
                _ => KeyAction::Stage(self.discrete_move(direction)),
            };
        }

        match key {
            KeyEvent::Escape => {
                self.set_mode(InputMode::Text);
                tracing::debug!("key mode ended");
                KeyAction::None
            }
            KeyEvent::Char('c') => KeyAction::Stage("command".to_string()),
            KeyEvent::Char('t') => {
                self.rc.reset();
                KeyAction::Stage("takeoff".to_string())
            }
            KeyEvent::Char('l') => KeyAction::Stage("land".to_string()),
            KeyEvent::Char('p') => KeyAction::Immediate("emergency".to_string()),
            KeyEvent::Char('h' | '5') => {
                if self.mode == InputMode::Joystick {
                    self.rc.reset();
                }
                KeyAction::Immediate("stop".to_string())
            }
            KeyEvent::Char('?') | KeyEvent::F1 => KeyAction::Stage("help".to_string()),
            KeyEvent::F2 => KeyAction::Stage("state 1".to_string()),
            KeyEvent::Char('k') => KeyAction::Stage("key".to_string()),
            KeyEvent::Char('j') => KeyAction::Stage("joystick".to_string()),
            KeyEvent::Char('-') => KeyAction::Stage(format!("dist {}", self.distance.halve())),
            KeyEvent::Char('+') => KeyAction::Stage(format!("dist {}", self.distance.double())),
            KeyEvent::Char('/') => KeyAction::Stage(format!("ang {}", self.angle.halve())),
            KeyEvent::Char('*') => KeyAction::Stage(format!("ang {}", self.angle.double())),
            _ => KeyAction::None,
        }
    }

    fn discrete_move(&self, direction: Direction) -> String {
        let distance = self.distance.value();
        let angle = self.angle.value();
        match direction {
            Direction::Forward => format!("forward {}", distance),
            Direction::Back => format!("back {}", distance),
            Direction::Left => format!("left {}", distance),
            Direction::Right => format!("right {}", distance),
            Direction::Up => format!("up {}", distance),
            Direction::Down => format!("down {}", distance),
            Direction::TurnLeft => format!("ccw {}", angle),
            Direction::TurnRight => format!("cw {}", angle),
        }
    }

    fn nudge(&mut self, direction: Direction) -> KeyAction {
        let step = self.rc_step;
        let (axis, delta) = match direction {
            Direction::Forward => (RcAxis::Longitudinal, step),
            Direction::Back => (RcAxis::Longitudinal, -step),
            Direction::Left => (RcAxis::Lateral, -step),
            Direction::Right => (RcAxis::Lateral, step),
            Direction::Up => (RcAxis::Vertical, step),
            Direction::Down => (RcAxis::Vertical, -step),
            Direction::TurnLeft => (RcAxis::Yaw, -step),
            Direction::TurnRight => (RcAxis::Yaw, step),
        };
        self.rc.adjust(axis, delta);
        KeyAction::Immediate(self.rc.command())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn joystick() -> InputState {
        let mut input = InputState::default();
        input.set_mode(InputMode::Joystick);
        input
    }

    #[test]
    fn test_initial_mode_is_string() {
        let input = InputState::default();
        assert_eq!(input.mode(), InputMode::Text);
        assert_eq!(input.mode().to_string(), "string");
    }

    #[test]
    fn test_keys_ignored_in_string_mode() {
        let mut input = InputState::default();
        assert_eq!(input.translate(KeyEvent::Char('t')), KeyAction::None);
        assert_eq!(input.translate(KeyEvent::Up), KeyAction::None);
    }

    #[test]
    fn test_joystick_up_three_times() {
        let mut input = joystick();
        let mut last = KeyAction::None;
        for _ in 0..3 {
            last = input.translate(KeyEvent::Up);
        }
        assert_eq!(input.rc().longitudinal, 30);
        assert_eq!(last, KeyAction::Immediate("rc 0 30 0 0".to_string()));
    }

    #[test]
    fn test_rc_axes_clamped() {
        let mut input = joystick();
        for _ in 0..25 {
            input.translate(KeyEvent::Right);
            input.translate(KeyEvent::Char('s'));
        }
        assert_eq!(input.rc().lateral, RC_LIMIT);
        assert_eq!(input.rc().vertical, -RC_LIMIT);
        assert_eq!(input.rc().command(), "rc 100 0 -100 0");
    }

    #[test]
    fn test_adjust_saturates_large_deltas() {
        let mut rc = RcVector::neutral();
        rc.adjust(RcAxis::Yaw, i32::MAX);
        assert_eq!(rc.yaw, RC_LIMIT);
        rc.adjust(RcAxis::Yaw, i32::MIN);
        assert_eq!(rc.yaw, -RC_LIMIT);
    }

    #[test]
    fn test_joystick_axis_signs() {
        let mut input = joystick();
        input.translate(KeyEvent::Left);
        input.translate(KeyEvent::Down);
        input.translate(KeyEvent::Char('w'));
        input.translate(KeyEvent::Char('d'));
        assert_eq!(input.rc().command(), "rc -10 -10 10 10");
    }

    #[test]
    fn test_entering_joystick_resets_rc() {
        let mut input = joystick();
        input.translate(KeyEvent::Up);
        input.set_mode(InputMode::Key);
        assert_eq!(input.rc().longitudinal, 10);
        input.set_mode(InputMode::Joystick);
        assert!(input.rc().is_neutral());
    }

    #[test]
    fn test_halt_zeroes_rc_in_joystick_mode() {
        let mut input = joystick();
        input.translate(KeyEvent::Up);
        assert_eq!(input.translate(KeyEvent::Char('h')), KeyAction::Immediate("stop".into()));
        assert!(input.rc().is_neutral());
    }

    #[test]
    fn test_halt_in_key_mode() {
        let mut input = InputState::default();
        input.set_mode(InputMode::Key);
        assert_eq!(input.translate(KeyEvent::Char('5')), KeyAction::Immediate("stop".into()));
    }

    #[test]
    fn test_takeoff_resets_rc() {
        let mut input = joystick();
        input.translate(KeyEvent::Char('a'));
        assert_eq!(input.translate(KeyEvent::Char('t')), KeyAction::Stage("takeoff".into()));
        assert!(input.rc().is_neutral());
    }

    #[test]
    fn test_key_mode_moves_use_settings() {
        let mut input = InputState::default();
        input.set_mode(InputMode::Key);
        input.set_distance(60);
        input.set_angle(45);
        assert_eq!(input.translate(KeyEvent::Char('8')), KeyAction::Stage("up 60".into()));
        assert_eq!(input.translate(KeyEvent::Char('2')), KeyAction::Stage("down 60".into()));
        assert_eq!(input.translate(KeyEvent::Left), KeyAction::Stage("left 60".into()));
        assert_eq!(input.translate(KeyEvent::Char('a')), KeyAction::Stage("ccw 45".into()));
        assert_eq!(input.translate(KeyEvent::Char('6')), KeyAction::Stage("cw 45".into()));
    }

    #[test]
    fn test_distance_halving_floors_at_minimum() {
        let mut input = InputState::default();
        input.set_mode(InputMode::Key);
        assert_eq!(input.translate(KeyEvent::Char('-')), KeyAction::Stage("dist 20".into()));
        input.translate(KeyEvent::Char('-'));
        input.translate(KeyEvent::Char('-'));
        assert_eq!(input.distance(), 20);
    }

    #[test]
    fn test_angle_doubling_caps_at_maximum() {
        let mut input = InputState::default();
        input.set_mode(InputMode::Key);
        input.translate(KeyEvent::Char('*'));
        input.translate(KeyEvent::Char('*'));
        assert_eq!(input.translate(KeyEvent::Char('*')), KeyAction::Stage("ang 360".into()));
    }

    #[test]
    fn test_escape_returns_to_string_without_zeroing_rc() {
        let mut input = joystick();
        input.translate(KeyEvent::Up);
        assert_eq!(input.translate(KeyEvent::Escape), KeyAction::None);
        assert_eq!(input.mode(), InputMode::Text);
        assert_eq!(input.rc().longitudinal, 10);
    }

    #[test]
    fn test_mode_switch_keys_stage_commands() {
        let mut input = InputState::default();
        input.set_mode(InputMode::Key);
        assert_eq!(input.translate(KeyEvent::Char('j')), KeyAction::Stage("joystick".into()));
        assert_eq!(input.translate(KeyEvent::Char('k')), KeyAction::Stage("key".into()));
        assert_eq!(input.translate(KeyEvent::F2), KeyAction::Stage("state 1".into()));
        assert_eq!(input.translate(KeyEvent::F1), KeyAction::Stage("help".into()));
    }

    #[test]
    fn test_step_setting_set_clamps() {
        let mut setting = StepSetting::new(40, 20, 500);
        assert_eq!(setting.set(1000), 500);
        assert_eq!(setting.set(1), 20);
    }
}
