//! # Key Events
//!
//! Keys the dispatch loop understands. Raw terminal codes are decoded
//! elsewhere (see [`super::console`]); the core only sees these values.

/// A single decoded key press.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum KeyEvent {
    /// Printable character
    Char(char),
    /// Arrow up
    Up,
    /// Arrow down
    Down,
    /// Arrow left
    Left,
    /// Arrow right
    Right,
    /// Help
    F1,
    /// Print one telemetry frame
    F2,
    /// Return to string input
    Escape,
}

/// Direction a key points in, shared by key and joystick modes.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Direction {
    Forward,
    Back,
    Left,
    Right,
    Up,
    Down,
    TurnLeft,
    TurnRight,
}

impl KeyEvent {
    /// Direction bound to this key, if any.
    ///
    /// Arrows move horizontally; `w`/`s` (or `8`/`2`) climb and descend;
    /// `a`/`d` (or `4`/`6`) turn.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_console::control::keys::{Direction, KeyEvent};
    ///
    /// assert_eq!(KeyEvent::Up.direction(), Some(Direction::Forward));
    /// assert_eq!(KeyEvent::Char('8').direction(), Some(Direction::Up));
    /// assert_eq!(KeyEvent::Char('t').direction(), None);
    /// ```
    #[must_use]
    pub fn direction(self) -> Option<Direction> {
        match self {
            KeyEvent::Up => Some(Direction::Forward),
            KeyEvent::Down => Some(Direction::Back),
            KeyEvent::Left => Some(Direction::Left),
            KeyEvent::Right => Some(Direction::Right),
            KeyEvent::Char('w' | '8') => Some(Direction::Up),
            KeyEvent::Char('s' | '2') => Some(Direction::Down),
            KeyEvent::Char('a' | '4') => Some(Direction::TurnLeft),
            KeyEvent::Char('d' | '6') => Some(Direction::TurnRight),
            _ => None,
        }
    }
}
