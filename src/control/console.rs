//! Line and key sources for the dispatch loop.
//!
//! The loop reads typed lines in string mode and polls single keys in key
//! and joystick mode. Both are traits so the loop can be driven by the
//! terminal or by canned input in tests.

use async_trait::async_trait;
use crossterm::event::{self, Event, KeyCode, KeyEventKind, KeyModifiers};
use std::io::{BufRead, Write};
use std::time::Duration;
use tokio::sync::mpsc;
use tracing::warn;

use super::keys::KeyEvent;

/// Source of typed command lines.
#[async_trait]
pub trait LineSource: Send {
    /// Wait for the next line. `None` means input is exhausted.
    async fn read_line(&mut self) -> Option<String>;
}

/// Non-blocking source of key presses.
pub trait KeySource: Send {
    /// Return a pending key press, if any, without waiting.
    fn poll_key(&mut self) -> Option<KeyEvent>;

    /// Called when key input starts or stops being used.
    fn set_active(&mut self, _active: bool) {}
}

/// Lines from standard input, with a `>` prompt.
///
/// A dedicated thread reads one line per request, so stdin is only read
/// while the loop is actually waiting for text and never competes with the
/// key reader. The thread does not hold up process exit.
pub struct StdinLines {
    requests: std::sync::mpsc::Sender<()>,
    lines: mpsc::UnboundedReceiver<Option<String>>,
    pending: bool,
}

impl Default for StdinLines {
    fn default() -> Self {
        Self::new()
    }
}

impl StdinLines {
    #[must_use]
    pub fn new() -> Self {
        let (requests, request_rx) = std::sync::mpsc::channel::<()>();
        let (line_tx, lines) = mpsc::unbounded_channel();

        let reader = std::thread::Builder::new()
            .name("stdin".to_string())
            .spawn(move || {
                let stdin = std::io::stdin();
                for () in request_rx {
                    let mut buf = String::new();
                    let line = match stdin.lock().read_line(&mut buf) {
                        Ok(0) => None,
                        Ok(_) => Some(buf.trim_end_matches(['\r', '\n']).to_string()),
                        Err(e) => {
                            warn!("Failed to read from stdin: {}", e);
                            None
                        }
                    };
                    if line_tx.send(line).is_err() {
                        break;
                    }
                }
            });
        if let Err(e) = reader {
            warn!("Failed to start stdin reader: {}", e);
        }

        Self {
            requests,
            lines,
            pending: false,
        }
    }
}

#[async_trait]
impl LineSource for StdinLines {
    async fn read_line(&mut self) -> Option<String> {
        if !self.pending {
            let mut stdout = std::io::stdout();
            let _ = write!(stdout, ">");
            let _ = stdout.flush();

            if self.requests.send(()).is_err() {
                return None;
            }
            self.pending = true;
        }

        let line = self.lines.recv().await.flatten();
        self.pending = false;
        line
    }
}

/// Key presses from the terminal via crossterm.
///
/// Raw mode is enabled while key input is active and restored when it is
/// deactivated or the reader is dropped.
#[derive(Debug, Default)]
pub struct TerminalKeys {
    raw: bool,
}

impl TerminalKeys {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    fn enter_raw(&mut self) {
        if !self.raw {
            match crossterm::terminal::enable_raw_mode() {
                Ok(()) => self.raw = true,
                Err(e) => warn!("Failed to enable raw terminal mode: {}", e),
            }
        }
    }

    fn leave_raw(&mut self) {
        if self.raw {
            if let Err(e) = crossterm::terminal::disable_raw_mode() {
                warn!("Failed to restore terminal mode: {}", e);
            }
            self.raw = false;
        }
    }
}

impl Drop for TerminalKeys {
    fn drop(&mut self) {
        self.leave_raw();
    }
}

impl KeySource for TerminalKeys {
    fn poll_key(&mut self) -> Option<KeyEvent> {
        self.enter_raw();

        match event::poll(Duration::ZERO) {
            Ok(true) => {}
            Ok(false) => return None,
            Err(e) => {
                warn!("Failed to poll terminal: {}", e);
                return None;
            }
        }

        match event::read() {
            Ok(Event::Key(key)) if key.kind != KeyEventKind::Release => {
                decode_key(key.code, key.modifiers)
            }
            Ok(_) => None,
            Err(e) => {
                warn!("Failed to read terminal event: {}", e);
                None
            }
        }
    }

    fn set_active(&mut self, active: bool) {
        if active {
            self.enter_raw();
        } else {
            self.leave_raw();
        }
    }
}

/// Map a crossterm key to a [`KeyEvent`].
///
/// Ctrl+C is treated as Escape so the operator can always get back to the
/// line prompt.
fn decode_key(code: KeyCode, modifiers: KeyModifiers) -> Option<KeyEvent> {
    match code {
        KeyCode::Char('c') if modifiers.contains(KeyModifiers::CONTROL) => Some(KeyEvent::Escape),
        KeyCode::Char(c) => Some(KeyEvent::Char(c)),
        KeyCode::Up => Some(KeyEvent::Up),
        KeyCode::Down => Some(KeyEvent::Down),
        KeyCode::Left => Some(KeyEvent::Left),
        KeyCode::Right => Some(KeyEvent::Right),
        KeyCode::F(1) => Some(KeyEvent::F1),
        KeyCode::F(2) => Some(KeyEvent::F2),
        KeyCode::Esc => Some(KeyEvent::Escape),
        _ => None,
    }
}


#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_decode_plain_keys() {
        assert_eq!(decode_key(KeyCode::Char('t'), KeyModifiers::NONE), Some(KeyEvent::Char('t')));
        assert_eq!(decode_key(KeyCode::Up, KeyModifiers::NONE), Some(KeyEvent::Up));
        assert_eq!(decode_key(KeyCode::F(2), KeyModifiers::NONE), Some(KeyEvent::F2));
        assert_eq!(decode_key(KeyCode::Esc, KeyModifiers::NONE), Some(KeyEvent::Escape));
    }

    #[test]
    fn test_decode_ctrl_c_as_escape() {
        assert_eq!(decode_key(KeyCode::Char('c'), KeyModifiers::CONTROL), Some(KeyEvent::Escape));
    }

    #[test]
    fn test_decode_unmapped_keys() {
        assert_eq!(decode_key(KeyCode::F(5), KeyModifiers::NONE), None);
        assert_eq!(decode_key(KeyCode::Tab, KeyModifiers::NONE), None);
    }

    #[tokio::test]
    async fn test_scripted_lines_exhaust() {
        let mut lines = mocks::ScriptedLines::new(&["takeoff"]);
        assert_eq!(lines.read_line().await, Some("takeoff".to_string()));
        assert_eq!(lines.read_line().await, None);
    }
}
