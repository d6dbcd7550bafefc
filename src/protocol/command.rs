//! # Command Grammar
//!
//! Every staged line is either a local command, handled entirely by the
//! console, or a device command forwarded verbatim over UDP.
//!
//! ## Local Commands
//!
//! | Line | Effect |
//! |------|--------|
//! | `end` | stop the program |
//! | `help`, `h`, `?` | print help |
//! | `info` | print device info |
//! | `key`, `joystick`, `string` | switch input mode |
//! | `dist n`, `ang n` | set key-mode distance / angle |
//! | `watch k1 k2 ...` | select telemetry keys (none = raw frames) |
//! | `watchperiod s` | sample one frame every `s` seconds (≤ 0 = off) |
//! | `state n` | print / record the next `n` frames |
//! | `log [flush\|clear]` | print or discard the watch log |
//! | `sleep s` | hold the queue for `s` seconds |
//! | `script file [insert\|append\|replace]` | load a script |
//! | `debug n` | change log verbosity |
//! | `ready` | queue the motor-start stick command, then joystick mode |

use crate::control::input_mode::InputMode;
use crate::engine::queue::Placement;
use crate::error::{Result, TelloError};

/// Sent to the device when the link has been idle for the keepalive interval.
pub const KEEPALIVE_COMMAND: &str = "wifi?";

/// Queued at startup: enter SDK mode, then probe the protocol version.
pub const STARTUP_COMMANDS: [&str; 2] = ["command", "sdk?"];

/// Queued ahead of everything by `ready`.
pub const READY_SEQUENCE: [&str; 2] = ["rc -100 -100 -100 100", "joystick"];

const COMMENT_MARKER: char = '#';
const RC_PREFIX: &str = "rc ";

/// Log actions available to the operator.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LogAction {
    Flush,
    Clear,
}

/// Commands handled by the console without reaching the device.
#[derive(Debug, Clone, PartialEq)]
pub enum LocalCommand {
    End,
    Help,
    Info,
    Mode(InputMode),
    Distance(u32),
    Angle(u32),
    Watch(Vec<String>),
    WatchPeriod(f64),
    State(u32),
    Log(LogAction),
    Sleep(f64),
    Script { path: String, placement: Placement },
    Debug(u8),
    Ready,
}

/// A staged line after classification.
#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Local(LocalCommand),
    Device(String),
}

/// Drop a trailing `# comment` and surrounding whitespace.
///
/// # Examples
///
/// ```
/// use tello_console::protocol::command::strip_comment;
///
/// assert_eq!(strip_comment("up 50   # climb a bit"), "up 50");
/// assert_eq!(strip_comment("# only a comment"), "");
/// ```
#[must_use]
pub fn strip_comment(line: &str) -> &str {
    match line.find(COMMENT_MARKER) {
        Some(index) => line[..index].trim(),
        None => line.trim(),
    }
}

/// True for commands the device streams continuously without a per-command
/// acknowledgement cadence.
#[must_use]
pub fn is_continuous(command: &str) -> bool {
    command.starts_with(RC_PREFIX)
}

/// Classify one line. Comments are stripped first; an empty result is
/// `Ok(None)`.
///
/// # Errors
///
/// Returns [`TelloError::InvalidArgument`] when a local keyword is given
/// missing or malformed arguments.
///
/// # Examples
///
/// ```
/// use tello_console::protocol::command::{parse, Command, LocalCommand};
///
/// assert_eq!(parse("dist 80").unwrap(), Some(Command::Local(LocalCommand::Distance(80))));
/// assert_eq!(parse("takeoff # go").unwrap(), Some(Command::Device("takeoff".into())));
/// assert!(parse("dist far").is_err());
/// ```
pub fn parse(line: &str) -> Result<Option<Command>> {
    let line = strip_comment(line);
    let mut words = line.split_whitespace();
    let Some(keyword) = words.next() else {
        return Ok(None);
    };
    let args: Vec<&str> = words.collect();

    let local = match keyword {
        "end" => LocalCommand::End,
        "help" | "h" | "?" => LocalCommand::Help,
        "info" => LocalCommand::Info,
        "key" => LocalCommand::Mode(InputMode::Key),
        "joystick" => LocalCommand::Mode(InputMode::Joystick),
        "string" => LocalCommand::Mode(InputMode::Text),
        "dist" => LocalCommand::Distance(single_arg("dist", &args)?),
        "ang" => LocalCommand::Angle(single_arg("ang", &args)?),
        "watch" => LocalCommand::Watch(args.iter().map(|k| k.to_string()).collect()),
        "watchperiod" => LocalCommand::WatchPeriod(single_arg("watchperiod", &args)?),
        "state" => LocalCommand::State(single_arg("state", &args)?),
        "log" => LocalCommand::Log(parse_log_action(&args)?),
        "sleep" => {
            let seconds: f64 = single_arg("sleep", &args)?;
            if !seconds.is_finite() || seconds < 0.0 {
                return Err(invalid("sleep", "duration must be a non-negative number of seconds"));
            }
            LocalCommand::Sleep(seconds)
        }
        "script" => parse_script(&args)?,
        "debug" => LocalCommand::Debug(single_arg("debug", &args)?),
        "ready" => LocalCommand::Ready,
        _ => return Ok(Some(Command::Device(line.to_string()))),
    };

    Ok(Some(Command::Local(local)))
}

fn invalid(command: &'static str, reason: impl Into<String>) -> TelloError {
    TelloError::InvalidArgument {
        command,
        reason: reason.into(),
    }
}

fn single_arg<T: std::str::FromStr>(command: &'static str, args: &[&str]) -> Result<T> {
    match args {
        [value] => value
            .parse()
            .map_err(|_| invalid(command, format!("'{}' is not a valid value", value))),
        [] => Err(invalid(command, "missing value")),
        _ => Err(invalid(command, "expected exactly one value")),
    }
}

fn parse_log_action(args: &[&str]) -> Result<LogAction> {
    match args {
        [] | ["flush"] => Ok(LogAction::Flush),
        ["clear"] => Ok(LogAction::Clear),
        _ => Err(invalid("log", "expected 'flush' or 'clear'")),
    }
}

fn parse_script(args: &[&str]) -> Result<LocalCommand> {
    match args {
        [path] => Ok(LocalCommand::Script {
            path: path.to_string(),
            placement: Placement::Front,
        }),
        [path, placement] => Ok(LocalCommand::Script {
            path: path.to_string(),
            placement: placement.parse().map_err(|reason: String| invalid("script", reason))?,
        }),
        [] => Err(invalid("script", "no filename given")),
        _ => Err(invalid("script", "expected a filename and an optional placement")),
    }
}
