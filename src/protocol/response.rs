//! # Response Interpreter
//!
//! Decodes replies on the command channel. A reply is only meaningful in
//! the light of the command that produced it, so the last command sent is
//! part of the input.

use crate::telemetry::state::{DeviceInfo, UNKNOWN};

/// Generic acknowledgement token.
pub const ACK: &str = "ok";

/// Reply of firmware that predates the `sdk?` query.
pub const UNKNOWN_COMMAND: &str = "unknown command";

/// Protocol version assumed when `sdk?` is not understood (SDK 1.0).
pub const LEGACY_SDK_VERSION: i32 = 10;

/// Query commands whose replies carry a value.
pub const QUERY_WIFI: &str = "wifi?";
pub const QUERY_SDK: &str = "sdk?";
pub const QUERY_BATTERY: &str = "battery?";

/// Meaning of one reply.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ResponseEvent {
    /// Plain acknowledgement
    Ack,
    /// Reply to `wifi?`
    LinkQuality(i32),
    /// Reply to `sdk?`
    ProtocolVersion(i32),
    /// Reply to `battery?`
    Battery(i32),
    /// Anything else; accepted but not interpreted
    Other(String),
}

/// Interpret `response` given the command it answers.
///
/// # Examples
///
/// ```
/// use tello_console::protocol::response::{interpret, ResponseEvent, LEGACY_SDK_VERSION};
///
/// assert_eq!(interpret("ok", "takeoff"), ResponseEvent::Ack);
/// assert_eq!(interpret("87", "battery?"), ResponseEvent::Battery(87));
/// assert_eq!(
///     interpret("unknown command", "sdk?"),
///     ResponseEvent::ProtocolVersion(LEGACY_SDK_VERSION)
/// );
/// ```
#[must_use]
pub fn interpret(response: &str, last_command: &str) -> ResponseEvent {
    let response = response.trim();
    if response == ACK {
        return ResponseEvent::Ack;
    }

    match last_command.trim() {
        QUERY_WIFI => ResponseEvent::LinkQuality(parse_or_unknown(response)),
        QUERY_SDK if response == UNKNOWN_COMMAND => ResponseEvent::ProtocolVersion(LEGACY_SDK_VERSION),
        QUERY_SDK => ResponseEvent::ProtocolVersion(parse_or_unknown(response)),
        QUERY_BATTERY => ResponseEvent::Battery(parse_or_unknown(response)),
        _ => ResponseEvent::Other(response.to_string()),
    }
}

fn parse_or_unknown(value: &str) -> i32 {
    value.parse().unwrap_or(UNKNOWN)
}

impl ResponseEvent {
    /// Store the carried value in the device info, if any.
    pub fn apply(&self, info: &mut DeviceInfo) {
        match *self {
            ResponseEvent::LinkQuality(value) => info.link_quality = value,
            ResponseEvent::ProtocolVersion(value) => info.protocol_version = value,
            ResponseEvent::Battery(value) => info.battery_percent = value,
            ResponseEvent::Ack | ResponseEvent::Other(_) => {}
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ack_short_circuits_queries() {
        assert_eq!(interpret("ok", QUERY_BATTERY), ResponseEvent::Ack);
        assert_eq!(interpret("ok\r\n", QUERY_WIFI), ResponseEvent::Ack);
    }

    #[test]
    fn test_wifi_reply() {
        assert_eq!(interpret("90", QUERY_WIFI), ResponseEvent::LinkQuality(90));
        assert_eq!(interpret("snr?", QUERY_WIFI), ResponseEvent::LinkQuality(UNKNOWN));
    }

    #[test]
    fn test_sdk_reply() {
        assert_eq!(interpret("30", QUERY_SDK), ResponseEvent::ProtocolVersion(30));
        assert_eq!(
            interpret("unknown command", QUERY_SDK),
            ResponseEvent::ProtocolVersion(LEGACY_SDK_VERSION)
        );
        assert_eq!(interpret("garbled", QUERY_SDK), ResponseEvent::ProtocolVersion(UNKNOWN));
    }

    #[test]
    fn test_battery_reply() {
        assert_eq!(interpret("64", QUERY_BATTERY), ResponseEvent::Battery(64));
        assert_eq!(interpret("", QUERY_BATTERY), ResponseEvent::Battery(UNKNOWN));
    }

    #[test]
    fn test_other_commands_not_interpreted() {
        assert_eq!(
            interpret("error Not joystick", "land"),
            ResponseEvent::Other("error Not joystick".to_string())
        );
        assert_eq!(interpret("72", "speed?"), ResponseEvent::Other("72".to_string()));
    }

    #[test]
    fn test_apply_updates_matching_field() {
        let mut info = DeviceInfo::default();
        ResponseEvent::ProtocolVersion(LEGACY_SDK_VERSION).apply(&mut info);
        ResponseEvent::LinkQuality(88).apply(&mut info);
        ResponseEvent::Battery(50).apply(&mut info);
        ResponseEvent::Other("x".into()).apply(&mut info);
        assert_eq!(info.protocol_version, LEGACY_SDK_VERSION);
        assert_eq!(info.link_quality, 88);
        assert_eq!(info.battery_percent, 50);
        assert_eq!(info.temperature, UNKNOWN);
    }
}
