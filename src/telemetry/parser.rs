//! # Telemetry Frame Parser
//!
//! Decodes the drone's state broadcast.
//!
//! ## Wire Format
//!
//! ```text
//! mid:-1;x:0;y:0;z:0;mpry:0,0,0;pitch:0;roll:0;yaw:0;...;bat:88;baro:38.28;\r\n
//! ```
//!
//! Segments are separated by `;`, key and value by the first `:`. A trailing
//! `;` and surrounding whitespace are tolerated; segments without a `:` are
//! skipped. Values are kept as strings.

use super::state::{DeviceInfo, DeviceState};

/// Iterate over the `(key, value)` pairs of one raw frame.
///
/// # Examples
///
/// ```
/// use tello_console::telemetry::parser::pairs;
///
/// let parsed: Vec<_> = pairs("bat:72;garbage;baro:-70.56;").collect();
/// assert_eq!(parsed, vec![("bat", "72"), ("baro", "-70.56")]);
/// ```
pub fn pairs(frame: &str) -> impl Iterator<Item = (&str, &str)> {
    frame
        .split(';')
        .map(str::trim)
        .filter(|segment| !segment.is_empty())
        .filter_map(|segment| segment.split_once(':'))
        .map(|(key, value)| (key.trim(), value.trim()))
        .filter(|(key, _)| !key.is_empty())
}

/// Apply one frame to the device state, then refresh the derived info.
///
/// Returns the number of pairs written.
pub fn apply_frame(frame: &str, state: &mut DeviceState, info: &mut DeviceInfo) -> usize {
    let mut written = 0;
    for (key, value) in pairs(frame) {
        tracing::trace!("keyword = {} value = {}", key, value);
        state.set(key, value);
        written += 1;
    }
    info.refresh_from(state);
    written
}
