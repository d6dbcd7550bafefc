//! # Device State
//!
//! Latest telemetry snapshot and the numeric projection derived from it.

use std::collections::HashMap;

/// Value used for every [`DeviceInfo`] field until it is first observed.
pub const UNKNOWN: i32 = -1;

/// Telemetry key carrying the battery percentage.
pub const KEY_BATTERY: &str = "bat";
/// Telemetry key carrying the lowest motor temperature.
pub const KEY_TEMP_LOW: &str = "templ";
/// Telemetry key carrying the highest motor temperature.
pub const KEY_TEMP_HIGH: &str = "temph";

/// Most recent raw value for every telemetry key seen so far.
///
/// Keys are whatever the device sends; unknown keys are kept and a key
/// missing from a later frame keeps its last value.
///
/// # Examples
///
/// ```
/// use tello_console::telemetry::state::DeviceState;
///
/// let mut state = DeviceState::new();
/// state.set("bat", "88");
/// assert_eq!(state.get("bat"), Some("88"));
/// assert_eq!(state.get("baro"), None);
/// ```
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct DeviceState {
    values: HashMap<String, String>,
}

impl DeviceState {
    #[must_use]
    pub fn new() -> Self {
        Self::default()
    }

    /// Store `value` under `key`, replacing any earlier value.
    pub fn set(&mut self, key: impl Into<String>, value: impl Into<String>) {
        self.values.insert(key.into(), value.into());
    }

    #[must_use]
    pub fn get(&self, key: &str) -> Option<&str> {
        self.values.get(key).map(String::as_str)
    }

    /// Parse the value of `key` as an integer.
    ///
    /// Returns `None` if the key was never observed or its value is not a
    /// number. Decimal values are rounded.
    #[must_use]
    pub fn get_int(&self, key: &str) -> Option<i32> {
        let raw = self.get(key)?.trim();
        raw.parse::<i32>()
            .ok()
            .or_else(|| raw.parse::<f64>().ok().map(|v| v.round() as i32))
    }

    #[must_use]
    pub fn len(&self) -> usize {
        self.values.len()
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.values.is_empty()
    }
}

/// Numeric device snapshot.
///
/// Fields hold [`UNKNOWN`] until observed. Protocol version, battery and
/// link quality come from query responses; battery and temperature are
/// also refreshed from every telemetry frame.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeviceInfo {
    pub protocol_version: i32,
    pub battery_percent: i32,
    pub temperature: i32,
    pub link_quality: i32,
}

impl Default for DeviceInfo {
    fn default() -> Self {
        Self {
            protocol_version: UNKNOWN,
            battery_percent: UNKNOWN,
            temperature: UNKNOWN,
            link_quality: UNKNOWN,
        }
    }
}

impl DeviceInfo {
    /// Refresh battery and temperature from the current telemetry state.
    ///
    /// A field whose source key is absent keeps its previous value; a
    /// present but non-numeric value sets it to [`UNKNOWN`]. Temperature is the mean of the low and high readings, rounded
    /// half away from zero.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_console::telemetry::state::{DeviceInfo, DeviceState};
    ///
    /// let mut state = DeviceState::new();
    /// state.set("bat", "88");
    /// state.set("templ", "51");
    /// state.set("temph", "54");
    ///
    /// let mut info = DeviceInfo::default();
    /// info.refresh_from(&state);
    /// assert_eq!(info.battery_percent, 88);
    /// assert_eq!(info.temperature, 53);
    /// ```
    pub fn refresh_from(&mut self, state: &DeviceState) {
        if let Some(battery) = reading(state, KEY_BATTERY) {
            self.battery_percent = battery.unwrap_or(UNKNOWN);
        }

        if let (Some(low), Some(high)) = (reading(state, KEY_TEMP_LOW), reading(state, KEY_TEMP_HIGH)) {
            self.temperature = match (low, high) {
                (Some(low), Some(high)) => ((f64::from(low) + f64::from(high)) / 2.0).round() as i32,
                _ => UNKNOWN,
            };
        }
    }
}

/// `None` if `key` is absent, `Some(None)` if its value is not a number.
fn reading(state: &DeviceState, key: &str) -> Option<Option<i32>> {
    state.get(key)?;
    Some(state.get_int(key))
}

impl std::fmt::Display for DeviceInfo {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(
            f,
            "sdk={} battery={}% temperature={}C wifi={}",
            self.protocol_version, self.battery_percent, self.temperature, self.link_quality
        )
    }
}
