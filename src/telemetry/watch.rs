//! # Watch Log
//!
//! Extracts an operator-chosen list of telemetry keys from each sampled
//! frame and keeps the resulting rows until they are flushed or cleared.
//!
//! ## Log Form
//!
//! ```text
//! watch;time;bat;baro;LastCommand;
//! watch;1700000000,123;72;-70,56;takeoff;
//! ```
//!
//! A header row is emitted whenever the selection differs from the one the
//! previous header described. With decimal commas enabled, `.` becomes `,`
//! in the time and value columns of the log form. The table form printed
//! live uses fixed-width columns and leaves values untouched.

use std::io::{self, Write};

use super::state::DeviceState;

/// First column of every log row.
pub const WATCH_TAG: &str = "watch";
/// Header label of the trailing command column.
pub const LAST_COMMAND_COLUMN: &str = "LastCommand";
/// Placeholder for a watched key that has never been received.
pub const MISSING_VALUE: &str = "error";

const LOG_DELIMITER: char = ';';

/// How records are rendered.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WatchFormat {
    pub decimal_comma: bool,
    pub column_width: usize,
}

impl Default for WatchFormat {
    fn default() -> Self {
        Self {
            decimal_comma: true,
            column_width: 12,
        }
    }
}

/// One emitted row, before rendering.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum WatchRecord {
    Header {
        keys: Vec<String>,
    },
    Data {
        timestamp: String,
        values: Vec<String>,
        last_command: String,
    },
}

impl WatchRecord {
    /// Semicolon-delimited row for the watch log.
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_console::telemetry::watch::{WatchFormat, WatchRecord};
    ///
    /// let row = WatchRecord::Data {
    ///     timestamp: "1700000000.123".to_string(),
    ///     values: vec!["72".to_string(), "-70.56".to_string()],
    ///     last_command: "takeoff".to_string(),
    /// };
    /// assert_eq!(
    ///     row.log_line(&WatchFormat::default()),
    ///     "watch;1700000000,123;72;-70,56;takeoff;"
    /// );
    /// ```
    #[must_use]
    pub fn log_line(&self, format: &WatchFormat) -> String {
        let localize = |field: &str| {
            if format.decimal_comma {
                field.replace('.', ",")
            } else {
                field.to_string()
            }
        };

        let mut columns: Vec<String> = vec![WATCH_TAG.to_string()];
        match self {
            WatchRecord::Header { keys } => {
                columns.push("time".to_string());
                columns.extend(keys.iter().cloned());
                columns.push(LAST_COMMAND_COLUMN.to_string());
            }
            WatchRecord::Data {
                timestamp,
                values,
                last_command,
            } => {
                columns.push(localize(timestamp));
                columns.extend(values.iter().map(|v| localize(v)));
                columns.push(last_command.clone());
            }
        }

        let mut line = String::new();
        for column in columns {
            line.push_str(&column);
            line.push(LOG_DELIMITER);
        }
        line
    }

    /// Fixed-width row for live display.
    #[must_use]
    pub fn table_line(&self, format: &WatchFormat) -> String {
        let width = format.column_width;
        let columns: Vec<&str> = match self {
            WatchRecord::Header { keys } => std::iter::once("time")
                .chain(keys.iter().map(String::as_str))
                .chain(std::iter::once(LAST_COMMAND_COLUMN))
                .collect(),
            WatchRecord::Data {
                timestamp,
                values,
                last_command,
            } => std::iter::once(timestamp.as_str())
                .chain(values.iter().map(String::as_str))
                .chain(std::iter::once(last_command.as_str()))
                .collect(),
        };

        columns
            .iter()
            .map(|c| format!("{:<width$}", c, width = width))
            .collect::<Vec<_>>()
            .join(" ")
            .trim_end()
            .to_string()
    }
}

/// Watch selection plus the accumulated log.
#[derive(Debug, Clone, Default)]
pub struct WatchLog {
    selection: Vec<String>,
    emitted: Vec<String>,
    records: Vec<String>,
    format: WatchFormat,
}

impl WatchLog {
    #[must_use]
    pub fn new(format: WatchFormat) -> Self {
        Self {
            format,
            ..Self::default()
        }
    }

    #[must_use]
    pub fn format(&self) -> &WatchFormat {
        &self.format
    }

    /// Replace the selection. An empty selection disables watching, and the
    /// next non-empty selection starts with a fresh header.
    pub fn set_selection(&mut self, keys: Vec<String>) {
        if keys.is_empty() {
            self.emitted.clear();
        }
        self.selection = keys;
    }

    #[must_use]
    pub fn selection(&self) -> &[String] {
        &self.selection
    }

    #[must_use]
    pub fn is_active(&self) -> bool {
        !self.selection.is_empty()
    }

    /// Produce the rows for one sampled frame and append them to the log.
    ///
    /// Returns nothing when the selection is empty; otherwise an optional
    /// header followed by one data row.
    pub fn record(
        &mut self,
        state: &DeviceState,
        last_command: &str,
        timestamp: String,
    ) -> Vec<WatchRecord> {
        if self.selection.is_empty() {
            return Vec::new();
        }

        let mut rows = Vec::with_capacity(2);
        if self.emitted != self.selection {
            rows.push(WatchRecord::Header {
                keys: self.selection.clone(),
            });
            self.emitted = self.selection.clone();
        }

        let values = self
            .selection
            .iter()
            .map(|key| state.get(key).unwrap_or(MISSING_VALUE).to_string())
            .collect();
        rows.push(WatchRecord::Data {
            timestamp,
            values,
            last_command: last_command.to_string(),
        });

        for row in &rows {
            self.records.push(row.log_line(&self.format));
        }
        rows
    }

    #[must_use]
    pub fn records(&self) -> &[String] {
        &self.records
    }

    /// Write every record, oldest first, without consuming them.
    ///
    /// Returns the number of records written.
    pub fn flush_to<W: Write + ?Sized>(&self, out: &mut W) -> io::Result<usize> {
        for record in &self.records {
            writeln!(out, "{}", record)?;
        }
        out.flush()?;
        Ok(self.records.len())
    }

    pub fn clear(&mut self) {
        self.records.clear();
    }
}

/// Wall-clock seconds with millisecond precision, e.g. `1700000000.123`.
#[must_use]
pub fn timestamp_now() -> String {
    let millis = chrono::Utc::now().timestamp_millis();
    format!("{}.{:03}", millis.div_euclid(1000), millis.rem_euclid(1000))
}
