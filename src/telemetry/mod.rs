//! # Telemetry Module
//!
//! Decodes the drone's state broadcast and records selected fields.
//!
//! This module handles:
//! - Parsing `key:value;` telemetry frames into [`state::DeviceState`]
//! - Deriving the numeric [`state::DeviceInfo`] snapshot
//! - Tracking the watch selection and formatting CSV/table records
//! - Accumulating the watch log until it is flushed or cleared

pub mod parser;
pub mod state;
pub mod watch;
