//! # Tello Console Library
//!
//! Fly a Tello from the terminal: typed SDK commands, single-key and
//! simulated-joystick control, command scripts, and telemetry watch logs.
//!
//! This library provides the protocol engine behind the `tello-console`
//! binary: the readiness-gated command dispatcher, the telemetry parser and
//! watch log, the keepalive/sampling scheduler, the input-mode state machine
//! and the command queue that merges scripted and interactive input.

pub mod config;
pub mod control;
pub mod engine;
pub mod error;
pub mod help;
pub mod link;
pub mod logging;
pub mod protocol;
pub mod script;
pub mod telemetry;
