//! # Control Module
//!
//! Operator input handling.
//!
//! This module handles:
//! - Abstract key events produced by a terminal key reader
//! - The string / key / joystick input-mode state machine
//! - The simulated joystick (RC) vector and its clamping
//! - Distance and angle step settings for key-mode moves
//! - Line and key sources feeding the dispatch loop

pub mod console;
pub mod input_mode;
pub mod keys;
