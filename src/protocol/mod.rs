//! # Tello SDK Protocol Module
//!
//! Text protocol spoken over the command channel.
//!
//! This module handles:
//! - Recognising local (console-only) commands versus device commands
//! - Startup, keepalive and motor-start command sequences
//! - Interpreting acknowledgements and query responses

pub mod command;
pub mod response;
