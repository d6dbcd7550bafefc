//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so an empty file (or no file at all) yields a
//! configuration that talks to a Tello at its factory address.

use serde::de::Error;
use serde::Deserialize;
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::Path;
use std::time::Duration;

use crate::engine::shared::sample_period;
use crate::error::{Result, TelloError};

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub network: NetworkConfig,
    #[serde(default)]
    pub timing: TimingConfig,
    #[serde(default)]
    pub control: ControlConfig,
    #[serde(default)]
    pub watch: WatchConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// UDP endpoints of the command and telemetry channels
#[derive(Debug, Deserialize, Clone)]
pub struct NetworkConfig {
    #[serde(default = "default_drone_ip")]
    pub drone_ip: String,

    #[serde(default = "default_command_port")]
    pub command_port: u16,

    #[serde(default = "default_state_port")]
    pub state_port: u16,

    #[serde(default = "default_local_command_port")]
    pub local_command_port: u16,

    #[serde(default = "default_recv_timeout_ms")]
    pub recv_timeout_ms: u64,

    #[serde(default = "default_recv_buffer_size")]
    pub recv_buffer_size: usize,
}

/// Scheduler, loop and shutdown timing
#[derive(Debug, Deserialize, Clone)]
pub struct TimingConfig {
    #[serde(default = "default_keepalive_interval_s")]
    pub keepalive_interval_s: u64,

    #[serde(default = "default_scheduler_tick_ms")]
    pub scheduler_tick_ms: u64,

    #[serde(default = "default_loop_tick_ms")]
    pub loop_tick_ms: u64,

    #[serde(default = "default_shutdown_grace_s")]
    pub shutdown_grace_s: u64,
}

/// Key-mode step sizes and joystick increments
#[derive(Debug, Deserialize, Clone)]
pub struct ControlConfig {
    #[serde(default = "default_distance")]
    pub distance: u32,

    #[serde(default = "default_distance_min")]
    pub distance_min: u32,

    #[serde(default = "default_distance_max")]
    pub distance_max: u32,

    #[serde(default = "default_angle")]
    pub angle: u32,

    #[serde(default = "default_angle_min")]
    pub angle_min: u32,

    #[serde(default = "default_angle_max")]
    pub angle_max: u32,

    #[serde(default = "default_rc_step")]
    pub rc_step: i32,
}

/// Initial watch selection and output format
#[derive(Debug, Deserialize, Clone)]
pub struct WatchConfig {
    #[serde(default)]
    pub keys: Vec<String>,

    /// Seconds between sampled frames, at most one day; zero or negative
    /// disables sampling
    #[serde(default = "default_watch_period_s")]
    pub period_s: f64,

    #[serde(default = "default_decimal_comma")]
    pub decimal_comma: bool,

    #[serde(default = "default_column_width")]
    pub column_width: usize,
}

/// Log verbosity and optional log file
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: u8,

    #[serde(default)]
    pub file: Option<String>,
}

// Default value functions
fn default_drone_ip() -> String { "192.168.10.1".to_string() }
fn default_command_port() -> u16 { 8889 }
fn default_state_port() -> u16 { 8890 }
fn default_local_command_port() -> u16 { 8889 }
fn default_recv_timeout_ms() -> u64 { 1000 }
fn default_recv_buffer_size() -> usize { 1518 }

fn default_keepalive_interval_s() -> u64 { 10 }
fn default_scheduler_tick_ms() -> u64 { 50 }
fn default_loop_tick_ms() -> u64 { 10 }
fn default_shutdown_grace_s() -> u64 { 3 }

fn default_distance() -> u32 { 40 }
fn default_distance_min() -> u32 { 20 }
fn default_distance_max() -> u32 { 500 }
fn default_angle() -> u32 { 90 }
fn default_angle_min() -> u32 { 15 }
fn default_angle_max() -> u32 { 360 }
fn default_rc_step() -> i32 { 10 }

fn default_watch_period_s() -> f64 { -1.0 }
fn default_decimal_comma() -> bool { true }
fn default_column_width() -> usize { 12 }

fn default_log_level() -> u8 { 1 }

impl Default for NetworkConfig {
    fn default() -> Self {
        Self {
            drone_ip: default_drone_ip(),
            command_port: default_command_port(),
            state_port: default_state_port(),
            local_command_port: default_local_command_port(),
            recv_timeout_ms: default_recv_timeout_ms(),
            recv_buffer_size: default_recv_buffer_size(),
        }
    }
}

impl Default for TimingConfig {
    fn default() -> Self {
        Self {
            keepalive_interval_s: default_keepalive_interval_s(),
            scheduler_tick_ms: default_scheduler_tick_ms(),
            loop_tick_ms: default_loop_tick_ms(),
            shutdown_grace_s: default_shutdown_grace_s(),
        }
    }
}

impl Default for ControlConfig {
    fn default() -> Self {
        Self {
            distance: default_distance(),
            distance_min: default_distance_min(),
            distance_max: default_distance_max(),
            angle: default_angle(),
            angle_min: default_angle_min(),
            angle_max: default_angle_max(),
            rc_step: default_rc_step(),
        }
    }
}

impl Default for WatchConfig {
    fn default() -> Self {
        Self {
            keys: Vec::new(),
            period_s: default_watch_period_s(),
            decimal_comma: default_decimal_comma(),
            column_width: default_column_width(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

impl NetworkConfig {
    /// Address of the drone's command port
    ///
    /// # Errors
    ///
    /// Returns error if `drone_ip` is not an IP address
    pub fn command_addr(&self) -> Result<SocketAddr> {
        let ip: IpAddr = self.drone_ip.parse().map_err(|_| {
            TelloError::Config(toml::de::Error::custom(format!(
                "drone_ip '{}' is not a valid IP address",
                self.drone_ip
            )))
        })?;
        Ok(SocketAddr::new(ip, self.command_port))
    }

    pub fn recv_timeout(&self) -> Duration {
        Duration::from_millis(self.recv_timeout_ms)
    }
}

impl TimingConfig {
    pub fn keepalive_interval(&self) -> Duration {
        Duration::from_secs(self.keepalive_interval_s)
    }

    pub fn scheduler_tick(&self) -> Duration {
        Duration::from_millis(self.scheduler_tick_ms)
    }

    pub fn loop_tick(&self) -> Duration {
        Duration::from_millis(self.loop_tick_ms)
    }

    pub fn shutdown_grace(&self) -> Duration {
        Duration::from_secs(self.shutdown_grace_s)
    }
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Errors
    ///
    /// Returns error if:
    /// - File cannot be read
    /// - TOML parsing fails
    /// - Validation fails
    ///
    /// # Examples
    ///
    /// ```no_run
    /// use tello_console::config::Config;
    ///
    /// let config = Config::load("tello.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from a TOML string
    ///
    /// # Examples
    ///
    /// ```
    /// use tello_console::config::Config;
    ///
    /// let config = Config::from_toml("[control]\ndistance = 80\n").unwrap();
    /// assert_eq!(config.control.distance, 80);
    /// assert_eq!(config.network.command_port, 8889);
    /// ```
    pub fn from_toml(contents: &str) -> Result<Self> {
        let config: Config = toml::from_str(contents)?;
        config.validate()?;
        Ok(config)
    }

    /// Validate configuration values
    ///
    /// # Errors
    ///
    /// Returns error if any configuration value is out of valid range
    pub fn validate(&self) -> Result<()> {
        fn invalid(msg: impl std::fmt::Display) -> TelloError {
            TelloError::Config(toml::de::Error::custom(msg))
        }

        if self.network.drone_ip.is_empty() {
            return Err(invalid("drone_ip cannot be empty"));
        }
        self.network.command_addr()?;

        if self.network.command_port == 0
            || self.network.state_port == 0
            || self.network.local_command_port == 0
        {
            return Err(invalid("ports must be non-zero"));
        }

        if self.network.recv_timeout_ms == 0 || self.network.recv_timeout_ms > 10000 {
            return Err(invalid("recv_timeout_ms must be between 1 and 10000"));
        }

        if self.network.recv_buffer_size == 0 {
            return Err(invalid("recv_buffer_size must be greater than 0"));
        }

        if self.timing.keepalive_interval_s == 0 || self.timing.keepalive_interval_s > 3600 {
            return Err(invalid("keepalive_interval_s must be between 1 and 3600"));
        }

        if self.timing.shutdown_grace_s > 60 {
            return Err(invalid("shutdown_grace_s must be at most 60"));
        }

        if self.timing.scheduler_tick_ms == 0 || self.timing.loop_tick_ms == 0 {
            return Err(invalid("scheduler_tick_ms and loop_tick_ms must be greater than 0"));
        }

        for (name, value, min, max) in [
            ("distance", self.control.distance, self.control.distance_min, self.control.distance_max),
            ("angle", self.control.angle, self.control.angle_min, self.control.angle_max),
        ] {
            if min == 0 || min > max {
                return Err(invalid(format!("{} range must satisfy 0 < min <= max", name)));
            }
            if value < min || value > max {
                return Err(invalid(format!("{} must be between {} and {}", name, min, max)));
            }
        }

        if self.control.rc_step < 1 || self.control.rc_step > 100 {
            return Err(invalid("rc_step must be between 1 and 100"));
        }

        if let Err(e) = sample_period(self.watch.period_s) {
            return Err(invalid(format!("period_s: {}", e)));
        }

        if self.watch.column_width == 0 {
            return Err(invalid("column_width must be greater than 0"));
        }

        Ok(())
    }
}
