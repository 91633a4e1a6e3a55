//! # Configuration Module
//!
//! Handles loading and validating configuration from TOML files.
//!
//! Every field has a default, so a missing section or key falls back to the
//! factory value. See `config/default.toml` for the shipped file.

use serde::de::Error;
use serde::Deserialize;
use std::fmt::Display;
use std::fs;
use std::path::Path;
use std::time::Duration;

use crate::controller::calibration::CalibrationSet;
use crate::controller::mixer::{ThrottleMode, DEADBAND};
use crate::controller::trim::{TRIM_MAX, TRIM_REPEAT_INTERVAL, TRIM_STEP};
use crate::error::{Result, TransmitterError};
use crate::link::address_table::{LinkAddress, MAX_RECEIVERS};
use crate::link::frame::MAX_RF_CHANNEL;
use crate::link::{DEFAULT_BAUD_RATE, DEFAULT_DEVICE_PATHS};
use crate::packet::layout::{ControlMode, CHANNEL_VALUE_MAX};

/// Longest receiver name the display can show.
pub const MAX_RECEIVER_NAME_LEN: usize = 15;

/// Main configuration structure
#[derive(Debug, Deserialize, Clone, Default)]
pub struct Config {
    #[serde(default)]
    pub link: LinkConfig,
    #[serde(default)]
    pub input: InputConfig,
    #[serde(default)]
    pub mixer: MixerConfig,
    #[serde(default)]
    pub trim: TrimConfig,
    #[serde(default)]
    pub scheduler: SchedulerConfig,
    #[serde(default)]
    pub calibration: CalibrationSet,
    #[serde(default)]
    pub settings: SettingsConfig,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub receivers: Vec<ReceiverConfig>,
}

/// Radio bridge configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LinkConfig {
    #[serde(default = "default_link_ports")]
    pub ports: Vec<String>,

    #[serde(default = "default_baud_rate")]
    pub baud_rate: u32,

    #[serde(default = "default_reply_timeout_ms")]
    pub reply_timeout_ms: u64,

    #[serde(default = "default_rf_channel")]
    pub rf_channel: u8,
}

/// Input device configuration
#[derive(Debug, Deserialize, Clone)]
pub struct InputConfig {
    /// Joystick event device; empty means auto-detect
    #[serde(default)]
    pub device_path: String,

    /// Motion sensor event device; empty means auto-detect
    #[serde(default)]
    pub motion_device_path: String,

    #[serde(default = "default_motion_enabled")]
    pub motion_enabled: bool,
}

/// Mixer configuration
#[derive(Debug, Deserialize, Clone)]
pub struct MixerConfig {
    #[serde(default = "default_deadband")]
    pub deadband: i16,

    /// Used until a saved value exists
    #[serde(default)]
    pub throttle_mode: ThrottleMode,

    /// Used until a saved value exists
    #[serde(default)]
    pub control_mode: ControlMode,
}

/// Trim configuration
#[derive(Debug, Deserialize, Clone)]
pub struct TrimConfig {
    #[serde(default = "default_trim_step")]
    pub step: i16,

    #[serde(default = "default_trim_max")]
    pub max: i16,

    #[serde(default = "default_trim_repeat_ms")]
    pub repeat_interval_ms: u64,
}

/// Loop timing configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SchedulerConfig {
    #[serde(default = "default_control_period_ms")]
    pub control_period_ms: u64,

    #[serde(default = "default_ui_period_ms")]
    pub ui_period_ms: u64,

    #[serde(default = "default_button_debounce_ms")]
    pub button_debounce_ms: u64,

    #[serde(default = "default_status_interval_ms")]
    pub status_interval_ms: u64,
}

/// Persistent settings configuration
#[derive(Debug, Deserialize, Clone)]
pub struct SettingsConfig {
    #[serde(default = "default_settings_path")]
    pub path: String,
}

/// Logging configuration
#[derive(Debug, Deserialize, Clone)]
pub struct LoggingConfig {
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Directory for daily log files; empty logs to stdout only
    #[serde(default)]
    pub dir: String,
}

/// Factory entry for one receiver slot
#[derive(Debug, Deserialize, Clone, PartialEq, Eq)]
pub struct ReceiverConfig {
    pub slot: usize,
    pub address: LinkAddress,
    pub name: String,
    #[serde(default = "default_receiver_active")]
    pub active: bool,
}

// Default value functions
fn default_link_ports() -> Vec<String> {
    DEFAULT_DEVICE_PATHS.iter().map(|p| p.to_string()).collect()
}
fn default_baud_rate() -> u32 { DEFAULT_BAUD_RATE }
fn default_reply_timeout_ms() -> u64 { 10 }
fn default_rf_channel() -> u8 { 108 }

fn default_motion_enabled() -> bool { true }

fn default_deadband() -> i16 { DEADBAND }

fn default_trim_step() -> i16 { TRIM_STEP }
fn default_trim_max() -> i16 { TRIM_MAX }
fn default_trim_repeat_ms() -> u64 { TRIM_REPEAT_INTERVAL.as_millis() as u64 }

fn default_control_period_ms() -> u64 { 20 }
fn default_ui_period_ms() -> u64 { 100 }
fn default_button_debounce_ms() -> u64 { 50 }
fn default_status_interval_ms() -> u64 { 5000 }

fn default_settings_path() -> String { "./rc-transmitter-settings.json".to_string() }

fn default_log_level() -> String { "info".to_string() }

fn default_receiver_active() -> bool { true }

impl Default for LinkConfig {
    fn default() -> Self {
        Self {
            ports: default_link_ports(),
            baud_rate: default_baud_rate(),
            reply_timeout_ms: default_reply_timeout_ms(),
            rf_channel: default_rf_channel(),
        }
    }
}

impl Default for InputConfig {
    fn default() -> Self {
        Self {
            device_path: String::new(),
            motion_device_path: String::new(),
            motion_enabled: default_motion_enabled(),
        }
    }
}

impl Default for MixerConfig {
    fn default() -> Self {
        Self {
            deadband: default_deadband(),
            throttle_mode: ThrottleMode::default(),
            control_mode: ControlMode::default(),
        }
    }
}

impl Default for TrimConfig {
    fn default() -> Self {
        Self {
            step: default_trim_step(),
            max: default_trim_max(),
            repeat_interval_ms: default_trim_repeat_ms(),
        }
    }
}

impl Default for SchedulerConfig {
    fn default() -> Self {
        Self {
            control_period_ms: default_control_period_ms(),
            ui_period_ms: default_ui_period_ms(),
            button_debounce_ms: default_button_debounce_ms(),
            status_interval_ms: default_status_interval_ms(),
        }
    }
}

impl Default for SettingsConfig {
    fn default() -> Self {
        Self {
            path: default_settings_path(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            dir: String::new(),
        }
    }
}

impl LinkConfig {
    /// Reply timeout as a `Duration`
    pub fn reply_timeout(&self) -> Duration {
        Duration::from_millis(self.reply_timeout_ms)
    }
}

impl InputConfig {
    /// Configured joystick path, `None` for auto-detect
    pub fn device(&self) -> Option<&str> {
        non_empty(&self.device_path)
    }

    /// Configured motion sensor path, `None` for auto-detect
    pub fn motion_device(&self) -> Option<&str> {
        non_empty(&self.motion_device_path)
    }
}

impl SchedulerConfig {
    pub fn control_period(&self) -> Duration {
        Duration::from_millis(self.control_period_ms)
    }

    pub fn ui_period(&self) -> Duration {
        Duration::from_millis(self.ui_period_ms)
    }

    pub fn button_debounce(&self) -> Duration {
        Duration::from_millis(self.button_debounce_ms)
    }

    pub fn status_interval(&self) -> Duration {
        Duration::from_millis(self.status_interval_ms)
    }
}

impl TrimConfig {
    pub fn repeat_interval(&self) -> Duration {
        Duration::from_millis(self.repeat_interval_ms)
    }
}

impl LoggingConfig {
    /// Log directory, `None` when file logging is off
    pub fn dir(&self) -> Option<&str> {
        non_empty(&self.dir)
    }
}

fn non_empty(value: &str) -> Option<&str> {
    if value.is_empty() {
        None
    } else {
        Some(value)
    }
}

fn invalid(message: impl Display) -> TransmitterError {
    TransmitterError::Config(toml::de::Error::custom(message))
}

impl Config {
    /// Load configuration from a TOML file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the configuration file
    ///
    /// # Returns
    ///
    /// * `Result<Config>` - Loaded and validated configuration
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
    /// use rc_transmitter::config::Config;
    ///
    /// let config = Config::load("config/default.toml")?;
    /// # Ok::<(), Box<dyn std::error::Error>>(())
    /// ```
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let contents = fs::read_to_string(path)?;
        Self::from_toml(&contents)
    }

    /// Parse and validate configuration from TOML text
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
        // Link
        if self.link.ports.is_empty() || self.link.ports.iter().any(|p| p.is_empty()) {
            return Err(invalid("link ports must list at least one non-empty path"));
        }

        if ![9600, 57600, 115_200, 230_400, 460_800, 921_600].contains(&self.link.baud_rate) {
            return Err(invalid(
                "baud_rate must be one of: 9600, 57600, 115200, 230400, 460800, 921600",
            ));
        }

        if self.link.reply_timeout_ms == 0 || self.link.reply_timeout_ms > 1000 {
            return Err(invalid("reply_timeout_ms must be between 1 and 1000"));
        }

        if self.link.rf_channel > MAX_RF_CHANNEL {
            return Err(invalid(format!(
                "rf_channel must be between 0 and {}",
                MAX_RF_CHANNEL
            )));
        }

        // Mixer
        if self.mixer.deadband < 0 || self.mixer.deadband > CHANNEL_VALUE_MAX / 2 {
            return Err(invalid(format!(
                "deadband must be between 0 and {}",
                CHANNEL_VALUE_MAX / 2
            )));
        }

        // Trim
        if self.trim.max <= 0 || self.trim.max > CHANNEL_VALUE_MAX {
            return Err(invalid(format!(
                "trim max must be between 1 and {}",
                CHANNEL_VALUE_MAX
            )));
        }

        if self.trim.step <= 0 || self.trim.step > self.trim.max {
            return Err(invalid("trim step must be between 1 and trim max"));
        }

        if self.trim.repeat_interval_ms > 5000 {
            return Err(invalid("trim repeat_interval_ms must be at most 5000"));
        }

        // Scheduler
        if self.scheduler.control_period_ms == 0 || self.scheduler.control_period_ms > 1000 {
            return Err(invalid("control_period_ms must be between 1 and 1000"));
        }

        if self.scheduler.ui_period_ms == 0 || self.scheduler.ui_period_ms > 5000 {
            return Err(invalid("ui_period_ms must be between 1 and 5000"));
        }

        if self.scheduler.button_debounce_ms > 1000 {
            return Err(invalid("button_debounce_ms must be at most 1000"));
        }

        if self.scheduler.status_interval_ms == 0 || self.scheduler.status_interval_ms > 600_000 {
            return Err(invalid("status_interval_ms must be between 1 and 600000"));
        }

        // Calibration
        for (name, axis) in self.calibration.axes() {
            if axis.min >= axis.max {
                return Err(invalid(format!("calibration {} min must be less than max", name)));
            }
            if axis.center < axis.min || axis.center > axis.max {
                return Err(invalid(format!(
                    "calibration {} center must be within min..max",
                    name
                )));
            }
        }

        // Settings and logging
        if self.settings.path.is_empty() {
            return Err(invalid("settings path cannot be empty"));
        }

        if !["trace", "debug", "info", "warn", "error"].contains(&self.logging.level.as_str()) {
            return Err(invalid(
                "log level must be one of: trace, debug, info, warn, error",
            ));
        }

        // Receivers
        let mut seen = [false; MAX_RECEIVERS];
        for receiver in &self.receivers {
            if receiver.slot >= MAX_RECEIVERS {
                return Err(invalid(format!(
                    "receiver slot {} is out of bounds (must be 0-{})",
                    receiver.slot,
                    MAX_RECEIVERS - 1
                )));
            }
            if seen[receiver.slot] {
                return Err(invalid(format!(
                    "receiver slot {} is configured twice",
                    receiver.slot
                )));
            }
            seen[receiver.slot] = true;

            if receiver.name.is_empty() || receiver.name.chars().count() > MAX_RECEIVER_NAME_LEN {
                return Err(invalid(format!(
                    "receiver {} name must be 1-{} characters",
                    receiver.slot, MAX_RECEIVER_NAME_LEN
                )));
            }
        }

        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::controller::calibration::AxisCalibration;

    fn assert_invalid(config: &Config, fragment: &str) {
        match config.validate() {
            Err(TransmitterError::Config(e)) => {
                assert!(
                    e.to_string().contains(fragment),
                    "error {:?} should mention {:?}",
                    e.to_string(),
                    fragment
                );
            }
            other => panic!("Expected Config error, got: {:?}", other),
        }
    }

    #[test]
    fn test_default_config() {
        let config = Config::default();
        assert!(config.validate().is_ok());
        assert_eq!(config.scheduler.control_period(), Duration::from_millis(20));
        assert_eq!(config.scheduler.ui_period(), Duration::from_millis(100));
        assert_eq!(config.trim.repeat_interval(), Duration::from_millis(200));
        assert_eq!(config.link.rf_channel, 108);
        assert_eq!(config.mixer.deadband, 50);
        assert!(config.receivers.is_empty());
    }

    #[test]
    fn test_empty_toml_uses_defaults() {
        let config = Config::from_toml("").unwrap();
        assert_eq!(config.link.ports, default_link_ports());
        assert_eq!(config.calibration, CalibrationSet::default());
        assert_eq!(config.input.device(), None);
        assert_eq!(config.logging.dir(), None);
    }

    #[test]
    fn test_load_config_from_file() {
        use std::io::Write;
        use tempfile::NamedTempFile;

        let toml_content = r#"
[link]
ports = ["/dev/ttyUSB1"]
rf_channel = 90

[input]
device_path = "/dev/input/event7"

[mixer]
throttle_mode = "bidirectional"
control_mode = "gyro_assist"

[calibration.pitch]
min = 120
max = 3980
center = 2010

[[receivers]]
slot = 1
address = "E7E7E7E7E1"
name = "Boat"
"#;

        let mut temp_file = NamedTempFile::new().unwrap();
        temp_file.write_all(toml_content.as_bytes()).unwrap();
        temp_file.flush().unwrap();

        let config = Config::load(temp_file.path()).unwrap();
        assert_eq!(config.link.ports, vec!["/dev/ttyUSB1".to_string()]);
        assert_eq!(config.link.rf_channel, 90);
        assert_eq!(config.input.device(), Some("/dev/input/event7"));
        assert_eq!(config.mixer.throttle_mode, ThrottleMode::Bidirectional);
        assert_eq!(config.mixer.control_mode, ControlMode::GyroAssist);
        assert_eq!(config.calibration.pitch, AxisCalibration::new(120, 3980, 2010));
        assert_eq!(config.calibration.roll, AxisCalibration::default());
        assert_eq!(config.receivers.len(), 1);
        assert_eq!(config.receivers[0].name, "Boat");
        assert!(config.receivers[0].active);
    }

    #[test]
    fn test_load_missing_file() {
        let result = Config::load("/nonexistent/rc-transmitter.toml");
        assert!(matches!(result, Err(TransmitterError::Io(_))));
    }

    #[test]
    fn test_malformed_toml() {
        let result = Config::from_toml("[link\nports = 3");
        assert!(matches!(result, Err(TransmitterError::Config(_))));
    }

    #[test]
    fn test_bad_receiver_address() {
        let result = Config::from_toml(
            r#"
[[receivers]]
slot = 0
address = "XYZ"
name = "Bad"
"#,
        );
        assert!(matches!(result, Err(TransmitterError::Config(_))));
    }

    #[test]
    fn test_invalid_link_values() {
        let mut config = Config::default();
        config.link.ports.clear();
        assert_invalid(&config, "ports");

        let mut config = Config::default();
        config.link.baud_rate = 420_000;
        assert_invalid(&config, "baud_rate");

        let mut config = Config::default();
        config.link.reply_timeout_ms = 0;
        assert_invalid(&config, "reply_timeout_ms");

        let mut config = Config::default();
        config.link.rf_channel = 126;
        assert_invalid(&config, "rf_channel");
    }

    #[test]
    fn test_invalid_mixer_and_trim() {
        let mut config = Config::default();
        config.mixer.deadband = -1;
        assert_invalid(&config, "deadband");

        let mut config = Config::default();
        config.trim.max = 0;
        assert_invalid(&config, "trim max");

        let mut config = Config::default();
        config.trim.step = 101;
        assert_invalid(&config, "trim step");

        let mut config = Config::default();
        config.trim.step = 0;
        assert_invalid(&config, "trim step");
    }

    #[test]
    fn test_invalid_scheduler() {
        let mut config = Config::default();
        config.scheduler.control_period_ms = 0;
        assert_invalid(&config, "control_period_ms");

        let mut config = Config::default();
        config.scheduler.ui_period_ms = 10_000;
        assert_invalid(&config, "ui_period_ms");

        let mut config = Config::default();
        config.scheduler.status_interval_ms = 0;
        assert_invalid(&config, "status_interval_ms");
    }

    #[test]
    fn test_invalid_calibration() {
        let mut config = Config::default();
        config.calibration.yaw = AxisCalibration::new(2000, 2000, 2000);
        assert_invalid(&config, "calibration yaw");

        let mut config = Config::default();
        config.calibration.aux2 = AxisCalibration::new(0, 4095, 5000);
        assert_invalid(&config, "calibration aux2 center");
    }

    #[test]
    fn test_invalid_receivers() {
        let receiver = |slot: usize, name: &str| ReceiverConfig {
            slot,
            address: LinkAddress::new([1, 2, 3, 4, 5]),
            name: name.to_string(),
            active: true,
        };

        let mut config = Config::default();
        config.receivers = vec![receiver(MAX_RECEIVERS, "Far")];
        assert_invalid(&config, "out of bounds");

        let mut config = Config::default();
        config.receivers = vec![receiver(2, "A"), receiver(2, "B")];
        assert_invalid(&config, "twice");

        let mut config = Config::default();
        config.receivers = vec![receiver(0, "")];
        assert_invalid(&config, "name");

        let mut config = Config::default();
        config.receivers = vec![receiver(0, "A name far too long")];
        assert_invalid(&config, "name");
    }

    #[test]
    fn test_invalid_logging_and_settings() {
        let mut config = Config::default();
        config.logging.level = "verbose".to_string();
        assert_invalid(&config, "log level");

        let mut config = Config::default();
        config.settings.path.clear();
        assert_invalid(&config, "settings path");
    }

    #[test]
    fn test_shipped_default_config_is_valid() {
        let config = Config::from_toml(include_str!("../config/default.toml")).unwrap();
        assert_eq!(config.scheduler.control_period_ms, 20);
        assert_eq!(config.trim.max, 100);
    }
}
