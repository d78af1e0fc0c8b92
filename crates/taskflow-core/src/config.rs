//! Configuration loading and management
//!
//! Configuration is read from `$XDG_CONFIG_HOME/taskflow/config.toml`. A
//! missing file means defaults. Data lives in `$XDG_DATA_HOME/taskflow/` and
//! logs in `$XDG_STATE_HOME/taskflow/`.

use std::path::{Path, PathBuf};

use serde::Deserialize;

use crate::error::{Error, Result};

const APP_DIR: &str = "taskflow";

/// Durations driving the pomodoro rotation, in seconds.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct TimerSettings {
    pub work_seconds: u64,
    pub short_break_seconds: u64,
    pub long_break_seconds: u64,
    /// Every n-th completed pomodoro is followed by a long break.
    pub long_break_every: u32,
}

impl TimerSettings {
    pub fn from_minutes(work: u64, short_break: u64, long_break: u64) -> Self {
        Self {
            work_seconds: work.saturating_mul(60),
            short_break_seconds: short_break.saturating_mul(60),
            long_break_seconds: long_break.saturating_mul(60),
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<()> {
        if self.work_seconds == 0 || self.short_break_seconds == 0 || self.long_break_seconds == 0
        {
            return Err(Error::Validation(
                "timer durations must be at least one second".into(),
            ));
        }
        if self.long_break_every == 0 {
            return Err(Error::Validation(
                "long break rotation must be at least one pomodoro".into(),
            ));
        }
        Ok(())
    }
}

impl Default for TimerSettings {
    fn default() -> Self {
        Self {
            work_seconds: 25 * 60,
            short_break_seconds: 5 * 60,
            long_break_seconds: 15 * 60,
            long_break_every: 4,
        }
    }
}

/// Main configuration struct
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct Config {
    /// User whose tasks and logs are shown when none is given
    #[serde(default = "default_user")]
    pub user: String,

    #[serde(default)]
    pub timer: TimerConfig,

    #[serde(default)]
    pub notifications: NotificationConfig,

    #[serde(default)]
    pub logging: LoggingConfig,
}

impl Default for Config {
    fn default() -> Self {
        Self {
            user: default_user(),
            timer: TimerConfig::default(),
            notifications: NotificationConfig::default(),
            logging: LoggingConfig::default(),
        }
    }
}

/// `[timer]` section, in minutes
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct TimerConfig {
    pub work_minutes: u64,
    pub short_break_minutes: u64,
    pub long_break_minutes: u64,
    pub long_break_every: u32,
}

impl Default for TimerConfig {
    fn default() -> Self {
        Self {
            work_minutes: 25,
            short_break_minutes: 5,
            long_break_minutes: 15,
            long_break_every: 4,
        }
    }
}

#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
#[serde(default)]
pub struct NotificationConfig {
    /// Show a desktop notification whenever the timer changes mode
    pub desktop: bool,
}

impl Default for NotificationConfig {
    fn default() -> Self {
        Self { desktop: true }
    }
}

/// Logging configuration
#[derive(Clone, Debug, Deserialize, PartialEq, Eq)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
        }
    }
}

fn default_user() -> String {
    "default".to_string()
}

fn default_log_level() -> String {
    "info".to_string()
}

impl Config {
    /// Loads the configuration file, falling back to defaults when absent.
    pub fn load() -> Result<Self> {
        Self::load_from(&Self::config_path())
    }

    pub fn load_from(path: &Path) -> Result<Self> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path)?;
        Self::parse(&raw)
    }

    pub fn parse(raw: &str) -> Result<Self> {
        let config: Self =
            toml::from_str(raw).map_err(|e| Error::Config(format!("invalid config.toml: {e}")))?;
        config.timer_settings().validate()?;
        Ok(config)
    }

    pub fn timer_settings(&self) -> TimerSettings {
        TimerSettings {
            long_break_every: self.timer.long_break_every,
            ..TimerSettings::from_minutes(
                self.timer.work_minutes,
                self.timer.short_break_minutes,
                self.timer.long_break_minutes,
            )
        }
    }

    pub fn config_path() -> PathBuf {
        xdg_config_home().join(APP_DIR).join("config.toml")
    }

    /// JSON file holding every task and time log
    pub fn data_path() -> PathBuf {
        xdg_data_home().join(APP_DIR).join("state.json")
    }

    pub fn state_dir() -> PathBuf {
        xdg_state_home().join(APP_DIR)
    }
}

/// Returns a best-effort home directory path.
fn home_dir() -> PathBuf {
    std::env::var_os("HOME")
        .map(PathBuf::from)
        .or_else(dirs::home_dir)
        .unwrap_or_else(|| PathBuf::from("."))
}

fn xdg_config_home() -> PathBuf {
    std::env::var_os("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".config"))
}

fn xdg_data_home() -> PathBuf {
    std::env::var_os("XDG_DATA_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local/share"))
}

fn xdg_state_home() -> PathBuf {
    std::env::var_os("XDG_STATE_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|| home_dir().join(".local/state"))
}
