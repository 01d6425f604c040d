//! Session settings and TOML-based application configuration.
//!
//! Stores user preferences including:
//! - Round count, round length, rest length (quarter-minute steps)
//! - Difficulty tier and playback options (southpaw, ordered, calisthenics)
//! - Voice selection and speed
//!
//! Configuration is stored at `~/.config/shotcaller/config.toml`.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

use crate::error::ConfigError;

/// Difficulty tier. Drives the callout cadence profile, not the clock.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Difficulty {
    Easy,
    Medium,
    Hard,
}

impl Default for Difficulty {
    fn default() -> Self {
        Difficulty::Medium
    }
}

impl std::fmt::Display for Difficulty {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Difficulty::Easy => write!(f, "easy"),
            Difficulty::Medium => write!(f, "medium"),
            Difficulty::Hard => write!(f, "hard"),
        }
    }
}

impl std::str::FromStr for Difficulty {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "easy" => Ok(Difficulty::Easy),
            "medium" => Ok(Difficulty::Medium),
            "hard" => Ok(Difficulty::Hard),
            other => Err(ConfigError::InvalidValue {
                key: "difficulty".into(),
                message: format!("unknown tier '{other}'"),
            }),
        }
    }
}

/// User-configured settings for one session.
///
/// Minute values are clamped and snapped to 0.25 steps by the setters;
/// deserialized values are normalized via `normalize()`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct SessionSettings {
    #[serde(default = "default_rounds")]
    pub rounds_count: u32,
    #[serde(default = "default_round_min")]
    pub round_min: f64,
    #[serde(default = "default_rest_minutes")]
    pub rest_minutes: f64,
    #[serde(default)]
    pub difficulty: Difficulty,
    #[serde(default)]
    pub southpaw_mode: bool,
    #[serde(default)]
    pub read_in_order: bool,
    #[serde(default)]
    pub add_calisthenics: bool,
    /// Selected technique category keys; empty means the default category.
    #[serde(default)]
    pub categories: Vec<String>,
    /// Backend voice identifier; `None` uses the backend default.
    #[serde(default)]
    pub voice: Option<String>,
    #[serde(default = "default_voice_speed")]
    pub voice_speed: f64,
}

fn default_rounds() -> u32 {
    5
}
fn default_round_min() -> f64 {
    3.0
}
fn default_rest_minutes() -> f64 {
    1.0
}
fn default_voice_speed() -> f64 {
    1.0
}

impl Default for SessionSettings {
    fn default() -> Self {
        Self {
            rounds_count: default_rounds(),
            round_min: default_round_min(),
            rest_minutes: default_rest_minutes(),
            difficulty: Difficulty::default(),
            southpaw_mode: false,
            read_in_order: false,
            add_calisthenics: false,
            categories: Vec::new(),
            voice: None,
            voice_speed: default_voice_speed(),
        }
    }
}

/// Snap a minute value to the nearest 0.25 step within `[lo, hi]`.
fn snap_quarter(value: f64, lo: f64, hi: f64) -> f64 {
    let clamped = value.clamp(lo, hi);
    (clamped / 0.25).round() * 0.25
}

impl SessionSettings {
    /// Clamp all fields into their valid ranges.
    pub fn normalize(&mut self) {
        self.rounds_count = self.rounds_count.clamp(1, 20);
        self.round_min = snap_quarter(self.round_min, 0.25, 30.0);
        self.rest_minutes = snap_quarter(self.rest_minutes, 0.25, 10.0);
        self.voice_speed = self.voice_speed.clamp(0.8, 2.5);
    }

    pub fn set_round_min(&mut self, minutes: f64) {
        self.round_min = snap_quarter(minutes, 0.25, 30.0);
    }

    pub fn set_rest_minutes(&mut self, minutes: f64) {
        self.rest_minutes = snap_quarter(minutes, 0.25, 10.0);
    }

    /// Round length in whole seconds, at least one.
    pub fn round_secs(&self) -> u32 {
        ((self.round_min * 60.0).round() as u32).max(1)
    }

    /// Rest length in whole seconds, at least one.
    pub fn rest_secs(&self) -> u32 {
        ((self.rest_minutes * 60.0).round() as u32).max(1)
    }
}

/// Application configuration.
///
/// Serialized to/from TOML at `~/.config/shotcaller/config.toml`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub session: SessionSettings,
    /// Speech server URL for the HTTP backend (optional).
    #[serde(default)]
    pub speech_server: Option<String>,
    /// Synthesizer command for the process backend (optional).
    #[serde(default)]
    pub speech_command: Option<String>,
}

/// Returns `~/.config/shotcaller[-dev]/` based on SHOTCALLER_ENV.
///
/// Set SHOTCALLER_ENV=dev to use the development data directory.
///
/// # Errors
/// Returns an error if creating the config directory fails.
pub fn data_dir() -> Result<PathBuf, std::io::Error> {
    let base_dir = dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".config");

    let env = std::env::var("SHOTCALLER_ENV").unwrap_or_else(|_| "production".to_string());

    let dir = if env == "dev" {
        base_dir.join("shotcaller-dev")
    } else {
        base_dir.join("shotcaller")
    };

    std::fs::create_dir_all(&dir)?;
    Ok(dir)
}

impl Config {
    /// Load configuration from the given path, falling back to defaults
    /// when the file does not exist.
    pub fn load_from(path: &std::path::Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Ok(Self::default());
        }
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        let mut config: Config = toml::from_str(&raw).map_err(|e| ConfigError::LoadFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        config.session.normalize();
        Ok(config)
    }

    /// Save configuration to the given path.
    pub fn save_to(&self, path: &std::path::Path) -> Result<(), ConfigError> {
        let raw = toml::to_string_pretty(self).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })?;
        std::fs::write(path, raw).map_err(|e| ConfigError::SaveFailed {
            path: path.to_path_buf(),
            message: e.to_string(),
        })
    }

    /// Load from the default location.
    pub fn load() -> Result<Self, crate::error::CoreError> {
        let path = data_dir()?.join("config.toml");
        Ok(Self::load_from(&path)?)
    }

    /// Save to the default location.
    pub fn save(&self) -> Result<(), crate::error::CoreError> {
        let path = data_dir()?.join("config.toml");
        Ok(self.save_to(&path)?)
    }
}
