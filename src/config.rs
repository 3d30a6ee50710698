//! Emulator configuration.
//!
//! Configuration is plain JSON. Every field is optional and falls back to
//! its default, so an empty object is a valid config:
//!
//! ```json
//! {
//!   "capacity": 10240,
//!   "max_ticks": 1000000,
//!   "video_sink": "stdout"
//! }
//! ```
//!
//! Command-line flags override whatever the file sets.

use std::io::{self, Write};
use std::path::Path;

use serde::{Deserialize, Serialize};
use thiserror::Error;

use crate::cpu::control::DEFAULT_CAPACITY;
use crate::cpu::translator::VIDEO_BYTES;
use crate::word::WORD_BYTES;

/// Where display-flush output goes.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoSink {
    #[default]
    Stdout,
    /// Render but throw the output away.
    Discard,
}

impl VideoSink {
    pub fn writer(self) -> Box<dyn Write> {
        match self {
            VideoSink::Stdout => Box::new(io::stdout()),
            VideoSink::Discard => Box::new(io::sink()),
        }
    }
}

/// Emulator settings.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct EmulatorConfig {
    /// Total address space in bytes, video buffer included.
    pub capacity: u32,

    /// Stop a run that has not halted after this many ticks.
    pub max_ticks: Option<u64>,

    pub video_sink: VideoSink,
}

impl Default for EmulatorConfig {
    fn default() -> Self {
        Self {
            capacity: DEFAULT_CAPACITY,
            max_ticks: None,
            video_sink: VideoSink::Stdout,
        }
    }
}

impl EmulatorConfig {
    /// Load and validate a JSON config file.
    pub fn from_file<P: AsRef<Path>>(path: P) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let text = std::fs::read_to_string(path).map_err(|e| ConfigError::Io {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        let config = Self::from_json(&text)?;
        log::debug!("loaded configuration from {}: {:?}", path.display(), config);
        Ok(config)
    }

    /// Parse and validate a JSON config.
    pub fn from_json(text: &str) -> Result<Self, ConfigError> {
        let config: Self = serde_json::from_str(text)?;
        config.validate()?;
        Ok(config)
    }

    /// The address space must hold the video buffer plus at least one word.
    pub fn validate(&self) -> Result<(), ConfigError> {
        let minimum = VIDEO_BYTES + WORD_BYTES;
        if self.capacity < minimum {
            return Err(ConfigError::CapacityTooSmall {
                capacity: self.capacity,
                minimum,
            });
        }
        Ok(())
    }
}

/// Errors that can occur while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("cannot read {path}: {message}")]
    Io { path: String, message: String },

    #[error("invalid config: {0}")]
    Parse(#[from] serde_json::Error),

    #[error("capacity {capacity} is below the minimum of {minimum} bytes")]
    CapacityTooSmall { capacity: u32, minimum: u32 },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_empty_object_is_default() {
        assert_eq!(EmulatorConfig::from_json("{}").unwrap(), EmulatorConfig::default());
    }

    #[test]
    fn test_partial_config() {
        let config = EmulatorConfig::from_json(r#"{"max_ticks": 500, "video_sink": "discard"}"#)
            .unwrap();
        assert_eq!(config.capacity, 10240);
        assert_eq!(config.max_ticks, Some(500));
        assert_eq!(config.video_sink, VideoSink::Discard);
    }

    #[test]
    fn test_capacity_too_small() {
        assert!(matches!(
            EmulatorConfig::from_json(r#"{"capacity": 4096}"#),
            Err(ConfigError::CapacityTooSmall { capacity: 4096, .. })
        ));
        assert!(EmulatorConfig::from_json(r#"{"capacity": 4100}"#).is_ok());
    }

    #[test]
    fn test_unknown_sink_is_rejected() {
        assert!(matches!(
            EmulatorConfig::from_json(r#"{"video_sink": "screen"}"#),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_missing_file() {
        assert!(matches!(
            EmulatorConfig::from_file("/nonexistent/tickcpu.json"),
            Err(ConfigError::Io { .. })
        ));
    }
}
