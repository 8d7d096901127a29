//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct AppConfig {
    /// Composition and export settings.
    #[serde(default)]
    pub composer: ComposerConfig,

    /// Logging configuration.
    #[serde(default)]
    pub logging: LoggingConfig,
}

/// Settings for the timeline composer and its media collaborators.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ComposerConfig {
    /// `ffmpeg` binary used for export.
    pub ffmpeg_path: PathBuf,

    /// `ffprobe` binary used for source inspection.
    pub ffprobe_path: PathBuf,

    /// Smallest render width/height the frame planner will produce.
    pub min_render_dimension: u32,

    /// Largest frame edge the encoder can produce. Fixed-resolution presets
    /// above this are rejected and the export falls back to a broader preset.
    pub max_encoder_dimension: u32,

    /// Output frame rate for rendered exports.
    pub fps: u32,

    /// Video codec passed to the encoder (e.g. `libx264`).
    pub video_codec: String,

    /// Audio bitrate in kbps.
    pub audio_bitrate_kbps: u32,

    /// Quality used when a caller does not request one (`standard`, `high`, `ultra`).
    pub default_quality: String,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "reelsmith_composer=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,

    /// Optional log file path.
    pub file: Option<PathBuf>,
}

impl Default for ComposerConfig {
    fn default() -> Self {
        Self {
            ffmpeg_path: PathBuf::from("ffmpeg"),
            ffprobe_path: PathBuf::from("ffprobe"),
            min_render_dimension: 240,
            max_encoder_dimension: 4096,
            fps: 30,
            video_codec: "libx264".to_string(),
            audio_bitrate_kbps: 192,
            default_quality: "high".to_string(),
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
            file: None,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        let config_path = config_file_path();
        if config_path.exists() {
            match std::fs::read_to_string(&config_path) {
                Ok(content) => match serde_json::from_str(&content) {
                    Ok(config) => return config,
                    Err(e) => {
                        tracing::warn!("Failed to parse config at {:?}: {}", config_path, e);
                    }
                },
                Err(e) => {
                    tracing::warn!("Failed to read config at {:?}: {}", config_path, e);
                }
            }
        }
        Self::default()
    }

    /// Save config to the standard location.
    pub fn save(&self) -> Result<(), std::io::Error> {
        let config_path = config_file_path();
        if let Some(parent) = config_path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        let json = serde_json::to_string_pretty(self).map_err(std::io::Error::other)?;
        std::fs::write(config_path, json)
    }
}

/// Standard config file location.
fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("reelsmith").join("config.json")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_partial_config_fills_defaults() {
        let raw = r#"{ "composer": { "fps": 60 } }"#;
        let parsed: AppConfig = serde_json::from_str(raw).unwrap();
        assert_eq!(parsed.composer.fps, 60);
        assert_eq!(parsed.composer.min_render_dimension, 240);
        assert_eq!(parsed.composer.ffmpeg_path, PathBuf::from("ffmpeg"));
        assert_eq!(parsed.logging.level, "info");
    }

    #[test]
    fn test_config_serialization_roundtrip_keeps_binaries() {
        let mut config = AppConfig::default();
        config.composer.ffprobe_path = PathBuf::from("/opt/ffmpeg/bin/ffprobe");
        let json = serde_json::to_string(&config).unwrap();
        let parsed: AppConfig = serde_json::from_str(&json).unwrap();
        assert_eq!(
            parsed.composer.ffprobe_path,
            PathBuf::from("/opt/ffmpeg/bin/ffprobe")
        );
    }
}
