//! Application configuration.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;

/// Global application configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct AppConfig {
    /// Media engine settings.
    pub engine: EngineConfig,

    /// Encoder defaults not exposed through processing options.
    pub encoder: EncoderDefaults,

    /// Fixed parameters of the enhancement filters.
    pub tuning: FilterTuning,

    /// Logging configuration.
    pub logging: LoggingConfig,
}

/// How the sandboxed media engine is located and released.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    /// Engine binary name or path.
    pub binary: String,

    /// Parent directory for the engine's private scratch space.
    /// `None` uses the system temp directory.
    pub scratch_root: Option<PathBuf>,

    /// What happens to the engine when a job is disposed.
    pub release_policy: ReleasePolicy,
}

/// Engine lifetime relative to jobs.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ReleasePolicy {
    /// Tear the engine down after every job.
    #[default]
    Terminate,
    /// Keep the engine loaded for the next job; only job files are removed.
    KeepLoaded,
}

/// Encoder parameters applied to every video export.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EncoderDefaults {
    /// x264/x265 speed preset.
    pub preset: String,

    /// Pixel format forced for x264/x265 output.
    pub pixel_format: String,
}

/// Parameters of the enhancement filters.
///
/// The defaults reproduce the shipped export output; changing them changes
/// encoded results.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct FilterTuning {
    pub stabilize: StabilizeTuning,
    pub denoise: DenoiseTuning,
    pub color: ColorTuning,
}

/// `deshake` search window.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StabilizeTuning {
    /// Horizontal search radius in pixels.
    pub rx: u32,
    /// Vertical search radius in pixels.
    pub ry: u32,
    /// Motion search block size in pixels.
    pub blocksize: u32,
}

/// `nlmeans` parameters.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DenoiseTuning {
    /// Denoising strength.
    pub strength: f64,
    /// Patch size (odd).
    pub patch: u32,
    /// Research window size (odd).
    pub research: u32,
}

/// `eq` color correction triple.
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct ColorTuning {
    pub contrast: f64,
    pub brightness: f64,
    pub saturation: f64,
}

/// Logging configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct LoggingConfig {
    /// Log level filter (e.g., "info", "debug", "recast=debug,warn").
    pub level: String,

    /// Whether to output structured JSON logs.
    pub json: bool,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            binary: "ffmpeg".to_string(),
            scratch_root: None,
            release_policy: ReleasePolicy::default(),
        }
    }
}

impl Default for EncoderDefaults {
    fn default() -> Self {
        Self {
            preset: "medium".to_string(),
            pixel_format: "yuv420p".to_string(),
        }
    }
}

impl Default for StabilizeTuning {
    fn default() -> Self {
        Self {
            rx: 16,
            ry: 16,
            blocksize: 8,
        }
    }
}

impl Default for DenoiseTuning {
    fn default() -> Self {
        Self {
            strength: 3.0,
            patch: 7,
            research: 15,
        }
    }
}

impl Default for ColorTuning {
    fn default() -> Self {
        Self {
            contrast: 1.1,
            brightness: 0.05,
            saturation: 1.2,
        }
    }
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: "info".to_string(),
            json: false,
        }
    }
}

impl AppConfig {
    /// Load config from the standard location, falling back to defaults.
    pub fn load() -> Self {
        Self::load_from(&config_file_path())
    }

    /// Load config from an explicit path, falling back to defaults.
    pub fn load_from(config_path: &std::path::Path) -> Self {
        if config_path.exists() {
            match std::fs::read_to_string(config_path) {
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
pub fn config_file_path() -> PathBuf {
    let base = std::env::var("XDG_CONFIG_HOME")
        .map(PathBuf::from)
        .unwrap_or_else(|_| {
            let home = std::env::var("HOME").unwrap_or_else(|_| "/tmp".to_string());
            PathBuf::from(home).join(".config")
        });
    base.join("recast").join("config.json")
}
