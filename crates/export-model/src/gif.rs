//! GIF-specific export parameters.

use serde::{Deserialize, Serialize};

/// Parameters used only when exporting to GIF.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase", default)]
pub struct GifSettings {
    /// Output frame rate.
    pub fps: u32,

    /// Palette quality 0..=100; higher keeps more colors.
    pub quality: u32,

    /// Output width in pixels; height follows the aspect ratio.
    pub width: u32,

    /// Use Floyd-Steinberg error diffusion when mapping to the palette.
    pub dither: bool,

    /// Enable inter-frame transparency optimization.
    pub optimize: bool,

    /// Clip start in seconds.
    pub start_time: Option<f64>,

    /// Clip end in seconds.
    pub end_time: Option<f64>,

    /// Loop forever instead of playing once.
    #[serde(rename = "loop")]
    pub looping: bool,
}

impl Default for GifSettings {
    fn default() -> Self {
        Self {
            fps: 10,
            quality: 80,
            width: 480,
            dither: true,
            optimize: true,
            start_time: None,
            end_time: None,
            looping: true,
        }
    }
}

impl GifSettings {
    /// Clip bounds as `(start, end)`, either side optional.
    pub fn trim_range(&self) -> (Option<f64>, Option<f64>) {
        (self.start_time, self.end_time)
    }
}
