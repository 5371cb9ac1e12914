//! Watermark overlay descriptor.

use std::fmt;

use serde::{Deserialize, Serialize};

/// Image overlay composited onto every output frame.
#[derive(Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Watermark {
    /// Encoded image bytes (PNG with transparency recommended).
    pub image: Vec<u8>,

    /// MIME type of `image`, e.g. `image/png`.
    pub mime_type: String,

    /// Anchor the offset is measured from.
    #[serde(default)]
    pub position: WatermarkAnchor,

    /// Overlay opacity [0.0, 1.0].
    pub opacity: f64,

    /// Scale factor applied to the image's native size.
    pub scale: f64,

    /// Offset from the anchor in output pixels.
    #[serde(default)]
    pub offset: PixelOffset,
}

/// Placement anchor for the watermark.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "kebab-case")]
pub enum WatermarkAnchor {
    TopLeft,
    TopRight,
    BottomLeft,
    #[default]
    BottomRight,
    Center,
}

/// Pixel offset relative to an anchor.
///
/// For corner anchors positive values move the overlay inward, away from
/// both edges. For [`WatermarkAnchor::Center`] they are added to the
/// centered position.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub struct PixelOffset {
    pub x: i32,
    pub y: i32,
}

impl Watermark {
    /// Create a watermark with the editor's default placement.
    pub fn new(image: Vec<u8>, mime_type: impl Into<String>) -> Self {
        Self {
            image,
            mime_type: mime_type.into(),
            position: WatermarkAnchor::default(),
            opacity: 0.8,
            scale: 1.0,
            offset: PixelOffset { x: 20, y: 20 },
        }
    }

    pub fn with_position(mut self, position: WatermarkAnchor) -> Self {
        self.position = position;
        self
    }

    pub fn with_offset(mut self, x: i32, y: i32) -> Self {
        self.offset = PixelOffset { x, y };
        self
    }

    pub fn with_opacity(mut self, opacity: f64) -> Self {
        self.opacity = opacity;
        self
    }

    pub fn with_scale(mut self, scale: f64) -> Self {
        self.scale = scale;
        self
    }

    /// Extension used when staging the image into the engine.
    pub fn file_extension(&self) -> &'static str {
        match self.mime_type.to_ascii_lowercase().as_str() {
            "image/png" => "png",
            "image/jpeg" | "image/jpg" => "jpg",
            "image/webp" => "webp",
            "image/gif" => "gif",
            "image/bmp" => "bmp",
            _ => "img",
        }
    }
}

impl fmt::Debug for Watermark {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("Watermark")
            .field("image_bytes", &self.image.len())
            .field("mime_type", &self.mime_type)
            .field("position", &self.position)
            .field("opacity", &self.opacity)
            .field("scale", &self.scale)
            .field("offset", &self.offset)
            .finish()
    }
}

impl WatermarkAnchor {
    pub fn as_str(self) -> &'static str {
        match self {
            WatermarkAnchor::TopLeft => "top-left",
            WatermarkAnchor::TopRight => "top-right",
            WatermarkAnchor::BottomLeft => "bottom-left",
            WatermarkAnchor::BottomRight => "bottom-right",
            WatermarkAnchor::Center => "center",
        }
    }
}

impl std::str::FromStr for WatermarkAnchor {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "top-left" => Ok(WatermarkAnchor::TopLeft),
            "top-right" => Ok(WatermarkAnchor::TopRight),
            "bottom-left" => Ok(WatermarkAnchor::BottomLeft),
            "bottom-right" => Ok(WatermarkAnchor::BottomRight),
            "center" => Ok(WatermarkAnchor::Center),
            other => Err(format!(
                "unknown watermark position: {other} (use top-left, top-right, bottom-left, bottom-right, center)"
            )),
        }
    }
}
