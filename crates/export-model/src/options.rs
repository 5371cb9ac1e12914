//! Processing options for a single export.

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::gif::GifSettings;
use crate::watermark::Watermark;

/// Everything the export core needs to know about the desired output.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ProcessingOptions {
    /// Output container.
    pub format: ExportFormat,

    /// Video codec. Ignored for GIF output.
    pub codec: VideoCodec,

    /// Output frame size in pixels.
    pub resolution: Resolution,

    /// Output frame rate. Intended values are 24, 30 and 60.
    pub fps: u32,

    /// Target bitrates in kbps.
    pub bitrate: Bitrate,

    /// User-facing quality slider, 0 (worst) to 100 (best).
    pub quality: u32,

    pub audio_codec: AudioCodec,

    pub audio_channels: AudioChannels,

    /// Trim start in seconds.
    #[serde(default)]
    pub start_time: Option<f64>,

    /// Trim end in seconds.
    #[serde(default)]
    pub end_time: Option<f64>,

    /// Apply motion stabilization.
    #[serde(default)]
    pub stabilize: bool,

    /// Apply spatial denoising.
    #[serde(default)]
    pub denoise: bool,

    /// Apply contrast/brightness/saturation boost.
    #[serde(default)]
    pub enhance_colors: bool,

    /// Ask for hardware-accelerated decoding. Advisory only.
    #[serde(default)]
    pub use_gpu: bool,

    /// Optional image overlay.
    #[serde(default)]
    pub watermark: Option<Watermark>,

    /// GIF-only parameters.
    #[serde(default)]
    pub gif_settings: Option<GifSettings>,
}

/// Output container format.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ExportFormat {
    Mp4,
    Webm,
    Mov,
    Gif,
}

/// Video codec selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum VideoCodec {
    H264,
    H265,
    Vp9,
}

/// Audio codec selection.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AudioCodec {
    Aac,
    Mp3,
    Opus,
}

/// Audio channel layout. Serializes as the channel count.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(try_from = "u8", into = "u8")]
pub enum AudioChannels {
    Mono,
    Stereo,
}

/// Output frame size.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Resolution {
    pub width: u32,
    pub height: u32,
}

/// Target bitrates in kbps.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Bitrate {
    pub video: u32,
    pub audio: u32,
}

/// Frame rates the editor offers.
pub const STANDARD_FRAME_RATES: [u32; 3] = [24, 30, 60];

impl ExportFormat {
    /// MIME type of the finished artifact.
    pub fn mime_type(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "video/mp4",
            ExportFormat::Webm => "video/webm",
            ExportFormat::Mov => "video/quicktime",
            ExportFormat::Gif => "image/gif",
        }
    }

    /// File extension without the leading dot.
    pub fn extension(self) -> &'static str {
        match self {
            ExportFormat::Mp4 => "mp4",
            ExportFormat::Webm => "webm",
            ExportFormat::Mov => "mov",
            ExportFormat::Gif => "gif",
        }
    }

    pub fn is_gif(self) -> bool {
        self == ExportFormat::Gif
    }

    /// Whether the container can carry the given video codec.
    pub fn supports_video_codec(self, codec: VideoCodec) -> bool {
        match self {
            ExportFormat::Mp4 | ExportFormat::Mov => {
                matches!(codec, VideoCodec::H264 | VideoCodec::H265)
            }
            ExportFormat::Webm => codec == VideoCodec::Vp9,
            ExportFormat::Gif => true,
        }
    }

    /// Whether the container can carry the given audio codec.
    pub fn supports_audio_codec(self, codec: AudioCodec) -> bool {
        match self {
            ExportFormat::Mp4 | ExportFormat::Mov => {
                matches!(codec, AudioCodec::Aac | AudioCodec::Mp3)
            }
            ExportFormat::Webm => codec == AudioCodec::Opus,
            ExportFormat::Gif => true,
        }
    }

    /// Whether the container benefits from moving the index to the front.
    pub fn wants_faststart(self) -> bool {
        matches!(self, ExportFormat::Mp4 | ExportFormat::Mov)
    }
}

impl VideoCodec {
    /// Encoder name understood by the media engine.
    pub fn encoder(self) -> &'static str {
        match self {
            VideoCodec::H264 => "libx264",
            VideoCodec::H265 => "libx265",
            VideoCodec::Vp9 => "libvpx-vp9",
        }
    }

    /// x264 and x265 take a speed preset and need an explicit pixel format.
    pub fn is_x26x(self) -> bool {
        matches!(self, VideoCodec::H264 | VideoCodec::H265)
    }
}

impl AudioCodec {
    /// Encoder name understood by the media engine.
    pub fn encoder(self) -> &'static str {
        match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "libmp3lame",
            AudioCodec::Opus => "libopus",
        }
    }
}

impl AudioChannels {
    pub fn count(self) -> u8 {
        match self {
            AudioChannels::Mono => 1,
            AudioChannels::Stereo => 2,
        }
    }
}

impl TryFrom<u8> for AudioChannels {
    type Error = String;

    fn try_from(value: u8) -> Result<Self, Self::Error> {
        match value {
            1 => Ok(AudioChannels::Mono),
            2 => Ok(AudioChannels::Stereo),
            other => Err(format!("unsupported audio channel count: {other}")),
        }
    }
}

impl From<AudioChannels> for u8 {
    fn from(value: AudioChannels) -> Self {
        value.count()
    }
}

impl fmt::Display for ExportFormat {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.extension())
    }
}

impl fmt::Display for VideoCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            VideoCodec::H264 => "h264",
            VideoCodec::H265 => "h265",
            VideoCodec::Vp9 => "vp9",
        })
    }
}

impl fmt::Display for AudioCodec {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AudioCodec::Aac => "aac",
            AudioCodec::Mp3 => "mp3",
            AudioCodec::Opus => "opus",
        })
    }
}

impl Default for ProcessingOptions {
    fn default() -> Self {
        Self {
            format: ExportFormat::Mp4,
            codec: VideoCodec::H264,
            resolution: Resolution {
                width: 1920,
                height: 1080,
            },
            fps: 30,
            bitrate: Bitrate {
                video: 8000,
                audio: 192,
            },
            quality: 80,
            audio_codec: AudioCodec::Aac,
            audio_channels: AudioChannels::Stereo,
            start_time: None,
            end_time: None,
            stabilize: false,
            denoise: false,
            enhance_colors: false,
            use_gpu: false,
            watermark: None,
            gif_settings: None,
        }
    }
}

impl ProcessingOptions {
    /// Parse options from the editor's settings JSON.
    pub fn from_json(json: &str) -> Result<Self, serde_json::Error> {
        serde_json::from_str(json)
    }

    /// Trim bounds as `(start, end)`, either side optional.
    pub fn trim_range(&self) -> (Option<f64>, Option<f64>) {
        (self.start_time, self.end_time)
    }

    /// Whether any enhancement stage is enabled.
    pub fn has_enhancements(&self) -> bool {
        self.stabilize || self.denoise || self.enhance_colors
    }

    /// GIF parameters, falling back to defaults when none were supplied.
    pub fn gif_settings_or_default(&self) -> GifSettings {
        self.gif_settings.clone().unwrap_or_default()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_mime_types() {
        assert_eq!(ExportFormat::Mp4.mime_type(), "video/mp4");
        assert_eq!(ExportFormat::Webm.mime_type(), "video/webm");
        assert_eq!(ExportFormat::Mov.mime_type(), "video/quicktime");
        assert_eq!(ExportFormat::Gif.mime_type(), "image/gif");
    }

    #[test]
    fn test_codec_compatibility() {
        assert!(ExportFormat::Mp4.supports_video_codec(VideoCodec::H265));
        assert!(!ExportFormat::Mp4.supports_video_codec(VideoCodec::Vp9));
        assert!(ExportFormat::Webm.supports_video_codec(VideoCodec::Vp9));
        assert!(!ExportFormat::Webm.supports_audio_codec(AudioCodec::Aac));
        assert!(ExportFormat::Gif.supports_video_codec(VideoCodec::H264));
    }

    #[test]
    fn test_parses_editor_json() {
        let json = r#"{
            "format": "webm",
            "codec": "vp9",
            "resolution": { "width": 1280, "height": 720 },
            "fps": 30,
            "bitrate": { "video": 4000, "audio": 128 },
            "quality": 80,
            "audioCodec": "opus",
            "audioChannels": 1,
            "startTime": 1.5,
            "enhanceColors": true
        }"#;

        let options = ProcessingOptions::from_json(json).unwrap();
        assert_eq!(options.format, ExportFormat::Webm);
        assert_eq!(options.audio_channels, AudioChannels::Mono);
        assert_eq!(options.trim_range(), (Some(1.5), None));
        assert!(options.enhance_colors);
        assert!(!options.stabilize);
        assert!(options.watermark.is_none());
    }

    #[test]
    fn test_rejects_unknown_channel_count() {
        let mut value = serde_json::to_value(ProcessingOptions::default()).unwrap();
        value["audioChannels"] = serde_json::json!(6);
        assert!(serde_json::from_value::<ProcessingOptions>(value).is_err());
    }

    #[test]
    fn test_serializes_camel_case() {
        let value = serde_json::to_value(ProcessingOptions::default()).unwrap();
        assert!(value.get("audioCodec").is_some());
        assert!(value.get("enhanceColors").is_some());
        assert_eq!(value["audioChannels"], serde_json::json!(2));
    }
}
