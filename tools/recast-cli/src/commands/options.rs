//! Processing options from a settings file and/or flags.

use std::path::PathBuf;

use clap::Args;

use recast_export_model::{
    AudioChannels, AudioCodec, ExportFormat, ProcessingOptions, VideoCodec, Watermark,
    WatermarkAnchor,
};

/// Flags override values read from `--options`; anything unset keeps the
/// file's value or the editor default.
#[derive(Args, Debug, Default)]
pub struct OptionArgs {
    /// Processing options JSON, as saved by the editor
    #[arg(long = "options", value_name = "FILE")]
    pub options_file: Option<PathBuf>,

    /// Output format: mp4, webm, mov, gif
    #[arg(long)]
    pub format: Option<String>,

    /// Video codec: h264, h265, vp9
    #[arg(long)]
    pub codec: Option<String>,

    /// Audio codec: aac, mp3, opus
    #[arg(long)]
    pub audio_codec: Option<String>,

    /// Output width
    #[arg(long)]
    pub width: Option<u32>,

    /// Output height
    #[arg(long)]
    pub height: Option<u32>,

    /// Output frame rate
    #[arg(long)]
    pub fps: Option<u32>,

    /// Quality 0..=100
    #[arg(long)]
    pub quality: Option<u32>,

    /// Video bitrate in kbps
    #[arg(long)]
    pub video_bitrate: Option<u32>,

    /// Audio bitrate in kbps
    #[arg(long)]
    pub audio_bitrate: Option<u32>,

    /// Downmix audio to mono
    #[arg(long)]
    pub mono: bool,

    /// Trim start in seconds
    #[arg(long)]
    pub start: Option<f64>,

    /// Trim end in seconds
    #[arg(long)]
    pub end: Option<f64>,

    /// Apply motion stabilization
    #[arg(long)]
    pub stabilize: bool,

    /// Apply denoising
    #[arg(long)]
    pub denoise: bool,

    /// Boost contrast and saturation
    #[arg(long)]
    pub enhance_colors: bool,

    /// Request hardware-accelerated decoding
    #[arg(long)]
    pub gpu: bool,

    /// Watermark image file
    #[arg(long, value_name = "IMAGE")]
    pub watermark: Option<PathBuf>,

    /// Watermark anchor: top-left, top-right, bottom-left, bottom-right, center
    #[arg(long, default_value = "bottom-right")]
    pub watermark_position: String,

    /// Watermark opacity [0.0, 1.0]
    #[arg(long, default_value = "0.8")]
    pub watermark_opacity: f64,

    /// Watermark scale factor
    #[arg(long, default_value = "1.0")]
    pub watermark_scale: f64,

    /// GIF frame rate
    #[arg(long)]
    pub gif_fps: Option<u32>,

    /// GIF width
    #[arg(long)]
    pub gif_width: Option<u32>,

    /// Play the GIF once instead of looping
    #[arg(long)]
    pub gif_no_loop: bool,
}

impl OptionArgs {
    /// Build processing options: file (or defaults), then flags.
    pub fn build(&self) -> anyhow::Result<ProcessingOptions> {
        let mut options = match &self.options_file {
            Some(path) => {
                let json = std::fs::read_to_string(path)
                    .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", path.display()))?;
                ProcessingOptions::from_json(&json)
                    .map_err(|e| anyhow::anyhow!("Invalid options in {}: {e}", path.display()))?
            }
            None => ProcessingOptions::default(),
        };

        if let Some(format) = &self.format {
            options.format = parse_format(format)?;
            // Pick codecs the container accepts unless they are given explicitly.
            let webm = options.format == ExportFormat::Webm;
            if !options.format.supports_video_codec(options.codec) {
                options.codec = if webm { VideoCodec::Vp9 } else { VideoCodec::H264 };
            }
            if !options.format.supports_audio_codec(options.audio_codec) {
                options.audio_codec = if webm { AudioCodec::Opus } else { AudioCodec::Aac };
            }
        }
        if let Some(codec) = &self.codec {
            options.codec = parse_codec(codec)?;
        }
        if let Some(codec) = &self.audio_codec {
            options.audio_codec = parse_audio_codec(codec)?;
        }

        if let Some(width) = self.width {
            options.resolution.width = width;
        }
        if let Some(height) = self.height {
            options.resolution.height = height;
        }
        if let Some(fps) = self.fps {
            options.fps = fps;
        }
        if let Some(quality) = self.quality {
            options.quality = quality;
        }
        if let Some(kbps) = self.video_bitrate {
            options.bitrate.video = kbps;
        }
        if let Some(kbps) = self.audio_bitrate {
            options.bitrate.audio = kbps;
        }
        if self.mono {
            options.audio_channels = AudioChannels::Mono;
        }
        if self.start.is_some() {
            options.start_time = self.start;
        }
        if self.end.is_some() {
            options.end_time = self.end;
        }

        options.stabilize |= self.stabilize;
        options.denoise |= self.denoise;
        options.enhance_colors |= self.enhance_colors;
        options.use_gpu |= self.gpu;

        if let Some(path) = &self.watermark {
            let image = std::fs::read(path)
                .map_err(|e| anyhow::anyhow!("Failed to read watermark {}: {e}", path.display()))?;
            let position: WatermarkAnchor = self
                .watermark_position
                .parse()
                .map_err(|e: String| anyhow::anyhow!(e))?;
            options.watermark = Some(
                Watermark::new(image, image_mime_type(path))
                    .with_position(position)
                    .with_opacity(self.watermark_opacity)
                    .with_scale(self.watermark_scale),
            );
        }

        if options.format.is_gif() {
            let mut gif = options.gif_settings_or_default();
            if let Some(fps) = self.gif_fps {
                gif.fps = fps;
            }
            if let Some(width) = self.gif_width {
                gif.width = width;
            }
            if self.gif_no_loop {
                gif.looping = false;
            }
            // Trim flags apply to whichever shape is being exported.
            if self.start.is_some() {
                gif.start_time = self.start;
            }
            if self.end.is_some() {
                gif.end_time = self.end;
            }
            options.gif_settings = Some(gif);
        }

        Ok(options)
    }
}

fn parse_format(value: &str) -> anyhow::Result<ExportFormat> {
    match value.to_ascii_lowercase().as_str() {
        "mp4" => Ok(ExportFormat::Mp4),
        "webm" => Ok(ExportFormat::Webm),
        "mov" => Ok(ExportFormat::Mov),
        "gif" => Ok(ExportFormat::Gif),
        _ => Err(anyhow::anyhow!(
            "Unknown format: {value}. Use: mp4, webm, mov, gif"
        )),
    }
}

fn parse_codec(value: &str) -> anyhow::Result<VideoCodec> {
    match value.to_ascii_lowercase().as_str() {
        "h264" => Ok(VideoCodec::H264),
        "h265" | "hevc" => Ok(VideoCodec::H265),
        "vp9" => Ok(VideoCodec::Vp9),
        _ => Err(anyhow::anyhow!("Unknown codec: {value}. Use: h264, h265, vp9")),
    }
}

fn parse_audio_codec(value: &str) -> anyhow::Result<AudioCodec> {
    match value.to_ascii_lowercase().as_str() {
        "aac" => Ok(AudioCodec::Aac),
        "mp3" => Ok(AudioCodec::Mp3),
        "opus" => Ok(AudioCodec::Opus),
        _ => Err(anyhow::anyhow!(
            "Unknown audio codec: {value}. Use: aac, mp3, opus"
        )),
    }
}

fn image_mime_type(path: &std::path::Path) -> &'static str {
    let ext = path
        .extension()
        .and_then(|ext| ext.to_str())
        .unwrap_or_default()
        .to_ascii_lowercase();
    match ext.as_str() {
        "jpg" | "jpeg" => "image/jpeg",
        "webp" => "image/webp",
        "gif" => "image/gif",
        "bmp" => "image/bmp",
        _ => "image/png",
    }
}
