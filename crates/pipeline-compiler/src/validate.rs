//! Authoritative validation of processing options.
//!
//! Callers may have validated already; the compiler does not rely on it.

use recast_common::error::ValidationError;
use recast_export_model::{GifSettings, ProcessingOptions, Watermark, STANDARD_FRAME_RATES};

use crate::quality::MAX_QUALITY;

/// Slack allowed when comparing trim bounds with a container-reported duration.
pub const DURATION_TOLERANCE_SECS: f64 = 1e-3;

/// Check every field that affects the compiled plan.
pub fn validate_options(
    options: &ProcessingOptions,
    duration_hint: Option<f64>,
) -> Result<(), ValidationError> {
    let duration = usable_duration(duration_hint);

    if let Some(watermark) = &options.watermark {
        validate_watermark(watermark)?;
    }

    if options.format.is_gif() {
        return validate_gif(&options.gif_settings_or_default(), duration);
    }

    let resolution = options.resolution;
    if resolution.width == 0 || resolution.height == 0 {
        return Err(ValidationError::InvalidResolution {
            width: resolution.width,
            height: resolution.height,
        });
    }

    if options.fps == 0 {
        return Err(ValidationError::InvalidFrameRate { fps: options.fps });
    }
    if !STANDARD_FRAME_RATES.contains(&options.fps) {
        tracing::warn!(fps = options.fps, "Non-standard export frame rate");
    }

    if options.quality > MAX_QUALITY {
        return Err(ValidationError::QualityOutOfRange {
            quality: options.quality,
        });
    }

    if options.bitrate.video == 0 {
        return Err(ValidationError::InvalidBitrate { stream: "video" });
    }
    if options.bitrate.audio == 0 {
        return Err(ValidationError::InvalidBitrate { stream: "audio" });
    }

    if !options.format.supports_video_codec(options.codec) {
        return Err(ValidationError::IncompatibleVideoCodec {
            format: options.format.to_string(),
            codec: options.codec.to_string(),
        });
    }
    if !options.format.supports_audio_codec(options.audio_codec) {
        return Err(ValidationError::IncompatibleAudioCodec {
            format: options.format.to_string(),
            codec: options.audio_codec.to_string(),
        });
    }

    validate_trim(options.start_time, options.end_time, duration)
}

fn validate_gif(settings: &GifSettings, duration: Option<f64>) -> Result<(), ValidationError> {
    if settings.fps == 0 {
        return Err(ValidationError::InvalidGifFrameRate { fps: settings.fps });
    }
    if settings.width == 0 {
        return Err(ValidationError::InvalidGifWidth);
    }
    if settings.quality > MAX_QUALITY {
        return Err(ValidationError::GifQualityOutOfRange {
            quality: settings.quality,
        });
    }
    validate_trim(settings.start_time, settings.end_time, duration)
}

fn validate_watermark(watermark: &Watermark) -> Result<(), ValidationError> {
    if watermark.image.is_empty() {
        return Err(ValidationError::EmptyWatermarkImage);
    }
    if !watermark.scale.is_finite() || watermark.scale <= 0.0 {
        return Err(ValidationError::InvalidWatermarkScale {
            scale: watermark.scale,
        });
    }
    if !(0.0..=1.0).contains(&watermark.opacity) {
        return Err(ValidationError::InvalidWatermarkOpacity {
            opacity: watermark.opacity,
        });
    }
    Ok(())
}

/// Trim rules shared by both plan shapes.
///
/// An absent start means 0. Out-of-range bounds are errors, never clamped.
fn validate_trim(
    start: Option<f64>,
    end: Option<f64>,
    duration: Option<f64>,
) -> Result<(), ValidationError> {
    for value in [start, end].into_iter().flatten() {
        if !value.is_finite() {
            return Err(ValidationError::InvalidTime { value });
        }
    }

    let start_secs = start.unwrap_or(0.0);
    if start_secs < 0.0 {
        return Err(ValidationError::NegativeStartTime { start: start_secs });
    }

    if let Some(end) = end {
        if end <= start_secs {
            return Err(ValidationError::InvertedTrim {
                start: start_secs,
                end,
            });
        }
    }

    if let Some(duration) = duration {
        if start_secs >= duration {
            return Err(ValidationError::TrimOutOfBounds {
                bound: start_secs,
                duration,
            });
        }
        if let Some(end) = end {
            if end > duration + DURATION_TOLERANCE_SECS {
                return Err(ValidationError::TrimOutOfBounds {
                    bound: end,
                    duration,
                });
            }
        }
    }

    Ok(())
}

/// Duration hints that are not finite and positive carry no information.
pub(crate) fn usable_duration(duration_hint: Option<f64>) -> Option<f64> {
    duration_hint.filter(|d| d.is_finite() && *d > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use recast_export_model::{ExportFormat, VideoCodec, Watermark};

    #[test]
    fn test_default_options_are_valid() {
        assert!(validate_options(&ProcessingOptions::default(), None).is_ok());
    }

    #[test]
    fn test_inverted_trim_rejected() {
        let options = ProcessingOptions {
            start_time: Some(5.0),
            end_time: Some(3.0),
            ..Default::default()
        };
        assert_eq!(
            validate_options(&options, None),
            Err(ValidationError::InvertedTrim {
                start: 5.0,
                end: 3.0
            })
        );
    }

    #[test]
    fn test_equal_trim_bounds_rejected() {
        let options = ProcessingOptions {
            start_time: Some(2.0),
            end_time: Some(2.0),
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&options, None),
            Err(ValidationError::InvertedTrim { .. })
        ));
    }

    #[test]
    fn test_trim_beyond_duration_is_error_not_clamp() {
        let options = ProcessingOptions {
            end_time: Some(12.0),
            ..Default::default()
        };
        assert_eq!(
            validate_options(&options, Some(10.0)),
            Err(ValidationError::TrimOutOfBounds {
                bound: 12.0,
                duration: 10.0
            })
        );
        assert!(validate_options(&options, None).is_ok());

        let late_start = ProcessingOptions {
            start_time: Some(10.0),
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&late_start, Some(10.0)),
            Err(ValidationError::TrimOutOfBounds { .. })
        ));
    }

    #[test]
    fn test_negative_and_nan_times_rejected() {
        let negative = ProcessingOptions {
            start_time: Some(-1.0),
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&negative, None),
            Err(ValidationError::NegativeStartTime { .. })
        ));

        let nan = ProcessingOptions {
            end_time: Some(f64::NAN),
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&nan, None),
            Err(ValidationError::InvalidTime { .. })
        ));
    }

    #[test]
    fn test_range_checks() {
        let mut options = ProcessingOptions::default();
        options.resolution.width = 0;
        assert!(matches!(
            validate_options(&options, None),
            Err(ValidationError::InvalidResolution { .. })
        ));

        let options = ProcessingOptions {
            quality: 101,
            ..Default::default()
        };
        assert_eq!(
            validate_options(&options, None),
            Err(ValidationError::QualityOutOfRange { quality: 101 })
        );

        let mut options = ProcessingOptions::default();
        options.bitrate.audio = 0;
        assert_eq!(
            validate_options(&options, None),
            Err(ValidationError::InvalidBitrate { stream: "audio" })
        );

        let options = ProcessingOptions {
            fps: 0,
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&options, None),
            Err(ValidationError::InvalidFrameRate { fps: 0 })
        ));
    }

    #[test]
    fn test_non_standard_fps_is_accepted() {
        let options = ProcessingOptions {
            fps: 25,
            ..Default::default()
        };
        assert!(validate_options(&options, None).is_ok());
    }

    #[test]
    fn test_codec_container_mismatch() {
        let options = ProcessingOptions {
            format: ExportFormat::Webm,
            codec: VideoCodec::H264,
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&options, None),
            Err(ValidationError::IncompatibleVideoCodec { .. })
        ));
    }

    #[test]
    fn test_watermark_checks() {
        let options = ProcessingOptions {
            watermark: Some(Watermark::new(vec![1, 2], "image/png").with_scale(0.0)),
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&options, None),
            Err(ValidationError::InvalidWatermarkScale { .. })
        ));

        let options = ProcessingOptions {
            watermark: Some(Watermark::new(vec![1, 2], "image/png").with_opacity(1.5)),
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&options, None),
            Err(ValidationError::InvalidWatermarkOpacity { .. })
        ));

        let options = ProcessingOptions {
            watermark: Some(Watermark::new(Vec::new(), "image/png")),
            ..Default::default()
        };
        assert_eq!(
            validate_options(&options, None),
            Err(ValidationError::EmptyWatermarkImage)
        );
    }

    #[test]
    fn test_gif_ignores_video_codec_and_checks_gif_trim() {
        let options = ProcessingOptions {
            format: ExportFormat::Gif,
            codec: VideoCodec::Vp9,
            gif_settings: Some(GifSettings {
                start_time: Some(4.0),
                end_time: Some(1.0),
                ..Default::default()
            }),
            ..Default::default()
        };
        assert!(matches!(
            validate_options(&options, None),
            Err(ValidationError::InvertedTrim { .. })
        ));

        let options = ProcessingOptions {
            format: ExportFormat::Gif,
            codec: VideoCodec::Vp9,
            ..Default::default()
        };
        assert!(validate_options(&options, None).is_ok());
    }

    #[test]
    fn test_unusable_hint_is_ignored() {
        let options = ProcessingOptions {
            end_time: Some(30.0),
            ..Default::default()
        };
        assert!(validate_options(&options, Some(f64::NAN)).is_ok());
        assert!(validate_options(&options, Some(0.0)).is_ok());
    }
}
