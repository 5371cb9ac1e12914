//! Options to plan compilation.

use recast_common::config::{AppConfig, EncoderDefaults, FilterTuning};
use recast_common::error::ValidationError;
use recast_export_model::{ExportFormat, GifSettings, ProcessingOptions};

use crate::filters;
use crate::plan::{CompiledPlan, EncoderArg, FilterGraph, PlanKind, Slot, StageKind};
use crate::quality::{crf_for_quality, palette_colors_for_quality};
use crate::validate::{usable_duration, validate_options};

/// Compiles processing options into engine plans.
///
/// Holds only fixed tuning; compiling never touches I/O or mutable state.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct PipelineCompiler {
    tuning: FilterTuning,
    encoder: EncoderDefaults,
}

/// Compile with the default tuning and encoder settings.
pub fn compile(
    options: &ProcessingOptions,
    duration_hint: Option<f64>,
) -> Result<CompiledPlan, ValidationError> {
    PipelineCompiler::default().compile(options, duration_hint)
}

impl PipelineCompiler {
    pub fn new(tuning: FilterTuning, encoder: EncoderDefaults) -> Self {
        Self { tuning, encoder }
    }

    pub fn from_config(config: &AppConfig) -> Self {
        Self::new(config.tuning.clone(), config.encoder.clone())
    }

    pub fn tuning(&self) -> &FilterTuning {
        &self.tuning
    }

    /// Validate `options` and build the plan for its output format.
    ///
    /// `duration_hint` is the source duration in seconds when the container
    /// reports one. It bounds trims and drives progress; unusable values
    /// (NaN, infinite, non-positive) are ignored.
    pub fn compile(
        &self,
        options: &ProcessingOptions,
        duration_hint: Option<f64>,
    ) -> Result<CompiledPlan, ValidationError> {
        validate_options(options, duration_hint)?;
        let duration = usable_duration(duration_hint);
        if duration.is_none() && duration_hint.is_some() {
            tracing::warn!(?duration_hint, "Ignoring unusable duration hint");
        }

        let plan = if options.format.is_gif() {
            self.compile_gif(options, &options.gif_settings_or_default(), duration)
        } else {
            self.compile_video(options, duration)
        };

        tracing::debug!(
            format = %plan.format,
            stages = ?plan.graph.kinds(),
            expected_duration = ?plan.expected_duration_secs,
            "Compiled export plan"
        );
        Ok(plan)
    }

    fn compile_video(&self, options: &ProcessingOptions, duration: Option<f64>) -> CompiledPlan {
        let (start, end) = options.trim_range();

        let mut graph = FilterGraph::default();
        graph.push(StageKind::Scale, filters::scale(options.resolution));
        if options.stabilize {
            graph.push(StageKind::Stabilize, filters::stabilize(&self.tuning));
        }
        if options.denoise {
            graph.push(StageKind::Denoise, filters::denoise(&self.tuning));
        }
        if options.enhance_colors {
            graph.push(StageKind::ColorEnhance, filters::color_enhance(&self.tuning));
        }
        let inputs = push_watermark(&mut graph, options);

        let codec = options.codec;
        let mut output_args = vec![
            EncoderArg::with("-map", "0:a?"),
            EncoderArg::with("-r", options.fps),
            EncoderArg::with("-c:v", codec.encoder()),
            EncoderArg::with("-crf", crf_for_quality(options.quality)),
        ];
        if codec.is_x26x() {
            output_args.push(EncoderArg::with("-preset", &self.encoder.preset));
            output_args.push(EncoderArg::with("-pix_fmt", &self.encoder.pixel_format));
        }
        output_args.extend([
            EncoderArg::with("-b:v", format!("{}k", options.bitrate.video)),
            EncoderArg::with("-c:a", options.audio_codec.encoder()),
            EncoderArg::with("-b:a", format!("{}k", options.bitrate.audio)),
            EncoderArg::with("-ac", options.audio_channels.count()),
        ]);
        if options.format.wants_faststart() {
            output_args.push(EncoderArg::with("-movflags", "+faststart"));
        }

        CompiledPlan {
            kind: PlanKind::Video,
            format: options.format,
            input_args: input_args(start, end, options.use_gpu),
            inputs,
            graph,
            output_args,
            expected_duration_secs: expected_duration(start, end, duration),
        }
    }

    fn compile_gif(
        &self,
        options: &ProcessingOptions,
        settings: &GifSettings,
        duration: Option<f64>,
    ) -> CompiledPlan {
        let (start, end) = settings.trim_range();

        let mut graph = FilterGraph::default();
        graph.push(StageKind::FrameRate, filters::gif_frame_rate(settings.fps));
        graph.push(StageKind::Scale, filters::gif_scale(settings.width));
        let inputs = push_watermark(&mut graph, options);
        graph.palette_gen = Some(filters::palette_gen(palette_colors_for_quality(
            settings.quality,
        )));
        graph.push(StageKind::PaletteUse, filters::palette_use(settings.dither));

        if options.has_enhancements() {
            tracing::debug!("Enhancement filters are not applied to GIF exports");
        }

        let mut output_args = vec![
            EncoderArg::flag("-an"),
            EncoderArg::with("-loop", if settings.looping { "0" } else { "-1" }),
        ];
        if settings.optimize {
            output_args.push(EncoderArg::with("-gifflags", "+transdiff"));
        }

        CompiledPlan {
            kind: PlanKind::Gif,
            format: ExportFormat::Gif,
            input_args: input_args(start, end, options.use_gpu),
            inputs,
            graph,
            output_args,
            expected_duration_secs: expected_duration(start, end, duration),
        }
    }
}

/// Add the overlay stage when a watermark is present and return the inputs.
fn push_watermark(graph: &mut FilterGraph, options: &ProcessingOptions) -> Vec<Slot> {
    match &options.watermark {
        Some(watermark) => {
            graph.watermark_source = Some(filters::watermark_source(watermark));
            graph.push(
                StageKind::Watermark,
                filters::overlay(watermark.position, watermark.offset),
            );
            vec![Slot::Input, Slot::Watermark]
        }
        None => vec![Slot::Input],
    }
}

fn input_args(start: Option<f64>, end: Option<f64>, use_gpu: bool) -> Vec<EncoderArg> {
    let mut args = Vec::new();
    if use_gpu {
        args.push(EncoderArg::with("-hwaccel", "auto"));
    }
    let start = start.unwrap_or(0.0);
    if start > 0.0 {
        args.push(EncoderArg::with("-ss", format!("{start:.3}")));
    }
    if let Some(end) = end {
        args.push(EncoderArg::with("-t", format!("{:.3}", end - start)));
    }
    args
}

fn expected_duration(start: Option<f64>, end: Option<f64>, duration: Option<f64>) -> Option<f64> {
    let start = start.unwrap_or(0.0);
    match (end, duration) {
        (Some(end), _) => Some(end - start),
        (None, Some(duration)) => Some(duration - start),
        (None, None) => None,
    }
}
