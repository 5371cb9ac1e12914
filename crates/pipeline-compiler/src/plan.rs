//! Structured plan representation.
//!
//! A [`CompiledPlan`] never contains concrete file names. Files are referenced
//! through [`Slot`]s and bound to virtual names only when the plan is
//! serialized with [`CompiledPlan::to_args`].

use serde::Serialize;

use recast_export_model::ExportFormat;

/// Label of the final video pad in every rendered filter graph.
pub const VIDEO_OUT_LABEL: &str = "vout";

/// Symbolic reference to a file in the engine's filesystem.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum Slot {
    Input,
    Watermark,
    Output,
}

/// Value of an engine argument.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum ArgValue {
    Text(String),
    File(Slot),
}

/// One flag with an optional value, e.g. `-crf 23` or `-an`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct EncoderArg {
    pub flag: String,
    pub value: Option<ArgValue>,
}

impl EncoderArg {
    /// Flag without a value.
    pub fn flag(flag: impl Into<String>) -> Self {
        Self {
            flag: flag.into(),
            value: None,
        }
    }

    /// Flag with a literal value.
    pub fn with(flag: impl Into<String>, value: impl ToString) -> Self {
        Self {
            flag: flag.into(),
            value: Some(ArgValue::Text(value.to_string())),
        }
    }

    /// Flag whose value is a file slot.
    pub fn file(flag: impl Into<String>, slot: Slot) -> Self {
        Self {
            flag: flag.into(),
            value: Some(ArgValue::File(slot)),
        }
    }

    /// Literal value, if any.
    pub fn text(&self) -> Option<&str> {
        match &self.value {
            Some(ArgValue::Text(text)) => Some(text),
            _ => None,
        }
    }
}

/// What a filter stage does. Variant order is the canonical graph order.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum StageKind {
    FrameRate,
    Scale,
    Stabilize,
    Denoise,
    ColorEnhance,
    Watermark,
    PaletteUse,
}

/// One filter applied to the video stream.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterStage {
    pub kind: StageKind,
    pub expr: String,
}

/// Ordered video filter graph.
#[derive(Debug, Clone, PartialEq, Default, Serialize)]
pub struct FilterGraph {
    /// Stages in application order.
    pub stages: Vec<FilterStage>,

    /// Chain applied to the watermark input before it is overlaid.
    pub watermark_source: Option<String>,

    /// Palette generator feeding the palette-use stage.
    pub palette_gen: Option<String>,
}

impl FilterGraph {
    pub fn push(&mut self, kind: StageKind, expr: impl Into<String>) {
        self.stages.push(FilterStage {
            kind,
            expr: expr.into(),
        });
    }

    /// Stage kinds in application order.
    pub fn kinds(&self) -> Vec<StageKind> {
        self.stages.iter().map(|stage| stage.kind).collect()
    }

    pub fn contains(&self, kind: StageKind) -> bool {
        self.stages.iter().any(|stage| stage.kind == kind)
    }

    pub fn stage(&self, kind: StageKind) -> Option<&FilterStage> {
        self.stages.iter().find(|stage| stage.kind == kind)
    }

    /// Whether stages follow the canonical order with no kind repeated.
    pub fn is_canonically_ordered(&self) -> bool {
        self.stages.windows(2).all(|pair| pair[0].kind < pair[1].kind)
    }

    /// Render as a `-filter_complex` graph ending in [`VIDEO_OUT_LABEL`].
    ///
    /// Primary video is input 0; the watermark, when present, is input 1.
    pub fn render(&self) -> String {
        let mut chains: Vec<String> = Vec::new();
        let mut linear: Vec<&str> = Vec::new();
        let mut current = "0:v".to_string();
        let mut next_label = 0usize;

        let mut fresh_label = || {
            let label = format!("v{next_label}");
            next_label += 1;
            label
        };

        for stage in &self.stages {
            match stage.kind {
                StageKind::Watermark => {
                    if !linear.is_empty() {
                        let label = fresh_label();
                        chains.push(format!("[{current}]{}[{label}]", linear.join(",")));
                        linear.clear();
                        current = label;
                    }
                    let source = self.watermark_source.as_deref().unwrap_or("null");
                    let label = fresh_label();
                    chains.push(format!("[1:v]{source}[wm]"));
                    chains.push(format!("[{current}][wm]{}[{label}]", stage.expr));
                    current = label;
                }
                StageKind::PaletteUse => {
                    if !linear.is_empty() {
                        let label = fresh_label();
                        chains.push(format!("[{current}]{}[{label}]", linear.join(",")));
                        linear.clear();
                        current = label;
                    }
                    let palette_gen = self.palette_gen.as_deref().unwrap_or("palettegen");
                    let label = fresh_label();
                    chains.push(format!("[{current}]split[pal_src][pal_in]"));
                    chains.push(format!("[pal_in]{palette_gen}[palette]"));
                    chains.push(format!("[pal_src][palette]{}[{label}]", stage.expr));
                    current = label;
                }
                _ => linear.push(&stage.expr),
            }
        }

        if !linear.is_empty() {
            chains.push(format!(
                "[{current}]{}[{VIDEO_OUT_LABEL}]",
                linear.join(",")
            ));
        } else if let Some(last) = chains.last_mut() {
            let suffix = format!("[{current}]");
            if last.ends_with(&suffix) {
                last.truncate(last.len() - suffix.len());
            }
            last.push_str(&format!("[{VIDEO_OUT_LABEL}]"));
        } else {
            chains.push(format!("[0:v]null[{VIDEO_OUT_LABEL}]"));
        }

        chains.join(";")
    }
}

/// Which of the two pipeline shapes a plan uses.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum PlanKind {
    Video,
    Gif,
}

/// Engine-agnostic description of one export.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CompiledPlan {
    pub kind: PlanKind,

    /// Output container.
    pub format: ExportFormat,

    /// Arguments that apply to the primary input (seek, duration, decode hints).
    pub input_args: Vec<EncoderArg>,

    /// Inputs in engine order; the primary input is always first.
    pub inputs: Vec<Slot>,

    /// Video filter graph.
    pub graph: FilterGraph,

    /// Encoder, muxer and mapping arguments.
    pub output_args: Vec<EncoderArg>,

    /// Duration of the produced media, when known. Drives progress reporting.
    pub expected_duration_secs: Option<f64>,
}

/// Concrete virtual file names for one job.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct VirtualFiles {
    pub input: String,
    pub watermark: Option<String>,
    pub output: String,
}

impl VirtualFiles {
    pub fn resolve(&self, slot: Slot) -> Option<&str> {
        match slot {
            Slot::Input => Some(&self.input),
            Slot::Watermark => self.watermark.as_deref(),
            Slot::Output => Some(&self.output),
        }
    }
}

/// A plan references a slot that has no file bound to it.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("plan references {slot:?} but no file is bound to it")]
pub struct UnboundSlot {
    pub slot: Slot,
}

impl CompiledPlan {
    /// MIME type of the artifact this plan produces.
    pub fn mime_type(&self) -> &'static str {
        self.format.mime_type()
    }

    /// Whether the plan composites a watermark image.
    pub fn needs_watermark(&self) -> bool {
        self.inputs.contains(&Slot::Watermark)
    }

    /// Look up the first output argument with the given flag.
    pub fn output_arg(&self, flag: &str) -> Option<&EncoderArg> {
        self.output_args.iter().find(|arg| arg.flag == flag)
    }

    /// Look up the first input argument with the given flag.
    pub fn input_arg(&self, flag: &str) -> Option<&EncoderArg> {
        self.input_args.iter().find(|arg| arg.flag == flag)
    }

    /// Serialize into the engine's command-line form.
    ///
    /// Layout: input args, `-i` per input, the filter graph with its output
    /// mapped, output args, then the output file.
    pub fn to_args(&self, files: &VirtualFiles) -> Result<Vec<String>, UnboundSlot> {
        let mut args = Vec::new();

        push_args(&mut args, &self.input_args, files)?;
        for slot in &self.inputs {
            args.push("-i".to_string());
            args.push(resolve(files, *slot)?.to_string());
        }

        args.push("-filter_complex".to_string());
        args.push(self.graph.render());
        args.push("-map".to_string());
        args.push(format!("[{VIDEO_OUT_LABEL}]"));

        push_args(&mut args, &self.output_args, files)?;
        args.push(resolve(files, Slot::Output)?.to_string());

        Ok(args)
    }
}

fn resolve(files: &VirtualFiles, slot: Slot) -> Result<&str, UnboundSlot> {
    files.resolve(slot).ok_or(UnboundSlot { slot })
}

fn push_args(
    out: &mut Vec<String>,
    args: &[EncoderArg],
    files: &VirtualFiles,
) -> Result<(), UnboundSlot> {
    for arg in args {
        out.push(arg.flag.clone());
        match &arg.value {
            Some(ArgValue::Text(text)) => out.push(text.clone()),
            Some(ArgValue::File(slot)) => out.push(resolve(files, *slot)?.to_string()),
            None => {}
        }
    }
    Ok(())
}
