//! Recast Pipeline Compiler
//!
//! Turns a [`ProcessingOptions`](recast_export_model::ProcessingOptions) value
//! into a [`CompiledPlan`]: an ordered, engine-agnostic description of one
//! transcoding job.
//!
//! ```text
//! ProcessingOptions ──► validate ──► video | gif shape ──► CompiledPlan
//!                                                            │
//!                                     VirtualFiles ──► to_args() ──► argv
//! ```
//!
//! Compilation is pure. The same options and duration hint always produce an
//! equal plan, and the filter stages always follow the canonical order
//! described on [`StageKind`].

pub mod compile;
pub mod filters;
pub mod plan;
pub mod quality;
pub mod validate;

pub use compile::{compile, PipelineCompiler};
pub use plan::*;
pub use quality::{crf_for_quality, palette_colors_for_quality};
pub use validate::{validate_options, DURATION_TOLERANCE_SECS};
