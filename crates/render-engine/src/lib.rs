//! Recast Render Engine
//!
//! Runs compiled export plans on a sandboxed media engine and turns the
//! outcome into a typed result.
//!
//! # Pipeline Architecture
//!
//! ```text
//! input bytes ──┐
//!               ├── Exporter ── compile ──► CompiledPlan
//! options ──────┘      │
//!                      ├── EngineSession::load
//!                      ├── stage input (+ watermark)
//!                      ├── execute ──► progress 0..=100
//!                      ├── read output
//!                      ▼
//!               dispose (always, exactly once)
//!                      │
//!                      ▼
//!          ExportOutput { bytes, mime_type }
//! ```
//!
//! [`FfmpegEngine`] is the shipped engine. Anything implementing
//! [`MediaEngine`] can stand in for it.

pub mod adapter;
pub mod engine;
pub mod export;
pub mod ffmpeg;

pub use adapter::{EngineAdapter, EngineSession};
pub use engine::{EngineFault, EngineProgress, ExecOutcome, MediaEngine, ProgressSink};
pub use export::*;
pub use ffmpeg::FfmpegEngine;
