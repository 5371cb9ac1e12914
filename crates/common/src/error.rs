//! Error types shared across Recast crates.
//!
//! Every failure that leaves the export core is one of the [`ExportError`]
//! variants. Engine-specific faults are converted at the adapter boundary.

/// Top-level error type for export jobs.
#[derive(Debug, thiserror::Error)]
pub enum ExportError {
    #[error("Invalid processing options: {0}")]
    Validation(#[from] ValidationError),

    #[error("Engine failed to load: {message}")]
    EngineLoad { message: String },

    #[error("Failed to stage {file}: {message}")]
    Staging { file: String, message: String },

    #[error("Engine execution failed: {message}")]
    Execution {
        message: String,
        diagnostics: String,
        exit_code: Option<i32>,
    },

    #[error("Engine reported success but output {file} is missing")]
    OutputMissing { file: String },
}

/// Result type alias using ExportError.
pub type ExportResult<T> = Result<T, ExportError>;

impl ExportError {
    pub fn engine_load(msg: impl Into<String>) -> Self {
        Self::EngineLoad {
            message: msg.into(),
        }
    }

    pub fn staging(file: impl Into<String>, msg: impl Into<String>) -> Self {
        Self::Staging {
            file: file.into(),
            message: msg.into(),
        }
    }

    pub fn execution(
        msg: impl Into<String>,
        diagnostics: impl Into<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::Execution {
            message: msg.into(),
            diagnostics: diagnostics.into(),
            exit_code,
        }
    }

    pub fn output_missing(file: impl Into<String>) -> Self {
        Self::OutputMissing { file: file.into() }
    }

    /// Stable short name for logs and metrics labels.
    pub fn kind(&self) -> &'static str {
        match self {
            Self::Validation(_) => "validation",
            Self::EngineLoad { .. } => "engine_load",
            Self::Staging { .. } => "staging",
            Self::Execution { .. } => "execution",
            Self::OutputMissing { .. } => "output_missing",
        }
    }

    /// Whether a caller may resubmit after fixing something on their side.
    ///
    /// Validation errors need corrected options; load errors need a working
    /// environment. Everything else is terminal for the job. The core itself
    /// never retries.
    pub fn is_retryable_by_caller(&self) -> bool {
        matches!(self, Self::Validation(_) | Self::EngineLoad { .. })
    }
}

/// Malformed or out-of-range processing options.
///
/// Raised before any engine resource is touched.
#[derive(Debug, Clone, PartialEq, thiserror::Error)]
pub enum ValidationError {
    #[error("resolution must be positive, got {width}x{height}")]
    InvalidResolution { width: u32, height: u32 },

    #[error("frame rate must be positive, got {fps}")]
    InvalidFrameRate { fps: u32 },

    #[error("quality must be within 0..=100, got {quality}")]
    QualityOutOfRange { quality: u32 },

    #[error("{stream} bitrate must be positive")]
    InvalidBitrate { stream: &'static str },

    #[error("time value must be a finite number, got {value}")]
    InvalidTime { value: f64 },

    #[error("start time must not be negative, got {start}")]
    NegativeStartTime { start: f64 },

    #[error("end time {end} must be greater than start time {start}")]
    InvertedTrim { start: f64, end: f64 },

    #[error("trim bound {bound} lies outside the media duration {duration}")]
    TrimOutOfBounds { bound: f64, duration: f64 },

    #[error("video codec {codec} cannot be muxed into {format}")]
    IncompatibleVideoCodec { format: String, codec: String },

    #[error("audio codec {codec} cannot be muxed into {format}")]
    IncompatibleAudioCodec { format: String, codec: String },

    #[error("watermark scale must be a positive number, got {scale}")]
    InvalidWatermarkScale { scale: f64 },

    #[error("watermark opacity must be within 0..=1, got {opacity}")]
    InvalidWatermarkOpacity { opacity: f64 },

    #[error("watermark image is empty")]
    EmptyWatermarkImage,

    #[error("gif frame rate must be positive, got {fps}")]
    InvalidGifFrameRate { fps: u32 },

    #[error("gif width must be positive")]
    InvalidGifWidth,

    #[error("gif quality must be within 0..=100, got {quality}")]
    GifQualityOutOfRange { quality: u32 },
}
