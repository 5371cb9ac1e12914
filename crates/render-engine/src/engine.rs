//! Media engine abstraction.
//!
//! The engine is an opaque, asynchronous runtime with its own flat file
//! namespace. Callers stage bytes in, run an argument list, and read bytes
//! back out. Nothing outside the engine sees host paths.

/// Progress reported by the engine while a command runs.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct EngineProgress {
    /// Completion ratio [0.0, 1.0].
    pub ratio: f64,
}

impl EngineProgress {
    pub fn new(ratio: f64) -> Self {
        Self {
            ratio: if ratio.is_finite() {
                ratio.clamp(0.0, 1.0)
            } else {
                0.0
            },
        }
    }
}

/// Result of one engine command.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecOutcome {
    /// Process-style exit code; `None` when the run was cut short.
    pub exit_code: Option<i32>,

    /// Diagnostic output captured during the run.
    pub diagnostics: String,
}

impl ExecOutcome {
    pub fn success(&self) -> bool {
        self.exit_code == Some(0)
    }
}

/// Raw failure reported by an engine implementation.
#[derive(Debug, thiserror::Error)]
pub enum EngineFault {
    #[error("engine is not loaded")]
    NotLoaded,

    #[error("engine unavailable: {0}")]
    Unavailable(String),

    #[error("invalid engine file name: {0:?}")]
    InvalidName(String),

    #[error("engine I/O on {file}: {source}")]
    Io {
        file: String,
        #[source]
        source: std::io::Error,
    },

    #[error("engine transport failure: {0}")]
    Transport(String),
}

/// Sink for progress events during [`MediaEngine::exec`].
pub type ProgressSink<'a> = &'a (dyn Fn(EngineProgress) + Send + Sync);

/// A sandboxed media-processing runtime.
#[async_trait::async_trait]
pub trait MediaEngine: Send + Sync + 'static {
    /// Engine name for logs.
    fn name(&self) -> &str;

    /// Bring the engine up. Calling this on a loaded engine is a no-op.
    async fn load(&mut self) -> Result<(), EngineFault>;

    fn is_loaded(&self) -> bool;

    /// Write `bytes` to the engine file `name`, replacing any existing file.
    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), EngineFault>;

    /// Run one command. A non-zero exit is reported in the outcome, not as a fault.
    async fn exec(
        &mut self,
        args: &[String],
        expected_duration_secs: Option<f64>,
        progress: ProgressSink<'_>,
    ) -> Result<ExecOutcome, EngineFault>;

    /// Read an engine file. `Ok(None)` when it does not exist.
    async fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>, EngineFault>;

    /// Delete an engine file. Deleting a missing file succeeds.
    async fn delete_file(&mut self, name: &str) -> Result<(), EngineFault>;

    /// Tear the engine down and release its file namespace.
    async fn terminate(&mut self) -> Result<(), EngineFault>;
}

/// Engine file names are a single flat component.
pub fn is_flat_name(name: &str) -> bool {
    !name.is_empty()
        && name != "."
        && name != ".."
        && !name.contains(['/', '\\', '\0'])
}
