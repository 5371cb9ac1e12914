//! `ffmpeg` process engine confined to a private scratch directory.

use std::path::PathBuf;
use std::process::Stdio;

use tokio::io::{AsyncBufReadExt, AsyncReadExt, BufReader};
use tokio::process::Command;

use recast_common::config::EngineConfig;

use crate::engine::{
    is_flat_name, EngineFault, EngineProgress, ExecOutcome, MediaEngine, ProgressSink,
};

/// Arguments prepended to every run: overwrite, quiet logs, machine-readable
/// progress on stdout.
const BASE_ARGS: [&str; 8] = [
    "-y",
    "-hide_banner",
    "-loglevel",
    "error",
    "-nostats",
    "-progress",
    "pipe:1",
    "-nostdin",
];

/// Engine backed by a local `ffmpeg` binary.
///
/// The scratch directory is the engine's file namespace: every staged file
/// lives there under a flat name, and the process runs with it as its working
/// directory so plans only ever mention bare names.
#[derive(Debug)]
pub struct FfmpegEngine {
    binary: String,
    scratch_root: Option<PathBuf>,
    scratch: Option<tempfile::TempDir>,
}

impl FfmpegEngine {
    pub fn new(binary: impl Into<String>) -> Self {
        Self {
            binary: binary.into(),
            scratch_root: None,
            scratch: None,
        }
    }

    pub fn from_config(config: &EngineConfig) -> Self {
        Self {
            binary: config.binary.clone(),
            scratch_root: config.scratch_root.clone(),
            scratch: None,
        }
    }

    pub fn binary(&self) -> &str {
        &self.binary
    }

    /// First line of `<binary> -version`.
    pub async fn version(&self) -> Result<String, EngineFault> {
        let output = Command::new(&self.binary)
            .arg("-version")
            .stdin(Stdio::null())
            .output()
            .await
            .map_err(|e| EngineFault::Unavailable(format!("failed to run {}: {e}", self.binary)))?;

        if !output.status.success() {
            return Err(EngineFault::Unavailable(format!(
                "{} -version exited with {}",
                self.binary, output.status
            )));
        }

        let stdout = String::from_utf8_lossy(&output.stdout);
        Ok(stdout.lines().next().unwrap_or_default().trim().to_string())
    }

    fn scratch_dir(&self) -> Result<&std::path::Path, EngineFault> {
        self.scratch
            .as_ref()
            .map(|dir| dir.path())
            .ok_or(EngineFault::NotLoaded)
    }

    fn file_path(&self, name: &str) -> Result<PathBuf, EngineFault> {
        if !is_flat_name(name) {
            return Err(EngineFault::InvalidName(name.to_string()));
        }
        Ok(self.scratch_dir()?.join(name))
    }
}

impl Default for FfmpegEngine {
    fn default() -> Self {
        Self::from_config(&EngineConfig::default())
    }
}

#[async_trait::async_trait]
impl MediaEngine for FfmpegEngine {
    fn name(&self) -> &str {
        "ffmpeg"
    }

    async fn load(&mut self) -> Result<(), EngineFault> {
        if self.scratch.is_some() {
            return Ok(());
        }

        let version = self.version().await?;

        let mut builder = tempfile::Builder::new();
        builder.prefix("recast-engine-");
        let scratch = match &self.scratch_root {
            Some(root) => builder.tempdir_in(root),
            None => builder.tempdir(),
        }
        .map_err(|e| EngineFault::Unavailable(format!("failed to create scratch space: {e}")))?;

        tracing::info!(
            binary = %self.binary,
            version = %version,
            scratch = %scratch.path().display(),
            "Media engine loaded"
        );
        self.scratch = Some(scratch);
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.scratch.is_some()
    }

    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), EngineFault> {
        let path = self.file_path(name)?;
        tokio::fs::write(&path, bytes)
            .await
            .map_err(|source| EngineFault::Io {
                file: name.to_string(),
                source,
            })
    }

    async fn exec(
        &mut self,
        args: &[String],
        expected_duration_secs: Option<f64>,
        progress: ProgressSink<'_>,
    ) -> Result<ExecOutcome, EngineFault> {
        let cwd = self.scratch_dir()?.to_path_buf();
        tracing::debug!(args = ?args, "Running ffmpeg");

        let mut child = Command::new(&self.binary)
            .args(BASE_ARGS)
            .args(args)
            .current_dir(&cwd)
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|e| EngineFault::Transport(format!("failed to start ffmpeg: {e}")))?;

        let started = std::time::Instant::now();
        tracing::info!(pid = child.id(), args_len = args.len(), "ffmpeg process started");

        let stdout = child
            .stdout
            .take()
            .ok_or_else(|| EngineFault::Transport("ffmpeg stdout not captured".to_string()))?;
        let mut stderr = child
            .stderr
            .take()
            .ok_or_else(|| EngineFault::Transport("ffmpeg stderr not captured".to_string()))?;

        // ffmpeg blocks once the stderr pipe fills, so drain it alongside stdout.
        let stderr_task = tokio::spawn(async move {
            let mut output = String::new();
            match stderr.read_to_string(&mut output).await {
                Ok(_) => output,
                Err(err) => format!("<failed to read ffmpeg stderr: {err}>"),
            }
        });

        let mut lines = BufReader::new(stdout).lines();
        let mut state = ProgressState::default();
        while let Some(line) = lines
            .next_line()
            .await
            .map_err(|e| EngineFault::Transport(format!("failed reading ffmpeg progress: {e}")))?
        {
            let Some((key, value)) = line.trim().split_once('=') else {
                continue;
            };
            state.update(key, value);
            if key == "progress" {
                if let Some(ratio) = state.ratio(expected_duration_secs) {
                    progress(EngineProgress::new(ratio));
                }
            }
        }

        let status = child
            .wait()
            .await
            .map_err(|e| EngineFault::Transport(format!("failed to wait on ffmpeg: {e}")))?;
        let diagnostics = stderr_task
            .await
            .unwrap_or_else(|_| "<failed to join stderr reader>".to_string());

        tracing::info!(
            status = %status,
            elapsed_secs = started.elapsed().as_secs_f64(),
            out_time_secs = state.out_time_secs,
            "ffmpeg process finished"
        );

        Ok(ExecOutcome {
            exit_code: status.code(),
            diagnostics: diagnostics.trim().to_string(),
        })
    }

    async fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>, EngineFault> {
        let path = self.file_path(name)?;
        match tokio::fs::read(&path).await {
            Ok(bytes) => Ok(Some(bytes)),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(None),
            Err(source) => Err(EngineFault::Io {
                file: name.to_string(),
                source,
            }),
        }
    }

    async fn delete_file(&mut self, name: &str) -> Result<(), EngineFault> {
        let path = self.file_path(name)?;
        match tokio::fs::remove_file(&path).await {
            Ok(()) => Ok(()),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => Ok(()),
            Err(source) => Err(EngineFault::Io {
                file: name.to_string(),
                source,
            }),
        }
    }

    async fn terminate(&mut self) -> Result<(), EngineFault> {
        let Some(scratch) = self.scratch.take() else {
            return Ok(());
        };
        let path = scratch.path().display().to_string();
        scratch.close().map_err(|source| EngineFault::Io { file: path, source })?;
        tracing::debug!("Media engine terminated");
        Ok(())
    }
}

/// Accumulated `-progress` key/value state.
#[derive(Debug, Default)]
struct ProgressState {
    out_time_secs: f64,
    complete: bool,
}

impl ProgressState {
    fn update(&mut self, key: &str, value: &str) {
        match key {
            // ffmpeg reports microseconds under both keys.
            "out_time_us" | "out_time_ms" => {
                if let Ok(us) = value.parse::<f64>() {
                    self.out_time_secs = (us / 1_000_000.0).max(0.0);
                }
            }
            "progress" => {
                self.complete = value == "end";
            }
            _ => {}
        }
    }

    /// Completion ratio, when it can be computed.
    fn ratio(&self, expected_duration_secs: Option<f64>) -> Option<f64> {
        if self.complete {
            return Some(1.0);
        }
        match expected_duration_secs {
            Some(total) if total > 0.0 => Some((self.out_time_secs / total).clamp(0.0, 1.0)),
            _ => None,
        }
    }
}
