//! Typed, exactly-once-cleanup access to a media engine.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tokio::sync::{Mutex, OwnedMutexGuard};

use recast_common::config::ReleasePolicy;
use recast_common::error::{ExportError, ExportResult};
use recast_pipeline_compiler::{CompiledPlan, VirtualFiles};

use crate::engine::{is_flat_name, EngineProgress, MediaEngine, ProgressSink};

/// Shared handle to one engine instance.
///
/// Every job opens an [`EngineSession`], which holds the engine exclusively
/// until it is disposed. Jobs on the same adapter therefore never overlap.
pub struct EngineAdapter<E: MediaEngine> {
    engine: Arc<Mutex<E>>,
    policy: ReleasePolicy,
}

impl<E: MediaEngine> Clone for EngineAdapter<E> {
    fn clone(&self) -> Self {
        Self {
            engine: Arc::clone(&self.engine),
            policy: self.policy,
        }
    }
}

impl<E: MediaEngine> EngineAdapter<E> {
    pub fn new(engine: E, policy: ReleasePolicy) -> Self {
        Self::shared(Arc::new(Mutex::new(engine)), policy)
    }

    /// Wrap an engine that other adapters may also hold.
    pub fn shared(engine: Arc<Mutex<E>>, policy: ReleasePolicy) -> Self {
        Self { engine, policy }
    }

    pub fn engine(&self) -> Arc<Mutex<E>> {
        Arc::clone(&self.engine)
    }

    pub fn policy(&self) -> ReleasePolicy {
        self.policy
    }

    /// Wait for exclusive use of the engine.
    pub async fn open(&self) -> EngineSession<E> {
        let guard = Arc::clone(&self.engine).lock_owned().await;
        tracing::debug!(engine = guard.name(), "Engine session opened");
        EngineSession {
            guard: Some(guard),
            staged: Vec::new(),
            policy: self.policy,
        }
    }
}

/// Exclusive use of the engine for one job.
///
/// Call [`EngineSession::dispose`] when the job ends. A session dropped
/// without disposal (for example when the export future is cancelled) spawns
/// the same cleanup on the current tokio runtime.
pub struct EngineSession<E: MediaEngine> {
    guard: Option<OwnedMutexGuard<E>>,
    staged: Vec<String>,
    policy: ReleasePolicy,
}

impl<E: MediaEngine> EngineSession<E> {
    fn engine(&mut self) -> ExportResult<&mut E> {
        self.guard
            .as_deref_mut()
            .ok_or_else(|| ExportError::execution("engine session already disposed", "", None))
    }

    /// Load the engine if it is not loaded yet.
    pub async fn load(&mut self) -> ExportResult<()> {
        let engine = self.engine()?;
        if engine.is_loaded() {
            return Ok(());
        }
        engine
            .load()
            .await
            .map_err(|fault| ExportError::engine_load(fault.to_string()))
    }

    /// Stage the primary input under `name`.
    pub async fn stage_input(&mut self, bytes: &[u8], name: &str) -> ExportResult<()> {
        self.stage(bytes, name).await
    }

    /// Stage an auxiliary file such as a watermark image.
    pub async fn stage_asset(&mut self, bytes: &[u8], name: &str) -> ExportResult<()> {
        self.stage(bytes, name).await
    }

    async fn stage(&mut self, bytes: &[u8], name: &str) -> ExportResult<()> {
        if !is_flat_name(name) {
            return Err(ExportError::staging(name, "file name must be a single flat component"));
        }
        if bytes.is_empty() {
            return Err(ExportError::staging(name, "no bytes to stage"));
        }

        // Record before writing so a partial write is still cleaned up.
        self.track(name);
        self.engine()?
            .write_file(name, bytes)
            .await
            .map_err(|fault| ExportError::staging(name, fault.to_string()))?;

        tracing::debug!(file = name, bytes = bytes.len(), "Staged engine file");
        Ok(())
    }

    /// Run a compiled plan against the staged files.
    ///
    /// `progress` receives ratios in [0, 1]. A start boundary of 0 is always
    /// sent. The completion boundary belongs to the caller, once the output
    /// has actually been read.
    pub async fn execute(
        &mut self,
        plan: &CompiledPlan,
        files: &VirtualFiles,
        progress: ProgressSink<'_>,
    ) -> ExportResult<()> {
        let args = plan
            .to_args(files)
            .map_err(|e| ExportError::execution(e.to_string(), "", None))?;
        self.track(&files.output);

        let reported = AtomicBool::new(false);
        let relay = |event: EngineProgress| {
            reported.store(true, Ordering::Relaxed);
            progress(event);
        };

        progress(EngineProgress::new(0.0));
        let outcome = self
            .engine()?
            .exec(&args, plan.expected_duration_secs, &relay)
            .await
            .map_err(|fault| ExportError::execution(fault.to_string(), "", None))?;

        if !outcome.success() {
            let message = match outcome.exit_code {
                Some(code) => format!("engine exited with status {code}"),
                None => "engine run was interrupted".to_string(),
            };
            return Err(ExportError::execution(
                message,
                outcome.diagnostics,
                outcome.exit_code,
            ));
        }

        if !reported.load(Ordering::Relaxed) {
            tracing::debug!("Engine reported no progress; using stage boundaries");
        }
        Ok(())
    }

    /// Read the produced output. Missing or empty output is an error.
    pub async fn read_output(&mut self, name: &str) -> ExportResult<Vec<u8>> {
        let bytes = self
            .engine()?
            .read_file(name)
            .await
            .map_err(|fault| {
                tracing::warn!(file = name, error = %fault, "Failed to read engine output");
                ExportError::output_missing(name)
            })?;

        match bytes {
            Some(bytes) if !bytes.is_empty() => Ok(bytes),
            _ => Err(ExportError::output_missing(name)),
        }
    }

    /// Names this session will delete on disposal.
    pub fn staged_files(&self) -> &[String] {
        &self.staged
    }

    /// Delete every staged file, apply the release policy, and unlock the
    /// engine.
    ///
    /// The engine stays locked until release finishes. If this future is
    /// dropped part way, the `Drop` fallback releases whatever is left.
    pub async fn dispose(mut self) {
        if let Some(engine) = self.guard.as_deref_mut() {
            release(engine, &mut self.staged, self.policy).await;
        }
        self.guard = None;
    }

    fn track(&mut self, name: &str) {
        if !self.staged.iter().any(|staged| staged == name) {
            self.staged.push(name.to_string());
        }
    }
}

impl<E: MediaEngine> Drop for EngineSession<E> {
    fn drop(&mut self) {
        let Some(mut guard) = self.guard.take() else {
            return;
        };
        let mut files = std::mem::take(&mut self.staged);
        let policy = self.policy;

        match tokio::runtime::Handle::try_current() {
            Ok(handle) => {
                tracing::debug!(files = files.len(), "Engine session dropped; scheduling cleanup");
                handle.spawn(async move {
                    release(&mut *guard, &mut files, policy).await;
                });
            }
            Err(_) => {
                tracing::warn!(
                    files = files.len(),
                    "Engine session dropped outside a runtime; staged files were not removed"
                );
            }
        }
    }
}

/// Delete `files` and apply `policy`.
///
/// A name leaves `files` only after its delete attempt returns, so an
/// interrupted release can be resumed with the same list.
async fn release<E: MediaEngine>(engine: &mut E, files: &mut Vec<String>, policy: ReleasePolicy) {
    let total = files.len();
    while let Some(name) = files.first() {
        if let Err(e) = engine.delete_file(name).await {
            tracing::warn!(file = %name, error = %e, "Failed to delete engine file");
        }
        files.remove(0);
    }

    match policy {
        ReleasePolicy::Terminate => {
            if let Err(e) = engine.terminate().await {
                tracing::warn!(error = %e, "Failed to terminate engine");
            }
        }
        ReleasePolicy::KeepLoaded => {}
    }

    tracing::debug!(
        engine = engine.name(),
        files = total,
        policy = ?policy,
        "Engine session disposed"
    );
}
