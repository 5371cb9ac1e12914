//! Export jobs: validation, staging, execution, and cleanup.

use std::fmt;
use std::sync::atomic::{AtomicU64, AtomicU8, Ordering};
use std::sync::Arc;

use chrono::{DateTime, Utc};

use recast_common::config::AppConfig;
use recast_common::error::{ExportError, ExportResult};
use recast_export_model::{ExportFormat, ProcessingOptions};
use recast_pipeline_compiler::{CompiledPlan, PipelineCompiler, VirtualFiles};

use crate::adapter::{EngineAdapter, EngineSession};
use crate::engine::{EngineProgress, MediaEngine};

/// Progress callback receiving integer percent 0..=100.
pub type ProgressCallback = Arc<dyn Fn(u8) + Send + Sync>;

/// Extension assumed for recorder output when the caller does not say.
pub const DEFAULT_INPUT_EXTENSION: &str = "webm";

/// One export request. The input bytes are borrowed and never modified.
#[derive(Debug, Clone, Copy)]
pub struct ExportRequest<'a> {
    pub input: &'a [u8],
    pub options: &'a ProcessingOptions,

    /// Source duration in seconds, when the container reports one.
    pub duration_hint: Option<f64>,

    /// Extension used for the staged input name.
    pub input_extension: &'a str,
}

impl<'a> ExportRequest<'a> {
    pub fn new(input: &'a [u8], options: &'a ProcessingOptions) -> Self {
        Self {
            input,
            options,
            duration_hint: None,
            input_extension: DEFAULT_INPUT_EXTENSION,
        }
    }

    pub fn with_duration_hint(mut self, duration_secs: f64) -> Self {
        self.duration_hint = Some(duration_secs);
        self
    }

    pub fn with_input_extension(mut self, extension: &'a str) -> Self {
        self.input_extension = extension;
        self
    }
}

/// A finished export.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExportOutput {
    pub bytes: Vec<u8>,
    pub mime_type: &'static str,
    pub format: ExportFormat,
    pub job_id: JobId,
}

impl ExportOutput {
    pub fn suggested_extension(&self) -> &'static str {
        self.format.extension()
    }
}

/// Unique identifier of an export job within this process.
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct JobId(String);

static NEXT_JOB: AtomicU64 = AtomicU64::new(1);

impl JobId {
    fn next() -> Self {
        let seq = NEXT_JOB.fetch_add(1, Ordering::Relaxed);
        Self(format!("{}-{seq}", Utc::now().timestamp_millis()))
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Virtual file names for this job. Names never collide across jobs.
    pub fn virtual_files(
        &self,
        input_extension: &str,
        watermark_extension: Option<&str>,
        format: ExportFormat,
    ) -> VirtualFiles {
        VirtualFiles {
            input: format!("job-{}-input.{input_extension}", self.0),
            watermark: watermark_extension.map(|ext| format!("job-{}-watermark.{ext}", self.0)),
            output: format!("job-{}-output.{}", self.0, format.extension()),
        }
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

/// Lifecycle of an export job.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum JobState {
    Created,
    Validating,
    Staging,
    Executing,
    Completed,
    Failed,
    Disposed,
}

impl JobState {
    pub fn can_advance_to(self, next: JobState) -> bool {
        use JobState::*;
        matches!(
            (self, next),
            (Created, Validating)
                | (Validating, Staging)
                | (Validating, Failed)
                | (Staging, Executing)
                | (Staging, Failed)
                | (Executing, Completed)
                | (Executing, Failed)
                | (Completed, Disposed)
                | (Failed, Disposed)
        )
    }

    pub fn is_terminal(self) -> bool {
        self == JobState::Disposed
    }

    pub fn as_str(self) -> &'static str {
        match self {
            JobState::Created => "created",
            JobState::Validating => "validating",
            JobState::Staging => "staging",
            JobState::Executing => "executing",
            JobState::Completed => "completed",
            JobState::Failed => "failed",
            JobState::Disposed => "disposed",
        }
    }
}

/// Bookkeeping for one export.
#[derive(Debug, Clone)]
pub struct ExportJob {
    id: JobId,
    created_at: DateTime<Utc>,
    state: JobState,
    history: Vec<(JobState, DateTime<Utc>)>,
}

impl ExportJob {
    fn new() -> Self {
        let created_at = Utc::now();
        Self {
            id: JobId::next(),
            created_at,
            state: JobState::Created,
            history: vec![(JobState::Created, created_at)],
        }
    }

    pub fn id(&self) -> &JobId {
        &self.id
    }

    pub fn created_at(&self) -> DateTime<Utc> {
        self.created_at
    }

    pub fn state(&self) -> JobState {
        self.state
    }

    /// Every state the job passed through, in order.
    pub fn history(&self) -> Vec<JobState> {
        self.history.iter().map(|(state, _)| *state).collect()
    }

    fn advance(&mut self, next: JobState) {
        debug_assert!(
            self.state.can_advance_to(next),
            "invalid job transition {:?} -> {:?}",
            self.state,
            next
        );
        tracing::debug!(
            job = %self.id,
            from = self.state.as_str(),
            to = next.as_str(),
            "Export job transition"
        );
        self.state = next;
        self.history.push((next, Utc::now()));
    }
}

/// Converts engine ratios to percents that never go backwards.
pub struct ProgressCursor {
    percent: AtomicU8,
    callback: Option<ProgressCallback>,
}

impl ProgressCursor {
    pub fn new(callback: Option<ProgressCallback>) -> Self {
        Self {
            percent: AtomicU8::new(0),
            callback,
        }
    }

    /// Record a ratio and forward the clamped percent.
    pub fn report(&self, ratio: f64) -> u8 {
        let percent = (EngineProgress::new(ratio).ratio * 100.0).round() as u8;
        let observed = self.percent.fetch_max(percent, Ordering::AcqRel).max(percent);
        if let Some(callback) = &self.callback {
            callback(observed);
        }
        observed
    }

    pub fn current(&self) -> u8 {
        self.percent.load(Ordering::Acquire)
    }
}

/// Runs export jobs against one engine.
pub struct Exporter<E: MediaEngine> {
    adapter: EngineAdapter<E>,
    compiler: PipelineCompiler,
}

impl<E: MediaEngine> Clone for Exporter<E> {
    fn clone(&self) -> Self {
        Self {
            adapter: self.adapter.clone(),
            compiler: self.compiler.clone(),
        }
    }
}

impl<E: MediaEngine> Exporter<E> {
    pub fn new(adapter: EngineAdapter<E>, compiler: PipelineCompiler) -> Self {
        Self { adapter, compiler }
    }

    pub fn from_config(engine: E, config: &AppConfig) -> Self {
        Self::new(
            EngineAdapter::new(engine, config.engine.release_policy),
            PipelineCompiler::from_config(config),
        )
    }

    pub fn adapter(&self) -> &EngineAdapter<E> {
        &self.adapter
    }

    pub fn compiler(&self) -> &PipelineCompiler {
        &self.compiler
    }

    /// Export `request.input` according to `request.options`.
    pub async fn export(
        &self,
        request: &ExportRequest<'_>,
        progress: Option<ProgressCallback>,
    ) -> ExportResult<ExportOutput> {
        self.export_job(request, progress).await.1
    }

    /// Like [`Exporter::export`], also returning the job record.
    pub async fn export_job(
        &self,
        request: &ExportRequest<'_>,
        progress: Option<ProgressCallback>,
    ) -> (ExportJob, ExportResult<ExportOutput>) {
        let mut job = ExportJob::new();
        let options = request.options;
        tracing::info!(
            job = %job.id,
            format = %options.format,
            input_bytes = request.input.len(),
            "Starting export"
        );

        job.advance(JobState::Validating);
        let plan = match self.compiler.compile(options, request.duration_hint) {
            Ok(plan) => plan,
            Err(err) => {
                tracing::warn!(job = %job.id, error = %err, "Export rejected");
                job.advance(JobState::Failed);
                job.advance(JobState::Disposed);
                return (job, Err(err.into()));
            }
        };

        let files = job.id.virtual_files(
            request.input_extension,
            options.watermark.as_ref().map(|wm| wm.file_extension()),
            plan.format,
        );
        let cursor = ProgressCursor::new(progress);

        let mut session = self.adapter.open().await;
        let result = run(&mut job, &mut session, request, &plan, &files, &cursor).await;
        session.dispose().await;

        match &result {
            Ok(output) => tracing::info!(
                job = %job.id,
                bytes = output.bytes.len(),
                mime = output.mime_type,
                "Export complete"
            ),
            Err(err) => tracing::error!(
                job = %job.id,
                kind = err.kind(),
                error = %err,
                "Export failed"
            ),
        }

        job.advance(JobState::Disposed);
        (job, result)
    }
}

async fn run<E: MediaEngine>(
    job: &mut ExportJob,
    session: &mut EngineSession<E>,
    request: &ExportRequest<'_>,
    plan: &CompiledPlan,
    files: &VirtualFiles,
    cursor: &ProgressCursor,
) -> ExportResult<ExportOutput> {
    job.advance(JobState::Staging);
    if let Err(err) = stage(session, request, files).await {
        job.advance(JobState::Failed);
        return Err(err);
    }

    job.advance(JobState::Executing);
    let report = |event: EngineProgress| {
        cursor.report(event.ratio);
    };
    let bytes = match execute(session, plan, files, &report).await {
        Ok(bytes) => bytes,
        Err(err) => {
            job.advance(JobState::Failed);
            return Err(err);
        }
    };

    job.advance(JobState::Completed);
    Ok(ExportOutput {
        bytes,
        mime_type: plan.mime_type(),
        format: plan.format,
        job_id: job.id.clone(),
    })
}

async fn stage<E: MediaEngine>(
    session: &mut EngineSession<E>,
    request: &ExportRequest<'_>,
    files: &VirtualFiles,
) -> ExportResult<()> {
    session.load().await?;
    session.stage_input(request.input, &files.input).await?;

    if let (Some(watermark), Some(name)) = (&request.options.watermark, &files.watermark) {
        session.stage_asset(&watermark.image, name).await?;
    }
    Ok(())
}

async fn execute<E: MediaEngine>(
    session: &mut EngineSession<E>,
    plan: &CompiledPlan,
    files: &VirtualFiles,
    report: &(dyn Fn(EngineProgress) + Send + Sync),
) -> ExportResult<Vec<u8>> {
    session.execute(plan, files, report).await?;
    let bytes = session.read_output(&files.output).await?;
    report(EngineProgress::new(1.0));
    Ok(bytes)
}
