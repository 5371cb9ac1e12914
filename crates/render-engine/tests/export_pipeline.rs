use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use tokio::sync::Notify;

use recast_common::config::ReleasePolicy;
use recast_common::error::{ExportError, ValidationError};
use recast_export_model::{ExportFormat, GifSettings, ProcessingOptions, Resolution, Watermark};
use recast_pipeline_compiler::PipelineCompiler;
use recast_render_engine::{
    EngineAdapter, EngineFault, EngineProgress, ExecOutcome, ExportRequest, Exporter, JobState,
    MediaEngine, ProgressCallback, ProgressSink,
};

#[derive(Debug, Clone)]
enum Script {
    Succeed { progress: Vec<f64>, output: Vec<u8> },
    Fail { exit_code: i32, diagnostics: String },
    NoOutput,
    FailLoad,
    FailWrite { name_suffix: &'static str },
    Hang,
}

#[derive(Debug, Default)]
struct Stats {
    loads: usize,
    terminates: usize,
    execs: usize,
    deletes_started: usize,
    deletes_done: usize,
    files: HashMap<String, Vec<u8>>,
    files_during_exec: Vec<String>,
    last_args: Vec<String>,
    in_exec: bool,
    overlapped: bool,
}

struct ScriptedEngine {
    script: Script,
    loaded: bool,
    stats: Arc<Mutex<Stats>>,
    exec_started: Arc<Notify>,
    delete_started: Arc<Notify>,
    delete_delay: Duration,
}

impl ScriptedEngine {
    fn new(script: Script) -> (Self, Arc<Mutex<Stats>>) {
        let stats = Arc::new(Mutex::new(Stats::default()));
        let engine = Self {
            script,
            loaded: false,
            stats: Arc::clone(&stats),
            exec_started: Arc::new(Notify::new()),
            delete_started: Arc::new(Notify::new()),
            delete_delay: Duration::ZERO,
        };
        (engine, stats)
    }

    fn with_delete_delay(mut self, delay: Duration) -> Self {
        self.delete_delay = delay;
        self
    }
}

#[async_trait::async_trait]
impl MediaEngine for ScriptedEngine {
    fn name(&self) -> &str {
        "scripted"
    }

    async fn load(&mut self) -> Result<(), EngineFault> {
        self.stats.lock().unwrap().loads += 1;
        if matches!(self.script, Script::FailLoad) {
            return Err(EngineFault::Unavailable("no engine binary".to_string()));
        }
        self.loaded = true;
        Ok(())
    }

    fn is_loaded(&self) -> bool {
        self.loaded
    }

    async fn write_file(&mut self, name: &str, bytes: &[u8]) -> Result<(), EngineFault> {
        if !self.loaded {
            return Err(EngineFault::NotLoaded);
        }
        if let Script::FailWrite { name_suffix } = &self.script {
            if name.contains(name_suffix) {
                // a torn write leaves a partial file behind
                self.stats
                    .lock()
                    .unwrap()
                    .files
                    .insert(name.to_string(), bytes[..bytes.len() / 2].to_vec());
                return Err(EngineFault::Io {
                    file: name.to_string(),
                    source: std::io::Error::new(std::io::ErrorKind::Other, "disk full"),
                });
            }
        }
        self.stats
            .lock()
            .unwrap()
            .files
            .insert(name.to_string(), bytes.to_vec());
        Ok(())
    }

    async fn exec(
        &mut self,
        args: &[String],
        _expected_duration_secs: Option<f64>,
        progress: ProgressSink<'_>,
    ) -> Result<ExecOutcome, EngineFault> {
        {
            let mut stats = self.stats.lock().unwrap();
            stats.execs += 1;
            if stats.in_exec {
                stats.overlapped = true;
            }
            stats.in_exec = true;
            stats.last_args = args.to_vec();
            stats.files_during_exec = stats.files.keys().cloned().collect();
        }
        self.exec_started.notify_one();

        let output_name = args.last().cloned().unwrap_or_default();
        let outcome = match &self.script {
            Script::Succeed {
                progress: steps,
                output,
            } => {
                for ratio in steps {
                    progress(EngineProgress::new(*ratio));
                    tokio::time::sleep(Duration::from_millis(5)).await;
                }
                self.stats
                    .lock()
                    .unwrap()
                    .files
                    .insert(output_name, output.clone());
                ExecOutcome {
                    exit_code: Some(0),
                    diagnostics: String::new(),
                }
            }
            Script::Fail {
                exit_code,
                diagnostics,
            } => ExecOutcome {
                exit_code: Some(*exit_code),
                diagnostics: diagnostics.clone(),
            },
            Script::NoOutput => ExecOutcome {
                exit_code: Some(0),
                diagnostics: String::new(),
            },
            Script::FailLoad => unreachable!("exec after failed load"),
            Script::FailWrite { .. } => unreachable!("exec after failed staging"),
            Script::Hang => {
                std::future::pending::<()>().await;
                unreachable!()
            }
        };

        self.stats.lock().unwrap().in_exec = false;
        Ok(outcome)
    }

    async fn read_file(&mut self, name: &str) -> Result<Option<Vec<u8>>, EngineFault> {
        Ok(self.stats.lock().unwrap().files.get(name).cloned())
    }

    async fn delete_file(&mut self, name: &str) -> Result<(), EngineFault> {
        self.stats.lock().unwrap().deletes_started += 1;
        self.delete_started.notify_one();
        if !self.delete_delay.is_zero() {
            tokio::time::sleep(self.delete_delay).await;
        }
        let mut stats = self.stats.lock().unwrap();
        stats.files.remove(name);
        stats.deletes_done += 1;
        Ok(())
    }

    async fn terminate(&mut self) -> Result<(), EngineFault> {
        self.loaded = false;
        self.stats.lock().unwrap().terminates += 1;
        Ok(())
    }
}

fn exporter(engine: ScriptedEngine, policy: ReleasePolicy) -> Exporter<ScriptedEngine> {
    Exporter::new(EngineAdapter::new(engine, policy), PipelineCompiler::default())
}

fn succeed(progress: Vec<f64>) -> Script {
    Script::Succeed {
        progress,
        output: b"encoded-media".to_vec(),
    }
}

fn recording_progress() -> (ProgressCallback, Arc<Mutex<Vec<u8>>>) {
    let seen = Arc::new(Mutex::new(Vec::new()));
    let sink = Arc::clone(&seen);
    let callback: ProgressCallback = Arc::new(move |percent| sink.lock().unwrap().push(percent));
    (callback, seen)
}

fn arg_after<'a>(args: &'a [String], flag: &str) -> Option<&'a str> {
    args.iter()
        .position(|arg| arg == flag)
        .and_then(|i| args.get(i + 1))
        .map(String::as_str)
}

#[tokio::test]
async fn mp4_export_end_to_end() {
    let (engine, stats) = ScriptedEngine::new(succeed(vec![0.5]));
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions {
        resolution: Resolution {
            width: 1280,
            height: 720,
        },
        quality: 80,
        ..Default::default()
    };
    let input = b"raw-webm-recording".to_vec();

    let request = ExportRequest::new(&input, &options).with_duration_hint(12.0);
    let (job, result) = exporter.export_job(&request, None).await;
    let output = result.unwrap();

    assert_eq!(output.bytes, b"encoded-media");
    assert_eq!(output.mime_type, "video/mp4");
    assert_eq!(output.suggested_extension(), "mp4");
    assert_eq!(&output.job_id, job.id());
    assert_eq!(input, b"raw-webm-recording");

    let stats = stats.lock().unwrap();
    let graph = arg_after(&stats.last_args, "-filter_complex").unwrap();
    assert!(graph.contains("scale=1280:720"));
    assert!(!graph.contains("deshake"));
    assert!(!graph.contains("overlay"));
    assert_eq!(arg_after(&stats.last_args, "-crf"), Some("11"));
    assert_eq!(stats.terminates, 1);
    assert!(stats.files.is_empty());

    assert_eq!(
        job.history(),
        vec![
            JobState::Created,
            JobState::Validating,
            JobState::Staging,
            JobState::Executing,
            JobState::Completed,
            JobState::Disposed,
        ]
    );
}

#[tokio::test]
async fn gif_export_end_to_end() {
    let (engine, stats) = ScriptedEngine::new(succeed(vec![]));
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions {
        format: ExportFormat::Gif,
        gif_settings: Some(GifSettings {
            fps: 10,
            width: 480,
            dither: true,
            looping: true,
            optimize: true,
            ..Default::default()
        }),
        ..Default::default()
    };

    let output = exporter
        .export(&ExportRequest::new(b"rec", &options), None)
        .await
        .unwrap();
    assert_eq!(output.mime_type, "image/gif");
    assert_eq!(output.format, ExportFormat::Gif);

    let stats = stats.lock().unwrap();
    let args = &stats.last_args;
    let graph = arg_after(args, "-filter_complex").unwrap();
    assert!(graph.starts_with("[0:v]fps=10,scale=480:-1:flags=lanczos"));
    assert!(graph.contains("paletteuse=dither=floyd_steinberg[vout]"));
    assert_eq!(arg_after(args, "-loop"), Some("0"));
    assert_eq!(arg_after(args, "-gifflags"), Some("+transdiff"));
    assert!(!args.iter().any(|a| a == "-c:v" || a == "-crf"));
    assert!(args.last().unwrap().ends_with("-output.gif"));
}

#[tokio::test]
async fn progress_is_monotonic() {
    let (engine, _stats) = ScriptedEngine::new(succeed(vec![0.4, 0.2, 0.6]));
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions::default();
    let (callback, seen) = recording_progress();

    exporter
        .export(&ExportRequest::new(b"rec", &options), Some(callback))
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0, 40, 40, 60, 100]);
}

#[tokio::test]
async fn engine_without_progress_still_reports_boundaries() {
    let (engine, _stats) = ScriptedEngine::new(succeed(vec![]));
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions::default();
    let (callback, seen) = recording_progress();

    exporter
        .export(&ExportRequest::new(b"rec", &options), Some(callback))
        .await
        .unwrap();

    assert_eq!(*seen.lock().unwrap(), vec![0, 100]);
}

#[tokio::test]
async fn execution_failure_disposes_exactly_once() {
    let (engine, stats) = ScriptedEngine::new(Script::Fail {
        exit_code: 1,
        diagnostics: "Error initializing filter 'scale'".to_string(),
    });
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions::default();

    let (job, result) = exporter
        .export_job(&ExportRequest::new(b"rec", &options), None)
        .await;

    match result {
        Err(ExportError::Execution {
            diagnostics,
            exit_code,
            ..
        }) => {
            assert_eq!(exit_code, Some(1));
            assert!(diagnostics.contains("scale"));
        }
        other => panic!("expected execution error, got {other:?}"),
    }

    let stats = stats.lock().unwrap();
    assert_eq!(stats.terminates, 1);
    assert!(stats.files.is_empty());
    let history = job.history();
    assert_eq!(
        &history[history.len() - 2..],
        &[JobState::Failed, JobState::Disposed]
    );
}

#[tokio::test]
async fn missing_output_is_an_error() {
    let (engine, stats) = ScriptedEngine::new(Script::NoOutput);
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions::default();
    let (callback, seen) = recording_progress();

    let err = exporter
        .export(&ExportRequest::new(b"rec", &options), Some(callback))
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::OutputMissing { .. }));
    assert_eq!(stats.lock().unwrap().terminates, 1);
    // no completion event for a job that produced nothing
    assert_eq!(*seen.lock().unwrap(), vec![0]);
}

#[tokio::test]
async fn engine_load_failure_still_disposes() {
    let (engine, stats) = ScriptedEngine::new(Script::FailLoad);
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions::default();

    let err = exporter
        .export(&ExportRequest::new(b"rec", &options), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::EngineLoad { .. }));
    assert!(err.is_retryable_by_caller());

    let stats = stats.lock().unwrap();
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.execs, 0);
    assert_eq!(stats.terminates, 1);
    assert!(stats.files.is_empty());
}

#[tokio::test]
async fn validation_failure_never_touches_engine() {
    let (engine, stats) = ScriptedEngine::new(succeed(vec![]));
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions {
        start_time: Some(5.0),
        end_time: Some(3.0),
        ..Default::default()
    };

    let (job, result) = exporter
        .export_job(&ExportRequest::new(b"rec", &options), None)
        .await;

    assert!(matches!(
        result,
        Err(ExportError::Validation(ValidationError::InvertedTrim { .. }))
    ));
    assert_eq!(
        job.history(),
        vec![
            JobState::Created,
            JobState::Validating,
            JobState::Failed,
            JobState::Disposed,
        ]
    );

    let stats = stats.lock().unwrap();
    assert_eq!(stats.loads, 0);
    assert_eq!(stats.terminates, 0);
    assert!(exporter.adapter().engine().try_lock().is_ok());
}

#[tokio::test]
async fn empty_input_is_a_staging_error() {
    let (engine, stats) = ScriptedEngine::new(succeed(vec![]));
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions::default();

    let err = exporter
        .export(&ExportRequest::new(&[], &options), None)
        .await
        .unwrap_err();

    assert!(matches!(err, ExportError::Staging { .. }));
    assert_eq!(stats.lock().unwrap().terminates, 1);
}

#[tokio::test]
async fn watermark_is_staged_and_removed() {
    let (engine, stats) = ScriptedEngine::new(succeed(vec![]));
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions {
        watermark: Some(Watermark::new(vec![0x89, b'P', b'N', b'G'], "image/png")),
        ..Default::default()
    };

    exporter
        .export(&ExportRequest::new(b"rec", &options), None)
        .await
        .unwrap();

    let stats = stats.lock().unwrap();
    assert!(stats
        .files_during_exec
        .iter()
        .any(|name| name.ends_with("-watermark.png")));
    assert_eq!(stats.last_args.iter().filter(|a| *a == "-i").count(), 2);
    assert!(stats.files.is_empty());
}

#[tokio::test(flavor = "multi_thread", worker_threads = 2)]
async fn shared_engine_serializes_jobs() {
    let (engine, stats) = ScriptedEngine::new(succeed(vec![0.3, 0.6, 0.9]));
    let exporter = exporter(engine, ReleasePolicy::KeepLoaded);

    let tasks: Vec<_> = (0..3)
        .map(|_| {
            let exporter = exporter.clone();
            tokio::spawn(async move {
                let options = ProcessingOptions::default();
                exporter
                    .export(&ExportRequest::new(b"rec", &options), None)
                    .await
            })
        })
        .collect();

    for task in tasks {
        task.await.unwrap().unwrap();
    }

    let stats = stats.lock().unwrap();
    assert_eq!(stats.execs, 3);
    assert!(!stats.overlapped);
    assert_eq!(stats.loads, 1);
    assert_eq!(stats.terminates, 0);
    assert!(stats.files.is_empty());
}

#[tokio::test]
async fn cancelled_export_still_cleans_up() {
    let (engine, stats) = ScriptedEngine::new(Script::Hang);
    let started = Arc::clone(&engine.exec_started);
    let exporter = exporter(engine, ReleasePolicy::Terminate);

    let task = {
        let exporter = exporter.clone();
        tokio::spawn(async move {
            let options = ProcessingOptions::default();
            exporter
                .export(&ExportRequest::new(b"rec", &options), None)
                .await
        })
    };

    started.notified().await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    for _ in 0..100 {
        if stats.lock().unwrap().terminates == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let stats = stats.lock().unwrap();
    assert_eq!(stats.terminates, 1);
    assert!(stats.files.is_empty());
    drop(stats);

    // The engine is free for the next job.
    assert!(exporter.adapter().engine().try_lock().is_ok());
}

#[tokio::test]
async fn watermark_write_fault_is_a_staging_error() {
    let (engine, stats) = ScriptedEngine::new(Script::FailWrite {
        name_suffix: "-watermark.",
    });
    let exporter = exporter(engine, ReleasePolicy::Terminate);
    let options = ProcessingOptions {
        watermark: Some(Watermark::new(vec![0x89, b'P', b'N', b'G'], "image/png")),
        ..Default::default()
    };

    let (job, result) = exporter
        .export_job(&ExportRequest::new(b"rec", &options), None)
        .await;

    match result {
        Err(ExportError::Staging { file, .. }) => assert!(file.ends_with("-watermark.png")),
        other => panic!("expected staging error, got {other:?}"),
    }

    let stats = stats.lock().unwrap();
    assert_eq!(stats.execs, 0);
    assert_eq!(stats.terminates, 1);
    assert!(stats.files.is_empty());
    assert_eq!(
        job.history(),
        vec![
            JobState::Created,
            JobState::Validating,
            JobState::Staging,
            JobState::Failed,
            JobState::Disposed,
        ]
    );
}

#[tokio::test]
async fn cancellation_during_disposal_finishes_cleanup() {
    let (engine, stats) = ScriptedEngine::new(succeed(vec![0.5]));
    let engine = engine.with_delete_delay(Duration::from_millis(50));
    let delete_started = Arc::clone(&engine.delete_started);
    let exporter = exporter(engine, ReleasePolicy::Terminate);

    let task = {
        let exporter = exporter.clone();
        tokio::spawn(async move {
            let options = ProcessingOptions::default();
            exporter
                .export(&ExportRequest::new(b"rec", &options), None)
                .await
        })
    };

    delete_started.notified().await;
    task.abort();
    assert!(task.await.unwrap_err().is_cancelled());

    for _ in 0..200 {
        if stats.lock().unwrap().terminates == 1 {
            break;
        }
        tokio::time::sleep(Duration::from_millis(10)).await;
    }

    let stats = stats.lock().unwrap();
    assert_eq!(stats.terminates, 1);
    assert!(stats.files.is_empty());
    assert!(stats.deletes_done >= 2);
    drop(stats);

    assert!(exporter.adapter().engine().try_lock().is_ok());
}
