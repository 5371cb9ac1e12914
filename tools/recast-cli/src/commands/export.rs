//! Transcode a recording.

use std::io::Write;
use std::path::PathBuf;
use std::sync::Arc;

use recast_common::config::AppConfig;
use recast_render_engine::{ExportRequest, Exporter, FfmpegEngine, ProgressCallback};

use super::options::OptionArgs;

pub async fn run(
    config: &AppConfig,
    input: PathBuf,
    output: Option<PathBuf>,
    duration: Option<f64>,
    args: OptionArgs,
) -> anyhow::Result<()> {
    println!("Exporting recording: {}", input.display());

    let options = args.build()?;
    let bytes = std::fs::read(&input)
        .map_err(|e| anyhow::anyhow!("Failed to read {}: {e}", input.display()))?;

    let output_path = output.unwrap_or_else(|| input.with_extension(options.format.extension()));
    let input_extension = input
        .extension()
        .and_then(|ext| ext.to_str())
        .filter(|ext| !ext.is_empty())
        .unwrap_or(recast_render_engine::DEFAULT_INPUT_EXTENSION);

    println!("  Output: {}", output_path.display());
    println!("  Format: {}", options.format);
    if !options.format.is_gif() {
        println!(
            "  Resolution: {}x{} @ {} fps",
            options.resolution.width, options.resolution.height, options.fps
        );
    }

    let exporter = Exporter::from_config(FfmpegEngine::from_config(&config.engine), config);

    let mut request = ExportRequest::new(&bytes, &options).with_input_extension(input_extension);
    if let Some(secs) = duration {
        request = request.with_duration_hint(secs);
    }

    let progress_cb: ProgressCallback = Arc::new(|percent| {
        print!("\r  Progress: {percent:>3}%  ");
        std::io::stdout().flush().ok();
    });

    match exporter.export(&request, Some(progress_cb)).await {
        Ok(result) => {
            std::fs::write(&output_path, &result.bytes).map_err(|e| {
                anyhow::anyhow!("Failed to write {}: {e}", output_path.display())
            })?;
            println!(
                "\nExport complete: {} ({}, {} bytes)",
                output_path.display(),
                result.mime_type,
                result.bytes.len()
            );
            Ok(())
        }
        Err(e) => {
            println!();
            if let recast_common::ExportError::Execution { diagnostics, .. } = &e {
                if !diagnostics.is_empty() {
                    eprintln!("{diagnostics}");
                }
            }
            Err(anyhow::anyhow!("Export failed: {e}"))
        }
    }
}
