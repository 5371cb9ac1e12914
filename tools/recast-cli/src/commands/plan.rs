//! Print the engine plan for a set of options.

use recast_common::config::AppConfig;
use recast_pipeline_compiler::{PipelineCompiler, VirtualFiles};

use super::options::OptionArgs;

pub fn run(
    config: &AppConfig,
    duration: Option<f64>,
    json: bool,
    args: OptionArgs,
) -> anyhow::Result<()> {
    let options = args.build()?;
    let plan = PipelineCompiler::from_config(config)
        .compile(&options, duration)
        .map_err(|e| anyhow::anyhow!("Invalid options: {e}"))?;

    if json {
        println!("{}", serde_json::to_string_pretty(&plan)?);
        return Ok(());
    }

    let files = VirtualFiles {
        input: "input.webm".to_string(),
        watermark: options
            .watermark
            .as_ref()
            .map(|wm| format!("watermark.{}", wm.file_extension())),
        output: format!("output.{}", plan.format.extension()),
    };
    let args = plan.to_args(&files)?;

    println!("Plan ({:?}, {})", plan.kind, plan.mime_type());
    println!("  Stages:");
    for stage in &plan.graph.stages {
        println!("    {:<14} {}", format!("{:?}", stage.kind), stage.expr);
    }
    if let Some(secs) = plan.expected_duration_secs {
        println!("  Expected duration: {secs:.3}s");
    }
    println!("  Command:");
    println!("    ffmpeg {}", shell_join(&args));

    Ok(())
}

/// Quote arguments that a POSIX shell would split or expand.
fn shell_join(args: &[String]) -> String {
    args.iter()
        .map(|arg| {
            if !arg.is_empty()
                && arg
                    .chars()
                    .all(|c| c.is_ascii_alphanumeric() || "-_.:=+/,".contains(c))
            {
                arg.clone()
            } else {
                format!("'{}'", arg.replace('\'', r"'\''"))
            }
        })
        .collect::<Vec<_>>()
        .join(" ")
}
