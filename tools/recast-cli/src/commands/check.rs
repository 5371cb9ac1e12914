//! Check that the media engine is usable.

use std::path::Path;

use recast_common::config::AppConfig;
use recast_render_engine::{FfmpegEngine, MediaEngine};

/// `config_path` is the file the config was actually loaded from.
pub async fn run(config: &AppConfig, config_path: &Path) -> anyhow::Result<()> {
    println!("Recast System Check");
    println!("{}", "=".repeat(50));
    println!("{}", config_status(config_path));

    let mut engine = FfmpegEngine::from_config(&config.engine);
    match engine.version().await {
        Ok(version) => println!("[OK] Engine: {version}"),
        Err(e) => {
            println!("[FAIL] Engine: {e}");
            println!();
            println!("Install ffmpeg or set engine.binary in the config file.");
            return Ok(());
        }
    }

    match engine.load().await {
        Ok(()) => {
            println!("[OK] Scratch space is writable");
            engine.terminate().await?;
        }
        Err(e) => println!("[FAIL] Scratch space: {e}"),
    }

    println!();
    println!("Release policy: {:?}", config.engine.release_policy);
    println!("Recast is ready.");
    Ok(())
}

fn config_status(config_path: &Path) -> String {
    if config_path.exists() {
        format!("[OK] Config: {}", config_path.display())
    } else {
        format!("[--] Config: defaults ({} not found)", config_path.display())
    }
}
