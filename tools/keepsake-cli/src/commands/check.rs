//! Check external tools and configuration.

use keepsake_common::config::{config_file_path, AppConfig};
use keepsake_render_engine::{FfmpegBackend, VideoOverlayBackend};

pub fn run(config: &AppConfig, write_config: bool) -> anyhow::Result<()> {
    println!("Keepsake System Check");
    println!("{}", "=".repeat(50));

    let backend = FfmpegBackend::new();
    report("ffmpeg", backend.is_available(), "video overlays will fail");
    report("ffprobe", backend.ffprobe_available(), "videos will use 540x960");

    let path = config_file_path();
    if path.exists() {
        println!("[OK] Config: {}", path.display());
    } else {
        println!("[--] Config: {} (not present, using defaults)", path.display());
    }
    println!("     Output root: {}", config.run.output_root.display());
    println!("     Failure policy: {:?}", config.run.failure_policy);
    println!("     Log level: {}", config.logging.level);

    if write_config {
        config.save()?;
        println!("Wrote configuration to {}", path.display());
    }

    Ok(())
}

fn report(tool: &str, available: bool, consequence: &str) {
    if available {
        println!("[OK] {tool} found");
    } else {
        println!("[WARN] {tool} not found in PATH: {consequence}");
    }
}
