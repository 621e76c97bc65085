#![forbid(unsafe_code)]

//! Burns the configured username, today's date and a running timestamp into
//! a single video.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use std::fs;
use std::path::PathBuf;
use tracing::{error, info};
use vidarchive_tools::config::{DEFAULT_CONFIG_PATH, load_app_config, prepare_log_file};
use vidarchive_tools::logging::{init_logging, log_startup_error};
use vidarchive_tools::tools::{Toolchain, ensure_program_available};
use vidarchive_tools::watermark::{WatermarkParams, add_watermark};

#[derive(Debug, Parser)]
#[command(name = "watermark", about = "Overlay username, date and timestamps onto a video")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Directory for the watermarked copy (defaults to `download_path`).
    #[arg(long)]
    output_dir: Option<PathBuf>,
    /// Video to watermark (defaults to `input_video_path`).
    input_video_path: Option<PathBuf>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_app_config(&cli.config).inspect_err(|err| log_startup_error(err))?;
    let log_file = prepare_log_file(&config.logging).inspect_err(|err| log_startup_error(err))?;
    let _guard = init_logging(log_file.as_deref(), config.logging.file_level())?;

    let params = WatermarkParams::from_config(
        &config,
        cli.input_video_path,
        cli.output_dir,
        Local::now().date_naive(),
    )
    .inspect_err(|err| error!("{err}"))?;

    let toolchain = Toolchain::resolve(&config.tools);
    ensure_program_available(&toolchain.ffprobe, "-version")?;
    ensure_program_available(&toolchain.ffmpeg, "-version")?;

    fs::create_dir_all(&params.download_path)
        .with_context(|| format!("creating {}", params.download_path.display()))?;

    let output = add_watermark(&toolchain, &params).inspect_err(|err| error!("{err:#}"))?;
    info!("Watermarking finished");
    println!("{}", output.display());
    Ok(())
}
