#![forbid(unsafe_code)]

//! Downloads one video, names it `<uploader>_<date>.<ext>` inside today's
//! directory on the target mount, and stores the collected parameters next
//! to it. `--watermark` burns the username/date/timestamp overlay into the
//! download before the parameters are stored.

use anyhow::{Context, Result};
use chrono::Local;
use clap::Parser;
use serde_json::Value;
use std::path::PathBuf;
use tracing::{error, info};
use vidarchive_tools::config::{
    AppConfig, DEFAULT_CONFIG_PATH, RuntimePaths, expand_home, load_app_config,
    prepare_log_file, resolve_runtime_paths,
};
use vidarchive_tools::logging::{init_logging, log_startup_error};
use vidarchive_tools::params::{self, Parameters};
use vidarchive_tools::pipeline::Pipeline;
use vidarchive_tools::stages::acquisition_stages;
use vidarchive_tools::tools::{Toolchain, ensure_program_available};

#[derive(Debug, Parser)]
#[command(name = "acquire", about = "Download a video into today's archive directory")]
struct Cli {
    /// Path to the JSON configuration file.
    #[arg(long, default_value = DEFAULT_CONFIG_PATH)]
    config: PathBuf,
    /// Watermark the downloaded video before storing the parameters.
    #[arg(long)]
    watermark: bool,
    /// Video page URL.
    url: Option<String>,
}

fn main() -> Result<()> {
    let cli = Cli::parse();

    let config = load_app_config(&cli.config).inspect_err(|err| log_startup_error(err))?;
    let log_file = prepare_log_file(&config.logging).inspect_err(|err| log_startup_error(err))?;
    let _guard = init_logging(log_file.as_deref(), config.logging.file_level())?;
    info!("Configuration loaded from {}", cli.config.display());

    let paths = resolve_runtime_paths(&config, Local::now().date_naive())
        .inspect_err(|err| error!("{err}"))?;

    let initial = initial_parameters(&config, &paths, cli.url.as_deref())?;
    let pipeline = match Pipeline::new(initial) {
        Ok(pipeline) => pipeline,
        Err(err) => {
            error!("{err}");
            return Err(err.into());
        }
    };

    let toolchain = Toolchain::resolve(&config.tools);
    ensure_program_available(&toolchain.yt_dlp, "--version")?;

    let pipeline = acquisition_stages(pipeline, &toolchain, cli.watermark);
    info!("Stages: {}", pipeline.stage_names().join(" -> "));
    let report = pipeline.run();
    match report.original_filename() {
        Some(path) => println!("{}", path.display()),
        None => println!("No filename generated."),
    }
    Ok(())
}

/// The mapping the first stage sees: runtime paths, the URL, the flattened
/// watermark settings and the download options.
fn initial_parameters(
    config: &AppConfig,
    paths: &RuntimePaths,
    url: Option<&str>,
) -> Result<Parameters> {
    let path_string = |path: &PathBuf| path.to_string_lossy().into_owned();

    let base = Parameters::new()
        .with(params::DOWNLOAD_PATH, path_string(&paths.download_path))
        .with_opt(params::COOKIE_PATH, paths.cookie_path.as_ref().map(path_string))
        .with_opt(params::URL, url.map(str::trim))
        .with(params::USERNAME, config.user_id.as_str())
        .with_opt(
            params::METADATA_PATH,
            config
                .metadata_path
                .as_deref()
                .map(|raw| path_string(&expand_home(raw))),
        )
        .with(
            params::VIDEO_DOWNLOAD,
            serde_json::to_value(&config.video_download).context("serializing video_download")?,
        );

    let style = match serde_json::to_value(&config.watermark_config)
        .context("serializing watermark_config")?
    {
        Value::Object(map) => Parameters::from(map),
        _ => Parameters::new(),
    };
    Ok(base.merged(style))
}
