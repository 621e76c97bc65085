#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::{Path, PathBuf};
use std::time::Instant;
use tracing::{error, info};

use crate::config::{DEFAULT_VIDEO_FORMAT, VideoDownloadConfig};
use crate::params::{self, Parameters};
use crate::pipeline::Stage;
use crate::tools::Toolchain;
use crate::ytdlp::{self, DownloadRequest};

pub struct DownloadVideo {
    toolchain: Toolchain,
}

impl DownloadVideo {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }
}

/// Reads the nested `video_download` options, falling back to the schema
/// defaults for a missing or malformed object.
fn download_options(params: &Parameters) -> VideoDownloadConfig {
    params
        .get(params::VIDEO_DOWNLOAD)
        .and_then(|value| VideoDownloadConfig::deserialize(value).ok())
        .unwrap_or_default()
}

impl Stage for DownloadVideo {
    fn name(&self) -> &str {
        "download_video"
    }

    fn run(&self, params: &Parameters) -> Result<Parameters> {
        let Some(url) = params.get_non_empty_str(params::URL) else {
            error!("No URL provided for download.");
            return Ok(Parameters::new());
        };
        let output = params
            .get_non_empty_str(params::ORIGINAL_FILENAME)
            .map(PathBuf::from)
            .context("no original_filename to download to")?;

        let options = download_options(params);
        let format = if options.format.trim().is_empty() {
            DEFAULT_VIDEO_FORMAT
        } else {
            options.format.as_str()
        };
        let request = DownloadRequest {
            url,
            output: &output,
            format,
            no_playlist: options.noplaylist,
            cookies: params.get_non_empty_str(params::COOKIE_PATH).map(PathBuf::from),
            write_info_json: options.write_info_json,
        };

        info!("Starting download for URL: {url}");
        let started = Instant::now();
        ytdlp::download(&self.toolchain, &request)?;
        info!(
            "Download completed in {:.2} seconds: {}",
            started.elapsed().as_secs_f64(),
            output.display()
        );

        Ok(Parameters::new().with(params::TO_PROCESS, path_value(&output)))
    }
}

fn path_value(path: &Path) -> String {
    path.to_string_lossy().into_owned()
}
