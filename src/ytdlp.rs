#![forbid(unsafe_code)]

//! yt-dlp invocations: metadata extraction and the actual download.

use anyhow::{Context, Result, bail};
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::process::Command;
use tracing::debug;

use crate::tools::Toolchain;

/// Extensions yt-dlp can merge separate video/audio streams into.
const MERGE_FORMATS: &[&str] = &["mp4", "mkv", "webm"];

/// Runs `yt-dlp --dump-single-json` without downloading media and returns the
/// raw info object.
pub fn fetch_info(toolchain: &Toolchain, url: &str, cookies: Option<&Path>) -> Result<Value> {
    let mut command = toolchain.yt_dlp_command();
    command
        .arg("--dump-single-json")
        .arg("--skip-download")
        .arg("--no-playlist")
        .arg("--no-warnings")
        .arg("--no-progress");
    push_cookies(&mut command, cookies);
    command.arg(url);

    let output = command
        .output()
        .with_context(|| format!("fetching metadata for {url}"))?;
    if !output.status.success() {
        let stderr = String::from_utf8_lossy(&output.stderr);
        bail!(
            "metadata command failed for {} (status {}): {}",
            url,
            output.status,
            stderr.trim()
        );
    }

    let raw_json =
        String::from_utf8(output.stdout).context("parsing metadata JSON response as UTF-8")?;
    let info: Value = serde_json::from_str(&raw_json).context("deserializing metadata JSON")?;
    if !info.is_object() {
        bail!("metadata for {url} is not a JSON object");
    }
    Ok(info)
}

/// Options for one format-selective download.
#[derive(Debug, Clone, PartialEq)]
pub struct DownloadRequest<'a> {
    pub url: &'a str,
    pub output: &'a Path,
    pub format: &'a str,
    pub no_playlist: bool,
    pub cookies: Option<PathBuf>,
    pub write_info_json: bool,
}

impl DownloadRequest<'_> {
    pub(crate) fn to_command(&self, toolchain: &Toolchain) -> Command {
        let mut command = toolchain.yt_dlp_command();
        command
            .arg("--output")
            .arg(self.output)
            .arg("--format")
            .arg(self.format)
            .arg("--no-progress");
        if self.no_playlist {
            command.arg("--no-playlist");
        }
        if let Some(ext) = self.output.extension().and_then(|ext| ext.to_str())
            && MERGE_FORMATS.contains(&ext)
        {
            command.arg("--merge-output-format").arg(ext);
        }
        if self.write_info_json {
            command.arg("--write-info-json");
        }
        push_cookies(&mut command, self.cookies.as_deref());
        command.arg(self.url);
        command
    }
}

/// Downloads the requested format to `request.output`.
pub fn download(toolchain: &Toolchain, request: &DownloadRequest<'_>) -> Result<()> {
    let mut command = request.to_command(toolchain);
    debug!("yt-dlp command: {:?}", command);
    let status = command
        .status()
        .with_context(|| format!("running yt-dlp for {}", request.url))?;
    if !status.success() {
        bail!("download failed for {} (status {})", request.url, status);
    }
    Ok(())
}

fn push_cookies(command: &mut Command, cookies: Option<&Path>) {
    if let Some(path) = cookies
        && path.exists()
    {
        command.arg("--cookies").arg(path);
    }
}
