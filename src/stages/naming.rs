#![forbid(unsafe_code)]

//! Deterministic `<uploader>_<date>.<ext>` naming.

use anyhow::{Context, Result};
use std::path::{Path, PathBuf};
use tracing::info;

use crate::params::{self, Parameters};
use crate::pipeline::Stage;

pub const DEFAULT_UPLOADER: &str = "unknown_uploader";
pub const DEFAULT_DATE: &str = "unknown_date";
pub const DEFAULT_EXTENSION: &str = "mp4";

/// `<uploader>_<date>.<ext>` with spaces and path separators in the uploader
/// replaced by underscores.
pub fn original_filename(uploader: &str, date: &str, ext: &str) -> String {
    let uploader: String = uploader
        .chars()
        .map(|c| if matches!(c, ' ' | '/' | '\\') { '_' } else { c })
        .collect();
    format!("{uploader}_{date}.{ext}")
}

/// Returns `dir/filename` when it is free, otherwise the first free
/// `stem_N.ext` for N = 1, 2, ...
///
/// The check is not atomic: another process may create the file between this
/// call and the download. Concurrent invocations against the same directory
/// are not supported.
pub fn unique_output_path(dir: &Path, filename: &str) -> PathBuf {
    let candidate = dir.join(filename);
    if !candidate.exists() {
        return candidate;
    }
    let (stem, ext) = split_extension(filename);
    (1u64..)
        .map(|counter| dir.join(format!("{stem}_{counter}{ext}")))
        .find(|path| !path.exists())
        .unwrap_or(candidate)
}

/// Splits `name.ext` into (`name`, `.ext`). Dotfiles and names without a dot
/// have an empty extension.
fn split_extension(filename: &str) -> (&str, &str) {
    match filename.rfind('.') {
        Some(index) if index > 0 => filename.split_at(index),
        _ => (filename, ""),
    }
}

pub struct CreateOriginalFilename;

impl Stage for CreateOriginalFilename {
    fn name(&self) -> &str {
        "create_original_filename"
    }

    fn run(&self, params: &Parameters) -> Result<Parameters> {
        let download_path = params
            .get_non_empty_str(params::DOWNLOAD_PATH)
            .context("no download_path to place the video in")?;
        let uploader = params
            .get_str(params::UPLOADER)
            .unwrap_or(DEFAULT_UPLOADER);
        let date = params
            .get_str(params::VIDEO_DATE)
            .unwrap_or(DEFAULT_DATE);
        let ext = params
            .get_non_empty_str(params::EXT)
            .unwrap_or(DEFAULT_EXTENSION);

        let filename = original_filename(uploader, date, ext);
        let dir = Path::new(download_path);
        let dir = std::path::absolute(dir).unwrap_or_else(|_| dir.to_path_buf());
        let unique = unique_output_path(&dir, &filename);

        info!("Generated original filename: {}", unique.display());
        Ok(Parameters::new().with(
            params::ORIGINAL_FILENAME,
            unique.to_string_lossy().into_owned(),
        ))
    }
}
