#![forbid(unsafe_code)]

//! Metadata extraction and masking.

use anyhow::{Context, Result};
use serde_json::Value;
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{debug, error, info};

use crate::params::{self, Parameters};
use crate::pipeline::Stage;
use crate::tools::Toolchain;
use crate::ytdlp;

/// Fields copied through unchanged (after the renamed ones).
const PASSTHROUGH_KEYS: &[&str] = &[
    "uploader",
    "file_path",
    "duration",
    "width",
    "height",
    "id",
    "ext",
    "resolution",
    "fps",
    "channels",
    "filesize",
    "tbr",
    "protocol",
    "vcodec",
    "vbr",
    "acodec",
    "abr",
    "asr",
];

/// Projects the site metadata down to the allow-listed fields. Missing and
/// null fields are left out; the title has its spaces replaced with
/// underscores.
pub fn mask_metadata(info: &Value) -> Parameters {
    let Some(info) = info.as_object() else {
        return Parameters::new();
    };
    let present = |key: &str| info.get(key).filter(|value| !value.is_null());

    let mut masked = Parameters::new();
    if let Some(title) = present("title").and_then(Value::as_str) {
        masked = masked.with(params::VIDEO_TITLE, title.replace(' ', "_"));
    }
    if let Some(date) = present("upload_date") {
        masked = masked.with(params::VIDEO_DATE, date.clone());
    }
    for &key in PASSTHROUGH_KEYS {
        if let Some(value) = present(key) {
            masked = masked.with(key, value.clone());
        }
    }
    masked
}

pub struct MaskMetadata {
    toolchain: Toolchain,
}

impl MaskMetadata {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }

    fn extract(&self, params: &Parameters) -> Result<Value> {
        let url = params
            .get_non_empty_str(params::URL)
            .context("no URL to extract metadata from")?;
        let cookies = params.get_non_empty_str(params::COOKIE_PATH).map(PathBuf::from);
        let info = ytdlp::fetch_info(&self.toolchain, url, cookies.as_deref())?;

        if let Some(path) = params.get_non_empty_str(params::METADATA_PATH) {
            write_raw_metadata(Path::new(path), &info)?;
            info!("Metadata saved to {path}");
        }
        Ok(info)
    }
}

fn write_raw_metadata(path: &Path, info: &Value) -> Result<()> {
    let payload = serde_json::to_string_pretty(info).context("serializing metadata")?;
    fs::write(path, payload).with_context(|| format!("writing {}", path.display()))
}

impl Stage for MaskMetadata {
    fn name(&self) -> &str {
        "mask_metadata"
    }

    /// Never fails: extraction errors are logged and produce an empty delta
    /// so naming and download still run with their defaults.
    fn run(&self, params: &Parameters) -> Result<Parameters> {
        info!("Masking metadata");
        let masked = match self.extract(params) {
            Ok(info) => mask_metadata(&info),
            Err(err) => {
                error!("Failed to extract metadata: {err}");
                debug!("{err:?}");
                Parameters::new()
            }
        };
        for (key, value) in masked.iter() {
            info!("{key}: {value}");
        }
        info!("Metadata masking complete");
        Ok(masked)
    }
}
