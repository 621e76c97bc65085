#![forbid(unsafe_code)]

use anyhow::{Context, Result};
use std::fs;
use std::path::{Path, PathBuf};
use tracing::{error, info};

use crate::params::{self, Parameters};
use crate::pipeline::Stage;

/// `<dir>/<stem>.json` next to the video.
pub fn params_json_path(video: &Path) -> PathBuf {
    video.with_extension("json")
}

/// Writes the full mapping as pretty JSON.
pub fn store_params(params: &Parameters, path: &Path) -> Result<()> {
    let payload = params
        .to_json_pretty()
        .context("serializing parameters")?;
    fs::write(path, payload).with_context(|| format!("writing {}", path.display()))
}

pub struct StoreParams;

impl Stage for StoreParams {
    fn name(&self) -> &str {
        "store_params_as_json"
    }

    fn run(&self, params: &Parameters) -> Result<Parameters> {
        let Some(video) = params.get_non_empty_str(params::ORIGINAL_FILENAME) else {
            error!("No original filename found to save parameters.");
            return Ok(Parameters::new());
        };
        let path = params_json_path(Path::new(video));
        store_params(params, &path)?;
        info!("Parameters saved to {}", path.display());
        Ok(Parameters::new())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::Value;

    #[test]
    fn params_json_path_swaps_extension() {
        assert_eq!(
            params_json_path(Path::new("/media/2024-01-01/Jane_Doe_20240101.mp4")),
            PathBuf::from("/media/2024-01-01/Jane_Doe_20240101.json")
        );
        assert_eq!(
            params_json_path(Path::new("/media/clip")),
            PathBuf::from("/media/clip.json")
        );
    }

    #[test]
    fn writes_every_key_beside_the_video() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("Jane_Doe_20240101.mp4");
        let params = Parameters::new()
            .with(params::URL, "https://example.com/v1")
            .with(params::ORIGINAL_FILENAME, video.to_string_lossy().into_owned())
            .with("duration", 93);

        let delta = StoreParams.run(&params).unwrap();
        assert!(delta.is_empty());

        let saved: Value =
            serde_json::from_str(&fs::read_to_string(dir.path().join("Jane_Doe_20240101.json")).unwrap())
                .unwrap();
        assert_eq!(saved, params.into_value());
    }

    #[test]
    fn missing_original_filename_is_logged_not_raised() {
        let params = Parameters::new().with(params::URL, "https://example.com/v1");
        assert!(StoreParams.run(&params).unwrap().is_empty());
    }

    #[test]
    fn unwritable_destination_is_a_stage_error() {
        let dir = tempfile::tempdir().unwrap();
        let video = dir.path().join("missing").join("a.mp4");
        let params = Parameters::new()
            .with(params::ORIGINAL_FILENAME, video.to_string_lossy().into_owned());
        assert!(StoreParams.run(&params).is_err());
    }
}
