#![forbid(unsafe_code)]

//! Username/date/timestamp text overlays burned into a video with ffmpeg.
//!
//! Parameters come in two shapes. The `watermark` binary builds them from the
//! configuration file ([`WatermarkParams::from_config`]), filling every gap
//! with the configured defaults. The acquisition pipeline builds them from its
//! parameter mapping ([`WatermarkParams::from_parameters`]) and expects the
//! username and date to already be there. Both feed [`add_watermark`].

pub mod codecs;
pub mod overlay;
pub mod render;

use anyhow::{Context, Result, bail};
use chrono::NaiveDate;
use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::{debug, info};

use crate::config::{AppConfig, WatermarkConfig, expand_home_path};
use crate::params::{self, Parameters};
use crate::pipeline::Stage;
use crate::tools::Toolchain;

pub use codecs::{CodecPair, codecs_for_extension};
pub use overlay::{
    Coordinate, Keyword, OverlayPlan, OverlaySpan, Position, TextOverlay, TextStyle,
    timestamp_label, timestamp_overlays,
};

pub const WATERMARK_DATE_FORMAT: &str = "%Y-%m-%d";
const WATERMARK_SUFFIX: &str = "_watermarked";

#[derive(Debug, Error)]
pub enum WatermarkError {
    #[error("missing required parameter: '{0}'")]
    MissingParameter(&'static str),
    #[error("invalid watermark parameters: {0}")]
    InvalidParameters(#[from] serde_json::Error),
}

#[derive(Debug, Clone, PartialEq)]
pub struct WatermarkParams {
    pub input_video_path: PathBuf,
    pub download_path: PathBuf,
    pub username: String,
    pub video_date: String,
    pub style: WatermarkConfig,
}

impl WatermarkParams {
    /// Shape used by the `watermark` binary: the positional argument wins over
    /// `input_video_path` from the config, the label date is `today`. Paths
    /// from the config file get `~` expanded.
    pub fn from_config(
        config: &AppConfig,
        input_override: Option<PathBuf>,
        output_override: Option<PathBuf>,
        today: NaiveDate,
    ) -> Result<Self, WatermarkError> {
        let input_video_path = input_override
            .or_else(|| config.input_video_path.as_deref().map(expand_home_path))
            .filter(|path| !path.as_os_str().is_empty())
            .ok_or(WatermarkError::MissingParameter(params::INPUT_VIDEO_PATH))?;
        Ok(Self {
            input_video_path,
            download_path: output_override.unwrap_or_else(|| config.watermark_output_dir()),
            username: config.user_id.clone(),
            video_date: today.format(WATERMARK_DATE_FORMAT).to_string(),
            style: config.watermark_config.clone(),
        })
    }

    /// Shape used inside the acquisition pipeline. `input_video_path` falls
    /// back to `to_process`; the output directory falls back to
    /// `download_path` and then to the input's own directory. Overlay style
    /// keys that are absent take their configured defaults.
    pub fn from_parameters(params: &Parameters) -> Result<Self, WatermarkError> {
        let input_video_path = params
            .get_non_empty_str(params::INPUT_VIDEO_PATH)
            .or_else(|| params.get_non_empty_str(params::TO_PROCESS))
            .map(PathBuf::from)
            .ok_or(WatermarkError::MissingParameter(params::INPUT_VIDEO_PATH))?;
        let username = params
            .get_str(params::USERNAME)
            .ok_or(WatermarkError::MissingParameter(params::USERNAME))?
            .to_string();
        let video_date = params
            .get_str(params::VIDEO_DATE)
            .ok_or(WatermarkError::MissingParameter(params::VIDEO_DATE))?
            .to_string();
        let download_path = params
            .get_non_empty_str(params::DOWNLOAD_PATH)
            .map(PathBuf::from)
            .or_else(|| input_video_path.parent().map(Path::to_path_buf))
            .unwrap_or_default();
        let style: WatermarkConfig = serde_json::from_value(params.clone().into_value())?;
        Ok(Self {
            input_video_path,
            download_path,
            username,
            video_date,
            style,
        })
    }

    /// Overlays for a video of `duration` seconds.
    pub fn plan(&self, duration: f64) -> OverlayPlan {
        let style = &self.style;
        OverlayPlan {
            username: TextOverlay {
                text: self.username.clone(),
                color: style.username_color.clone(),
                position: style.username_position,
                span: OverlaySpan::Full,
            },
            date: TextOverlay {
                text: self.video_date.clone(),
                color: style.date_color.clone(),
                position: style.date_position,
                span: OverlaySpan::Full,
            },
            timestamps: timestamp_overlays(
                duration,
                &style.timestamp_color,
                style.timestamp_position,
            ),
        }
    }

    pub fn output_path(&self) -> Result<PathBuf> {
        watermarked_output_path(&self.input_video_path, &self.download_path)
    }
}

/// `<dir>/<stem>_watermarked<.ext>`
pub fn watermarked_output_path(input: &Path, dir: &Path) -> Result<PathBuf> {
    let stem = input
        .file_stem()
        .with_context(|| format!("{} has no file name", input.display()))?
        .to_string_lossy();
    let file_name = match input.extension() {
        Some(ext) => format!("{stem}{WATERMARK_SUFFIX}.{}", ext.to_string_lossy()),
        None => format!("{stem}{WATERMARK_SUFFIX}"),
    };
    Ok(dir.join(file_name))
}

/// Renders the username, date and per-second timestamp overlays onto the
/// input video and returns the path of the watermarked copy.
pub fn add_watermark(toolchain: &Toolchain, params: &WatermarkParams) -> Result<PathBuf> {
    debug!("Received watermark parameters: {params:?}");
    let input = params.input_video_path.as_path();
    if !input.is_file() {
        bail!("input video not found: {}", input.display());
    }

    let output = params.output_path()?;
    let extension = input
        .extension()
        .map(|ext| ext.to_string_lossy().into_owned())
        .unwrap_or_default();
    let codecs = codecs_for_extension(&extension);

    let duration = render::video_duration(toolchain, input)?;
    let plan = params.plan(duration);
    debug!(
        "Planned {} timestamp overlays for {:.2}s of video",
        plan.timestamps.len(),
        duration
    );
    let script = plan.to_filter_script(&TextStyle {
        font: &params.style.font,
        font_size: params.style.font_size,
    });

    debug!("Exporting watermarked video to: {}", output.display());
    render::render(toolchain, input, &script, codecs, &output)
        .with_context(|| format!("watermarking {}", input.display()))?;
    info!("Watermarked video saved to: {}", output.display());
    Ok(output)
}

/// Pipeline stage that watermarks the downloaded file and points
/// `to_process` at the result.
pub struct WatermarkStage {
    toolchain: Toolchain,
}

impl WatermarkStage {
    pub fn new(toolchain: Toolchain) -> Self {
        Self { toolchain }
    }
}

impl Stage for WatermarkStage {
    fn name(&self) -> &str {
        "add_watermark"
    }

    fn run(&self, params: &Parameters) -> Result<Parameters> {
        let watermark = WatermarkParams::from_parameters(params)?;
        let output = add_watermark(&self.toolchain, &watermark)?;
        Ok(Parameters::new().with(params::TO_PROCESS, output.to_string_lossy().into_owned()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::tools::stubs;
    use serde_json::json;
    use std::fs;

    fn day() -> NaiveDate {
        NaiveDate::from_ymd_opt(2024, 3, 9).unwrap()
    }

    fn config(json: serde_json::Value) -> AppConfig {
        serde_json::from_value(json).unwrap()
    }

    #[test]
    fn from_config_requires_input_path() {
        let config = config(json!({"target_usb_mount": "/m"}));
        let err = WatermarkParams::from_config(&config, None, None, day()).unwrap_err();
        assert!(matches!(
            err,
            WatermarkError::MissingParameter(params::INPUT_VIDEO_PATH)
        ));
        assert_eq!(
            err.to_string(),
            "missing required parameter: 'input_video_path'"
        );
    }

    #[test]
    fn from_config_prefers_positional_input_and_uses_defaults() {
        let config = config(json!({
            "target_usb_mount": "/m",
            "input_video_path": "/videos/from_config.mp4",
            "user_id": "archivist"
        }));
        let params = WatermarkParams::from_config(
            &config,
            Some(PathBuf::from("/videos/cli.mp4")),
            None,
            day(),
        )
        .unwrap();
        assert_eq!(params.input_video_path, PathBuf::from("/videos/cli.mp4"));
        assert_eq!(params.download_path, PathBuf::from("/tmp/"));
        assert_eq!(params.username, "archivist");
        assert_eq!(params.video_date, "2024-03-09");
        assert_eq!(params.style, WatermarkConfig::default());

        let fallback = WatermarkParams::from_config(&config, None, None, day()).unwrap();
        assert_eq!(
            fallback.input_video_path,
            PathBuf::from("/videos/from_config.mp4")
        );
    }

    #[test]
    fn from_config_expands_home_in_configured_paths() {
        let config = config(json!({
            "input_video_path": "~/videos/clip.mp4",
            "download_path": "~/exports"
        }));
        let params = WatermarkParams::from_config(&config, None, None, day()).unwrap();
        assert_eq!(
            params.input_video_path,
            crate::config::expand_home("~/videos/clip.mp4")
        );
        assert_eq!(params.download_path, crate::config::expand_home("~/exports"));
        if dirs::home_dir().is_some() {
            assert!(!params.input_video_path.starts_with("~"));
            assert!(!params.download_path.starts_with("~"));
        }
    }

    #[test]
    fn from_parameters_requires_input_before_anything_else() {
        let params = Parameters::new();
        let err = WatermarkParams::from_parameters(&params).unwrap_err();
        assert!(matches!(
            err,
            WatermarkError::MissingParameter(params::INPUT_VIDEO_PATH)
        ));
    }

    #[test]
    fn from_parameters_falls_back_to_to_process() {
        let params = Parameters::new()
            .with(params::TO_PROCESS, "/out/2024-01-01/Jane_Doe_20240101.mp4")
            .with(params::USERNAME, "archivist")
            .with(params::VIDEO_DATE, "20240101")
            .with("font_size", 30)
            .with("timestamp_position", json!(["center", "top"]));
        let watermark = WatermarkParams::from_parameters(&params).unwrap();
        assert_eq!(
            watermark.input_video_path,
            PathBuf::from("/out/2024-01-01/Jane_Doe_20240101.mp4")
        );
        assert_eq!(watermark.download_path, PathBuf::from("/out/2024-01-01"));
        assert_eq!(watermark.style.font_size, 30);
        assert_eq!(
            watermark.style.timestamp_position,
            Position::keywords(Keyword::Center, Keyword::Top)
        );
        assert_eq!(watermark.style.font, crate::config::DEFAULT_FONT);
    }

    #[test]
    fn from_parameters_requires_username_and_date() {
        let params = Parameters::new().with(params::INPUT_VIDEO_PATH, "/v.mp4");
        assert!(matches!(
            WatermarkParams::from_parameters(&params).unwrap_err(),
            WatermarkError::MissingParameter(params::USERNAME)
        ));
        let params = params.with(params::USERNAME, "me");
        assert!(matches!(
            WatermarkParams::from_parameters(&params).unwrap_err(),
            WatermarkError::MissingParameter(params::VIDEO_DATE)
        ));
    }

    #[test]
    fn from_parameters_rejects_malformed_style() {
        let params = Parameters::new()
            .with(params::INPUT_VIDEO_PATH, "/v.mp4")
            .with(params::USERNAME, "me")
            .with(params::VIDEO_DATE, "today")
            .with("font_size", "huge");
        assert!(matches!(
            WatermarkParams::from_parameters(&params).unwrap_err(),
            WatermarkError::InvalidParameters(_)
        ));
    }

    #[test]
    fn watermarked_output_path_keeps_extension() {
        assert_eq!(
            watermarked_output_path(Path::new("/in/Jane_Doe_20240101.webm"), Path::new("/out"))
                .unwrap(),
            PathBuf::from("/out/Jane_Doe_20240101_watermarked.webm")
        );
        assert_eq!(
            watermarked_output_path(Path::new("/in/raw"), Path::new("/out")).unwrap(),
            PathBuf::from("/out/raw_watermarked")
        );
    }

    #[test]
    fn plan_for_three_seconds_has_three_timestamps() {
        let config = config(json!({"target_usb_mount": "/m", "input_video_path": "/v.mp4"}));
        let params = WatermarkParams::from_config(&config, None, None, day()).unwrap();
        let plan = params.plan(3.0);

        assert_eq!(plan.username.text, "DefaultUser");
        assert_eq!(plan.username.span, OverlaySpan::Full);
        assert_eq!(plan.date.text, "2024-03-09");
        let labels: Vec<(&str, OverlaySpan)> = plan
            .timestamps
            .iter()
            .map(|clip| (clip.text.as_str(), clip.span))
            .collect();
        assert_eq!(
            labels,
            vec![
                ("00:00:00", OverlaySpan::Window { start: 0, duration: 1 }),
                ("00:00:01", OverlaySpan::Window { start: 1, duration: 1 }),
                ("00:00:02", OverlaySpan::Window { start: 2, duration: 1 }),
            ]
        );
    }

    #[test]
    fn add_watermark_fails_for_missing_input() {
        let params = WatermarkParams {
            input_video_path: PathBuf::from("/definitely/not/here.mp4"),
            download_path: PathBuf::from("/tmp"),
            username: "me".into(),
            video_date: "today".into(),
            style: WatermarkConfig::default(),
        };
        let err = add_watermark(&Toolchain::default(), &params).unwrap_err();
        assert!(err.to_string().contains("input video not found"));
    }

    #[cfg(unix)]
    #[test]
    fn add_watermark_renders_with_extension_codecs() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("clip.webm");
        fs::write(&input, "video-bytes")?;
        let out_dir = dir.path().join("out");
        fs::create_dir_all(&out_dir)?;
        let toolchain = stubs::toolchain(
            PathBuf::from("yt-dlp"),
            stubs::install_ffmpeg(dir.path())?,
            stubs::install_ffprobe(dir.path(), "3.2")?,
        );
        let params = WatermarkParams {
            input_video_path: input,
            download_path: out_dir.clone(),
            username: "archivist".into(),
            video_date: "2024-03-09".into(),
            style: WatermarkConfig::default(),
        };

        let output = add_watermark(&toolchain, &params)?;

        assert_eq!(output, out_dir.join("clip_watermarked.webm"));
        assert!(output.exists());
        let args = fs::read_to_string(dir.path().join("ffmpeg.args"))?;
        assert!(args.contains("-c:v libvpx"));
        assert!(args.contains("-c:a libvorbis"));
        let script = fs::read_to_string(dir.path().join("ffmpeg.filter"))?;
        assert_eq!(script.matches("drawtext=").count(), 5);
        assert!(script.contains("text=archivist:"));
        assert!(script.contains(r"text=00\\:00\\:02"));
        assert!(!script.contains(r"text=00\\:00\\:03"));
        Ok(())
    }

    #[cfg(unix)]
    #[test]
    fn stage_points_to_process_at_watermarked_file() -> Result<()> {
        let dir = tempfile::tempdir()?;
        let input = dir.path().join("Jane_Doe_20240101.mp4");
        fs::write(&input, "video-bytes")?;
        let toolchain = stubs::toolchain(
            PathBuf::from("yt-dlp"),
            stubs::install_ffmpeg(dir.path())?,
            stubs::install_ffprobe(dir.path(), "1.0")?,
        );
        let params = Parameters::new()
            .with(params::TO_PROCESS, input.to_string_lossy().into_owned())
            .with(params::USERNAME, "archivist")
            .with(params::VIDEO_DATE, "20240101");

        let delta = WatermarkStage::new(toolchain).run(&params)?;
        assert_eq!(
            delta.get_str(params::TO_PROCESS).map(PathBuf::from),
            Some(dir.path().join("Jane_Doe_20240101_watermarked.mp4"))
        );
        Ok(())
    }
}
