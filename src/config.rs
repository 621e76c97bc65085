#![forbid(unsafe_code)]

//! Loading and validating `conf/app_config.json`.
//!
//! Every key the binaries read is enumerated in [`AppConfig`] and every
//! default lives in this file. Callers never fall back to ad hoc literals.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use std::{
    fs, io,
    path::{Path, PathBuf},
};
use thiserror::Error;

use crate::watermark::{Coordinate, Keyword, Position};

pub const DEFAULT_CONFIG_PATH: &str = "./conf/app_config.json";
pub const DEFAULT_USER_ID: &str = "DefaultUser";
pub const DEFAULT_WATERMARK_OUTPUT_DIR: &str = "/tmp/";
pub const DEFAULT_VIDEO_FORMAT: &str = "bestvideo+bestaudio/best";
pub const DEFAULT_FONT: &str = "Arial-Bold";
pub const DEFAULT_FONT_SIZE: u32 = 48;
pub const DEFAULT_USERNAME_COLOR: &str = "yellow";
pub const DEFAULT_DATE_COLOR: &str = "cyan";
pub const DEFAULT_TIMESTAMP_COLOR: &str = "red";
pub const DEFAULT_FILE_LOG_LEVEL: &str = "debug";
pub const DOWNLOAD_DATE_FORMAT: &str = "%Y-%m-%d";

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("configuration file '{}' not found", .0.display())]
    NotFound(PathBuf),
    #[error("reading configuration file '{}'", .path.display())]
    Read {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("parsing configuration file '{}'", .path.display())]
    Parse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },
    #[error("missing required setting: {0}")]
    Missing(&'static str),
    #[error("invalid {field}: {reason}")]
    Invalid { field: &'static str, reason: String },
    #[error("directory not found: {}", .0.display())]
    MissingDirectory(PathBuf),
    #[error("creating log directory '{}'", .path.display())]
    LogDirectory {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AppConfig {
    /// Archive root for acquisitions. Only `acquire` needs it.
    #[serde(default)]
    pub target_usb_mount: Option<PathBuf>,
    #[serde(default)]
    pub cookie_path: Option<String>,
    #[serde(default)]
    pub logging: LoggingConfig,
    #[serde(default)]
    pub watermark_config: WatermarkConfig,
    #[serde(default = "default_user_id")]
    pub user_id: String,
    #[serde(default)]
    pub input_video_path: Option<PathBuf>,
    #[serde(default)]
    pub download_path: Option<PathBuf>,
    #[serde(default)]
    pub metadata_path: Option<String>,
    #[serde(default)]
    pub video_download: VideoDownloadConfig,
    #[serde(default)]
    pub tools: ToolPaths,
}

#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct LoggingConfig {
    #[serde(default)]
    pub log_filename: Option<String>,
    #[serde(default)]
    pub level: Option<String>,
}

impl LoggingConfig {
    pub fn file_level(&self) -> &str {
        self.level.as_deref().unwrap_or(DEFAULT_FILE_LOG_LEVEL)
    }
}

/// Text overlay settings. The keys are flattened verbatim into the
/// acquisition parameters, so the serialized names double as parameter keys.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct WatermarkConfig {
    pub font: String,
    pub font_size: u32,
    pub username_color: String,
    pub date_color: String,
    pub timestamp_color: String,
    pub username_position: Position,
    pub date_position: Position,
    pub timestamp_position: Position,
}

impl Default for WatermarkConfig {
    fn default() -> Self {
        Self {
            font: DEFAULT_FONT.to_string(),
            font_size: DEFAULT_FONT_SIZE,
            username_color: DEFAULT_USERNAME_COLOR.to_string(),
            date_color: DEFAULT_DATE_COLOR.to_string(),
            timestamp_color: DEFAULT_TIMESTAMP_COLOR.to_string(),
            username_position: Position::keywords(Keyword::Left, Keyword::Top),
            date_position: Position::keywords(Keyword::Left, Keyword::Bottom),
            timestamp_position: Position::keywords(Keyword::Right, Keyword::Bottom),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct VideoDownloadConfig {
    pub format: String,
    pub noplaylist: bool,
    pub write_info_json: bool,
}

impl Default for VideoDownloadConfig {
    fn default() -> Self {
        Self {
            format: DEFAULT_VIDEO_FORMAT.to_string(),
            noplaylist: true,
            write_info_json: true,
        }
    }
}

/// Optional explicit locations for the external programs. Unset entries are
/// looked up on `PATH`.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct ToolPaths {
    #[serde(default)]
    pub yt_dlp: Option<PathBuf>,
    #[serde(default)]
    pub ffmpeg: Option<PathBuf>,
    #[serde(default)]
    pub ffprobe: Option<PathBuf>,
}

fn default_user_id() -> String {
    DEFAULT_USER_ID.to_string()
}

pub fn load_app_config(path: &Path) -> Result<AppConfig, ConfigError> {
    let raw = match fs::read_to_string(path) {
        Ok(raw) => raw,
        Err(err) if err.kind() == io::ErrorKind::NotFound => {
            return Err(ConfigError::NotFound(path.to_path_buf()));
        }
        Err(source) => {
            return Err(ConfigError::Read {
                path: path.to_path_buf(),
                source,
            });
        }
    };
    parse_app_config(&raw, path)
}

fn parse_app_config(raw: &str, path: &Path) -> Result<AppConfig, ConfigError> {
    let config: AppConfig = serde_json::from_str(raw).map_err(|source| ConfigError::Parse {
        path: path.to_path_buf(),
        source,
    })?;
    config.validate()?;
    Ok(config)
}

impl AppConfig {
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self
            .target_usb_mount
            .as_ref()
            .is_some_and(|mount| mount.as_os_str().is_empty())
        {
            return Err(ConfigError::Invalid {
                field: "target_usb_mount",
                reason: "must not be empty".into(),
            });
        }
        let watermark = &self.watermark_config;
        if watermark.font_size == 0 {
            return Err(ConfigError::Invalid {
                field: "watermark_config.font_size",
                reason: "must be positive".into(),
            });
        }
        for (field, position) in [
            ("watermark_config.username_position", watermark.username_position),
            ("watermark_config.date_position", watermark.date_position),
            ("watermark_config.timestamp_position", watermark.timestamp_position),
        ] {
            validate_position(field, position)?;
        }
        if self.video_download.format.trim().is_empty() {
            return Err(ConfigError::Invalid {
                field: "video_download.format",
                reason: "must not be empty".into(),
            });
        }
        Ok(())
    }

    /// Output directory of the watermark binary.
    pub fn watermark_output_dir(&self) -> PathBuf {
        self.download_path
            .as_deref()
            .map(expand_home_path)
            .unwrap_or_else(|| PathBuf::from(DEFAULT_WATERMARK_OUTPUT_DIR))
    }
}

fn validate_position(field: &'static str, position: Position) -> Result<(), ConfigError> {
    let Position(horizontal, vertical) = position;
    if let Coordinate::Keyword(Keyword::Top | Keyword::Bottom) = horizontal {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{horizontal} is not a horizontal anchor"),
        });
    }
    if let Coordinate::Keyword(Keyword::Left | Keyword::Right) = vertical {
        return Err(ConfigError::Invalid {
            field,
            reason: format!("{vertical} is not a vertical anchor"),
        });
    }
    Ok(())
}

/// Filesystem locations derived from the configuration for one acquisition
/// run.
#[derive(Debug, Clone)]
pub struct RuntimePaths {
    pub download_path: PathBuf,
    pub log_file: Option<PathBuf>,
    pub cookie_path: Option<PathBuf>,
}

/// Expands a leading `~` to the user's home directory.
pub fn expand_home(value: &str) -> PathBuf {
    expand_home_with(value, dirs::home_dir)
}

fn expand_home_with(value: &str, home: impl Fn() -> Option<PathBuf>) -> PathBuf {
    let rest = if value == "~" {
        Some("")
    } else {
        value.strip_prefix("~/")
    };
    match (rest, home()) {
        (Some(rest), Some(home)) if rest.is_empty() => home,
        (Some(rest), Some(home)) => home.join(rest),
        _ => PathBuf::from(value),
    }
}

/// [`expand_home`] for values already parsed as paths.
pub fn expand_home_path(path: &Path) -> PathBuf {
    match path.to_str() {
        Some(value) => expand_home(value),
        None => path.to_path_buf(),
    }
}

/// `<target_usb_mount>/<YYYY-MM-DD>` for the given day.
pub fn dated_download_path(target: &Path, today: NaiveDate) -> PathBuf {
    let dir = target.join(today.format(DOWNLOAD_DATE_FORMAT).to_string());
    std::path::absolute(&dir).unwrap_or(dir)
}

/// Resolves and checks every directory an acquisition run needs. The dated
/// download directory must already exist; the log directory is created.
pub fn resolve_runtime_paths(
    config: &AppConfig,
    today: NaiveDate,
) -> Result<RuntimePaths, ConfigError> {
    let target = config
        .target_usb_mount
        .as_deref()
        .ok_or(ConfigError::Missing("target_usb_mount"))?;
    let download_path = dated_download_path(&expand_home_path(target), today);
    if !download_path.is_dir() {
        return Err(ConfigError::MissingDirectory(download_path));
    }
    let log_file = prepare_log_file(&config.logging)?;
    let cookie_path = existing_cookie_path(config.cookie_path.as_deref());
    Ok(RuntimePaths {
        download_path,
        log_file,
        cookie_path,
    })
}

/// Expands the configured log file name and creates its parent directory.
pub fn prepare_log_file(logging: &LoggingConfig) -> Result<Option<PathBuf>, ConfigError> {
    let Some(raw) = logging
        .log_filename
        .as_deref()
        .filter(|value| !value.trim().is_empty())
    else {
        return Ok(None);
    };
    let log_file = expand_home(raw.trim());
    if let Some(parent) = log_file.parent()
        && !parent.as_os_str().is_empty()
        && !parent.exists()
    {
        fs::create_dir_all(parent).map_err(|source| ConfigError::LogDirectory {
            path: parent.to_path_buf(),
            source,
        })?;
    }
    Ok(Some(log_file))
}

/// The cookie file is used only if it exists; otherwise it is silently
/// dropped.
pub fn existing_cookie_path(raw: Option<&str>) -> Option<PathBuf> {
    let raw = raw.map(str::trim).filter(|value| !value.is_empty())?;
    let path = expand_home(raw);
    path.is_file().then_some(path)
}
