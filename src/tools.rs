#![forbid(unsafe_code)]

//! Locations of the external programs the pipelines drive.

use anyhow::{Result, bail};
use std::path::{Path, PathBuf};
use std::process::{Command, Stdio};

use crate::config::ToolPaths;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Toolchain {
    pub yt_dlp: PathBuf,
    pub ffmpeg: PathBuf,
    pub ffprobe: PathBuf,
}

impl Default for Toolchain {
    fn default() -> Self {
        Self::resolve(&ToolPaths::default())
    }
}

impl Toolchain {
    /// Configured paths win; everything else is looked up on `PATH`, falling
    /// back to the bare program name.
    pub fn resolve(paths: &ToolPaths) -> Self {
        Self {
            yt_dlp: paths.yt_dlp.clone().unwrap_or_else(|| locate("yt-dlp")),
            ffmpeg: paths.ffmpeg.clone().unwrap_or_else(|| locate("ffmpeg")),
            ffprobe: paths.ffprobe.clone().unwrap_or_else(|| locate("ffprobe")),
        }
    }

    pub fn yt_dlp_command(&self) -> Command {
        Command::new(&self.yt_dlp)
    }

    pub fn ffmpeg_command(&self) -> Command {
        Command::new(&self.ffmpeg)
    }

    pub fn ffprobe_command(&self) -> Command {
        Command::new(&self.ffprobe)
    }
}

fn locate(name: &str) -> PathBuf {
    which::which(name).unwrap_or_else(|_| PathBuf::from(name))
}

/// Runs `<program> <version_flag>` to fail loudly when a dependency is
/// missing. yt-dlp takes `--version`, the ffmpeg tools take `-version`.
pub fn ensure_program_available(program: &Path, version_flag: &str) -> Result<()> {
    let status = Command::new(program)
        .arg(version_flag)
        .stdout(Stdio::null())
        .stderr(Stdio::null())
        .status();

    match status {
        Ok(status) if status.success() => Ok(()),
        Ok(_) => bail!(
            "{} is installed but returned a failure status",
            program.display()
        ),
        Err(err) => bail!("{} is not installed or not in PATH: {}", program.display(), err),
    }
}
