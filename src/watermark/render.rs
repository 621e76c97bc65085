#![forbid(unsafe_code)]

//! ffprobe/ffmpeg invocations behind the watermark overlay.

use anyhow::{Context, Result, bail};
use std::ffi::OsString;
use std::io::Write;
use std::path::Path;
use std::process::Stdio;
use tracing::debug;

use super::codecs::CodecPair;
use crate::tools::Toolchain;

/// Container duration in seconds, as reported by ffprobe.
pub fn video_duration(toolchain: &Toolchain, input: &Path) -> Result<f64> {
    let output = toolchain
        .ffprobe_command()
        .arg("-v")
        .arg("error")
        .arg("-show_entries")
        .arg("format=duration")
        .arg("-of")
        .arg("default=noprint_wrappers=1:nokey=1")
        .arg(input)
        .output()
        .context("failed to run ffprobe")?;
    if !output.status.success() {
        bail!(
            "ffprobe failed for {} (status {})",
            input.display(),
            output.status
        );
    }
    let raw = String::from_utf8_lossy(&output.stdout);
    let duration = raw
        .trim()
        .parse::<f64>()
        .with_context(|| format!("cannot parse duration {:?}", raw.trim()))?;
    if !duration.is_finite() || duration < 0.0 {
        bail!("ffprobe reported an invalid duration: {duration}");
    }
    Ok(duration)
}

pub(crate) fn build_args(
    input: &Path,
    filter_script: &Path,
    codecs: CodecPair,
    output: &Path,
) -> Vec<OsString> {
    let mut args: Vec<OsString> = ["-hide_banner", "-loglevel", "warning", "-y", "-i"]
        .into_iter()
        .map(OsString::from)
        .collect();
    args.push(input.into());
    args.push("-filter_script:v".into());
    args.push(filter_script.into());
    // First video stream plus the original audio when there is one.
    for arg in ["-map", "0:v:0", "-map", "0:a?", "-c:v", codecs.video, "-c:a", codecs.audio] {
        args.push(arg.into());
    }
    args.push(output.into());
    args
}

/// Burns the filter script into `input`, writing `output` with the given
/// encoders.
pub fn render(
    toolchain: &Toolchain,
    input: &Path,
    filter_script: &str,
    codecs: CodecPair,
    output: &Path,
) -> Result<()> {
    let mut script = tempfile::Builder::new()
        .prefix("watermark-")
        .suffix(".filter")
        .tempfile()
        .context("creating filter script")?;
    script
        .write_all(filter_script.as_bytes())
        .context("writing filter script")?;
    script.flush()?;

    let args = build_args(input, script.path(), codecs, output);
    debug!("ffmpeg args: {:?}", args);

    let status = toolchain
        .ffmpeg_command()
        .args(&args)
        .stdout(Stdio::inherit())
        .stderr(Stdio::inherit())
        .status()
        .context("failed to run ffmpeg")?;
    if !status.success() {
        bail!("ffmpeg exited with status: {status}");
    }
    Ok(())
}
