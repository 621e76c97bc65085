//! Shared fixtures for the CLI tests: a scratch working directory with a
//! `conf/app_config.json`, today's archive directory and bash stand-ins for
//! yt-dlp, ffprobe and ffmpeg.

#![allow(dead_code)]

use serde_json::{Value, json};
use std::fs;
use std::os::unix::fs::PermissionsExt;
use std::path::{Path, PathBuf};
use tempfile::TempDir;

pub struct Workspace {
    pub root: TempDir,
}

impl Workspace {
    pub fn new() -> Self {
        let root = tempfile::tempdir().expect("temp dir");
        fs::create_dir_all(root.path().join("conf")).expect("conf dir");
        fs::create_dir_all(root.path().join("bin")).expect("bin dir");
        Self { root }
    }

    pub fn path(&self) -> &Path {
        self.root.path()
    }

    pub fn mount(&self) -> PathBuf {
        self.path().join("usb")
    }

    /// `<mount>/<today>`, created.
    pub fn create_today_dir(&self) -> PathBuf {
        let today = chrono::Local::now().date_naive().format("%Y-%m-%d").to_string();
        let dir = self.mount().join(today);
        fs::create_dir_all(&dir).expect("dated dir");
        dir
    }

    pub fn bin(&self, name: &str) -> PathBuf {
        self.path().join("bin").join(name)
    }

    /// Writes the base config overlaid with `extra`. A `null` in `extra`
    /// removes that key.
    pub fn write_config(&self, extra: Value) -> PathBuf {
        let mut config = json!({
            "target_usb_mount": self.mount(),
            "user_id": "archivist",
            "logging": {"log_filename": self.path().join("logs").join("app.log")},
            "tools": {
                "yt_dlp": self.bin("yt-dlp"),
                "ffmpeg": self.bin("ffmpeg"),
                "ffprobe": self.bin("ffprobe"),
            }
        });
        if let (Some(base), Value::Object(extra)) = (config.as_object_mut(), extra) {
            base.extend(extra);
            base.retain(|_, value| !value.is_null());
        }
        let path = self.path().join("conf").join("app_config.json");
        fs::write(&path, serde_json::to_string_pretty(&config).unwrap()).expect("config");
        path
    }

    /// yt-dlp printing `info_json` for metadata requests and writing a fake
    /// video to `--output` otherwise.
    pub fn install_ytdlp(&self, info_json: &str) {
        let log = self.path().join("yt-dlp.args");
        self.install(
            "yt-dlp",
            &format!(
                r#"[[ "${{1:-}}" == "--version" ]] && {{ echo 2024.01.01; exit 0; }}
echo "$@" >> '{log}'
output=""
dump=0
while [[ $# -gt 0 ]]; do
  case "$1" in
    --output) shift; output="$1" ;;
    --dump-single-json) dump=1 ;;
  esac
  shift
done
if [[ $dump -eq 1 ]]; then
  cat <<'JSON'
{info_json}
JSON
  exit 0
fi
printf 'video-bytes' > "$output"
"#,
                log = log.display()
            ),
        );
    }

    /// yt-dlp that answers `--version` but fails metadata extraction while
    /// still downloading.
    pub fn install_ytdlp_without_metadata(&self) {
        self.install(
            "yt-dlp",
            r#"[[ "${1:-}" == "--version" ]] && exit 0
output=""
while [[ $# -gt 0 ]]; do
  case "$1" in
    --dump-single-json) echo 'ERROR: private video' >&2; exit 1 ;;
    --output) shift; output="$1" ;;
  esac
  shift
done
printf 'video-bytes' > "$output"
"#,
        );
    }

    pub fn install_ffprobe(&self, duration: &str) {
        self.install(
            "ffprobe",
            &format!("[[ \"${{1:-}}\" == \"-version\" ]] && exit 0\necho '{duration}'\n"),
        );
    }

    /// ffmpeg that keeps a copy of the filter script and its arguments.
    pub fn install_ffmpeg(&self) {
        let log = self.path().join("ffmpeg.args");
        let script_copy = self.path().join("ffmpeg.filter");
        self.install(
            "ffmpeg",
            &format!(
                r#"[[ "${{1:-}}" == "-version" ]] && exit 0
echo "$@" >> '{log}'
args=("$@")
for ((i = 0; i < ${{#args[@]}}; i++)); do
  if [[ "${{args[$i]}}" == "-filter_script:v" ]]; then
    cp "${{args[$((i + 1))]}}" '{script_copy}'
  fi
done
printf 'watermarked' > "${{args[-1]}}"
"#,
                log = log.display(),
                script_copy = script_copy.display()
            ),
        );
    }

    pub fn read(&self, name: &str) -> String {
        fs::read_to_string(self.path().join(name)).unwrap_or_default()
    }

    fn install(&self, name: &str, body: &str) {
        let path = self.bin(name);
        fs::write(&path, format!("#!/usr/bin/env bash\nset -eu\n{body}")).expect("stub");
        let mut perms = fs::metadata(&path).expect("stub metadata").permissions();
        perms.set_mode(0o755);
        fs::set_permissions(&path, perms).expect("stub permissions");
    }
}
