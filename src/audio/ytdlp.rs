//! yt-dlp backed audio fetcher.

use super::{AudioFetcher, AudioInfo};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, instrument};

/// Downloads audio with the `yt-dlp` command-line tool.
#[derive(Debug, Clone)]
pub struct YtDlpFetcher {
    binary: String,
    audio_quality: String,
}

impl YtDlpFetcher {
    pub fn new() -> Self {
        Self {
            binary: "yt-dlp".to_string(),
            audio_quality: "192K".to_string(),
        }
    }

    fn spawn_error(&self, e: std::io::Error) -> VidqaError {
        if e.kind() == std::io::ErrorKind::NotFound {
            VidqaError::ToolNotFound(self.binary.clone())
        } else {
            VidqaError::AudioDownload(format!("{} execution failed: {}", self.binary, e))
        }
    }

    fn output_template(output_dir: &Path) -> String {
        output_dir
            .join("%(title)s.%(ext)s")
            .to_string_lossy()
            .into_owned()
    }
}

impl Default for YtDlpFetcher {
    fn default() -> Self {
        Self::new()
    }
}

/// Title and duration from `--dump-json` output.
fn parse_info(json: &str) -> Result<AudioInfo> {
    let value: serde_json::Value = serde_json::from_str(json)
        .map_err(|e| VidqaError::AudioDownload(format!("Failed to parse yt-dlp output: {}", e)))?;

    Ok(AudioInfo {
        title: value["title"].as_str().unwrap_or("Unknown Title").to_string(),
        duration_seconds: value["duration"].as_f64(),
    })
}

/// The final file path printed by `--print after_move:filepath`.
fn parse_printed_path(stdout: &str) -> Option<PathBuf> {
    stdout
        .lines()
        .map(str::trim)
        .rfind(|l| !l.is_empty())
        .map(PathBuf::from)
}

#[async_trait]
impl AudioFetcher for YtDlpFetcher {
    #[instrument(skip(self))]
    async fn probe(&self, url: &str) -> Result<AudioInfo> {
        let output = Command::new(&self.binary)
            .args(["--dump-json", "--no-download", "--no-warnings", "--no-playlist", url])
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidqaError::AudioDownload(format!(
                "Could not resolve {}: {}",
                url,
                stderr.trim()
            )));
        }

        parse_info(&String::from_utf8_lossy(&output.stdout))
    }

    #[instrument(skip(self, output_dir))]
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf> {
        debug!("Downloading best audio stream");

        let output = Command::new(&self.binary)
            .arg("--format").arg("bestaudio/best")
            .arg("--extract-audio")
            .arg("--audio-format").arg("mp3")
            .arg("--audio-quality").arg(&self.audio_quality)
            .arg("--output").arg(Self::output_template(output_dir))
            .arg("--no-playlist")
            .arg("--no-warnings")
            .arg("--no-simulate")
            .arg("--print").arg("after_move:filepath")
            .arg(url)
            .stderr(Stdio::piped())
            .output()
            .await
            .map_err(|e| self.spawn_error(e))?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidqaError::AudioDownload(format!("yt-dlp failed: {}", stderr.trim())));
        }

        parse_printed_path(&String::from_utf8_lossy(&output.stdout)).ok_or_else(|| {
            VidqaError::AudioDownload("yt-dlp did not report the downloaded file".into())
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_info() {
        let info = parse_info(r#"{"title": "Rust in 100 Seconds", "duration": 159.0}"#).unwrap();
        assert_eq!(info.title, "Rust in 100 Seconds");
        assert_eq!(info.duration_seconds, Some(159.0));

        let info = parse_info("{}").unwrap();
        assert_eq!(info.title, "Unknown Title");
        assert!(info.duration_seconds.is_none());

        assert!(parse_info("not json").is_err());
    }

    #[test]
    fn test_parse_printed_path_takes_last_line() {
        let stdout = "[info] something\naudio/Rust in 100 Seconds.mp3\n\n";
        assert_eq!(
            parse_printed_path(stdout),
            Some(PathBuf::from("audio/Rust in 100 Seconds.mp3"))
        );
        assert_eq!(parse_printed_path("\n  \n"), None);
    }

    #[test]
    fn test_output_template_uses_title() {
        let template = YtDlpFetcher::output_template(Path::new("audio"));
        assert!(template.ends_with("%(title)s.%(ext)s"));
        assert!(template.starts_with("audio"));
    }
}
