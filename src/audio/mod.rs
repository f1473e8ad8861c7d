//! Audio acquisition: resolve a video reference to a local audio file.

mod ffmpeg;
mod ytdlp;

pub use ffmpeg::{probe_duration, split_audio};
pub use ytdlp::YtDlpFetcher;

use crate::error::{Result, VidqaError};
use crate::retry::{cancellable, retry_with_backoff, RetryPolicy, Sleeper};
use async_trait::async_trait;
use regex::Regex;
use std::path::{Path, PathBuf};
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Metadata resolved before downloading.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioInfo {
    pub title: String,
    pub duration_seconds: Option<f64>,
}

/// A downloaded audio file and what was known about it.
#[derive(Debug, Clone)]
pub struct AcquiredAudio {
    pub path: PathBuf,
    pub info: AudioInfo,
}

/// Something that can resolve and download a video's audio track.
#[async_trait]
pub trait AudioFetcher: Send + Sync {
    /// Resolve title and duration without downloading.
    async fn probe(&self, url: &str) -> Result<AudioInfo>;

    /// Download the best audio stream as mp3 into `output_dir`, named after
    /// the video title. Returns the path the tool reports.
    async fn download(&self, url: &str, output_dir: &Path) -> Result<PathBuf>;
}

/// Turn user input into a URL: bare 11-character YouTube ids become watch
/// URLs, anything else must be an http(s) URL.
pub fn normalize_video_input(input: &str) -> Result<String> {
    let input = input.trim();

    let bare_id = Regex::new(r"^[a-zA-Z0-9_-]{11}$")
        .map_err(|e| VidqaError::InvalidInput(format!("Invalid video id pattern: {}", e)))?;
    if bare_id.is_match(input) {
        return Ok(format!("https://www.youtube.com/watch?v={}", input));
    }

    match url::Url::parse(input) {
        Ok(url) if matches!(url.scheme(), "http" | "https") => Ok(url.to_string()),
        _ => Err(VidqaError::InvalidInput(format!(
            "Not a video URL or YouTube id: {}",
            input
        ))),
    }
}

/// Fetch the audio for `input` into `output_dir`, retrying failed attempts.
///
/// An attempt whose reported file does not exist counts as failed.
#[instrument(skip(fetcher, policy, sleeper, cancel), fields(output_dir = %output_dir.display()))]
pub async fn acquire_audio(
    fetcher: &dyn AudioFetcher,
    input: &str,
    output_dir: &Path,
    policy: &RetryPolicy,
    sleeper: &dyn Sleeper,
    cancel: &CancellationToken,
) -> Result<AcquiredAudio> {
    let url = normalize_video_input(input)?;
    std::fs::create_dir_all(output_dir)?;

    retry_with_backoff(policy, sleeper, cancel, "Audio download", |_| {
        let url = url.as_str();
        async move {
            let info = cancellable(cancel, fetcher.probe(url)).await?;
            info!("Video title: {}", info.title);
            if let Some(duration) = info.duration_seconds {
                info!("Duration: {} seconds", duration);
            }

            let path = cancellable(cancel, fetcher.download(url, output_dir)).await?;
            if !path.is_file() {
                return Err(VidqaError::DownloadMissing(path));
            }

            info!("Audio downloaded successfully: {}", path.display());
            Ok(AcquiredAudio { path, info })
        }
    })
    .await
}
