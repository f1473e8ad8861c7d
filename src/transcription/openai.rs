//! Hosted transcription through the OpenAI audio API.

use super::{Transcriber, Transcript};
use crate::audio::split_audio;
use crate::config::TranscriptionSettings;
use crate::error::{Result, VidqaError};
use crate::openai::{classify_openai_error, OpenAIClient};
use async_openai::types::{AudioInput, AudioResponseFormat, CreateTranscriptionRequestArgs};
use async_trait::async_trait;
use futures::stream::{self, StreamExt};
use indicatif::{ProgressBar, ProgressStyle};
use std::path::Path;
use tracing::{debug, info, instrument};

/// OpenAI API based transcriber.
pub struct OpenAITranscriber {
    client: OpenAIClient,
    model: String,
    segment_seconds: u32,
    max_concurrent_segments: usize,
}

impl OpenAITranscriber {
    pub fn new(client: OpenAIClient, settings: &TranscriptionSettings) -> Self {
        Self {
            client,
            model: settings.api_model.clone(),
            segment_seconds: settings.chunk_duration_seconds,
            max_concurrent_segments: settings.max_concurrent_chunks.max(1),
        }
    }

    /// Transcribe one file small enough for a single upload.
    #[instrument(skip(self), fields(audio_path = %audio_path.display()))]
    async fn transcribe_single(&self, audio_path: &Path) -> Result<String> {
        let file_bytes = tokio::fs::read(audio_path).await?;
        let file_name = audio_path
            .file_name()
            .and_then(|n| n.to_str())
            .unwrap_or("audio.mp3")
            .to_string();

        let request = CreateTranscriptionRequestArgs::default()
            .file(AudioInput::from_vec_u8(file_name, file_bytes))
            .model(&self.model)
            .response_format(AudioResponseFormat::Json)
            .build()
            .map_err(|e| VidqaError::Transcription(format!("Failed to build request: {}", e)))?;

        let response = self
            .client
            .audio()
            .transcribe(request)
            .await
            .map_err(|e| classify_openai_error(e, "Transcription API error"))?;

        Ok(response.text.trim().to_string())
    }
}

#[async_trait]
impl Transcriber for OpenAITranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), model = %self.model))]
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let temp_dir = tempfile::tempdir()?;
        let segments = split_audio(audio_path, temp_dir.path(), self.segment_seconds).await?;

        if segments.len() == 1 {
            let text = self.transcribe_single(audio_path).await?;
            return Ok(Transcript::new(audio_path, text));
        }

        let count = segments.len();
        info!("Processing {} audio segments with {}", count, self.model);

        let pb = ProgressBar::new(count as u64);
        pb.set_style(
            ProgressStyle::default_bar()
                .template("  {spinner:.green} Transcribing [{bar:30.cyan/blue}] {pos}/{len}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▓░"),
        );

        let mut stream = stream::iter(segments.into_iter().enumerate())
            .map(|(idx, (path, offset))| async move {
                (idx, offset, self.transcribe_single(&path).await)
            })
            .buffer_unordered(self.max_concurrent_segments);

        let mut parts: Vec<(usize, String)> = Vec::with_capacity(count);
        while let Some((idx, offset, result)) = stream.next().await {
            pb.inc(1);
            match result {
                Ok(text) => parts.push((idx, text)),
                Err(e) => {
                    pb.finish_and_clear();
                    return Err(match e {
                        VidqaError::RateLimited(_)
                        | VidqaError::Authentication(_)
                        | VidqaError::Connection(_) => e,
                        other => VidqaError::Transcription(format!(
                            "Segment {} at {:.0}s failed: {}",
                            idx, offset, other
                        )),
                    });
                }
            }
        }
        pb.finish_and_clear();

        parts.sort_by_key(|(idx, _)| *idx);
        let text = parts
            .into_iter()
            .map(|(_, text)| text)
            .filter(|t| !t.is_empty())
            .collect::<Vec<_>>()
            .join(" ");

        debug!("Joined {} segment transcripts", count);
        Ok(Transcript::new(audio_path, text))
    }
}
