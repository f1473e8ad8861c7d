//! Speech-to-text for downloaded audio.
//!
//! Two providers:
//!
//! - **Local** (default): the `whisper` command-line tool, on CUDA when a GPU
//!   is present.
//! - **OpenAI**: the hosted transcription API, with long recordings split
//!   into segments and uploaded concurrently.

mod local;
mod openai;

pub use local::{detect_cuda, LocalWhisperTranscriber};
pub use openai::OpenAITranscriber;

use crate::error::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// Full text of one audio file.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Transcript {
    /// File name of the transcribed audio.
    pub source_audio: String,
    pub text: String,
}

impl Transcript {
    pub fn new(audio_path: &Path, text: impl Into<String>) -> Self {
        Self {
            source_audio: audio_path
                .file_name()
                .map(|n| n.to_string_lossy().into_owned())
                .unwrap_or_default(),
            text: text.into(),
        }
    }

    pub fn word_count(&self) -> usize {
        self.text.split_whitespace().count()
    }
}

/// Trait for transcription services.
#[async_trait]
pub trait Transcriber: Send + Sync {
    /// Transcribe an audio file into a single string.
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_transcript_keeps_file_name() {
        let t = Transcript::new(Path::new("audio/My Talk.mp3"), "one two three");
        assert_eq!(t.source_audio, "My Talk.mp3");
        assert_eq!(t.word_count(), 3);
    }
}
