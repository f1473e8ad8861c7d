//! Local transcription through the `whisper` command-line tool.

use super::{Transcriber, Transcript};
use crate::config::{DevicePreference, TranscriptionSettings, WhisperModel};
use crate::error::{Result, VidqaError};
use async_trait::async_trait;
use std::path::Path;
use std::process::Stdio;
use tokio::process::Command;
use tracing::{debug, info, instrument};

/// Whether an NVIDIA GPU is visible to this process.
pub async fn detect_cuda() -> bool {
    match Command::new("nvidia-smi").arg("-L").output().await {
        Ok(out) => out.status.success() && !out.stdout.is_empty(),
        Err(_) => false,
    }
}

/// Runs OpenAI's open-source Whisper model locally.
#[derive(Debug, Clone)]
pub struct LocalWhisperTranscriber {
    binary: String,
    model: WhisperModel,
    device: DevicePreference,
}

impl LocalWhisperTranscriber {
    pub fn new(settings: &TranscriptionSettings) -> Self {
        Self {
            binary: "whisper".to_string(),
            model: settings.model,
            device: settings.device,
        }
    }

    pub fn model(&self) -> WhisperModel {
        self.model
    }

    /// Concrete device name passed to the tool.
    async fn resolve_device(&self) -> &'static str {
        match self.device {
            DevicePreference::Cuda => "cuda",
            DevicePreference::Cpu => "cpu",
            DevicePreference::Auto => {
                if detect_cuda().await {
                    "cuda"
                } else {
                    "cpu"
                }
            }
        }
    }
}

#[async_trait]
impl Transcriber for LocalWhisperTranscriber {
    #[instrument(skip(self), fields(audio_path = %audio_path.display(), model = %self.model))]
    async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
        let device = self.resolve_device().await;
        info!("Loading Whisper model '{}' on {}", self.model, device);

        let out_dir = tempfile::tempdir()?;
        let mut command = Command::new(&self.binary);
        command
            .arg(audio_path)
            .arg("--model").arg(self.model.to_string())
            .arg("--device").arg(device)
            .arg("--output_format").arg("txt")
            .arg("--output_dir").arg(out_dir.path())
            .arg("--verbose").arg("False");
        if device == "cpu" {
            command.arg("--fp16").arg("False");
        }

        let output = command
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| {
                if e.kind() == std::io::ErrorKind::NotFound {
                    VidqaError::ToolNotFound(self.binary.clone())
                } else {
                    VidqaError::Transcription(format!("whisper execution failed: {}", e))
                }
            })?;

        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            return Err(VidqaError::Transcription(format!("whisper failed: {}", stderr.trim())));
        }

        let stem = audio_path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_default();
        let text_path = out_dir.path().join(format!("{}.txt", stem));
        let text = std::fs::read_to_string(&text_path).map_err(|e| {
            VidqaError::Transcription(format!("whisper produced no transcript at {:?}: {}", text_path, e))
        })?;

        let transcript = Transcript::new(audio_path, text.trim());
        debug!("Transcribed {} words", transcript.word_count());
        Ok(transcript)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn test_forced_device_skips_detection() {
        let settings = TranscriptionSettings {
            device: DevicePreference::Cpu,
            model: WhisperModel::Tiny,
            ..Default::default()
        };
        let transcriber = LocalWhisperTranscriber::new(&settings);

        assert_eq!(transcriber.resolve_device().await, "cpu");
        assert_eq!(transcriber.model(), WhisperModel::Tiny);
    }

    #[tokio::test]
    async fn test_missing_binary_is_tool_not_found() {
        let mut transcriber = LocalWhisperTranscriber::new(&TranscriptionSettings {
            device: DevicePreference::Cpu,
            ..Default::default()
        });
        transcriber.binary = "vidqa-test-no-such-whisper".to_string();

        let err = transcriber
            .transcribe(Path::new("audio/none.mp3"))
            .await
            .unwrap_err();
        assert!(matches!(err, VidqaError::ToolNotFound(_)));
    }
}
