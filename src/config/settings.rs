//! Configuration settings for vidqa.

use crate::error::{Result, VidqaError};
use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

use super::credentials::Credentials;

/// Environment variable selecting the speech-to-text model size.
pub const WHISPER_MODEL_ENV: &str = "WHISPER_MODEL";
/// Environment variable holding the OpenAI API key.
pub const OPENAI_API_KEY_ENV: &str = "OPENAI_API_KEY";

/// Root configuration structure.
///
/// Built once at process start and passed by reference to every component.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct Settings {
    pub general: GeneralSettings,
    pub paths: PathSettings,
    pub transcription: TranscriptionSettings,
    pub openai: OpenAISettings,
    pub embedding: EmbeddingSettings,
    pub chunking: ChunkingSettings,
    pub ingest: IngestSettings,
    pub rag: RagSettings,
    pub retry: RetrySettings,
    pub download: DownloadSettings,
    pub prompts: PromptSettings,
}

/// General application settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct GeneralSettings {
    /// Log level used when no `-v` flag is given (trace, debug, info, warn, error).
    pub log_level: String,
}

impl Default for GeneralSettings {
    fn default() -> Self {
        Self {
            log_level: "warn".to_string(),
        }
    }
}

/// On-disk layout.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct PathSettings {
    /// Downloaded audio, named after video titles.
    pub audio_dir: String,
    /// One `.txt` transcript per processed video.
    pub transcripts_dir: String,
    /// Persistent vector index directory.
    pub index_dir: String,
}

impl Default for PathSettings {
    fn default() -> Self {
        Self {
            audio_dir: "audio".to_string(),
            transcripts_dir: "transcripts".to_string(),
            index_dir: "vector_index".to_string(),
        }
    }
}

/// Speech-to-text provider.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum TranscriptionProvider {
    /// Local `whisper` command-line tool.
    #[default]
    Local,
    /// OpenAI hosted transcription API.
    OpenAI,
}

impl std::str::FromStr for TranscriptionProvider {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_lowercase().as_str() {
            "local" | "whisper" => Ok(TranscriptionProvider::Local),
            "openai" | "api" => Ok(TranscriptionProvider::OpenAI),
            _ => Err(format!("Unknown transcription provider: {}", s)),
        }
    }
}

impl std::fmt::Display for TranscriptionProvider {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            TranscriptionProvider::Local => write!(f, "local"),
            TranscriptionProvider::OpenAI => write!(f, "openai"),
        }
    }
}

/// Whisper model size tier.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum WhisperModel {
    Tiny,
    #[default]
    Base,
    Small,
    Medium,
    Large,
    Turbo,
}

impl std::str::FromStr for WhisperModel {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "tiny" => Ok(WhisperModel::Tiny),
            "base" => Ok(WhisperModel::Base),
            "small" => Ok(WhisperModel::Small),
            "medium" => Ok(WhisperModel::Medium),
            "large" => Ok(WhisperModel::Large),
            "turbo" => Ok(WhisperModel::Turbo),
            _ => Err(format!("Unknown whisper model size: {}", s)),
        }
    }
}

impl std::fmt::Display for WhisperModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        let name = match self {
            WhisperModel::Tiny => "tiny",
            WhisperModel::Base => "base",
            WhisperModel::Small => "small",
            WhisperModel::Medium => "medium",
            WhisperModel::Large => "large",
            WhisperModel::Turbo => "turbo",
        };
        write!(f, "{}", name)
    }
}

/// Compute device for local transcription.
#[derive(Debug, Clone, Copy, Serialize, Deserialize, Default, PartialEq, Eq)]
#[serde(rename_all = "lowercase")]
pub enum DevicePreference {
    /// Use CUDA when a GPU is detected, CPU otherwise.
    #[default]
    Auto,
    Cuda,
    Cpu,
}

/// Transcription service settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct TranscriptionSettings {
    /// Transcription provider (local, openai).
    pub provider: TranscriptionProvider,
    /// Model size for the local provider.
    pub model: WhisperModel,
    /// Device for the local provider.
    pub device: DevicePreference,
    /// Model name for the OpenAI provider.
    pub api_model: String,
    /// Segment length used to stay under the API upload limit.
    pub chunk_duration_seconds: u32,
    /// Maximum concurrent segment uploads.
    pub max_concurrent_chunks: usize,
}

impl Default for TranscriptionSettings {
    fn default() -> Self {
        Self {
            provider: TranscriptionProvider::Local,
            model: WhisperModel::Base,
            device: DevicePreference::Auto,
            api_model: "whisper-1".to_string(),
            chunk_duration_seconds: 600,
            max_concurrent_chunks: 2,
        }
    }
}

/// OpenAI client settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct OpenAISettings {
    /// API key. Usually supplied through `OPENAI_API_KEY` or `.env`.
    #[serde(skip_serializing)]
    pub api_key: Option<String>,
    /// Per-request timeout in seconds.
    pub timeout_secs: u64,
    /// Alternative API base URL, e.g. a proxy. Defaults to the public API.
    pub api_base: Option<String>,
}

impl Default for OpenAISettings {
    fn default() -> Self {
        Self {
            api_key: None,
            timeout_secs: 300,
            api_base: None,
        }
    }
}

impl OpenAISettings {
    /// Request timeout for OpenAI calls.
    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }
}

/// Embedding generation settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct EmbeddingSettings {
    /// Embedding model to use.
    pub model: String,
    /// Embedding dimensions.
    pub dimensions: u32,
}

impl Default for EmbeddingSettings {
    fn default() -> Self {
        Self {
            model: "text-embedding-3-small".to_string(),
            dimensions: 1536,
        }
    }
}

/// Text chunking settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct ChunkingSettings {
    /// Target chunk size in characters.
    pub chunk_size: usize,
    /// Characters shared between neighbouring chunks.
    pub chunk_overlap: usize,
}

impl Default for ChunkingSettings {
    fn default() -> Self {
        Self {
            chunk_size: 500,
            chunk_overlap: 100,
        }
    }
}

/// Ingestion batching settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct IngestSettings {
    /// Chunks embedded per index call.
    pub batch_size: usize,
    /// Pause between batches in milliseconds.
    pub batch_pause_ms: u64,
}

impl Default for IngestSettings {
    fn default() -> Self {
        Self {
            batch_size: 10,
            batch_pause_ms: 1000,
        }
    }
}

impl IngestSettings {
    pub fn batch_pause(&self) -> Duration {
        Duration::from_millis(self.batch_pause_ms)
    }
}

/// Retrieval-augmented answering settings.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RagSettings {
    /// Chat model for answers.
    pub model: String,
    /// Sampling temperature.
    pub temperature: f32,
    /// Number of chunks retrieved per question.
    pub top_k: usize,
    /// Cap on turns sent to the model. The recorded history is never pruned.
    pub max_history_turns: Option<usize>,
}

impl Default for RagSettings {
    fn default() -> Self {
        Self {
            model: "gpt-4o-mini".to_string(),
            temperature: 0.0,
            top_k: 4,
            max_history_turns: None,
        }
    }
}

/// Backoff for rate-limited embedding and chat calls.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct RetrySettings {
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Delay before the first retry, in seconds.
    pub base_delay_secs: u64,
    /// Delay multiplier per attempt.
    pub multiplier: u32,
}

impl Default for RetrySettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 10,
            multiplier: 2,
        }
    }
}

/// Backoff for audio downloads.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct DownloadSettings {
    /// Total attempts, including the first.
    pub max_retries: u32,
    /// Delay before the first retry, in seconds.
    pub base_delay_secs: u64,
}

impl Default for DownloadSettings {
    fn default() -> Self {
        Self {
            max_retries: 3,
            base_delay_secs: 1,
        }
    }
}

/// Prompt customization settings.
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
#[serde(default)]
pub struct PromptSettings {
    /// Directory containing a `rag.toml` that overrides the default prompts.
    pub custom_dir: Option<String>,
}

impl Settings {
    /// Load settings from the default configuration file and the environment.
    pub fn load() -> Result<Self> {
        Self::load_from(None)
    }

    /// Load settings from a specific path, or default location if None.
    ///
    /// Environment overrides (`WHISPER_MODEL`, `OPENAI_API_KEY`) are applied
    /// after the file is read.
    pub fn load_from(path: Option<&PathBuf>) -> Result<Self> {
        let config_path = match path {
            Some(p) => p.clone(),
            None => Self::default_config_path(),
        };

        let mut settings = if config_path.exists() {
            let content = std::fs::read_to_string(&config_path)?;
            toml::from_str::<Settings>(&content)?
        } else {
            Settings::default()
        };

        settings.apply_overrides(|key| std::env::var(key).ok())?;
        settings.validate()?;
        Ok(settings)
    }

    /// Apply overrides from an environment-like lookup.
    pub fn apply_overrides<F>(&mut self, lookup: F) -> Result<()>
    where
        F: Fn(&str) -> Option<String>,
    {
        if let Some(model) = lookup(WHISPER_MODEL_ENV).filter(|m| !m.trim().is_empty()) {
            self.transcription.model = model
                .parse()
                .map_err(|e: String| VidqaError::Config(format!("{}: {}", WHISPER_MODEL_ENV, e)))?;
        }

        if let Some(key) = lookup(OPENAI_API_KEY_ENV) {
            self.openai.api_key = Some(key);
        }

        Ok(())
    }

    /// Check values that would otherwise fail deep inside a pipeline.
    pub fn validate(&self) -> Result<()> {
        if self.chunking.chunk_size == 0 {
            return Err(VidqaError::Config("chunking.chunk_size must be positive".into()));
        }
        if self.chunking.chunk_overlap >= self.chunking.chunk_size {
            return Err(VidqaError::Config(format!(
                "chunking.chunk_overlap ({}) must be smaller than chunking.chunk_size ({})",
                self.chunking.chunk_overlap, self.chunking.chunk_size
            )));
        }
        if self.ingest.batch_size == 0 {
            return Err(VidqaError::Config("ingest.batch_size must be positive".into()));
        }
        if self.retry.max_retries == 0 || self.download.max_retries == 0 {
            return Err(VidqaError::Config("max_retries must be at least 1".into()));
        }
        Ok(())
    }

    /// Validate and return the API credential.
    pub fn credentials(&self) -> Result<Credentials> {
        Credentials::from_settings(&self.openai)
    }

    /// Get the default configuration file path.
    pub fn default_config_path() -> PathBuf {
        dirs::config_dir()
            .unwrap_or_else(|| PathBuf::from("."))
            .join("vidqa")
            .join("config.toml")
    }

    /// Expand shell variables in paths (e.g., ~).
    pub fn expand_path(path: &str) -> PathBuf {
        PathBuf::from(shellexpand::tilde(path).to_string())
    }

    pub fn audio_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.audio_dir)
    }

    pub fn transcripts_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.transcripts_dir)
    }

    pub fn index_dir(&self) -> PathBuf {
        Self::expand_path(&self.paths.index_dir)
    }
}
