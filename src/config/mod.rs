//! Configuration module for vidqa.
//!
//! Handles loading settings, validating credentials, and prompt templates.

mod credentials;
mod prompts;
mod settings;

pub use credentials::Credentials;
pub use prompts::{Prompts, RagPrompts};
pub use settings::{
    ChunkingSettings, DevicePreference, DownloadSettings, EmbeddingSettings, GeneralSettings,
    IngestSettings, OpenAISettings, PathSettings, PromptSettings, RagSettings, RetrySettings,
    Settings, TranscriptionProvider, TranscriptionSettings, WhisperModel, OPENAI_API_KEY_ENV,
    WHISPER_MODEL_ENV,
};
