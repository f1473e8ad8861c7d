//! Error types for vidqa.

use std::path::PathBuf;
use thiserror::Error;

/// Billing page shown alongside rate-limit warnings.
pub const BILLING_HINT: &str =
    "You may need to check your OpenAI account billing status at https://platform.openai.com/account/billing";

/// Library-level error type for vidqa operations.
#[derive(Error, Debug)]
pub enum VidqaError {
    #[error("Configuration error: {0}")]
    Config(String),

    #[error("No transcript files found in {}", .0.display())]
    NoInput(PathBuf),

    #[error("Rate limit exceeded: {0}")]
    RateLimited(String),

    #[error("Authentication failed: {0}")]
    Authentication(String),

    #[error("Connection failed: {0}")]
    Connection(String),

    #[error("Knowledge base not built. Build it from the transcripts before querying.")]
    NotBuilt,

    #[error("Download reported success but the audio file is missing: {}", .0.display())]
    DownloadMissing(PathBuf),

    #[error("Operation cancelled")]
    Cancelled,

    #[error("Audio download failed: {0}")]
    AudioDownload(String),

    #[error("Transcription failed: {0}")]
    Transcription(String),

    #[error("Embedding generation failed: {0}")]
    Embedding(String),

    #[error("Vector store error: {0}")]
    VectorStore(String),

    #[error("RAG error: {0}")]
    Rag(String),

    #[error("OpenAI API error: {0}")]
    OpenAI(String),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("TOML parse error: {0}")]
    TomlParse(#[from] toml::de::Error),

    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    #[error("External tool not found: {0}. Please install it and ensure it's in your PATH.")]
    ToolNotFound(String),

    #[error("External tool failed: {0}")]
    ToolFailed(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),
}

/// Coarse classification used by retry policies and the CLI.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ErrorKind {
    Configuration,
    Input,
    RateLimit,
    Authentication,
    Connectivity,
    Precondition,
    Integrity,
    Cancelled,
    Other,
}

impl VidqaError {
    /// Classify this error.
    pub fn kind(&self) -> ErrorKind {
        match self {
            VidqaError::Config(_) => ErrorKind::Configuration,
            VidqaError::NoInput(_) => ErrorKind::Input,
            VidqaError::RateLimited(_) => ErrorKind::RateLimit,
            VidqaError::Authentication(_) => ErrorKind::Authentication,
            VidqaError::Connection(_) => ErrorKind::Connectivity,
            VidqaError::NotBuilt => ErrorKind::Precondition,
            VidqaError::DownloadMissing(_) => ErrorKind::Integrity,
            VidqaError::Cancelled => ErrorKind::Cancelled,
            _ => ErrorKind::Other,
        }
    }

    /// Whether this is a transient rate-limit failure.
    pub fn is_rate_limit(&self) -> bool {
        self.kind() == ErrorKind::RateLimit
    }

    /// Remediation hint for failures the user can fix.
    pub fn hint(&self) -> Option<&'static str> {
        match self.kind() {
            ErrorKind::RateLimit => Some(BILLING_HINT),
            ErrorKind::Authentication => Some("Please check your OpenAI API key."),
            ErrorKind::Connectivity => Some("Please check your internet connection."),
            _ => None,
        }
    }
}

/// Result type alias for vidqa operations.
pub type Result<T> = std::result::Result<T, VidqaError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_error_kinds() {
        assert_eq!(VidqaError::NotBuilt.kind(), ErrorKind::Precondition);
        assert_eq!(
            VidqaError::NoInput(PathBuf::from("transcripts")).kind(),
            ErrorKind::Input
        );
        assert!(VidqaError::RateLimited("slow down".into()).is_rate_limit());
        assert!(!VidqaError::Authentication("bad key".into()).is_rate_limit());
        assert_eq!(VidqaError::Rag("boom".into()).kind(), ErrorKind::Other);
    }

    #[test]
    fn test_hints() {
        assert!(VidqaError::Connection("refused".into()).hint().is_some());
        assert!(VidqaError::Authentication("bad key".into()).hint().is_some());
        assert!(VidqaError::NotBuilt.hint().is_none());
    }
}
