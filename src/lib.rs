//! vidqa - ask questions about a video's spoken content
//!
//! Downloads the audio track of a video, transcribes it, and indexes the
//! transcript so questions about it can be answered conversationally.
//!
//! # Overview
//!
//! - Download audio with `yt-dlp`, retrying transient failures
//! - Transcribe locally with Whisper or through the OpenAI audio API
//! - Split transcripts into overlapping chunks and embed them in batches
//! - Answer follow-up questions with retrieval and multi-turn memory
//!
//! # Architecture
//!
//! - `config` - Settings, credentials and prompt templates
//! - `audio` - Input normalization, download and ffmpeg helpers
//! - `transcription` - Speech-to-text providers
//! - `transcript_store` - One text file per processed video
//! - `chunking` - Recursive character splitting with overlap
//! - `embedding` - Embedding generation
//! - `vector_store` - Persistent vector index
//! - `ingest` - Batched, rate-limit aware indexing
//! - `rag` - Conversational retrieval over the index
//! - `retry` - Backoff policy shared by every remote call
//! - `orchestrator` - Wiring from settings to components
//!
//! # Example
//!
//! ```rust,no_run
//! use tokio_util::sync::CancellationToken;
//! use vidqa::config::Settings;
//! use vidqa::orchestrator::{build_knowledge_base, Orchestrator};
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let settings = Settings::load()?;
//!     let credentials = settings.credentials()?;
//!     let cancel = CancellationToken::new();
//!
//!     let orchestrator = Orchestrator::new(&settings, Some(&credentials))?;
//!     let processed = orchestrator.process_video("dQw4w9WgXcQ", &cancel).await?;
//!
//!     let mut kb = build_knowledge_base(&settings, &credentials)?;
//!     kb.build(orchestrator.transcript_store(), &cancel).await?;
//!     let answer = kb.query("What is the video about?", &cancel).await?;
//!     println!("{}: {}", processed.audio.info.title, answer);
//!
//!     Ok(())
//! }
//! ```

pub mod audio;
pub mod chunking;
pub mod cli;
pub mod config;
pub mod embedding;
pub mod error;
pub mod ingest;
pub mod openai;
pub mod orchestrator;
pub mod rag;
pub mod retry;
pub mod transcript_store;
pub mod transcription;
pub mod vector_store;

pub use error::{ErrorKind, Result, VidqaError};
