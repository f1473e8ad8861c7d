//! Pipeline orchestrator for vidqa.
//!
//! Coordinates acquisition, transcription and transcript storage, and wires
//! the knowledge base together from settings.

use crate::audio::{acquire_audio, AcquiredAudio, AudioFetcher, YtDlpFetcher};
use crate::chunking::TextSplitter;
use crate::config::{Credentials, Prompts, Settings, TranscriptionProvider};
use crate::embedding::OpenAIEmbedder;
use crate::error::{Result, VidqaError};
use crate::openai::create_client;
use crate::rag::{KnowledgeBase, OpenAIChatModel};
use crate::retry::{cancellable, RetryPolicy, Sleeper, TokioSleeper};
use crate::transcript_store::TranscriptStore;
use crate::transcription::{LocalWhisperTranscriber, OpenAITranscriber, Transcriber, Transcript};
use crate::vector_store::SqliteVectorIndex;
use std::path::PathBuf;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Result of processing one video.
#[derive(Debug, Clone)]
pub struct ProcessedVideo {
    pub audio: AcquiredAudio,
    pub transcript: Transcript,
    pub transcript_path: PathBuf,
}

/// Acquisition → transcription → transcript store.
pub struct Orchestrator {
    fetcher: Arc<dyn AudioFetcher>,
    transcriber: Arc<dyn Transcriber>,
    store: TranscriptStore,
    audio_dir: PathBuf,
    download_policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
}

impl Orchestrator {
    /// Create an orchestrator with the configured providers.
    ///
    /// Credentials are only needed for the hosted transcription provider.
    pub fn new(settings: &Settings, credentials: Option<&Credentials>) -> Result<Self> {
        let transcriber: Arc<dyn Transcriber> = match settings.transcription.provider {
            TranscriptionProvider::Local => {
                info!("Using local Whisper model '{}'", settings.transcription.model);
                Arc::new(LocalWhisperTranscriber::new(&settings.transcription))
            }
            TranscriptionProvider::OpenAI => {
                let credentials = credentials.ok_or_else(|| {
                    VidqaError::Config("OpenAI transcription requires an API key".into())
                })?;
                info!("Using OpenAI transcription ({})", settings.transcription.api_model);
                let client = create_client(credentials, &settings.openai)?;
                Arc::new(OpenAITranscriber::new(client, &settings.transcription))
            }
        };

        Ok(Self::with_components(
            settings,
            Arc::new(YtDlpFetcher::new()),
            transcriber,
        ))
    }

    /// Create an orchestrator with custom components.
    pub fn with_components(
        settings: &Settings,
        fetcher: Arc<dyn AudioFetcher>,
        transcriber: Arc<dyn Transcriber>,
    ) -> Self {
        Self {
            fetcher,
            transcriber,
            store: TranscriptStore::new(settings.transcripts_dir()),
            audio_dir: settings.audio_dir(),
            download_policy: RetryPolicy::for_downloads(&settings.download),
            sleeper: Arc::new(TokioSleeper),
        }
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn transcript_store(&self) -> &TranscriptStore {
        &self.store
    }

    /// Download, transcribe and store one video's transcript.
    #[instrument(skip(self, cancel))]
    pub async fn process_video(
        &self,
        input: &str,
        cancel: &CancellationToken,
    ) -> Result<ProcessedVideo> {
        let audio = acquire_audio(
            self.fetcher.as_ref(),
            input,
            &self.audio_dir,
            &self.download_policy,
            self.sleeper.as_ref(),
            cancel,
        )
        .await?;

        info!("Transcribing {}", audio.path.display());
        let transcript = cancellable(cancel, self.transcriber.transcribe(&audio.path)).await?;
        info!("Transcription completed ({} words)", transcript.word_count());

        let transcript_path = self.store.write(&audio.path, &transcript.text)?;

        Ok(ProcessedVideo {
            audio,
            transcript,
            transcript_path,
        })
    }
}

/// Assemble a knowledge base backed by OpenAI and the on-disk index.
pub fn build_knowledge_base(settings: &Settings, credentials: &Credentials) -> Result<KnowledgeBase> {
    let client = create_client(credentials, &settings.openai)?;
    let prompts = Prompts::load(settings.prompts.custom_dir.as_deref())?;

    let embedder = Arc::new(OpenAIEmbedder::new(client.clone(), &settings.embedding));
    let index = Arc::new(SqliteVectorIndex::open(&settings.index_dir())?);
    let chat = Arc::new(OpenAIChatModel::new(client, &settings.rag));
    let splitter = TextSplitter::from_settings(&settings.chunking)?;

    Ok(KnowledgeBase::new(embedder, index, chat, splitter)
        .with_batching(settings.ingest.batch_size, settings.ingest.batch_pause())
        .with_top_k(settings.rag.top_k)
        .with_max_history_turns(settings.rag.max_history_turns)
        .with_prompts(prompts.rag)
        .with_retry_policy(RetryPolicy::from_settings(&settings.retry)))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::AudioInfo;
    use crate::retry::testing::RecordingSleeper;
    use async_trait::async_trait;
    use std::path::Path;

    struct FileFetcher;

    #[async_trait]
    impl AudioFetcher for FileFetcher {
        async fn probe(&self, _url: &str) -> Result<AudioInfo> {
            Ok(AudioInfo {
                title: "Ownership Explained".to_string(),
                duration_seconds: Some(300.0),
            })
        }

        async fn download(&self, _url: &str, output_dir: &Path) -> Result<PathBuf> {
            let path = output_dir.join("Ownership Explained.mp3");
            std::fs::write(&path, b"mp3")?;
            Ok(path)
        }
    }

    struct FixedTranscriber;

    #[async_trait]
    impl Transcriber for FixedTranscriber {
        async fn transcribe(&self, audio_path: &Path) -> Result<Transcript> {
            Ok(Transcript::new(audio_path, "borrowing rules are checked at compile time"))
        }
    }

    fn settings_in(dir: &Path) -> Settings {
        let mut settings = Settings::default();
        settings.paths.audio_dir = dir.join("audio").to_string_lossy().into_owned();
        settings.paths.transcripts_dir = dir.join("transcripts").to_string_lossy().into_owned();
        settings.paths.index_dir = dir.join("vector_index").to_string_lossy().into_owned();
        settings
    }

    #[tokio::test]
    async fn test_process_video_writes_transcript_named_after_audio() {
        let dir = tempfile::tempdir().unwrap();
        let settings = settings_in(dir.path());
        let orchestrator = Orchestrator::with_components(
            &settings,
            Arc::new(FileFetcher),
            Arc::new(FixedTranscriber),
        )
        .with_sleeper(Arc::new(RecordingSleeper::default()));

        let processed = orchestrator
            .process_video("dQw4w9WgXcQ", &CancellationToken::new())
            .await
            .unwrap();

        assert_eq!(
            processed.transcript_path,
            dir.path().join("transcripts").join("Ownership Explained.txt")
        );
        assert_eq!(processed.audio.info.title, "Ownership Explained");
        assert_eq!(
            orchestrator.transcript_store().load_corpus().unwrap(),
            "borrowing rules are checked at compile time\n\n"
        );
    }

    #[test]
    fn test_openai_provider_requires_credentials() {
        let mut settings = Settings::default();
        settings.transcription.provider = TranscriptionProvider::OpenAI;

        let err = Orchestrator::new(&settings, None).err().unwrap();
        assert!(matches!(err, VidqaError::Config(_)));
    }

    #[test]
    fn test_build_knowledge_base_from_settings() {
        let dir = tempfile::tempdir().unwrap();
        let mut settings = settings_in(dir.path());
        settings.openai.api_key = Some("sk-test-0123456789".to_string());
        let credentials = settings.credentials().unwrap();

        let kb = build_knowledge_base(&settings, &credentials).unwrap();
        assert!(!kb.is_built());
        assert!(dir.path().join("vector_index").join("index.db").exists());
    }
}
