//! Conversational question answering over indexed transcripts.
//!
//! [`KnowledgeBase`] owns the vector index and the conversation memory. It is
//! built once from the transcript corpus and then queried repeatedly.

mod chain;
pub mod context;
pub mod llm;
mod memory;

pub use chain::ConversationalChain;
pub use context::ContextBuilder;
pub use llm::{ChatMessage, ChatModel, OpenAIChatModel, Role};
pub use memory::{ConversationMemory, Turn};

use crate::chunking::TextSplitter;
use crate::config::RagPrompts;
use crate::embedding::Embedder;
use crate::error::{Result, VidqaError};
use crate::ingest::{IngestReport, IngestionPipeline};
use crate::retry::{retry_with_backoff, RetryPolicy, Sleeper, TokioSleeper};
use crate::transcript_store::TranscriptStore;
use crate::vector_store::VectorIndex;
use std::sync::Arc;
use std::time::Duration;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument};

/// Retrieval-augmented question answering with multi-turn memory.
pub struct KnowledgeBase {
    embedder: Arc<dyn Embedder>,
    index: Arc<dyn VectorIndex>,
    chat: Arc<dyn ChatModel>,
    splitter: TextSplitter,
    batch_size: usize,
    batch_pause: Duration,
    top_k: usize,
    max_history_turns: Option<usize>,
    prompts: RagPrompts,
    policy: RetryPolicy,
    sleeper: Arc<dyn Sleeper>,
    show_progress: bool,
    memory: ConversationMemory,
    chain: Option<ConversationalChain>,
}

impl KnowledgeBase {
    pub fn new(
        embedder: Arc<dyn Embedder>,
        index: Arc<dyn VectorIndex>,
        chat: Arc<dyn ChatModel>,
        splitter: TextSplitter,
    ) -> Self {
        Self {
            embedder,
            index,
            chat,
            splitter,
            batch_size: 10,
            batch_pause: Duration::from_secs(1),
            top_k: 4,
            max_history_turns: None,
            prompts: RagPrompts::default(),
            policy: RetryPolicy::default(),
            sleeper: Arc::new(TokioSleeper),
            show_progress: false,
            memory: ConversationMemory::new(),
            chain: None,
        }
    }

    pub fn with_batching(mut self, batch_size: usize, batch_pause: Duration) -> Self {
        self.batch_size = batch_size.max(1);
        self.batch_pause = batch_pause;
        self
    }

    pub fn with_top_k(mut self, top_k: usize) -> Self {
        self.top_k = top_k;
        self
    }

    /// Cap the turns sent to the model. The recorded history is unaffected.
    pub fn with_max_history_turns(mut self, limit: Option<usize>) -> Self {
        self.max_history_turns = limit;
        self
    }

    pub fn with_prompts(mut self, prompts: RagPrompts) -> Self {
        self.prompts = prompts;
        self
    }

    pub fn with_retry_policy(mut self, policy: RetryPolicy) -> Self {
        self.policy = policy;
        self
    }

    pub fn with_sleeper(mut self, sleeper: Arc<dyn Sleeper>) -> Self {
        self.sleeper = sleeper;
        self
    }

    pub fn with_progress(mut self, show: bool) -> Self {
        self.show_progress = show;
        self
    }

    pub fn is_built(&self) -> bool {
        self.chain.is_some()
    }

    /// Index every transcript in `store`.
    pub async fn build(
        &mut self,
        store: &TranscriptStore,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let corpus = store.load_corpus()?;
        self.build_from_corpus(&corpus, cancel).await
    }

    /// Split, embed and index `corpus`, then make the knowledge base queryable.
    #[instrument(skip(self, corpus, cancel), fields(chars = corpus.len()))]
    pub async fn build_from_corpus(
        &mut self,
        corpus: &str,
        cancel: &CancellationToken,
    ) -> Result<IngestReport> {
        let chunks = self.splitter.split(corpus);
        info!(
            "Split corpus into {} chunks (size {}, overlap {})",
            chunks.len(),
            self.splitter.chunk_size(),
            self.splitter.chunk_overlap()
        );

        let pipeline = IngestionPipeline::new(self.embedder.clone(), self.index.clone())
            .with_batch_size(self.batch_size)
            .with_batch_pause(self.batch_pause)
            .with_retry_policy(self.policy.clone())
            .with_sleeper(self.sleeper.clone())
            .with_progress(self.show_progress);

        let report = pipeline.run(&chunks, cancel).await?;

        let context = ContextBuilder::new(self.index.clone(), self.embedder.clone())
            .with_top_k(self.top_k);
        self.chain = Some(
            ConversationalChain::new(context, self.chat.clone(), self.prompts.clone())
                .with_max_history_turns(self.max_history_turns),
        );

        Ok(report)
    }

    /// Answer a question, retrying on rate limits.
    ///
    /// On success exactly one turn is added to the history.
    #[instrument(skip(self, cancel), fields(turns = self.memory.len()))]
    pub async fn query(&mut self, question: &str, cancel: &CancellationToken) -> Result<String> {
        let chain = self.chain.as_ref().ok_or(VidqaError::NotBuilt)?;

        let question = question.trim();
        if question.is_empty() {
            return Err(VidqaError::InvalidInput("Question is empty".to_string()));
        }

        info!("Processing question: {}", question);
        let history = self.memory.turns();
        let answer = retry_with_backoff(
            &self.policy,
            self.sleeper.as_ref(),
            cancel,
            "Query",
            |_| chain.answer(question, history, cancel),
        )
        .await?;

        self.memory.push(Turn::new(question, answer.clone()));
        Ok(answer)
    }

    /// Recorded turns in chronological order.
    pub fn history(&self) -> &[Turn] {
        self.memory.turns()
    }

    /// Recorded turns as alternating human and ai messages.
    pub fn history_messages(&self) -> Vec<ChatMessage> {
        self.memory.messages()
    }
}
