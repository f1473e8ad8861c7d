//! Embedding generation for transcript chunks and questions.

mod openai;

pub use openai::OpenAIEmbedder;

use crate::error::Result;
use async_trait::async_trait;

/// Trait for embedding generation.
#[async_trait]
pub trait Embedder: Send + Sync {
    /// Generate an embedding for a single text.
    async fn embed(&self, text: &str) -> Result<Vec<f32>>;

    /// Generate embeddings for multiple texts, in input order.
    async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>>;

    /// Get the embedding dimensions.
    fn dimensions(&self) -> usize;
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use crate::error::VidqaError;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Bag-of-letters embedding: similar words give similar vectors.
    pub fn letter_vector(text: &str) -> Vec<f32> {
        let mut v = vec![0.0; 26];
        for c in text.to_lowercase().chars().filter(|c| c.is_ascii_lowercase()) {
            v[(c as u8 - b'a') as usize] += 1.0;
        }
        v
    }

    /// Embedder that follows a per-call script, then succeeds.
    ///
    /// Each script entry decides one `embed_batch` call: `Some(err)` fails
    /// it, `None` lets it through.
    #[derive(Default)]
    pub struct ScriptedEmbedder {
        script: Mutex<VecDeque<Option<VidqaError>>>,
        pub calls: Mutex<Vec<usize>>,
    }

    impl ScriptedEmbedder {
        /// Fail the first calls with `failures`, in order.
        pub fn failing_with(failures: Vec<VidqaError>) -> Self {
            Self::scripted(failures.into_iter().map(Some).collect())
        }

        /// Succeed until the `call`-th call (1-based), which fails with `err`.
        pub fn failing_on_call(call: usize, err: VidqaError) -> Self {
            let mut script: Vec<Option<VidqaError>> = (1..call).map(|_| None).collect();
            script.push(Some(err));
            Self::scripted(script)
        }

        fn scripted(script: Vec<Option<VidqaError>>) -> Self {
            Self {
                script: Mutex::new(script.into()),
                calls: Mutex::default(),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }
    }

    #[async_trait]
    impl Embedder for ScriptedEmbedder {
        async fn embed(&self, text: &str) -> Result<Vec<f32>> {
            let mut batch = self.embed_batch(&[text.to_string()]).await?;
            Ok(batch.remove(0))
        }

        async fn embed_batch(&self, texts: &[String]) -> Result<Vec<Vec<f32>>> {
            self.calls.lock().unwrap().push(texts.len());
            if let Some(Some(err)) = self.script.lock().unwrap().pop_front() {
                return Err(err);
            }
            Ok(texts.iter().map(|t| letter_vector(t)).collect())
        }

        fn dimensions(&self) -> usize {
            26
        }
    }
}
