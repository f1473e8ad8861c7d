//! Conversational retrieval chain.
//!
//! A follow-up question is first rewritten into a standalone one using the
//! conversation so far, then answered from the retrieved transcript context.

use super::context::{format_context_for_prompt, ContextBuilder};
use super::llm::{ChatMessage, ChatModel};
use super::memory::{format_history, to_messages, Turn};
use crate::config::{Prompts, RagPrompts};
use crate::error::Result;
use crate::retry::cancellable;
use std::collections::HashMap;
use std::sync::Arc;
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument};

pub struct ConversationalChain {
    context: ContextBuilder,
    chat: Arc<dyn ChatModel>,
    prompts: RagPrompts,
    max_history_turns: Option<usize>,
}

impl ConversationalChain {
    pub fn new(context: ContextBuilder, chat: Arc<dyn ChatModel>, prompts: RagPrompts) -> Self {
        Self {
            context,
            chat,
            prompts,
            max_history_turns: None,
        }
    }

    /// Limit the number of recent turns sent to the model.
    pub fn with_max_history_turns(mut self, limit: Option<usize>) -> Self {
        self.max_history_turns = limit;
        self
    }

    fn window<'a>(&self, history: &'a [Turn]) -> &'a [Turn] {
        match self.max_history_turns {
            Some(n) if n < history.len() => &history[history.len() - n..],
            _ => history,
        }
    }

    /// Answer `question` given the full conversation record.
    #[instrument(skip(self, history, cancel), fields(history = history.len()))]
    pub async fn answer(
        &self,
        question: &str,
        history: &[Turn],
        cancel: &CancellationToken,
    ) -> Result<String> {
        let history = self.window(history);

        let standalone = if history.is_empty() {
            question.to_string()
        } else {
            let condensed = cancellable(cancel, self.condense(question, history)).await?;
            debug!("Condensed question: {}", condensed);
            condensed
        };

        let hits = cancellable(cancel, self.context.build(&standalone)).await?;

        let vars: HashMap<&str, String> =
            [("context", format_context_for_prompt(&hits))].into();
        let mut messages = vec![ChatMessage::system(Prompts::render(
            &self.prompts.system,
            &vars,
        ))];
        messages.extend(to_messages(history));
        messages.push(ChatMessage::human(standalone));

        cancellable(cancel, self.chat.complete(&messages)).await
    }

    async fn condense(&self, question: &str, history: &[Turn]) -> Result<String> {
        let vars: HashMap<&str, String> = [
            ("chat_history", format_history(history)),
            ("question", question.to_string()),
        ]
        .into();
        let prompt = Prompts::render(&self.prompts.condense, &vars);

        let condensed = self.chat.complete(&[ChatMessage::human(prompt)]).await?;
        let condensed = condensed.trim();
        Ok(if condensed.is_empty() {
            question.to_string()
        } else {
            condensed.to_string()
        })
    }
}
