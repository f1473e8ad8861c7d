//! Conversation memory.
//!
//! Every successful question/answer pair is kept for the life of the
//! knowledge base. Callers may cap how many recent turns reach the model,
//! but the record itself is never pruned.

use super::llm::ChatMessage;
use serde::{Deserialize, Serialize};

/// One question and its answer.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Turn {
    pub question: String,
    pub answer: String,
}

impl Turn {
    pub fn new(question: impl Into<String>, answer: impl Into<String>) -> Self {
        Self {
            question: question.into(),
            answer: answer.into(),
        }
    }
}

#[derive(Debug, Clone, Default)]
pub struct ConversationMemory {
    turns: Vec<Turn>,
}

impl ConversationMemory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&mut self, turn: Turn) {
        self.turns.push(turn);
    }

    pub fn turns(&self) -> &[Turn] {
        &self.turns
    }

    pub fn len(&self) -> usize {
        self.turns.len()
    }

    pub fn is_empty(&self) -> bool {
        self.turns.is_empty()
    }

    /// The record as alternating human and ai messages.
    pub fn messages(&self) -> Vec<ChatMessage> {
        to_messages(&self.turns)
    }
}

pub(crate) fn to_messages(turns: &[Turn]) -> Vec<ChatMessage> {
    turns
        .iter()
        .flat_map(|t| [ChatMessage::human(&t.question), ChatMessage::ai(&t.answer)])
        .collect()
}

/// Plain-text transcript of `turns` for prompt templates.
pub(crate) fn format_history(turns: &[Turn]) -> String {
    turns
        .iter()
        .map(|t| format!("Human: {}\nAssistant: {}", t.question, t.answer))
        .collect::<Vec<_>>()
        .join("\n")
}
