//! Chat model seam.

use crate::config::RagSettings;
use crate::error::{Result, VidqaError};
use crate::openai::{classify_openai_error, OpenAIClient};
use async_openai::types::{
    ChatCompletionRequestAssistantMessageArgs, ChatCompletionRequestMessage,
    ChatCompletionRequestSystemMessageArgs, ChatCompletionRequestUserMessageArgs,
    CreateChatCompletionRequestArgs,
};
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tracing::{debug, instrument};

/// Author of a chat message.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Role {
    System,
    Human,
    Ai,
}

impl std::fmt::Display for Role {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Role::System => write!(f, "system"),
            Role::Human => write!(f, "human"),
            Role::Ai => write!(f, "ai"),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ChatMessage {
    pub role: Role,
    pub content: String,
}

impl ChatMessage {
    pub fn system(content: impl Into<String>) -> Self {
        Self {
            role: Role::System,
            content: content.into(),
        }
    }

    pub fn human(content: impl Into<String>) -> Self {
        Self {
            role: Role::Human,
            content: content.into(),
        }
    }

    pub fn ai(content: impl Into<String>) -> Self {
        Self {
            role: Role::Ai,
            content: content.into(),
        }
    }
}

/// A language model that completes a conversation.
#[async_trait]
pub trait ChatModel: Send + Sync {
    /// Return the model's reply to `messages`.
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String>;
}

/// OpenAI chat completions.
pub struct OpenAIChatModel {
    client: OpenAIClient,
    model: String,
    temperature: f32,
}

impl OpenAIChatModel {
    pub fn new(client: OpenAIClient, settings: &RagSettings) -> Self {
        Self {
            client,
            model: settings.model.clone(),
            temperature: settings.temperature,
        }
    }

    fn to_request_message(message: &ChatMessage) -> Result<ChatCompletionRequestMessage> {
        let content = message.content.clone();
        let built: ChatCompletionRequestMessage = match message.role {
            Role::System => ChatCompletionRequestSystemMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| VidqaError::Rag(e.to_string()))?
                .into(),
            Role::Human => ChatCompletionRequestUserMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| VidqaError::Rag(e.to_string()))?
                .into(),
            Role::Ai => ChatCompletionRequestAssistantMessageArgs::default()
                .content(content)
                .build()
                .map_err(|e| VidqaError::Rag(e.to_string()))?
                .into(),
        };
        Ok(built)
    }
}

#[async_trait]
impl ChatModel for OpenAIChatModel {
    #[instrument(skip(self, messages), fields(model = %self.model, messages = messages.len()))]
    async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
        let request_messages = messages
            .iter()
            .map(Self::to_request_message)
            .collect::<Result<Vec<_>>>()?;

        let request = CreateChatCompletionRequestArgs::default()
            .model(&self.model)
            .messages(request_messages)
            .temperature(self.temperature)
            .build()
            .map_err(|e| VidqaError::Rag(e.to_string()))?;

        let response = self
            .client
            .chat()
            .create(request)
            .await
            .map_err(|e| classify_openai_error(e, "Failed to generate response"))?;

        let answer = response
            .choices
            .into_iter()
            .next()
            .and_then(|c| c.message.content)
            .ok_or_else(|| VidqaError::Rag("Empty response from LLM".to_string()))?;

        debug!("Received {} chars from chat model", answer.len());
        Ok(answer)
    }
}

#[cfg(test)]
pub(crate) mod testing {
    use super::*;
    use std::collections::VecDeque;
    use std::sync::Mutex;

    /// Chat model that fails according to a script, then echoes the last
    /// human message.
    #[derive(Default)]
    pub struct ScriptedChat {
        failures: Mutex<VecDeque<VidqaError>>,
        pub calls: Mutex<Vec<Vec<ChatMessage>>>,
    }

    impl ScriptedChat {
        pub fn failing_with(failures: Vec<VidqaError>) -> Self {
            Self {
                failures: Mutex::new(failures.into()),
                calls: Mutex::default(),
            }
        }

        pub fn call_count(&self) -> usize {
            self.calls.lock().unwrap().len()
        }

        pub fn last_call(&self) -> Vec<ChatMessage> {
            self.calls.lock().unwrap().last().cloned().unwrap_or_default()
        }
    }

    #[async_trait]
    impl ChatModel for ScriptedChat {
        async fn complete(&self, messages: &[ChatMessage]) -> Result<String> {
            self.calls.lock().unwrap().push(messages.to_vec());
            if let Some(err) = self.failures.lock().unwrap().pop_front() {
                return Err(err);
            }
            let question = messages
                .iter()
                .rev()
                .find(|m| m.role == Role::Human)
                .map(|m| m.content.clone())
                .unwrap_or_default();
            Ok(format!("answer to: {}", question))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_role_display() {
        assert_eq!(Role::Human.to_string(), "human");
        assert_eq!(Role::Ai.to_string(), "ai");
        assert_eq!(ChatMessage::system("x").role, Role::System);
    }

    #[test]
    fn test_request_message_conversion() {
        for message in [
            ChatMessage::system("context"),
            ChatMessage::human("question"),
            ChatMessage::ai("answer"),
        ] {
            assert!(OpenAIChatModel::to_request_message(&message).is_ok());
        }
    }
}
