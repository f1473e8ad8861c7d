//! OpenAI client construction and error classification.

use crate::config::{Credentials, OpenAISettings};
use crate::error::{Result, VidqaError};
use async_openai::error::OpenAIError;
use async_openai::{config::OpenAIConfig, Client};
use backoff::ExponentialBackoffBuilder;
use std::time::Duration;

/// Shared client type for embeddings, chat and transcription.
pub type OpenAIClient = Client<OpenAIConfig>;

/// Create an OpenAI client with the given key, timeout and optional base URL.
///
/// The client's built-in backoff is disabled: every rate-limit response is
/// returned on the first attempt so [`crate::retry::RetryPolicy`] alone
/// decides delays and the attempt ceiling.
pub fn create_client(credentials: &Credentials, settings: &OpenAISettings) -> Result<OpenAIClient> {
    let http_client = reqwest::Client::builder()
        .timeout(settings.request_timeout())
        .build()
        .map_err(|e| VidqaError::Config(format!("Failed to create HTTP client: {}", e)))?;

    let mut config = OpenAIConfig::new().with_api_key(credentials.api_key());
    if let Some(base) = settings.api_base.as_deref() {
        config = config.with_api_base(base);
    }

    let single_attempt = ExponentialBackoffBuilder::new()
        .with_max_elapsed_time(Some(Duration::ZERO))
        .build();

    Ok(Client::with_config(config)
        .with_http_client(http_client)
        .with_backoff(single_attempt))
}

/// Map a client error onto the categories the retry layer understands.
pub fn classify_openai_error(err: OpenAIError, context: &str) -> VidqaError {
    match err {
        OpenAIError::ApiError(api) => {
            let code = api.code.as_deref().unwrap_or_default();
            let kind = api.r#type.as_deref().unwrap_or_default();
            let message = format!("{}: {}", context, api.message);

            if matches!(code, "rate_limit_exceeded" | "insufficient_quota")
                || matches!(kind, "requests" | "tokens" | "insufficient_quota")
            {
                VidqaError::RateLimited(message)
            } else if code == "invalid_api_key"
                || kind == "authentication_error"
                || api.message.to_lowercase().contains("api key")
            {
                VidqaError::Authentication(message)
            } else {
                VidqaError::OpenAI(message)
            }
        }
        OpenAIError::Reqwest(e) if e.is_connect() || e.is_timeout() => {
            VidqaError::Connection(format!("{}: {}", context, e))
        }
        OpenAIError::Reqwest(e) if e.status().map(|s| s.as_u16()) == Some(429) => {
            VidqaError::RateLimited(format!("{}: {}", context, e))
        }
        OpenAIError::Reqwest(e) if e.status().map(|s| s.as_u16()) == Some(401) => {
            VidqaError::Authentication(format!("{}: {}", context, e))
        }
        other => VidqaError::OpenAI(format!("{}: {}", context, other)),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::OpenAISettings;
    use crate::error::ErrorKind;
    use async_openai::error::ApiError;

    fn api_error(code: Option<&str>, kind: Option<&str>, message: &str) -> OpenAIError {
        OpenAIError::ApiError(ApiError {
            message: message.to_string(),
            r#type: kind.map(str::to_string),
            param: None,
            code: code.map(str::to_string),
        })
    }

    #[test]
    fn test_classify_rate_limit() {
        let err = classify_openai_error(
            api_error(Some("rate_limit_exceeded"), Some("requests"), "Too many requests"),
            "Embedding",
        );
        assert_eq!(err.kind(), ErrorKind::RateLimit);

        let err = classify_openai_error(
            api_error(Some("insufficient_quota"), None, "You exceeded your quota"),
            "Embedding",
        );
        assert_eq!(err.kind(), ErrorKind::RateLimit);
    }

    #[test]
    fn test_classify_authentication() {
        let err = classify_openai_error(
            api_error(Some("invalid_api_key"), Some("invalid_request_error"), "Incorrect API key provided"),
            "Chat",
        );
        assert_eq!(err.kind(), ErrorKind::Authentication);
    }

    #[test]
    fn test_classify_other() {
        let err = classify_openai_error(
            api_error(None, Some("invalid_request_error"), "maximum context length exceeded"),
            "Chat",
        );
        assert!(matches!(err, VidqaError::OpenAI(_)));

        let err = classify_openai_error(OpenAIError::InvalidArgument("bad".into()), "Chat");
        assert_eq!(err.kind(), ErrorKind::Other);
    }

    #[test]
    fn test_create_client() {
        let settings = OpenAISettings {
            api_key: Some("sk-test-0123456789".to_string()),
            api_base: Some("http://127.0.0.1:9/v1".to_string()),
            ..Default::default()
        };
        let credentials = Credentials::from_settings(&settings).unwrap();
        assert!(create_client(&credentials, &settings).is_ok());
    }
}
