//! API credential validation.

use super::settings::OpenAISettings;
use crate::error::{Result, VidqaError};
use tracing::info;

const MISSING_KEY_HELP: &str = "OpenAI API key not found. Please set it in your .env file:\n\
1. Create a .env file in the project root\n\
2. Add: OPENAI_API_KEY=your_api_key_here\n\
3. Replace 'your_api_key_here' with your actual OpenAI API key";

/// A presence-checked API key. Never verified against the remote service.
#[derive(Clone)]
pub struct Credentials {
    api_key: String,
}

impl Credentials {
    /// Validate the key held in settings.
    pub fn from_settings(settings: &OpenAISettings) -> Result<Self> {
        let api_key = settings
            .api_key
            .as_deref()
            .map(str::trim)
            .filter(|k| !k.is_empty())
            .ok_or_else(|| VidqaError::Config(MISSING_KEY_HELP.to_string()))?
            .to_string();

        let credentials = Self { api_key };
        info!("Using OpenAI API key: {}", credentials.masked());
        Ok(credentials)
    }

    pub fn api_key(&self) -> &str {
        &self.api_key
    }

    /// The key with everything but a short prefix and suffix hidden.
    pub fn masked(&self) -> String {
        let chars: Vec<char> = self.api_key.chars().collect();
        if chars.len() <= 10 {
            return "*".repeat(chars.len());
        }
        let prefix: String = chars[..7].iter().collect();
        let suffix: String = chars[chars.len() - 3..].iter().collect();
        format!("{}{}{}", prefix, "*".repeat(chars.len() - 10), suffix)
    }
}

impl std::fmt::Debug for Credentials {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Credentials")
            .field("api_key", &self.masked())
            .finish()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with(key: Option<&str>) -> OpenAISettings {
        OpenAISettings {
            api_key: key.map(str::to_string),
            ..Default::default()
        }
    }

    #[test]
    fn test_missing_key_is_config_error_with_instructions() {
        let err = Credentials::from_settings(&settings_with(None)).unwrap_err();
        match err {
            VidqaError::Config(msg) => assert!(msg.contains("OPENAI_API_KEY")),
            other => panic!("unexpected error: {other:?}"),
        }

        assert!(Credentials::from_settings(&settings_with(Some("   "))).is_err());
    }

    #[test]
    fn test_masking() {
        let creds = Credentials::from_settings(&settings_with(Some("sk-abcdefghijklmnop"))).unwrap();
        assert_eq!(creds.masked(), "sk-abcd*********nop");
        assert!(!format!("{:?}", creds).contains("efghij"));
        assert_eq!(creds.api_key(), "sk-abcdefghijklmnop");
    }
}
