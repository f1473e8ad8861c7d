//! Config command implementation.

use crate::cli::ConfigAction;
use crate::config::Settings;
use anyhow::Result;

/// Run the config command.
pub fn run_config(action: &ConfigAction, settings: &Settings) -> Result<()> {
    match action {
        ConfigAction::Show => {
            println!("{}", render_settings(settings)?);
        }

        ConfigAction::Path => {
            println!("{}", Settings::default_config_path().display());
        }
    }

    Ok(())
}

/// Settings as TOML with the API key replaced by its masked form.
fn render_settings(settings: &Settings) -> Result<String> {
    let mut shown = settings.clone();
    if let Ok(credentials) = settings.credentials() {
        shown.openai.api_key = Some(credentials.masked());
    }
    toml::to_string_pretty(&shown)
        .map_err(|e| anyhow::anyhow!("Failed to serialize config: {}", e))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_show_masks_api_key() {
        let mut settings = Settings::default();
        settings.openai.api_key = Some("sk-abcdefghijklmnop".to_string());

        let rendered = render_settings(&settings).unwrap();
        assert!(!rendered.contains("sk-abcdefghijklmnop"));
        assert!(rendered.contains("[chunking]"));
        assert!(rendered.contains("chunk_size = 500"));
    }
}
