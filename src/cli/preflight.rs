//! Pre-flight checks before expensive operations.
//!
//! Validates that required tools and credentials are available before
//! starting work that would otherwise fail midway.

use crate::config::{Credentials, Settings, TranscriptionProvider};
use crate::error::{Result, VidqaError};
use std::process::Command;

/// Requirements for different operations.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Operation {
    /// Downloading and transcribing needs the media tools.
    Fetch,
    /// Building and querying the knowledge base needs the API key.
    Chat,
}

/// Tools an operation shells out to under the given settings.
pub fn required_tools(operation: Operation, settings: &Settings) -> Vec<&'static str> {
    match operation {
        Operation::Fetch => {
            let mut tools = vec!["yt-dlp", "ffmpeg"];
            match settings.transcription.provider {
                TranscriptionProvider::Local => tools.push("whisper"),
                TranscriptionProvider::OpenAI => tools.push("ffprobe"),
            }
            tools
        }
        Operation::Chat => Vec::new(),
    }
}

/// Check tools for `operation`.
pub fn check_tools(operation: Operation, settings: &Settings) -> Result<()> {
    for tool in required_tools(operation, settings) {
        check_tool(tool)?;
    }
    Ok(())
}

/// Presence-check the API key. Hosted transcription needs it for `Fetch` too.
pub fn check_credentials(operation: Operation, settings: &Settings) -> Result<Option<Credentials>> {
    let needed = match operation {
        Operation::Chat => true,
        Operation::Fetch => settings.transcription.provider == TranscriptionProvider::OpenAI,
    };
    if needed {
        settings.credentials().map(Some)
    } else {
        Ok(None)
    }
}

/// Check if an external tool is available.
fn check_tool(name: &str) -> Result<()> {
    // ffmpeg/ffprobe use -version (single dash), whisper only has --help
    let probe_arg = match name {
        "ffmpeg" | "ffprobe" => "-version",
        "whisper" => "--help",
        _ => "--version",
    };
    match Command::new(name).arg(probe_arg).output() {
        Ok(output) if output.status.success() => Ok(()),
        Ok(_) => Err(VidqaError::ToolFailed(format!(
            "{} is installed but not working correctly",
            name
        ))),
        Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
            Err(VidqaError::ToolNotFound(name.to_string()))
        }
        Err(e) => Err(VidqaError::ToolFailed(format!("{}: {}", name, e))),
    }
}
