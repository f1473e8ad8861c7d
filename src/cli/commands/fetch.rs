//! Fetch command: download and transcribe one video.

use super::cancel_on_interrupt;
use crate::cli::output::format_duration;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::{Orchestrator, ProcessedVideo};
use anyhow::Result;
use tokio_util::sync::CancellationToken;

/// Run the fetch command.
pub async fn run_fetch(input: &str, settings: &Settings) -> Result<()> {
    fetch_video(input, settings).await?;
    Ok(())
}

/// Download, transcribe and store one video, reporting progress on stdout.
pub(super) async fn fetch_video(input: &str, settings: &Settings) -> Result<ProcessedVideo> {
    if let Err(e) = preflight::check_tools(Operation::Fetch, settings) {
        Output::failure(&e);
        return Err(e.into());
    }
    let credentials = preflight::check_credentials(Operation::Fetch, settings)?;

    let orchestrator = Orchestrator::new(settings, credentials.as_ref())?;

    Output::info(&format!(
        "Downloading and transcribing {} ({} transcription)",
        input, settings.transcription.provider
    ));

    let cancel = CancellationToken::new();
    let watcher = cancel_on_interrupt(cancel.clone());
    let result = orchestrator.process_video(input, &cancel).await;
    watcher.abort();

    let processed = match result {
        Ok(processed) => processed,
        Err(e) => {
            Output::failure(&e);
            return Err(e.into());
        }
    };

    Output::success(&format!("Transcribed \"{}\"", processed.audio.info.title));
    if let Some(seconds) = processed.audio.info.duration_seconds {
        Output::kv("Duration", &format_duration(seconds));
    }
    Output::kv("Words", &processed.transcript.word_count().to_string());
    Output::kv("Transcript", &processed.transcript_path.display().to_string());

    Ok(processed)
}
