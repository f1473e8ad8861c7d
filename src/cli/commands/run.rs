//! Run command: the full video-to-conversation flow.

use super::chat::{build_session, query_loop};
use super::fetch::fetch_video;
use crate::cli::preflight::{self, Operation};
use crate::cli::Output;
use crate::config::Settings;
use anyhow::Result;

/// Process one video, index every stored transcript, then start the loop.
pub async fn run_pipeline(input: &str, settings: &Settings) -> Result<()> {
    // The key is needed after the download; fail before spending time on it.
    if let Err(e) = preflight::check_credentials(Operation::Chat, settings) {
        Output::failure(&e);
        return Err(e.into());
    }

    fetch_video(input, settings).await?;
    let mut kb = build_session(settings).await?;
    query_loop(&mut kb).await
}
