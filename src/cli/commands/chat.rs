//! Interactive question loop over the indexed transcripts.

use super::cancel_on_interrupt;
use crate::cli::Output;
use crate::config::Settings;
use crate::orchestrator::build_knowledge_base;
use crate::rag::KnowledgeBase;
use crate::transcript_store::TranscriptStore;
use anyhow::Result;
use console::style;
use std::io::{self, Write};
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio_util::sync::CancellationToken;
use tracing::error;

/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
enum SessionCommand {
    Exit,
    History,
    Ask(String),
}

fn parse_command(line: &str) -> Option<SessionCommand> {
    let line = line.trim();
    if line.is_empty() {
        return None;
    }
    Some(match line.to_lowercase().as_str() {
        "exit" => SessionCommand::Exit,
        "history" => SessionCommand::History,
        _ => SessionCommand::Ask(line.to_string()),
    })
}

/// Run the chat command.
pub async fn run_chat(settings: &Settings) -> Result<()> {
    let mut kb = build_session(settings).await?;
    query_loop(&mut kb).await
}

/// Build the knowledge base from every stored transcript.
pub(super) async fn build_session(settings: &Settings) -> Result<KnowledgeBase> {
    let credentials = match settings.credentials() {
        Ok(credentials) => credentials,
        Err(e) => {
            Output::failure(&e);
            return Err(e.into());
        }
    };

    let store = TranscriptStore::new(settings.transcripts_dir());
    let mut kb = build_knowledge_base(settings, &credentials)?.with_progress(true);

    Output::info(&format!(
        "Building knowledge base from {}",
        store.dir().display()
    ));

    let cancel = CancellationToken::new();
    let watcher = cancel_on_interrupt(cancel.clone());
    let result = kb.build(&store, &cancel).await;
    watcher.abort();

    match result {
        Ok(report) => {
            Output::success(&format!(
                "Indexed {} chunks in {} batches",
                report.chunks, report.batches
            ));
            Ok(kb)
        }
        Err(e) => {
            Output::failure(&e);
            Err(e.into())
        }
    }
}

/// Read questions until `exit`, end of input or Ctrl-C at the prompt.
pub(super) async fn query_loop(kb: &mut KnowledgeBase) -> Result<()> {
    println!("\n{}", style("vidqa").bold().cyan());
    println!(
        "{}\n",
        style("Ask about the video. Type 'history' to review the conversation, 'exit' to quit.").dim()
    );

    let root = CancellationToken::new();
    let mut lines = BufReader::new(tokio::io::stdin()).lines();
    let mut stdout = io::stdout();

    loop {
        print!("{} ", style("Question:").green().bold());
        stdout.flush()?;

        let line = tokio::select! {
            line = lines.next_line() => line?,
            _ = tokio::signal::ctrl_c() => None,
        };
        let Some(line) = line else {
            println!();
            break;
        };

        match parse_command(&line) {
            None => continue,
            Some(SessionCommand::Exit) => break,
            Some(SessionCommand::History) => {
                for message in kb.history_messages() {
                    Output::history_line(&message);
                }
            }
            Some(SessionCommand::Ask(question)) => {
                let cancel = root.child_token();
                let watcher = cancel_on_interrupt(cancel.clone());
                let spinner = Output::spinner("Thinking...");
                let result = kb.query(&question, &cancel).await;
                spinner.finish_and_clear();
                watcher.abort();

                match result {
                    Ok(answer) => Output::answer(&answer),
                    Err(e) => {
                        error!(error = %e, "Query failed");
                        Output::failure(&e);
                    }
                }
            }
        }
    }

    Output::info("Goodbye!");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_command() {
        assert_eq!(parse_command("exit\n"), Some(SessionCommand::Exit));
        assert_eq!(parse_command("  history "), Some(SessionCommand::History));
        assert_eq!(parse_command("   "), None);
        assert_eq!(
            parse_command("What is borrowing?"),
            Some(SessionCommand::Ask("What is borrowing?".to_string()))
        );
    }

    #[test]
    fn test_commands_ignore_case() {
        assert_eq!(parse_command("Exit"), Some(SessionCommand::Exit));
        assert_eq!(parse_command("EXIT"), Some(SessionCommand::Exit));
        assert_eq!(parse_command("HISTORY"), Some(SessionCommand::History));
        assert_eq!(parse_command("History\n"), Some(SessionCommand::History));
    }

    #[test]
    fn test_questions_keep_their_case() {
        assert_eq!(
            parse_command("Exit strategies for Rust panics?"),
            Some(SessionCommand::Ask("Exit strategies for Rust panics?".to_string()))
        );
    }
}
