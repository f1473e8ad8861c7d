//! CLI module for vidqa.

pub mod commands;
mod output;
pub mod preflight;

pub use output::Output;

use clap::{Parser, Subcommand};

/// vidqa - ask questions about what is said in a video
///
/// Downloads a video's audio, transcribes it, indexes the transcript and
/// answers questions about it in a conversational loop.
#[derive(Parser, Debug)]
#[command(name = "vidqa")]
#[command(version, about, long_about = None)]
pub struct Cli {
    /// Increase verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count, global = true)]
    pub verbose: u8,

    /// Path to configuration file
    #[arg(short, long, global = true)]
    pub config: Option<String>,

    #[command(subcommand)]
    pub command: Commands,
}

#[derive(Subcommand, Debug)]
pub enum Commands {
    /// Download and transcribe a video, index every transcript, then chat
    Run {
        /// YouTube URL or 11-character video id
        input: String,
    },

    /// Download and transcribe a video without indexing it
    Fetch {
        /// YouTube URL or 11-character video id
        input: String,
    },

    /// Index the existing transcripts and start an interactive session
    Chat,

    /// Manage configuration
    Config {
        #[command(subcommand)]
        action: ConfigAction,
    },
}

#[derive(Subcommand, Debug)]
pub enum ConfigAction {
    /// Show the effective configuration
    Show,

    /// Print the default configuration file path
    Path,
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn test_cli_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn test_parse_run_with_global_flags() {
        let cli = Cli::try_parse_from(["vidqa", "-vv", "run", "dQw4w9WgXcQ", "-c", "my.toml"]).unwrap();

        assert_eq!(cli.verbose, 2);
        assert_eq!(cli.config.as_deref(), Some("my.toml"));
        assert!(matches!(cli.command, Commands::Run { ref input } if input == "dQw4w9WgXcQ"));
    }

    #[test]
    fn test_parse_config_path() {
        let cli = Cli::try_parse_from(["vidqa", "config", "path"]).unwrap();
        assert!(matches!(
            cli.command,
            Commands::Config {
                action: ConfigAction::Path
            }
        ));
    }

    #[test]
    fn test_fetch_requires_input() {
        assert!(Cli::try_parse_from(["vidqa", "fetch"]).is_err());
    }
}
