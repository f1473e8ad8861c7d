//! Terminal output helpers.

use crate::error::VidqaError;
use crate::rag::ChatMessage;
use console::style;
use indicatif::{ProgressBar, ProgressStyle};

/// Output helper for CLI formatting.
pub struct Output;

impl Output {
    pub fn info(msg: &str) {
        println!("{} {}", style(">>").cyan().bold(), msg);
    }

    pub fn success(msg: &str) {
        println!("{} {}", style(">>").green().bold(), msg);
    }

    pub fn warning(msg: &str) {
        eprintln!("{} {}", style(">>").yellow().bold(), msg);
    }

    pub fn error(msg: &str) {
        eprintln!("{} {}", style(">>").red().bold(), msg);
    }

    /// Print an error followed by its remediation hint, if any.
    pub fn failure(err: &VidqaError) {
        Self::error(&err.to_string());
        if let Some(hint) = err.hint() {
            eprintln!("   {}", style(hint).dim());
        }
    }

    pub fn header(msg: &str) {
        println!("\n{}", style(msg).bold().underlined());
    }

    pub fn kv(key: &str, value: &str) {
        println!("  {}: {}", style(key).dim(), value);
    }

    /// Print a query answer.
    pub fn answer(text: &str) {
        println!("\n{} {}\n", style("Answer:").cyan().bold(), text);
    }

    /// Print one recorded history message as `role: content`.
    pub fn history_line(message: &ChatMessage) {
        println!("{}", format_history_line(message));
    }

    /// Create a spinner.
    pub fn spinner(msg: &str) -> ProgressBar {
        let pb = ProgressBar::new_spinner();
        pb.set_style(
            ProgressStyle::default_spinner()
                .template("{spinner:.green} {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        pb.set_message(msg.to_string());
        pb.enable_steady_tick(std::time::Duration::from_millis(100));
        pb
    }
}

fn format_history_line(message: &ChatMessage) -> String {
    format!("{}: {}", message.role, message.content)
}

/// Format duration in seconds to a human-readable string.
pub fn format_duration(seconds: f64) -> String {
    let total_seconds = seconds as u32;
    let hours = total_seconds / 3600;
    let minutes = (total_seconds % 3600) / 60;
    let secs = total_seconds % 60;

    if hours > 0 {
        format!("{}h {}m {}s", hours, minutes, secs)
    } else if minutes > 0 {
        format!("{}m {}s", minutes, secs)
    } else {
        format!("{}s", secs)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_format_duration() {
        assert_eq!(format_duration(42.9), "42s");
        assert_eq!(format_duration(754.1), "12m 34s");
        assert_eq!(format_duration(3723.0), "1h 2m 3s");
    }

    #[test]
    fn test_history_line_uses_role_prefix() {
        assert_eq!(
            format_history_line(&ChatMessage::human("what is a lifetime?")),
            "human: what is a lifetime?"
        );
        assert_eq!(format_history_line(&ChatMessage::ai("a region")), "ai: a region");
    }
}
