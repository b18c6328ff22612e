//! CLI output formatting

use crate::core::{ChainError, Payload};
use crate::retrieval::ScoredDocument;
use console::Emoji;
use indicatif::{ProgressBar, ProgressStyle};
use std::time::Duration;

// Re-export style
pub use console::style;

// Emojis for output
pub static CHECK: Emoji<'_, '_> = Emoji("✅ ", "✓ ");
pub static CROSS: Emoji<'_, '_> = Emoji("❌ ", "✗ ");
pub static SPINNER: Emoji<'_, '_> = Emoji("⏳ ", "~ ");
pub static INFO: Emoji<'_, '_> = Emoji("ℹ️  ", "i ");
pub static WARN: Emoji<'_, '_> = Emoji("⚠️  ", "!");
pub static ROCKET: Emoji<'_, '_> = Emoji("🚀 ", "> ");

const PROGRESS_TEMPLATE: &str =
    "{spinner:.green} [{elapsed_precise}] [{bar:40.cyan/blue}] {pos}/{len} {msg}";

/// Create a progress bar
pub fn create_progress_bar(total: usize) -> ProgressBar {
    let progress = ProgressBar::new(total as u64);
    let bar_style = ProgressStyle::default_bar()
        .template(PROGRESS_TEMPLATE)
        .unwrap_or_else(|_| ProgressStyle::default_bar())
        .progress_chars("#>-");
    progress.set_style(bar_style);
    progress.enable_steady_tick(Duration::from_millis(100));
    progress
}

/// Format step output with truncation
pub fn format_output(output: &str, max_lines: usize) -> String {
    let lines: Vec<&str> = output.lines().collect();

    if lines.len() <= max_lines {
        output.to_string()
    } else {
        let truncated = lines[..max_lines].join("\n");
        format!(
            "{}\n{}... ({} more lines)",
            truncated,
            style("[truncated]").dim(),
            lines.len() - max_lines
        )
    }
}

/// Format a chain result; branch results are listed by name
pub fn format_payload(payload: &Payload) -> String {
    match payload {
        Payload::Branches(branches) => branches
            .iter()
            .map(|(name, result)| match result {
                Ok(value) => format!("{} {}:\n{}", CHECK, style(name).bold(), value),
                Err(e) => format!("{} {}: {}", CROSS, style(name).bold(), style(e).red()),
            })
            .collect::<Vec<_>>()
            .join("\n\n"),
        other => other.render(),
    }
}

/// Format retrieved documents with their scores
pub fn format_documents(documents: &[ScoredDocument], max_lines: usize) -> String {
    documents
        .iter()
        .enumerate()
        .map(|(i, scored)| {
            format!(
                "{} {} {}\n{}",
                style(format!("#{}", i + 1)).bold(),
                style(format!("{:.3}", scored.score)).cyan(),
                style(scored.document.source().unwrap_or(&scored.id)).dim(),
                format_output(&scored.document.text, max_lines)
            )
        })
        .collect::<Vec<_>>()
        .join("\n\n")
}

/// Format a chain failure, naming the failing step when known
pub fn format_error(error: &ChainError) -> String {
    match error.failed_step() {
        Some(step) => format!(
            "{} Step {} failed: {}",
            CROSS,
            style(step).red().bold(),
            style(error.root_cause()).dim()
        ),
        None => format!("{} {}", CROSS, style(error).red()),
    }
}
