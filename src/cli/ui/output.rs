use console::style;

use crate::generation::GenerationOutcome;
use crate::storage::FileRecord;

/// Styled terminal output for CLI commands
pub struct Output;

impl Output {
    pub fn new() -> Self {
        Self
    }

    pub fn success(&self, message: &str) {
        println!("{} {}", style("✓").green(), message);
    }

    pub fn error(&self, message: &str) {
        eprintln!("{} {}", style("✗").red(), message);
    }

    pub fn warning(&self, message: &str) {
        println!("{} {}", style("⚠").yellow(), message);
    }

    pub fn info(&self, message: &str) {
        println!("{} {}", style("ℹ").blue(), message);
    }

    pub fn section(&self, message: &str) {
        println!("\n{}", style(message).bold());
        println!("{}", "─".repeat(40));
    }

    /// Reporter text, styled by outcome
    pub fn outcome(&self, outcome: &GenerationOutcome, text: &str) {
        match outcome {
            GenerationOutcome::Success { model, .. } => {
                self.success(text);
                println!("  {} {}", style("model:").dim(), model);
            }
            GenerationOutcome::RateLimited
            | GenerationOutcome::Cancelled
            | GenerationOutcome::EmptyPrompt => self.warning(text),
            _ => self.error(text),
        }
    }

    pub fn file_record(&self, record: &FileRecord, on_disk: bool) {
        let marker = if on_disk {
            style("●").green()
        } else {
            style("○").red()
        };
        let uploaded = record
            .upload_time
            .map(|t| t.format("%Y-%m-%d %H:%M").to_string())
            .unwrap_or_else(|| "-".to_string());

        println!(
            "{} {}  {}  {}",
            marker,
            style(&record.filename).bold(),
            style(format!("by {}", record.user_id)).dim(),
            style(uploaded).dim()
        );
        println!("    {}", record.file_path);
        if let Some(link) = &record.message_link {
            println!("    {}", style(link).underlined());
        }
    }
}

impl Default for Output {
    fn default() -> Self {
        Self::new()
    }
}
