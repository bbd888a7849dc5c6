//! Recall Command
//!
//! Search indexed uploads by filename or uploader, newest first.

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::storage::FileIndex;
use crate::types::Result;

pub fn run(keyword: &str, limit: Option<usize>, format: &str) -> Result<()> {
    let ctx = CommandContext::load()?;
    let limit = limit.unwrap_or(ctx.config.storage.recall_limit);
    let records = FileIndex::new(&ctx.db).search_files(keyword, limit)?;

    if format == "json" {
        println!("{}", serde_json::to_string_pretty(&records)?);
        return Ok(());
    }

    let output = Output::new();
    if records.is_empty() {
        output.info(&format!("No files found for '{}'", keyword));
        return Ok(());
    }

    output.section(&format!("{} file(s) matching '{}'", records.len(), keyword));
    for record in &records {
        output.file_record(record, ctx.store.exists(&record.file_path));
    }
    Ok(())
}
