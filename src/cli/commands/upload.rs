//! Upload Command
//!
//! Copy local files into the file store and index them for recall.

use std::path::PathBuf;

use crate::cli::ui::Output;
use crate::cli::util::CommandContext;
use crate::storage::FileIndex;
use crate::types::{RelayError, Result};

pub fn run(paths: &[PathBuf], user: &str, link: Option<&str>) -> Result<()> {
    let ctx = CommandContext::load()?;
    let index = FileIndex::new(&ctx.db);
    let output = Output::new();

    let mut failed = 0usize;
    for path in paths {
        let name = path
            .file_name()
            .and_then(|n| n.to_str())
            .ok_or_else(|| RelayError::InvalidFileName(path.display().to_string()))?;

        let saved = std::fs::read(path)
            .map_err(RelayError::from)
            .and_then(|bytes| ctx.store.save(name, &bytes))
            .and_then(|stored| index.save_file(user, name, &stored.to_string_lossy(), link));

        match saved {
            Ok(id) => output.success(&format!("Saved: {} (#{})", name, id)),
            Err(e) => {
                failed += 1;
                output.error(&format!("Failed to save {}: {}", path.display(), e));
            }
        }
    }

    if failed > 0 {
        return Err(RelayError::Storage(format!(
            "{} of {} files failed to upload",
            failed,
            paths.len()
        )));
    }
    Ok(())
}
