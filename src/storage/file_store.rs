use std::path::{Path, PathBuf};

use crate::types::{RelayError, Result, ResultExt};

/// Flat directory of uploaded files
#[derive(Debug, Clone)]
pub struct FileStore {
    root: PathBuf,
}

impl FileStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Write `bytes` under the final component of `filename`, replacing any
    /// existing file of that name. The directory is created on first use.
    pub fn save(&self, filename: &str, bytes: &[u8]) -> Result<PathBuf> {
        let name = sanitize(filename)?;

        std::fs::create_dir_all(&self.root).with_context_fn(|| {
            format!("Failed to create storage directory {}", self.root.display())
        })?;

        let path = self.root.join(name);
        std::fs::write(&path, bytes)
            .with_context_fn(|| format!("Failed to write {}", path.display()))?;

        tracing::debug!(path = %path.display(), bytes = bytes.len(), "Stored file");
        Ok(path)
    }

    pub fn exists(&self, path: impl AsRef<Path>) -> bool {
        path.as_ref().is_file()
    }
}

/// Reduce an uploaded name to a plain file name inside the store
fn sanitize(filename: &str) -> Result<&str> {
    let name = filename
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    if name.is_empty() || name == "." || name == ".." {
        return Err(RelayError::InvalidFileName(filename.to_string()));
    }
    Ok(name)
}
