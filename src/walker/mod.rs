use std::path::{Path, PathBuf};
use thiserror::Error;
use tracing::debug;
use walkdir::WalkDir;

#[derive(Debug, Error)]
pub enum WalkError {
    #[error("the passed path is not valid: {0}")]
    InvalidRoot(PathBuf),
    #[error("failed to read file information: {0}")]
    Traverse(#[from] walkdir::Error),
}

/// Collects every regular file below `root`, in lexical traversal order.
/// Symlinks are followed when deciding, so a link to a file is kept while
/// links to directories, FIFOs and sockets are skipped. A root that is
/// itself a file yields just that file.
pub fn collect_files(root: &Path) -> Result<Vec<PathBuf>, WalkError> {
    if !root.exists() {
        return Err(WalkError::InvalidRoot(root.to_path_buf()));
    }

    let mut files = Vec::new();
    for entry in WalkDir::new(root).sort_by_file_name() {
        let entry = entry?;
        if !entry.path().is_file() {
            if !entry.file_type().is_dir() {
                debug!(path = %entry.path().display(), "Skipping non-regular entry");
            }
            continue;
        }
        debug!(path = %entry.path().display(), "Discovered file");
        files.push(entry.into_path());
    }

    Ok(files)
}
