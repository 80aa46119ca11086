use anyhow::{Context as _, Result};
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::{debug, info};

use crate::minify::{Dispatcher, Minifier};
use crate::options::{Context, Options};

/// Result of minifying one file on disk.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Report {
    pub path: PathBuf,
    pub original_size: u64,
    pub new_size: u64,
}

impl Report {
    /// Bytes saved, zero if the file was left alone.
    pub fn saved(&self) -> u64 {
        self.original_size - self.new_size
    }
}

/// Minify a whole buffer as a top-level file named `name`.
///
/// Returns the buffer truncated to its new length.
pub fn minify_bytes(mut data: Vec<u8>, name: &str, options: &Options) -> Vec<u8> {
    let ctx = Context::new(options);
    let len = Dispatcher.minify(&mut data, name, &ctx).min(data.len());
    data.truncate(len);
    data
}

/// Load `path`, minify it and write it back if it got smaller.
///
/// The engine runs on the blocking pool; the file is fully resident in
/// memory while it is processed.
pub async fn minify_file(path: &Path, options: &Options) -> Result<Report> {
    let data = fs::read(path)
        .await
        .with_context(|| format!("Failed to read {}", path.display()))?;
    let original_size = data.len() as u64;

    let name = path.display().to_string();
    let options = options.clone();
    let data = tokio::task::spawn_blocking(move || minify_bytes(data, &name, &options))
        .await
        .context("Minifier task panicked")?;
    let new_size = data.len() as u64;

    if new_size < original_size {
        fs::write(path, &data)
            .await
            .with_context(|| format!("Failed to write {}", path.display()))?;
        info!(
            "{}: {} -> {} bytes",
            path.display(),
            original_size,
            new_size
        );
    } else {
        debug!("{}: no gain", path.display());
    }

    Ok(Report {
        path: path.to_path_buf(),
        original_size,
        new_size: new_size.min(original_size),
    })
}

/// Expand directories into the regular files below them.
pub async fn collect_files(paths: &[PathBuf]) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    let mut pending: Vec<PathBuf> = paths.iter().rev().cloned().collect();

    while let Some(path) = pending.pop() {
        let metadata = fs::metadata(&path)
            .await
            .with_context(|| format!("Failed to stat {}", path.display()))?;
        if !metadata.is_dir() {
            files.push(path);
            continue;
        }

        let mut dir = fs::read_dir(&path)
            .await
            .with_context(|| format!("Failed to list {}", path.display()))?;
        let mut children = Vec::new();
        while let Some(child) = dir.next_entry().await? {
            children.push(child.path());
        }
        children.sort();
        pending.extend(children.into_iter().rev());
    }

    Ok(files)
}
