//! Filesystem helpers shared by the pipelines

pub mod icon_font;
pub mod images;

use crate::core::PipelineError;
use std::path::{Path, PathBuf};
use tracing::{debug, warn};
use walkdir::WalkDir;

/// Read `paths` in order and join their contents with a newline.
/// A missing file fails the whole concatenation.
pub async fn concat_files(paths: &[PathBuf]) -> Result<String, PipelineError> {
    let mut parts = Vec::with_capacity(paths.len());
    for path in paths {
        match tokio::fs::read_to_string(path).await {
            Ok(content) => parts.push(content),
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => {
                return Err(PipelineError::MissingInput(path.clone()));
            }
            Err(e) => return Err(PipelineError::io(path, e)),
        }
    }
    Ok(parts.join("\n"))
}

/// Write `content` to `path`, creating parent directories
pub async fn write_output(path: &Path, content: &[u8]) -> Result<(), PipelineError> {
    ensure_parent(path).await?;
    tokio::fs::write(path, content)
        .await
        .map_err(|e| PipelineError::io(path, e))
}

pub async fn ensure_parent(path: &Path) -> Result<(), PipelineError> {
    if let Some(parent) = path.parent() {
        tokio::fs::create_dir_all(parent)
            .await
            .map_err(|e| PipelineError::io(parent, e))?;
    }
    Ok(())
}

/// Delete every file matching the glob patterns and return how many went.
/// Matching nothing is not an error.
pub fn remove_matching(patterns: &[String]) -> Result<usize, PipelineError> {
    let mut removed = 0;
    for pattern in patterns {
        let entries = glob::glob(pattern).map_err(|e| PipelineError::InvalidPattern {
            pattern: pattern.clone(),
            message: e.to_string(),
        })?;
        for entry in entries {
            let path = match entry {
                Ok(path) => path,
                Err(e) => {
                    warn!("Skipping unreadable cleanup match: {}", e);
                    continue;
                }
            };
            if path.is_file() {
                std::fs::remove_file(&path).map_err(|e| PipelineError::io(&path, e))?;
                debug!("Removed {}", path.display());
                removed += 1;
            }
        }
    }
    Ok(removed)
}

/// Files under `dir` whose extension is in `extensions` (lowercase), sorted
pub fn collect_files(dir: &Path, extensions: &[String]) -> Vec<PathBuf> {
    let mut files: Vec<PathBuf> = WalkDir::new(dir)
        .follow_links(true)
        .into_iter()
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().is_file())
        .map(|entry| entry.into_path())
        .filter(|path| has_extension(path, extensions))
        .collect();
    files.sort();
    files
}

fn has_extension(path: &Path, extensions: &[String]) -> bool {
    path.extension()
        .and_then(|ext| ext.to_str())
        .map(|ext| extensions.iter().any(|e| e.eq_ignore_ascii_case(ext)))
        .unwrap_or(false)
}

/// True when `dst` exists and `src` is not strictly newer than it
pub fn is_up_to_date(src: &Path, dst: &Path) -> bool {
    let Ok(dst_meta) = dst.metadata() else {
        return false;
    };
    let Ok(src_time) = src.metadata().and_then(|m| m.modified()) else {
        return false;
    };
    let Ok(dst_time) = dst_meta.modified() else {
        return false;
    };
    src_time <= dst_time
}
