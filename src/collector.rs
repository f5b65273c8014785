//! Turns a user file selection into a fully materialized, ordered batch.
//!
//! A selection is a list of [`FileHandle`]s: single files or whole
//! directory trees, each carrying the relative path the user will see.
//! Reads run concurrently; the batch is only handed back once every read
//! succeeded.

use std::collections::HashSet;
use std::path::{Path, PathBuf};

use futures::future::try_join_all;
use serde::{Deserialize, Serialize};
use walkdir::WalkDir;

use crate::error::PipelineError;
use crate::sandbox::StagedPath;

/// One selected file whose bytes can be fetched asynchronously.
#[allow(async_fn_in_trait)]
pub trait FileHandle {
    /// Path relative to the selection, `/`-separated.
    fn relative_path(&self) -> &str;

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>>;
}

/// A selected file and its content. Bytes are fixed once read.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct FileEntry {
    relative_path: String,
    bytes: Vec<u8>,
}

impl FileEntry {
    pub fn new(relative_path: impl Into<String>, bytes: Vec<u8>) -> Self {
        Self {
            relative_path: relative_path.into(),
            bytes,
        }
    }

    pub fn relative_path(&self) -> &str {
        &self.relative_path
    }

    pub fn bytes(&self) -> &[u8] {
        &self.bytes
    }
}

/// The collected batch, in selection order.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct SelectedFileSet {
    entries: Vec<FileEntry>,
}

impl SelectedFileSet {
    pub fn entries(&self) -> &[FileEntry] {
        &self.entries
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    /// Newline-joined relative paths, shown to the user to pick the entry file.
    pub fn manifest(&self) -> String {
        self.entries
            .iter()
            .map(|e| e.relative_path.as_str())
            .collect::<Vec<_>>()
            .join("\n")
    }

    pub fn into_entries(self) -> Vec<FileEntry> {
        self.entries
    }
}

/// What to do when two selected files share a relative path.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum DuplicatePolicy {
    /// Keep both; the later one overwrites the earlier when staged.
    #[default]
    LastWriteWins,
    /// Fail the whole batch.
    Reject,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct FileCollector {
    duplicates: DuplicatePolicy,
}

impl FileCollector {
    pub fn new(duplicates: DuplicatePolicy) -> Self {
        Self { duplicates }
    }

    /// Read every handle concurrently, preserving selection order.
    ///
    /// Any single read failure aborts the whole batch.
    pub async fn collect<H: FileHandle>(&self, handles: &[H]) -> Result<SelectedFileSet, PipelineError> {
        if self.duplicates == DuplicatePolicy::Reject {
            // Compare normalized paths; unparseable ones are left for staging to reject.
            let mut seen = HashSet::new();
            for handle in handles {
                let key = StagedPath::parse(handle.relative_path())
                    .map(String::from)
                    .unwrap_or_else(|_| handle.relative_path().to_string());
                if !seen.insert(key) {
                    return Err(PipelineError::Staging(format!(
                        "duplicate relative path in selection: {}",
                        handle.relative_path()
                    )));
                }
            }
        }

        let entries = try_join_all(handles.iter().map(|handle| async move {
            let bytes = handle.read_bytes().await.map_err(|e| {
                PipelineError::Staging(format!("failed to read {}: {e}", handle.relative_path()))
            })?;
            tracing::debug!(path = handle.relative_path(), bytes = bytes.len(), "file read");
            Ok::<_, PipelineError>(FileEntry::new(handle.relative_path(), bytes))
        }))
        .await?;

        tracing::info!(files = entries.len(), "selection collected");
        Ok(SelectedFileSet { entries })
    }
}

/// A file on the local disk.
#[derive(Debug, Clone)]
pub struct LocalFile {
    path: PathBuf,
    relative: String,
}

impl LocalFile {
    pub fn new(path: impl Into<PathBuf>, relative: impl Into<String>) -> Self {
        Self {
            path: path.into(),
            relative: relative.into(),
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }
}

impl FileHandle for LocalFile {
    fn relative_path(&self) -> &str {
        &self.relative
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        tokio::fs::read(&self.path).await
    }
}

/// Expand user-given paths into handles.
///
/// A file is selected under its own name. A directory is walked recursively
/// and every file beneath it is selected as `<dir name>/<sub path>`, the way
/// a browser reports files of a picked folder.
pub fn select_local(paths: &[PathBuf]) -> Result<Vec<LocalFile>, PipelineError> {
    let mut files = Vec::new();
    for path in paths {
        if path.is_dir() {
            let prefix = display_name(path)?;
            for entry in WalkDir::new(path).sort_by_file_name() {
                let entry = entry.map_err(|e| {
                    PipelineError::Staging(format!("failed to walk {}: {e}", path.display()))
                })?;
                if !entry.file_type().is_file() {
                    continue;
                }
                let sub = entry
                    .path()
                    .strip_prefix(path)
                    .map_err(|e| PipelineError::Staging(e.to_string()))?;
                let mut relative = prefix.clone();
                for component in sub.components() {
                    relative.push('/');
                    relative.push_str(&component.as_os_str().to_string_lossy());
                }
                files.push(LocalFile::new(entry.path(), relative));
            }
        } else if path.is_file() {
            files.push(LocalFile::new(path, display_name(path)?));
        } else {
            return Err(PipelineError::Staging(format!(
                "no such file or directory: {}",
                path.display()
            )));
        }
    }
    Ok(files)
}

fn display_name(path: &Path) -> Result<String, PipelineError> {
    let absolute = std::path::absolute(path).map_err(|e| {
        PipelineError::Staging(format!("cannot resolve {}: {e}", path.display()))
    })?;
    absolute
        .file_name()
        .map(|n| n.to_string_lossy().into_owned())
        .ok_or_else(|| PipelineError::Staging(format!("path has no name: {}", path.display())))
}

/// A selected file whose bytes are already in memory.
#[derive(Debug, Clone)]
pub struct InMemoryFile {
    relative: String,
    bytes: Vec<u8>,
}

impl InMemoryFile {
    pub fn new(relative: impl Into<String>, bytes: impl Into<Vec<u8>>) -> Self {
        Self {
            relative: relative.into(),
            bytes: bytes.into(),
        }
    }
}

impl FileHandle for InMemoryFile {
    fn relative_path(&self) -> &str {
        &self.relative
    }

    async fn read_bytes(&self) -> std::io::Result<Vec<u8>> {
        Ok(self.bytes.clone())
    }
}
