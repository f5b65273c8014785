//! Writes a collected selection into the sandbox filesystem.
//!
//! Entries are grouped by parent directory. Each group creates its directory
//! once and then writes its files in selection order, so files that need the
//! same new directory never race its creation and a repeated path always ends
//! with the later content. Independent groups are staged concurrently.

use futures::future::try_join_all;

use crate::collector::SelectedFileSet;
use crate::encoding;
use crate::error::PipelineError;
use crate::sandbox::{MemoryFs, StagedPath};

/// A selected file on its way into the sandbox.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EncodedEntry {
    pub path: StagedPath,
    pub payload: String,
}

/// Summary of a completed staging pass.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct StagingReport {
    /// Distinct paths written, in first-seen order.
    pub files: Vec<StagedPath>,
    /// Writes that replaced an earlier entry with the same path.
    pub overwritten: usize,
    pub bytes: usize,
}

/// Validate every path and encode every payload. No sandbox access.
pub fn encode_selection(set: &SelectedFileSet) -> Result<Vec<EncodedEntry>, PipelineError> {
    set.entries()
        .iter()
        .map(|entry| {
            let path = StagedPath::parse(entry.relative_path()).map_err(|e| {
                PipelineError::Staging(format!("invalid path {:?}: {e}", entry.relative_path()))
            })?;
            Ok(EncodedEntry {
                path,
                payload: encoding::encode(entry.bytes()),
            })
        })
        .collect()
}

/// Ensure the parent of `entry` exists, decode it and write it.
///
/// Returns the decoded size and whether an existing file was replaced.
pub async fn stage_entry(fs: &MemoryFs, entry: &EncodedEntry) -> Result<(usize, bool), PipelineError> {
    let parent = entry.path.parent().unwrap_or_else(StagedPath::root);
    if !fs.is_dir(&parent).await {
        fs.create_dir_all(&parent).await.map_err(|e| {
            PipelineError::Staging(format!("cannot create directory {parent}: {e}"))
        })?;
    }

    let bytes = encoding::decode(&entry.payload)
        .map_err(|e| PipelineError::Staging(format!("corrupt payload for {}: {e}", entry.path)))?;
    let len = bytes.len();
    let replaced = fs
        .write_file(&entry.path, bytes)
        .await
        .map_err(|e| PipelineError::Staging(format!("cannot write {}: {e}", entry.path)))?;

    let listing = fs
        .list_dir(&parent)
        .await
        .map_err(|e| PipelineError::Staging(format!("cannot list {parent}: {e}")))?;
    if !listing.iter().any(|name| name == entry.path.file_name()) {
        return Err(PipelineError::Staging(format!(
            "{} missing from {parent} after write",
            entry.path
        )));
    }
    tracing::debug!(path = %entry.path, bytes = len, dir = %parent, listing = ?listing, "staged");
    Ok((len, replaced))
}

/// Stage a whole selection. Paths are validated before anything is written.
pub async fn stage_all(fs: &MemoryFs, set: &SelectedFileSet) -> Result<StagingReport, PipelineError> {
    let encoded = encode_selection(set)?;

    let mut groups: Vec<(StagedPath, Vec<&EncodedEntry>)> = Vec::new();
    for entry in &encoded {
        let parent = entry.path.parent().unwrap_or_else(StagedPath::root);
        match groups.iter_mut().find(|(dir, _)| *dir == parent) {
            Some((_, members)) => members.push(entry),
            None => groups.push((parent, vec![entry])),
        }
    }

    let results = try_join_all(groups.iter().map(|(_, members)| async move {
        let mut written = Vec::with_capacity(members.len());
        for entry in members {
            written.push(stage_entry(fs, entry).await?);
        }
        Ok::<_, PipelineError>(written)
    }))
    .await?;

    let mut report = StagingReport::default();
    for (len, replaced) in results.into_iter().flatten() {
        report.bytes += len;
        if replaced {
            report.overwritten += 1;
        }
    }
    for entry in &encoded {
        if !report.files.contains(&entry.path) {
            report.files.push(entry.path.clone());
        }
    }

    tracing::info!(
        files = report.files.len(),
        overwritten = report.overwritten,
        bytes = report.bytes,
        "selection staged"
    );
    Ok(report)
}
