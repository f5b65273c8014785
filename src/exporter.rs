//! Reads the rendered document out of the sandbox and hands it to the user.

use std::io::Write;
use std::path::{Path, PathBuf};

use crate::error::PipelineError;
use crate::sandbox::{MemoryFs, StagedPath, VfsError};

pub const DOCX_MIME: &str = "application/msword;charset=utf-8";
pub const DEFAULT_ARTIFACT_NAME: &str = "out.docx";

/// The generated document, ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct GeneratedArtifact {
    pub bytes: Vec<u8>,
    pub suggested_file_name: String,
    pub mime_type: String,
}

/// Where an artifact ended up.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Delivery {
    pub location: String,
    pub bytes: usize,
}

/// Something that can present an artifact to the user as a download.
#[allow(async_fn_in_trait)]
pub trait DownloadSink {
    async fn deliver(&self, artifact: GeneratedArtifact) -> Result<Delivery, PipelineError>;
}

#[derive(Debug, Clone)]
pub struct ArtifactExporter {
    output: StagedPath,
    file_name: String,
}

impl ArtifactExporter {
    pub fn new(output: StagedPath, file_name: impl Into<String>) -> Self {
        Self {
            output,
            file_name: file_name.into(),
        }
    }

    pub fn output(&self) -> &StagedPath {
        &self.output
    }

    /// Read the rendered bytes from the fixed output path.
    pub async fn collect(&self, fs: &MemoryFs) -> Result<GeneratedArtifact, PipelineError> {
        let bytes = fs.read_file(&self.output).await.map_err(|e| match e {
            VfsError::NotFound(_) => {
                PipelineError::Export(format!("generation produced no output at {}", self.output))
            }
            other => PipelineError::Export(format!("cannot read {}: {other}", self.output)),
        })?;
        if bytes.is_empty() {
            return Err(PipelineError::Export(format!("output at {} is empty", self.output)));
        }
        Ok(GeneratedArtifact {
            bytes,
            suggested_file_name: self.file_name.clone(),
            mime_type: DOCX_MIME.to_string(),
        })
    }

    pub async fn export<S: DownloadSink>(&self, fs: &MemoryFs, sink: &S) -> Result<Delivery, PipelineError> {
        let artifact = self.collect(fs).await?;
        let delivery = sink.deliver(artifact).await?;
        tracing::info!(location = %delivery.location, bytes = delivery.bytes, "artifact delivered");
        Ok(delivery)
    }
}

/// Saves artifacts into a directory.
///
/// Bytes go to a temporary file next to the destination which is then
/// renamed into place, so a partial download is never visible.
#[derive(Debug, Clone)]
pub struct DirectorySink {
    dir: PathBuf,
}

impl DirectorySink {
    pub fn new(dir: impl Into<PathBuf>) -> Self {
        Self { dir: dir.into() }
    }

    pub fn dir(&self) -> &Path {
        &self.dir
    }
}

impl DownloadSink for DirectorySink {
    async fn deliver(&self, artifact: GeneratedArtifact) -> Result<Delivery, PipelineError> {
        let name = Path::new(&artifact.suggested_file_name)
            .file_name()
            .map(|n| n.to_owned())
            .ok_or_else(|| {
                PipelineError::Export(format!("invalid artifact name: {:?}", artifact.suggested_file_name))
            })?;
        let dir = self.dir.clone();

        tokio::task::spawn_blocking(move || {
            std::fs::create_dir_all(&dir)?;
            let mut tmp = tempfile::NamedTempFile::new_in(&dir)?;
            tmp.write_all(&artifact.bytes)?;
            tmp.flush()?;
            let target = dir.join(name);
            tmp.persist(&target).map_err(|e| e.error)?;
            Ok::<_, std::io::Error>(Delivery {
                location: target.display().to_string(),
                bytes: artifact.bytes.len(),
            })
        })
        .await
        .map_err(|e| PipelineError::Export(format!("delivery task failed: {e}")))?
        .map_err(|e| PipelineError::Export(format!("cannot save artifact: {e}")))
    }
}
