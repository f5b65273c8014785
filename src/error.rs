use thiserror::Error;

use crate::state_machine::State;

/// Every failure the staging and generation pipeline can surface.
///
/// Each stage translates its own low-level errors into one of these variants
/// before returning, so callers only ever see a classified failure.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum PipelineError {
    #[error("unsupported document type: {0:?} (expected \"grad\" or \"trans\")")]
    InvalidDocumentType(String),

    #[error("staging failed: {0}")]
    Staging(String),

    #[error("template fetch failed: {0}")]
    TemplateFetch(String),

    #[error("generation failed: {0}")]
    Generation(String),

    #[error("export failed: {0}")]
    Export(String),

    #[error("job cancelled during {stage}")]
    Cancelled { stage: State },

    #[error("another document job is already generating")]
    Busy,
}

impl PipelineError {
    pub fn kind(&self) -> ErrorKind {
        match self {
            PipelineError::InvalidDocumentType(_) => ErrorKind::InvalidDocumentType,
            PipelineError::Staging(_) => ErrorKind::StagingFailure,
            PipelineError::TemplateFetch(_) => ErrorKind::TemplateFetchFailure,
            PipelineError::Generation(_) => ErrorKind::GenerationFailure,
            PipelineError::Export(_) => ErrorKind::ExportFailure,
            PipelineError::Cancelled { .. } => ErrorKind::Cancelled,
            PipelineError::Busy => ErrorKind::Busy,
        }
    }

    /// The failure a stage reports when its time budget runs out.
    pub fn timed_out(stage: State, after_ms: u64) -> Self {
        let message = format!("{stage} timed out after {after_ms}ms");
        match stage {
            State::FetchingTemplate => PipelineError::TemplateFetch(message),
            State::Generating => PipelineError::Generation(message),
            State::Exporting => PipelineError::Export(message),
            _ => PipelineError::Staging(message),
        }
    }
}

/// Classifies a failed job for the status surface and audit trail.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub enum ErrorKind {
    /// Unsupported type tag; rejected before any side effect.
    InvalidDocumentType,
    /// File read, directory creation, write, or path validation error.
    StagingFailure,
    /// Network or local error retrieving the template asset.
    TemplateFetchFailure,
    /// Error raised inside the generation engine.
    GenerationFailure,
    /// Missing or unreadable output, or delivery error.
    ExportFailure,
    Cancelled,
    Busy,
}

impl std::fmt::Display for ErrorKind {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            ErrorKind::InvalidDocumentType => write!(f, "InvalidDocumentType"),
            ErrorKind::StagingFailure => write!(f, "StagingFailure"),
            ErrorKind::TemplateFetchFailure => write!(f, "TemplateFetchFailure"),
            ErrorKind::GenerationFailure => write!(f, "GenerationFailure"),
            ErrorKind::ExportFailure => write!(f, "ExportFailure"),
            ErrorKind::Cancelled => write!(f, "Cancelled"),
            ErrorKind::Busy => write!(f, "Busy"),
        }
    }
}
