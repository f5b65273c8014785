//! The call boundary into the document generation engine.
//!
//! Every step is a typed method: paths travel as [`StagedPath`]s and the
//! template as raw bytes, never spliced into code or command strings.

mod process;
mod references;

pub use process::{ProcessEngine, ProcessSession};
pub use references::{Reference, ReferenceKind, scan_references};

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::sandbox::{MemoryFs, StagedPath};

/// Which generator class the engine instantiates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum GeneratorId {
    GraduationPaper,
    TranslationPaper,
}

impl GeneratorId {
    pub fn as_str(&self) -> &'static str {
        match self {
            GeneratorId::GraduationPaper => "GraduationPaper",
            GeneratorId::TranslationPaper => "TranslationPaper",
        }
    }
}

impl fmt::Display for GeneratorId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Diagnostic text reported by the engine when a step fails.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
#[error("{step}: {message}")]
pub struct EngineDiagnostic {
    pub step: &'static str,
    pub message: String,
}

impl EngineDiagnostic {
    pub fn new(step: &'static str, message: impl Into<String>) -> Self {
        Self {
            step,
            message: message.into(),
        }
    }
}

/// A document generation engine living inside the sandbox.
///
/// Steps run in order: `instantiate`, `load_markdown`, `load_contents`,
/// `compile`, then `render`, which consumes the session and must leave the
/// rendered document at `output`.
#[allow(async_fn_in_trait)]
pub trait GenerationEngine {
    type Session;

    async fn instantiate(&self, generator: GeneratorId) -> Result<Self::Session, EngineDiagnostic>;

    async fn load_markdown(
        &self,
        session: &mut Self::Session,
        fs: &MemoryFs,
        entry: &StagedPath,
    ) -> Result<(), EngineDiagnostic>;

    /// Pull in everything the markdown refers to (images, bibliography, linked sections).
    async fn load_contents(&self, session: &mut Self::Session, fs: &MemoryFs) -> Result<(), EngineDiagnostic>;

    async fn compile(&self, session: &mut Self::Session) -> Result<(), EngineDiagnostic>;

    async fn render(
        &self,
        session: Self::Session,
        fs: &MemoryFs,
        template: &[u8],
        output: &StagedPath,
    ) -> Result<(), EngineDiagnostic>;
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn generator_names() {
        assert_eq!(GeneratorId::GraduationPaper.to_string(), "GraduationPaper");
        assert_eq!(GeneratorId::TranslationPaper.as_str(), "TranslationPaper");
    }

    #[test]
    fn diagnostic_display_names_step() {
        let diag = EngineDiagnostic::new("compile", "unbalanced math block");
        assert_eq!(diag.to_string(), "compile: unbalanced math block");
    }
}
