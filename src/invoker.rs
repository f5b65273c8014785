//! Maps a document type to its template and generator, and drives the
//! generation engine through a full run.

use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

use crate::engine::{EngineDiagnostic, GenerationEngine, GeneratorId};
use crate::error::PipelineError;
use crate::sandbox::{MemoryFs, StagedPath};
use crate::template::TemplateSource;

/// The kinds of paper the engine can produce.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum DocumentType {
    /// Graduation thesis.
    Grad,
    /// Foreign literature translation.
    Trans,
}

/// Static configuration for one document type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DocumentProfile {
    pub template_asset: &'static str,
    pub generator: GeneratorId,
}

impl DocumentType {
    pub const ALL: [DocumentType; 2] = [DocumentType::Grad, DocumentType::Trans];

    pub fn tag(&self) -> &'static str {
        match self {
            DocumentType::Grad => "grad",
            DocumentType::Trans => "trans",
        }
    }

    pub fn profile(&self) -> DocumentProfile {
        match self {
            DocumentType::Grad => DocumentProfile {
                template_asset: "毕业设计（论文）模板-docx.docx",
                generator: GeneratorId::GraduationPaper,
            },
            DocumentType::Trans => DocumentProfile {
                template_asset: "外文翻译模板-docx.docx",
                generator: GeneratorId::TranslationPaper,
            },
        }
    }
}

impl FromStr for DocumentType {
    type Err = PipelineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "grad" => Ok(DocumentType::Grad),
            "trans" => Ok(DocumentType::Trans),
            other => Err(PipelineError::InvalidDocumentType(other.to_string())),
        }
    }
}

impl fmt::Display for DocumentType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.tag())
    }
}

/// A validated request to generate one document.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DocumentJob {
    pub document_type: DocumentType,
    pub entry: StagedPath,
    pub template_asset: String,
    pub generator: GeneratorId,
}

impl DocumentJob {
    /// Check the type tag and entry path. Pure: touches neither the network
    /// nor the sandbox.
    pub fn prepare(document_type: &str, entry: &str) -> Result<Self, PipelineError> {
        let document_type: DocumentType = document_type.parse()?;
        let entry = StagedPath::parse(entry)
            .map_err(|e| PipelineError::Staging(format!("invalid entry path {entry:?}: {e}")))?;
        if !entry.file_name().ends_with(".md") {
            return Err(PipelineError::Staging(format!(
                "entry file must be a markdown (.md) file: {entry}"
            )));
        }
        let profile = document_type.profile();
        Ok(Self {
            document_type,
            entry,
            template_asset: profile.template_asset.to_string(),
            generator: profile.generator,
        })
    }
}

/// Owns the template source and the engine; runs the generation steps.
#[derive(Debug)]
pub struct GenerationInvoker<E, T> {
    engine: E,
    templates: T,
}

impl<E: GenerationEngine, T: TemplateSource> GenerationInvoker<E, T> {
    pub fn new(engine: E, templates: T) -> Self {
        Self { engine, templates }
    }

    pub async fn fetch_template(&self, job: &DocumentJob) -> Result<Vec<u8>, PipelineError> {
        let bytes = self
            .templates
            .fetch(&job.template_asset)
            .await
            .map_err(|e| PipelineError::TemplateFetch(e.to_string()))?;
        tracing::info!(asset = %job.template_asset, bytes = bytes.len(), "template fetched");
        Ok(bytes)
    }

    /// Instantiate, load, compile and render `job` into `output`.
    pub async fn generate(
        &self,
        fs: &MemoryFs,
        job: &DocumentJob,
        template: &[u8],
        output: &StagedPath,
    ) -> Result<(), PipelineError> {
        self.run_engine(fs, job, template, output)
            .await
            .map_err(|diag| PipelineError::Generation(diag.to_string()))?;
        tracing::info!(generator = %job.generator, entry = %job.entry, output = %output, "render ok");
        Ok(())
    }

    async fn run_engine(
        &self,
        fs: &MemoryFs,
        job: &DocumentJob,
        template: &[u8],
        output: &StagedPath,
    ) -> Result<(), EngineDiagnostic> {
        let mut session = self.engine.instantiate(job.generator).await?;
        self.engine.load_markdown(&mut session, fs, &job.entry).await?;
        self.engine.load_contents(&mut session, fs).await?;
        self.engine.compile(&mut session).await?;
        self.engine.render(session, fs, template, output).await
    }
}
