use std::ffi::OsString;
use std::path::Path;

use tokio::process::Command;

use super::references::{Reference, scan_references};
use super::{EngineDiagnostic, GenerationEngine, GeneratorId};
use crate::sandbox::{MemoryFs, StagedPath};

const TEMPLATE_FILE: &str = ".paperstage-template.docx";

/// Runs an external generator program against a materialized copy of the
/// sandbox filesystem.
///
/// The program is called as
/// `<program> <args..> --class <generator> --entry <path> --template <file> --output <path>`
/// from inside the copy, and must write the document at `--output`.
#[derive(Debug, Clone)]
pub struct ProcessEngine {
    program: OsString,
    args: Vec<OsString>,
}

/// Per-job engine state, threaded through the steps by the caller.
#[derive(Debug)]
pub struct ProcessSession {
    generator: GeneratorId,
    entry: Option<StagedPath>,
    markdown: Option<String>,
    references: Vec<(Reference, StagedPath)>,
    argv: Option<Vec<OsString>>,
}

impl ProcessSession {
    pub fn generator(&self) -> GeneratorId {
        self.generator
    }

    /// Resolved references, available after `load_contents`.
    pub fn references(&self) -> &[(Reference, StagedPath)] {
        &self.references
    }
}

impl ProcessEngine {
    pub fn new(program: impl Into<OsString>, args: impl IntoIterator<Item = impl Into<OsString>>) -> Self {
        Self {
            program: program.into(),
            args: args.into_iter().map(Into::into).collect(),
        }
    }
}

impl GenerationEngine for ProcessEngine {
    type Session = ProcessSession;

    async fn instantiate(&self, generator: GeneratorId) -> Result<ProcessSession, EngineDiagnostic> {
        Ok(ProcessSession {
            generator,
            entry: None,
            markdown: None,
            references: Vec::new(),
            argv: None,
        })
    }

    async fn load_markdown(
        &self,
        session: &mut ProcessSession,
        fs: &MemoryFs,
        entry: &StagedPath,
    ) -> Result<(), EngineDiagnostic> {
        let bytes = fs
            .read_file(entry)
            .await
            .map_err(|e| EngineDiagnostic::new("load_md", e.to_string()))?;
        let markdown = String::from_utf8(bytes)
            .map_err(|_| EngineDiagnostic::new("load_md", format!("{entry} is not valid UTF-8")))?;
        session.entry = Some(entry.clone());
        session.markdown = Some(markdown);
        Ok(())
    }

    async fn load_contents(&self, session: &mut ProcessSession, fs: &MemoryFs) -> Result<(), EngineDiagnostic> {
        let (Some(entry), Some(markdown)) = (&session.entry, &session.markdown) else {
            return Err(EngineDiagnostic::new("load_contents", "no markdown loaded"));
        };

        let mut resolved = Vec::new();
        for reference in scan_references(markdown) {
            let path = entry.sibling(&reference.target).map_err(|e| {
                EngineDiagnostic::new("load_contents", format!("bad reference {:?}: {e}", reference.target))
            })?;
            if !fs.is_file(&path).await {
                return Err(EngineDiagnostic::new(
                    "load_contents",
                    format!("{:?} reference not staged: {path}", reference.kind),
                ));
            }
            resolved.push((reference, path));
        }
        tracing::debug!(entry = %entry, references = resolved.len(), "contents resolved");
        session.references = resolved;
        Ok(())
    }

    async fn compile(&self, session: &mut ProcessSession) -> Result<(), EngineDiagnostic> {
        let Some(entry) = &session.entry else {
            return Err(EngineDiagnostic::new("compile", "no markdown loaded"));
        };
        let mut argv = self.args.clone();
        argv.extend(
            [
                "--class",
                session.generator.as_str(),
                "--entry",
                entry.as_str(),
                "--template",
                TEMPLATE_FILE,
                "--output",
            ]
            .map(OsString::from),
        );
        session.argv = Some(argv);
        Ok(())
    }

    async fn render(
        &self,
        session: ProcessSession,
        fs: &MemoryFs,
        template: &[u8],
        output: &StagedPath,
    ) -> Result<(), EngineDiagnostic> {
        let Some(mut argv) = session.argv else {
            return Err(EngineDiagnostic::new("render", "document was not compiled"));
        };
        argv.push(OsString::from(output.as_str()));

        let workdir = tempfile::tempdir()
            .map_err(|e| EngineDiagnostic::new("render", format!("cannot create workdir: {e}")))?;
        materialize(fs, workdir.path(), output).await?;
        tokio::fs::write(workdir.path().join(TEMPLATE_FILE), template)
            .await
            .map_err(|e| EngineDiagnostic::new("render", format!("cannot write template: {e}")))?;

        tracing::debug!(program = ?self.program, args = ?argv, "running generator");
        let out = Command::new(&self.program)
            .args(&argv)
            .current_dir(workdir.path())
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|e| EngineDiagnostic::new("render", format!("cannot start {:?}: {e}", self.program)))?;

        if !out.status.success() {
            let stderr = String::from_utf8_lossy(&out.stderr).trim().to_string();
            let code = out.status.code().unwrap_or(-1);
            return Err(EngineDiagnostic::new(
                "render",
                if stderr.is_empty() {
                    format!("generator exited with status {code}")
                } else {
                    format!("generator exited with status {code}: {stderr}")
                },
            ));
        }

        let produced = workdir.path().join(output.as_str());
        let bytes = match tokio::fs::read(&produced).await {
            Ok(bytes) => bytes,
            // Nothing produced: leave the sandbox untouched and let export report it.
            Err(e) if e.kind() == std::io::ErrorKind::NotFound => return Ok(()),
            Err(e) => return Err(EngineDiagnostic::new("render", format!("cannot read output: {e}"))),
        };
        if let Some(parent) = output.parent() {
            fs.create_dir_all(&parent)
                .await
                .map_err(|e| EngineDiagnostic::new("render", e.to_string()))?;
        }
        fs.write_file(output, bytes)
            .await
            .map_err(|e| EngineDiagnostic::new("render", e.to_string()))?;
        Ok(())
    }
}

/// Copy every sandbox file under `root`, except whatever sits at `output`.
async fn materialize(fs: &MemoryFs, root: &Path, output: &StagedPath) -> Result<(), EngineDiagnostic> {
    for (path, bytes) in fs.snapshot().await {
        if &path == output {
            continue;
        }
        let target = root.join(path.as_str());
        if let Some(dir) = target.parent() {
            tokio::fs::create_dir_all(dir)
                .await
                .map_err(|e| EngineDiagnostic::new("render", format!("cannot create {}: {e}", dir.display())))?;
        }
        tokio::fs::write(&target, bytes)
            .await
            .map_err(|e| EngineDiagnostic::new("render", format!("cannot write {path}: {e}")))?;
    }
    Ok(())
}
