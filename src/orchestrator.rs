use std::future::Future;
use std::time::Duration;

use serde::{Deserialize, Serialize};
use tokio::sync::{Semaphore, SemaphorePermit};
use tokio_util::sync::CancellationToken;

use crate::collector::{DuplicatePolicy, FileCollector, FileHandle, SelectedFileSet};
use crate::engine::GenerationEngine;
use crate::error::PipelineError;
use crate::exporter::{ArtifactExporter, DEFAULT_ARTIFACT_NAME, Delivery, DownloadSink};
use crate::invoker::{DocumentJob, GenerationInvoker};
use crate::sandbox::{MemoryFs, RuntimeContext, StagedPath};
use crate::stager::{self, StagingReport};
use crate::state_machine::{AuditRecord, Failure, Job, JobOutcome, JobRequest, State, StateMachine, Transition};
use crate::template::TemplateSource;
use crate::ui::StatusSurface;

/// Per-stage time budgets, in milliseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StageTimeouts {
    #[serde(default = "default_staging_ms")]
    pub staging_ms: u64,
    #[serde(default = "default_fetch_ms")]
    pub fetch_ms: u64,
    #[serde(default = "default_generate_ms")]
    pub generate_ms: u64,
    #[serde(default = "default_export_ms")]
    pub export_ms: u64,
}

fn default_staging_ms() -> u64 {
    30_000
}

fn default_fetch_ms() -> u64 {
    30_000
}

fn default_generate_ms() -> u64 {
    300_000
}

fn default_export_ms() -> u64 {
    30_000
}

impl Default for StageTimeouts {
    fn default() -> Self {
        Self {
            staging_ms: default_staging_ms(),
            fetch_ms: default_fetch_ms(),
            generate_ms: default_generate_ms(),
            export_ms: default_export_ms(),
        }
    }
}

/// What happens when a job reaches generation while another one holds the engine.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum AdmissionPolicy {
    /// Fail immediately with `Busy`.
    #[default]
    Reject,
    /// Wait for the running job, for at most the generate time budget.
    Queue,
}

#[derive(Debug, Clone)]
pub struct OrchestratorConfig {
    pub timeouts: StageTimeouts,
    pub admission: AdmissionPolicy,
    pub duplicates: DuplicatePolicy,
    /// Fixed path the engine renders into.
    pub output_path: StagedPath,
    pub artifact_name: String,
}

impl Default for OrchestratorConfig {
    fn default() -> Self {
        Self {
            timeouts: StageTimeouts::default(),
            admission: AdmissionPolicy::default(),
            duplicates: DuplicatePolicy::default(),
            output_path: StagedPath::parse(DEFAULT_ARTIFACT_NAME).unwrap_or_else(|_| StagedPath::root()),
            artifact_name: DEFAULT_ARTIFACT_NAME.to_string(),
        }
    }
}

/// A finished job.
#[derive(Debug, Clone)]
pub struct JobReport {
    pub audit: AuditRecord,
    pub delivery: Delivery,
}

/// A failed job, with its audit trail.
#[derive(Debug, Clone, thiserror::Error)]
#[error("{error}")]
pub struct JobFailed {
    pub error: PipelineError,
    pub audit: AuditRecord,
}

/// Collects and stages selections, and drives document jobs through the
/// state machine one at a time.
pub struct PaperOrchestrator<E, T, S> {
    invoker: GenerationInvoker<E, T>,
    exporter: ArtifactExporter,
    sink: S,
    collector: FileCollector,
    timeouts: StageTimeouts,
    admission: AdmissionPolicy,
    gate: Semaphore,
}

impl<E, T, S> PaperOrchestrator<E, T, S>
where
    E: GenerationEngine,
    T: TemplateSource,
    S: DownloadSink,
{
    pub fn new(config: OrchestratorConfig, engine: E, templates: T, sink: S) -> Self {
        Self {
            invoker: GenerationInvoker::new(engine, templates),
            exporter: ArtifactExporter::new(config.output_path, config.artifact_name),
            sink,
            collector: FileCollector::new(config.duplicates),
            timeouts: config.timeouts,
            admission: config.admission,
            gate: Semaphore::new(1),
        }
    }

    /// Read the user's selection into memory.
    pub async fn collect<H: FileHandle>(
        &self,
        handles: &[H],
        cancel: &CancellationToken,
    ) -> Result<SelectedFileSet, PipelineError> {
        guarded(State::Idle, self.timeouts.staging_ms, cancel, self.collector.collect(handles)).await
    }

    /// Write a collected selection into the session's sandbox filesystem.
    pub async fn stage(
        &self,
        ctx: &RuntimeContext,
        set: &SelectedFileSet,
        cancel: &CancellationToken,
    ) -> Result<StagingReport, PipelineError> {
        guarded(State::Idle, self.timeouts.staging_ms, cancel, stager::stage_all(ctx.fs(), set)).await
    }

    /// Stage `set` into a fresh session.
    ///
    /// On failure the session is torn down and the failure is reported to
    /// `status`, the same way a failed job ends.
    pub async fn open_session(
        &self,
        set: &SelectedFileSet,
        status: &impl StatusSurface,
        cancel: &CancellationToken,
    ) -> Result<RuntimeContext, PipelineError> {
        let ctx = RuntimeContext::init();
        match self.stage(&ctx, set, cancel).await {
            Ok(_) => Ok(ctx),
            Err(error) => {
                ctx.teardown().await;
                let failure = Failure::from(&error);
                status.failed(&failure);
                tracing::error!(kind = %failure.kind, error = %error, "staging failed");
                Err(error)
            }
        }
    }

    /// Run one job against a staged session, then tear the session down.
    pub async fn run_job(
        &self,
        ctx: RuntimeContext,
        request: JobRequest,
        status: &impl StatusSurface,
        cancel: &CancellationToken,
    ) -> Result<JobReport, JobFailed> {
        let mut job = Job::new(request);
        tracing::info!(job = %job.id, session = ctx.id(), "job started");

        let result = self.execute_job(&ctx, &mut job, status, cancel).await;
        let session = ctx.id().to_string();
        ctx.teardown().await;

        match result {
            Ok(delivery) => {
                status.completed(&delivery.location);
                tracing::info!(job = %job.id, location = %delivery.location, "job done");
                let audit = AuditRecord::from_job(&job, &session, Some(delivery.location.clone()));
                Ok(JobReport { audit, delivery })
            }
            Err(error) => {
                let failure = Failure::from(&error);
                status.failed(&failure);
                tracing::error!(job = %job.id, kind = %failure.kind, error = %error, "job failed");
                let audit = AuditRecord::from_job(&job, &session, None);
                Err(JobFailed { error, audit })
            }
        }
    }

    /// Drive `job` from `Idle` to a terminal state without tearing down `ctx`.
    pub async fn execute_job(
        &self,
        ctx: &RuntimeContext,
        job: &mut Job,
        status: &impl StatusSurface,
        cancel: &CancellationToken,
    ) -> Result<Delivery, PipelineError> {
        let t = self.timeouts;
        record(job, status, Ok(()))?;

        let request = job.request.clone();
        let validated = guarded(State::Validating, t.staging_ms, cancel, validate(ctx.fs(), &request)).await;
        let document = record(job, status, validated)?;

        let fetched = guarded(
            State::FetchingTemplate,
            t.fetch_ms,
            cancel,
            self.invoker.fetch_template(&document),
        )
        .await;
        let template = record(job, status, fetched)?;

        // The engine permit is taken before leaving StagingVerified and held
        // until generation ends; a queued job waits at most `generate_ms`.
        let verified = guarded(
            State::StagingVerified,
            t.staging_ms,
            cancel,
            verify_staging(ctx.fs(), &document, self.exporter.output()),
        )
        .await;
        let admitted = match verified {
            Ok(()) => guarded(State::StagingVerified, t.generate_ms, cancel, self.admit()).await,
            Err(e) => Err(e),
        };
        let permit = record(job, status, admitted)?;

        let generated = guarded(
            State::Generating,
            t.generate_ms,
            cancel,
            self.invoker.generate(ctx.fs(), &document, &template, self.exporter.output()),
        )
        .await;
        drop(permit);
        record(job, status, generated)?;

        let exported = guarded(
            State::Exporting,
            t.export_ms,
            cancel,
            self.exporter.export(ctx.fs(), &self.sink),
        )
        .await;
        record(job, status, exported)
    }

    async fn admit(&self) -> Result<SemaphorePermit<'_>, PipelineError> {
        match self.admission {
            AdmissionPolicy::Reject => self.gate.try_acquire().map_err(|_| PipelineError::Busy),
            AdmissionPolicy::Queue => self.gate.acquire().await.map_err(|_| PipelineError::Busy),
        }
    }
}

/// Apply the outcome of the step run in the job's current state.
fn record<V>(job: &mut Job, status: &impl StatusSurface, result: Result<V, PipelineError>) -> Result<V, PipelineError> {
    let outcome = match &result {
        Ok(_) => JobOutcome::Success,
        Err(e) => JobOutcome::Failure(Failure::from(e)),
    };
    let from = job.state;
    match StateMachine::next(job, outcome) {
        Transition::Next(state) => {
            tracing::debug!(job = %job.id, %from, to = %state, "transition");
            status.stage(state);
        }
        Transition::Complete(_) => {
            tracing::debug!(job = %job.id, %from, to = %job.state, "transition");
        }
    }
    result
}

/// Run `work` unless it is cancelled or outlives `limit_ms`.
async fn guarded<V>(
    stage: State,
    limit_ms: u64,
    cancel: &CancellationToken,
    work: impl Future<Output = Result<V, PipelineError>>,
) -> Result<V, PipelineError> {
    tokio::select! {
        biased;
        _ = cancel.cancelled() => Err(PipelineError::Cancelled { stage }),
        res = tokio::time::timeout(Duration::from_millis(limit_ms), work) => {
            res.unwrap_or_else(|_| Err(PipelineError::timed_out(stage, limit_ms)))
        }
    }
}

/// Check the request and make sure the entry file was staged. No network.
async fn validate(fs: &MemoryFs, request: &JobRequest) -> Result<DocumentJob, PipelineError> {
    let document = DocumentJob::prepare(&request.document_type, &request.entry)?;
    if !fs.is_file(&document.entry).await {
        return Err(PipelineError::Staging(format!(
            "entry file {} is not among the staged files",
            document.entry
        )));
    }
    Ok(document)
}

/// Confirm the entry is still visible where the engine will look for it,
/// and clear the output path so only a freshly rendered file can be exported.
async fn verify_staging(fs: &MemoryFs, document: &DocumentJob, output: &StagedPath) -> Result<(), PipelineError> {
    if &document.entry == output {
        return Err(PipelineError::Staging(format!("entry file {output} is also the output path")));
    }
    let stale = fs
        .remove_file(output)
        .await
        .map_err(|e| PipelineError::Staging(format!("cannot clear output path {output}: {e}")))?;
    if stale {
        tracing::warn!(path = %output, "staged file at the output path was discarded");
    }

    let dir = document.entry.parent().unwrap_or_else(StagedPath::root);
    let listing = fs
        .list_dir(&dir)
        .await
        .map_err(|e| PipelineError::Staging(format!("cannot list {dir}: {e}")))?;
    if !listing.iter().any(|name| name == document.entry.file_name()) {
        return Err(PipelineError::Staging(format!("entry file {} disappeared", document.entry)));
    }
    tracing::debug!(dir = %dir, listing = ?listing, "staging verified");
    Ok(())
}
