use std::path::PathBuf;
use std::process::ExitCode;

use anyhow::{Context, Result};
use clap::Parser;
use console::Term;
use tokio_util::sync::CancellationToken;
use tracing_subscriber::EnvFilter;

use paperstage::cli::{Cli, Command, LogLevel};
use paperstage::collector::{self, FileCollector};
use paperstage::config::PaperConfig;
use paperstage::engine::ProcessEngine;
use paperstage::exporter::DirectorySink;
use paperstage::invoker::DocumentType;
use paperstage::orchestrator::PaperOrchestrator;
use paperstage::state_machine::{Failure, JobRequest};
use paperstage::template::AnyTemplateSource;
use paperstage::ui::{JobProgress, StatusSurface};

#[tokio::main]
async fn main() -> Result<ExitCode> {
    let cli = Cli::parse();
    init_tracing(cli.log_level);

    let config = PaperConfig::load(cli.config.as_deref())?;
    tracing::debug!(?config, "configuration loaded");

    match cli.command {
        Command::Types => {
            for document_type in DocumentType::ALL {
                let profile = document_type.profile();
                println!(
                    "{:<6} {:<17} {}",
                    document_type.tag(),
                    profile.generator.as_str(),
                    profile.template_asset
                );
            }
            Ok(ExitCode::SUCCESS)
        }
        Command::Manifest { paths } => {
            let files = collector::select_local(&paths)?;
            let set = FileCollector::new(config.duplicate_paths).collect(&files).await?;
            println!("{}", set.manifest());
            Ok(ExitCode::SUCCESS)
        }
        Command::Generate {
            paths,
            document_type,
            entry,
            out,
        } => generate(&config, paths, document_type, entry, out, cli.verbose).await,
    }
}

// Logs go to stderr; stdout carries only the manifest and the artifact location.
fn init_tracing(level: LogLevel) {
    tracing_subscriber::fmt()
        .with_writer(std::io::stderr)
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level.directive())))
        .init();
}

async fn generate(
    config: &PaperConfig,
    paths: Vec<PathBuf>,
    document_type: String,
    entry: Option<String>,
    out: Option<PathBuf>,
    verbose: bool,
) -> Result<ExitCode> {
    let templates = AnyTemplateSource::from_location(&config.template_base)
        .with_context(|| format!("invalid template_base {:?}", config.template_base))?;
    let engine = ProcessEngine::new(&config.engine_program, &config.engine_args);
    let sink = DirectorySink::new(out.unwrap_or_else(|| config.output_dir.clone()));
    let orchestrator = PaperOrchestrator::new(config.orchestrator_config()?, engine, templates, sink);

    let cancel = CancellationToken::new();
    let on_interrupt = cancel.clone();
    tokio::spawn(async move {
        if tokio::signal::ctrl_c().await.is_ok() {
            tracing::warn!("interrupt received, cancelling job");
            on_interrupt.cancel();
        }
    });

    let collecting = JobProgress::start("collecting selection");
    let collected = match collector::select_local(&paths) {
        Ok(files) => orchestrator.collect(&files, &cancel).await,
        Err(e) => Err(e),
    };
    let set = match collected {
        Ok(set) => set,
        Err(e) => {
            collecting.failed(&Failure::from(&e));
            return Ok(ExitCode::FAILURE);
        }
    };
    collecting.clear();
    println!("{}", set.manifest());

    let entry = match entry {
        Some(entry) => entry,
        None => tokio::task::spawn_blocking(prompt_entry).await??,
    };

    let staging = JobProgress::start("staging selection");
    let Ok(ctx) = orchestrator.open_session(&set, &staging, &cancel).await else {
        return Ok(ExitCode::FAILURE);
    };
    staging.clear();

    let progress = JobProgress::start(&format!("{document_type} {entry}"));
    let request = JobRequest::new(document_type, entry);
    match orchestrator.run_job(ctx, request, &progress, &cancel).await {
        Ok(report) => {
            if verbose {
                progress.print_audit(&report.audit);
            }
            println!("{}", report.delivery.location);
            Ok(ExitCode::SUCCESS)
        }
        Err(failed) => {
            if verbose {
                progress.print_audit(&failed.audit);
            }
            Ok(ExitCode::FAILURE)
        }
    }
}

fn prompt_entry() -> Result<String> {
    let term = Term::stderr();
    term.write_str("Entry markdown file (path within the selection): ")?;
    let line = term.read_line()?;
    Ok(line.trim().to_string())
}
