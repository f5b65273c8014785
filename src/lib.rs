//! paperstage: stage a markdown paper and its assets into a per-session
//! sandbox filesystem, then render it to docx through a generation engine.

pub mod cli;
pub mod collector;
pub mod config;
pub mod encoding;
pub mod engine;
pub mod error;
pub mod exporter;
pub mod invoker;
pub mod orchestrator;
pub mod sandbox;
pub mod stager;
pub mod state_machine;
pub mod template;
pub mod ui;

pub use error::{ErrorKind, PipelineError};
pub use orchestrator::{JobFailed, JobReport, PaperOrchestrator};
