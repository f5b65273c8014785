mod job;
mod state;

pub use job::{AuditRecord, Failure, Job, JobOutcome, JobRequest, JobStatus};
pub use state::{State, StateMachine, Transition};
