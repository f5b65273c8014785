use std::fmt;

use serde::{Deserialize, Serialize};

use super::job::{Job, JobOutcome, JobStatus};
use crate::error::ErrorKind;

/// The states of a document job.
///
/// Each job flows through: IDLE → VALIDATING → FETCHING_TEMPLATE →
/// STAGING_VERIFIED → GENERATING → EXPORTING → DONE, and can drop into
/// FAILED or CANCELLED from any non-terminal state.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum State {
    Idle,
    Validating,
    FetchingTemplate,
    StagingVerified,
    Generating,
    Exporting,
    Done,
    Failed,
    Cancelled,
}

impl State {
    pub fn is_terminal(&self) -> bool {
        matches!(self, State::Done | State::Failed | State::Cancelled)
    }

    fn successor(&self) -> Option<State> {
        match self {
            State::Idle => Some(State::Validating),
            State::Validating => Some(State::FetchingTemplate),
            State::FetchingTemplate => Some(State::StagingVerified),
            State::StagingVerified => Some(State::Generating),
            State::Generating => Some(State::Exporting),
            State::Exporting => Some(State::Done),
            State::Done | State::Failed | State::Cancelled => None,
        }
    }
}

impl fmt::Display for State {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            State::Idle => write!(f, "IDLE"),
            State::Validating => write!(f, "VALIDATING"),
            State::FetchingTemplate => write!(f, "FETCHING_TEMPLATE"),
            State::StagingVerified => write!(f, "STAGING_VERIFIED"),
            State::Generating => write!(f, "GENERATING"),
            State::Exporting => write!(f, "EXPORTING"),
            State::Done => write!(f, "DONE"),
            State::Failed => write!(f, "FAILED"),
            State::Cancelled => write!(f, "CANCELLED"),
        }
    }
}

/// The result of evaluating a state transition.
#[derive(Debug, Clone, PartialEq)]
pub enum Transition {
    /// Advance to the next state.
    Next(State),
    /// The job reached a terminal state.
    Complete(JobOutcome),
}

/// Drives a `Job` through the state machine. There is no retry: a failure
/// anywhere ends the job and the caller starts over from a new selection.
pub struct StateMachine;

impl StateMachine {
    /// Compute and apply the next transition for `job` given the outcome of
    /// the step run in its current state.
    ///
    /// - Success advances to the successor state; reaching `Done` completes.
    /// - Failure moves to `Failed`, or `Cancelled` for a cancellation.
    /// - Terminal states stay put and report their recorded outcome.
    pub fn next(job: &mut Job, outcome: JobOutcome) -> Transition {
        if job.state.is_terminal() {
            return Transition::Complete(job.outcome());
        }

        let transition = match (&outcome, job.state.successor()) {
            (JobOutcome::Success, Some(State::Done)) => Transition::Complete(JobOutcome::Success),
            (JobOutcome::Success, Some(next)) => Transition::Next(next),
            (JobOutcome::Success, None) => Transition::Complete(JobOutcome::Success),
            (JobOutcome::Failure(_), _) => Transition::Complete(outcome.clone()),
        };

        job.state_history.push(job.state);
        match &transition {
            Transition::Next(next_state) => {
                job.state = *next_state;
                job.status = JobStatus::InProgress;
            }
            Transition::Complete(JobOutcome::Success) => {
                job.state = State::Done;
                job.status = JobStatus::Completed;
            }
            Transition::Complete(JobOutcome::Failure(failure)) => {
                job.failed_in = Some(job.state);
                job.state = if failure.kind == ErrorKind::Cancelled {
                    State::Cancelled
                } else {
                    State::Failed
                };
                job.status = JobStatus::Failed;
                job.failure = Some(failure.clone());
            }
        }
        job.touch();

        transition
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::state_machine::job::{Failure, JobRequest};

    fn make_job() -> Job {
        Job::new(JobRequest::new("grad", "main.md"))
    }

    fn fail(kind: ErrorKind, msg: &str) -> JobOutcome {
        JobOutcome::Failure(Failure {
            kind,
            message: msg.into(),
        })
    }

    #[test]
    fn happy_path_walks_all_states() {
        let mut job = make_job();
        assert_eq!(job.state, State::Idle);

        let expected = [
            State::Validating,
            State::FetchingTemplate,
            State::StagingVerified,
            State::Generating,
            State::Exporting,
        ];
        for state in expected {
            let t = StateMachine::next(&mut job, JobOutcome::Success);
            assert_eq!(t, Transition::Next(state));
            assert_eq!(job.state, state);
            assert_eq!(job.status, JobStatus::InProgress);
        }

        let t = StateMachine::next(&mut job, JobOutcome::Success);
        assert_eq!(t, Transition::Complete(JobOutcome::Success));
        assert_eq!(job.state, State::Done);
        assert_eq!(job.status, JobStatus::Completed);

        // Done is terminal.
        let t = StateMachine::next(&mut job, JobOutcome::Success);
        assert_eq!(t, Transition::Complete(JobOutcome::Success));
        assert_eq!(job.state, State::Done);
    }

    #[test]
    fn failure_from_any_active_state_is_terminal() {
        for steps in 0..6 {
            let mut job = make_job();
            for _ in 0..steps {
                StateMachine::next(&mut job, JobOutcome::Success);
            }
            let failed_in = job.state;

            let t = StateMachine::next(&mut job, fail(ErrorKind::GenerationFailure, "boom"));
            assert_eq!(t, Transition::Complete(fail(ErrorKind::GenerationFailure, "boom")));
            assert_eq!(job.state, State::Failed);
            assert_eq!(job.status, JobStatus::Failed);
            assert_eq!(job.failed_in, Some(failed_in));
            assert_eq!(job.failure.as_ref().unwrap().message, "boom");
        }
    }

    #[test]
    fn no_retry_after_failure() {
        let mut job = make_job();
        StateMachine::next(&mut job, JobOutcome::Success);
        StateMachine::next(&mut job, fail(ErrorKind::TemplateFetchFailure, "404"));
        assert_eq!(job.state, State::Failed);

        let t = StateMachine::next(&mut job, JobOutcome::Success);
        assert_eq!(t, Transition::Complete(fail(ErrorKind::TemplateFetchFailure, "404")));
        assert_eq!(job.state, State::Failed);
    }

    #[test]
    fn cancellation_lands_in_cancelled() {
        let mut job = make_job();
        for _ in 0..4 {
            StateMachine::next(&mut job, JobOutcome::Success);
        }
        assert_eq!(job.state, State::Generating);

        StateMachine::next(&mut job, fail(ErrorKind::Cancelled, "job cancelled during GENERATING"));
        assert_eq!(job.state, State::Cancelled);
        assert_eq!(job.failed_in, Some(State::Generating));
        assert!(job.state.is_terminal());
    }

    #[test]
    fn state_history_is_recorded() {
        let mut job = make_job();
        StateMachine::next(&mut job, JobOutcome::Success);
        StateMachine::next(&mut job, JobOutcome::Success);
        StateMachine::next(&mut job, fail(ErrorKind::TemplateFetchFailure, "404"));

        assert_eq!(
            job.state_history,
            vec![State::Idle, State::Validating, State::FetchingTemplate]
        );
    }

    #[test]
    fn state_display() {
        assert_eq!(State::Idle.to_string(), "IDLE");
        assert_eq!(State::FetchingTemplate.to_string(), "FETCHING_TEMPLATE");
        assert_eq!(State::StagingVerified.to_string(), "STAGING_VERIFIED");
        assert_eq!(State::Done.to_string(), "DONE");
        assert_eq!(State::Cancelled.to_string(), "CANCELLED");
    }
}
