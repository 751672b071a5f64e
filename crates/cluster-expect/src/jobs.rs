//! Contract for the external job-submission service.
//!
//! Scheduling is out of scope for this crate; the automation engine only
//! needs a seam through which a caller's scheduler backend accepts a
//! batch of (script, parameters, submission template) triples and
//! reports where each job landed. Implementations live with the caller.

use std::path::PathBuf;

use crate::error::Result;

/// One job to schedule.
#[derive(Debug, Clone)]
pub struct JobRequest {
    /// Path (on the remote side) to the script to run.
    pub script_path: PathBuf,
    /// Parameter object passed through to the script.
    pub parameters: toml::Value,
    /// Submission template (e.g. a batch-scheduler header) the service
    /// renders around the script invocation.
    pub submission_template: String,
}

impl JobRequest {
    /// Create a request.
    #[must_use]
    pub fn new(
        script_path: impl Into<PathBuf>,
        parameters: toml::Value,
        submission_template: impl Into<String>,
    ) -> Self {
        Self {
            script_path: script_path.into(),
            parameters,
            submission_template: submission_template.into(),
        }
    }
}

/// Where a submitted job stands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum JobState {
    /// Accepted, waiting to run.
    Queued,
    /// Running.
    Running,
    /// Finished successfully.
    Completed,
    /// Finished unsuccessfully or was rejected.
    Failed,
}

/// Per-job status returned by the submission service.
#[derive(Debug, Clone)]
pub struct JobStatus {
    /// Scheduler-assigned job name or identifier.
    pub job_name: String,
    /// Current state.
    pub state: JobState,
    /// Where the job's log lives, once known.
    pub log_path: Option<PathBuf>,
}

/// The job-submission service this crate's callers inject.
pub trait JobSubmitter {
    /// Schedule a batch of jobs, returning one status per request in
    /// order.
    fn submit(
        &mut self,
        requests: &[JobRequest],
    ) -> impl std::future::Future<Output = Result<Vec<JobStatus>>>;
}
