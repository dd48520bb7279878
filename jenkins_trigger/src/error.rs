//! Typed failure taxonomy for the trigger flow.

use jenkins_lifecycle::error::LifecycleError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum TriggerError {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    /// The controller could not be located, started, or left an
    /// unsupported state behind.
    #[error("failed to start Jenkins master: {0}")]
    Lifecycle(#[from] LifecycleError),

    /// Readiness polling exhausted; the invocation aborts before
    /// submission.
    #[error("Jenkins master is not ready")]
    NotReady,

    /// The controller rejected the build; status and body verbatim.
    #[error("failed to trigger build (status {status}): {body}")]
    Submission { status: u16, body: String },

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl TriggerError {
    /// HTTP-equivalent status for the response envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingConfig(_) => 400,
            _ => 500,
        }
    }
}
