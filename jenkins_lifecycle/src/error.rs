//! Typed failure taxonomy for lifecycle operations.
//!
//! Configuration problems map to a 400-equivalent and are never retried;
//! everything else is a terminal 500-equivalent for the invocation.
//! Best-effort side channels (metric emission, audit writes) never pass
//! through here — they are logged and swallowed at their call sites.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum LifecycleError {
    #[error("missing required configuration: {0}")]
    MissingConfig(&'static str),

    #[error("unknown action: {0}")]
    UnknownAction(String),

    #[error("no Jenkins controller instance found")]
    ControllerNotFound,

    /// The controller sits in a state this system refuses to act on
    /// (pending, stopping, terminated, ...).
    #[error("unsupported controller state: {0}")]
    UnsupportedState(String),

    /// Bounded polling exhausted while waiting for the running state.
    #[error("controller {id} did not reach running state after {attempts} attempts")]
    StartTimeout { id: String, attempts: u32 },

    #[error(transparent)]
    Provider(#[from] anyhow::Error),
}

impl LifecycleError {
    /// HTTP-equivalent status for the response envelope.
    pub fn status_code(&self) -> u16 {
        match self {
            Self::MissingConfig(_) | Self::UnknownAction(_) => 400,
            _ => 500,
        }
    }
}
