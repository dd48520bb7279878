//! Canonical build request — trigger-source independent.

use std::collections::BTreeMap;
use std::fmt;

use serde::{Deserialize, Serialize};

/// Pipeline job used when the event names none.
pub const DEFAULT_JOB: &str = "github-pipeline";
pub const DEFAULT_BRANCH: &str = "main";

/// How a build was requested.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum TriggerKind {
    Upload,
    SourcePush,
    ScheduledEvent,
    DirectApi,
    Webhook,
    Manual,
}

impl TriggerKind {
    pub fn as_str(self) -> &'static str {
        match self {
            Self::Upload => "upload",
            Self::SourcePush => "source_push",
            Self::ScheduledEvent => "scheduled_event",
            Self::DirectApi => "direct_api",
            Self::Webhook => "webhook",
            Self::Manual => "manual",
        }
    }
}

impl fmt::Display for TriggerKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Fully-populated build request. Constructed exactly once per
/// invocation by the classifier and immutable afterwards; every field
/// carries a default, so the record is never partially built.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildRequest {
    pub job_name: String,
    pub kind: TriggerKind,
    pub branch: String,
    pub repository: Option<String>,
    pub commit_sha: Option<String>,
    pub agent_count: u32,
    /// Arbitrary caller-supplied parameters, forwarded to the build and
    /// winning over the fixed fields on key collision. BTreeMap keeps
    /// payload assembly deterministic.
    pub extra_params: BTreeMap<String, String>,
}

impl BuildRequest {
    /// A request carrying nothing but defaults for the given kind.
    pub fn with_defaults(kind: TriggerKind) -> Self {
        Self {
            job_name: DEFAULT_JOB.to_string(),
            kind,
            branch: DEFAULT_BRANCH.to_string(),
            repository: None,
            commit_sha: None,
            agent_count: 1,
            extra_params: BTreeMap::new(),
        }
    }
}
