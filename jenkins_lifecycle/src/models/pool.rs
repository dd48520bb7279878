//! Worker pool — the elastically-sized set of build-execution instances.

use serde::{Deserialize, Serialize};

use super::instance::Instance;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkerPool {
    pub name: String,
    pub desired_capacity: u32,
    /// Running members only.
    pub members: Vec<Instance>,
}
