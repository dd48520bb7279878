//! Build submission outcome and the audit record written per trigger.

use std::collections::BTreeMap;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use super::request::{BuildRequest, TriggerKind};

/// Acknowledgement from the controller for one submitted build.
/// Written once, then persisted inside the audit record.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BuildSubmissionResult {
    pub success: bool,
    /// Opaque queue-item location from the controller; legitimately
    /// empty when the controller omits the header.
    pub queue_location: String,
    pub build_url: String,
    pub parameters: BTreeMap<String, String>,
}

impl BuildSubmissionResult {
    /// Queue-item number parsed off the location URL, when present.
    pub fn queue_item(&self) -> Option<u64> {
        self.queue_location
            .trim_end_matches('/')
            .rsplit('/')
            .next()?
            .parse()
            .ok()
    }
}

/// Fixed cost-model annotation attached to every audit record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CostAnnotation {
    pub spot_instances_used: bool,
    pub auto_scaling_enabled: bool,
    pub estimated_cost_per_build: f64,
}

impl Default for CostAnnotation {
    fn default() -> Self {
        Self {
            spot_instances_used: true,
            auto_scaling_enabled: true,
            estimated_cost_per_build: 0.05,
        }
    }
}

/// Append-only audit record; written once per trigger, never read back.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct AuditRecord {
    pub timestamp: DateTime<Utc>,
    pub trigger_source: TriggerKind,
    pub build_request: BuildRequest,
    pub build_result: BuildSubmissionResult,
    pub request_id: String,
    pub cost_optimization: CostAnnotation,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn result(location: &str) -> BuildSubmissionResult {
        BuildSubmissionResult {
            success: true,
            queue_location: location.to_string(),
            build_url: "http://jenkins/job/x/build".to_string(),
            parameters: BTreeMap::new(),
        }
    }

    #[test]
    fn queue_item_parses_trailing_number() {
        assert_eq!(result("http://jenkins/queue/item/123/").queue_item(), Some(123));
        assert_eq!(result("http://jenkins/queue/item/7").queue_item(), Some(7));
    }

    #[test]
    fn queue_item_is_none_when_absent() {
        assert_eq!(result("").queue_item(), None);
        assert_eq!(result("http://jenkins/queue/").queue_item(), None);
    }
}
