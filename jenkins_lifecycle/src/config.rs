//! Lifecycle controller configuration — loaded from environment variables.

#[derive(Clone, Debug)]
pub struct LifecycleConfig {
    /// Jenkins controller instance identifier.
    pub instance_id: Option<String>,
    /// Worker pool (auto scaling group) name.
    pub pool_name: Option<String>,
    /// Tag key/value used to locate the controller without a pinned id,
    /// so node replacement is tolerated.
    pub controller_tag_key: String,
    pub controller_tag_value: String,
    /// Work-hours window in UTC; the controller running outside it is
    /// flagged by the cost report.
    pub work_hours_start: u32,
    pub work_hours_end: u32,
    /// Region override for the provider; the CLI's own chain applies when unset.
    pub region: Option<String>,
}

impl LifecycleConfig {
    pub fn from_env() -> Self {
        let instance_id = std::env::var("JENKINS_INSTANCE_ID")
            .ok()
            .filter(|s| !s.is_empty());
        let pool_name = std::env::var("ASG_NAME").ok().filter(|s| !s.is_empty());
        let controller_tag_key =
            std::env::var("CONTROLLER_TAG_KEY").unwrap_or_else(|_| "Type".to_string());
        let controller_tag_value = std::env::var("CONTROLLER_TAG_VALUE")
            .unwrap_or_else(|_| "jenkins-master".to_string());
        let work_hours_start = std::env::var("WORK_HOURS_START")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(8);
        let work_hours_end = std::env::var("WORK_HOURS_END")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(22);
        let region = std::env::var("AWS_REGION").ok().filter(|s| !s.is_empty());

        if instance_id.is_none() {
            tracing::warn!("JENKINS_INSTANCE_ID not set -- lifecycle actions will be rejected");
        }
        if pool_name.is_none() {
            tracing::warn!("ASG_NAME not set -- worker pool scaling disabled");
        }

        Self {
            instance_id,
            pool_name,
            controller_tag_key,
            controller_tag_value,
            work_hours_start,
            work_hours_end,
            region,
        }
    }
}
