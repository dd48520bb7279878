//! Cost report — read-only snapshot of cluster spend and utilization.

use chrono::{DateTime, Utc};
use serde::Serialize;

use super::instance::{Instance, NodeState};

/// Controller block of the report.
#[derive(Debug, Clone, Serialize)]
pub struct ControllerReport {
    pub instance_id: String,
    pub instance_type: String,
    pub state: NodeState,
    pub launch_time: Option<DateTime<Utc>>,
    pub estimated_hourly_cost: String,
}

/// Worker-pool block of the report.
#[derive(Debug, Clone, Serialize)]
pub struct WorkerReport {
    pub pool_name: String,
    pub desired_capacity: u32,
    pub running_instances: usize,
    pub instances: Vec<Instance>,
    pub spot_instances_enabled: bool,
}

/// Aggregated optimization metrics plus the advisory text.
#[derive(Debug, Clone, Serialize)]
pub struct OptimizationReport {
    pub total_running_instances: usize,
    pub shutdowns_today: f64,
    pub spot_instances_used: bool,
    pub auto_scaling_enabled: bool,
    pub estimated_daily_savings: String,
    pub recommendations: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct CostReport {
    pub timestamp: DateTime<Utc>,
    pub jenkins_master: ControllerReport,
    pub jenkins_agents: Option<WorkerReport>,
    pub cost_optimization: OptimizationReport,
}
