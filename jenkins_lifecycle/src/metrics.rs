//! Named cost-optimization counters pushed through the metrics sink.
//!
//! Emission is fire-and-forget: a sink failure is logged and never fails
//! the action that produced the data point.

use chrono::Utc;

use crate::provider::{DataPoint, MetricsSink};

pub const MASTER_STOPPED: &str = "MasterInstanceStopped";
pub const MASTER_STARTED: &str = "MasterInstanceStarted";
pub const AGENTS_SCALED: &str = "AgentsScaled";

pub async fn master_stopped(sink: &dyn MetricsSink) {
    emit(
        sink,
        DataPoint {
            name: MASTER_STOPPED.to_string(),
            value: 1.0,
            timestamp: Utc::now(),
            dimensions: Vec::new(),
        },
    )
    .await;
}

pub async fn master_started(sink: &dyn MetricsSink) {
    emit(
        sink,
        DataPoint {
            name: MASTER_STARTED.to_string(),
            value: 1.0,
            timestamp: Utc::now(),
            dimensions: Vec::new(),
        },
    )
    .await;
}

/// Value is the new desired count, dimensioned by pool name.
pub async fn agents_scaled(sink: &dyn MetricsSink, pool_name: &str, desired: u32) {
    emit(
        sink,
        DataPoint {
            name: AGENTS_SCALED.to_string(),
            value: desired as f64,
            timestamp: Utc::now(),
            dimensions: vec![("AutoScalingGroup".to_string(), pool_name.to_string())],
        },
    )
    .await;
}

async fn emit(sink: &dyn MetricsSink, point: DataPoint) {
    let name = point.name.clone();
    if let Err(e) = sink.put_count(point).await {
        tracing::warn!(metric = %name, "metric emission failed: {e}");
    }
}
