//! Narrow seams to the cloud — compute lifecycle, pool sizing, metrics, blobs.
//!
//! Everything the rest of the system knows about the cloud goes through
//! these four traits. `aws` is the production implementation; `memory`
//! is a deterministic double for tests and dry runs.

pub mod aws;
pub mod memory;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::instance::Instance;
use crate::models::pool::WorkerPool;

/// One named numeric data point for the metrics sink.
#[derive(Debug, Clone)]
pub struct DataPoint {
    pub name: String,
    pub value: f64,
    pub timestamp: DateTime<Utc>,
    pub dimensions: Vec<(String, String)>,
}

/// Compute-node lifecycle operations.
#[async_trait]
pub trait ComputeProvider: Send + Sync {
    /// Locate an instance by tag, restricted to running/stopped states.
    async fn find_by_tag(&self, key: &str, value: &str) -> anyhow::Result<Option<Instance>>;

    async fn describe(&self, id: &str) -> anyhow::Result<Instance>;

    async fn start(&self, id: &str) -> anyhow::Result<()>;

    async fn stop(&self, id: &str) -> anyhow::Result<()>;
}

/// Desired-count control for a named worker pool.
#[async_trait]
pub trait PoolProvider: Send + Sync {
    async fn describe_pool(&self, name: &str) -> anyhow::Result<WorkerPool>;

    /// Set the pool's desired size. Cooldown windows are not honored.
    async fn set_desired_capacity(&self, name: &str, desired: u32) -> anyhow::Result<()>;
}

/// Write-mostly sink for named counters.
#[async_trait]
pub trait MetricsSink: Send + Sync {
    async fn put_count(&self, point: DataPoint) -> anyhow::Result<()>;

    /// Sum of a counter since UTC midnight of the given instant.
    async fn sum_today(&self, name: &str, now: DateTime<Utc>) -> anyhow::Result<f64>;
}

/// Named blob storage, used for trigger files and audit records.
#[async_trait]
pub trait ObjectStore: Send + Sync {
    async fn get(&self, bucket: &str, key: &str) -> anyhow::Result<String>;

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: String,
        content_type: &str,
    ) -> anyhow::Result<()>;
}
