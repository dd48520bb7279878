//! In-memory provider — deterministic double for tests and dry runs.
//!
//! Implements all four seams over one mutex-guarded state block and
//! counts the mutating calls so tests can assert exact provider traffic.

use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, AtomicU32, Ordering};
use std::sync::Mutex;

use async_trait::async_trait;
use chrono::{DateTime, Utc};

use crate::models::instance::{Instance, NodeState};
use crate::models::pool::WorkerPool;

use super::{ComputeProvider, DataPoint, MetricsSink, ObjectStore, PoolProvider};

#[derive(Default)]
struct CloudState {
    instances: Vec<TaggedInstance>,
    pools: BTreeMap<String, PoolState>,
    data_points: Vec<DataPoint>,
    objects: BTreeMap<(String, String), String>,
}

struct TaggedInstance {
    instance: Instance,
    tags: BTreeMap<String, String>,
}

struct PoolState {
    desired_capacity: u32,
    member_ids: Vec<String>,
}

/// One fake cloud implementing every provider seam.
pub struct MemoryCloud {
    state: Mutex<CloudState>,
    /// When false, start/stop requests leave the node state untouched,
    /// so polling loops can be driven into their timeout path.
    auto_transition: AtomicBool,
    pub describe_calls: AtomicU32,
    pub start_calls: AtomicU32,
    pub stop_calls: AtomicU32,
    pub resize_calls: AtomicU32,
    pub object_gets: AtomicU32,
    pub object_puts: AtomicU32,
}

impl Default for MemoryCloud {
    fn default() -> Self {
        Self::new()
    }
}

impl MemoryCloud {
    pub fn new() -> Self {
        Self {
            state: Mutex::new(CloudState::default()),
            auto_transition: AtomicBool::new(true),
            describe_calls: AtomicU32::new(0),
            start_calls: AtomicU32::new(0),
            stop_calls: AtomicU32::new(0),
            resize_calls: AtomicU32::new(0),
            object_gets: AtomicU32::new(0),
            object_puts: AtomicU32::new(0),
        }
    }

    pub fn set_auto_transition(&self, enabled: bool) {
        self.auto_transition.store(enabled, Ordering::SeqCst);
    }

    pub fn add_instance(&self, instance: Instance, tags: &[(&str, &str)]) {
        let tags = tags
            .iter()
            .map(|(k, v)| (k.to_string(), v.to_string()))
            .collect();
        self.state
            .lock()
            .expect("poisoned")
            .instances
            .push(TaggedInstance { instance, tags });
    }

    pub fn add_pool(&self, name: &str, desired_capacity: u32, member_ids: &[&str]) {
        self.state.lock().expect("poisoned").pools.insert(
            name.to_string(),
            PoolState {
                desired_capacity,
                member_ids: member_ids.iter().map(|s| s.to_string()).collect(),
            },
        );
    }

    pub fn set_instance_state(&self, id: &str, state: NodeState) {
        let mut guard = self.state.lock().expect("poisoned");
        if let Some(entry) = guard.instances.iter_mut().find(|e| e.instance.id == id) {
            entry.instance.state = state;
        }
    }

    pub fn put_object(&self, bucket: &str, key: &str, body: &str) {
        self.state
            .lock()
            .expect("poisoned")
            .objects
            .insert((bucket.to_string(), key.to_string()), body.to_string());
    }

    pub fn object(&self, bucket: &str, key: &str) -> Option<String> {
        self.state
            .lock()
            .expect("poisoned")
            .objects
            .get(&(bucket.to_string(), key.to_string()))
            .cloned()
    }

    pub fn object_keys(&self, bucket: &str) -> Vec<String> {
        self.state
            .lock()
            .expect("poisoned")
            .objects
            .keys()
            .filter(|(b, _)| b == bucket)
            .map(|(_, k)| k.clone())
            .collect()
    }

    pub fn data_points(&self) -> Vec<DataPoint> {
        self.state.lock().expect("poisoned").data_points.clone()
    }

    pub fn desired_capacity(&self, name: &str) -> Option<u32> {
        self.state
            .lock()
            .expect("poisoned")
            .pools
            .get(name)
            .map(|p| p.desired_capacity)
    }
}

#[async_trait]
impl ComputeProvider for MemoryCloud {
    async fn find_by_tag(&self, key: &str, value: &str) -> anyhow::Result<Option<Instance>> {
        let guard = self.state.lock().expect("poisoned");
        Ok(guard
            .instances
            .iter()
            .find(|e| {
                e.tags.get(key).map(String::as_str) == Some(value)
                    && matches!(e.instance.state, NodeState::Running | NodeState::Stopped)
            })
            .map(|e| e.instance.clone()))
    }

    async fn describe(&self, id: &str) -> anyhow::Result<Instance> {
        self.describe_calls.fetch_add(1, Ordering::SeqCst);
        let guard = self.state.lock().expect("poisoned");
        guard
            .instances
            .iter()
            .find(|e| e.instance.id == id)
            .map(|e| e.instance.clone())
            .ok_or_else(|| anyhow::anyhow!("instance {id} not found"))
    }

    async fn start(&self, id: &str) -> anyhow::Result<()> {
        self.start_calls.fetch_add(1, Ordering::SeqCst);
        if self.auto_transition.load(Ordering::SeqCst) {
            self.set_instance_state(id, NodeState::Running);
        }
        Ok(())
    }

    async fn stop(&self, id: &str) -> anyhow::Result<()> {
        self.stop_calls.fetch_add(1, Ordering::SeqCst);
        if self.auto_transition.load(Ordering::SeqCst) {
            self.set_instance_state(id, NodeState::Stopped);
        }
        Ok(())
    }
}

#[async_trait]
impl PoolProvider for MemoryCloud {
    async fn describe_pool(&self, name: &str) -> anyhow::Result<WorkerPool> {
        let guard = self.state.lock().expect("poisoned");
        let pool = guard
            .pools
            .get(name)
            .ok_or_else(|| anyhow::anyhow!("worker pool {name} not found"))?;

        let members = pool
            .member_ids
            .iter()
            .filter_map(|id| {
                guard
                    .instances
                    .iter()
                    .find(|e| &e.instance.id == id)
                    .map(|e| e.instance.clone())
            })
            .filter(|i| i.state == NodeState::Running)
            .collect();

        Ok(WorkerPool {
            name: name.to_string(),
            desired_capacity: pool.desired_capacity,
            members,
        })
    }

    async fn set_desired_capacity(&self, name: &str, desired: u32) -> anyhow::Result<()> {
        self.resize_calls.fetch_add(1, Ordering::SeqCst);
        let mut guard = self.state.lock().expect("poisoned");
        let pool = guard
            .pools
            .get_mut(name)
            .ok_or_else(|| anyhow::anyhow!("worker pool {name} not found"))?;
        pool.desired_capacity = desired;
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for MemoryCloud {
    async fn put_count(&self, point: DataPoint) -> anyhow::Result<()> {
        self.state.lock().expect("poisoned").data_points.push(point);
        Ok(())
    }

    async fn sum_today(&self, name: &str, _now: DateTime<Utc>) -> anyhow::Result<f64> {
        let guard = self.state.lock().expect("poisoned");
        Ok(guard
            .data_points
            .iter()
            .filter(|p| p.name == name)
            .map(|p| p.value)
            .sum())
    }
}

#[async_trait]
impl ObjectStore for MemoryCloud {
    async fn get(&self, bucket: &str, key: &str) -> anyhow::Result<String> {
        self.object_gets.fetch_add(1, Ordering::SeqCst);
        self.object(bucket, key)
            .ok_or_else(|| anyhow::anyhow!("object s3://{bucket}/{key} not found"))
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: String,
        _content_type: &str,
    ) -> anyhow::Result<()> {
        self.object_puts.fetch_add(1, Ordering::SeqCst);
        self.state
            .lock()
            .expect("poisoned")
            .objects
            .insert((bucket.to_string(), key.to_string()), body);
        Ok(())
    }
}
