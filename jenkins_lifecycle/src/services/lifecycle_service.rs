//! Controller and worker-pool state transitions.
//!
//! Every operation reads fresh provider state, performs at most one
//! mutation, and reports what actually happened. Nothing here caches
//! state across invocations, and nothing takes a lock: concurrent
//! invocations are possible and rely on the provider's idempotent
//! semantics (start-when-starting is a no-op, set-capacity is
//! last-writer-wins).

use std::time::Duration;

use serde::Serialize;

use crate::error::LifecycleError;
use crate::metrics;
use crate::models::instance::{Instance, NodeState};
use crate::provider::{ComputeProvider, MetricsSink, PoolProvider};

/// Bounded polling settings for start transitions.
#[derive(Debug, Clone, Copy)]
pub struct PollSettings {
    pub delay: Duration,
    pub max_attempts: u32,
}

impl Default for PollSettings {
    fn default() -> Self {
        Self {
            delay: Duration::from_secs(15),
            max_attempts: 20,
        }
    }
}

/// What a stop/start request actually did.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Transition {
    /// The node changed state.
    Changed,
    /// The node was already in the target state.
    NoOp,
}

/// Outcome of a worker-pool resize.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ScaleOutcome {
    pub previous_capacity: u32,
    pub new_capacity: u32,
    pub scaled: bool,
}

/// Locate the controller by tag and make sure it is running.
///
/// Already running: returns immediately with zero start calls. Stopped:
/// issues exactly one start and blocks on bounded polling. Any other
/// state is refused. Polling exhaustion is terminal for this call.
pub async fn ensure_controller_running(
    compute: &dyn ComputeProvider,
    tag_key: &str,
    tag_value: &str,
    poll: PollSettings,
) -> Result<String, LifecycleError> {
    let instance = compute
        .find_by_tag(tag_key, tag_value)
        .await?
        .ok_or(LifecycleError::ControllerNotFound)?;

    match instance.state {
        NodeState::Running => {
            tracing::info!(id = %instance.id, "controller already running");
            Ok(instance.id)
        }
        NodeState::Stopped => {
            tracing::info!(id = %instance.id, "starting controller");
            compute.start(&instance.id).await?;
            wait_until_running(compute, &instance.id, poll).await?;
            Ok(instance.id)
        }
        NodeState::Other(state) => Err(LifecycleError::UnsupportedState(state)),
    }
}

/// Block until the provider reports the instance running.
///
/// Polls at most `max_attempts` times, sleeping `delay` between
/// attempts (not after the last one).
pub async fn wait_until_running(
    compute: &dyn ComputeProvider,
    id: &str,
    poll: PollSettings,
) -> Result<(), LifecycleError> {
    for attempt in 1..=poll.max_attempts {
        let instance = compute.describe(id).await?;
        if instance.state == NodeState::Running {
            tracing::info!(id, attempt, "controller is running");
            return Ok(());
        }
        tracing::debug!(id, attempt, state = %instance.state, "waiting for running state");
        if attempt < poll.max_attempts {
            tokio::time::sleep(poll.delay).await;
        }
    }

    Err(LifecycleError::StartTimeout {
        id: id.to_string(),
        attempts: poll.max_attempts,
    })
}

/// Set the pool to an exact desired size.
///
/// No-ops when the pool is already there; otherwise issues one resize
/// and emits one `AgentsScaled` data point.
pub async fn set_worker_capacity(
    pool: &dyn PoolProvider,
    sink: &dyn MetricsSink,
    name: &str,
    desired: u32,
) -> Result<ScaleOutcome, LifecycleError> {
    let current = pool.describe_pool(name).await?;
    if current.desired_capacity == desired {
        tracing::info!(pool = name, capacity = desired, "already at desired capacity");
        return Ok(ScaleOutcome {
            previous_capacity: current.desired_capacity,
            new_capacity: desired,
            scaled: false,
        });
    }

    tracing::info!(
        pool = name,
        from = current.desired_capacity,
        to = desired,
        "scaling workers"
    );
    pool.set_desired_capacity(name, desired).await?;
    metrics::agents_scaled(sink, name, desired).await;

    Ok(ScaleOutcome {
        previous_capacity: current.desired_capacity,
        new_capacity: desired,
        scaled: true,
    })
}

/// Trigger-path variant: raises capacity to at least `min`, never lowers
/// it. Scale-downs belong to the lifecycle actions alone, so this never
/// contends with a concurrent controller-initiated scale-down.
pub async fn ensure_worker_capacity(
    pool: &dyn PoolProvider,
    sink: &dyn MetricsSink,
    name: &str,
    min: u32,
) -> Result<ScaleOutcome, LifecycleError> {
    let current = pool.describe_pool(name).await?;
    if min <= current.desired_capacity {
        tracing::info!(
            pool = name,
            capacity = current.desired_capacity,
            "workers already at capacity"
        );
        return Ok(ScaleOutcome {
            previous_capacity: current.desired_capacity,
            new_capacity: current.desired_capacity,
            scaled: false,
        });
    }

    tracing::info!(
        pool = name,
        from = current.desired_capacity,
        to = min,
        "scaling workers up for build"
    );
    pool.set_desired_capacity(name, min).await?;
    metrics::agents_scaled(sink, name, min).await;

    Ok(ScaleOutcome {
        previous_capacity: current.desired_capacity,
        new_capacity: min,
        scaled: true,
    })
}

/// Stop the controller if it is running. Emits a metric only on an
/// actual transition.
pub async fn stop_controller(
    compute: &dyn ComputeProvider,
    sink: &dyn MetricsSink,
    id: &str,
) -> Result<(Instance, Transition), LifecycleError> {
    let instance = compute.describe(id).await?;
    match &instance.state {
        NodeState::Running => {
            tracing::info!(id, "stopping controller");
            compute.stop(id).await?;
            metrics::master_stopped(sink).await;
            Ok((instance, Transition::Changed))
        }
        NodeState::Stopped => {
            tracing::info!(id, "controller already stopped");
            Ok((instance, Transition::NoOp))
        }
        NodeState::Other(state) => Err(LifecycleError::UnsupportedState(state.clone())),
    }
}

/// Start the controller if it is stopped and wait for it to come up.
/// Emits a metric only on an actual transition.
pub async fn start_controller(
    compute: &dyn ComputeProvider,
    sink: &dyn MetricsSink,
    id: &str,
    poll: PollSettings,
) -> Result<(Instance, Transition), LifecycleError> {
    let instance = compute.describe(id).await?;
    match &instance.state {
        NodeState::Stopped => {
            tracing::info!(id, "starting controller");
            compute.start(id).await?;
            metrics::master_started(sink).await;
            wait_until_running(compute, id, poll).await?;
            Ok((instance, Transition::Changed))
        }
        NodeState::Running => {
            tracing::info!(id, "controller already running");
            Ok((instance, Transition::NoOp))
        }
        NodeState::Other(state) => Err(LifecycleError::UnsupportedState(state.clone())),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use super::*;
    use crate::metrics::AGENTS_SCALED;
    use crate::provider::memory::MemoryCloud;

    fn instance(id: &str, state: NodeState) -> Instance {
        Instance {
            id: id.to_string(),
            state,
            instance_class: "t3.medium".to_string(),
            launch_time: None,
            spot: false,
        }
    }

    fn fast_poll(max_attempts: u32) -> PollSettings {
        PollSettings {
            delay: Duration::ZERO,
            max_attempts,
        }
    }

    const TAG: (&str, &str) = ("Type", "jenkins-master");

    #[tokio::test]
    async fn ensure_running_is_a_noop_on_running_controller() {
        let cloud = MemoryCloud::new();
        cloud.add_instance(instance("i-1", NodeState::Running), &[TAG]);

        let id = ensure_controller_running(&cloud, TAG.0, TAG.1, fast_poll(3))
            .await
            .unwrap();

        assert_eq!(id, "i-1");
        assert_eq!(cloud.start_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ensure_running_starts_a_stopped_controller_once() {
        let cloud = MemoryCloud::new();
        cloud.add_instance(instance("i-1", NodeState::Stopped), &[TAG]);

        let id = ensure_controller_running(&cloud, TAG.0, TAG.1, fast_poll(3))
            .await
            .unwrap();

        assert_eq!(id, "i-1");
        assert_eq!(cloud.start_calls.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn ensure_running_fails_when_no_controller_matches() {
        let cloud = MemoryCloud::new();

        let err = ensure_controller_running(&cloud, TAG.0, TAG.1, fast_poll(3))
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::ControllerNotFound));
    }

    #[tokio::test]
    async fn transitional_states_are_refused() {
        let cloud = MemoryCloud::new();
        cloud.add_instance(instance("i-1", NodeState::Other("pending".to_string())), &[TAG]);

        let err = start_controller(&cloud, &cloud, "i-1", fast_poll(3))
            .await
            .unwrap_err();
        assert!(matches!(err, LifecycleError::UnsupportedState(s) if s == "pending"));

        let err = stop_controller(&cloud, &cloud, "i-1").await.unwrap_err();
        assert!(matches!(err, LifecycleError::UnsupportedState(s) if s == "pending"));
        assert_eq!(cloud.start_calls.load(Ordering::SeqCst), 0);
        assert_eq!(cloud.stop_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn polling_is_bounded_and_times_out() {
        let cloud = MemoryCloud::new();
        cloud.set_auto_transition(false);
        cloud.add_instance(instance("i-1", NodeState::Stopped), &[TAG]);

        let err = ensure_controller_running(&cloud, TAG.0, TAG.1, fast_poll(3))
            .await
            .unwrap_err();

        assert!(matches!(err, LifecycleError::StartTimeout { attempts: 3, .. }));
        assert_eq!(cloud.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cloud.describe_calls.load(Ordering::SeqCst), 3);
    }

    #[tokio::test]
    async fn set_capacity_noop_when_unchanged() {
        let cloud = MemoryCloud::new();
        cloud.add_pool("agents", 3, &[]);

        let outcome = set_worker_capacity(&cloud, &cloud, "agents", 3).await.unwrap();

        assert!(!outcome.scaled);
        assert_eq!(cloud.resize_calls.load(Ordering::SeqCst), 0);
        assert!(cloud.data_points().is_empty());
    }

    #[tokio::test]
    async fn set_capacity_resizes_and_emits_one_metric() {
        let cloud = MemoryCloud::new();
        cloud.add_pool("agents", 1, &[]);

        let outcome = set_worker_capacity(&cloud, &cloud, "agents", 4).await.unwrap();

        assert!(outcome.scaled);
        assert_eq!(outcome.previous_capacity, 1);
        assert_eq!(outcome.new_capacity, 4);
        assert_eq!(cloud.resize_calls.load(Ordering::SeqCst), 1);

        let points = cloud.data_points();
        assert_eq!(points.len(), 1);
        assert_eq!(points[0].name, AGENTS_SCALED);
        assert_eq!(points[0].value, 4.0);
        assert_eq!(
            points[0].dimensions,
            vec![("AutoScalingGroup".to_string(), "agents".to_string())]
        );
    }

    #[tokio::test]
    async fn ensure_capacity_never_scales_down() {
        let cloud = MemoryCloud::new();
        cloud.add_pool("agents", 5, &[]);

        let outcome = ensure_worker_capacity(&cloud, &cloud, "agents", 2).await.unwrap();

        assert!(!outcome.scaled);
        assert_eq!(cloud.desired_capacity("agents"), Some(5));
        assert_eq!(cloud.resize_calls.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn ensure_capacity_scales_up() {
        let cloud = MemoryCloud::new();
        cloud.add_pool("agents", 0, &[]);

        let outcome = ensure_worker_capacity(&cloud, &cloud, "agents", 2).await.unwrap();

        assert!(outcome.scaled);
        assert_eq!(cloud.desired_capacity("agents"), Some(2));
    }

    #[tokio::test]
    async fn stop_emits_metric_only_on_transition() {
        let cloud = MemoryCloud::new();
        cloud.add_instance(instance("i-1", NodeState::Running), &[TAG]);

        let (_, transition) = stop_controller(&cloud, &cloud, "i-1").await.unwrap();
        assert_eq!(transition, Transition::Changed);
        assert_eq!(cloud.data_points().len(), 1);

        // Already stopped now: no second stop, no second metric.
        let (_, transition) = stop_controller(&cloud, &cloud, "i-1").await.unwrap();
        assert_eq!(transition, Transition::NoOp);
        assert_eq!(cloud.stop_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cloud.data_points().len(), 1);
    }

    #[tokio::test]
    async fn metric_failure_never_fails_the_action() {
        struct FailingSink;

        #[async_trait::async_trait]
        impl crate::provider::MetricsSink for FailingSink {
            async fn put_count(&self, _point: crate::provider::DataPoint) -> anyhow::Result<()> {
                anyhow::bail!("sink offline")
            }

            async fn sum_today(
                &self,
                _name: &str,
                _now: chrono::DateTime<chrono::Utc>,
            ) -> anyhow::Result<f64> {
                anyhow::bail!("sink offline")
            }
        }

        let cloud = MemoryCloud::new();
        cloud.add_pool("agents", 0, &[]);

        let outcome = set_worker_capacity(&cloud, &FailingSink, "agents", 2).await.unwrap();
        assert!(outcome.scaled);
        assert_eq!(cloud.desired_capacity("agents"), Some(2));
    }

    #[tokio::test]
    async fn start_waits_for_running() {
        let cloud = MemoryCloud::new();
        cloud.add_instance(instance("i-1", NodeState::Stopped), &[TAG]);

        let (_, transition) = start_controller(&cloud, &cloud, "i-1", fast_poll(3))
            .await
            .unwrap();

        assert_eq!(transition, Transition::Changed);
        assert_eq!(cloud.start_calls.load(Ordering::SeqCst), 1);
        assert_eq!(cloud.data_points()[0].name, crate::metrics::MASTER_STARTED);
    }
}
