//! Lifecycle entry point — one idempotent action per invocation.
//!
//! Dispatches shutdown / startup / scale_agents / cost_report against
//! the providers and folds every outcome into the response envelope.
//! No raw fault escapes: errors become a 400 or 500 body.

use chrono::Utc;
use serde_json::{json, Value};

use crate::config::LifecycleConfig;
use crate::error::LifecycleError;
use crate::provider::{ComputeProvider, MetricsSink, PoolProvider};
use crate::response::{ActionRequest, ApiResponse};
use crate::services::lifecycle_service::{self, PollSettings, Transition};
use crate::services::{pricing, report_service};

/// Providers the lifecycle actions operate through.
pub struct Providers<'a> {
    pub compute: &'a dyn ComputeProvider,
    pub pool: &'a dyn PoolProvider,
    pub metrics: &'a dyn MetricsSink,
}

pub async fn handle(
    request: &ActionRequest,
    providers: &Providers<'_>,
    config: &LifecycleConfig,
    poll: PollSettings,
) -> ApiResponse {
    match execute(request, providers, config, poll).await {
        Ok(result) => ApiResponse::ok(json!({
            "message": format!("Successfully executed {}", request.action),
            "result": result,
            "timestamp": Utc::now().to_rfc3339(),
        })),
        Err(e) => {
            tracing::error!(action = %request.action, "lifecycle action failed: {e}");
            match e.status_code() {
                400 => ApiResponse::bad_request(e.to_string()),
                _ => ApiResponse::server_error(format!("Error executing cost optimization: {e}")),
            }
        }
    }
}

async fn execute(
    request: &ActionRequest,
    providers: &Providers<'_>,
    config: &LifecycleConfig,
    poll: PollSettings,
) -> Result<Value, LifecycleError> {
    let instance_id = config
        .instance_id
        .as_deref()
        .ok_or(LifecycleError::MissingConfig("JENKINS_INSTANCE_ID"))?;

    tracing::info!(action = %request.action, "executing lifecycle action");

    match request.action.as_str() {
        "shutdown" => shutdown(providers, config, instance_id).await,
        "startup" => startup(providers, config, instance_id, poll).await,
        "scale_agents" => {
            let name = config
                .pool_name
                .as_deref()
                .ok_or(LifecycleError::MissingConfig("ASG_NAME"))?;
            let outcome = lifecycle_service::set_worker_capacity(
                providers.pool,
                providers.metrics,
                name,
                request.desired_capacity.unwrap_or(0),
            )
            .await?;
            serde_json::to_value(outcome).map_err(|e| anyhow::Error::from(e).into())
        }
        "cost_report" => {
            let report = report_service::generate(
                providers.compute,
                providers.pool,
                providers.metrics,
                config,
                instance_id,
                Utc::now(),
            )
            .await?;
            serde_json::to_value(report).map_err(|e| anyhow::Error::from(e).into())
        }
        other => Err(LifecycleError::UnknownAction(other.to_string())),
    }
}

async fn shutdown(
    providers: &Providers<'_>,
    config: &LifecycleConfig,
    instance_id: &str,
) -> Result<Value, LifecycleError> {
    let (instance, transition) =
        lifecycle_service::stop_controller(providers.compute, providers.metrics, instance_id)
            .await?;

    let mut agents_scaled = 0;
    if let Some(pool_name) = config.pool_name.as_deref() {
        let outcome = lifecycle_service::set_worker_capacity(
            providers.pool,
            providers.metrics,
            pool_name,
            0,
        )
        .await?;
        agents_scaled = outcome.previous_capacity;
    }

    Ok(json!({
        "jenkins_master": match transition {
            Transition::Changed => "stopped",
            Transition::NoOp => "not_changed",
        },
        "agents_scaled": agents_scaled,
        "estimated_hourly_savings":
            format!("${:.4}", pricing::hourly_cost(&instance.instance_class)),
        "cost_savings": "estimated",
    }))
}

async fn startup(
    providers: &Providers<'_>,
    config: &LifecycleConfig,
    instance_id: &str,
    poll: PollSettings,
) -> Result<Value, LifecycleError> {
    let (_, transition) = lifecycle_service::start_controller(
        providers.compute,
        providers.metrics,
        instance_id,
        poll,
    )
    .await?;

    // Workers stay at their current capacity; the trigger path scales
    // them up on demand.
    Ok(json!({
        "jenkins_master": match transition {
            Transition::Changed => "started",
            Transition::NoOp => "already_running",
        },
        "agents_ready": config.pool_name.is_some(),
        "startup_time": Utc::now().to_rfc3339(),
    }))
}
