//! Build-trigger entry point — classify, wake the cluster, submit.
//!
//! The flow is strictly ordered: classify the event, make sure the
//! controller runs, secure worker capacity, wait for the control plane,
//! submit the build, then audit. The two polling waits are the only
//! suspension points; a surrounding deadline is the caller's concern.

use chrono::Utc;
use serde_json::{json, Value};
use uuid::Uuid;

use jenkins_lifecycle::provider::{ComputeProvider, MetricsSink, ObjectStore, PoolProvider};
use jenkins_lifecycle::response::ApiResponse;
use jenkins_lifecycle::services::lifecycle_service::{self, PollSettings};

use crate::classifier;
use crate::config::TriggerConfig;
use crate::error::TriggerError;
use crate::models::submission::{AuditRecord, CostAnnotation};
use crate::services::audit_service;
use crate::services::jenkins_service::JenkinsClient;

/// Providers and polling settings for one trigger invocation.
pub struct TriggerContext<'a> {
    pub compute: &'a dyn ComputeProvider,
    pub pool: &'a dyn PoolProvider,
    pub metrics: &'a dyn MetricsSink,
    pub store: &'a dyn ObjectStore,
    /// Controller start polling.
    pub poll: PollSettings,
    /// Control-plane readiness polling.
    pub ready_max_attempts: u32,
    pub ready_delay: std::time::Duration,
}

pub async fn handle(event: &Value, ctx: &TriggerContext<'_>, config: &TriggerConfig) -> ApiResponse {
    match execute(event, ctx, config).await {
        Ok(body) => ApiResponse::ok(body),
        Err(e) => {
            tracing::error!("build trigger failed: {e}");
            match e.status_code() {
                400 => ApiResponse::bad_request(e.to_string()),
                _ => ApiResponse::server_error(format!("Error triggering Jenkins build: {e}")),
            }
        }
    }
}

async fn execute(
    event: &Value,
    ctx: &TriggerContext<'_>,
    config: &TriggerConfig,
) -> Result<Value, TriggerError> {
    let jenkins_url = config
        .jenkins_url
        .as_deref()
        .ok_or(TriggerError::MissingConfig("JENKINS_URL"))?;
    let jenkins_password = config
        .jenkins_password
        .as_deref()
        .ok_or(TriggerError::MissingConfig("JENKINS_PASSWORD"))?;

    let (kind, request) = classifier::classify(event, ctx.store).await;
    tracing::info!(
        source = %kind,
        job = %request.job_name,
        agents = request.agent_count,
        "classified trigger event"
    );

    let instance_id = lifecycle_service::ensure_controller_running(
        ctx.compute,
        &config.controller_tag_key,
        &config.controller_tag_value,
        ctx.poll,
    )
    .await?;

    // Scale-up only; a concurrent lifecycle scale-down is never
    // contended with, and last-writer-wins on the provider side.
    if let Some(pool_name) = config.pool_name.as_deref() {
        lifecycle_service::ensure_worker_capacity(
            ctx.pool,
            ctx.metrics,
            pool_name,
            request.agent_count,
        )
        .await?;
    }

    let client = JenkinsClient::new(
        jenkins_url,
        &config.jenkins_user,
        jenkins_password,
        config.verify_tls,
    );
    if !client
        .wait_until_ready(ctx.ready_max_attempts, ctx.ready_delay)
        .await
    {
        return Err(TriggerError::NotReady);
    }

    let result = client.submit_build(&request).await?;

    let record = AuditRecord {
        timestamp: Utc::now(),
        trigger_source: kind,
        build_request: request.clone(),
        build_result: result.clone(),
        request_id: Uuid::new_v4().to_string(),
        cost_optimization: CostAnnotation::default(),
    };
    audit_service::record_trigger(ctx.store, config.audit_bucket.as_deref(), &record).await;

    Ok(json!({
        "message": "Jenkins build triggered successfully",
        "trigger_source": kind,
        "build_number": result.queue_item(),
        "job_name": request.job_name,
        "jenkins_instance_id": instance_id,
    }))
}
