//! Write-only audit trail — one object per trigger invocation.

use chrono::{DateTime, Utc};

use jenkins_lifecycle::provider::ObjectStore;

use crate::models::submission::AuditRecord;

/// Object key for one trigger record: date-partitioned, time plus the
/// request-correlation token for uniqueness.
pub fn audit_key(timestamp: DateTime<Utc>, request_id: &str) -> String {
    format!(
        "build-triggers/{}/trigger-{}-{}.json",
        timestamp.format("%Y/%m/%d"),
        timestamp.format("%H%M%S"),
        request_id
    )
}

/// Persist the audit record. Failures are logged and swallowed;
/// auditing never fails the trigger that produced it.
pub async fn record_trigger(store: &dyn ObjectStore, bucket: Option<&str>, record: &AuditRecord) {
    let Some(bucket) = bucket else {
        tracing::debug!("no audit bucket configured, skipping trigger log");
        return;
    };

    let key = audit_key(record.timestamp, &record.request_id);
    let body = match serde_json::to_string_pretty(record) {
        Ok(body) => body,
        Err(e) => {
            tracing::warn!("failed to serialize audit record: {e}");
            return;
        }
    };

    match store.put(bucket, &key, body, "application/json").await {
        Ok(()) => tracing::info!(bucket, key = %key, "trigger logged"),
        Err(e) => tracing::warn!(bucket, key = %key, "failed to write audit record: {e}"),
    }
}
