//! Event classification — five raw shapes into one canonical request.
//!
//! Dispatch is a fixed priority order over the structural shape of the
//! event; the first match wins and anything unrecognized is a manual
//! trigger. The only side effect is one conditional read of a trigger
//! file for storage notifications, and a failed read keeps the defaults.

use std::sync::LazyLock;

use regex::Regex;
use serde_json::Value;

use jenkins_lifecycle::provider::ObjectStore;

use crate::models::request::{BuildRequest, TriggerKind};

static TRIGGER_KEY: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^triggers/[^/]+\.trigger$").unwrap());

/// Classify a raw event into its trigger kind and canonical request.
pub async fn classify(event: &Value, store: &dyn ObjectStore) -> (TriggerKind, BuildRequest) {
    if let Some(record) = storage_record(event) {
        return (TriggerKind::Upload, from_storage(record, store).await);
    }
    if let Some(source) = event.get("source").and_then(Value::as_str) {
        return from_bus(source, event.get("detail"));
    }
    if event.get("httpMethod").is_some() {
        return (TriggerKind::DirectApi, from_api(event));
    }
    if event.get("repository").is_some() && event.get("pusher").is_some() {
        return (TriggerKind::Webhook, from_webhook(event));
    }
    (TriggerKind::Manual, from_manual(event))
}

/// First record of a storage notification, if that is what this is.
fn storage_record(event: &Value) -> Option<&Value> {
    let record = event.get("Records")?.as_array()?.first()?;
    if record.get("eventSource").and_then(Value::as_str) == Some("aws:s3") {
        Some(record)
    } else {
        None
    }
}

async fn from_storage(record: &Value, store: &dyn ObjectStore) -> BuildRequest {
    let mut request = BuildRequest::with_defaults(TriggerKind::Upload);

    let bucket = record
        .pointer("/s3/bucket/name")
        .and_then(Value::as_str)
        .unwrap_or_default();
    let key = record
        .pointer("/s3/object/key")
        .and_then(Value::as_str)
        .unwrap_or_default();

    if !bucket.is_empty() {
        request
            .extra_params
            .insert("source_bucket".to_string(), bucket.to_string());
    }
    if !key.is_empty() {
        request
            .extra_params
            .insert("source_key".to_string(), key.to_string());
    }

    // Trigger files carry overrides; losing one is non-fatal enrichment.
    if TRIGGER_KEY.is_match(key) {
        match store.get(bucket, key).await {
            Ok(body) => match serde_json::from_str::<Value>(&body) {
                Ok(overrides) => merge_overrides(&mut request, &overrides),
                Err(e) => tracing::warn!(key, "ignoring unparseable trigger file: {e}"),
            },
            Err(e) => tracing::warn!(key, "failed to read trigger file: {e}"),
        }
    }

    request
}

/// Overlay trigger-file fields onto a request built from defaults.
/// Canonical fields override in place; `build_parameters` merges into
/// the extras; any other scalar folds into the extras untyped.
fn merge_overrides(request: &mut BuildRequest, overrides: &Value) {
    let Some(map) = overrides.as_object() else {
        return;
    };

    for (field, value) in map {
        match (field.as_str(), value) {
            ("job_name", Value::String(s)) => request.job_name = s.clone(),
            ("branch", Value::String(s)) => request.branch = s.clone(),
            ("repository", Value::String(s)) => request.repository = Some(s.clone()),
            ("commit_sha", Value::String(s)) => request.commit_sha = Some(s.clone()),
            ("agent_count", v) => {
                if let Some(n) = v.as_u64() {
                    request.agent_count = n as u32;
                }
            }
            ("build_parameters", Value::Object(params)) => {
                for (k, v) in params {
                    request.extra_params.insert(k.clone(), stringify(v));
                }
            }
            (_, Value::String(s)) => {
                request.extra_params.insert(field.clone(), s.clone());
            }
            _ => {}
        }
    }
}

fn from_bus(source: &str, detail: Option<&Value>) -> (TriggerKind, BuildRequest) {
    let kind = if source == "aws.codecommit" {
        TriggerKind::SourcePush
    } else {
        TriggerKind::ScheduledEvent
    };

    let mut request = BuildRequest::with_defaults(kind);
    if let Some(detail) = detail {
        if let Some(repo) = detail.get("repositoryName").and_then(Value::as_str) {
            if !repo.is_empty() {
                request.repository = Some(repo.to_string());
            }
        }
        if let Some(branch) = detail.get("referenceName").and_then(Value::as_str) {
            request.branch = branch.to_string();
        }
        if let Some(job) = detail.get("job_name").and_then(Value::as_str) {
            request.job_name = job.to_string();
        }
    }

    (kind, request)
}

fn from_api(event: &Value) -> BuildRequest {
    let body = event
        .get("body")
        .and_then(Value::as_str)
        .filter(|s| !s.is_empty())
        .and_then(|s| serde_json::from_str::<Value>(s).ok())
        .unwrap_or_else(|| Value::Object(Default::default()));

    let mut request = BuildRequest::with_defaults(TriggerKind::DirectApi);
    apply_common_fields(&mut request, &body);
    request
}

fn from_webhook(event: &Value) -> BuildRequest {
    let mut request = BuildRequest::with_defaults(TriggerKind::Webhook);

    if let Some(repo) = event.pointer("/repository/name").and_then(Value::as_str) {
        request.repository = Some(repo.to_string());
    }
    if let Some(git_ref) = event.get("ref").and_then(Value::as_str) {
        request.branch = git_ref
            .strip_prefix("refs/heads/")
            .unwrap_or(git_ref)
            .to_string();
    }
    if let Some(sha) = event.pointer("/head_commit/id").and_then(Value::as_str) {
        request.commit_sha = Some(sha.to_string());
    }
    if let Some(pusher) = event.pointer("/pusher/name").and_then(Value::as_str) {
        request
            .extra_params
            .insert("pusher".to_string(), pusher.to_string());
    }

    request
}

fn from_manual(event: &Value) -> BuildRequest {
    let mut request = BuildRequest::with_defaults(TriggerKind::Manual);
    apply_common_fields(&mut request, event);
    request
}

/// Fields shared by the direct-api body and the bare manual event.
fn apply_common_fields(request: &mut BuildRequest, value: &Value) {
    if let Some(job) = value.get("job_name").and_then(Value::as_str) {
        request.job_name = job.to_string();
    }
    if let Some(branch) = value.get("branch").and_then(Value::as_str) {
        request.branch = branch.to_string();
    }
    if let Some(repo) = value.get("repository").and_then(Value::as_str) {
        if !repo.is_empty() {
            request.repository = Some(repo.to_string());
        }
    }
    if let Some(count) = value.get("agent_count").and_then(Value::as_u64) {
        request.agent_count = count as u32;
    }
    if let Some(params) = value.get("build_parameters").and_then(Value::as_object) {
        for (k, v) in params {
            request.extra_params.insert(k.clone(), stringify(v));
        }
    }
}

fn stringify(value: &Value) -> String {
    match value {
        Value::String(s) => s.clone(),
        other => other.to_string(),
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::Ordering;

    use serde_json::json;

    use jenkins_lifecycle::provider::memory::MemoryCloud;

    use super::*;

    fn upload_event(key: &str) -> Value {
        json!({
            "Records": [{
                "eventSource": "aws:s3",
                "s3": {
                    "bucket": {"name": "ci-drop"},
                    "object": {"key": key}
                }
            }]
        })
    }

    #[tokio::test]
    async fn storage_notification_classifies_as_upload() {
        let store = MemoryCloud::new();
        let (kind, request) = classify(&upload_event("artifacts/app.tar.gz"), &store).await;

        assert_eq!(kind, TriggerKind::Upload);
        assert_eq!(request.job_name, "github-pipeline");
        assert_eq!(request.agent_count, 1);
        assert_eq!(request.extra_params["source_bucket"], "ci-drop");
        assert_eq!(request.extra_params["source_key"], "artifacts/app.tar.gz");
        // Not a trigger file, so no object read happened.
        assert_eq!(store.object_gets.load(Ordering::SeqCst), 0);
    }

    #[tokio::test]
    async fn trigger_file_enriches_the_request() {
        let store = MemoryCloud::new();
        store.put_object(
            "ci-drop",
            "triggers/nightly.trigger",
            r#"{"job_name": "nightly", "agent_count": 3, "build_parameters": {"SUITE": "full"}, "owner": "infra"}"#,
        );

        let (_, request) = classify(&upload_event("triggers/nightly.trigger"), &store).await;

        assert_eq!(request.job_name, "nightly");
        assert_eq!(request.agent_count, 3);
        assert_eq!(request.extra_params["SUITE"], "full");
        assert_eq!(request.extra_params["owner"], "infra");
    }

    #[tokio::test]
    async fn invalid_trigger_file_keeps_defaults() {
        let store = MemoryCloud::new();
        store.put_object("ci-drop", "triggers/nightly.trigger", "not json {{{");

        let (kind, request) = classify(&upload_event("triggers/nightly.trigger"), &store).await;

        assert_eq!(kind, TriggerKind::Upload);
        assert_eq!(request.job_name, "github-pipeline");
        assert_eq!(request.agent_count, 1);
    }

    #[tokio::test]
    async fn missing_trigger_file_keeps_defaults() {
        let store = MemoryCloud::new();

        let (_, request) = classify(&upload_event("triggers/absent.trigger"), &store).await;

        assert_eq!(request.job_name, "github-pipeline");
        assert_eq!(store.object_gets.load(Ordering::SeqCst), 1);
    }

    #[tokio::test]
    async fn codecommit_bus_event_is_a_source_push() {
        let store = MemoryCloud::new();
        let event = json!({
            "source": "aws.codecommit",
            "detail": {"repositoryName": "backend", "referenceName": "develop"}
        });

        let (kind, request) = classify(&event, &store).await;

        assert_eq!(kind, TriggerKind::SourcePush);
        assert_eq!(request.repository.as_deref(), Some("backend"));
        assert_eq!(request.branch, "develop");
    }

    #[tokio::test]
    async fn other_bus_sources_are_scheduled_events() {
        let store = MemoryCloud::new();
        let event = json!({"source": "aws.events", "detail": {}});

        let (kind, request) = classify(&event, &store).await;

        assert_eq!(kind, TriggerKind::ScheduledEvent);
        assert_eq!(request.branch, "main");
        assert_eq!(request.agent_count, 1);
    }

    #[tokio::test]
    async fn http_event_is_a_direct_api_call() {
        let store = MemoryCloud::new();
        let event = json!({
            "httpMethod": "POST",
            "body": r#"{"job_name": "deploy", "branch": "release", "agent_count": 2, "build_parameters": {"ENV": "staging"}}"#
        });

        let (kind, request) = classify(&event, &store).await;

        assert_eq!(kind, TriggerKind::DirectApi);
        assert_eq!(request.job_name, "deploy");
        assert_eq!(request.branch, "release");
        assert_eq!(request.agent_count, 2);
        assert_eq!(request.extra_params["ENV"], "staging");
    }

    #[tokio::test]
    async fn http_event_with_bad_body_keeps_defaults() {
        let store = MemoryCloud::new();
        let event = json!({"httpMethod": "POST", "body": "{broken"});

        let (kind, request) = classify(&event, &store).await;

        assert_eq!(kind, TriggerKind::DirectApi);
        assert_eq!(request.job_name, "github-pipeline");
        assert_eq!(request.branch, "main");
    }

    #[tokio::test]
    async fn push_payload_is_a_webhook() {
        let store = MemoryCloud::new();
        let event = json!({
            "repository": {"name": "backend"},
            "pusher": {"name": "dev"},
            "ref": "refs/heads/feature/login",
            "head_commit": {"id": "abc123"}
        });

        let (kind, request) = classify(&event, &store).await;

        assert_eq!(kind, TriggerKind::Webhook);
        assert_eq!(request.repository.as_deref(), Some("backend"));
        assert_eq!(request.branch, "feature/login");
        assert_eq!(request.commit_sha.as_deref(), Some("abc123"));
        assert_eq!(request.extra_params["pusher"], "dev");
    }

    #[tokio::test]
    async fn repository_without_pusher_is_not_a_webhook() {
        let store = MemoryCloud::new();
        let event = json!({"repository": {"name": "backend"}});

        let (kind, _) = classify(&event, &store).await;
        assert_eq!(kind, TriggerKind::Manual);
    }

    #[tokio::test]
    async fn unknown_shapes_are_manual_triggers() {
        let store = MemoryCloud::new();
        let event = json!({"job_name": "adhoc", "agent_count": 4});

        let (kind, request) = classify(&event, &store).await;

        assert_eq!(kind, TriggerKind::Manual);
        assert_eq!(request.job_name, "adhoc");
        assert_eq!(request.agent_count, 4);
    }

    #[tokio::test]
    async fn empty_event_is_a_manual_trigger_with_defaults() {
        let store = MemoryCloud::new();
        let (kind, request) = classify(&json!({}), &store).await;

        assert_eq!(kind, TriggerKind::Manual);
        assert_eq!(request.job_name, "github-pipeline");
        assert_eq!(request.branch, "main");
        assert_eq!(request.agent_count, 1);
    }

    #[test]
    fn trigger_key_pattern_is_anchored() {
        assert!(TRIGGER_KEY.is_match("triggers/nightly.trigger"));
        assert!(!TRIGGER_KEY.is_match("triggers/nested/nightly.trigger"));
        assert!(!TRIGGER_KEY.is_match("other/nightly.trigger"));
        assert!(!TRIGGER_KEY.is_match("triggers/nightly.json"));
    }
}
