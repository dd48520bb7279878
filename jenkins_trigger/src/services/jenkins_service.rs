//! Jenkins remote API — readiness probing, crumb negotiation, build
//! submission.

use std::collections::BTreeMap;
use std::time::Duration;

use chrono::{DateTime, Utc};

use crate::error::TriggerError;
use crate::models::request::BuildRequest;
use crate::models::submission::BuildSubmissionResult;

/// Readiness polling defaults: 30 probes, 10 seconds apart.
pub const READY_MAX_ATTEMPTS: u32 = 30;
pub const READY_DELAY: Duration = Duration::from_secs(10);

/// HTTP Basic client for one controller endpoint.
pub struct JenkinsClient {
    http: reqwest::Client,
    base_url: String,
    user: String,
    password: String,
}

impl JenkinsClient {
    pub fn new(base_url: &str, user: &str, password: &str, verify_tls: bool) -> Self {
        let http = reqwest::Client::builder()
            .danger_accept_invalid_certs(!verify_tls)
            .timeout(Duration::from_secs(10))
            .build()
            .unwrap_or_default();

        Self {
            http,
            base_url: base_url.trim_end_matches('/').to_string(),
            user: user.to_string(),
            password: password.to_string(),
        }
    }

    /// Probe the controller's liveness endpoint until it answers 2xx.
    ///
    /// Returns false after exhausting attempts; never errors. A false
    /// return means "abort this invocation, do not proceed to
    /// submission" for the caller.
    pub async fn wait_until_ready(&self, max_attempts: u32, delay: Duration) -> bool {
        let url = format!("{}/api/json", self.base_url);

        for attempt in 1..=max_attempts {
            match self
                .http
                .get(&url)
                .basic_auth(&self.user, Some(&self.password))
                .send()
                .await
            {
                Ok(resp) if resp.status().is_success() => {
                    tracing::info!(attempt, "Jenkins is ready");
                    return true;
                }
                Ok(resp) => {
                    tracing::debug!(attempt, status = %resp.status(), "Jenkins not ready");
                }
                Err(e) => {
                    tracing::debug!(attempt, "Jenkins not ready: {e}");
                }
            }
            if attempt < max_attempts {
                tokio::time::sleep(delay).await;
            }
        }

        tracing::warn!(max_attempts, "Jenkins failed to become ready");
        false
    }

    /// One-time anti-forgery token from the crumb issuer.
    ///
    /// Controllers without CSRF protection answer with an error here;
    /// submission then proceeds without the crumb header.
    async fn fetch_crumb(&self) -> Option<(String, String)> {
        let url = format!(
            "{}/crumbIssuer/api/xml?xpath=concat(//crumbRequestField,\":\",//crumb)",
            self.base_url
        );

        let resp = self
            .http
            .get(&url)
            .basic_auth(&self.user, Some(&self.password))
            .send()
            .await
            .ok()?;
        if !resp.status().is_success() {
            tracing::debug!(status = %resp.status(), "crumb issuer unavailable");
            return None;
        }

        let body = resp.text().await.ok()?;
        let (field, value) = body.trim().split_once(':')?;
        Some((field.to_string(), value.to_string()))
    }

    /// Submit one build: crumb negotiation, parameter encoding, then a
    /// form-encoded POST. 200/201 is success; anything else is terminal
    /// with the status and body carried verbatim.
    pub async fn submit_build(
        &self,
        request: &BuildRequest,
    ) -> Result<BuildSubmissionResult, TriggerError> {
        let parameters = assemble_parameters(request, Utc::now());

        let build_url;
        let mut post = if parameters.is_empty() {
            build_url = format!("{}/job/{}/build", self.base_url, request.job_name);
            self.http.post(&build_url)
        } else {
            build_url = format!(
                "{}/job/{}/buildWithParameters",
                self.base_url, request.job_name
            );
            self.http.post(&build_url).form(&parameters)
        };

        post = post.basic_auth(&self.user, Some(&self.password));
        if let Some((field, value)) = self.fetch_crumb().await {
            post = post.header(field.as_str(), value.as_str());
        }

        let resp = post.send().await.map_err(anyhow::Error::from)?;
        let status = resp.status();

        if status == reqwest::StatusCode::OK || status == reqwest::StatusCode::CREATED {
            let queue_location = resp
                .headers()
                .get("Location")
                .and_then(|v| v.to_str().ok())
                .unwrap_or_default()
                .to_string();

            tracing::info!(
                job = %request.job_name,
                queue = %queue_location,
                "build triggered"
            );

            Ok(BuildSubmissionResult {
                success: true,
                queue_location,
                build_url,
                parameters,
            })
        } else {
            let body = resp.text().await.unwrap_or_default();
            Err(TriggerError::Submission {
                status: status.as_u16(),
                body,
            })
        }
    }
}

/// Fixed submission fields overlaid with the caller's extras; the
/// extras win on key collision.
pub fn assemble_parameters(
    request: &BuildRequest,
    now: DateTime<Utc>,
) -> BTreeMap<String, String> {
    let mut params = BTreeMap::new();
    params.insert("TRIGGER_TYPE".to_string(), request.kind.to_string());
    params.insert("BRANCH".to_string(), request.branch.clone());
    params.insert(
        "REPOSITORY".to_string(),
        request.repository.clone().unwrap_or_default(),
    );
    params.insert(
        "COMMIT_SHA".to_string(),
        request.commit_sha.clone().unwrap_or_default(),
    );
    params.insert("TRIGGER_TIMESTAMP".to_string(), now.to_rfc3339());

    for (key, value) in &request.extra_params {
        params.insert(key.clone(), value.clone());
    }

    params
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::request::TriggerKind;

    #[test]
    fn fixed_fields_are_always_present() {
        let request = BuildRequest::with_defaults(TriggerKind::Manual);
        let now = "2026-08-06T12:00:00Z".parse().unwrap();
        let params = assemble_parameters(&request, now);

        assert_eq!(params["TRIGGER_TYPE"], "manual");
        assert_eq!(params["BRANCH"], "main");
        assert_eq!(params["REPOSITORY"], "");
        assert_eq!(params["COMMIT_SHA"], "");
        assert_eq!(params["TRIGGER_TIMESTAMP"], "2026-08-06T12:00:00+00:00");
    }

    #[test]
    fn caller_extras_override_fixed_fields() {
        let mut request = BuildRequest::with_defaults(TriggerKind::DirectApi);
        request
            .extra_params
            .insert("BRANCH".to_string(), "release".to_string());
        request
            .extra_params
            .insert("SUITE".to_string(), "smoke".to_string());

        let params = assemble_parameters(&request, Utc::now());

        assert_eq!(params["BRANCH"], "release");
        assert_eq!(params["SUITE"], "smoke");
        assert_eq!(params["TRIGGER_TYPE"], "direct_api");
    }
}
