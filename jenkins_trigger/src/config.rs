//! Build-trigger configuration — loaded from environment variables.

#[derive(Clone, Debug)]
pub struct TriggerConfig {
    /// Jenkins controller base URL.
    pub jenkins_url: Option<String>,
    /// HTTP Basic user for the controller API.
    pub jenkins_user: String,
    /// HTTP Basic credential for the controller API.
    pub jenkins_password: Option<String>,
    /// Bucket receiving the per-trigger audit records.
    pub audit_bucket: Option<String>,
    /// Tag key/value used to locate the controller instance.
    pub controller_tag_key: String,
    pub controller_tag_value: String,
    /// Worker pool name; capacity is left alone when unset.
    pub pool_name: Option<String>,
    /// Verify the controller's TLS certificate. Off by default: the
    /// endpoint is an in-VPC address with a self-signed certificate.
    pub verify_tls: bool,
    /// Region override for the provider.
    pub region: Option<String>,
}

impl TriggerConfig {
    pub fn from_env() -> Self {
        let jenkins_url = std::env::var("JENKINS_URL").ok().filter(|s| !s.is_empty());
        let jenkins_user = std::env::var("JENKINS_USER").unwrap_or_else(|_| "admin".to_string());
        let jenkins_password = std::env::var("JENKINS_PASSWORD")
            .ok()
            .filter(|s| !s.is_empty());
        let audit_bucket = std::env::var("S3_BUCKET").ok().filter(|s| !s.is_empty());
        let controller_tag_key =
            std::env::var("CONTROLLER_TAG_KEY").unwrap_or_else(|_| "Type".to_string());
        let controller_tag_value = std::env::var("CONTROLLER_TAG_VALUE")
            .unwrap_or_else(|_| "jenkins-master".to_string());
        let pool_name = std::env::var("ASG_NAME").ok().filter(|s| !s.is_empty());
        let verify_tls = std::env::var("JENKINS_VERIFY_TLS")
            .ok()
            .and_then(|s| s.parse().ok())
            .unwrap_or(false);
        let region = std::env::var("AWS_REGION").ok().filter(|s| !s.is_empty());

        if jenkins_url.is_none() || jenkins_password.is_none() {
            tracing::warn!("JENKINS_URL/JENKINS_PASSWORD not set -- build triggers will be rejected");
        }
        if audit_bucket.is_none() {
            tracing::warn!("S3_BUCKET not set -- trigger audit logging disabled");
        }

        Self {
            jenkins_url,
            jenkins_user,
            jenkins_password,
            audit_bucket,
            controller_tag_key,
            controller_tag_value,
            pool_name,
            verify_tls,
            region,
        }
    }
}
