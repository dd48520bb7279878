//! Trigger services — the Jenkins remote protocol and audit logging.

pub mod audit_service;
pub mod jenkins_service;
