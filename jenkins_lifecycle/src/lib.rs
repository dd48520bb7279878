//! Cost-aware lifecycle management for a Jenkins cluster.
//!
//! One controller node, an elastic worker pool. Each invocation performs
//! a single idempotent transition (shutdown / startup / rescale) or
//! produces a read-only cost report. The companion `jenkins-trigger`
//! crate reuses the provider seams and lifecycle primitives from here.

pub mod config;
pub mod error;
pub mod handler;
pub mod metrics;
pub mod models;
pub mod provider;
pub mod response;
pub mod services;
