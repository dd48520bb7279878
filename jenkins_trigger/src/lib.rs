//! On-demand build-trigger orchestration for a cost-optimized Jenkins
//! cluster.
//!
//! Classifies an arbitrary inbound event into a canonical build
//! request, wakes the controller, secures worker capacity, polls for
//! control-plane readiness, and submits the build with crumb
//! negotiation. Every invocation leaves one append-only audit record
//! behind.

pub mod classifier;
pub mod config;
pub mod error;
pub mod handler;
pub mod models;
pub mod services;
