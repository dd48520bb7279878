//! AWS provider — drives the `aws` CLI and parses its JSON output.
//!
//! Instance control goes through EC2, pool sizing through Auto Scaling,
//! metrics through CloudWatch, audit blobs through S3. Credential and
//! region resolution stays with the CLI's own configuration chain.

use std::process::Stdio;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde_json::Value;
use tokio::io::AsyncWriteExt;
use tokio::process::Command;

use crate::models::instance::{Instance, NodeState};
use crate::models::pool::WorkerPool;

use super::{ComputeProvider, DataPoint, MetricsSink, ObjectStore, PoolProvider};

/// Namespace for all cost-optimization metrics.
const METRIC_NAMESPACE: &str = "Jenkins/CostOptimization";

/// Cloud provider backed by the `aws` command-line tool.
#[derive(Debug, Clone, Default)]
pub struct AwsCli {
    region: Option<String>,
}

impl AwsCli {
    pub fn new(region: Option<String>) -> Self {
        Self { region }
    }

    async fn run(&self, args: &[&str]) -> anyhow::Result<std::process::Output> {
        let mut cmd = Command::new("aws");
        cmd.args(args);
        if let Some(region) = &self.region {
            cmd.args(["--region", region]);
        }

        let output = cmd.output().await.context("failed to execute aws cli")?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!(
                "aws {} failed: {}",
                args.first().copied().unwrap_or_default(),
                stderr.trim()
            );
        }
        Ok(output)
    }

    /// Run an `aws` subcommand and parse its stdout as JSON.
    async fn run_json(&self, args: &[&str]) -> anyhow::Result<Value> {
        let mut full = args.to_vec();
        full.extend(["--output", "json"]);
        let output = self.run(&full).await?;

        let stdout = String::from_utf8_lossy(&output.stdout);
        if stdout.trim().is_empty() {
            return Ok(Value::Null);
        }
        serde_json::from_str(&stdout).context("unparseable aws cli output")
    }
}

fn parse_instance(value: &Value) -> Instance {
    let launch_time = value
        .get("LaunchTime")
        .and_then(Value::as_str)
        .and_then(|s| s.parse::<DateTime<Utc>>().ok());

    Instance {
        id: value["InstanceId"].as_str().unwrap_or_default().to_string(),
        state: NodeState::from(
            value["State"]["Name"]
                .as_str()
                .unwrap_or_default()
                .to_string(),
        ),
        instance_class: value["InstanceType"].as_str().unwrap_or("unknown").to_string(),
        launch_time,
        spot: value["InstanceLifecycle"].as_str() == Some("spot"),
    }
}

/// Flatten all instances out of a describe-instances response.
fn collect_instances(response: &Value) -> Vec<Instance> {
    response["Reservations"]
        .as_array()
        .map(|reservations| {
            reservations
                .iter()
                .filter_map(|r| r["Instances"].as_array())
                .flatten()
                .map(parse_instance)
                .collect()
        })
        .unwrap_or_default()
}

#[async_trait]
impl ComputeProvider for AwsCli {
    async fn find_by_tag(&self, key: &str, value: &str) -> anyhow::Result<Option<Instance>> {
        let tag_filter = format!("Name=tag:{key},Values={value}");
        let response = self
            .run_json(&[
                "ec2",
                "describe-instances",
                "--filters",
                &tag_filter,
                "Name=instance-state-name,Values=running,stopped",
            ])
            .await?;

        Ok(collect_instances(&response).into_iter().next())
    }

    async fn describe(&self, id: &str) -> anyhow::Result<Instance> {
        let response = self
            .run_json(&["ec2", "describe-instances", "--instance-ids", id])
            .await?;

        collect_instances(&response)
            .into_iter()
            .next()
            .with_context(|| format!("instance {id} not found"))
    }

    async fn start(&self, id: &str) -> anyhow::Result<()> {
        self.run_json(&["ec2", "start-instances", "--instance-ids", id])
            .await?;
        Ok(())
    }

    async fn stop(&self, id: &str) -> anyhow::Result<()> {
        self.run_json(&["ec2", "stop-instances", "--instance-ids", id])
            .await?;
        Ok(())
    }
}

#[async_trait]
impl PoolProvider for AwsCli {
    async fn describe_pool(&self, name: &str) -> anyhow::Result<WorkerPool> {
        let response = self
            .run_json(&[
                "autoscaling",
                "describe-auto-scaling-groups",
                "--auto-scaling-group-names",
                name,
            ])
            .await?;

        let group = response["AutoScalingGroups"]
            .as_array()
            .and_then(|groups| groups.first())
            .with_context(|| format!("worker pool {name} not found"))?;

        let desired_capacity = group["DesiredCapacity"].as_u64().unwrap_or(0) as u32;
        let member_ids: Vec<String> = group["Instances"]
            .as_array()
            .map(|members| {
                members
                    .iter()
                    .filter_map(|m| m["InstanceId"].as_str())
                    .map(str::to_string)
                    .collect()
            })
            .unwrap_or_default();

        let mut members = Vec::new();
        if !member_ids.is_empty() {
            let mut args = vec!["ec2", "describe-instances", "--instance-ids"];
            args.extend(member_ids.iter().map(String::as_str));
            let details = self.run_json(&args).await?;
            members = collect_instances(&details)
                .into_iter()
                .filter(|i| i.state == NodeState::Running)
                .collect();
        }

        Ok(WorkerPool {
            name: name.to_string(),
            desired_capacity,
            members,
        })
    }

    async fn set_desired_capacity(&self, name: &str, desired: u32) -> anyhow::Result<()> {
        let capacity = desired.to_string();
        self.run_json(&[
            "autoscaling",
            "set-desired-capacity",
            "--auto-scaling-group-name",
            name,
            "--desired-capacity",
            &capacity,
            "--no-honor-cooldown",
        ])
        .await?;
        Ok(())
    }
}

#[async_trait]
impl MetricsSink for AwsCli {
    async fn put_count(&self, point: DataPoint) -> anyhow::Result<()> {
        let dimensions: Vec<Value> = point
            .dimensions
            .iter()
            .map(|(name, value)| serde_json::json!({"Name": name, "Value": value}))
            .collect();

        let data = serde_json::json!([{
            "MetricName": point.name,
            "Value": point.value,
            "Unit": "Count",
            "Timestamp": point.timestamp.to_rfc3339(),
            "Dimensions": dimensions,
        }])
        .to_string();

        self.run_json(&[
            "cloudwatch",
            "put-metric-data",
            "--namespace",
            METRIC_NAMESPACE,
            "--metric-data",
            &data,
        ])
        .await?;
        Ok(())
    }

    async fn sum_today(&self, name: &str, now: DateTime<Utc>) -> anyhow::Result<f64> {
        let start = format!("{}T00:00:00Z", now.format("%Y-%m-%d"));
        let end = now.to_rfc3339();
        let response = self
            .run_json(&[
                "cloudwatch",
                "get-metric-statistics",
                "--namespace",
                METRIC_NAMESPACE,
                "--metric-name",
                name,
                "--start-time",
                &start,
                "--end-time",
                &end,
                "--period",
                "3600",
                "--statistics",
                "Sum",
            ])
            .await?;

        let total = response["Datapoints"]
            .as_array()
            .map(|points| points.iter().filter_map(|p| p["Sum"].as_f64()).sum())
            .unwrap_or(0.0);
        Ok(total)
    }
}

#[async_trait]
impl ObjectStore for AwsCli {
    async fn get(&self, bucket: &str, key: &str) -> anyhow::Result<String> {
        let source = format!("s3://{bucket}/{key}");
        let output = self.run(&["s3", "cp", &source, "-"]).await?;
        Ok(String::from_utf8_lossy(&output.stdout).to_string())
    }

    async fn put(
        &self,
        bucket: &str,
        key: &str,
        body: String,
        content_type: &str,
    ) -> anyhow::Result<()> {
        let target = format!("s3://{bucket}/{key}");
        let mut cmd = Command::new("aws");
        cmd.args(["s3", "cp", "-", &target, "--content-type", content_type]);
        if let Some(region) = &self.region {
            cmd.args(["--region", region]);
        }
        cmd.stdin(Stdio::piped())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped());

        let mut child = cmd.spawn().context("failed to execute aws cli")?;
        if let Some(mut stdin) = child.stdin.take() {
            stdin.write_all(body.as_bytes()).await?;
        }

        let output = child.wait_with_output().await?;
        if !output.status.success() {
            let stderr = String::from_utf8_lossy(&output.stderr);
            anyhow::bail!("aws s3 cp to {target} failed: {}", stderr.trim());
        }
        Ok(())
    }
}
