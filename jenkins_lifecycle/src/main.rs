//! Jenkins lifecycle controller — one-shot cost-optimization actions.

use clap::Parser;

use jenkins_lifecycle::config::LifecycleConfig;
use jenkins_lifecycle::handler::{self, Providers};
use jenkins_lifecycle::provider::aws::AwsCli;
use jenkins_lifecycle::response::ActionRequest;
use jenkins_lifecycle::services::lifecycle_service::PollSettings;

#[derive(Parser)]
#[command(name = "jenkins-lifecycle", about = "Jenkins cluster cost-optimization actions")]
struct Cli {
    /// Action to execute (shutdown, startup, scale_agents, cost_report)
    #[arg(long)]
    action: Option<String>,

    /// Desired worker capacity for scale_agents
    #[arg(long)]
    desired_capacity: Option<u32>,

    /// Read the action request as JSON from this file ('-' for stdin)
    #[arg(long)]
    event: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let request = match cli.event {
        Some(path) => serde_json::from_str(&read_input(&path).await?)?,
        None => ActionRequest {
            action: cli.action.unwrap_or_else(|| "unknown".to_string()),
            desired_capacity: cli.desired_capacity,
        },
    };

    tracing::info!(action = %request.action, "received lifecycle request");

    let config = LifecycleConfig::from_env();
    let aws = AwsCli::new(config.region.clone());
    let providers = Providers {
        compute: &aws,
        pool: &aws,
        metrics: &aws,
    };

    let response = handler::handle(&request, &providers, &config, PollSettings::default()).await;
    println!("{}", serde_json::to_string_pretty(&response)?);

    if response.status_code >= 400 {
        std::process::exit(1);
    }
    Ok(())
}

async fn read_input(path: &str) -> anyhow::Result<String> {
    if path == "-" {
        use tokio::io::AsyncReadExt;
        let mut buf = String::new();
        tokio::io::stdin().read_to_string(&mut buf).await?;
        Ok(buf)
    } else {
        Ok(tokio::fs::read_to_string(path).await?)
    }
}

fn init_tracing() {
    let log_format = std::env::var("LOG_FORMAT").unwrap_or_default();
    if log_format == "json" {
        tracing_subscriber::fmt()
            .json()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    } else {
        tracing_subscriber::fmt()
            .with_env_filter(
                tracing_subscriber::EnvFilter::try_from_default_env()
                    .unwrap_or_else(|_| "info".into()),
            )
            .init();
    }
}
