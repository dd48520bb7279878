//! Jenkins build trigger — one-shot orchestration of a single build.

use clap::Parser;

use jenkins_lifecycle::provider::aws::AwsCli;
use jenkins_lifecycle::services::lifecycle_service::PollSettings;

use jenkins_trigger::config::TriggerConfig;
use jenkins_trigger::handler::{self, TriggerContext};
use jenkins_trigger::services::jenkins_service::{READY_DELAY, READY_MAX_ATTEMPTS};

#[derive(Parser)]
#[command(name = "jenkins-trigger", about = "Trigger a Jenkins build from a raw event")]
struct Cli {
    /// Raw event as a JSON document ('-' for stdin, default)
    #[arg(long, default_value = "-")]
    event: String,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    init_tracing();
    let cli = Cli::parse();

    let raw = read_input(&cli.event).await?;
    let event: serde_json::Value = serde_json::from_str(&raw)?;
    tracing::info!("received trigger event");

    let config = TriggerConfig::from_env();
    let aws = AwsCli::new(config.region.clone());
    let ctx = TriggerContext {
        compute: &aws,
        pool: &aws,
        metrics: &aws,
        store: &aws,
        poll: PollSettings::default(),
        ready_max_attempts: READY_MAX_ATTEMPTS,
        ready_delay: READY_DELAY,
    };

    let response = handler::handle(&event, &ctx, &config).await;
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
