use agent::{Agent, AgentConfig, ResultsClient};
use clap::Parser;
use tracing_subscriber::{layer::SubscriberExt, util::SubscriberInitExt};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    dotenvy::dotenv().ok();

    let config = AgentConfig::parse();

    let log_level = if config.verbose { "debug" } else { "info" };
    tracing_subscriber::registry()
        .with(
            tracing_subscriber::EnvFilter::try_from_default_env().unwrap_or_else(|_| {
                format!("racecheck_agent={},agent={}", log_level, log_level).into()
            }),
        )
        .with(tracing_subscriber::fmt::layer())
        .init();

    for dir in [&config.watch_dir, &config.completed_dir, &config.error_dir] {
        tokio::fs::create_dir_all(dir).await?;
    }

    tracing::info!(
        "Watching {} for *{} files every {}s",
        config.watch_dir.display(),
        config.extension,
        config.check_interval().as_secs()
    );

    let client = ResultsClient::new(&config.api_url, &config.api_key, config.http_timeout())?;
    let agent = Agent::new(config, client).await?;
    agent.run().await?;

    Ok(())
}
