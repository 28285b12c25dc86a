use std::path::PathBuf;
use std::sync::Arc;

use anyhow::Context;
use clap::Parser;
use tokio::sync::watch;
use tracing::info;
use tracing_subscriber::EnvFilter;

use greenwatch::config::Config;
use greenwatch::coordinator::Coordinator;
use greenwatch::discovery::DiscoveryPublisher;
use greenwatch::mqtt::MqttPublisher;
use greenwatch::pipeline::PipelineRunner;
use greenwatch::registry::Registry;

/// Watches image sources, runs the configured processors over every new
/// image, and publishes the results as MQTT discovery sensors.
#[derive(Parser)]
#[command(name = "greenwatch", version, about)]
struct Args {
    /// Path to the TOML configuration file.
    #[arg(short, long, default_value = "/etc/greenwatch/config.toml")]
    config: PathBuf,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();

    let args = Args::parse();
    let config = Config::load(&args.config)
        .with_context(|| format!("loading config from {}", args.config.display()))?;

    let registry = Registry::with_builtin_kinds();
    let sources = registry.build_sources(&config.sources)?;
    let processors = registry.build_processors(&config.processors)?;

    let (mqtt, _event_loop) = MqttPublisher::connect(&config.mqtt, &config.device.prefix);
    let publisher = Arc::new(DiscoveryPublisher::new(
        Arc::new(mqtt),
        config.mqtt.discovery_prefix.clone(),
        config.device.clone(),
    ));
    let coordinator = Coordinator::new(sources, PipelineRunner::new(processors), publisher);

    let (shutdown_tx, shutdown_rx) = watch::channel(false);
    let run = tokio::spawn(coordinator.run(shutdown_rx));

    tokio::signal::ctrl_c()
        .await
        .context("waiting for shutdown signal")?;
    info!("shutdown signal received");
    let _ = shutdown_tx.send(true);

    run.await.context("coordinator task panicked")?;
    Ok(())
}
