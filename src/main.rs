use std::sync::Arc;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;
use tracing_subscriber::{fmt, layer::SubscriberExt, util::SubscriberInitExt, EnvFilter};

use cluster_master::backlog::{JobSettings, JsonCodec};
use cluster_master::node::UnimplementedDialer;
use cluster_master::settings_lookup::EmptyGroupSettings;
use cluster_master::{ClusterMaster, Lifecycle, Settings};

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::registry()
        .with(EnvFilter::try_from_default_env().unwrap_or_else(|_| "info,cluster_master=debug".into()))
        .with(fmt::layer())
        .init();

    let settings = Settings::from_env().context("failed to load configuration")?;

    let global_settings: JobSettings = settings
        .global_cluster_settings
        .iter()
        .filter_map(|name| {
            std::env::var(name)
                .ok()
                .map(|value| (name.clone(), serde_json::Value::String(value)))
        })
        .collect();

    let master = ClusterMaster::new(
        settings.default_priority,
        global_settings,
        Arc::new(EmptyGroupSettings),
        settings.nodes.clone(),
        Arc::new(UnimplementedDialer),
    );

    let lifecycle = Lifecycle::new(
        settings.statefile.clone(),
        std::time::Duration::from_secs(settings.poll_interval_secs),
    );
    let codec = JsonCodec;

    lifecycle
        .engine_started(&master, &codec)
        .await
        .context("engine_started failed")?;

    let shutdown = CancellationToken::new();

    tokio::select! {
        _ = lifecycle.run_poll_loop(&master, &shutdown) => {}
        _ = tokio::signal::ctrl_c() => {
            tracing::info!("received interrupt, shutting down");
            shutdown.cancel();
        }
    }

    lifecycle.engine_stopped(&master, &codec).await;
    Ok(())
}
