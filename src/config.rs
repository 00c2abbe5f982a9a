use std::collections::HashMap;
use std::env;

use anyhow::{Context, Result};
use dotenvy::dotenv;

/// Application configuration loaded from environment variables.
///
/// Mirrors the recognized `CLUSTER_MASTER_*` / `GROUPSETTINGS_*` keys.
#[derive(Debug, Clone)]
pub struct Settings {
    pub enabled: bool,
    pub statefile: String,
    pub nodes: HashMap<String, String>,
    pub poll_interval_secs: u64,
    pub default_priority: i64,
    pub global_cluster_settings: Vec<String>,
    pub groupsettings_enabled: bool,
    pub groupsettings_module: Option<String>,
}

impl Settings {
    /// Load configuration from environment variables, failing fast on
    /// anything missing or unparseable (per the misconfiguration error kind).
    pub fn from_env() -> Result<Self> {
        let _ = dotenv();

        let enabled = parse_bool(&env::var("CLUSTER_MASTER_ENABLED").unwrap_or_default());
        if !enabled {
            anyhow::bail!("CLUSTER_MASTER_ENABLED must be truthy for the cluster master to initialize");
        }

        let statefile = env::var("CLUSTER_MASTER_STATEFILE")
            .context("CLUSTER_MASTER_STATEFILE must be set")?;
        if statefile.is_empty() {
            anyhow::bail!("CLUSTER_MASTER_STATEFILE must not be empty");
        }

        let nodes = parse_nodes(&env::var("CLUSTER_MASTER_NODES").unwrap_or_default())
            .context("CLUSTER_MASTER_NODES is malformed, expected name=host:port pairs")?;

        let poll_interval_secs = env::var("CLUSTER_MASTER_POLL_INTERVAL")
            .unwrap_or_else(|_| "60".to_string())
            .parse()
            .context("CLUSTER_MASTER_POLL_INTERVAL must be a positive integer")?;

        let default_priority = env::var("DEFAULT_PRIORITY")
            .unwrap_or_else(|_| "20".to_string())
            .parse()
            .context("DEFAULT_PRIORITY must be an integer")?;

        let global_cluster_settings = env::var("GLOBAL_CLUSTER_SETTINGS")
            .unwrap_or_default()
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(str::to_string)
            .collect();

        let groupsettings_enabled =
            parse_bool(&env::var("GROUPSETTINGS_ENABLED").unwrap_or_default());
        let groupsettings_module = env::var("GROUPSETTINGS_MODULE").ok();

        Ok(Self {
            enabled,
            statefile,
            nodes,
            poll_interval_secs,
            default_priority,
            global_cluster_settings,
            groupsettings_enabled,
            groupsettings_module,
        })
    }
}

fn parse_bool(raw: &str) -> bool {
    matches!(raw.to_ascii_lowercase().as_str(), "1" | "true" | "yes" | "on")
}

/// Parses `name=host:port,name=host:port` into a name -> "host:port" map.
fn parse_nodes(raw: &str) -> Result<HashMap<String, String>> {
    let mut nodes = HashMap::new();
    for pair in raw.split(',').map(str::trim).filter(|s| !s.is_empty()) {
        let (name, hostport) = pair
            .split_once('=')
            .with_context(|| format!("node entry '{pair}' is missing '='"))?;
        if name.is_empty() || hostport.is_empty() {
            anyhow::bail!("node entry '{pair}' has an empty name or host:port");
        }
        hostport
            .split_once(':')
            .with_context(|| format!("node '{name}' has unparseable host:port '{hostport}'"))?;
        nodes.insert(name.to_string(), hostport.to_string());
    }
    Ok(nodes)
}
