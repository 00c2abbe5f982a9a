use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use std::time::Duration;

use anyhow::{Context, Result};
use tokio_util::sync::CancellationToken;

use crate::backlog::BacklogCodec;
use crate::master::ClusterMaster;

/// Subscribes to the host engine's start/stop signals: loads the backlog
/// and connects to workers at start, persists the backlog at stop.
pub struct Lifecycle {
    statefile: PathBuf,
    poll_interval: Duration,
}

impl Lifecycle {
    pub fn new(statefile: impl Into<PathBuf>, poll_interval: Duration) -> Self {
        Self {
            statefile: statefile.into(),
            poll_interval,
        }
    }

    /// Loads the backlog from the state file (empty if absent, fatal if
    /// corrupt) and connects to every configured worker.
    pub async fn engine_started(&self, master: &ClusterMaster, codec: &dyn BacklogCodec) -> Result<()> {
        self.load_statefile(master, codec).await?;
        master.connect_all().await;
        Ok(())
    }

    async fn load_statefile(&self, master: &ClusterMaster, codec: &dyn BacklogCodec) -> Result<()> {
        match std::fs::File::open(&self.statefile) {
            Ok(mut file) => {
                master
                    .load(&mut file, codec)
                    .await
                    .with_context(|| format!("state file {} is corrupt", self.statefile.display()))?;
                tracing::info!(path = %self.statefile.display(), "loaded cluster master state");
            }
            Err(err) if err.kind() == ErrorKind::NotFound => {
                tracing::info!(path = %self.statefile.display(), "no state file found, starting with an empty backlog");
            }
            Err(err) => {
                return Err(err)
                    .with_context(|| format!("failed to open state file {}", self.statefile.display()));
            }
        }
        Ok(())
    }

    /// Serializes the backlog atomically (write-then-replace). Failures are
    /// logged and swallowed: shutdown proceeds regardless.
    pub async fn engine_stopped(&self, master: &ClusterMaster, codec: &dyn BacklogCodec) {
        if let Err(err) = self.save_atomic(master, codec).await {
            tracing::error!(error = %err, "failed to save cluster master state");
        }
    }

    async fn save_atomic(&self, master: &ClusterMaster, codec: &dyn BacklogCodec) -> Result<()> {
        let tmp_path = tmp_path_for(&self.statefile);
        {
            let mut tmp = std::fs::File::create(&tmp_path)
                .with_context(|| format!("failed to create {}", tmp_path.display()))?;
            master.save(&mut tmp, codec).await?;
            tmp.sync_all()?;
        }
        std::fs::rename(&tmp_path, &self.statefile)
            .with_context(|| format!("failed to replace {}", self.statefile.display()))?;
        tracing::info!(path = %self.statefile.display(), "cluster master state saved");
        Ok(())
    }

    /// Drives the periodic poll until `shutdown` is cancelled, stopping
    /// between ticks rather than mid-tick.
    pub async fn run_poll_loop(&self, master: &ClusterMaster, shutdown: &CancellationToken) {
        let mut interval = tokio::time::interval(self.poll_interval);
        loop {
            tokio::select! {
                _ = shutdown.cancelled() => break,
                _ = interval.tick() => {
                    master.poll_once().await;
                }
            }
        }
    }
}

fn tmp_path_for(statefile: &Path) -> PathBuf {
    let mut tmp = statefile.as_os_str().to_owned();
    tmp.push(".tmp");
    PathBuf::from(tmp)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::JsonCodec;
    use crate::node::transport::testing::MockDialer;
    use crate::node::PeerDialer;
    use crate::settings_lookup::EmptyGroupSettings;
    use std::sync::Arc;

    fn master() -> ClusterMaster {
        let dialer: Arc<dyn PeerDialer> = Arc::new(MockDialer::new());
        ClusterMaster::new(
            20,
            crate::backlog::JobSettings::new(),
            Arc::new(EmptyGroupSettings),
            std::collections::HashMap::new(),
            dialer,
        )
    }

    #[tokio::test]
    async fn engine_started_begins_empty_when_statefile_is_absent() {
        let dir = std::env::temp_dir().join(format!("cluster-master-test-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("missing.json");
        let _ = std::fs::remove_file(&path);

        let lifecycle = Lifecycle::new(&path, Duration::from_secs(60));
        let m = master();
        lifecycle.engine_started(&m, &JsonCodec).await.unwrap();
        assert_eq!(m.backlog_len().await, 0);
    }

    #[tokio::test]
    async fn engine_stopped_then_engine_started_round_trips_backlog() {
        let dir = std::env::temp_dir().join(format!("cluster-master-test-rt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("state.json");
        let _ = std::fs::remove_file(&path);

        let lifecycle = Lifecycle::new(&path, Duration::from_secs(60));
        let m = master();
        m.schedule(&["a".to_string(), "b".to_string()], None, Some(10)).await;
        lifecycle.engine_stopped(&m, &JsonCodec).await;
        assert!(path.exists());

        let reloaded = master();
        lifecycle.engine_started(&reloaded, &JsonCodec).await.unwrap();
        assert_eq!(reloaded.backlog_len().await, 2);

        let _ = std::fs::remove_file(&path);
    }

    #[tokio::test]
    async fn engine_started_is_fatal_on_corrupt_statefile() {
        let dir = std::env::temp_dir().join(format!("cluster-master-test-corrupt-{}", std::process::id()));
        std::fs::create_dir_all(&dir).unwrap();
        let path = dir.join("corrupt.json");
        std::fs::write(&path, b"not json").unwrap();

        let lifecycle = Lifecycle::new(&path, Duration::from_secs(60));
        let m = master();
        assert!(lifecycle.engine_started(&m, &JsonCodec).await.is_err());

        let _ = std::fs::remove_file(&path);
    }
}
