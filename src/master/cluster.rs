use std::collections::{HashMap, HashSet};
use std::sync::Arc;

use tokio::sync::Mutex;

use crate::backlog::{Backlog, BacklogCodec, Job, JobSettings, Verbosity};
use crate::error::MasterError;
use crate::node::snapshot::ProcessDescriptor;
use crate::node::{NodeSession, NodeSnapshot, NodeStatusView, PeerDialer, RefreshOutcome};
use crate::node::session::DispatchOutcome;
use crate::settings_lookup::GroupSettingsLookup;
use crate::statistics::Statistics;

/// Lowest priority rescheduling may decrement to. The spec allows negative
/// values but calls out unbounded decrement as a hazard; this is the
/// hardcoded floor decided on in place of an unconfigured open question.
const PRIORITY_FLOOR: i64 = -1000;

fn clamp_priority(priority: i64) -> i64 {
    priority.max(PRIORITY_FLOOR)
}

struct MasterState {
    backlog: Backlog,
    loading: HashSet<String>,
    statistics: Statistics,
    nodes: HashMap<String, Arc<Mutex<NodeSession>>>,
}

/// Owns all node sessions, the backlog, the statistics aggregate, and the
/// poll loop; exposes the operator API.
pub struct ClusterMaster {
    state: Mutex<MasterState>,
    default_priority: i64,
    nodes_config: HashMap<String, String>,
    dialer: Arc<dyn PeerDialer>,
}

impl ClusterMaster {
    pub fn new(
        default_priority: i64,
        global_settings: JobSettings,
        group_lookup: Arc<dyn GroupSettingsLookup>,
        nodes_config: HashMap<String, String>,
        dialer: Arc<dyn PeerDialer>,
    ) -> Self {
        Self {
            state: Mutex::new(MasterState {
                backlog: Backlog::new(global_settings, group_lookup),
                loading: HashSet::new(),
                statistics: Statistics::default(),
                nodes: HashMap::new(),
            }),
            default_priority,
            nodes_config,
            dialer,
        }
    }

    /// Attempts to connect to every configured worker concurrently (no
    /// ordering is guaranteed across nodes). Failures are logged and
    /// otherwise swallowed: a node that can't be reached at startup is
    /// simply absent from the nodes table until a later poll reconnects it.
    pub async fn connect_all(&self) {
        let names: Vec<String> = self.nodes_config.keys().cloned().collect();
        futures::future::join_all(names.iter().map(|name| self.reconnect_node(name))).await;
    }

    async fn reconnect_node(&self, name: &str) {
        let Some(hostport) = self.nodes_config.get(name) else {
            return;
        };
        match self.dialer.connect(hostport).await {
            Ok(peer) => {
                let mut session = NodeSession::new(name, peer);
                // Mirrors the worker-side `set_master` registration call:
                // an immediate status refresh establishes `alive` instead of
                // leaving the freshly connected node looking dead until the
                // next poll tick.
                session.refresh().await;
                let mut state = self.state.lock().await;
                state
                    .nodes
                    .insert(name.to_string(), Arc::new(Mutex::new(session)));
                tracing::info!(node = %name, host = %hostport, "connected to cluster worker");
            }
            Err(err) => {
                tracing::error!(node = %name, host = %hostport, error = %err, "could not connect to node");
            }
        }
    }

    pub async fn schedule(
        &self,
        domains: &[String],
        settings_override: Option<&JobSettings>,
        priority: Option<i64>,
    ) {
        let priority = priority.unwrap_or(self.default_priority);
        let mut state = self.state.lock().await;
        state.backlog.enqueue(domains, settings_override, priority);
    }

    pub async fn remove(&self, domains: &[String]) {
        let mut state = self.state.lock().await;
        for domain in domains {
            state.backlog.remove(domain);
        }
    }

    /// Looks each domain up in the derived `running` map and dispatches a
    /// `stop` to the owning node. Domains not currently running are
    /// silently skipped.
    pub async fn stop(&self, domains: &[String]) {
        let running = self.running().await;
        for domain in domains {
            let Some(node_name) = running.get(domain) else {
                continue;
            };
            let node_arc = {
                let state = self.state.lock().await;
                state.nodes.get(node_name).cloned()
            };
            if let Some(node_arc) = node_arc {
                let mut session = node_arc.lock().await;
                session.stop(domain).await;
            }
        }
    }

    pub async fn discard(&self, domains: &[String]) {
        self.remove(domains).await;
        self.stop(domains).await;
    }

    pub async fn disable_node(&self, name: &str) -> Result<(), MasterError> {
        self.set_node_available(name, false).await
    }

    pub async fn enable_node(&self, name: &str) -> Result<(), MasterError> {
        self.set_node_available(name, true).await
    }

    async fn set_node_available(&self, name: &str, available: bool) -> Result<(), MasterError> {
        let node_arc = {
            let state = self.state.lock().await;
            state.nodes.get(name).cloned()
        };
        let node_arc = node_arc.ok_or_else(|| MasterError::UnknownNode(name.to_string()))?;
        node_arc.lock().await.available = available;
        Ok(())
    }

    pub async fn print_pending(&self, verbosity: Verbosity) -> Vec<Job> {
        let state = self.state.lock().await;
        state.backlog.snapshot(verbosity)
    }

    /// Operator status query surface, one entry per currently connected
    /// node. `Verbosity::Omit` returns nodes with an empty `running` list;
    /// `Stripped` strips per-process settings; `Raw` includes them verbatim.
    /// `maxproc`/`freeslots`/`running` are only meaningful while the node is
    /// alive and are zeroed/emptied otherwise, per the last-known snapshot
    /// not being trustworthy capacity data for a node that's currently down.
    pub async fn status_as_dict(&self, verbosity: Verbosity) -> Vec<NodeStatusView> {
        let node_arcs: Vec<(String, Arc<Mutex<NodeSession>>)> = {
            let state = self.state.lock().await;
            state
                .nodes
                .iter()
                .map(|(name, node)| (name.clone(), node.clone()))
                .collect()
        };
        let mut views = Vec::with_capacity(node_arcs.len());
        for (name, node_arc) in node_arcs {
            let session = node_arc.lock().await;
            let running = if !session.alive {
                Vec::new()
            } else {
                match verbosity {
                    Verbosity::Omit => Vec::new(),
                    Verbosity::Stripped => session
                        .snapshot
                        .running
                        .iter()
                        .map(|p| ProcessDescriptor::builder().domain(p.domain.clone()).build())
                        .collect(),
                    Verbosity::Raw => session.snapshot.running.clone(),
                }
            };
            views.push(NodeStatusView {
                name,
                available: session.available,
                alive: session.alive,
                maxproc: if session.alive { session.snapshot.maxproc } else { 0 },
                freeslots: if session.alive { session.snapshot.freeslots() } else { 0 },
                running,
            });
        }
        views
    }

    pub async fn save(&self, writer: &mut impl std::io::Write, codec: &dyn BacklogCodec) -> anyhow::Result<()> {
        let state = self.state.lock().await;
        state.backlog.save(writer, codec)
    }

    pub async fn load(&self, reader: &mut impl std::io::Read, codec: &dyn BacklogCodec) -> anyhow::Result<()> {
        let mut state = self.state.lock().await;
        state.backlog.load(reader, codec)
    }

    /// Domain -> owning node, folded from every node's last-observed
    /// snapshot. A domain reported by more than one node is a bookkeeping
    /// anomaly; the last node visited wins, left unresolved per the design
    /// note on reconciliation.
    pub async fn running(&self) -> HashMap<String, String> {
        let node_arcs: Vec<(String, Arc<Mutex<NodeSession>>)> = {
            let state = self.state.lock().await;
            state
                .nodes
                .iter()
                .map(|(name, node)| (name.clone(), node.clone()))
                .collect()
        };
        let mut result = HashMap::new();
        for (name, node_arc) in node_arcs {
            let session = node_arc.lock().await;
            for proc in &session.snapshot.running {
                result.insert(proc.domain.clone(), name.clone());
            }
        }
        result
    }

    /// One poll cycle: refresh or reconnect every node, then reconcile the
    /// lost-job set.
    pub async fn poll_once(&self) {
        let names: Vec<String> = {
            let state = self.state.lock().await;
            state.nodes.keys().cloned().collect()
        };
        for name in names {
            self.poll_node(&name).await;
        }

        let observed: HashSet<String> = self.running().await.into_keys().collect();
        let mut state = self.state.lock().await;
        let lost = state.statistics.record_lost(&observed);
        if !lost.is_empty() {
            tracing::warn!(?lost, "domains observed missing from worker reports");
        }
    }

    async fn poll_node(&self, name: &str) {
        let node_arc = {
            let state = self.state.lock().await;
            state.nodes.get(name).cloned()
        };
        let Some(node_arc) = node_arc else {
            return;
        };

        let outcome = {
            let mut session = node_arc.lock().await;
            if !session.alive {
                None
            } else {
                Some(session.refresh().await)
            }
        };

        match outcome {
            None => self.reconnect_node(name).await,
            Some(RefreshOutcome::CanPlace) => {
                let job = {
                    let mut state = self.state.lock().await;
                    state.backlog.pop_head()
                };
                if let Some(job) = job {
                    self.dispatch_to_node(name, &node_arc, job).await;
                }
            }
            Some(RefreshOutcome::NoPlacement) | Some(RefreshOutcome::Dead) => {}
        }
    }

    /// The pop-and-place rule from the node session contract: checks for an
    /// in-flight conflict, otherwise issues `run` and applies the
    /// callresponse (or transport failure) to the backlog and loading set.
    async fn dispatch_to_node(&self, name: &str, node_arc: &Arc<Mutex<NodeSession>>, job: Job) {
        let already_in_flight = {
            let state = self.state.lock().await;
            state.statistics.running.contains(&job.domain) || state.loading.contains(&job.domain)
        };
        if already_in_flight {
            let mut state = self.state.lock().await;
            let priority = job.priority;
            state.backlog.reinsert(job, priority);
            return;
        }

        {
            let mut state = self.state.lock().await;
            state.loading.insert(job.domain.clone());
        }

        let outcome = {
            let mut session = node_arc.lock().await;
            session.dispatch(&job.domain, &job.settings).await
        };

        let mut state = self.state.lock().await;
        match outcome {
            DispatchOutcome::Accepted => {}
            DispatchOutcome::NoFreeSlot => {
                state.loading.remove(&job.domain);
                let priority = clamp_priority(job.priority - 1);
                tracing::warn!(domain = %job.domain, node = %name, "rescheduled: no free slot on node");
                state.backlog.reinsert(job, priority);
            }
            DispatchOutcome::AlreadyRunningOnNode => {
                state.loading.remove(&job.domain);
                let priority = job.priority;
                tracing::warn!(domain = %job.domain, node = %name, "rescheduled: already running on node");
                state.backlog.reinsert(job, priority);
            }
            DispatchOutcome::Failed => {
                state.loading.remove(&job.domain);
                let priority = clamp_priority(job.priority - 1);
                tracing::error!(domain = %job.domain, node = %name, "rescheduled: lost connection to node");
                state.backlog.reinsert(job, priority);
            }
        }
    }

    /// Applies an unsolicited worker push.
    pub async fn handle_remote_update(
        &self,
        node_name: &str,
        snapshot: NodeSnapshot,
        domain: &str,
        domain_status: &str,
    ) {
        let node_arc = {
            let state = self.state.lock().await;
            state.nodes.get(node_name).cloned()
        };
        let Some(node_arc) = node_arc else {
            return;
        };
        let mut session = node_arc.lock().await;
        let mut state = self.state.lock().await;
        session.handle_remote_update(
            snapshot,
            domain,
            domain_status,
            &mut state.loading,
            &mut state.statistics,
        );
    }

    pub async fn statistics_snapshot(&self) -> Statistics {
        self.state.lock().await.statistics.clone()
    }

    pub async fn backlog_len(&self) -> usize {
        self.state.lock().await.backlog.len()
    }
}
