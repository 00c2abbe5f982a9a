use std::sync::Arc;

use crate::backlog::JobSettings;
use crate::statistics::Statistics;

use super::snapshot::{CallCode, NodeSnapshot};
use super::transport::RemotePeer;

/// What a node session learned from its own `refresh()` call: whether it is
/// worth trying to place a job on this node right now.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RefreshOutcome {
    /// Node is alive, available, and has at least one free slot.
    CanPlace,
    /// Node is alive but not eligible for a new placement this tick.
    NoPlacement,
    /// The node did not respond; it has been marked not-alive.
    Dead,
}

/// Outcome of issuing `run` on this node for one domain. Mirrors the worker
/// `callresponse` codes, plus the transport failure the session also has to
/// classify.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum DispatchOutcome {
    Accepted,
    NoFreeSlot,
    AlreadyRunningOnNode,
    Failed,
}

/// One per configured worker. Owns its own remote peer handle and the last
/// snapshot reported by that peer; does not hold a reference back to the
/// master (see the cyclic-reference design note).
pub struct NodeSession {
    pub name: String,
    /// Operator-controlled gate; suppresses new placements without
    /// disconnecting.
    pub available: bool,
    /// Derived from the latest remote interaction.
    pub alive: bool,
    pub snapshot: NodeSnapshot,
    peer: Arc<dyn RemotePeer>,
}

impl NodeSession {
    pub fn new(name: impl Into<String>, peer: Arc<dyn RemotePeer>) -> Self {
        Self {
            name: name.into(),
            available: true,
            alive: false,
            snapshot: NodeSnapshot::unknown(),
            peer,
        }
    }

    /// Requests a status snapshot and replaces the node's view of itself.
    pub async fn refresh(&mut self) -> RefreshOutcome {
        match self.peer.status().await {
            Ok(snapshot) => {
                self.alive = true;
                self.snapshot = snapshot;
                if self.available && self.snapshot.freeslots() > 0 {
                    RefreshOutcome::CanPlace
                } else {
                    RefreshOutcome::NoPlacement
                }
            }
            Err(_) => {
                self.alive = false;
                tracing::error!(node = %self.name, "lost connection to node");
                RefreshOutcome::Dead
            }
        }
    }

    /// Issues the remote `run` call for a single domain and classifies the
    /// response. Does not touch the backlog or the loading set: the caller
    /// (the cluster master, which owns those) applies the outcome.
    pub async fn dispatch(&mut self, domain: &str, settings: &JobSettings) -> DispatchOutcome {
        match self.peer.run(domain, settings).await {
            Ok((snapshot, response)) => {
                self.alive = true;
                self.snapshot = snapshot;
                match response.code {
                    CallCode::Accepted => DispatchOutcome::Accepted,
                    CallCode::NoFreeSlot => DispatchOutcome::NoFreeSlot,
                    CallCode::AlreadyRunning => DispatchOutcome::AlreadyRunningOnNode,
                }
            }
            Err(_) => {
                self.alive = false;
                tracing::error!(node = %self.name, %domain, "lost connection to node while dispatching");
                DispatchOutcome::Failed
            }
        }
    }

    /// Issues the remote `stop` call; the response refreshes the snapshot.
    pub async fn stop(&mut self, domain: &str) {
        match self.peer.stop(domain).await {
            Ok(snapshot) => {
                self.alive = true;
                self.snapshot = snapshot;
            }
            Err(_) => {
                self.alive = false;
                tracing::error!(node = %self.name, %domain, "lost connection to node while stopping");
            }
        }
    }

    /// Applies an unsolicited worker push. Pure bookkeeping, no remote I/O,
    /// safe to call while the master's state mutex is held.
    pub fn handle_remote_update(
        &mut self,
        snapshot: NodeSnapshot,
        domain: &str,
        domain_status: &str,
        loading: &mut std::collections::HashSet<String>,
        statistics: &mut Statistics,
    ) {
        self.snapshot = snapshot;
        self.alive = true;
        match domain_status {
            "running" if loading.remove(domain) => {
                statistics.running.insert(domain.to_string());
            }
            "scraped" => {
                statistics.running.remove(domain);
                *statistics.scraped.entry(domain.to_string()).or_insert(0) += 1;
                statistics.scraped_count += 1;
                statistics.lost.remove(domain);
            }
            _ => {}
        }
    }
}
