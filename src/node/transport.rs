use async_trait::async_trait;
use thiserror::Error;

use crate::backlog::JobSettings;

use super::snapshot::{CallResponse, NodeSnapshot};

/// Failure mode of a remote call. The only distinction the node session
/// cares about is whether the peer is reachable at all; everything else is
/// folded into `Other` and treated the same way a dead peer is.
#[derive(Debug, Error)]
pub enum TransportError {
    #[error("peer is unreachable")]
    DeadPeer,
    #[error("remote call failed: {0}")]
    Other(#[from] anyhow::Error),
}

/// The remote contract consumed from a worker. The transport itself
/// (framing, dialing, reconnection) is an external collaborator; this trait
/// is the async request/response boundary the node session programs against.
#[async_trait]
pub trait RemotePeer: Send + Sync {
    async fn status(&self) -> Result<NodeSnapshot, TransportError>;
    async fn run(
        &self,
        domain: &str,
        settings: &JobSettings,
    ) -> Result<(NodeSnapshot, CallResponse), TransportError>;
    async fn stop(&self, domain: &str) -> Result<NodeSnapshot, TransportError>;
}

/// Dials a configured `host:port` into a live `RemotePeer`. The dialer is
/// the one piece of the excluded transport layer this crate must still call
/// out to in order to connect configured workers at startup and on
/// reconnect; a real implementation lives outside this crate's scope.
#[async_trait]
pub trait PeerDialer: Send + Sync {
    async fn connect(&self, hostport: &str) -> Result<std::sync::Arc<dyn RemotePeer>, TransportError>;
}

/// Stands in for a real transport binding. Always fails, so a master
/// configured without a supplied dialer logs connection failures instead of
/// panicking or silently pretending to be connected.
#[derive(Debug, Default, Clone, Copy)]
pub struct UnimplementedDialer;

#[async_trait]
impl PeerDialer for UnimplementedDialer {
    async fn connect(&self, _hostport: &str) -> Result<std::sync::Arc<dyn RemotePeer>, TransportError> {
        Err(TransportError::Other(anyhow::anyhow!(
            "no transport configured: supply a PeerDialer to connect to real workers"
        )))
    }
}

#[cfg(any(test, feature = "testing"))]
pub mod testing {
    use std::collections::VecDeque;
    use std::sync::Mutex;

    use super::*;
    use crate::node::snapshot::CallCode;

    /// Scripted, in-memory `RemotePeer` used throughout the test suite.
    /// Each call consumes one entry from its queue, in push order; an empty
    /// queue means "peer unreachable", matching a dead connection rather
    /// than panicking.
    pub struct MockPeer {
        status_queue: Mutex<VecDeque<Result<NodeSnapshot, ()>>>,
        run_queue: Mutex<VecDeque<Result<(NodeSnapshot, CallCode), ()>>>,
        stop_queue: Mutex<VecDeque<Result<NodeSnapshot, ()>>>,
    }

    impl MockPeer {
        pub fn new() -> Self {
            Self {
                status_queue: Mutex::new(VecDeque::new()),
                run_queue: Mutex::new(VecDeque::new()),
                stop_queue: Mutex::new(VecDeque::new()),
            }
        }

        pub fn push_status(&self, snapshot: NodeSnapshot) {
            self.status_queue.lock().unwrap().push_back(Ok(snapshot));
        }

        pub fn push_dead_status(&self) {
            self.status_queue.lock().unwrap().push_back(Err(()));
        }

        pub fn push_run(&self, snapshot: NodeSnapshot, code: CallCode) {
            self.run_queue.lock().unwrap().push_back(Ok((snapshot, code)));
        }

        pub fn push_run_failure(&self) {
            self.run_queue.lock().unwrap().push_back(Err(()));
        }

        pub fn push_stop(&self, snapshot: NodeSnapshot) {
            self.stop_queue.lock().unwrap().push_back(Ok(snapshot));
        }
    }

    impl Default for MockPeer {
        fn default() -> Self {
            Self::new()
        }
    }

    #[async_trait]
    impl RemotePeer for MockPeer {
        async fn status(&self) -> Result<NodeSnapshot, TransportError> {
            match self.status_queue.lock().unwrap().pop_front() {
                Some(Ok(snapshot)) => Ok(snapshot),
                _ => Err(TransportError::DeadPeer),
            }
        }

        async fn run(
            &self,
            domain: &str,
            _settings: &JobSettings,
        ) -> Result<(NodeSnapshot, CallResponse), TransportError> {
            match self.run_queue.lock().unwrap().pop_front() {
                Some(Ok((snapshot, code))) => Ok((
                    snapshot,
                    CallResponse {
                        code,
                        detail: domain.to_string(),
                    },
                )),
                _ => Err(TransportError::DeadPeer),
            }
        }

        async fn stop(&self, _domain: &str) -> Result<NodeSnapshot, TransportError> {
            match self.stop_queue.lock().unwrap().pop_front() {
                Some(Ok(snapshot)) => Ok(snapshot),
                _ => Err(TransportError::DeadPeer),
            }
        }
    }

    /// Hands out pre-registered peers by `host:port`, so scenario tests can
    /// script a fleet of `MockPeer`s without a real transport.
    #[derive(Default)]
    pub struct MockDialer {
        peers: std::sync::Mutex<std::collections::HashMap<String, std::sync::Arc<dyn RemotePeer>>>,
    }

    impl MockDialer {
        pub fn new() -> Self {
            Self {
                peers: std::sync::Mutex::new(std::collections::HashMap::new()),
            }
        }

        pub fn register(&self, hostport: impl Into<String>, peer: std::sync::Arc<dyn RemotePeer>) {
            self.peers.lock().unwrap().insert(hostport.into(), peer);
        }
    }

    #[async_trait]
    impl PeerDialer for MockDialer {
        async fn connect(&self, hostport: &str) -> Result<std::sync::Arc<dyn RemotePeer>, TransportError> {
            self.peers
                .lock()
                .unwrap()
                .get(hostport)
                .cloned()
                .ok_or(TransportError::DeadPeer)
        }
    }
}
