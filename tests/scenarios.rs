//! End-to-end scenarios exercised entirely through the public API, using the
//! in-memory transport double (the dev-dependency on this crate with
//! `testing` enabled makes the double visible here).

use std::collections::HashMap;
use std::sync::Arc;

use cluster_master::backlog::{JobSettings, Verbosity};
use cluster_master::node::snapshot::{CallCode, ProcessDescriptor};
use cluster_master::node::transport::testing::{MockDialer, MockPeer};
use cluster_master::node::{NodeSnapshot, PeerDialer, RemotePeer};
use cluster_master::settings_lookup::EmptyGroupSettings;
use cluster_master::ClusterMaster;

fn snapshot(maxproc: u32, running: &[&str]) -> NodeSnapshot {
    NodeSnapshot::builder()
        .maxproc(maxproc)
        .running(
            running
                .iter()
                .map(|d| ProcessDescriptor::builder().domain(*d).build())
                .collect::<Vec<_>>(),
        )
        .build()
}

fn domains(names: &[&str]) -> Vec<String> {
    names.iter().map(|s| s.to_string()).collect()
}

#[tokio::test]
async fn schedule_backlog_is_queryable_before_any_node_connects() {
    let dialer: Arc<dyn PeerDialer> = Arc::new(MockDialer::new());
    let master = ClusterMaster::new(
        20,
        JobSettings::new(),
        Arc::new(EmptyGroupSettings),
        HashMap::new(),
        dialer,
    );

    master
        .schedule(&domains(&["example.com"]), None, None)
        .await;

    let pending = master.print_pending(Verbosity::Stripped).await;
    assert_eq!(pending.len(), 1);
    assert_eq!(pending[0].domain, "example.com");
    assert!(pending[0].settings.is_empty());
}

#[tokio::test]
async fn run_accepted_then_remote_update_running_moves_to_statistics() {
    let dialer = Arc::new(MockDialer::new());
    let peer = Arc::new(MockPeer::new());
    dialer.register("w1:1", peer.clone() as Arc<dyn RemotePeer>);
    peer.push_status(snapshot(1, &[])); // registration refresh

    let master = ClusterMaster::new(
        20,
        JobSettings::new(),
        Arc::new(EmptyGroupSettings),
        HashMap::from([("w1".to_string(), "w1:1".to_string())]),
        dialer,
    );
    master.connect_all().await;
    master.schedule(&domains(&["a"]), None, None).await;

    peer.push_status(snapshot(1, &[]));
    peer.push_run(snapshot(1, &["a"]), CallCode::Accepted);
    master.poll_once().await;
    assert_eq!(master.backlog_len().await, 0);

    master
        .handle_remote_update("w1", snapshot(1, &["a"]), "a", "running")
        .await;
    let stats = master.statistics_snapshot().await;
    assert!(stats.running.contains("a"));

    master
        .handle_remote_update("w1", snapshot(1, &[]), "a", "scraped")
        .await;
    let stats = master.statistics_snapshot().await;
    assert!(!stats.running.contains("a"));
    assert_eq!(stats.scraped_count, 1);
}

#[tokio::test]
async fn disabling_a_node_surfaces_unknown_node_error_for_typos() {
    let dialer: Arc<dyn PeerDialer> = Arc::new(MockDialer::new());
    let master = ClusterMaster::new(
        20,
        JobSettings::new(),
        Arc::new(EmptyGroupSettings),
        HashMap::new(),
        dialer,
    );

    let err = master.disable_node("typo-node").await.unwrap_err();
    assert_eq!(err.to_string(), "node 'typo-node' is not known to this master");
}
