use thiserror::Error;

/// Operator-facing errors: the small set of failures that cross the
/// `ClusterMaster` API boundary instead of being absorbed into scheduler
/// state transitions (dead peers, slot rejections, lost jobs, etc. never
/// appear here — they are handled internally per the node session contract).
#[derive(Debug, Error, PartialEq, Eq)]
pub enum MasterError {
    #[error("node '{0}' is not known to this master")]
    UnknownNode(String),
}
