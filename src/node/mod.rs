//! One session per configured worker: remote calls, the last observed
//! snapshot, and the pop-and-place dispatch rule.

pub mod session;
pub mod snapshot;
pub mod transport;

pub use session::{DispatchOutcome, NodeSession, RefreshOutcome};
pub use snapshot::{CallCode, CallResponse, NodeSnapshot, NodeStatusView, ProcessDescriptor};
pub use transport::{PeerDialer, RemotePeer, TransportError, UnimplementedDialer};
