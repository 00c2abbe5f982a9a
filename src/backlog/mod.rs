//! Priority-ordered backlog of pending jobs, persisted across restarts
//! through a pluggable codec.

pub mod codec;
pub mod job;
pub mod store;

pub use codec::{BacklogCodec, JsonCodec};
pub use job::{compose_settings, Job, JobSettings, SettingValue};
pub use store::{Backlog, Verbosity};
