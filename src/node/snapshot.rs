use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use typed_builder::TypedBuilder;

use crate::backlog::JobSettings;

/// One running process on a worker, as reported in its status snapshot.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, TypedBuilder)]
#[builder(field_defaults(setter(into)))]
pub struct ProcessDescriptor {
    pub domain: String,
    #[builder(default)]
    pub settings: JobSettings,
}

/// Last observed state of a worker, replaced wholesale on each status call.
#[derive(Debug, Clone, Serialize, Deserialize, TypedBuilder)]
pub struct NodeSnapshot {
    #[builder(default)]
    pub running: Vec<ProcessDescriptor>,
    /// Only meaningful while the node is alive.
    #[builder(default)]
    pub maxproc: u32,
    #[builder(default, setter(strip_option))]
    pub starttime: Option<DateTime<Utc>>,
    #[builder(default, setter(strip_option))]
    pub timestamp: Option<DateTime<Utc>>,
    #[builder(default)]
    pub loadavg: [f64; 3],
    #[builder(default, setter(into))]
    pub logdir: String,
}

impl NodeSnapshot {
    /// Placeholder snapshot for a node that has never successfully reported.
    pub fn unknown() -> Self {
        Self::builder().build()
    }

    pub fn freeslots(&self) -> i64 {
        self.maxproc as i64 - self.running.len() as i64
    }
}

/// Outcome of a worker's `run` call: acceptance, slot exhaustion, or
/// duplication.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CallCode {
    Accepted,
    NoFreeSlot,
    AlreadyRunning,
}

impl CallCode {
    pub fn from_code(code: u8) -> Option<Self> {
        match code {
            0 => Some(CallCode::Accepted),
            1 => Some(CallCode::NoFreeSlot),
            2 => Some(CallCode::AlreadyRunning),
            _ => None,
        }
    }
}

#[derive(Debug, Clone)]
pub struct CallResponse {
    pub code: CallCode,
    pub detail: String,
}

/// One node's entry in the operator status query surface. `running` is
/// shaped by the requested `Verbosity` the same way `Backlog::snapshot` is:
/// omitted entirely, settings-stripped, or raw.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct NodeStatusView {
    pub name: String,
    pub available: bool,
    pub alive: bool,
    pub maxproc: u32,
    pub freeslots: i64,
    pub running: Vec<ProcessDescriptor>,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn freeslots_is_maxproc_minus_running_count() {
        let snapshot = NodeSnapshot::builder()
            .maxproc(3u32)
            .running(vec![ProcessDescriptor::builder().domain("a").build()])
            .build();
        assert_eq!(snapshot.freeslots(), 2);
    }

    #[test]
    fn unknown_snapshot_has_zero_freeslots() {
        assert_eq!(NodeSnapshot::unknown().freeslots(), 0);
    }

    #[test]
    fn call_code_from_code_maps_known_values() {
        assert_eq!(CallCode::from_code(0), Some(CallCode::Accepted));
        assert_eq!(CallCode::from_code(1), Some(CallCode::NoFreeSlot));
        assert_eq!(CallCode::from_code(2), Some(CallCode::AlreadyRunning));
        assert_eq!(CallCode::from_code(9), None);
    }
}
