use anyhow::{Context, Result};

use super::job::Job;

/// Pluggable serialization for the backlog state file. A binary format is
/// acceptable; human-readable is preferred for portability, hence the
/// default `JsonCodec`.
pub trait BacklogCodec: Send + Sync {
    fn encode(&self, jobs: &[Job]) -> Result<Vec<u8>>;
    fn decode(&self, bytes: &[u8]) -> Result<Vec<Job>>;
}

/// Default codec: the backlog sequence as pretty-printed JSON.
#[derive(Debug, Default, Clone, Copy)]
pub struct JsonCodec;

impl BacklogCodec for JsonCodec {
    fn encode(&self, jobs: &[Job]) -> Result<Vec<u8>> {
        serde_json::to_vec_pretty(jobs).context("failed to serialize backlog to JSON")
    }

    fn decode(&self, bytes: &[u8]) -> Result<Vec<Job>> {
        serde_json::from_slice(bytes).context("failed to deserialize backlog JSON")
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::backlog::job::JobSettings;

    #[test]
    fn json_codec_round_trips_empty_backlog() {
        let codec = JsonCodec;
        let encoded = codec.encode(&[]).unwrap();
        let decoded = codec.decode(&encoded).unwrap();
        assert!(decoded.is_empty());
    }

    #[test]
    fn json_codec_round_trips_jobs() {
        let codec = JsonCodec;
        let jobs = vec![
            Job::new("a", JobSettings::new(), 10),
            Job::new("b", JobSettings::new(), 20),
        ];
        let encoded = codec.encode(&jobs).unwrap();
        let decoded = codec.decode(&encoded).unwrap();
        assert_eq!(decoded, jobs);
    }

    #[test]
    fn json_codec_decode_rejects_garbage() {
        let codec = JsonCodec;
        assert!(codec.decode(b"not json").is_err());
    }
}
