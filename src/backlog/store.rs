use std::io::{Read, Write};
use std::sync::Arc;

use anyhow::Result;

use crate::settings_lookup::GroupSettingsLookup;

use super::codec::BacklogCodec;
use super::job::{compose_settings, Job, JobSettings};

/// Verbosity level for pending-queue snapshots, matching the operator
/// status query surface.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Verbosity {
    Omit,
    Stripped,
    Raw,
}

impl From<u8> for Verbosity {
    fn from(value: u8) -> Self {
        match value {
            0 => Verbosity::Omit,
            1 => Verbosity::Stripped,
            _ => Verbosity::Raw,
        }
    }
}

/// A persistent ordered list of pending jobs with stable-priority insertion.
///
/// Invariants enforced by every mutator: at most one entry per domain, and
/// priorities are non-decreasing left to right.
pub struct Backlog {
    entries: Vec<Job>,
    global_settings: JobSettings,
    group_lookup: Arc<dyn GroupSettingsLookup>,
}

impl Backlog {
    pub fn new(global_settings: JobSettings, group_lookup: Arc<dyn GroupSettingsLookup>) -> Self {
        Self {
            entries: Vec::new(),
            global_settings,
            group_lookup,
        }
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    fn position_of(&self, domain: &str) -> Option<usize> {
        self.entries.iter().position(|j| j.domain == domain)
    }

    /// Insertion point for a fresh entry at `priority`: after every existing
    /// job with priority <= this one, preserving arrival order among equals.
    fn insertion_index(&self, priority: i64) -> usize {
        self.entries
            .iter()
            .position(|j| j.priority > priority)
            .unwrap_or(self.entries.len())
    }

    /// For each domain: relocate to `priority` if strictly higher precedence
    /// than its current one, otherwise leave untouched; if absent, compose
    /// effective settings and insert per the stable-insertion rule.
    pub fn enqueue(
        &mut self,
        domains: &[String],
        settings_override: Option<&JobSettings>,
        priority: i64,
    ) {
        for domain in domains {
            match self.position_of(domain) {
                Some(idx) => {
                    if priority < self.entries[idx].priority {
                        let mut job = self.entries.remove(idx);
                        job.priority = priority;
                        let insert_at = self.insertion_index(priority);
                        self.entries.insert(insert_at, job);
                    }
                }
                None => {
                    let group_settings = self.group_lookup.lookup(domain);
                    let effective =
                        compose_settings(group_settings, &self.global_settings, settings_override);
                    let job = Job::new(domain.clone(), effective, priority);
                    let insert_at = self.insertion_index(priority);
                    self.entries.insert(insert_at, job);
                }
            }
        }
    }

    /// Deletes every entry for `domain`; zero matches is a no-op.
    pub fn remove(&mut self, domain: &str) {
        self.entries.retain(|j| j.domain != domain);
    }

    pub fn peek(&self) -> Option<&Job> {
        self.entries.first()
    }

    /// Removes and returns the current highest-priority job, if any.
    pub fn pop_head(&mut self) -> Option<Job> {
        if self.entries.is_empty() {
            None
        } else {
            Some(self.entries.remove(0))
        }
    }

    /// Reinserts a job that was popped but could not be placed, per the
    /// dispatch rule's reinsertion cases (same priority or priority - 1).
    pub fn reinsert(&mut self, mut job: Job, priority: i64) {
        job.priority = priority;
        let insert_at = self.insertion_index(priority);
        self.entries.insert(insert_at, job);
    }

    pub fn snapshot(&self, verbosity: Verbosity) -> Vec<Job> {
        match verbosity {
            Verbosity::Omit => Vec::new(),
            Verbosity::Stripped => self
                .entries
                .iter()
                .map(|j| Job::new(j.domain.clone(), JobSettings::new(), j.priority))
                .collect(),
            Verbosity::Raw => self.entries.clone(),
        }
    }

    pub fn save<W: Write>(&self, writer: &mut W, codec: &dyn BacklogCodec) -> Result<()> {
        let encoded = codec.encode(&self.entries)?;
        writer.write_all(&encoded)?;
        Ok(())
    }

    pub fn load<R: Read>(&mut self, reader: &mut R, codec: &dyn BacklogCodec) -> Result<()> {
        let mut bytes = Vec::new();
        reader.read_to_end(&mut bytes)?;
        self.entries = codec.decode(&bytes)?;
        Ok(())
    }
}
