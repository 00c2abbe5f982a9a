use std::collections::{HashMap, HashSet};

/// Process-wide aggregate of job lifecycle facts, folded in by node
/// sessions and the poll loop's lost-job detection.
#[derive(Debug, Default, Clone)]
pub struct Statistics {
    pub running: HashSet<String>,
    pub scraped: HashMap<String, u64>,
    pub lost: HashSet<String>,
    pub lost_count: HashMap<String, u64>,
    pub scraped_count: u64,
}

impl Statistics {
    /// Poll-loop step: domains believed running that no node currently
    /// reports. Bumps each domain's disappearance count and folds it into
    /// the lost set.
    pub fn record_lost(&mut self, observed_running: &HashSet<String>) -> HashSet<String> {
        let lost: HashSet<String> = self
            .running
            .difference(observed_running)
            .cloned()
            .collect();
        for domain in &lost {
            *self.lost_count.entry(domain.clone()).or_insert(0) += 1;
        }
        self.lost = self.lost.union(&lost).cloned().collect();
        lost
    }
}
