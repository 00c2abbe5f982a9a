use std::collections::HashMap;

use serde::{Deserialize, Serialize};

/// Arbitrary scalar setting value (string, number, bool, or null).
pub type SettingValue = serde_json::Value;

/// Resolved effective settings for a domain: `group_settings(domain) ⊕
/// global_settings ⊕ settings_override`, later wins.
pub type JobSettings = HashMap<String, SettingValue>;

/// A pending backlog entry.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct Job {
    pub domain: String,
    pub settings: JobSettings,
    /// Lower value = higher priority.
    pub priority: i64,
}

impl Job {
    pub fn new(domain: impl Into<String>, settings: JobSettings, priority: i64) -> Self {
        Self {
            domain: domain.into(),
            settings,
            priority,
        }
    }
}

/// Composes effective settings the way `Backlog::enqueue` does: per-group
/// settings first, then global cluster settings, then the caller's override,
/// each layer overwriting keys from the one before it.
pub fn compose_settings(
    group_settings: JobSettings,
    global_settings: &JobSettings,
    settings_override: Option<&JobSettings>,
) -> JobSettings {
    let mut effective = group_settings;
    for (k, v) in global_settings {
        effective.insert(k.clone(), v.clone());
    }
    if let Some(overrides) = settings_override {
        for (k, v) in overrides {
            effective.insert(k.clone(), v.clone());
        }
    }
    effective
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn compose_settings_caller_override_wins() {
        let group = JobSettings::from([("retries".to_string(), json!(1))]);
        let global = JobSettings::from([("retries".to_string(), json!(2))]);
        let overrides = JobSettings::from([("retries".to_string(), json!(3))]);
        let effective = compose_settings(group, &global, Some(&overrides));
        assert_eq!(effective["retries"], json!(3));
    }

    #[test]
    fn compose_settings_global_wins_over_group_without_override() {
        let group = JobSettings::from([("retries".to_string(), json!(1))]);
        let global = JobSettings::from([("retries".to_string(), json!(2))]);
        let effective = compose_settings(group, &global, None);
        assert_eq!(effective["retries"], json!(2));
    }

    #[test]
    fn compose_settings_merges_disjoint_keys() {
        let group = JobSettings::from([("a".to_string(), json!(1))]);
        let global = JobSettings::from([("b".to_string(), json!(2))]);
        let overrides = JobSettings::from([("c".to_string(), json!(3))]);
        let effective = compose_settings(group, &global, Some(&overrides));
        assert_eq!(effective.len(), 3);
    }
}
