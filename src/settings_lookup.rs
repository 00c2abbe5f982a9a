use crate::backlog::job::JobSettings;

/// Pluggable per-domain settings lookup (`domain → settings-map`). Default
/// is a constant empty mapping, used when group settings are disabled.
pub trait GroupSettingsLookup: Send + Sync {
    fn lookup(&self, domain: &str) -> JobSettings;
}

#[derive(Debug, Default, Clone, Copy)]
pub struct EmptyGroupSettings;

impl GroupSettingsLookup for EmptyGroupSettings {
    fn lookup(&self, _domain: &str) -> JobSettings {
        JobSettings::new()
    }
}
