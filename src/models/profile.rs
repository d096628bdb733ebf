use crate::models::metadata::Metadata;
use crate::models::mod_dto::Mod;
use crate::models::version::ModVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

/// A named snapshot of every mod's state. Entries are owned clones, never live registry mods.
#[derive(Clone, Debug, Default)]
pub struct ModProfile {
    pub mods: BTreeMap<String, Mod>,
}

/// What a profile persists per mod.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ProfileEntry {
    pub version: ModVersion,
    pub enabled: bool,
    pub priority: u32,
    #[serde(default)]
    pub force_latest: bool,
}

impl From<&Mod> for ProfileEntry {
    fn from(m: &Mod) -> Self {
        Self {
            version: m.installed_version.clone(),
            enabled: m.enabled,
            priority: m.priority,
            force_latest: m.force_latest,
        }
    }
}

impl ProfileEntry {
    /// Rebuilds a detached mod from a stored entry. Only the state fields carry meaning.
    pub fn into_mod(self, mod_id: &str) -> Mod {
        let mut m = Mod::new(Metadata::minimal(mod_id, self.version));
        m.enabled = self.enabled;
        m.priority = self.priority;
        m.force_latest = self.force_latest;
        m
    }
}

impl ModProfile {
    pub fn to_entries(&self) -> BTreeMap<String, ProfileEntry> {
        self.mods
            .iter()
            .map(|(id, m)| (id.clone(), ProfileEntry::from(m)))
            .collect()
    }

    pub fn from_entries(entries: BTreeMap<String, ProfileEntry>) -> Self {
        Self {
            mods: entries
                .into_iter()
                .map(|(id, entry)| {
                    let m = entry.into_mod(&id);
                    (id, m)
                })
                .collect(),
        }
    }
}
