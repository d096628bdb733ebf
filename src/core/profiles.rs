use crate::models::error::SError;
use crate::models::profile::{ModProfile, ProfileEntry};
use crate::utils::toml::Toml;
use camino::{Utf8Path, Utf8PathBuf};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use tracing::debug;

#[derive(Serialize, Deserialize, Default)]
struct ProfileFile {
    #[serde(default)]
    profiles: BTreeMap<String, BTreeMap<String, ProfileEntry>>,
}

/// Named profiles, persisted as one TOML document.
pub struct ProfileStore {
    path: Utf8PathBuf,
    profiles: BTreeMap<String, ModProfile>,
}

impl ProfileStore {
    pub fn load(path: &Utf8Path) -> Result<Self, SError> {
        let file: ProfileFile = Toml::read_or_default(path)?;
        Ok(Self {
            path: path.to_owned(),
            profiles: file
                .profiles
                .into_iter()
                .map(|(name, entries)| (name, ModProfile::from_entries(entries)))
                .collect(),
        })
    }

    pub fn save(&self) -> Result<(), SError> {
        let file = ProfileFile {
            profiles: self
                .profiles
                .iter()
                .map(|(name, p)| (name.clone(), p.to_entries()))
                .collect(),
        };
        Toml::write(&self.path, &file)?;
        debug!(count = self.profiles.len(), path = %self.path, "saved profiles");
        Ok(())
    }

    pub fn names(&self) -> Vec<String> {
        self.profiles.keys().cloned().collect()
    }

    pub fn get(&self, name: &str) -> Option<&ModProfile> {
        self.profiles.get(name)
    }

    /// Stores `profile` under `name`, replacing any previous profile of that name.
    pub fn insert(&mut self, name: &str, profile: ModProfile) {
        self.profiles.insert(name.to_string(), profile);
    }

    pub fn delete(&mut self, name: &str) -> bool {
        self.profiles.remove(name).is_some()
    }
}
