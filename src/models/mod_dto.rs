use crate::core::pak_name::{PakName, DISABLED_PRIORITY};
use crate::models::metadata::{Metadata, SyncMode};
use crate::models::version::ModVersion;
use camino::Utf8PathBuf;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug)]
pub struct Mod {
    pub current: Metadata,
    /// Every version seen on disk.
    pub all_versions: BTreeMap<ModVersion, Metadata>,
    /// Local and remote versions, newest first.
    pub available_versions: Vec<ModVersion>,
    pub installed_version: ModVersion,
    pub enabled: bool,
    pub priority: u32,
    pub dirty: bool,
    pub force_latest: bool,
    pub cannot_currently_update: bool,
    /// Where each local version currently sits on disk.
    #[serde(skip)]
    pub disk_paths: BTreeMap<ModVersion, Utf8PathBuf>,
}

impl Mod {
    /// A newly discovered mod starts disabled, parked at the sentinel priority.
    pub fn new(metadata: Metadata) -> Self {
        let version = metadata.version.clone();
        Self {
            current: metadata.clone(),
            all_versions: BTreeMap::from([(version.clone(), metadata)]),
            available_versions: vec![version.clone()],
            installed_version: version,
            enabled: false,
            priority: DISABLED_PRIORITY,
            dirty: false,
            force_latest: false,
            cannot_currently_update: false,
            disk_paths: BTreeMap::new(),
        }
    }

    pub fn id(&self) -> &str {
        &self.current.mod_id
    }

    pub fn sync(&self) -> SyncMode {
        self.current.sync
    }

    pub fn newest_local(&self) -> Option<&ModVersion> {
        self.all_versions.keys().next_back()
    }

    /// Canonical package name of the installed version.
    pub fn name_on_disk(&self) -> PakName {
        PakName {
            priority: if self.enabled {
                self.priority
            } else {
                DISABLED_PRIORITY
            },
            mod_id: self.id().to_string(),
            version: self.installed_version.clone(),
        }
    }

    /// Canonical package name for any local version of this mod.
    pub fn name_for(&self, version: &ModVersion) -> PakName {
        if version == &self.installed_version {
            return self.name_on_disk();
        }
        PakName {
            priority: DISABLED_PRIORITY,
            mod_id: self.id().to_string(),
            version: version.clone(),
        }
    }

    /// Points `current` at the installed version's metadata when it is known locally.
    pub fn refresh_current(&mut self) {
        if let Some(meta) = self.all_versions.get(&self.installed_version) {
            self.current = meta.clone();
        }
    }
}

/// Display fields for a single mod.
#[derive(Serialize, Clone, Debug)]
pub struct ModView {
    pub id: String,
    pub name: String,
    pub author: Option<String>,
    pub description: String,
    pub version: String,
    pub available_versions: Vec<String>,
    pub enabled: bool,
    pub priority: u32,
    pub sync: String,
    pub homepage: Option<String>,
    pub size: Option<String>,
    pub force_latest: bool,
}

#[derive(Clone, Debug, PartialEq)]
pub enum VersionChoice {
    /// Track the newest available version.
    Latest,
    Exact(ModVersion),
}

/// A pending edit from the presentation layer, applied in batches.
#[derive(Clone, Debug, PartialEq)]
pub struct ModEdit {
    pub mod_id: String,
    pub enabled: bool,
    pub version: VersionChoice,
}
