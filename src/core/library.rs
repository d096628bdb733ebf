use crate::config::global::AppConfig;
use crate::core::pak_name::DISABLED_PRIORITY;
use crate::models::error::SError;
use crate::models::index::GlobalIndexFile;
use crate::models::metadata::{Metadata, SyncMode};
use crate::models::mod_dto::{Mod, ModView};
use crate::models::paths::StorePaths;
use crate::models::version::ModVersion;
use crate::utils::file::FileUtils;
use crate::utils::toml::Toml;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

/// Decides whether a mod built for `mod_build` runs on `installed`.
pub type BuildPredicate = Arc<dyn Fn(&ModVersion, &ModVersion) -> bool + Send + Sync>;
/// Called with the fresh mod list after every full update.
pub type UpdateListener = Arc<dyn Fn(&[ModView]) + Send + Sync>;

const DESCRIPTION_LIMIT: usize = 80;

pub struct LibraryOptions {
    pub installed_build: Option<ModVersion>,
    pub server_mode: bool,
    pub compatibility: BuildPredicate,
}

impl Default for LibraryOptions {
    fn default() -> Self {
        Self {
            installed_build: None,
            server_mode: false,
            compatibility: Arc::new(|installed, mod_build| mod_build.same_prefix(installed, 2)),
        }
    }
}

impl LibraryOptions {
    pub fn from_config(config: &AppConfig) -> Self {
        Self {
            installed_build: config.installed_build(),
            server_mode: config.server_mode,
            ..Self::default()
        }
    }
}

#[derive(Serialize, Deserialize, Clone, Debug, Default, PartialEq)]
pub struct ModSettings {
    #[serde(default)]
    pub force_latest: bool,
}

#[derive(Serialize, Deserialize, Default)]
struct SettingsFile {
    #[serde(default)]
    mods: BTreeMap<String, ModSettings>,
}

/// In-memory model of every mod the store knows about.
///
/// `mods` is kept in load order: enabled mods by priority, then disabled mods by id.
pub struct Library {
    pub paths: StorePaths,
    pub mods: Vec<Mod>,
    pub global_index: GlobalIndexFile,
    pub installed_build: Option<ModVersion>,
    pub server_mode: bool,
    compatibility: BuildPredicate,
    read_only: Arc<AtomicBool>,
    listeners: Vec<UpdateListener>,
    settings: BTreeMap<String, ModSettings>,
}

impl Library {
    pub fn open(paths: StorePaths, options: LibraryOptions) -> Result<Self, SError> {
        for dir in paths.dirs() {
            std::fs::create_dir_all(dir)?;
        }
        let settings: SettingsFile = Toml::read_or_default(&paths.settings)?;

        Ok(Self {
            paths,
            mods: Vec::new(),
            global_index: GlobalIndexFile::new(),
            installed_build: options.installed_build,
            server_mode: options.server_mode,
            compatibility: options.compatibility,
            read_only: Arc::new(AtomicBool::new(false)),
            listeners: Vec::new(),
            settings: settings.mods,
        })
    }

    pub fn read_only_flag(&self) -> Arc<AtomicBool> {
        self.read_only.clone()
    }

    pub fn is_read_only(&self) -> bool {
        self.read_only.load(Ordering::Acquire)
    }

    pub fn ensure_writable(&self) -> Result<(), SError> {
        if self.is_read_only() {
            return Err(SError::ReadOnly);
        }
        Ok(())
    }

    pub fn find(&self, id: &str) -> Option<&Mod> {
        self.mods.iter().find(|m| m.id() == id)
    }

    pub fn find_mut(&mut self, id: &str) -> Option<&mut Mod> {
        self.mods.iter_mut().find(|m| m.id() == id)
    }

    pub fn position(&self, id: &str) -> Option<usize> {
        self.mods.iter().position(|m| m.id() == id)
    }

    pub fn enabled_count(&self) -> usize {
        self.mods.iter().filter(|m| m.enabled).count()
    }

    pub fn is_compatible(&self, meta: &Metadata) -> bool {
        match (&self.installed_build, &meta.game_build) {
            (Some(installed), Some(built_for)) => (self.compatibility)(installed, built_for),
            _ => true,
        }
    }

    /// Whether automatic enabling must leave this version off.
    pub fn should_auto_disable(&self, meta: &Metadata) -> bool {
        let irrelevant_here = meta.sync == SyncMode::ServerOnly && !self.server_mode;
        !irrelevant_here && !self.is_compatible(meta)
    }

    pub fn sort_mods(&mut self) {
        self.mods.sort_by(|a, b| {
            a.priority
                .cmp(&b.priority)
                .then_with(|| a.id().cmp(b.id()))
        });
    }

    /// Renumbers enabled mods `1..N` in list order and parks disabled ones at the sentinel.
    pub fn refresh_priorities(&mut self) {
        let mut next = 1;
        for m in self.mods.iter_mut() {
            let priority = if m.enabled {
                let p = next;
                next += 1;
                p
            } else {
                DISABLED_PRIORITY
            };
            if m.priority != priority {
                m.priority = priority;
                m.dirty = true;
            }
        }
    }

    pub fn mark_all_dirty(&mut self) {
        self.mods.iter_mut().for_each(|m| m.dirty = true);
    }

    pub fn subscribe(&mut self, listener: UpdateListener) {
        self.listeners.push(listener);
    }

    pub(crate) fn notify(&self) {
        if self.listeners.is_empty() {
            return;
        }
        let views = self.views();
        self.listeners.iter().for_each(|l| l(&views));
    }

    pub fn settings_for(&self, id: &str) -> ModSettings {
        self.settings.get(id).cloned().unwrap_or_default()
    }

    /// Writes per-mod settings that file names cannot carry.
    pub fn persist_settings(&mut self) -> Result<(), SError> {
        let mut changed = false;
        for m in &self.mods {
            let wanted = ModSettings {
                force_latest: m.force_latest,
            };
            if self.settings.get(m.id()) != Some(&wanted) {
                self.settings.insert(m.id().to_string(), wanted);
                changed = true;
            }
        }
        if !changed {
            return Ok(());
        }
        Toml::write(
            &self.paths.settings,
            &SettingsFile {
                mods: self.settings.clone(),
            },
        )
    }

    pub(crate) fn forget_settings(&mut self, id: &str) {
        self.settings.remove(id);
    }

    pub fn views(&self) -> Vec<ModView> {
        self.mods.iter().map(view_of).collect()
    }
}

fn view_of(m: &Mod) -> ModView {
    let meta = &m.current;
    let description = meta.description.clone().unwrap_or_default();
    let description = if description.chars().count() > DESCRIPTION_LIMIT {
        let cut: String = description.chars().take(DESCRIPTION_LIMIT).collect();
        format!("{cut}...")
    } else {
        description
    };

    ModView {
        id: m.id().to_string(),
        name: meta.name.clone(),
        author: meta.author.clone(),
        description,
        version: m.installed_version.to_string(),
        available_versions: m.available_versions.iter().map(|v| v.to_string()).collect(),
        enabled: m.enabled,
        priority: m.priority,
        sync: meta.sync.to_string(),
        homepage: meta
            .homepage
            .clone()
            .filter(|h| h.starts_with("http://") || h.starts_with("https://")),
        size: m
            .disk_paths
            .get(&m.installed_version)
            .and_then(|p| FileUtils::file_size(p))
            .map(FileUtils::format_size),
        force_latest: m.force_latest,
    }
}
