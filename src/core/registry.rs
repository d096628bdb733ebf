// src/core/registry.rs
use crate::config::global::AppConfig;
use crate::core::deployment::DeployReport;
use crate::core::download;
use crate::core::index::{self, IndexFetcher};
use crate::core::library::{Library, LibraryOptions, UpdateListener};
use crate::core::mod_manager;
use crate::core::mod_stager::{InstallReport, ModStager};
use crate::core::profiles::ProfileStore;
use crate::core::remote::{HttpRemote, IndexSource, ServerDirectory};
use crate::core::scanner::{self, ScanReport};
use crate::models::error::SError;
use crate::models::mod_dto::{ModEdit, ModView, VersionChoice};
use crate::models::version::ModVersion;
use camino::Utf8PathBuf;
use parking_lot::Mutex;
use std::sync::atomic::AtomicBool;
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, info, instrument, warn};

/// Shared handle to the mod library and its collaborators.
///
/// Every mutation takes the single library lock. Network transfers run with the lock released.
pub struct AppRegistry {
    pub(crate) library: Arc<Mutex<Library>>,
    pub(crate) profiles: Arc<Mutex<ProfileStore>>,
    pub(crate) index_source: Arc<dyn IndexSource>,
    pub(crate) directory: Arc<dyn ServerDirectory>,
    pub(crate) syncing: AtomicBool,
    pending: Mutex<PendingEdits>,
}

#[derive(Default)]
struct PendingEdits {
    edits: Vec<ModEdit>,
    last_queued: Option<Instant>,
}

/// Clears a mod's update marker when a version switch ends, however it ends.
struct UpdateLease<'a> {
    library: &'a Mutex<Library>,
    mod_id: &'a str,
}

impl Drop for UpdateLease<'_> {
    fn drop(&mut self) {
        if let Some(m) = self.library.lock().find_mut(self.mod_id) {
            m.cannot_currently_update = false;
        }
    }
}

impl AppRegistry {
    pub fn new(
        library: Library,
        profiles: ProfileStore,
        index_source: Arc<dyn IndexSource>,
        directory: Arc<dyn ServerDirectory>,
    ) -> Self {
        Self {
            library: Arc::new(Mutex::new(library)),
            profiles: Arc::new(Mutex::new(profiles)),
            index_source,
            directory,
            syncing: AtomicBool::new(false),
            pending: Mutex::new(PendingEdits::default()),
        }
    }

    /// Opens the store described by `config` with HTTP remotes.
    pub fn open(config: &AppConfig) -> Result<Self, SError> {
        let paths = config.store_paths();
        let profiles = ProfileStore::load(&paths.profiles)?;
        let library = Library::open(paths, LibraryOptions::from_config(config))?;
        let remote = Arc::new(HttpRemote::new(
            Duration::from_secs(config.http_timeout_secs),
            config.server_directory_url.clone(),
        ));
        Ok(Self::new(library, profiles, remote.clone(), remote))
    }

    pub fn library(&self) -> Arc<Mutex<Library>> {
        self.library.clone()
    }

    pub fn read_only_flag(&self) -> Arc<AtomicBool> {
        self.library.lock().read_only_flag()
    }

    pub fn is_read_only(&self) -> bool {
        self.library.lock().is_read_only()
    }

    pub fn mods(&self) -> Vec<ModView> {
        self.library.lock().views()
    }

    pub fn subscribe(&self, listener: UpdateListener) {
        self.library.lock().subscribe(listener);
    }

    /// Scans both package directories and writes back whatever the model still owes the disk.
    #[instrument(skip(self))]
    pub fn reconcile(&self) -> Result<ScanReport, SError> {
        let mut lib = self.library.lock();
        let report = scanner::sync_from_disk(&mut lib)?;
        mod_manager::full_update(&mut lib);
        Ok(report)
    }

    #[instrument(skip(self))]
    pub fn set_enabled(&self, mod_id: &str, enabled: bool) -> Result<DeployReport, SError> {
        let mut lib = self.library.lock();
        mod_manager::set_enabled(&mut lib, mod_id, enabled)?;
        Ok(mod_manager::full_update(&mut lib))
    }

    #[instrument(skip(self))]
    pub fn reorder(&self, mod_id: &str, new_index: usize) -> Result<DeployReport, SError> {
        let mut lib = self.library.lock();
        mod_manager::reorder(&mut lib, mod_id, new_index)?;
        Ok(mod_manager::full_update(&mut lib))
    }

    #[instrument(skip(self))]
    pub fn delete(&self, mod_id: &str) -> Result<(), SError> {
        let mut lib = self.library.lock();
        mod_manager::delete(&mut lib, mod_id)?;
        mod_manager::full_update(&mut lib);
        Ok(())
    }

    #[instrument(skip(self))]
    pub fn set_force_latest(&self, mod_id: &str, force_latest: bool) -> Result<(), SError> {
        let mut lib = self.library.lock();
        lib.ensure_writable()?;
        let m = lib
            .find_mut(mod_id)
            .ok_or_else(|| SError::ModNotFound(mod_id.to_string()))?;
        m.force_latest = force_latest;
        mod_manager::full_update(&mut lib);
        Ok(())
    }

    /// Installs packages or archives dropped from outside the store.
    #[instrument(skip(self))]
    pub fn install_paths(&self, inputs: &[Utf8PathBuf]) -> Result<InstallReport, SError> {
        let mut lib = self.library.lock();
        ModStager::install_paths(&mut lib, inputs)
    }

    /// Downloads `version` of a mod from its index entry and installs it, disabled.
    /// Returns the ids of the mods the download contained.
    #[instrument(skip(self))]
    pub fn resolve_version(
        &self,
        mod_id: &str,
        version: &ModVersion,
    ) -> Result<Vec<String>, SError> {
        let (entry, staging) = {
            let lib = self.library.lock();
            (
                download::lookup(&lib.global_index, mod_id, version)?,
                lib.paths.staging.clone(),
            )
        };

        let staged = download::fetch(self.index_source.as_ref(), &entry, &staging)?;

        let mut lib = self.library.lock();
        lib.ensure_writable()?;
        let mut report = InstallReport::default();
        ModStager::install_from_path(&mut lib, &staged.path, &mut report)?;
        if report.installed.is_empty() {
            return Err(SError::DownloadError(format!(
                "{} held no usable package",
                entry.filename
            )));
        }
        Ok(report.installed)
    }

    /// Makes `version` the installed version, downloading it first when it is not on disk.
    ///
    /// `Ok(false)` means the download failed and the previous version stays installed.
    #[instrument(skip(self))]
    pub fn switch_version(&self, mod_id: &str, version: &ModVersion) -> Result<bool, SError> {
        {
            let mut lib = self.library.lock();
            lib.ensure_writable()?;
            let m = lib
                .find_mut(mod_id)
                .ok_or_else(|| SError::ModNotFound(mod_id.to_string()))?;
            if m.cannot_currently_update {
                return Err(SError::UpdateInProgress(mod_id.to_string()));
            }
            // pinning anything but the newest version ends force-latest tracking
            if m.force_latest
                && m.available_versions.first() != Some(version)
                && m.newest_local() != Some(version)
            {
                m.force_latest = false;
            }
            if !m.all_versions.contains_key(version) {
                m.cannot_currently_update = true;
            } else {
                mod_manager::switch_version(&mut lib, mod_id, version)?;
                mod_manager::full_update(&mut lib);
                return Ok(true);
            }
        }

        let _lease = UpdateLease {
            library: &self.library,
            mod_id,
        };
        match self.resolve_version(mod_id, version) {
            Ok(_) => {}
            Err(e @ (SError::MissingIndexEntry(_) | SError::ReadOnly)) => return Err(e),
            Err(e) => {
                warn!(%mod_id, %version, "keeping current version: {e}");
                return Ok(false);
            }
        }

        let mut lib = self.library.lock();
        let switched = mod_manager::switch_version(&mut lib, mod_id, version)?;
        if switched {
            mod_manager::full_update(&mut lib);
        }
        Ok(switched)
    }

    /// Fetches every mod's index file, refreshes available versions and pulls the newest
    /// version of force-latest mods. Returns how many index files were fetched.
    #[instrument(skip(self))]
    pub fn refresh_index_files(&self) -> Result<usize, SError> {
        let targets: Vec<_> = {
            let lib = self.library.lock();
            lib.mods
                .iter()
                .map(|m| (m.sync(), m.current.index_url.clone()))
                .collect()
        };

        let mut fetcher = IndexFetcher::new(self.index_source.as_ref());
        for (sync, url) in &targets {
            if let Err(e) = fetcher.fetch_and_merge(*sync, url.as_deref()) {
                warn!(url = ?url, "index file unavailable: {e}");
            }
        }
        let fetched = fetcher.fetched();

        let outdated: Vec<(String, ModVersion)> = {
            let mut lib = self.library.lock();
            fetcher.merge_into(&mut lib.global_index);
            index::update_available_versions(&mut lib);
            if lib.is_read_only() {
                Vec::new()
            } else {
                lib.mods
                    .iter()
                    .filter(|m| m.force_latest && !m.cannot_currently_update)
                    .filter_map(|m| {
                        m.available_versions
                            .first()
                            .filter(|v| !m.all_versions.contains_key(*v))
                            .map(|v| (m.id().to_string(), v.clone()))
                    })
                    .collect()
            }
        };

        for (mod_id, version) in outdated {
            info!(%mod_id, %version, "updating to latest version");
            if let Err(e) = self.switch_version(&mod_id, &version) {
                warn!(%mod_id, %version, "update failed: {e}");
            }
        }
        Ok(fetched)
    }

    pub fn profile_names(&self) -> Vec<String> {
        self.profiles.lock().names()
    }

    pub fn save_current_as(&self, name: &str) -> Result<(), SError> {
        let profile = mod_manager::generate_profile(&self.library.lock());
        let mut store = self.profiles.lock();
        store.insert(name, profile);
        store.save()
    }

    pub fn delete_profile(&self, name: &str) -> Result<bool, SError> {
        let mut store = self.profiles.lock();
        let removed = store.delete(name);
        if removed {
            store.save()?;
        }
        Ok(removed)
    }

    /// Applies a stored profile, downloading versions it needs that are not on disk.
    #[instrument(skip(self))]
    pub fn load_profile(&self, name: &str) -> Result<DeployReport, SError> {
        let profile = self
            .profiles
            .lock()
            .get(name)
            .cloned()
            .ok_or_else(|| SError::ProfileNotFound(name.to_string()))?;

        let missing: Vec<(String, ModVersion)> = {
            let lib = self.library.lock();
            lib.ensure_writable()?;
            profile
                .mods
                .values()
                .filter(|p| {
                    lib.find(p.id())
                        .is_some_and(|m| !m.all_versions.contains_key(&p.installed_version))
                })
                .map(|p| (p.id().to_string(), p.installed_version.clone()))
                .collect()
        };
        for (mod_id, version) in missing {
            if let Err(e) = self.resolve_version(&mod_id, &version) {
                warn!(%mod_id, %version, "profile version unavailable: {e}");
            }
        }

        let mut lib = self.library.lock();
        mod_manager::apply_profile(&mut lib, &profile)
    }

    /// Queues an edit for the next debounced batch.
    pub fn queue_edit(&self, edit: ModEdit) {
        let mut pending = self.pending.lock();
        pending.edits.retain(|e| e.mod_id != edit.mod_id);
        pending.edits.push(edit);
        pending.last_queued = Some(Instant::now());
    }

    /// Whether edits are waiting and none arrived during the last `quiet` interval.
    pub fn edits_settled(&self, quiet: Duration) -> bool {
        let pending = self.pending.lock();
        !pending.edits.is_empty() && pending.last_queued.is_some_and(|t| t.elapsed() >= quiet)
    }

    /// Applies every queued edit, then writes the result to disk once.
    #[instrument(skip(self))]
    pub fn flush_edits(&self) -> Result<usize, SError> {
        if self.library.lock().is_read_only() {
            return Err(SError::ReadOnly);
        }
        let edits = std::mem::take(&mut self.pending.lock().edits);
        if edits.is_empty() {
            return Ok(0);
        }

        let mut applied = 0;
        for (i, edit) in edits.iter().enumerate() {
            let target = {
                let mut lib = self.library.lock();
                let Some(m) = lib.find_mut(&edit.mod_id) else {
                    debug!(mod_id = %edit.mod_id, "edit for unknown mod dropped");
                    continue;
                };
                if m.cannot_currently_update {
                    continue;
                }
                let target = match &edit.version {
                    VersionChoice::Latest => m.available_versions.first().cloned(),
                    VersionChoice::Exact(v) => Some(v.clone()),
                };
                match mod_manager::set_enabled(&mut lib, &edit.mod_id, edit.enabled) {
                    Ok(_) => {}
                    Err(SError::ReadOnly) => {
                        drop(lib);
                        self.requeue(&edits[i..]);
                        break;
                    }
                    Err(e) => {
                        warn!(mod_id = %edit.mod_id, "edit not applied: {e}");
                        continue;
                    }
                }
                if let Some(m) = lib.find_mut(&edit.mod_id) {
                    m.force_latest = edit.version == VersionChoice::Latest;
                }
                target
            };

            if let Some(version) = target {
                match self.switch_version(&edit.mod_id, &version) {
                    Ok(_) => {}
                    Err(SError::ReadOnly) => {
                        self.requeue(&edits[i..]);
                        break;
                    }
                    Err(e) => warn!(mod_id = %edit.mod_id, %version, "version change failed: {e}"),
                }
            }
            applied += 1;
        }

        mod_manager::full_update(&mut self.library.lock());
        Ok(applied)
    }

    /// Puts unapplied edits back ahead of anything queued since the flush started.
    fn requeue(&self, edits: &[ModEdit]) {
        let mut pending = self.pending.lock();
        let newer = std::mem::take(&mut pending.edits);
        pending.edits = edits
            .iter()
            .filter(|e| !newer.iter().any(|n| n.mod_id == e.mod_id))
            .cloned()
            .collect();
        pending.edits.extend(newer);
        pending.last_queued.get_or_insert_with(Instant::now);
        debug!(count = edits.len(), "edits requeued while read-only");
    }
}
