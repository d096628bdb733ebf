use crate::core::index::{self, IndexFetcher};
use crate::core::mod_manager;
use crate::core::pak_name::DISABLED_PRIORITY;
use crate::core::registry::AppRegistry;
use crate::models::error::SError;
use crate::models::metadata::SyncMode;
use crate::models::profile::ModProfile;
use crate::models::server::ServerMod;
use std::sync::atomic::{AtomicBool, Ordering};
use tracing::{info, instrument, warn};

#[derive(Debug, Clone, PartialEq)]
pub struct SyncSummary {
    pub profile_name: String,
    pub failed_downloads: usize,
}

impl SyncSummary {
    pub fn message(&self) -> String {
        let failures = match self.failed_downloads {
            0 => "No mods failed to sync.".to_string(),
            n => format!("{n} mod(s) failed to sync."),
        };
        format!(
            "Added a new profile named \"{}\". {failures}",
            self.profile_name
        )
    }
}

/// Held for the whole sync; a second sync cannot start while it lives.
struct SyncFlight<'a>(&'a AtomicBool);

impl<'a> SyncFlight<'a> {
    fn begin(flag: &'a AtomicBool) -> Result<Self, SError> {
        flag.compare_exchange(false, true, Ordering::AcqRel, Ordering::Acquire)
            .map_err(|_| SError::SyncInProgress)?;
        Ok(Self(flag))
    }
}

impl Drop for SyncFlight<'_> {
    fn drop(&mut self) {
        self.0.store(false, Ordering::Release);
    }
}

impl AppRegistry {
    /// Builds and stores a profile matching the mods a server requires.
    ///
    /// Missing versions are downloaded into the live library. Individual download failures are
    /// counted, only an unreachable server aborts. The live load order is left untouched until
    /// the returned profile is loaded.
    #[instrument(skip(self))]
    pub fn sync_with_server(&self, address: &str) -> Result<SyncSummary, SError> {
        let _flight = SyncFlight::begin(&self.syncing)?;
        self.library.lock().ensure_writable()?;

        let server = self.directory.lookup(address)?.ok_or_else(|| {
            SError::ServerUnreachable(format!("failed to find an online server at {address}"))
        })?;
        info!(server = %server.server_name, mods = server.mods.len(), "found server");

        let (mut profile, ordering) = self.working_profile();

        let required: Vec<&ServerMod> = server
            .mods
            .iter()
            .filter(|m| m.sync.is_client_synced())
            .collect();
        self.fetch_indexes(&required, &profile);

        let mut failed = 0;
        let mut applied = Vec::new();
        for server_mod in required {
            if self.take_server_mod(server_mod, &mut profile) {
                applied.push(server_mod.mod_id.clone());
            } else {
                failed += 1;
            }
        }

        let ordering: Vec<String> = applied
            .iter()
            .cloned()
            .chain(ordering.into_iter().filter(|id| !applied.contains(id)))
            .collect();
        self.finish_profile(&mut profile, &ordering);

        let profile_name = format!("{} Synced Mods", server.display_name(address));
        {
            let mut store = self.profiles.lock();
            store.insert(&profile_name, profile);
            if let Err(e) = store.save() {
                warn!("unable to save profiles: {e}");
            }
        }

        let summary = SyncSummary {
            profile_name,
            failed_downloads: failed,
        };
        info!("{}", summary.message());
        Ok(summary)
    }

    /// Snapshot of the current mods with only client-only ones enabled, plus their load order.
    fn working_profile(&self) -> (ModProfile, Vec<String>) {
        let lib = self.library.lock();
        let mut profile = mod_manager::generate_profile(&lib);
        for m in profile.mods.values_mut() {
            m.enabled = m.sync() == SyncMode::ClientOnly;
        }
        let ordering = lib.mods.iter().map(|m| m.id().to_string()).collect();
        (profile, ordering)
    }

    fn fetch_indexes(&self, required: &[&ServerMod], profile: &ModProfile) {
        let mut fetcher = IndexFetcher::new(self.index_source.as_ref());
        for server_mod in required {
            let url = server_mod.index_url.clone().or_else(|| {
                profile
                    .mods
                    .get(&server_mod.mod_id)
                    .and_then(|m| m.current.index_url.clone())
            });
            if let Err(e) = fetcher.fetch_and_merge(server_mod.sync, url.as_deref()) {
                warn!(mod_id = %server_mod.mod_id, "index file unavailable: {e}");
            }
        }

        let mut lib = self.library.lock();
        fetcher.merge_into(&mut lib.global_index);
        index::update_available_versions(&mut lib);
    }

    /// Puts the server's version of a mod into `profile`, downloading it when needed.
    fn take_server_mod(&self, server_mod: &ServerMod, profile: &mut ModProfile) -> bool {
        let id = &server_mod.mod_id;
        let version = &server_mod.version;

        let local = self
            .library
            .lock()
            .find(id)
            .is_some_and(|m| m.all_versions.contains_key(version));
        if !local {
            if let Err(e) = self.resolve_version(id, version) {
                warn!(mod_id = %id, %version, "unable to download: {e}");
                return false;
            }
        }

        let lib = self.library.lock();
        let Some(live) = lib.find(id).filter(|m| m.all_versions.contains_key(version)) else {
            warn!(mod_id = %id, %version, "download did not provide the required version");
            return false;
        };

        let mut m = live.clone();
        m.installed_version = version.clone();
        m.refresh_current();
        m.enabled = true;
        m.force_latest = false;
        profile.mods.insert(id.clone(), m);
        true
    }

    fn finish_profile(&self, profile: &mut ModProfile, ordering: &[String]) {
        let lib = self.library.lock();
        for m in profile.mods.values_mut() {
            index::refresh_available(m, &lib.global_index);
        }

        let mut next = 1;
        for id in ordering {
            if let Some(m) = profile.mods.get_mut(id) {
                m.priority = if m.enabled {
                    let p = next;
                    next += 1;
                    p
                } else {
                    DISABLED_PRIORITY
                };
            }
        }
    }
}
