use crate::core::library::Library;
use crate::core::remote::IndexSource;
use crate::models::error::SError;
use crate::models::index::{GlobalIndexFile, IndexFile};
use crate::models::metadata::SyncMode;
use crate::models::mod_dto::Mod;
use crate::models::version::ModVersion;
use std::collections::{BTreeSet, HashSet};
use tracing::debug;

/// Collects index files for a batch of mods, fetching each URL at most once.
///
/// Fetching happens without touching the library; `merge_into` applies the results in fetch
/// order so the last file fetched for a mod id wins.
pub struct IndexFetcher<'a> {
    source: &'a dyn IndexSource,
    known_urls: HashSet<String>,
    fetched: Vec<IndexFile>,
}

impl<'a> IndexFetcher<'a> {
    pub fn new(source: &'a dyn IndexSource) -> Self {
        Self {
            source,
            known_urls: HashSet::new(),
            fetched: Vec::new(),
        }
    }

    /// `Ok(false)` when the mod has no index, does not sync, or its URL was already fetched.
    pub fn fetch_and_merge(&mut self, sync: SyncMode, url: Option<&str>) -> Result<bool, SError> {
        let Some(url) = url.filter(|_| sync.is_client_synced()) else {
            return Ok(false);
        };
        if !self.known_urls.insert(url.to_string()) {
            return Ok(false);
        }

        let mut file = self.source.fetch_index(url)?;
        file.original_url = url.to_string();
        debug!(%url, mods = file.mods.len(), "fetched index file");
        self.fetched.push(file);
        Ok(true)
    }

    pub fn fetched(&self) -> usize {
        self.fetched.len()
    }

    pub fn merge_into(self, global: &mut GlobalIndexFile) {
        self.fetched.into_iter().for_each(|file| merge(global, file));
    }
}

/// Replaces the global entry of every mod listed in `file`.
pub fn merge(global: &mut GlobalIndexFile, file: IndexFile) {
    for (id, entry) in file.mods {
        global.insert(id, entry);
    }
}

/// Local versions plus whatever the index offers, newest first.
pub fn refresh_available(m: &mut Mod, global: &GlobalIndexFile) {
    let mut versions: BTreeSet<ModVersion> = m.all_versions.keys().cloned().collect();
    if let Some(entry) = global.get(m.id()) {
        versions.extend(entry.all_versions.keys().cloned());
    }
    m.available_versions = versions.into_iter().rev().collect();
}

pub fn update_available_versions(library: &mut Library) {
    let Library {
        mods, global_index, ..
    } = library;
    mods.iter_mut()
        .for_each(|m| refresh_available(m, global_index));
}
