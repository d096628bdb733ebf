use crate::core::decompression::Decompression;
use crate::core::index;
use crate::core::library::Library;
use crate::core::package;
use crate::core::pak_name::{PakName, DISABLED_PRIORITY};
use crate::models::error::SError;
use crate::models::metadata::Metadata;
use crate::models::mod_dto::Mod;
use crate::models::version::ModVersion;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::BTreeMap;
use tracing::{debug, info, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct ScanReport {
    pub added: Vec<String>,
    pub removed: Vec<String>,
    pub skipped: Vec<Utf8PathBuf>,
}

struct Observed {
    meta: Metadata,
    path: Utf8PathBuf,
    /// Load priority when the package sits in the install directory.
    installed_at: Option<u32>,
}

type Observations = BTreeMap<String, BTreeMap<ModVersion, Observed>>;

/// Rebuilds the library's view of local versions from both package directories.
///
/// Mods with pending edits keep their enabled state, priority and installed version; all other
/// mods adopt what is on disk, so external renames are picked up.
pub fn sync_from_disk(library: &mut Library) -> Result<ScanReport, SError> {
    let mut report = ScanReport::default();
    let mut seen = Observations::new();

    let dirs = [
        (library.paths.install.clone(), true),
        (library.paths.downloads.clone(), false),
    ];
    for (dir, installed) in dirs {
        observe_dir(&dir, installed, &mut seen, &mut report)?;
    }

    library.mods.retain(|m| {
        let keep = seen.contains_key(m.id()) || m.cannot_currently_update;
        if !keep {
            report.removed.push(m.id().to_string());
        }
        keep
    });

    for (id, versions) in seen {
        match library.position(&id) {
            Some(i) => {
                let Library {
                    mods, global_index, ..
                } = &mut *library;
                let m = &mut mods[i];
                merge_existing(m, versions);
                index::refresh_available(m, global_index);
            }
            None => {
                let Some(mut m) = create(versions) else {
                    continue;
                };
                m.force_latest = library.settings_for(&id).force_latest;
                index::refresh_available(&mut m, &library.global_index);
                report.added.push(id);
                library.mods.push(m);
            }
        }
    }

    library.sort_mods();
    library.refresh_priorities();

    if !report.added.is_empty() || !report.removed.is_empty() {
        info!(
            added = report.added.len(),
            removed = report.removed.len(),
            skipped = report.skipped.len(),
            "disk scan changed the library"
        );
    }
    Ok(report)
}

fn observe_dir(
    dir: &Utf8Path,
    installed: bool,
    seen: &mut Observations,
    report: &mut ScanReport,
) -> Result<(), SError> {
    if !dir.exists() {
        return Ok(());
    }

    for path in Decompression::find_packages(dir)? {
        let meta = match package::read_metadata(&path) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(%path, "skipping unreadable package: {e}");
                report.skipped.push(path);
                continue;
            }
        };

        let installed_at = installed.then(|| {
            path.file_name()
                .and_then(PakName::parse)
                .map(|n| n.priority)
                .filter(|p| *p < DISABLED_PRIORITY)
                .unwrap_or(meta.priority.max(1))
        });

        let versions = seen.entry(meta.mod_id.clone()).or_default();
        if let Some(first) = versions.get(&meta.version) {
            debug!(kept = %first.path, ignored = %path, "duplicate package version");
            continue;
        }
        versions.insert(
            meta.version.clone(),
            Observed {
                meta,
                path,
                installed_at,
            },
        );
    }
    Ok(())
}

/// The newest version found in the install directory, with its priority.
fn installed_observation(versions: &BTreeMap<ModVersion, Observed>) -> Option<(ModVersion, u32)> {
    versions
        .iter()
        .rev()
        .find_map(|(v, o)| o.installed_at.map(|p| (v.clone(), p)))
}

fn create(versions: BTreeMap<ModVersion, Observed>) -> Option<Mod> {
    let active = installed_observation(&versions);
    let (all_versions, disk_paths) = split(versions);

    let installed = active
        .as_ref()
        .map(|(v, _)| v.clone())
        .or_else(|| all_versions.keys().next_back().cloned())?;
    let mut m = Mod::new(all_versions.get(&installed)?.clone());
    if let Some((_, priority)) = active {
        m.enabled = true;
        m.priority = priority;
    }
    m.all_versions = all_versions;
    m.disk_paths = disk_paths;
    m.dirty = true;
    Some(m)
}

fn merge_existing(m: &mut Mod, versions: BTreeMap<ModVersion, Observed>) {
    let active = installed_observation(&versions);
    let (all_versions, disk_paths) = split(versions);
    m.all_versions = all_versions;
    m.disk_paths = disk_paths;

    if !m.dirty {
        match active {
            Some((version, priority)) => {
                if !m.enabled || m.priority != priority || m.installed_version != version {
                    debug!(mod_id = %m.id(), %version, priority, "adopting on-disk state");
                }
                m.enabled = true;
                m.priority = priority;
                m.installed_version = version;
            }
            None if m.enabled => {
                debug!(mod_id = %m.id(), "package left the install directory");
                m.enabled = false;
                m.priority = DISABLED_PRIORITY;
            }
            None => {}
        }
    }

    if !m.all_versions.contains_key(&m.installed_version) && !m.cannot_currently_update {
        if let Some(newest) = m.newest_local().cloned() {
            m.installed_version = newest;
            m.dirty = true;
        }
    }
    m.refresh_current();
}

fn split(
    versions: BTreeMap<ModVersion, Observed>,
) -> (
    BTreeMap<ModVersion, Metadata>,
    BTreeMap<ModVersion, Utf8PathBuf>,
) {
    let mut all = BTreeMap::new();
    let mut paths = BTreeMap::new();
    for (v, o) in versions {
        all.insert(v.clone(), o.meta);
        paths.insert(v, o.path);
    }
    (all, paths)
}
