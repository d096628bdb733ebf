use crate::core::deployment::{self, DeployReport};
use crate::core::index;
use crate::core::library::Library;
use crate::core::pak_name::DISABLED_PRIORITY;
use crate::models::error::SError;
use crate::models::metadata::Metadata;
use crate::models::mod_dto::Mod;
use crate::models::profile::ModProfile;
use crate::models::version::ModVersion;
use camino::Utf8Path;
use tracing::{debug, info, warn};

/// Records one package version found at `path`. Returns the mod id.
///
/// Unknown mods are created disabled. Does not check the read-only flag, the disk reconciler
/// calls this while the game runs.
pub fn add_or_update(library: &mut Library, metadata: Metadata, path: &Utf8Path) -> String {
    let id = metadata.mod_id.clone();
    let version = metadata.version.clone();

    match library.position(&id) {
        Some(i) => {
            let m = &mut library.mods[i];
            m.all_versions.insert(version.clone(), metadata);
            m.disk_paths.insert(version.clone(), path.to_owned());
            if !m.all_versions.contains_key(&m.installed_version) {
                m.installed_version = version;
                m.dirty = true;
            }
            m.refresh_current();
            index::refresh_available(m, &library.global_index);
        }
        None => {
            let mut m = Mod::new(metadata);
            m.disk_paths.insert(version, path.to_owned());
            m.force_latest = library.settings_for(&id).force_latest;
            m.dirty = true;
            index::refresh_available(&mut m, &library.global_index);
            debug!(mod_id = %id, "new mod");
            library.mods.push(m);
            library.sort_mods();
        }
    }
    id
}

pub fn set_enabled(library: &mut Library, id: &str, enabled: bool) -> Result<(), SError> {
    library.ensure_writable()?;
    let next = library.enabled_count() as u32 + 1;
    let m = library
        .find_mut(id)
        .ok_or_else(|| SError::ModNotFound(id.to_string()))?;
    if m.enabled == enabled {
        return Ok(());
    }

    m.enabled = enabled;
    m.priority = if enabled { next } else { DISABLED_PRIORITY };
    m.dirty = true;
    library.sort_mods();
    library.refresh_priorities();
    Ok(())
}

/// Moves a mod to `new_index` in the list and renumbers enabled mods densely.
pub fn reorder(library: &mut Library, id: &str, new_index: usize) -> Result<(), SError> {
    library.ensure_writable()?;
    let from = library
        .position(id)
        .ok_or_else(|| SError::ModNotFound(id.to_string()))?;

    let m = library.mods.remove(from);
    let to = new_index.min(library.mods.len());
    library.mods.insert(to, m);
    library.refresh_priorities();
    library.sort_mods();
    Ok(())
}

/// Switches to a version already on disk. `Ok(false)` when the version is not local.
pub fn switch_version(
    library: &mut Library,
    id: &str,
    version: &ModVersion,
) -> Result<bool, SError> {
    library.ensure_writable()?;
    let meta = library
        .find(id)
        .ok_or_else(|| SError::ModNotFound(id.to_string()))?
        .all_versions
        .get(version)
        .cloned();
    let Some(meta) = meta else {
        return Ok(false);
    };
    let force_off = library.should_auto_disable(&meta);

    if let Some(m) = library.find_mut(id) {
        if m.installed_version != *version {
            m.installed_version = version.clone();
            m.refresh_current();
            m.dirty = true;
        }
        if force_off && m.enabled {
            info!(mod_id = %id, %version, "disabling mod built for another game version");
            m.enabled = false;
            m.priority = DISABLED_PRIORITY;
            m.dirty = true;
        }
    }
    library.sort_mods();
    library.refresh_priorities();
    Ok(true)
}

/// Deletes every local version of a mod.
pub fn delete(library: &mut Library, id: &str) -> Result<(), SError> {
    library.ensure_writable()?;
    let i = library
        .position(id)
        .ok_or_else(|| SError::ModNotFound(id.to_string()))?;

    let paths = library.mods[i].disk_paths.clone();
    for (version, path) in paths {
        if path.exists() {
            std::fs::remove_file(&path)
                .map_err(|e| SError::DiskWriteError(format!("{path}: {e}")))?;
        }
        library.mods[i].disk_paths.remove(&version);
        library.mods[i].all_versions.remove(&version);
    }

    library.mods.remove(i);
    library.forget_settings(id);
    library.refresh_priorities();
    info!(mod_id = %id, "deleted mod");
    Ok(())
}

/// Moves force-latest mods onto their newest local version.
fn track_latest(library: &mut Library) {
    for m in library.mods.iter_mut().filter(|m| m.force_latest) {
        let Some(newest) = m.newest_local().cloned() else {
            continue;
        };
        if newest != m.installed_version {
            debug!(mod_id = %m.id(), %newest, "following latest version");
            m.installed_version = newest;
            m.refresh_current();
            m.dirty = true;
        }
    }
}

/// Recomputes derived state, writes pending changes to disk and notifies listeners.
pub fn full_update(library: &mut Library) -> DeployReport {
    track_latest(library);
    library.sort_mods();
    library.refresh_priorities();
    let report = deployment::sync_to_disk(library);
    if let Err(e) = library.persist_settings() {
        warn!("unable to save mod settings: {e}");
    }
    library.notify();
    report
}

pub fn generate_profile(library: &Library) -> ModProfile {
    ModProfile {
        mods: library
            .mods
            .iter()
            .map(|m| (m.id().to_string(), m.clone()))
            .collect(),
    }
}

/// Makes the live mods match `profile`. Mods missing from the profile are disabled.
pub fn apply_profile(library: &mut Library, profile: &ModProfile) -> Result<DeployReport, SError> {
    library.ensure_writable()?;

    for m in library.mods.iter_mut() {
        let (enabled, priority, force_latest, wanted) = match profile.mods.get(m.id()) {
            Some(p) => (
                p.enabled,
                p.priority,
                p.force_latest,
                Some(&p.installed_version),
            ),
            None => (false, DISABLED_PRIORITY, false, None),
        };

        let version = match wanted {
            Some(v) if m.all_versions.contains_key(v) => v.clone(),
            Some(v) if force_latest => m.newest_local().cloned().unwrap_or_else(|| v.clone()),
            Some(v) => {
                warn!(mod_id = %m.id(), version = %v, "profile version is not on disk");
                m.installed_version.clone()
            }
            None => m.installed_version.clone(),
        };
        let priority = if enabled { priority } else { DISABLED_PRIORITY };

        if m.enabled != enabled || m.priority != priority || m.installed_version != version {
            m.enabled = enabled;
            m.priority = priority;
            m.installed_version = version;
            m.refresh_current();
            m.dirty = true;
        }
        m.force_latest = force_latest;
    }

    library.sort_mods();
    Ok(full_update(library))
}
