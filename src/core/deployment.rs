use crate::core::library::Library;
use crate::models::error::SError;
use crate::models::mod_dto::Mod;
use crate::utils::file::FileUtils;
use camino::Utf8Path;
use std::fs;
use tracing::{debug, warn};

#[derive(Debug, Default, Clone, PartialEq)]
pub struct DeployReport {
    pub moved: usize,
    /// Mods still dirty after this pass.
    pub pending: Vec<String>,
}

/// Renames every dirty mod's packages to their canonical names and directories.
///
/// Nothing is written while the library is read-only. A mod stays dirty until all of its files
/// are in place, so locked files are retried on the next pass.
pub fn sync_to_disk(library: &mut Library) -> DeployReport {
    let mut report = DeployReport::default();
    if library.is_read_only() {
        report.pending = dirty_ids(library);
        if !report.pending.is_empty() {
            debug!(pending = report.pending.len(), "read-only, deferring disk writes");
        }
        return report;
    }

    let Library {
        mods, paths, ..
    } = library;
    for m in mods.iter_mut().filter(|m| m.dirty) {
        match materialize(m, &paths.install, &paths.downloads) {
            Ok(moved) => {
                report.moved += moved;
                m.dirty = false;
            }
            Err(e) => {
                warn!(mod_id = %m.id(), "will retry: {e}");
                report.pending.push(m.id().to_string());
            }
        }
    }
    report
}

fn dirty_ids(library: &Library) -> Vec<String> {
    library
        .mods
        .iter()
        .filter(|m| m.dirty)
        .map(|m| m.id().to_string())
        .collect()
}

fn materialize(m: &mut Mod, install: &Utf8Path, downloads: &Utf8Path) -> Result<usize, SError> {
    let mut moved = 0;
    let mut failure = None;

    let versions: Vec<_> = m.disk_paths.keys().cloned().collect();
    for version in versions {
        let name = m.name_for(&version);
        let dir = if name.enabled() { install } else { downloads };
        let target = dir.join(name.file_name());
        let Some(current) = m.disk_paths.get(&version).cloned() else {
            continue;
        };
        if current == target {
            continue;
        }

        // an identical copy already sits at the target
        let result = if target.is_file() {
            fs::remove_file(&current).map_err(SError::from)
        } else {
            FileUtils::move_file(&current, &target)
        };

        match result {
            Ok(()) => {
                debug!(from = %current, to = %target, "moved package");
                m.disk_paths.insert(version, target);
                moved += 1;
            }
            Err(e) => failure = Some(SError::DiskWriteError(format!("{current} -> {target}: {e}"))),
        }
    }

    failure.map_or(Ok(moved), Err)
}
