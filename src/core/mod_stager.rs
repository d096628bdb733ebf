use crate::core::decompression::Decompression;
use crate::core::library::Library;
use crate::core::mod_manager;
use crate::core::package;
use crate::core::pak_name::{is_package, is_valid_mod_id, PakName, DISABLED_PRIORITY};
use crate::models::error::SError;
use crate::models::metadata::SyncMode;
use camino::{Utf8Path, Utf8PathBuf};
use std::collections::{BTreeSet, HashSet};
use std::fs;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// A scratch directory removed when dropped, whatever happened inside it.
pub struct StagingGuard {
    path: Utf8PathBuf,
}

impl StagingGuard {
    pub fn create(staging_root: &Utf8Path) -> Result<Self, SError> {
        let path = staging_root.join(Uuid::new_v4().to_string());
        fs::create_dir_all(&path)?;
        Ok(Self { path })
    }

    pub fn path(&self) -> &Utf8Path {
        &self.path
    }
}

impl Drop for StagingGuard {
    fn drop(&mut self) {
        debug!("clean up for {}", self.path);
        if let Err(e) = fs::remove_dir_all(&self.path) {
            warn!(path = %self.path, "failed to remove scratch directory: {e}");
        }
    }
}

/// Tally of one install batch.
#[derive(Debug, Default, Clone, PartialEq)]
pub struct InstallReport {
    /// Ids of mods added or updated, in install order.
    pub installed: Vec<String>,
    pub was_folder: usize,
    pub invalid_extension: usize,
    pub client_only: usize,
    pub skipped: usize,
}

impl InstallReport {
    pub fn summary(&self) -> String {
        let mut lines = vec![format!("Installed {} mod(s).", self.installed.len())];
        if self.was_folder > 0 {
            lines.push(format!(
                "{} folder(s) ignored, drop the .pak or .zip files instead.",
                self.was_folder
            ));
        }
        if self.invalid_extension > 0 {
            lines.push(format!(
                "{} file(s) ignored, only .pak and .zip files can be installed.",
                self.invalid_extension
            ));
        }
        if self.client_only > 0 {
            lines.push(format!(
                "{} client-only mod(s) removed, they have no effect on a server.",
                self.client_only
            ));
        }
        if self.skipped > 0 {
            lines.push(format!("{} package(s) could not be read.", self.skipped));
        }
        lines.join("\n")
    }
}

pub struct ModStager;

impl ModStager {
    /// Installs a batch of files from outside the store and enables the newly added mods.
    pub fn install_paths(
        library: &mut Library,
        inputs: &[Utf8PathBuf],
    ) -> Result<InstallReport, SError> {
        library.ensure_writable()?;

        let known: HashSet<String> = library.mods.iter().map(|m| m.id().to_string()).collect();
        let mut report = InstallReport::default();
        for input in inputs {
            Self::install_from_path(library, input, &mut report)?;
        }

        let fresh: BTreeSet<&String> = report
            .installed
            .iter()
            .filter(|id| !known.contains(*id))
            .collect();
        for id in fresh {
            Self::auto_enable(library, id);
        }

        library.mark_all_dirty();
        library.sort_mods();
        mod_manager::full_update(library);
        info!("{}", report.summary().replace('\n', " "));
        Ok(report)
    }

    /// Copies a `.pak`, or every `.pak` inside a `.zip`, into the download directory.
    pub fn install_from_path(
        library: &mut Library,
        input: &Utf8Path,
        report: &mut InstallReport,
    ) -> Result<(), SError> {
        if input.is_dir() {
            report.was_folder += 1;
            return Ok(());
        }

        match input.extension().map(|e| e.to_ascii_lowercase()).as_deref() {
            Some("zip") => Self::install_archive(library, input, report),
            Some(_) if input.file_name().is_some_and(is_package) => {
                Self::install_package(library, input, report)
            }
            _ => {
                report.invalid_extension += 1;
                Ok(())
            }
        }
    }

    fn install_archive(
        library: &mut Library,
        archive: &Utf8Path,
        report: &mut InstallReport,
    ) -> Result<(), SError> {
        let scratch = StagingGuard::create(&library.paths.staging)?;
        let packages = match Decompression::extract_packages(archive, scratch.path()) {
            Ok(packages) => packages,
            Err(e) => {
                warn!(%archive, "unable to extract archive: {e}");
                report.skipped += 1;
                return Ok(());
            }
        };

        for package in packages {
            Self::install_package(library, &package, report)?;
        }
        Ok(())
    }

    fn install_package(
        library: &mut Library,
        source: &Utf8Path,
        report: &mut InstallReport,
    ) -> Result<(), SError> {
        let meta = match package::read_metadata(source) {
            Ok(meta) => meta,
            Err(e) => {
                warn!(%source, "skipping package: {e}");
                report.skipped += 1;
                return Ok(());
            }
        };

        if !is_valid_mod_id(&meta.mod_id) || meta.priority >= DISABLED_PRIORITY {
            debug!(%source, mod_id = %meta.mod_id, "no valid package name can be derived");
            report.skipped += 1;
            return Ok(());
        }

        let target = library
            .find(&meta.mod_id)
            .and_then(|m| m.disk_paths.get(&meta.version).cloned())
            .unwrap_or_else(|| {
                let name = PakName {
                    priority: DISABLED_PRIORITY,
                    mod_id: meta.mod_id.clone(),
                    version: meta.version.clone(),
                };
                library.paths.downloads.join(name.file_name())
            });

        if target.as_path() != source {
            if let Err(e) = fs::copy(source, &target) {
                warn!(%source, %target, "unable to copy package: {e}");
                report.skipped += 1;
                return Ok(());
            }
        }

        if library.server_mode && meta.sync == SyncMode::ClientOnly {
            if let Err(e) = fs::remove_file(&target) {
                warn!(%target, "unable to remove client-only package: {e}");
            }
            report.client_only += 1;
            return Ok(());
        }

        let id = mod_manager::add_or_update(library, meta, &target);
        report.installed.push(id);
        Ok(())
    }

    /// Newly seen mods come up enabled unless built for another game version.
    fn auto_enable(library: &mut Library, id: &str) {
        let Some(m) = library.find(id) else {
            return;
        };
        if m.enabled {
            return;
        }
        if library.should_auto_disable(&m.current) {
            info!(mod_id = %id, "leaving mod disabled, it targets another game build");
            return;
        }

        let hint = m.current.priority;
        let next = library.enabled_count() as u32 + 1;
        if let Some(m) = library.find_mut(id) {
            m.enabled = true;
            m.priority = if hint > 0 { hint } else { next };
            m.dirty = true;
        }
        library.sort_mods();
        library.refresh_priorities();
    }
}
