use crate::core::mod_stager::StagingGuard;
use crate::core::remote::IndexSource;
use crate::models::error::SError;
use crate::models::index::{GlobalIndexFile, IndexVersionData};
use crate::models::version::ModVersion;
use crate::utils::file::FileUtils;
use camino::{Utf8Path, Utf8PathBuf};
use tracing::info;

/// A downloaded package inside its own scratch directory, removed on drop.
pub struct StagedDownload {
    pub path: Utf8PathBuf,
    _scratch: StagingGuard,
}

pub fn lookup(
    global: &GlobalIndexFile,
    mod_id: &str,
    version: &ModVersion,
) -> Result<IndexVersionData, SError> {
    global
        .get(mod_id)
        .and_then(|entry| entry.all_versions.get(version))
        .cloned()
        .ok_or_else(|| SError::MissingIndexEntry(format!("{mod_id} {version}")))
}

pub fn fetch(
    source: &dyn IndexSource,
    entry: &IndexVersionData,
    staging_root: &Utf8Path,
) -> Result<StagedDownload, SError> {
    let scratch = StagingGuard::create(staging_root)?;
    let path = scratch
        .path()
        .join(FileUtils::sanitize_filename(&entry.filename));

    source.download(&entry.url, &path).map_err(|e| match e {
        SError::DownloadError(_) => e,
        other => SError::DownloadError(other.to_string()),
    })?;

    info!(url = %entry.url, file = %path, "downloaded package");
    Ok(StagedDownload {
        path,
        _scratch: scratch,
    })
}
