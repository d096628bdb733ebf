use crate::core::pak_name::is_package;
use crate::models::error::SError;
use camino::{Utf8Path, Utf8PathBuf};
use std::fs::{self, File};
use std::io;
use tracing::warn;
use walkdir::WalkDir;

pub struct Decompression;

impl Decompression {
    /// Unpacks `archive_path` into `destination` and returns every package found inside,
    /// at any depth.
    pub fn extract_packages(
        archive_path: &Utf8Path,
        destination: &Utf8Path,
    ) -> Result<Vec<Utf8PathBuf>, SError> {
        let mut archive = zip::ZipArchive::new(File::open(archive_path)?)?;

        for i in 0..archive.len() {
            let mut entry = archive.by_index(i)?;

            // entries escaping the destination are dropped
            let Some(relative) = entry.enclosed_name() else {
                warn!(archive = %archive_path, name = entry.name(), "skipping unsafe entry");
                continue;
            };
            let output_path = destination.as_std_path().join(relative);

            if entry.is_dir() {
                fs::create_dir_all(&output_path)?;
                continue;
            }
            if let Some(parent) = output_path.parent() {
                fs::create_dir_all(parent)?;
            }
            io::copy(&mut entry, &mut File::create(&output_path)?)?;
        }

        Self::find_packages(destination)
    }

    pub fn find_packages(root: &Utf8Path) -> Result<Vec<Utf8PathBuf>, SError> {
        let mut found = Vec::new();
        for entry in WalkDir::new(root).sort_by_file_name() {
            let entry = entry?;
            if !entry.file_type().is_file() {
                continue;
            }
            let Some(path) = Utf8Path::from_path(entry.path()) else {
                warn!(path = ?entry.path(), "skipping non UTF-8 path");
                continue;
            };
            if path.file_name().is_some_and(is_package) {
                found.push(path.to_path_buf());
            }
        }
        Ok(found)
    }
}
