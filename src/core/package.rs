use crate::core::pak_name::{is_package, is_valid_mod_id, PakName};
use crate::models::error::SError;
use crate::models::metadata::{Metadata, PackageDescriptor};
use crate::models::version::ModVersion;
use camino::Utf8Path;
use std::fs::File;
use std::io::Read;

const DESCRIPTOR: &str = "metadata.json";

/// Reads a package's metadata.
///
/// Identity and version come from the embedded `metadata.json` when the package carries one,
/// otherwise from the canonical file name. A package offering neither is a `ParseError`.
pub fn read_metadata(path: &Utf8Path) -> Result<Metadata, SError> {
    let file_name = path
        .file_name()
        .ok_or_else(|| SError::ParseError(format!("no file name in {path}")))?;
    if !is_package(file_name) {
        return Err(SError::ParseError(format!("{file_name} is not a package")));
    }

    let from_name = PakName::parse(file_name);
    let descriptor = read_descriptor(path)?;
    merge(file_name, from_name, descriptor.unwrap_or_default())
}

/// `Ok(None)` for plain packages that are not zip containers or carry no descriptor.
fn read_descriptor(path: &Utf8Path) -> Result<Option<PackageDescriptor>, SError> {
    let file = File::open(path)?;
    let Ok(mut archive) = zip::ZipArchive::new(file) else {
        return Ok(None);
    };
    let Ok(mut entry) = archive.by_name(DESCRIPTOR) else {
        return Ok(None);
    };

    let mut raw = String::new();
    entry.read_to_string(&mut raw)?;
    serde_json::from_str(&raw)
        .map(Some)
        .map_err(|e| SError::ParseError(format!("{path}: {e}")))
}

fn merge(
    file_name: &str,
    from_name: Option<PakName>,
    d: PackageDescriptor,
) -> Result<Metadata, SError> {
    let mod_id = d
        .mod_id
        .clone()
        .or_else(|| from_name.as_ref().map(|n| n.mod_id.clone()))
        .ok_or_else(|| SError::ParseError(format!("cannot identify mod in {file_name}")))?;
    if !is_valid_mod_id(&mod_id) {
        return Err(SError::ParseError(format!(
            "{file_name} declares an invalid mod id {mod_id:?}"
        )));
    }

    let version = match d.version.as_deref() {
        Some(v) => ModVersion::parse(v)?,
        None => from_name
            .as_ref()
            .map(|n| n.version.clone())
            .ok_or_else(|| SError::ParseError(format!("no version for {file_name}")))?,
    };

    let game_build = d.game_build.as_deref().and_then(|b| ModVersion::parse(b).ok());
    let index_url = d
        .download
        .as_ref()
        .and_then(|dl| dl.index_url())
        .map(str::to_string);

    Ok(Metadata {
        name: d.name.unwrap_or_else(|| mod_id.clone()),
        mod_id,
        author: d.author,
        description: d.description,
        homepage: d.homepage,
        version,
        sync: d.sync.unwrap_or_default(),
        game_build,
        priority: d.priority.unwrap_or(0),
        dependencies: d.dependencies,
        index_url,
    })
}
