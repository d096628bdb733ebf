#![allow(dead_code)]

use camino::{Utf8Path, Utf8PathBuf};
use pak_keeper_lib::core::library::{Library, LibraryOptions};
use pak_keeper_lib::core::profiles::ProfileStore;
use pak_keeper_lib::core::registry::AppRegistry;
use pak_keeper_lib::core::remote::{IndexSource, ServerDirectory};
use pak_keeper_lib::models::error::SError;
use pak_keeper_lib::models::index::{IndexFile, IndexModEntry, IndexVersionData};
use pak_keeper_lib::models::server::ServerInfo;
use pak_keeper_lib::models::paths::StorePaths;
use pak_keeper_lib::models::version::ModVersion;
use serde_json::{json, Value};
use std::collections::BTreeMap;
use std::fs::{self, File};
use std::io::Write;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Barrier, OnceLock};
use tempfile::TempDir;
use zip::write::SimpleFileOptions;

/// Temporary data and game roots with every store directory created.
pub fn setup_store() -> (TempDir, StorePaths) {
    let tmp = tempfile::tempdir().unwrap();
    let root = Utf8PathBuf::from_path_buf(tmp.path().to_path_buf()).unwrap();
    let paths = StorePaths::new(&root.join("data"), &root.join("game"));
    for dir in paths.dirs() {
        fs::create_dir_all(dir).unwrap();
    }
    (tmp, paths)
}

pub fn open_library(paths: &StorePaths) -> Library {
    Library::open(paths.clone(), LibraryOptions::default()).unwrap()
}

pub fn open_registry(
    paths: &StorePaths,
    index: Arc<FakeIndex>,
    directory: Arc<dyn ServerDirectory>,
) -> AppRegistry {
    let profiles = ProfileStore::load(&paths.profiles).unwrap();
    AppRegistry::new(open_library(paths), profiles, index, directory)
}

/// Offline registry for a game reporting `build`.
pub fn registry_for_build(paths: &StorePaths, build: &str) -> AppRegistry {
    let options = LibraryOptions {
        installed_build: Some(v(build)),
        ..LibraryOptions::default()
    };
    let profiles = ProfileStore::load(&paths.profiles).unwrap();
    AppRegistry::new(
        Library::open(paths.clone(), options).unwrap(),
        profiles,
        Arc::new(FakeIndex::default()),
        Arc::new(FixedServer(None)),
    )
}

/// Registry without any remote content.
pub fn offline_registry(paths: &StorePaths) -> AppRegistry {
    open_registry(
        paths,
        Arc::new(FakeIndex::default()),
        Arc::new(FixedServer(None)),
    )
}

pub fn v(s: &str) -> ModVersion {
    ModVersion::parse(s).unwrap()
}

pub fn descriptor(mod_id: &str, version: &str, sync: &str) -> Value {
    json!({
        "mod_id": mod_id,
        "name": format!("{mod_id} Mod"),
        "author": "tester",
        "version": version,
        "sync": sync,
    })
}

/// Descriptor pointing at an index file.
pub fn indexed_descriptor(mod_id: &str, version: &str, sync: &str, index_url: &str) -> Value {
    let mut d = descriptor(mod_id, version, sync);
    d["download"] = json!({ "type": "index_file", "url": index_url });
    d
}

/// Writes a package carrying `metadata.json` at `path`.
pub fn write_pak_at(path: &Utf8Path, metadata: &Value) {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent).unwrap();
    }
    let mut writer = zip::ZipWriter::new(File::create(path).unwrap());
    writer
        .start_file("metadata.json", SimpleFileOptions::default())
        .unwrap();
    writer
        .write_all(serde_json::to_string(metadata).unwrap().as_bytes())
        .unwrap();
    writer
        .start_file("Astro/Content/Mod.uasset", SimpleFileOptions::default())
        .unwrap();
    writer.write_all(b"asset").unwrap();
    writer.finish().unwrap();
}

pub fn write_pak(dir: &Utf8Path, file_name: &str, metadata: &Value) -> Utf8PathBuf {
    let path = dir.join(file_name);
    write_pak_at(&path, metadata);
    path
}

/// A package without a descriptor, identified by its canonical name only.
pub fn write_plain_pak(dir: &Utf8Path, priority: u32, mod_id: &str, version: &str) -> Utf8PathBuf {
    let path = dir.join(format!("{priority:03}-{mod_id}-{version}_P.pak"));
    fs::write(&path, format!("{mod_id} {version}")).unwrap();
    path
}

pub fn pak_path(dir: &Utf8Path, priority: u32, mod_id: &str, version: &str) -> Utf8PathBuf {
    dir.join(format!("{priority:03}-{mod_id}-{version}_P.pak"))
}

pub fn file_names(dir: &Utf8Path) -> Vec<String> {
    let mut names: Vec<String> = fs::read_dir(dir)
        .unwrap()
        .map(|e| e.unwrap().file_name().to_string_lossy().into_owned())
        .collect();
    names.sort();
    names
}

/// In-memory index files and package downloads.
#[derive(Default)]
pub struct FakeIndex {
    pub indexes: BTreeMap<String, IndexFile>,
    /// Download URL to the descriptor of the package served there.
    pub packages: BTreeMap<String, Value>,
    pub index_fetches: AtomicUsize,
    pub downloads: AtomicUsize,
    /// Raised once a download has been written, as if the game started meanwhile.
    pub game_starts_during_download: OnceLock<Arc<AtomicBool>>,
}

impl FakeIndex {
    /// Lists `versions` of `mod_id` under `index_url`. Each version downloads from
    /// `https://dl.test/{mod_id}/{version}`.
    pub fn with_index(mut self, index_url: &str, mod_id: &str, versions: &[&str]) -> Self {
        let mut entry = IndexModEntry::default();
        for version in versions {
            entry.all_versions.insert(
                v(version),
                IndexVersionData {
                    url: download_url(mod_id, version),
                    filename: format!("{mod_id}-{version}_P.pak"),
                },
            );
        }
        entry.latest_version = entry.all_versions.keys().next_back().cloned();
        self.indexes
            .entry(index_url.to_string())
            .or_default()
            .mods
            .insert(mod_id.to_string(), entry);
        self
    }

    pub fn serving(mut self, mod_id: &str, version: &str, metadata: Value) -> Self {
        self.packages.insert(download_url(mod_id, version), metadata);
        self
    }
}

pub fn download_url(mod_id: &str, version: &str) -> String {
    format!("https://dl.test/{mod_id}/{version}")
}

impl IndexSource for FakeIndex {
    fn fetch_index(&self, url: &str) -> Result<IndexFile, SError> {
        self.index_fetches.fetch_add(1, Ordering::SeqCst);
        self.indexes
            .get(url)
            .cloned()
            .ok_or_else(|| SError::DownloadError(format!("{url}: 404")))
    }

    fn download(&self, url: &str, dest: &Utf8Path) -> Result<(), SError> {
        self.downloads.fetch_add(1, Ordering::SeqCst);
        let metadata = self
            .packages
            .get(url)
            .ok_or_else(|| SError::DownloadError(format!("{url}: 404")))?;
        write_pak_at(dest, metadata);
        if let Some(flag) = self.game_starts_during_download.get() {
            flag.store(true, Ordering::SeqCst);
        }
        Ok(())
    }
}

/// Always answers with the same server, or with none.
pub struct FixedServer(pub Option<ServerInfo>);

impl ServerDirectory for FixedServer {
    fn lookup(&self, _address: &str) -> Result<Option<ServerInfo>, SError> {
        Ok(self.0.clone())
    }
}

/// Parks inside `lookup` until the test releases it.
pub struct BlockingServer {
    pub entered: Arc<Barrier>,
    pub release: Arc<Barrier>,
}

impl ServerDirectory for BlockingServer {
    fn lookup(&self, _address: &str) -> Result<Option<ServerInfo>, SError> {
        self.entered.wait();
        self.release.wait();
        Ok(None)
    }
}
