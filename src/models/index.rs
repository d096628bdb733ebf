use crate::models::version::ModVersion;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct IndexVersionData {
    #[serde(rename = "download_url")]
    pub url: String,
    pub filename: String,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct IndexModEntry {
    #[serde(default)]
    pub latest_version: Option<ModVersion>,
    #[serde(rename = "versions", default)]
    pub all_versions: BTreeMap<ModVersion, IndexVersionData>,
}

/// A remote manifest listing downloadable versions for one or more mods.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq, Default)]
pub struct IndexFile {
    #[serde(skip)]
    pub original_url: String,
    #[serde(default)]
    pub mods: BTreeMap<String, IndexModEntry>,
}

/// Every fetched index entry, keyed by mod id.
pub type GlobalIndexFile = BTreeMap<String, IndexModEntry>;
