use crate::models::version::ModVersion;
use derive_more::Display;
use serde::{Deserialize, Serialize};

#[derive(Serialize, Deserialize, Clone, Copy, Debug, PartialEq, Eq, Hash, Default, Display)]
#[serde(rename_all = "snake_case")]
pub enum SyncMode {
    #[display("None")]
    None,
    #[serde(alias = "client")]
    #[display("Client only")]
    ClientOnly,
    #[serde(alias = "server")]
    #[display("Server only")]
    ServerOnly,
    #[serde(alias = "serverclient")]
    #[default]
    #[display("Server and client")]
    ServerAndClient,
}

impl SyncMode {
    /// Mods a client has to carry to join a server.
    pub fn is_client_synced(self) -> bool {
        matches!(self, SyncMode::ServerAndClient | SyncMode::ClientOnly)
    }
}

/// Parsed description of one package version. Never mutated after parsing.
#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct Metadata {
    pub mod_id: String,
    pub name: String,
    #[serde(default)]
    pub author: Option<String>,
    #[serde(default)]
    pub description: Option<String>,
    #[serde(default)]
    pub homepage: Option<String>,
    pub version: ModVersion,
    #[serde(default)]
    pub sync: SyncMode,
    #[serde(default)]
    pub game_build: Option<ModVersion>,
    #[serde(default)]
    pub priority: u32,
    #[serde(default)]
    pub dependencies: Vec<String>,
    #[serde(default)]
    pub index_url: Option<String>,
}

impl Metadata {
    /// Bare metadata for a mod known only by id and version.
    pub fn minimal(mod_id: &str, version: ModVersion) -> Self {
        Self {
            mod_id: mod_id.to_string(),
            name: mod_id.to_string(),
            author: None,
            description: None,
            homepage: None,
            version,
            sync: SyncMode::default(),
            game_build: None,
            priority: 0,
            dependencies: Vec::new(),
            index_url: None,
        }
    }
}

/// `metadata.json` as packaged inside a mod. Every field is optional.
#[derive(Deserialize, Debug, Default)]
pub struct PackageDescriptor {
    pub mod_id: Option<String>,
    pub name: Option<String>,
    pub author: Option<String>,
    pub description: Option<String>,
    pub homepage: Option<String>,
    pub version: Option<String>,
    pub sync: Option<SyncMode>,
    #[serde(alias = "astro_build")]
    pub game_build: Option<String>,
    pub priority: Option<u32>,
    #[serde(default)]
    pub dependencies: Vec<String>,
    pub download: Option<DownloadInfo>,
}

#[derive(Deserialize, Debug)]
pub struct DownloadInfo {
    #[serde(rename = "type")]
    pub kind: String,
    pub url: Option<String>,
}

impl DownloadInfo {
    pub fn index_url(&self) -> Option<&str> {
        (self.kind == "index_file").then_some(self.url.as_deref()).flatten()
    }
}
