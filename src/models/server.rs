use crate::models::metadata::SyncMode;
use crate::models::version::ModVersion;
use serde::{Deserialize, Serialize};

/// Placeholder name dedicated servers report until an owner renames them.
pub const DEFAULT_SERVER_NAME: &str = "Astroneer Dedicated Server";

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ServerMod {
    pub mod_id: String,
    #[serde(default)]
    pub name: Option<String>,
    pub version: ModVersion,
    #[serde(default)]
    pub sync: SyncMode,
    #[serde(default)]
    pub index_url: Option<String>,
}

#[derive(Serialize, Deserialize, Clone, Debug, PartialEq)]
pub struct ServerInfo {
    #[serde(default)]
    pub server_name: String,
    #[serde(default)]
    pub mods: Vec<ServerMod>,
}

impl ServerInfo {
    /// Name used for the synced profile; blank or placeholder names fall back to the address.
    pub fn display_name(&self, address: &str) -> String {
        let name = self.server_name.trim();
        if name.is_empty() || name == DEFAULT_SERVER_NAME {
            address.to_string()
        } else {
            name.to_string()
        }
    }
}
