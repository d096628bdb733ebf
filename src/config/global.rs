// src/config/global.rs
use crate::models::error::SError;
use crate::models::paths::StorePaths;
use crate::models::version::ModVersion;
use camino::{Utf8Path, Utf8PathBuf};
use derive_more::Display;
use directories::ProjectDirs;
use serde::{Deserialize, Serialize};

const APP_NAME: &str = "pak_keeper";
const CONFIG_NAME: &str = "config";

#[derive(Serialize, Deserialize, Debug, Default, Clone, Copy, PartialEq, Eq, Display)]
pub enum Platform {
    #[default]
    Steam,
    Win10,
    Custom,
}

#[derive(Serialize, Deserialize, Debug, Clone)]
#[serde(default)]
pub struct AppConfig {
    pub launch_command: Option<String>,
    pub platform: Platform,
    /// Parent of the download directory. Falls back to the platform data dir.
    pub data_path: Option<Utf8PathBuf>,
    /// Parent of the install directory. Falls back to `data_path`.
    pub game_path: Option<Utf8PathBuf>,
    pub installed_build: Option<String>,
    pub server_mode: bool,
    pub server_directory_url: String,
    /// Executables whose presence switches the library to read-only.
    pub game_binaries: Vec<Utf8PathBuf>,
    pub reconcile_interval_secs: u64,
    pub index_refresh_secs: u64,
    pub read_only_poll_secs: u64,
    pub edit_debounce_ms: u64,
    pub http_timeout_secs: u64,
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            launch_command: None,
            platform: Platform::default(),
            data_path: None,
            game_path: None,
            installed_build: None,
            server_mode: false,
            server_directory_url: String::new(),
            game_binaries: vec!["Astro-Win64-Shipping.exe".into(), "AstroServer.exe".into()],
            reconcile_interval_secs: 30,
            index_refresh_secs: 600,
            read_only_poll_secs: 2,
            edit_debounce_ms: 500,
            http_timeout_secs: 20,
        }
    }
}

impl AppConfig {
    pub fn load_from(path: &Utf8Path) -> Result<Self, SError> {
        confy::load_path(path).map_err(Into::into)
    }

    pub fn store_to(&self, path: &Utf8Path) -> Result<(), SError> {
        confy::store_path(path, self).map_err(Into::into)
    }

    pub fn data_root(&self) -> Utf8PathBuf {
        self.data_path.clone().unwrap_or_else(default_data_root)
    }

    pub fn game_root(&self) -> Utf8PathBuf {
        self.game_path.clone().unwrap_or_else(|| self.data_root())
    }

    pub fn store_paths(&self) -> StorePaths {
        StorePaths::new(&self.data_root(), &self.game_root())
    }

    /// The configured build, ignoring values that do not parse.
    pub fn installed_build(&self) -> Option<ModVersion> {
        self.installed_build
            .as_deref()
            .and_then(|b| ModVersion::parse(b).ok())
    }
}

fn default_data_root() -> Utf8PathBuf {
    ProjectDirs::from("com", "martes", APP_NAME)
        .and_then(|dirs| Utf8PathBuf::from_path_buf(dirs.data_dir().to_path_buf()).ok())
        .unwrap_or_else(|| Utf8PathBuf::from("."))
}

pub fn load_config() -> AppConfig {
    confy::load(APP_NAME, CONFIG_NAME).unwrap_or_default()
}

pub fn save_config(config: &AppConfig) -> Result<(), SError> {
    confy::store(APP_NAME, CONFIG_NAME, config).map_err(Into::into)
}
