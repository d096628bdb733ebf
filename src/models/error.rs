use thiserror::Error;

#[derive(Error, Debug)]
pub enum SError {
    #[error("unable to parse: {0}")]
    ParseError(String),
    #[error("no index entry for {0}")]
    MissingIndexEntry(String),
    #[error("download failed: {0}")]
    DownloadError(String),
    #[error("unable to write to disk: {0}")]
    DiskWriteError(String),
    #[error("server unreachable: {0}")]
    ServerUnreachable(String),
    #[error("remote api error: {0}")]
    RemoteApiError(String),
    #[error("the game is running, mods cannot be changed")]
    ReadOnly,
    #[error("a server sync is already in progress")]
    SyncInProgress,
    #[error("{0} is already being updated")]
    UpdateInProgress(String),
    #[error("mod not found: {0}")]
    ModNotFound(String),
    #[error("profile not found: {0}")]
    ProfileNotFound(String),
    #[error("io error: {0}")]
    IOError(String),
    #[error("config error: {0}")]
    ConfigError(String),
}

impl From<std::io::Error> for SError {
    fn from(e: std::io::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<zip::result::ZipError> for SError {
    fn from(e: zip::result::ZipError) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<serde_json::Error> for SError {
    fn from(e: serde_json::Error) -> Self {
        SError::ParseError(e.to_string())
    }
}

impl From<walkdir::Error> for SError {
    fn from(e: walkdir::Error) -> Self {
        SError::IOError(e.to_string())
    }
}

impl From<confy::ConfyError> for SError {
    fn from(e: confy::ConfyError) -> Self {
        SError::ConfigError(e.to_string())
    }
}
