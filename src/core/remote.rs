use crate::models::error::SError;
use crate::models::index::IndexFile;
use crate::models::server::ServerInfo;
use camino::Utf8Path;
use std::fs::File;
use std::io;
use std::time::Duration;
use tracing::debug;

const USER_AGENT: &str = concat!("pak_keeper/", env!("CARGO_PKG_VERSION"));

/// Where index files and package downloads come from.
pub trait IndexSource: Send + Sync {
    fn fetch_index(&self, url: &str) -> Result<IndexFile, SError>;
    fn download(&self, url: &str, dest: &Utf8Path) -> Result<(), SError>;
}

/// Looks up a server's public descriptor by address. `Ok(None)` when no such server is online.
pub trait ServerDirectory: Send + Sync {
    fn lookup(&self, address: &str) -> Result<Option<ServerInfo>, SError>;
}

pub struct HttpRemote {
    agent: ureq::Agent,
    directory_url: String,
}

impl HttpRemote {
    pub fn new(timeout: Duration, directory_url: impl Into<String>) -> Self {
        let agent = ureq::AgentBuilder::new()
            .timeout_connect(Duration::from_secs(5))
            .timeout_read(timeout)
            .build();
        Self {
            agent,
            directory_url: directory_url.into(),
        }
    }

    fn get(&self, url: &str) -> Result<ureq::Response, ureq::Error> {
        self.agent.get(url).set("User-Agent", USER_AGENT).call()
    }
}

impl IndexSource for HttpRemote {
    fn fetch_index(&self, url: &str) -> Result<IndexFile, SError> {
        let response = self
            .get(url)
            .map_err(|e| SError::DownloadError(format!("{url}: {e}")))?;
        let mut file: IndexFile = response
            .into_json()
            .map_err(|e| SError::ParseError(format!("index file {url}: {e}")))?;
        file.original_url = url.to_string();
        Ok(file)
    }

    fn download(&self, url: &str, dest: &Utf8Path) -> Result<(), SError> {
        let response = self
            .get(url)
            .map_err(|e| SError::DownloadError(format!("{url}: {e}")))?;
        let mut reader = response.into_reader();
        let mut out = File::create(dest)?;
        let bytes = io::copy(&mut reader, &mut out)
            .map_err(|e| SError::DownloadError(format!("{url}: {e}")))?;
        debug!(%url, %dest, bytes, "download complete");
        Ok(())
    }
}

impl ServerDirectory for HttpRemote {
    fn lookup(&self, address: &str) -> Result<Option<ServerInfo>, SError> {
        if self.directory_url.is_empty() {
            return Err(SError::ServerUnreachable(
                "no server directory configured".to_string(),
            ));
        }
        let url = format!(
            "{}/servers/{}",
            self.directory_url.trim_end_matches('/'),
            address.trim()
        );

        match self.get(&url) {
            Ok(response) => response
                .into_json::<ServerInfo>()
                .map(Some)
                .map_err(|e| SError::RemoteApiError(format!("{url}: {e}"))),
            Err(ureq::Error::Status(404, _)) => Ok(None),
            Err(ureq::Error::Status(code, _)) => Err(SError::RemoteApiError(format!(
                "{url} answered with status {code}"
            ))),
            Err(e) => Err(SError::ServerUnreachable(e.to_string())),
        }
    }
}
