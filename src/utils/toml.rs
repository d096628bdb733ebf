use crate::models::error::SError;
use camino::Utf8Path;

pub struct Toml;

impl Toml {
    pub fn write<T: serde::Serialize>(path: &Utf8Path, data: &T) -> Result<(), SError> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }
        toml::to_string(data)
            .map_err(|e| SError::ParseError(e.to_string()))
            .and_then(|t| std::fs::write(path, t).map_err(|e| SError::IOError(e.to_string())))
    }

    pub fn read<T: serde::de::DeserializeOwned>(path: &Utf8Path) -> Result<T, SError> {
        let s = std::fs::read_to_string(path).map_err(|e| SError::IOError(e.to_string()))?;
        toml::from_str::<T>(&s).map_err(|e| SError::ParseError(e.to_string()))
    }

    /// Reads `path`, or yields the default when the file has never been written.
    pub fn read_or_default<T: serde::de::DeserializeOwned + Default>(
        path: &Utf8Path,
    ) -> Result<T, SError> {
        if !path.exists() {
            return Ok(T::default());
        }
        Self::read(path)
    }
}
