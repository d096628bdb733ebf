use crate::models::error::SError;
use camino::Utf8Path;
use std::fs;

pub struct FileUtils;

impl FileUtils {
    /// Renames `src` to `dst`, falling back to copy + delete across volumes.
    pub fn move_file(src: &Utf8Path, dst: &Utf8Path) -> Result<(), SError> {
        if let Some(parent) = dst.parent() {
            fs::create_dir_all(parent)?;
        }
        if fs::rename(src, dst).is_ok() {
            return Ok(());
        }
        fs::copy(src, dst)?;
        fs::remove_file(src).map_err(|e| {
            // leave no half-moved duplicate behind
            let _ = fs::remove_file(dst);
            SError::from(e)
        })
    }

    /// Makes a remote-provided file name safe to create locally.
    pub fn sanitize_filename(name: &str) -> String {
        let cleaned: String = name
            .chars()
            .map(|c| match c {
                '<' | '>' | ':' | '"' | '/' | '\\' | '|' | '?' | '*' => '_',
                c if c.is_control() => '_',
                c => c,
            })
            .collect();
        let cleaned = cleaned.trim().trim_matches('.');
        if cleaned.is_empty() {
            "download.pak".to_string()
        } else {
            cleaned.to_string()
        }
    }

    pub fn file_size(path: &Utf8Path) -> Option<u64> {
        fs::metadata(path).ok().map(|m| m.len())
    }

    pub fn format_size(bytes: u64) -> String {
        const UNITS: [&str; 4] = ["B", "KB", "MB", "GB"];
        let mut size = bytes as f64;
        let mut unit = 0;
        while size >= 1024.0 && unit < UNITS.len() - 1 {
            size /= 1024.0;
            unit += 1;
        }
        if unit == 0 {
            format!("{bytes} B")
        } else {
            format!("{size:.1} {}", UNITS[unit])
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn sanitize_strips_path_separators() {
        assert_eq!(
            FileUtils::sanitize_filename("../evil/001-A-1_P.pak"),
            "_evil_001-A-1_P.pak"
        );
        assert_eq!(FileUtils::sanitize_filename("a:b?.pak"), "a_b_.pak");
        assert_eq!(FileUtils::sanitize_filename("  "), "download.pak");
    }

    #[test]
    fn formats_sizes() {
        assert_eq!(FileUtils::format_size(512), "512 B");
        assert_eq!(FileUtils::format_size(1536), "1.5 KB");
        assert_eq!(FileUtils::format_size(5 * 1024 * 1024), "5.0 MB");
    }
}
