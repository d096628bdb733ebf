use crate::models::version::ModVersion;
use regex::Regex;
use std::fmt;
use std::sync::OnceLock;

/// Priority parked on every disabled package.
pub const DISABLED_PRIORITY: u32 = 999;

/// The canonical package file name, `{priority:03}-{mod_id}-{version}_P.pak`.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct PakName {
    pub priority: u32,
    pub mod_id: String,
    pub version: ModVersion,
}

fn grammar() -> Option<&'static Regex> {
    static RE: OnceLock<Option<Regex>> = OnceLock::new();
    RE.get_or_init(|| Regex::new(r"(?i)^(\d+)-([A-Za-z0-9]+)-([0-9][0-9A-Za-z.]*)_P\.pak$").ok())
        .as_ref()
}

pub fn is_valid_mod_id(id: &str) -> bool {
    !id.is_empty() && id.chars().all(|c| c.is_ascii_alphanumeric())
}

pub fn is_package(name: &str) -> bool {
    name.to_ascii_lowercase().ends_with(".pak")
}

impl PakName {
    pub fn parse(file_name: &str) -> Option<Self> {
        let caps = grammar()?.captures(file_name)?;
        Some(Self {
            priority: caps[1].parse().ok()?,
            mod_id: caps[2].to_string(),
            version: ModVersion::parse(&caps[3]).ok()?,
        })
    }

    pub fn enabled(&self) -> bool {
        self.priority < DISABLED_PRIORITY
    }

    pub fn is_valid(&self) -> bool {
        is_valid_mod_id(&self.mod_id)
    }

    pub fn file_name(&self) -> String {
        self.to_string()
    }
}

impl fmt::Display for PakName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:03}-{}-{}_P.pak", self.priority, self.mod_id, self.version)
    }
}
