use crate::models::error::SError;
use serde::{Deserialize, Serialize};
use std::cmp::Ordering;
use std::fmt;
use std::hash::{Hash, Hasher};
use std::str::FromStr;

/// A dotted mod version such as `1.2.10`.
///
/// Ordering is field-wise numeric, missing trailing fields count as zero, and versions that are
/// numerically equal fall back to comparing the raw text so that the order stays total.
#[derive(Clone, Debug, Serialize, Deserialize)]
#[serde(try_from = "String", into = "String")]
pub struct ModVersion {
    raw: String,
    fields: Vec<u64>,
}

impl ModVersion {
    pub fn parse(s: &str) -> Result<Self, SError> {
        let raw = s.trim();
        let valid = raw.starts_with(|c: char| c.is_ascii_digit())
            && raw.chars().all(|c| c.is_ascii_alphanumeric() || c == '.');
        if !valid {
            return Err(SError::ParseError(format!("invalid version '{s}'")));
        }

        let fields = raw.split('.').map(leading_number).collect();
        Ok(Self {
            raw: raw.to_string(),
            fields,
        })
    }

    pub fn as_str(&self) -> &str {
        &self.raw
    }

    fn field(&self, i: usize) -> u64 {
        self.fields.get(i).copied().unwrap_or(0)
    }

    /// First `n` fields compared numerically, used by build compatibility checks.
    pub fn same_prefix(&self, other: &ModVersion, n: usize) -> bool {
        (0..n).all(|i| self.field(i) == other.field(i))
    }
}

fn leading_number(field: &str) -> u64 {
    let digits: String = field.chars().take_while(|c| c.is_ascii_digit()).collect();
    digits.parse().unwrap_or(0)
}

impl Ord for ModVersion {
    fn cmp(&self, other: &Self) -> Ordering {
        let len = self.fields.len().max(other.fields.len());
        (0..len)
            .map(|i| self.field(i).cmp(&other.field(i)))
            .find(|o| o.is_ne())
            .unwrap_or(Ordering::Equal)
            .then_with(|| self.raw.cmp(&other.raw))
    }
}

impl PartialOrd for ModVersion {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl PartialEq for ModVersion {
    fn eq(&self, other: &Self) -> bool {
        self.raw == other.raw
    }
}

impl Eq for ModVersion {}

impl Hash for ModVersion {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.raw.hash(state);
    }
}

impl fmt::Display for ModVersion {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for ModVersion {
    type Err = SError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl TryFrom<String> for ModVersion {
    type Error = SError;

    fn try_from(value: String) -> Result<Self, Self::Error> {
        Self::parse(&value)
    }
}

impl From<ModVersion> for String {
    fn from(v: ModVersion) -> Self {
        v.raw
    }
}
