//! Payload shapes shared by property values and blocks.

use super::Color;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Select option
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SelectOption {
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    pub name: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub color: Option<Color>,
}

impl SelectOption {
    /// An option referenced by name only; the server resolves or creates it.
    pub fn named(name: impl Into<String>) -> Self {
        Self {
            id: None,
            name: name.into(),
            color: None,
        }
    }
}

/// Date value with optional end and time zone.
///
/// `start` and `end` are kept as the ISO 8601 strings the API sent (either a
/// date or a date-time), so writing them back never changes their precision.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateRange {
    pub start: String,
    #[serde(default)]
    pub end: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub time_zone: Option<String>,
}

impl DateRange {
    pub fn new(start: impl Into<String>, end: Option<String>) -> Self {
        Self {
            start: start.into(),
            end,
            time_zone: None,
        }
    }
}

impl fmt::Display for DateRange {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.end {
            Some(end) => write!(f, "{} -> {}", self.start, end),
            None => write!(f, "{}", self.start),
        }
    }
}

/// Reference to a workspace user.
///
/// Only `object` and `id` are written back; names are server-owned.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct UserRef {
    #[serde(default = "user_object")]
    pub object: String,
    pub id: String,
    #[serde(default, skip_serializing)]
    pub name: Option<String>,
    #[serde(default, skip_serializing)]
    pub avatar_url: Option<String>,
}

fn user_object() -> String {
    "user".to_string()
}

impl UserRef {
    pub fn new(id: impl Into<String>) -> Self {
        Self {
            object: user_object(),
            id: id.into(),
            name: None,
            avatar_url: None,
        }
    }
}

impl fmt::Display for UserRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match &self.name {
            Some(name) => write!(f, "{}", name),
            None => write!(f, "User {}", self.id),
        }
    }
}

/// Reference to a related page.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct PageRef {
    pub id: String,
}

/// Where a file's bytes live.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FileSource {
    External { external: ExternalFile },
    File { file: HostedFile },
}

impl FileSource {
    pub fn external(url: impl Into<String>) -> Self {
        FileSource::External {
            external: ExternalFile { url: url.into() },
        }
    }

    pub fn url(&self) -> &str {
        match self {
            FileSource::External { external } => &external.url,
            FileSource::File { file } => &file.url,
        }
    }

    /// Hosted files cannot be written back, so copies point at the URL.
    pub fn to_writable(&self) -> Self {
        match self {
            FileSource::External { .. } => self.clone(),
            FileSource::File { file } => FileSource::external(file.url.clone()),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ExternalFile {
    pub url: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct HostedFile {
    pub url: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub expiry_time: Option<String>,
}

/// Entry of a `files` property.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct FileRef {
    #[serde(default)]
    pub name: String,
    #[serde(flatten)]
    pub source: FileSource,
}

/// Formula result types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum FormulaResult {
    String { string: Option<String> },
    Number { number: Option<f64> },
    Boolean { boolean: Option<bool> },
    Date { date: Option<DateRange> },
}

/// Rollup result types
///
/// Array items are kept raw: each one is itself a property record and is
/// decoded on demand through the property registry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum RollupResult {
    Number { number: Option<f64> },
    Date { date: Option<DateRange> },
    Array { array: Vec<serde_json::Value> },
    Unsupported { unsupported: serde_json::Value },
    Incomplete { incomplete: serde_json::Value },
}
