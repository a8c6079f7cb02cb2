use super::ValidationError;
use lazy_static::lazy_static;
use regex::Regex;
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

lazy_static! {
    /// The trailing id of a Notion URL, either bare or with dashes.
    static ref URL_ID: Regex = Regex::new(
        r"(?:[/-])([a-fA-F0-9]{32}|[a-fA-F0-9]{8}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{4}-[a-fA-F0-9]{12})(?:[/?#]|$)"
    ).expect("Failed to compile Notion ID regex - this is a bug in the code");
}

/// Identifies a page, database or block.
///
/// Kept as 32 lowercase hex digits so ids the API returns with dashes
/// compare equal to ids pasted without them. Serializes hyphenated.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct NotionId(String);

impl NotionId {
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// The 8-4-4-4-12 form the API uses in paths and bodies.
    pub fn to_hyphenated(&self) -> String {
        Uuid::parse_str(&self.0)
            .map(|uuid| uuid.hyphenated().to_string())
            .unwrap_or_else(|_| self.0.clone())
    }

    /// A fresh random id, as a store assigns on create.
    pub fn generate() -> Self {
        Self::from_uuid(Uuid::new_v4())
    }

    fn from_uuid(uuid: Uuid) -> Self {
        NotionId(uuid.as_simple().to_string())
    }

    /// Accepts a bare id (with or without dashes) or a Notion URL ending in one.
    pub fn parse(input: &str) -> Result<Self, ValidationError> {
        let cleaned = input.trim().trim_end_matches('/');

        if let Ok(uuid) = Uuid::parse_str(cleaned) {
            return Ok(Self::from_uuid(uuid));
        }

        URL_ID
            .captures(cleaned)
            .filter(|_| cleaned.contains("notion"))
            .and_then(|captures| captures.get(1))
            .and_then(|found| Uuid::parse_str(found.as_str()).ok())
            .map(Self::from_uuid)
            .ok_or_else(|| {
                ValidationError::InvalidId(format!("Could not parse Notion ID from: {}", input))
            })
    }
}

impl fmt::Display for NotionId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl std::str::FromStr for NotionId {
    type Err = ValidationError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for NotionId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.to_hyphenated())
    }
}

impl<'de> Deserialize<'de> for NotionId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        NotionId::parse(&raw).map_err(serde::de::Error::custom)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const BARE: &str = "550e8400e29b41d4a716446655440000";

    #[test]
    fn accepts_bare_dashed_and_url_forms() {
        for input in [
            BARE,
            "550E8400-E29B-41D4-A716-446655440000",
            "https://www.notion.so/Test-Page-550e8400e29b41d4a716446655440000",
            "https://www.notion.so/workspace/550e8400e29b41d4a716446655440000?v=1",
            "  550e8400e29b41d4a716446655440000/ ",
        ] {
            assert_eq!(NotionId::parse(input).unwrap().as_str(), BARE, "{}", input);
        }
    }

    #[test]
    fn rejects_malformed_ids() {
        assert!(NotionId::parse("too-short").is_err());
        assert!(NotionId::parse("not-hex-chars-00000000000000000").is_err());
        assert!(NotionId::parse("").is_err());
        assert!(NotionId::parse("https://example.com/550e8400e29b41d4a716446655440000").is_err());
    }

    #[test]
    fn serializes_hyphenated() {
        let id = NotionId::parse(BARE).unwrap();
        assert_eq!(id.to_hyphenated(), "550e8400-e29b-41d4-a716-446655440000");
        assert_eq!(
            serde_json::to_value(&id).unwrap(),
            serde_json::json!("550e8400-e29b-41d4-a716-446655440000")
        );
    }

    #[test]
    fn generated_ids_are_distinct_and_parseable() {
        let a = NotionId::generate();
        let b = NotionId::generate();
        assert_ne!(a, b);
        assert_eq!(NotionId::parse(&a.to_hyphenated()).unwrap(), a);
    }
}
