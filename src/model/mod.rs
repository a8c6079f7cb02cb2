pub mod block_value;
mod property_value;
pub mod registry;

pub use block_value::BlockValue;
pub use property_value::{PlainValue, Property, PropertyInput, PropertyValue, READ_ONLY_TAGS};
pub use registry::{BlockTypeRegistry, PropertyTypeRegistry, SharedBlockRegistry};

use crate::error::{AppError, Result};
use crate::types::{NotionId, PropertyName};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use std::fmt;

/// Where a page, database or block lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(tag = "type")]
pub enum Parent {
    #[serde(rename = "page_id")]
    Page { page_id: NotionId },
    #[serde(rename = "database_id")]
    Database { database_id: NotionId },
    #[serde(rename = "block_id")]
    Block { block_id: NotionId },
    #[serde(rename = "workspace")]
    Workspace,
}

impl Parent {
    pub fn page(id: NotionId) -> Self {
        Parent::Page { page_id: id }
    }

    pub fn database(id: NotionId) -> Self {
        Parent::Database { database_id: id }
    }

    pub fn block(id: NotionId) -> Self {
        Parent::Block { block_id: id }
    }

    /// The parent's id, if it has one.
    pub fn id(&self) -> Option<&NotionId> {
        match self {
            Parent::Page { page_id } => Some(page_id),
            Parent::Database { database_id } => Some(database_id),
            Parent::Block { block_id } => Some(block_id),
            Parent::Workspace => None,
        }
    }
}

impl fmt::Display for Parent {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Parent::Page { page_id } => write!(f, "page {}", page_id),
            Parent::Database { database_id } => write!(f, "database {}", database_id),
            Parent::Block { block_id } => write!(f, "block {}", block_id),
            Parent::Workspace => write!(f, "workspace"),
        }
    }
}

/// Whether a document is a page or a database.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DocumentKind {
    Page,
    Database,
}

impl DocumentKind {
    pub fn object_name(&self) -> &'static str {
        match self {
            DocumentKind::Page => "page",
            DocumentKind::Database => "database",
        }
    }
}

/// One column of a database schema.
///
/// The type-specific configuration (select options, number format, ...) is
/// kept raw and written back unchanged.
#[derive(Debug, Clone, PartialEq)]
pub struct PropertyDescriptor {
    pub id: Option<String>,
    pub name: PropertyName,
    pub tag: String,
    pub config: Value,
}

impl PropertyDescriptor {
    pub fn from_raw(name: &str, raw: &Value) -> Result<Self> {
        let tag = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::MalformedRecord(format!("schema entry '{}' without a 'type'", name))
            })?
            .to_string();
        Ok(Self {
            id: raw.get("id").and_then(Value::as_str).map(str::to_string),
            name: raw
                .get("name")
                .and_then(Value::as_str)
                .unwrap_or(name)
                .into(),
            config: raw.get(&tag).cloned().unwrap_or_else(|| json!({})),
            tag,
        })
    }

    /// Encodes the entry for a schema create/update, without the server id.
    pub fn to_raw(&self) -> Value {
        let mut record = serde_json::Map::new();
        record.insert("name".to_string(), json!(self.name));
        record.insert("type".to_string(), json!(self.tag));
        record.insert(self.tag.clone(), self.config.clone());
        Value::Object(record)
    }
}
