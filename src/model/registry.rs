//! Tag-to-decoder tables for property and block records.
//!
//! A raw record names its kind in `type` and carries the payload under the
//! key of the same name. The registry looks the tag up and hands the payload
//! to a plain function pointer; no decoder holds state.

use super::block_value::BlockValue;
use super::property_value::{Property, PropertyValue};
use crate::error::{AppError, RecordKind, Result};
use lazy_static::lazy_static;
use serde_json::Value;
use std::collections::HashMap;
use std::fmt;
use std::sync::Arc;

/// Decodes the payload of a record whose tag is the first argument.
pub type Decoder<T> = fn(&str, &Value) -> Result<T>;

pub type PropertyDecoder = Decoder<PropertyValue>;
pub type BlockDecoder = Decoder<BlockValue>;

/// Decoder for a single-payload variant deserialized straight from the wire.
macro_rules! payload_decoder {
    ($variant:path => $target:ty) => {{
        fn decode(_tag: &str, payload: &Value) -> Result<$target> {
            Ok($variant(serde_json::from_value(payload.clone())?))
        }
        decode as Decoder<$target>
    }};
}

/// A table of decoders keyed by tag.
#[derive(Clone)]
pub struct TypeRegistry<T> {
    kind: RecordKind,
    decoders: HashMap<String, Decoder<T>>,
}

pub type PropertyTypeRegistry = TypeRegistry<PropertyValue>;
pub type BlockTypeRegistry = TypeRegistry<BlockValue>;

/// A block registry shared by every node of a tree and its copies.
pub type SharedBlockRegistry = Arc<BlockTypeRegistry>;

lazy_static! {
    static ref STANDARD_PROPERTIES: PropertyTypeRegistry = PropertyTypeRegistry::new();
    static ref STANDARD_BLOCKS: SharedBlockRegistry = Arc::new(BlockTypeRegistry::new());
}

impl<T> TypeRegistry<T> {
    fn from_table(kind: RecordKind, table: Vec<(&'static str, Decoder<T>)>) -> Self {
        Self {
            kind,
            decoders: table
                .into_iter()
                .map(|(tag, decoder)| (tag.to_string(), decoder))
                .collect(),
        }
    }

    /// Adds or replaces the decoder for `tag`.
    pub fn register(&mut self, tag: impl Into<String>, decoder: Decoder<T>) {
        let tag = tag.into();
        log::debug!("Registering {} decoder for '{}'", self.kind, tag);
        self.decoders.insert(tag, decoder);
    }

    pub fn is_registered(&self, tag: &str) -> bool {
        self.decoders.contains_key(tag)
    }

    /// Registered tags in sorted order.
    pub fn tags(&self) -> Vec<&str> {
        let mut tags: Vec<&str> = self.decoders.keys().map(String::as_str).collect();
        tags.sort_unstable();
        tags
    }

    /// Dispatches `raw` to the decoder registered for its `type`.
    fn decode(&self, raw: &Value) -> Result<T> {
        let tag = raw
            .get("type")
            .and_then(Value::as_str)
            .ok_or_else(|| {
                AppError::MalformedRecord(format!("{} record without a 'type' field", self.kind))
            })?;

        let decoder = self
            .decoders
            .get(tag)
            .ok_or_else(|| AppError::UnsupportedType {
                kind: self.kind,
                tag: tag.to_string(),
            })?;

        let payload = raw.get(tag).unwrap_or(&Value::Null);
        decoder(tag, payload).map_err(|err| match err {
            AppError::MalformedRecord(reason) => {
                AppError::MalformedRecord(format!("{} '{}': {}", self.kind, tag, reason))
            }
            other => other,
        })
    }
}

impl<T> fmt::Debug for TypeRegistry<T> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TypeRegistry")
            .field("kind", &self.kind)
            .field("registered", &self.decoders.len())
            .finish()
    }
}

/// Registries compare by the tags they accept.
impl<T> PartialEq for TypeRegistry<T> {
    fn eq(&self, other: &Self) -> bool {
        self.kind == other.kind && self.tags() == other.tags()
    }
}

impl TypeRegistry<PropertyValue> {
    /// A registry holding every built-in property tag.
    pub fn new() -> Self {
        Self::from_table(
            RecordKind::Property,
            vec![
                ("title", payload_decoder!(PropertyValue::Title => PropertyValue)),
                ("rich_text", payload_decoder!(PropertyValue::RichText => PropertyValue)),
                ("number", payload_decoder!(PropertyValue::Number => PropertyValue)),
                ("select", payload_decoder!(PropertyValue::Select => PropertyValue)),
                ("multi_select", payload_decoder!(PropertyValue::MultiSelect => PropertyValue)),
                ("status", payload_decoder!(PropertyValue::Status => PropertyValue)),
                ("date", payload_decoder!(PropertyValue::Date => PropertyValue)),
                ("people", payload_decoder!(PropertyValue::People => PropertyValue)),
                ("files", payload_decoder!(PropertyValue::Files => PropertyValue)),
                ("checkbox", payload_decoder!(PropertyValue::Checkbox => PropertyValue)),
                ("url", payload_decoder!(PropertyValue::Url => PropertyValue)),
                ("email", payload_decoder!(PropertyValue::Email => PropertyValue)),
                ("phone_number", payload_decoder!(PropertyValue::PhoneNumber => PropertyValue)),
                ("formula", payload_decoder!(PropertyValue::Formula => PropertyValue)),
                ("relation", payload_decoder!(PropertyValue::Relation => PropertyValue)),
                ("rollup", payload_decoder!(PropertyValue::Rollup => PropertyValue)),
                ("created_by", payload_decoder!(PropertyValue::CreatedBy => PropertyValue)),
                ("created_time", payload_decoder!(PropertyValue::CreatedTime => PropertyValue)),
                ("last_edited_by", payload_decoder!(PropertyValue::LastEditedBy => PropertyValue)),
                (
                    "last_edited_time",
                    payload_decoder!(PropertyValue::LastEditedTime => PropertyValue),
                ),
            ],
        )
    }

    /// The shared built-in registry.
    pub fn standard() -> &'static Self {
        &STANDARD_PROPERTIES
    }

    /// Registers `tag` so its payload decodes unchanged into [`PropertyValue::Other`].
    pub fn register_opaque(&mut self, tag: impl Into<String>) {
        self.register(tag, opaque_property);
    }

    /// Decodes a full property record, keeping its server-side id.
    pub fn build(&self, raw: &Value) -> Result<Property> {
        let value = self.decode(raw)?;
        let id = raw.get("id").and_then(Value::as_str).map(str::to_string);
        Ok(Property { id, value })
    }
}

impl Default for TypeRegistry<PropertyValue> {
    fn default() -> Self {
        Self::new()
    }
}

impl TypeRegistry<BlockValue> {
    /// A registry holding every built-in block tag.
    pub fn new() -> Self {
        Self::from_table(
            RecordKind::Block,
            vec![
                ("paragraph", payload_decoder!(BlockValue::Paragraph => BlockValue)),
                ("heading_1", payload_decoder!(BlockValue::Heading1 => BlockValue)),
                ("heading_2", payload_decoder!(BlockValue::Heading2 => BlockValue)),
                ("heading_3", payload_decoder!(BlockValue::Heading3 => BlockValue)),
                ("callout", payload_decoder!(BlockValue::Callout => BlockValue)),
                ("quote", payload_decoder!(BlockValue::Quote => BlockValue)),
                ("bulleted_list_item", payload_decoder!(BlockValue::BulletedListItem => BlockValue)),
                ("numbered_list_item", payload_decoder!(BlockValue::NumberedListItem => BlockValue)),
                ("to_do", payload_decoder!(BlockValue::ToDo => BlockValue)),
                ("toggle", payload_decoder!(BlockValue::Toggle => BlockValue)),
                ("code", payload_decoder!(BlockValue::Code => BlockValue)),
                ("child_page", payload_decoder!(BlockValue::ChildPage => BlockValue)),
                ("child_database", payload_decoder!(BlockValue::ChildDatabase => BlockValue)),
                ("embed", payload_decoder!(BlockValue::Embed => BlockValue)),
                ("image", payload_decoder!(BlockValue::Image => BlockValue)),
                ("video", payload_decoder!(BlockValue::Video => BlockValue)),
                ("file", payload_decoder!(BlockValue::File => BlockValue)),
                ("pdf", payload_decoder!(BlockValue::Pdf => BlockValue)),
                ("bookmark", payload_decoder!(BlockValue::Bookmark => BlockValue)),
                ("equation", payload_decoder!(BlockValue::Equation => BlockValue)),
                ("divider", payload_decoder!(BlockValue::Divider => BlockValue)),
                ("table_of_contents", payload_decoder!(BlockValue::TableOfContents => BlockValue)),
            ],
        )
    }

    /// The shared built-in registry.
    pub fn standard() -> &'static Self {
        &STANDARD_BLOCKS
    }

    /// A handle on the built-in registry, for trees that decode lazily.
    pub fn shared() -> SharedBlockRegistry {
        STANDARD_BLOCKS.clone()
    }

    /// Registers `tag` so its payload decodes unchanged into [`BlockValue::Other`].
    pub fn register_opaque(&mut self, tag: impl Into<String>) {
        self.register(tag, opaque_block);
    }

    /// Decodes the content of a block record.
    pub fn build(&self, raw: &Value) -> Result<BlockValue> {
        self.decode(raw)
    }
}

impl Default for TypeRegistry<BlockValue> {
    fn default() -> Self {
        Self::new()
    }
}

fn opaque_property(tag: &str, payload: &Value) -> Result<PropertyValue> {
    Ok(PropertyValue::Other {
        tag: tag.to_string(),
        payload: payload.clone(),
    })
}

fn opaque_block(tag: &str, payload: &Value) -> Result<BlockValue> {
    Ok(BlockValue::Other {
        tag: tag.to_string(),
        payload: payload.clone(),
    })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::PlainValue;
    use pretty_assertions::assert_eq;
    use serde_json::json;

    #[test]
    fn builds_date_range() {
        let property = PropertyTypeRegistry::standard()
            .build(&json!({
                "id": "d%3Ax",
                "type": "date",
                "date": {"start": "2024-03-01", "end": "2024-03-04", "time_zone": null}
            }))
            .unwrap();

        assert_eq!(property.id.as_deref(), Some("d%3Ax"));
        assert_eq!(property.extract(), "2024-03-01 -> 2024-03-04");
    }

    #[test]
    fn unknown_property_tag_is_unsupported() {
        let err = PropertyTypeRegistry::standard()
            .build(&json!({"type": "unique_id", "unique_id": {"number": 1}}))
            .unwrap_err();
        match err {
            AppError::UnsupportedType { kind, tag } => {
                assert_eq!(kind, RecordKind::Property);
                assert_eq!(tag, "unique_id");
            }
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn registered_extension_keeps_raw_payload() {
        let mut registry = PropertyTypeRegistry::new();
        registry.register_opaque("unique_id");

        let property = registry
            .build(&json!({"type": "unique_id", "unique_id": {"prefix": "T", "number": 7}}))
            .unwrap();

        assert_eq!(property.tag(), "unique_id");
        assert_eq!(
            property.extract(),
            PlainValue::Raw(json!({"prefix": "T", "number": 7}))
        );
        assert!(!PropertyTypeRegistry::standard().is_registered("unique_id"));
    }

    #[test]
    fn malformed_payload_names_the_tag() {
        let err = PropertyTypeRegistry::standard()
            .build(&json!({"type": "checkbox", "checkbox": "yes"}))
            .unwrap_err();
        match err {
            AppError::MalformedRecord(reason) => assert!(reason.starts_with("property 'checkbox'")),
            other => panic!("unexpected error: {other}"),
        }
    }

    #[test]
    fn missing_type_is_malformed() {
        let err = BlockTypeRegistry::standard()
            .build(&json!({"paragraph": {}}))
            .unwrap_err();
        assert!(matches!(err, AppError::MalformedRecord(_)));
    }

    #[test]
    fn legacy_text_key_decodes_as_rich_text() {
        let block = BlockTypeRegistry::standard()
            .build(&json!({
                "type": "paragraph",
                "paragraph": {"text": [{"type": "text", "text": {"content": "old"}}]}
            }))
            .unwrap();
        assert_eq!(block.plain_text(), "old");
    }

    #[test]
    fn extraction_is_deterministic() {
        let raw = json!({
            "id": "ms",
            "type": "multi_select",
            "multi_select": [{"id": "1", "name": "A", "color": "red"}, {"name": "B"}]
        });
        let registry = PropertyTypeRegistry::standard();
        let first = registry.build(&raw).unwrap().extract();
        let second = registry.build(&raw).unwrap().extract();
        assert_eq!(first, second);
        assert_eq!(first, "A, B");
    }

    #[test]
    fn extended_registry_differs_from_standard() {
        let mut registry = BlockTypeRegistry::new();
        assert_eq!(&registry, BlockTypeRegistry::standard());

        registry.register_opaque("synced_block");
        assert_ne!(&registry, BlockTypeRegistry::standard());
        assert!(registry.is_registered("synced_block"));
    }

    #[test]
    fn standard_tables_cover_all_builtin_tags() {
        assert_eq!(PropertyTypeRegistry::standard().tags().len(), 20);
        assert_eq!(BlockTypeRegistry::standard().tags().len(), 22);
    }
}
