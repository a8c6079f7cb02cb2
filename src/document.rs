// src/document.rs
//! Pages and databases as editable in-memory documents.
//!
//! A [`DocumentNode`] holds the typed property map of a page (or the schema
//! of a database) and, once loaded, its top-level blocks. Reads go through
//! the registries; writes go out through a [`RemoteStore`] handed in by the
//! caller.
//!
//! [`RemoteStore`]: crate::api::RemoteStore

use crate::api::{record_id, SharedStore};
use crate::error::{AppError, Result};
use crate::model::{
    BlockTypeRegistry, DocumentKind, Parent, PlainValue, Property, PropertyDescriptor,
    PropertyInput, PropertyTypeRegistry, SharedBlockRegistry,
};
use crate::tree::{append_copies, fan_out, publish_blocks, BlockTree};
use crate::types::rich_text::join_spans;
use crate::types::{NotionId, PropertyName, RichTextSpan, ValidationError};
use indexmap::IndexMap;
use serde_json::{json, Map, Value};

/// An in-memory page or database.
#[derive(Debug, Clone, PartialEq)]
pub struct DocumentNode {
    pub id: Option<NotionId>,
    pub kind: DocumentKind,
    pub parent: Parent,
    pub url: Option<String>,
    pub archived: bool,
    /// Page properties in display order.
    pub properties: IndexMap<PropertyName, Property>,
    /// Database title.
    pub title: Vec<RichTextSpan>,
    /// Database columns in display order.
    pub schema: IndexMap<PropertyName, PropertyDescriptor>,
    /// Top-level blocks; `None` until loaded.
    pub blocks: Option<Vec<BlockTree>>,
    /// Blocks authored before the existing ones were loaded.
    pending: Vec<BlockTree>,
    /// Decodes the top-level blocks when they load.
    block_registry: SharedBlockRegistry,
}

impl DocumentNode {
    /// A new, not yet created page under `parent`.
    pub fn page(parent: Parent) -> Self {
        Self {
            id: None,
            kind: DocumentKind::Page,
            parent,
            url: None,
            archived: false,
            properties: IndexMap::new(),
            title: Vec::new(),
            schema: IndexMap::new(),
            blocks: Some(Vec::new()),
            pending: Vec::new(),
            block_registry: BlockTypeRegistry::shared(),
        }
    }

    /// A new, not yet created database under `parent`.
    pub fn database(parent: Parent, title: &str) -> Self {
        Self {
            kind: DocumentKind::Database,
            title: vec![RichTextSpan::plain(title)],
            blocks: None,
            ..Self::page(parent)
        }
    }

    /// Fetches and decodes the page or database `id`.
    pub async fn retrieve(store: &SharedStore, id: &NotionId) -> Result<Self> {
        let raw = store.retrieve(id).await?;
        Self::from_raw(&raw)
    }

    /// Decodes a page or database record using the built-in property types.
    pub fn from_raw(raw: &Value) -> Result<Self> {
        Self::from_raw_with(PropertyTypeRegistry::standard(), raw)
    }

    pub fn from_raw_with(registry: &PropertyTypeRegistry, raw: &Value) -> Result<Self> {
        let kind = match raw.get("object").and_then(Value::as_str) {
            Some("page") => DocumentKind::Page,
            Some("database") => DocumentKind::Database,
            other => {
                return Err(AppError::MalformedRecord(format!(
                    "expected a page or database record, got {:?}",
                    other
                )))
            }
        };

        let parent = match raw.get("parent") {
            Some(parent) => serde_json::from_value(parent.clone())?,
            None => Parent::Workspace,
        };

        let mut document = Self {
            id: Some(record_id(raw)?),
            kind,
            parent,
            url: raw.get("url").and_then(Value::as_str).map(str::to_string),
            archived: raw.get("archived").and_then(Value::as_bool).unwrap_or(false),
            properties: IndexMap::new(),
            title: Vec::new(),
            schema: IndexMap::new(),
            blocks: None,
            pending: Vec::new(),
            block_registry: BlockTypeRegistry::shared(),
        };

        let entries = raw
            .get("properties")
            .and_then(Value::as_object)
            .cloned()
            .unwrap_or_default();

        match kind {
            DocumentKind::Page => {
                for (name, entry) in &entries {
                    match registry.build(entry) {
                        Ok(property) => {
                            document.properties.insert(name.as_str().into(), property);
                        }
                        Err(AppError::UnsupportedType { tag, .. }) => {
                            log::warn!("Skipping property '{}' of unsupported type '{}'", name, tag);
                        }
                        Err(e) => return Err(e),
                    }
                }
            }
            DocumentKind::Database => {
                if let Some(title) = raw.get("title") {
                    document.title = serde_json::from_value(title.clone())?;
                }
                for (name, entry) in &entries {
                    document
                        .schema
                        .insert(name.as_str().into(), PropertyDescriptor::from_raw(name, entry)?);
                }
            }
        }

        Ok(document)
    }

    /// Loads blocks through `registry` instead of the built-in one.
    ///
    /// Every block loaded below the page, and every copy made of it,
    /// decodes through the same registry.
    pub fn with_block_registry(mut self, registry: SharedBlockRegistry) -> Self {
        self.block_registry = registry;
        self
    }

    fn require_id(&self) -> Result<NotionId> {
        self.id
            .clone()
            .ok_or(AppError::Validation(ValidationError::EmptyField("id")))
    }

    /// The display title: the `title` property of a page, the title of a database.
    pub fn title(&self) -> String {
        match self.kind {
            DocumentKind::Database => join_spans(&self.title, ""),
            DocumentKind::Page => self
                .properties
                .values()
                .find(|property| property.tag() == "title")
                .map(|property| property.extract().to_string())
                .unwrap_or_default(),
        }
    }

    pub fn property(&self, name: &str) -> Result<&Property> {
        self.properties
            .get(name)
            .ok_or_else(|| AppError::UnknownProperty(name.to_string()))
    }

    pub fn property_mut(&mut self, name: &str) -> Result<&mut Property> {
        self.properties
            .get_mut(name)
            .ok_or_else(|| AppError::UnknownProperty(name.to_string()))
    }

    /// Plain projection of the named property.
    pub fn extract(&self, name: &str) -> Result<PlainValue> {
        Ok(self.property(name)?.extract())
    }

    /// Writes `value` into the named property.
    ///
    /// Server-computed properties are left untouched.
    pub fn set(&mut self, name: &str, value: impl Into<PropertyInput>) -> Result<()> {
        let property = self.property_mut(name)?;
        if property.value.is_read_only() {
            log::debug!("Ignoring write to read-only property '{}'", name);
            return Ok(());
        }
        property.insert(value)
    }

    /// Adds a property, replacing any property of the same name.
    pub fn insert_property(&mut self, name: impl Into<PropertyName>, property: Property) {
        self.properties.insert(name.into(), property);
    }

    /// Queues a locally authored top-level block; `update` publishes it.
    pub fn append_block(&mut self, block: BlockTree) {
        match &mut self.blocks {
            Some(blocks) => blocks.push(block),
            None => self.pending.push(block),
        }
    }

    /// The top-level blocks, loaded on first access.
    pub async fn blocks(&mut self, store: &SharedStore) -> Result<&mut Vec<BlockTree>> {
        if self.blocks.is_none() {
            let loaded = match (&self.id, self.kind) {
                (Some(id), DocumentKind::Page) => {
                    log::debug!("Loading blocks of page {}", id);
                    let registry = &self.block_registry;
                    store
                        .children(id)
                        .await?
                        .iter()
                        .map(|raw| BlockTree::from_raw_with(registry, raw))
                        .collect::<Result<Vec<_>>>()?
                }
                _ => Vec::new(),
            };
            self.blocks = Some(loaded);
        }
        let blocks = self.blocks.get_or_insert_with(Vec::new);
        blocks.append(&mut self.pending);
        Ok(blocks)
    }

    /// The outbound property map for `update`.
    ///
    /// Server-computed properties are dropped, as are `rich_text` properties
    /// whose first span is empty. Hosted files go out as external links.
    pub fn update_payload(&self) -> Value {
        let mut payload = Map::new();
        match self.kind {
            DocumentKind::Page => {
                for (name, property) in &self.properties {
                    if !property.value.is_writable() || property.value.is_blank_rich_text() {
                        continue;
                    }
                    payload.insert(name.to_string(), property.to_writable().to_raw());
                }
            }
            DocumentKind::Database => {
                for (name, descriptor) in &self.schema {
                    payload.insert(name.to_string(), descriptor.to_raw());
                }
            }
        }
        Value::Object(payload)
    }

    /// The record sent by `create`.
    fn create_record(&self) -> Value {
        match self.kind {
            DocumentKind::Page => {
                let properties: Map<String, Value> = self
                    .properties
                    .iter()
                    .map(|(name, property)| (name.to_string(), property.to_raw()))
                    .collect();
                let children: Vec<Value> = self
                    .blocks
                    .iter()
                    .flatten()
                    .chain(&self.pending)
                    .map(BlockTree::to_raw_nested)
                    .collect();
                let mut record = json!({"object": "page", "properties": properties});
                if !children.is_empty() {
                    record["children"] = Value::Array(children);
                }
                record
            }
            DocumentKind::Database => {
                let schema: Map<String, Value> = self
                    .schema
                    .iter()
                    .map(|(name, descriptor)| (name.to_string(), descriptor.to_raw()))
                    .collect();
                json!({"object": "database", "title": self.title, "properties": schema})
            }
        }
    }

    fn adopt(&mut self, record: &Value) -> Result<()> {
        self.id = Some(record_id(record)?);
        self.url = record.get("url").and_then(Value::as_str).map(str::to_string);
        self.archived = false;
        Ok(())
    }

    /// Creates this document, with its blocks, under its parent.
    ///
    /// The block ids the store assigns are not returned by a create, so the
    /// local blocks are dropped and reload on next access.
    pub async fn create(&mut self, store: &SharedStore) -> Result<()> {
        let record = self.create_record();
        let created = store.create(&self.parent, record).await?;
        self.adopt(&created)?;
        self.blocks = None;
        self.pending.clear();
        log::info!(
            "Created {} {}",
            self.kind.object_name(),
            self.id.as_ref().map_or("?", NotionId::as_str)
        );
        Ok(())
    }

    /// Sends changed properties, then publishes newly authored blocks.
    ///
    /// Blocks are only appended once the property update has succeeded.
    pub async fn update(&mut self, store: &SharedStore) -> Result<()> {
        let id = self.require_id()?;
        let patch = match self.kind {
            DocumentKind::Page => json!({ "properties": self.update_payload() }),
            DocumentKind::Database => {
                json!({ "title": self.title, "properties": self.update_payload() })
            }
        };
        store.update(&id, patch).await?;
        log::debug!("Updated {} {}", self.kind.object_name(), id);

        self.publish_new_blocks(&id, store).await
    }

    async fn publish_new_blocks(&mut self, page_id: &NotionId, store: &SharedStore) -> Result<()> {
        let published = match &mut self.blocks {
            Some(blocks) => publish_blocks(page_id, blocks, store).await?,
            None => {
                // Queued blocks stay queued until every one of them is in the
                // store; once sent they reload like every other block.
                let mut queued = std::mem::take(&mut self.pending);
                match publish_blocks(page_id, &mut queued, store).await {
                    Ok(published) => published,
                    Err(e) => {
                        self.pending = queued;
                        return Err(e);
                    }
                }
            }
        };

        if published > 0 {
            log::info!("Published {} new block(s) under {}", published, page_id);
        }
        Ok(())
    }

    /// Moves the document to the trash.
    pub async fn archive(&mut self, store: &SharedStore) -> Result<()> {
        let id = self.require_id()?;
        store.update(&id, json!({ "archived": true })).await?;
        self.archived = true;
        Ok(())
    }

    pub async fn delete(&mut self, store: &SharedStore) -> Result<()> {
        let id = self.require_id()?;
        store.delete(&id).await?;
        self.archived = true;
        Ok(())
    }

    /// Copies the document and its whole block tree under `target`.
    ///
    /// The new page gets every writable property. Top-level blocks are
    /// appended in one call, then each block's subtree replicates on its own
    /// task. Returns the copy with its blocks fully materialized.
    pub async fn duplicate(&mut self, store: &SharedStore, target: &Parent) -> Result<DocumentNode> {
        let mut copy = match self.kind {
            DocumentKind::Page => {
                let mut copy = DocumentNode::page(target.clone());
                for (name, property) in &self.properties {
                    if property.value.is_writable() {
                        copy.properties.insert(
                            name.clone(),
                            Property {
                                id: None,
                                value: property.value.to_writable(),
                            },
                        );
                    }
                }
                copy
            }
            DocumentKind::Database => {
                let mut copy = DocumentNode::database(target.clone(), "");
                copy.title = self.title.clone();
                copy.schema = self.schema.clone();
                copy
            }
        };

        copy.block_registry = self.block_registry.clone();

        let created = store.create(target, copy.create_record()).await?;
        copy.adopt(&created)?;
        let new_id = copy.require_id()?;
        log::info!(
            "Duplicating {} {} as {}",
            self.kind.object_name(),
            self.id.as_ref().map_or("(local)", NotionId::as_str),
            new_id
        );

        if self.kind == DocumentKind::Database {
            return Ok(copy);
        }

        let sources = self.blocks(store).await?;
        if sources.is_empty() {
            copy.blocks = Some(Vec::new());
            return Ok(copy);
        }
        let copies = append_copies(store, &new_id, sources).await?;
        copy.blocks = Some(fan_out(sources, copies, store.clone()).await?);
        Ok(copy)
    }
}
