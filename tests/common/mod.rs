// tests/common/mod.rs
//! Shared fixtures for the integration tests.

#![allow(dead_code)]

use notion_replica::{MemoryStore, NotionId, Parent, SharedStore};
use serde_json::{json, Value};
use std::sync::Arc;

/// A fresh in-memory store plus the same store behind the trait object.
pub fn stores() -> (Arc<MemoryStore>, SharedStore) {
    let memory = Arc::new(MemoryStore::new());
    let shared: SharedStore = memory.clone();
    (memory, shared)
}

pub fn text(content: &str) -> Value {
    json!([{
        "type": "text",
        "text": {"content": content, "link": null},
        "plain_text": content,
        "href": null,
        "annotations": {"bold": false, "italic": false, "strikethrough": false,
                        "underline": false, "code": false, "color": "default"}
    }])
}

/// A block record of kind `tag` with nested `children`.
pub fn block(tag: &str, content: &str, children: Vec<Value>) -> Value {
    let mut payload = json!({"rich_text": text(content), "color": "default"});
    if !children.is_empty() {
        payload["children"] = Value::Array(children);
    }
    let mut record = json!({"object": "block", "type": tag});
    record[tag] = payload;
    record
}

pub fn paragraph(content: &str) -> Value {
    block("paragraph", content, Vec::new())
}

/// Seeds an empty page at the workspace root.
pub fn empty_page(store: &MemoryStore) -> NotionId {
    store
        .seed(
            &Parent::Workspace,
            json!({"object": "page", "properties": {"Name": {"type": "title", "title": text("Target")}}}),
        )
        .unwrap()
}

/// The text of the first span of a stored block record.
pub fn block_text(store: &MemoryStore, id: &NotionId) -> String {
    let record = store.record(id).unwrap();
    let tag = record["type"].as_str().unwrap().to_string();
    record[&tag]["rich_text"][0]["text"]["content"]
        .as_str()
        .unwrap_or_default()
        .to_string()
}
