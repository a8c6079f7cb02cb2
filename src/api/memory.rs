// src/api/memory.rs
//! An in-memory [`RemoteStore`] for tests and offline runs.
//!
//! Records are kept as the same JSON maps the Notion API exchanges, so code
//! that works against this store sees the wire shapes it will meet in
//! production. Every call is logged, and any operation can be made to fail
//! on demand to exercise error paths.

use super::RemoteStore;
use crate::error::{AppError, NotionErrorCode, StoreOperation};
use crate::model::Parent;
use crate::types::NotionId;
use parking_lot::Mutex;
use serde_json::{json, Map, Value};
use std::collections::HashMap;

/// One call observed by a [`MemoryStore`], in the order calls completed.
#[derive(Debug, Clone, PartialEq)]
pub struct StoreCall {
    pub operation: StoreOperation,
    /// Record (or parent, for `create` and `append_children`) the call addressed.
    pub target: Option<NotionId>,
    /// Number of records sent with the call.
    pub sent: usize,
    /// Ids the call assigned, in the order they were returned.
    pub created: Vec<NotionId>,
    pub succeeded: bool,
}

#[derive(Debug, Clone, PartialEq)]
struct FailureRule {
    operation: StoreOperation,
    target: Option<NotionId>,
}

impl FailureRule {
    fn matches(&self, operation: StoreOperation, target: Option<&NotionId>) -> bool {
        self.operation == operation
            && match &self.target {
                None => true,
                Some(id) => target == Some(id),
            }
    }
}

#[derive(Default)]
struct State {
    records: HashMap<NotionId, Value>,
    children: HashMap<NotionId, Vec<NotionId>>,
    calls: Vec<StoreCall>,
    failures: Vec<FailureRule>,
}

/// A thread-safe record store living entirely in memory.
#[derive(Default)]
pub struct MemoryStore {
    state: Mutex<State>,
}

impl MemoryStore {
    pub fn new() -> Self {
        Self::default()
    }

    /// Stores `record` under `parent` without logging a call.
    ///
    /// Nested `children` (under a page record, or inside a block's payload)
    /// are stored too. Returns the id assigned to `record`.
    pub fn seed(&self, parent: &Parent, record: Value) -> Result<NotionId, AppError> {
        let mut state = self.state.lock();
        insert_record(&mut state, parent, record)
    }

    /// Makes every future `operation` call fail.
    pub fn fail_operation(&self, operation: StoreOperation) {
        self.state.lock().failures.push(FailureRule {
            operation,
            target: None,
        });
    }

    /// Makes future `operation` calls addressed at `target` fail.
    ///
    /// For `create` and `append_children` the target is the parent id.
    pub fn fail_target(&self, operation: StoreOperation, target: &NotionId) {
        self.state.lock().failures.push(FailureRule {
            operation,
            target: Some(target.clone()),
        });
    }

    pub fn clear_failures(&self) {
        self.state.lock().failures.clear();
    }

    /// Every call made so far, in completion order.
    pub fn calls(&self) -> Vec<StoreCall> {
        self.state.lock().calls.clone()
    }

    /// Calls of one kind, in completion order.
    pub fn calls_of(&self, operation: StoreOperation) -> Vec<StoreCall> {
        self.state
            .lock()
            .calls
            .iter()
            .filter(|call| call.operation == operation)
            .cloned()
            .collect()
    }

    pub fn clear_calls(&self) {
        self.state.lock().calls.clear();
    }

    /// The stored record for `id`, as `retrieve` would return it.
    pub fn record(&self, id: &NotionId) -> Option<Value> {
        let state = self.state.lock();
        state.records.contains_key(id).then(|| view(&state, id))
    }

    /// Ids of the live direct children of `id`, in order.
    pub fn child_ids(&self, id: &NotionId) -> Vec<NotionId> {
        live_children(&self.state.lock(), id)
    }

    /// Ids of every live descendant of `id`, depth first.
    pub fn subtree(&self, id: &NotionId) -> Vec<NotionId> {
        let state = self.state.lock();
        let mut out = Vec::new();
        let mut stack: Vec<NotionId> = live_children(&state, id).into_iter().rev().collect();
        while let Some(next) = stack.pop() {
            stack.extend(live_children(&state, &next).into_iter().rev());
            out.push(next);
        }
        out
    }

    pub fn len(&self) -> usize {
        self.state.lock().records.len()
    }

    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }

    /// Checks injected failures and records the attempt when one fires.
    fn check(
        state: &mut State,
        operation: StoreOperation,
        target: Option<&NotionId>,
        sent: usize,
    ) -> Result<(), AppError> {
        if state.failures.iter().any(|rule| rule.matches(operation, target)) {
            state.calls.push(StoreCall {
                operation,
                target: target.cloned(),
                sent,
                created: Vec::new(),
                succeeded: false,
            });
            let target = target.map_or("workspace".to_string(), NotionId::to_hyphenated);
            log::warn!("Injected {} failure on {}", operation, target);
            return Err(AppError::remote(
                operation,
                target,
                Some(NotionErrorCode::ValidationFailed),
                "injected failure",
            ));
        }
        Ok(())
    }

    fn log_call(
        state: &mut State,
        operation: StoreOperation,
        target: Option<&NotionId>,
        sent: usize,
        created: Vec<NotionId>,
    ) {
        log::debug!(
            "{} on {:?}: sent {}, created {}",
            operation,
            target.map(NotionId::as_str),
            sent,
            created.len()
        );
        state.calls.push(StoreCall {
            operation,
            target: target.cloned(),
            sent,
            created,
            succeeded: true,
        });
    }
}

fn not_found(operation: StoreOperation, id: &NotionId) -> AppError {
    AppError::remote(
        operation,
        id.to_hyphenated(),
        Some(NotionErrorCode::ObjectNotFound),
        format!("Could not find object with ID: {}", id.to_hyphenated()),
    )
}

fn is_archived(record: &Value) -> bool {
    record
        .get("archived")
        .and_then(Value::as_bool)
        .unwrap_or(false)
}

fn live_children(state: &State, id: &NotionId) -> Vec<NotionId> {
    state
        .children
        .get(id)
        .map(|ids| {
            ids.iter()
                .filter(|child| {
                    state
                        .records
                        .get(*child)
                        .map_or(false, |record| !is_archived(record))
                })
                .cloned()
                .collect()
        })
        .unwrap_or_default()
}

/// A stored record as the API presents it, with `has_children` filled in.
fn view(state: &State, id: &NotionId) -> Value {
    let mut record = state.records.get(id).cloned().unwrap_or(Value::Null);
    if let Value::Object(map) = &mut record {
        if map.get("object").and_then(Value::as_str) == Some("block") {
            map.insert(
                "has_children".to_string(),
                json!(!live_children(state, id).is_empty()),
            );
        }
    }
    record
}

fn insert_record(state: &mut State, parent: &Parent, record: Value) -> Result<NotionId, AppError> {
    let Value::Object(mut map) = record else {
        return Err(AppError::MalformedRecord(
            "a record must be a JSON object".to_string(),
        ));
    };

    if let Some(parent_id) = parent.id() {
        if !state.records.contains_key(parent_id) {
            return Err(not_found(StoreOperation::Create, parent_id));
        }
    }

    let object = map
        .get("object")
        .and_then(Value::as_str)
        .unwrap_or("block")
        .to_string();
    let nested = take_nested_children(&mut map, &object);

    let id = NotionId::generate();
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    map.insert("object".to_string(), json!(object));
    map.insert("id".to_string(), json!(id));
    map.insert("parent".to_string(), parent_json(parent));
    map.insert("created_time".to_string(), json!(now));
    map.insert("last_edited_time".to_string(), json!(now));
    map.insert("archived".to_string(), json!(false));
    if object != "block" {
        map.insert(
            "url".to_string(),
            json!(format!("https://www.notion.so/{}", id.as_str())),
        );
    }

    state.records.insert(id.clone(), Value::Object(map));
    if let Some(parent_id) = parent.id() {
        state
            .children
            .entry(parent_id.clone())
            .or_default()
            .push(id.clone());
    }

    let child_parent = if object == "block" {
        Parent::block(id.clone())
    } else {
        Parent::page(id.clone())
    };
    for child in nested {
        insert_record(state, &child_parent, child)?;
    }

    Ok(id)
}

/// Removes nested children sent along with a record.
///
/// Pages carry them at the top level, blocks inside their type payload.
fn take_nested_children(map: &mut Map<String, Value>, object: &str) -> Vec<Value> {
    let nested = if object == "block" {
        let tag = map
            .get("type")
            .and_then(Value::as_str)
            .map(str::to_string);
        tag.and_then(|tag| map.get_mut(&tag))
            .and_then(Value::as_object_mut)
            .and_then(|payload| payload.remove("children"))
    } else {
        map.remove("children")
    };
    match nested {
        Some(Value::Array(items)) => items,
        _ => Vec::new(),
    }
}

fn parent_json(parent: &Parent) -> Value {
    match parent {
        Parent::Workspace => json!({"type": "workspace", "workspace": true}),
        other => serde_json::to_value(other).unwrap_or(Value::Null),
    }
}

fn merge_patch(record: &mut Value, patch: Value) {
    let (Value::Object(target), Value::Object(patch)) = (record, patch) else {
        return;
    };
    for (key, value) in patch {
        match value {
            Value::Object(changes) if key == "properties" => {
                if let Value::Object(existing) =
                    target.entry("properties").or_insert_with(|| json!({}))
                {
                    existing.extend(changes);
                }
            }
            value => {
                target.insert(key, value);
            }
        }
    }
    let now = chrono::Utc::now().to_rfc3339_opts(chrono::SecondsFormat::Millis, true);
    target.insert("last_edited_time".to_string(), json!(now));
}

#[async_trait::async_trait]
impl RemoteStore for MemoryStore {
    async fn retrieve(&self, id: &NotionId) -> Result<Value, AppError> {
        let mut state = self.state.lock();
        Self::check(&mut state, StoreOperation::Retrieve, Some(id), 0)?;
        if !state.records.contains_key(id) {
            return Err(not_found(StoreOperation::Retrieve, id));
        }
        let record = view(&state, id);
        Self::log_call(&mut state, StoreOperation::Retrieve, Some(id), 0, Vec::new());
        Ok(record)
    }

    async fn children(&self, block_id: &NotionId) -> Result<Vec<Value>, AppError> {
        let mut state = self.state.lock();
        Self::check(&mut state, StoreOperation::Children, Some(block_id), 0)?;
        if !state.records.contains_key(block_id) {
            return Err(not_found(StoreOperation::Children, block_id));
        }
        let records = live_children(&state, block_id)
            .iter()
            .map(|id| view(&state, id))
            .collect();
        Self::log_call(&mut state, StoreOperation::Children, Some(block_id), 0, Vec::new());
        Ok(records)
    }

    async fn create(&self, parent: &Parent, record: Value) -> Result<Value, AppError> {
        let mut state = self.state.lock();
        Self::check(&mut state, StoreOperation::Create, parent.id(), 1)?;
        let id = insert_record(&mut state, parent, record)?;
        let created = view(&state, &id);
        Self::log_call(&mut state, StoreOperation::Create, parent.id(), 1, vec![id]);
        Ok(created)
    }

    async fn update(&self, id: &NotionId, patch: Value) -> Result<(), AppError> {
        let mut state = self.state.lock();
        Self::check(&mut state, StoreOperation::Update, Some(id), 1)?;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| not_found(StoreOperation::Update, id))?;
        merge_patch(record, patch);
        Self::log_call(&mut state, StoreOperation::Update, Some(id), 1, Vec::new());
        Ok(())
    }

    async fn append_children(
        &self,
        parent_id: &NotionId,
        blocks: Vec<Value>,
    ) -> Result<Vec<Value>, AppError> {
        let mut state = self.state.lock();
        let sent = blocks.len();
        Self::check(&mut state, StoreOperation::AppendChildren, Some(parent_id), sent)?;
        let parent = match state
            .records
            .get(parent_id)
            .and_then(|record| record.get("object"))
            .and_then(Value::as_str)
        {
            Some("block") => Parent::block(parent_id.clone()),
            Some(_) => Parent::page(parent_id.clone()),
            None => return Err(not_found(StoreOperation::AppendChildren, parent_id)),
        };

        let mut ids = Vec::with_capacity(sent);
        for mut block in blocks {
            if let Value::Object(map) = &mut block {
                map.insert("object".to_string(), json!("block"));
            }
            ids.push(insert_record(&mut state, &parent, block)?);
        }
        let created = ids.iter().map(|id| view(&state, id)).collect();
        Self::log_call(
            &mut state,
            StoreOperation::AppendChildren,
            Some(parent_id),
            sent,
            ids,
        );
        Ok(created)
    }

    async fn delete(&self, id: &NotionId) -> Result<(), AppError> {
        let mut state = self.state.lock();
        Self::check(&mut state, StoreOperation::Delete, Some(id), 0)?;
        let record = state
            .records
            .get_mut(id)
            .ok_or_else(|| not_found(StoreOperation::Delete, id))?;
        if let Value::Object(map) = record {
            map.insert("archived".to_string(), json!(true));
        }
        Self::log_call(&mut state, StoreOperation::Delete, Some(id), 0, Vec::new());
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    fn paragraph(text: &str) -> Value {
        json!({
            "object": "block",
            "type": "paragraph",
            "paragraph": {"rich_text": [{"type": "text", "text": {"content": text}}]}
        })
    }

    #[tokio::test]
    async fn seeded_children_keep_order() {
        let store = MemoryStore::new();
        let page = store
            .seed(
                &Parent::Workspace,
                json!({"object": "page", "properties": {}, "children": [paragraph("a"), paragraph("b")]}),
            )
            .unwrap();

        let children = store.children(&page).await.unwrap();
        let texts: Vec<_> = children
            .iter()
            .map(|c| c["paragraph"]["rich_text"][0]["text"]["content"].clone())
            .collect();
        assert_eq!(texts, vec![json!("a"), json!("b")]);
        assert_eq!(children[0]["has_children"], false);
    }

    #[tokio::test]
    async fn nested_block_children_are_stored() {
        let store = MemoryStore::new();
        let page = store
            .seed(&Parent::Workspace, json!({"object": "page", "properties": {}}))
            .unwrap();

        let mut toggle = json!({"object": "block", "type": "toggle", "toggle": {"rich_text": []}});
        toggle["toggle"]["children"] = json!([paragraph("inner")]);
        let created = store.append_children(&page, vec![toggle]).await.unwrap();

        let toggle_id = NotionId::parse(created[0]["id"].as_str().unwrap()).unwrap();
        assert_eq!(created[0]["has_children"], true);
        assert_eq!(store.subtree(&page).len(), 2);
        assert_eq!(store.child_ids(&toggle_id).len(), 1);
        assert!(created[0]["toggle"].get("children").is_none());
    }

    #[tokio::test]
    async fn injected_failure_is_logged_and_returned() {
        let store = MemoryStore::new();
        let page = store
            .seed(&Parent::Workspace, json!({"object": "page", "properties": {}}))
            .unwrap();
        store.fail_target(StoreOperation::AppendChildren, &page);

        let err = store
            .append_children(&page, vec![paragraph("x")])
            .await
            .unwrap_err();

        assert!(matches!(err, AppError::RemoteOperation { .. }));
        let calls = store.calls_of(StoreOperation::AppendChildren);
        assert_eq!(calls.len(), 1);
        assert!(!calls[0].succeeded);
        assert!(store.child_ids(&page).is_empty());
    }

    #[tokio::test]
    async fn update_merges_properties() {
        let store = MemoryStore::new();
        let page = store
            .seed(
                &Parent::Workspace,
                json!({"object": "page", "properties": {
                    "Done": {"id": "a", "type": "checkbox", "checkbox": false},
                    "Score": {"id": "b", "type": "number", "number": 1}
                }}),
            )
            .unwrap();

        store
            .update(&page, json!({"properties": {"Done": {"type": "checkbox", "checkbox": true}}}))
            .await
            .unwrap();

        let record = store.record(&page).unwrap();
        assert_eq!(record["properties"]["Done"]["checkbox"], true);
        assert_eq!(record["properties"]["Score"]["number"], 1);
    }

    #[tokio::test]
    async fn deleted_blocks_disappear_from_children() {
        let store = MemoryStore::new();
        let page = store
            .seed(
                &Parent::Workspace,
                json!({"object": "page", "properties": {}, "children": [paragraph("gone")]}),
            )
            .unwrap();
        let child = store.child_ids(&page).remove(0);

        store.delete(&child).await.unwrap();

        assert!(store.children(&page).await.unwrap().is_empty());
        assert_eq!(store.record(&child).unwrap()["archived"], true);
    }

    #[tokio::test]
    async fn missing_record_is_not_found() {
        let store = MemoryStore::new();
        let err = store.retrieve(&NotionId::generate()).await.unwrap_err();
        assert!(err.is_not_found());
    }
}
