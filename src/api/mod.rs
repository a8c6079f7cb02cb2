// src/api/mod.rs
//! The remote store boundary: the only place documents and blocks touch I/O.
//!
//! Everything above this module speaks in raw wire records (`serde_json::Value`
//! maps with a `type` discriminator) and hands them to a [`RemoteStore`].
//! Two stores ship with the crate: the Notion REST client and an in-memory
//! store for tests and offline runs.

pub mod client;
pub mod memory;

use crate::error::AppError;
use crate::model::Parent;
use crate::types::NotionId;
use serde_json::Value;
use std::sync::Arc;

/// The ability to read and write records in a hierarchical block store.
///
/// Implementations own transport, authentication and retry policy; callers
/// never retry. `append_children` returns the created records in the same
/// order as its input.
#[async_trait::async_trait]
pub trait RemoteStore: Send + Sync {
    /// Fetches a page, database or block record by id.
    async fn retrieve(&self, id: &NotionId) -> Result<Value, AppError>;

    /// Fetches every direct child block record of `block_id`, in order.
    async fn children(&self, block_id: &NotionId) -> Result<Vec<Value>, AppError>;

    /// Creates a record under `parent` and returns it with its assigned id.
    async fn create(&self, parent: &Parent, record: Value) -> Result<Value, AppError>;

    /// Applies a partial update to an existing record.
    async fn update(&self, id: &NotionId, patch: Value) -> Result<(), AppError>;

    /// Appends blocks after the existing children of `parent_id`.
    async fn append_children(
        &self,
        parent_id: &NotionId,
        blocks: Vec<Value>,
    ) -> Result<Vec<Value>, AppError>;

    /// Removes a record.
    async fn delete(&self, id: &NotionId) -> Result<(), AppError>;
}

/// A store handle that can be shared across replication tasks.
pub type SharedStore = Arc<dyn RemoteStore>;

/// Reads the id the store assigned to a returned record.
pub(crate) fn record_id(record: &Value) -> Result<NotionId, AppError> {
    let raw = record
        .get("id")
        .and_then(Value::as_str)
        .ok_or_else(|| AppError::MalformedRecord("record without an 'id'".to_string()))?;
    Ok(NotionId::parse(raw)?)
}

pub use client::NotionHttpClient;
pub use memory::{MemoryStore, StoreCall};
