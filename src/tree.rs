// src/tree.rs
//! Block trees: lazy loading and concurrent duplication.
//!
//! A [`BlockTree`] is one block plus its identity metadata and, once loaded,
//! its children. Children are fetched on first access and kept, so walking a
//! tree twice costs one remote call per node.
//!
//! Duplication stages each level of the tree: the parent is created first,
//! then all of its immediate children in one ordered append, and only then
//! does every child's subtree replicate on its own task. Parent-before-child
//! and sibling order follow from that staging alone.

use crate::api::{record_id, SharedStore};
use crate::error::{AppError, Result};
use crate::model::{BlockTypeRegistry, BlockValue, Parent, SharedBlockRegistry};
use crate::types::NotionId;
use chrono::{DateTime, Utc};
use futures::future::{join_all, BoxFuture};
use futures::FutureExt;
use serde_json::Value;

/// A block with its identity metadata and lazily loaded children.
#[derive(Debug, Clone, PartialEq)]
pub struct BlockTree {
    pub id: Option<NotionId>,
    pub block: BlockValue,
    pub has_children: bool,
    pub created_time: Option<DateTime<Utc>>,
    pub last_edited_time: Option<DateTime<Utc>>,
    pub archived: bool,
    /// `None` until loaded; authored trees carry their children from the start.
    pub children: Option<Vec<BlockTree>>,
    /// Decodes children on load; inherited by loaded children and copies.
    registry: SharedBlockRegistry,
}

impl BlockTree {
    /// A locally authored block with no remote identity yet.
    pub fn new(block: BlockValue) -> Self {
        Self {
            id: None,
            block,
            has_children: false,
            created_time: None,
            last_edited_time: None,
            archived: false,
            children: None,
            registry: BlockTypeRegistry::shared(),
        }
    }

    /// Adds a locally authored child.
    pub fn with_child(mut self, child: BlockTree) -> Self {
        self.push_child(child);
        self
    }

    pub fn push_child(&mut self, child: BlockTree) {
        self.has_children = true;
        self.children.get_or_insert_with(Vec::new).push(child);
    }

    /// Decodes a block record returned by the store.
    pub fn from_raw(raw: &Value) -> Result<Self> {
        Self::from_raw_with(&BlockTypeRegistry::shared(), raw)
    }

    /// Decodes with `registry`, which the whole subtree then loads through.
    pub fn from_raw_with(registry: &SharedBlockRegistry, raw: &Value) -> Result<Self> {
        let block = registry.build(raw)?;
        let id = match raw.get("id").and_then(Value::as_str) {
            Some(id) => Some(NotionId::parse(id)?),
            None => None,
        };
        Ok(Self {
            id,
            block,
            has_children: raw
                .get("has_children")
                .and_then(Value::as_bool)
                .unwrap_or(false),
            created_time: timestamp(raw, "created_time"),
            last_edited_time: timestamp(raw, "last_edited_time"),
            archived: raw.get("archived").and_then(Value::as_bool).unwrap_or(false),
            children: None,
            registry: registry.clone(),
        })
    }

    pub fn registry(&self) -> &BlockTypeRegistry {
        &self.registry
    }

    /// Loaded children, if any have been loaded or authored.
    pub fn loaded_children(&self) -> Option<&[BlockTree]> {
        self.children.as_deref()
    }

    /// Returns the children, fetching them on first access.
    ///
    /// No remote call is made when the block reports no children, or when
    /// it has no id and nothing was authored locally.
    pub async fn get_children(&mut self, store: &SharedStore) -> Result<&mut Vec<BlockTree>> {
        if self.children.is_none() {
            let loaded = match (&self.id, self.has_children) {
                (Some(id), true) => {
                    log::debug!("Loading children of block {}", id);
                    let registry = &self.registry;
                    store
                        .children(id)
                        .await?
                        .iter()
                        .map(|raw| BlockTree::from_raw_with(registry, raw))
                        .collect::<Result<Vec<_>>>()?
                }
                _ => Vec::new(),
            };
            self.children = Some(loaded);
        }
        Ok(self.children.get_or_insert_with(Vec::new))
    }

    /// Content-only clone: identity, timestamps and archive state are left
    /// behind, children are not carried over.
    pub fn structural_copy(&self) -> Self {
        Self {
            registry: self.registry.clone(),
            ..Self::new(self.block.to_writable())
        }
    }

    /// Encodes the block for a create call.
    pub fn to_raw(&self) -> Value {
        self.block.to_raw()
    }

    /// Encodes the block with every locally held descendant nested inside
    /// its payload, for stores that create whole trees in one request.
    pub fn to_raw_nested(&self) -> Value {
        let mut raw = self.block.to_raw();
        if let Some(children) = self.children.as_ref().filter(|c| !c.is_empty()) {
            let nested: Vec<Value> = children.iter().map(BlockTree::to_raw_nested).collect();
            if let Some(Value::Object(payload)) = raw.get_mut(self.block.tag()) {
                payload.insert("children".to_string(), Value::Array(nested));
            }
        }
        raw
    }

    /// Adopts the identity the store assigned to a freshly created copy.
    pub(crate) fn adopt(&mut self, record: &Value) -> Result<()> {
        self.id = Some(record_id(record)?);
        self.created_time = timestamp(record, "created_time");
        self.last_edited_time = timestamp(record, "last_edited_time");
        Ok(())
    }

    /// Number of nodes in the loaded part of the tree, this one included.
    pub fn node_count(&self) -> usize {
        1 + self
            .children
            .iter()
            .flatten()
            .map(BlockTree::node_count)
            .sum::<usize>()
    }

    /// Fully loads the subtree below this block.
    pub fn load_all<'a>(&'a mut self, store: &'a SharedStore) -> BoxFuture<'a, Result<()>> {
        async move {
            for child in self.get_children(store).await?.iter_mut() {
                child.load_all(store).await?;
            }
            Ok(())
        }
        .boxed()
    }

    /// Copies this block and its whole subtree under `target`.
    ///
    /// Returns the new tree, fully materialized with the ids the store
    /// assigned. Children loaded along the way stay cached in `self`.
    pub async fn duplicate(&mut self, store: &SharedStore, target: &Parent) -> Result<BlockTree> {
        let mut copy = self.structural_copy();
        let created = store.create(target, copy.to_raw()).await?;
        copy.adopt(&created)?;
        log::info!(
            "Created copy {} of block {}",
            copy.id.as_ref().map_or("?", NotionId::as_str),
            self.id.as_ref().map_or("(local)", NotionId::as_str)
        );

        let children = replicate_children(self, &copy, store.clone()).await?;
        copy.has_children = !children.is_empty();
        copy.children = Some(children);
        Ok(copy)
    }
}

/// Replicates the children of `source` under the already created `copy`.
///
/// One ordered append creates every immediate child; each child's subtree
/// then replicates on its own task. Branch failures are collected once all
/// siblings have finished and returned as a single aggregate.
pub(crate) fn replicate_children<'a>(
    source: &'a mut BlockTree,
    copy: &'a BlockTree,
    store: SharedStore,
) -> BoxFuture<'a, Result<Vec<BlockTree>>> {
    async move {
        let new_parent = copy.id.clone().ok_or_else(|| AppError::InternalError {
            message: "replicating under a copy that was never created".to_string(),
            source: None,
        })?;

        let children = source.get_children(&store).await?;
        if children.is_empty() {
            return Ok(Vec::new());
        }

        let copies = append_copies(&store, &new_parent, children).await?;
        fan_out(children, copies, store).await
    }
    .boxed()
}

/// Creates copies of `children` under `parent` in one ordered call.
pub(crate) async fn append_copies(
    store: &SharedStore,
    parent: &NotionId,
    children: &[BlockTree],
) -> Result<Vec<BlockTree>> {
    let mut copies: Vec<BlockTree> = children.iter().map(BlockTree::structural_copy).collect();
    let created = store
        .append_children(parent, copies.iter().map(BlockTree::to_raw).collect())
        .await?;

    if created.len() != copies.len() {
        return Err(AppError::MalformedRecord(format!(
            "append under {} returned {} records for {} blocks",
            parent,
            created.len(),
            copies.len()
        )));
    }

    for (copy, record) in copies.iter_mut().zip(&created) {
        copy.adopt(record)?;
    }
    log::debug!("Appended {} copies under {}", copies.len(), parent);
    Ok(copies)
}

/// Replicates each source child's subtree under its copy, one task per child.
///
/// Every task works on its own clone of the source child; clones that come
/// back are written over `sources` so their loaded children stay cached.
/// Returns the finished copies in source order.
pub(crate) async fn fan_out(
    sources: &mut [BlockTree],
    copies: Vec<BlockTree>,
    store: SharedStore,
) -> Result<Vec<BlockTree>> {
    let handles: Vec<_> = sources
        .iter()
        .cloned()
        .zip(copies)
        .map(|(mut source, mut copy)| {
            let store = store.clone();
            tokio::spawn(async move {
                let outcome = replicate_children(&mut source, &copy, store)
                    .await
                    .map(|children| {
                        copy.has_children = !children.is_empty();
                        copy.children = Some(children);
                        copy
                    });
                (source, outcome)
            })
        })
        .collect();

    let mut finished = Vec::with_capacity(sources.len());
    let mut failures = Vec::new();

    for (index, joined) in join_all(handles).await.into_iter().enumerate() {
        let source_id = branch_name(&sources[index], index);
        match joined {
            Ok((loaded, outcome)) => {
                sources[index] = loaded;
                match outcome {
                    Ok(copy) => finished.push(copy),
                    Err(error) => {
                        log::warn!("Replication of {} failed: {}", source_id, error);
                        error.collect_into(&source_id, &mut failures);
                    }
                }
            }
            Err(join_error) => {
                log::warn!("Replication task for {} panicked: {}", source_id, join_error);
                AppError::TaskPanicked(join_error.to_string())
                    .collect_into(&source_id, &mut failures);
            }
        }
    }

    if failures.is_empty() {
        Ok(finished)
    } else {
        Err(AppError::DuplicationIncomplete { failures })
    }
}

/// Appends the locally authored children of an already created block.
///
/// Each parent's new children go out in one ordered call, and a child's own
/// children only after it has received its id.
pub(crate) fn publish_authored_children<'a>(
    block: &'a mut BlockTree,
    store: &'a SharedStore,
) -> BoxFuture<'a, Result<()>> {
    async move {
        let (Some(parent_id), Some(children)) = (block.id.clone(), block.children.as_mut()) else {
            return Ok(());
        };
        publish_blocks(&parent_id, children, store).await?;
        Ok(())
    }
    .boxed()
}

/// Appends the blocks of `blocks` that have no id yet under `parent_id`, in
/// one ordered call, then publishes authored descendants of every block.
///
/// Blocks that already carry an id are not resent, so calling this again
/// after a failure only sends what is still missing. Returns the number of
/// blocks appended directly under `parent_id`.
pub(crate) async fn publish_blocks(
    parent_id: &NotionId,
    blocks: &mut [BlockTree],
    store: &SharedStore,
) -> Result<usize> {
    let fresh: Vec<usize> = blocks
        .iter()
        .enumerate()
        .filter(|(_, block)| block.id.is_none())
        .map(|(index, _)| index)
        .collect();

    if !fresh.is_empty() {
        let records = fresh.iter().map(|&index| blocks[index].to_raw()).collect();
        let created = store.append_children(parent_id, records).await?;
        if created.len() != fresh.len() {
            return Err(AppError::MalformedRecord(format!(
                "append under {} returned {} records for {} blocks",
                parent_id,
                created.len(),
                fresh.len()
            )));
        }
        for (&index, record) in fresh.iter().zip(&created) {
            blocks[index].adopt(record)?;
        }
    }

    for block in blocks.iter_mut() {
        publish_authored_children(block, store).await?;
    }
    Ok(fresh.len())
}

fn branch_name(source: &BlockTree, index: usize) -> String {
    source
        .id
        .as_ref()
        .map(NotionId::to_hyphenated)
        .unwrap_or_else(|| format!("child #{}", index))
}

fn timestamp(raw: &Value, key: &str) -> Option<DateTime<Utc>> {
    raw.get(key)
        .and_then(Value::as_str)
        .and_then(|s| DateTime::parse_from_rfc3339(s).ok())
        .map(|t| t.with_timezone(&Utc))
}
