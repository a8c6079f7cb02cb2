// src/lib.rs
//! notion-replica library: typed pages, properties and block trees for Notion,
//! with concurrent whole-page duplication.
//!
//! # Public API
//!
//! The library exposes types organized by concern:
//! - **Error handling**: `AppError`, `ValidationError`, `SubtreeFailure`
//! - **Configuration**: `CommandLineInput`, `StoreConfig`
//! - **Domain model**: `DocumentNode`, `BlockTree`, `PropertyValue`, `BlockValue`
//! - **Registries**: `PropertyTypeRegistry`, `BlockTypeRegistry`
//! - **Domain types**: `NotionId`, `ApiKey`, `RichTextSpan`, `SelectOption`, etc.
//! - **Stores**: `RemoteStore`, `NotionHttpClient`, `MemoryStore`

pub mod api;
mod config;
pub mod constants;
mod document;
mod error;
pub mod error_recovery;
pub mod model;
mod tree;
pub mod types;

// --- Error Handling ---
pub use crate::error::{
    AppError, NotionErrorCode, RecordKind, Result, StoreOperation, SubtreeFailure,
};
pub use crate::types::ValidationError;

// --- Configuration ---
pub use crate::config::{Command, CommandLineInput, ParentKind, StoreConfig};

// --- Domain Model ---
pub use crate::document::DocumentNode;
pub use crate::model::{
    BlockTypeRegistry, BlockValue, DocumentKind, Parent, PlainValue, Property,
    PropertyDescriptor, PropertyInput, PropertyTypeRegistry, PropertyValue, SharedBlockRegistry,
    READ_ONLY_TAGS,
};
pub use crate::tree::BlockTree;

// --- Domain Types ---
pub use crate::types::{
    Annotations, ApiKey, Color, DateRange, FileRef, FileSource, FormulaResult, NotionId, PageRef,
    PropertyName, RichTextSpan, RollupResult, SelectOption, UserRef,
};

// --- Stores ---
pub use crate::api::{MemoryStore, NotionHttpClient, RemoteStore, SharedStore, StoreCall};
pub use crate::error_recovery::RetryPolicy;
