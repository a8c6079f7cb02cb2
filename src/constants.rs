// src/constants.rs
//! Operational limits of the store clients.
//!
//! Each constant is named for the boundary it describes. Reading these
//! tells you how much a single request carries and how patient the HTTP
//! client is with a struggling server.

// ---------------------------------------------------------------------------
// Notion API boundaries
// ---------------------------------------------------------------------------

/// How many objects the Notion API returns per page of results.
///
/// The Notion API maximum is 100. We use the maximum to minimize
/// round-trips when loading children.
pub const NOTION_API_PAGE_SIZE: usize = 100;

/// Most blocks the Notion API accepts in one append request.
pub const NOTION_APPEND_BATCH_LIMIT: usize = 100;

/// API version sent with every request.
pub const NOTION_API_VERSION: &str = "2022-06-28";

pub const NOTION_API_BASE_URL: &str = "https://api.notion.com/v1";

// ---------------------------------------------------------------------------
// Retry policy
// ---------------------------------------------------------------------------

/// Attempts per request, including the first one.
pub const RETRY_MAX_ATTEMPTS: u32 = 3;

/// Delay before the first retry; doubles after each failure.
pub const RETRY_INITIAL_DELAY_MS: u64 = 500;

/// Upper bound on the delay between retries.
pub const RETRY_MAX_DELAY_MS: u64 = 8_000;

// ---------------------------------------------------------------------------
// Error display
// ---------------------------------------------------------------------------

/// Maximum characters shown when previewing error response bodies.
pub const ERROR_BODY_PREVIEW_LENGTH: usize = 200;
