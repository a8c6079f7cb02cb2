// src/api/client.rs
//! HTTP client for the Notion REST API.
//!
//! A thin wrapper around reqwest that handles authentication, pagination,
//! append batching and retries of transient failures. Payloads pass through
//! untouched; decoding happens in the model layer.

use super::RemoteStore;
use crate::constants::{
    ERROR_BODY_PREVIEW_LENGTH, NOTION_API_BASE_URL, NOTION_API_PAGE_SIZE, NOTION_API_VERSION,
    NOTION_APPEND_BATCH_LIMIT,
};
use crate::error::{AppError, NotionErrorCode, StoreOperation};
use crate::error_recovery::{retry_with_backoff, RetryPolicy};
use crate::model::Parent;
use crate::types::{ApiKey, NotionId};
use reqwest::{header, Client, Method, Response};
use serde_json::{json, Value};

/// A Notion API client implementing [`RemoteStore`].
#[derive(Clone)]
pub struct NotionHttpClient {
    client: Client,
    base_url: String,
    retry: RetryPolicy,
}

impl NotionHttpClient {
    /// Creates a new HTTP client with Notion API authentication.
    pub fn new(api_key: &ApiKey) -> Result<Self, AppError> {
        let client = Client::builder()
            .default_headers(Self::create_headers(api_key)?)
            .build()?;
        Ok(Self {
            client,
            base_url: NOTION_API_BASE_URL.to_string(),
            retry: RetryPolicy::default(),
        })
    }

    pub fn with_retry_policy(mut self, retry: RetryPolicy) -> Self {
        self.retry = retry;
        self
    }

    /// Points the client at another API root (a proxy or a test server).
    pub fn with_base_url(mut self, base_url: impl Into<String>) -> Self {
        self.base_url = base_url.into().trim_end_matches('/').to_string();
        self
    }

    /// Creates the default headers for Notion API requests.
    fn create_headers(api_key: &ApiKey) -> Result<header::HeaderMap, AppError> {
        let mut headers = header::HeaderMap::new();

        let auth_header = format!("Bearer {}", api_key.as_str());
        headers.insert(
            header::AUTHORIZATION,
            header::HeaderValue::from_str(&auth_header).map_err(|e| {
                AppError::MissingConfiguration(format!("Invalid API token format: {}", e))
            })?,
        );

        headers.insert(
            "Notion-Version",
            header::HeaderValue::from_static(NOTION_API_VERSION),
        );

        headers.insert(
            header::CONTENT_TYPE,
            header::HeaderValue::from_static("application/json"),
        );

        Ok(headers)
    }

    /// Sends one request and decodes the JSON body, retrying transient failures.
    async fn send(
        &self,
        operation: StoreOperation,
        target: &str,
        method: Method,
        endpoint: &str,
        body: Option<&Value>,
    ) -> Result<Value, AppError> {
        let url = format!("{}/{}", self.base_url, endpoint);
        retry_with_backoff(
            || {
                let request = self.client.request(method.clone(), &url);
                let request = match body {
                    Some(body) => request.json(body),
                    None => request,
                };
                let url = &url;
                let method = &method;
                async move {
                    log::debug!("{} {}", method, url);
                    let response = request.send().await?;
                    decode_response(operation, target, response).await
                }
            },
            self.retry,
        )
        .await
    }

    async fn get(&self, operation: StoreOperation, target: &str, endpoint: &str) -> Result<Value, AppError> {
        self.send(operation, target, Method::GET, endpoint, None).await
    }

    async fn post(
        &self,
        operation: StoreOperation,
        target: &str,
        endpoint: &str,
        body: &Value,
    ) -> Result<Value, AppError> {
        self.send(operation, target, Method::POST, endpoint, Some(body)).await
    }

    async fn patch(
        &self,
        operation: StoreOperation,
        target: &str,
        endpoint: &str,
        body: &Value,
    ) -> Result<Value, AppError> {
        self.send(operation, target, Method::PATCH, endpoint, Some(body)).await
    }

    /// Endpoint family (`pages`, `databases`, `blocks`) that owns `id`.
    async fn locate(&self, id: &NotionId) -> Result<&'static str, AppError> {
        let value = self.retrieve(id).await?;
        match value.get("object").and_then(Value::as_str) {
            Some("page") => Ok("pages"),
            Some("database") => Ok("databases"),
            _ => Ok("blocks"),
        }
    }
}

#[async_trait::async_trait]
impl RemoteStore for NotionHttpClient {
    async fn retrieve(&self, id: &NotionId) -> Result<Value, AppError> {
        let target = id.to_hyphenated();

        // Try page first (most common), then database, then block
        for family in ["pages", "databases"] {
            match self
                .get(StoreOperation::Retrieve, &target, &format!("{}/{}", family, target))
                .await
            {
                Ok(value) => return Ok(value),
                Err(e) if e.is_not_found() || is_wrong_family(&e) => {
                    log::debug!("{} is not in {}: {}", target, family, e);
                }
                Err(e) => return Err(e),
            }
        }

        self.get(StoreOperation::Retrieve, &target, &format!("blocks/{}", target))
            .await
    }

    async fn children(&self, block_id: &NotionId) -> Result<Vec<Value>, AppError> {
        let target = block_id.to_hyphenated();
        let mut items = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut endpoint = format!(
                "blocks/{}/children?page_size={}",
                target, NOTION_API_PAGE_SIZE
            );
            if let Some(cursor) = &cursor {
                endpoint.push_str(&format!("&start_cursor={}", cursor));
            }

            let page = self.get(StoreOperation::Children, &target, &endpoint).await?;
            items.extend(results_of(&page)?);

            cursor = match (page.get("has_more").and_then(Value::as_bool), page.get("next_cursor")) {
                (Some(true), Some(Value::String(next))) => Some(next.clone()),
                _ => break,
            };
        }

        log::debug!("Loaded {} children of {}", items.len(), target);
        Ok(items)
    }

    async fn create(&self, parent: &Parent, record: Value) -> Result<Value, AppError> {
        let target = parent.to_string();
        match record.get("object").and_then(Value::as_str) {
            Some("block") => {
                let parent_id = parent.id().ok_or_else(|| {
                    AppError::remote(
                        StoreOperation::Create,
                        &target,
                        None,
                        "a block cannot be created at the workspace root",
                    )
                })?;
                let mut created = self.append_children(parent_id, vec![record]).await?;
                created.pop().ok_or_else(|| {
                    AppError::MalformedRecord("append returned no block".to_string())
                })
            }
            kind => {
                let family = if kind == Some("database") { "databases" } else { "pages" };
                let mut body = record;
                if let Value::Object(map) = &mut body {
                    map.remove("object");
                    map.insert("parent".to_string(), parent_body(parent)?);
                }
                self.post(StoreOperation::Create, &target, family, &body).await
            }
        }
    }

    async fn update(&self, id: &NotionId, patch: Value) -> Result<(), AppError> {
        let target = id.to_hyphenated();
        let family = self.locate(id).await?;
        self.patch(
            StoreOperation::Update,
            &target,
            &format!("{}/{}", family, target),
            &patch,
        )
        .await?;
        Ok(())
    }

    async fn append_children(
        &self,
        parent_id: &NotionId,
        blocks: Vec<Value>,
    ) -> Result<Vec<Value>, AppError> {
        let target = parent_id.to_hyphenated();
        let endpoint = format!("blocks/{}/children", target);
        let mut created = Vec::with_capacity(blocks.len());

        // The API caps a single append; chunks go out in order so the
        // concatenated result lines up with the input.
        for chunk in blocks.chunks(NOTION_APPEND_BATCH_LIMIT) {
            let body = json!({ "children": chunk });
            let response = self
                .patch(StoreOperation::AppendChildren, &target, &endpoint, &body)
                .await?;
            created.extend(results_of(&response)?);
        }

        Ok(created)
    }

    async fn delete(&self, id: &NotionId) -> Result<(), AppError> {
        let target = id.to_hyphenated();
        self.send(
            StoreOperation::Delete,
            &target,
            Method::DELETE,
            &format!("blocks/{}", target),
            None,
        )
        .await?;
        Ok(())
    }
}

/// The page returns `validation_error` when asked for a database id and vice versa.
fn is_wrong_family(error: &AppError) -> bool {
    matches!(
        error,
        AppError::RemoteOperation {
            code: Some(NotionErrorCode::ValidationFailed),
            ..
        }
    )
}

fn parent_body(parent: &Parent) -> Result<Value, AppError> {
    match parent {
        Parent::Workspace => Ok(json!({"type": "workspace", "workspace": true})),
        other => Ok(serde_json::to_value(other)?),
    }
}

fn results_of(page: &Value) -> Result<Vec<Value>, AppError> {
    page.get("results")
        .and_then(Value::as_array)
        .cloned()
        .ok_or_else(|| AppError::MalformedRecord("list response without 'results'".to_string()))
}

/// Turns a response into its JSON body, or into a classified store failure.
async fn decode_response(
    operation: StoreOperation,
    target: &str,
    response: Response,
) -> Result<Value, AppError> {
    let status = response.status();
    let text = response.text().await?;

    if status.is_success() {
        if text.trim().is_empty() {
            return Ok(Value::Null);
        }
        return Ok(serde_json::from_str(&text)?);
    }

    let body: Option<Value> = serde_json::from_str(&text).ok();
    let code = body
        .as_ref()
        .and_then(|b| b.get("code"))
        .and_then(Value::as_str)
        .map(NotionErrorCode::from_api_response)
        .unwrap_or_else(|| NotionErrorCode::from_http_status(status.as_u16()));
    let message = body
        .as_ref()
        .and_then(|b| b.get("message"))
        .and_then(Value::as_str)
        .map(str::to_string)
        .unwrap_or_else(|| text.chars().take(ERROR_BODY_PREVIEW_LENGTH).collect());

    log::warn!("{} on {} failed with {} ({})", operation, target, status, code);
    Err(AppError::remote(operation, target, Some(code), message))
}
