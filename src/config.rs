// src/config.rs
use crate::api::{MemoryStore, NotionHttpClient, SharedStore};
use crate::error::AppError;
use crate::error_recovery::RetryPolicy;
use crate::model::Parent;
use crate::types::{ApiKey, NotionId, ValidationError};
use clap::{Parser, Subcommand, ValueEnum};
use std::sync::Arc;

/// Parsed and validated command-line input.
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
pub struct CommandLineInput {
    #[command(subcommand)]
    pub command: Command,

    /// Enable verbose logging (debug level)
    #[arg(short, long, global = true, default_value_t = false)]
    pub verbose: bool,

    /// Work against an empty in-memory store instead of the Notion API
    #[arg(long, global = true, default_value_t = false)]
    pub offline: bool,

    /// Attempts per API request before giving up on transient failures
    #[arg(long, global = true, default_value_t = crate::constants::RETRY_MAX_ATTEMPTS)]
    pub retries: u32,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print a page's properties and top-level blocks
    Show {
        /// Notion page URL or ID
        id: String,
    },
    /// Copy a page and its whole block tree under a new parent
    Duplicate {
        /// Notion page URL or ID to copy
        source: String,
        /// Page, block or database that receives the copy
        #[arg(long = "into")]
        into: String,
        #[arg(long, value_enum, default_value_t = ParentKind::Page)]
        parent_kind: ParentKind,
    },
    /// Write a property value and push it to Notion
    Set {
        /// Notion page URL or ID
        page: String,
        /// Property name
        property: String,
        /// One value for scalar properties, several for lists
        #[arg(required = true)]
        values: Vec<String>,
    },
}

/// What kind of object a `--into` id names.
#[derive(ValueEnum, Clone, Copy, Debug, PartialEq, Eq)]
pub enum ParentKind {
    Page,
    Block,
    Database,
}

impl ParentKind {
    pub fn parent(self, id: NotionId) -> Parent {
        match self {
            ParentKind::Page => Parent::page(id),
            ParentKind::Block => Parent::block(id),
            ParentKind::Database => Parent::database(id),
        }
    }
}

/// Which store the commands run against.
#[derive(Debug, Clone)]
pub enum StoreConfig {
    Notion { api_key: ApiKey, retry: RetryPolicy },
    Offline,
}

impl StoreConfig {
    /// Resolves the store from CLI flags and the `NOTION_API_KEY` environment variable.
    pub fn resolve(cli: &CommandLineInput) -> Result<Self, AppError> {
        if cli.offline {
            return Ok(StoreConfig::Offline);
        }

        let api_key_str = std::env::var("NOTION_API_KEY").map_err(|_| {
            AppError::MissingConfiguration(
                "NOTION_API_KEY environment variable not set".to_string(),
            )
        })?;
        Self::from_key(&api_key_str, cli.retries)
    }

    fn from_key(api_key: &str, retries: u32) -> Result<Self, AppError> {
        if retries == 0 {
            return Err(ValidationError::EmptyField("retries").into());
        }
        Ok(StoreConfig::Notion {
            api_key: ApiKey::new(api_key)?,
            retry: RetryPolicy {
                max_attempts: retries,
                ..RetryPolicy::default()
            },
        })
    }

    /// Builds the configured store.
    pub fn connect(&self) -> Result<SharedStore, AppError> {
        match self {
            StoreConfig::Notion { api_key, retry } => {
                let client = NotionHttpClient::new(api_key)?.with_retry_policy(*retry);
                Ok(Arc::new(client))
            }
            StoreConfig::Offline => {
                log::warn!("Running offline: changes are kept in memory only");
                Ok(Arc::new(MemoryStore::new()))
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_duplicate_command() {
        let cli = CommandLineInput::parse_from([
            "notion-replica",
            "duplicate",
            "0123456789abcdef0123456789abcdef",
            "--into",
            "fedcba9876543210fedcba9876543210",
            "--parent-kind",
            "block",
            "--verbose",
        ]);

        assert!(cli.verbose);
        match cli.command {
            Command::Duplicate {
                source,
                into,
                parent_kind,
            } => {
                assert_eq!(source, "0123456789abcdef0123456789abcdef");
                assert_eq!(into, "fedcba9876543210fedcba9876543210");
                assert_eq!(parent_kind, ParentKind::Block);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn set_takes_several_values() {
        let cli = CommandLineInput::parse_from(["notion-replica", "set", "abc", "Tags", "A", "B"]);
        match cli.command {
            Command::Set { values, .. } => assert_eq!(values, vec!["A", "B"]),
            other => panic!("unexpected command: {other:?}"),
        }
    }

    #[test]
    fn offline_skips_api_key() {
        let cli = CommandLineInput::parse_from(["notion-replica", "--offline", "show", "abc"]);
        assert!(matches!(StoreConfig::resolve(&cli).unwrap(), StoreConfig::Offline));
    }

    #[test]
    fn api_key_is_validated() {
        assert!(StoreConfig::from_key("not-a-key", 3).is_err());
        assert!(StoreConfig::from_key("secret_abcdefghijklmnopqrs", 0).is_err());

        match StoreConfig::from_key("secret_abcdefghijklmnopqrs", 5).unwrap() {
            StoreConfig::Notion { retry, .. } => assert_eq!(retry.max_attempts, 5),
            StoreConfig::Offline => panic!("expected a Notion store"),
        }
    }
}
