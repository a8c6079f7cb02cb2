use thiserror::Error;

mod colors;
mod domain_types;
mod ids;
mod properties;
pub mod rich_text;

pub use colors::*;
pub use domain_types::*;
pub use ids::*;
pub use properties::*;
pub use rich_text::{Annotations, RichTextSpan};

#[derive(Error, Debug)]
pub enum ValidationError {
    #[error("Invalid Notion ID format: {0}")]
    InvalidId(String),

    #[error("Invalid color: {0}")]
    InvalidColor(String),

    #[error("Empty required field: {0}")]
    EmptyField(&'static str),

    #[error("Invalid API key format: {reason}")]
    InvalidApiKey { reason: String },
}
