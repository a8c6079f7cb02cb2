// src/types/rich_text.rs
//! Formatted text spans: the smallest unit of text in properties and blocks.
//!
//! The wire form is Notion's rich text object. Only `text` spans can be
//! written back; mentions and equations are read through their `plain_text`
//! so a page containing them can still be copied as plain styled text.

use super::Color;
use serde::{Deserialize, Serialize};

/// Style flags carried by every span.
#[derive(Debug, Clone, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct Annotations {
    pub bold: bool,
    pub italic: bool,
    pub strikethrough: bool,
    pub underline: bool,
    pub code: bool,
    pub color: Color,
}

/// A run of text with one set of annotations and an optional link.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(from = "RichTextWire", into = "RichTextWire")]
pub struct RichTextSpan {
    content: String,
    link: Option<String>,
    annotations: Annotations,
}

impl RichTextSpan {
    /// Create a plain, unstyled span.
    pub fn plain(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            link: None,
            annotations: Annotations::default(),
        }
    }

    pub fn with_link(mut self, url: impl Into<String>) -> Self {
        self.link = Some(url.into());
        self
    }

    pub fn with_annotations(mut self, annotations: Annotations) -> Self {
        self.annotations = annotations;
        self
    }

    pub fn content(&self) -> &str {
        &self.content
    }

    pub fn link(&self) -> Option<&str> {
        self.link.as_deref()
    }

    pub fn annotations(&self) -> &Annotations {
        &self.annotations
    }
}

/// Joins the contents of `spans` with `separator`.
pub fn join_spans(spans: &[RichTextSpan], separator: &str) -> String {
    spans
        .iter()
        .map(RichTextSpan::content)
        .collect::<Vec<_>>()
        .join(separator)
}

// --- Wire representation ---

#[derive(Debug, Clone, Serialize, Deserialize)]
struct LinkWire {
    url: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct TextWire {
    #[serde(default)]
    content: String,
    #[serde(default)]
    link: Option<LinkWire>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
struct RichTextWire {
    #[serde(rename = "type", default, skip_serializing_if = "Option::is_none")]
    kind: Option<String>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    text: Option<TextWire>,
    #[serde(default)]
    annotations: Annotations,
    #[serde(default, skip_serializing)]
    plain_text: Option<String>,
    #[serde(default, skip_serializing)]
    href: Option<String>,
}

impl From<RichTextWire> for RichTextSpan {
    fn from(wire: RichTextWire) -> Self {
        let (content, link) = match wire.text {
            Some(text) => (text.content, text.link.map(|l| l.url)),
            None => (wire.plain_text.unwrap_or_default(), None),
        };
        Self {
            content,
            link: link.or(wire.href),
            annotations: wire.annotations,
        }
    }
}

impl From<RichTextSpan> for RichTextWire {
    fn from(span: RichTextSpan) -> Self {
        Self {
            kind: Some("text".to_string()),
            text: Some(TextWire {
                content: span.content,
                link: span.link.map(|url| LinkWire { url }),
            }),
            annotations: span.annotations,
            plain_text: None,
            href: None,
        }
    }
}
