//! Typed block content.
//!
//! One variant per block tag, each carrying the payload stored under that
//! tag on the wire. Identity and timestamps live on [`crate::tree::BlockTree`].

use crate::error::{AppError, RecordKind, Result};
use crate::types::rich_text::join_spans;
use crate::types::{Color, ExternalFile, FileSource, HostedFile, RichTextSpan};
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Text content shared by paragraphs, quotes, list items and toggles.
///
/// Older records store the spans under `text`; both keys decode.
#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TextBlock {
    #[serde(default, alias = "text")]
    pub rich_text: Vec<RichTextSpan>,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct HeadingBlock {
    #[serde(default, alias = "text")]
    pub rich_text: Vec<RichTextSpan>,
    #[serde(default)]
    pub color: Color,
    #[serde(default)]
    pub is_toggleable: bool,
}

/// Icon types
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "snake_case")]
pub enum Icon {
    Emoji { emoji: String },
    External { external: ExternalFile },
    File { file: HostedFile },
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct CalloutBlock {
    #[serde(default, alias = "text")]
    pub rich_text: Vec<RichTextSpan>,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub icon: Option<Icon>,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct ToDoBlock {
    #[serde(default, alias = "text")]
    pub rich_text: Vec<RichTextSpan>,
    #[serde(default)]
    pub checked: bool,
    #[serde(default)]
    pub color: Color,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CodeBlock {
    #[serde(default, alias = "text")]
    pub rich_text: Vec<RichTextSpan>,
    #[serde(default)]
    pub caption: Vec<RichTextSpan>,
    #[serde(default = "plain_text_language")]
    pub language: String,
}

fn plain_text_language() -> String {
    "plain text".to_string()
}

/// Image, video, file and pdf blocks.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MediaBlock {
    #[serde(default)]
    pub caption: Vec<RichTextSpan>,
    #[serde(flatten)]
    pub source: FileSource,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BookmarkBlock {
    pub url: String,
    #[serde(default)]
    pub caption: Vec<RichTextSpan>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EmbedBlock {
    pub url: String,
    #[serde(default)]
    pub caption: Vec<RichTextSpan>,
}

/// Title of a `child_page` or `child_database` block.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChildTitle {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct EquationBlock {
    pub expression: String,
}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct DividerBlock {}

#[derive(Debug, Clone, PartialEq, Default, Serialize, Deserialize)]
pub struct TableOfContentsBlock {
    #[serde(default)]
    pub color: Color,
}

/// Typed content of a block. The variant is the block's tag.
#[derive(Debug, Clone, PartialEq)]
pub enum BlockValue {
    Paragraph(TextBlock),
    Heading1(HeadingBlock),
    Heading2(HeadingBlock),
    Heading3(HeadingBlock),
    Callout(CalloutBlock),
    Quote(TextBlock),
    BulletedListItem(TextBlock),
    NumberedListItem(TextBlock),
    ToDo(ToDoBlock),
    Toggle(TextBlock),
    Code(CodeBlock),
    ChildPage(ChildTitle),
    ChildDatabase(ChildTitle),
    Embed(EmbedBlock),
    Image(MediaBlock),
    Video(MediaBlock),
    File(MediaBlock),
    Pdf(MediaBlock),
    Bookmark(BookmarkBlock),
    Equation(EquationBlock),
    Divider(DividerBlock),
    TableOfContents(TableOfContentsBlock),
    /// A tag added to the registry at runtime; the payload is kept as-is.
    Other { tag: String, payload: Value },
}

/// The server rejects empty text content, so builders send a single space.
fn non_empty(text: &str) -> String {
    if text.is_empty() {
        " ".to_string()
    } else {
        text.to_string()
    }
}

fn text_spans(text: &str) -> Vec<RichTextSpan> {
    vec![RichTextSpan::plain(non_empty(text))]
}

fn text_block(text: &str) -> TextBlock {
    TextBlock {
        rich_text: text_spans(text),
        color: Color::Default,
    }
}

fn heading_block(text: &str) -> HeadingBlock {
    HeadingBlock {
        rich_text: text_spans(text),
        ..HeadingBlock::default()
    }
}

fn media_block(url: &str) -> MediaBlock {
    MediaBlock {
        caption: Vec::new(),
        source: FileSource::external(url),
    }
}

impl BlockValue {
    /// Builds a block of kind `tag` from a single content string.
    ///
    /// Text-bearing kinds take the string as their text, media and link
    /// kinds take it as the URL, `equation` as the expression, and
    /// `divider`/`table_of_contents` ignore it.
    pub fn create(tag: &str, content: &str) -> Result<Self> {
        let block = match tag {
            "paragraph" => Self::paragraph(content),
            "heading_1" => Self::heading_1(content),
            "heading_2" => Self::heading_2(content),
            "heading_3" => Self::heading_3(content),
            "callout" => Self::callout(content),
            "quote" => Self::quote(content),
            "bulleted_list_item" => Self::bulleted_list_item(content),
            "numbered_list_item" => Self::numbered_list_item(content),
            "to_do" => Self::to_do(content, false),
            "toggle" => Self::toggle(content),
            "code" => Self::code(content, "plain text"),
            "child_page" => Self::child_page(content),
            "child_database" => Self::child_database(content),
            "embed" => Self::embed(content),
            "image" => Self::image(content),
            "video" => Self::video(content),
            "file" => Self::file(content),
            "pdf" => Self::pdf(content),
            "bookmark" => Self::bookmark(content),
            "equation" => Self::equation(content),
            "divider" => Self::divider(),
            "table_of_contents" => Self::table_of_contents(),
            other => {
                return Err(AppError::UnsupportedType {
                    kind: RecordKind::Block,
                    tag: other.to_string(),
                })
            }
        };
        Ok(block)
    }

    pub fn paragraph(text: &str) -> Self {
        Self::Paragraph(text_block(text))
    }

    pub fn heading_1(text: &str) -> Self {
        Self::Heading1(heading_block(text))
    }

    pub fn heading_2(text: &str) -> Self {
        Self::Heading2(heading_block(text))
    }

    pub fn heading_3(text: &str) -> Self {
        Self::Heading3(heading_block(text))
    }

    pub fn callout(text: &str) -> Self {
        Self::Callout(CalloutBlock {
            rich_text: text_spans(text),
            icon: None,
            color: Color::Default,
        })
    }

    pub fn quote(text: &str) -> Self {
        Self::Quote(text_block(text))
    }

    pub fn bulleted_list_item(text: &str) -> Self {
        Self::BulletedListItem(text_block(text))
    }

    pub fn numbered_list_item(text: &str) -> Self {
        Self::NumberedListItem(text_block(text))
    }

    pub fn to_do(text: &str, checked: bool) -> Self {
        Self::ToDo(ToDoBlock {
            rich_text: text_spans(text),
            checked,
            color: Color::Default,
        })
    }

    pub fn toggle(text: &str) -> Self {
        Self::Toggle(text_block(text))
    }

    pub fn code(text: &str, language: &str) -> Self {
        Self::Code(CodeBlock {
            rich_text: text_spans(text),
            caption: Vec::new(),
            language: language.to_string(),
        })
    }

    pub fn child_page(title: &str) -> Self {
        Self::ChildPage(ChildTitle {
            title: title.to_string(),
        })
    }

    pub fn child_database(title: &str) -> Self {
        Self::ChildDatabase(ChildTitle {
            title: title.to_string(),
        })
    }

    pub fn embed(url: &str) -> Self {
        Self::Embed(EmbedBlock {
            url: url.to_string(),
            caption: Vec::new(),
        })
    }

    pub fn image(url: &str) -> Self {
        Self::Image(media_block(url))
    }

    pub fn video(url: &str) -> Self {
        Self::Video(media_block(url))
    }

    pub fn file(url: &str) -> Self {
        Self::File(media_block(url))
    }

    pub fn pdf(url: &str) -> Self {
        Self::Pdf(media_block(url))
    }

    pub fn bookmark(url: &str) -> Self {
        Self::Bookmark(BookmarkBlock {
            url: non_empty(url),
            caption: Vec::new(),
        })
    }

    pub fn equation(expression: &str) -> Self {
        Self::Equation(EquationBlock {
            expression: expression.to_string(),
        })
    }

    pub fn divider() -> Self {
        Self::Divider(DividerBlock {})
    }

    pub fn table_of_contents() -> Self {
        Self::TableOfContents(TableOfContentsBlock::default())
    }

    /// Returns the wire tag for this block.
    pub fn tag(&self) -> &str {
        match self {
            Self::Paragraph(_) => "paragraph",
            Self::Heading1(_) => "heading_1",
            Self::Heading2(_) => "heading_2",
            Self::Heading3(_) => "heading_3",
            Self::Callout(_) => "callout",
            Self::Quote(_) => "quote",
            Self::BulletedListItem(_) => "bulleted_list_item",
            Self::NumberedListItem(_) => "numbered_list_item",
            Self::ToDo(_) => "to_do",
            Self::Toggle(_) => "toggle",
            Self::Code(_) => "code",
            Self::ChildPage(_) => "child_page",
            Self::ChildDatabase(_) => "child_database",
            Self::Embed(_) => "embed",
            Self::Image(_) => "image",
            Self::Video(_) => "video",
            Self::File(_) => "file",
            Self::Pdf(_) => "pdf",
            Self::Bookmark(_) => "bookmark",
            Self::Equation(_) => "equation",
            Self::Divider(_) => "divider",
            Self::TableOfContents(_) => "table_of_contents",
            Self::Other { tag, .. } => tag,
        }
    }

    /// The block's main text spans, for kinds that carry text.
    pub fn rich_text(&self) -> Option<&[RichTextSpan]> {
        match self {
            Self::Paragraph(b)
            | Self::Quote(b)
            | Self::BulletedListItem(b)
            | Self::NumberedListItem(b)
            | Self::Toggle(b) => Some(&b.rich_text),
            Self::Heading1(b) | Self::Heading2(b) | Self::Heading3(b) => Some(&b.rich_text),
            Self::Callout(b) => Some(&b.rich_text),
            Self::ToDo(b) => Some(&b.rich_text),
            Self::Code(b) => Some(&b.rich_text),
            _ => None,
        }
    }

    /// Single-line text rendering used for display.
    pub fn plain_text(&self) -> String {
        if let Some(spans) = self.rich_text() {
            return join_spans(spans, "");
        }
        match self {
            Self::ChildPage(child) | Self::ChildDatabase(child) => child.title.clone(),
            Self::Embed(embed) => embed.url.clone(),
            Self::Image(media) | Self::Video(media) | Self::File(media) | Self::Pdf(media) => {
                media.source.url().to_string()
            }
            Self::Bookmark(bookmark) => bookmark.url.clone(),
            Self::Equation(equation) => equation.expression.clone(),
            Self::Divider(_) => "---".to_string(),
            _ => String::new(),
        }
    }

    /// Encodes the payload stored under the tag key on the wire.
    pub fn payload(&self) -> Value {
        match self {
            Self::Paragraph(b)
            | Self::Quote(b)
            | Self::BulletedListItem(b)
            | Self::NumberedListItem(b)
            | Self::Toggle(b) => json!(b),
            Self::Heading1(b) | Self::Heading2(b) | Self::Heading3(b) => json!(b),
            Self::Callout(b) => json!(b),
            Self::ToDo(b) => json!(b),
            Self::Code(b) => json!(b),
            Self::ChildPage(b) | Self::ChildDatabase(b) => json!(b),
            Self::Embed(b) => json!(b),
            Self::Image(b) | Self::Video(b) | Self::File(b) | Self::Pdf(b) => json!(b),
            Self::Bookmark(b) => json!(b),
            Self::Equation(b) => json!(b),
            Self::Divider(b) => json!(b),
            Self::TableOfContents(b) => json!(b),
            Self::Other { payload, .. } => payload.clone(),
        }
    }

    /// Encodes the block as a creatable record: `{"object", "type", <tag>}`.
    pub fn to_raw(&self) -> Value {
        let mut record = serde_json::Map::new();
        record.insert("object".to_string(), json!("block"));
        record.insert("type".to_string(), json!(self.tag()));
        record.insert(self.tag().to_string(), self.payload());
        Value::Object(record)
    }

    /// A copy the store will accept as new content.
    ///
    /// Hosted files carry expiring URLs that cannot be uploaded back, so
    /// media sources and callout icons are re-pointed as external links.
    pub fn to_writable(&self) -> Self {
        match self {
            Self::Image(media) => Self::Image(writable_media(media)),
            Self::Video(media) => Self::Video(writable_media(media)),
            Self::File(media) => Self::File(writable_media(media)),
            Self::Pdf(media) => Self::Pdf(writable_media(media)),
            Self::Callout(callout) => {
                let mut callout = callout.clone();
                if let Some(Icon::File { file }) = &callout.icon {
                    callout.icon = Some(Icon::External {
                        external: ExternalFile {
                            url: file.url.clone(),
                        },
                    });
                }
                Self::Callout(callout)
            }
            other => other.clone(),
        }
    }
}

fn writable_media(media: &MediaBlock) -> MediaBlock {
    MediaBlock {
        caption: media.caption.clone(),
        source: media.source.to_writable(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::model::BlockTypeRegistry;
    use pretty_assertions::assert_eq;

    #[test]
    fn empty_paragraph_gets_single_space() {
        let block = BlockValue::create("paragraph", "").unwrap();
        let raw = block.to_raw();
        assert_eq!(raw["paragraph"]["rich_text"][0]["text"]["content"], " ");
    }

    #[test]
    fn every_text_builder_substitutes_space() {
        for tag in [
            "paragraph",
            "heading_1",
            "heading_2",
            "heading_3",
            "quote",
            "callout",
            "bulleted_list_item",
            "numbered_list_item",
            "to_do",
            "toggle",
            "code",
        ] {
            let block = BlockValue::create(tag, "").unwrap();
            let spans = block.rich_text().unwrap();
            assert_eq!(spans[0].content(), " ", "tag {tag}");
        }
        assert_eq!(BlockValue::bookmark("").plain_text(), " ");
    }

    #[test]
    fn to_do_defaults_unchecked() {
        let raw = BlockValue::create("to_do", "buy milk").unwrap().to_raw();
        assert_eq!(raw["to_do"]["checked"], false);
        assert_eq!(raw["type"], "to_do");
        assert_eq!(raw["object"], "block");
    }

    #[test]
    fn unknown_tag_is_unsupported() {
        let err = BlockValue::create("synced_block", "x").unwrap_err();
        assert!(matches!(
            err,
            AppError::UnsupportedType { kind: RecordKind::Block, .. }
        ));
    }

    #[test]
    fn embed_caption_survives_a_copy() {
        let raw = json!({
            "type": "embed",
            "embed": {
                "url": "https://example.com/board",
                "caption": [{"type": "text", "text": {"content": "Roadmap"}}]
            }
        });
        let block = BlockTypeRegistry::standard().build(&raw).unwrap();

        let copied = block.to_writable().to_raw();
        assert_eq!(copied["embed"]["url"], "https://example.com/board");
        assert_eq!(copied["embed"]["caption"][0]["text"]["content"], "Roadmap");
        assert_eq!(BlockValue::embed("https://example.com").to_raw()["embed"]["caption"], json!([]));
    }

    #[test]
    fn image_payload_is_external() {
        let raw = BlockValue::image("https://example.com/a.png").to_raw();
        assert_eq!(
            raw["image"],
            json!({"caption": [], "type": "external", "external": {"url": "https://example.com/a.png"}})
        );
    }

    #[test]
    fn hosted_media_becomes_external_when_copied() {
        let block = BlockValue::Pdf(MediaBlock {
            caption: Vec::new(),
            source: FileSource::File {
                file: HostedFile {
                    url: "https://s3/x.pdf".to_string(),
                    expiry_time: Some("2024-01-01T00:00:00.000Z".to_string()),
                },
            },
        });
        assert_eq!(block.to_writable(), BlockValue::pdf("https://s3/x.pdf"));
    }

    #[test]
    fn plain_text_projection() {
        assert_eq!(BlockValue::heading_2("Intro").plain_text(), "Intro");
        assert_eq!(BlockValue::equation("e=mc^2").plain_text(), "e=mc^2");
        assert_eq!(BlockValue::divider().plain_text(), "---");
    }
}
