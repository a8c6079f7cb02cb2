use crate::error::AppError;
use crate::types::rich_text::join_spans;
use crate::types::*;
use serde_json::{json, Value};
use std::fmt;

/// Tags whose values are computed by the server and never written back.
pub const READ_ONLY_TAGS: [&str; 4] = [
    "created_by",
    "created_time",
    "last_edited_by",
    "last_edited_time",
];

/// A typed property value. The variant is the property's tag.
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyValue {
    Title(Vec<RichTextSpan>),
    RichText(Vec<RichTextSpan>),
    Number(Option<f64>),
    Select(Option<SelectOption>),
    MultiSelect(Vec<SelectOption>),
    Status(Option<SelectOption>),
    Date(Option<DateRange>),
    People(Vec<UserRef>),
    Files(Vec<FileRef>),
    Checkbox(bool),
    Url(Option<String>),
    Email(Option<String>),
    PhoneNumber(Option<String>),
    Formula(FormulaResult),
    Relation(Vec<PageRef>),
    Rollup(RollupResult),
    CreatedBy(UserRef),
    CreatedTime(chrono::DateTime<chrono::Utc>),
    LastEditedBy(UserRef),
    LastEditedTime(chrono::DateTime<chrono::Utc>),
    /// A tag added to the registry at runtime; the payload is kept as-is.
    Other { tag: String, payload: Value },
}

/// Plain projection of a property value for read use.
#[derive(Debug, Clone, PartialEq)]
pub enum PlainValue {
    Text(String),
    Number(f64),
    Bool(bool),
    Empty,
    Raw(Value),
}

impl PlainValue {
    pub fn as_text(&self) -> Option<&str> {
        match self {
            PlainValue::Text(text) => Some(text),
            _ => None,
        }
    }

    pub fn is_empty(&self) -> bool {
        matches!(self, PlainValue::Empty)
    }
}

impl fmt::Display for PlainValue {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            PlainValue::Text(text) => write!(f, "{}", text),
            PlainValue::Number(n) => write!(f, "{}", n),
            PlainValue::Bool(b) => write!(f, "{}", b),
            PlainValue::Empty => Ok(()),
            PlainValue::Raw(value) => write!(f, "{}", value),
        }
    }
}

impl PartialEq<&str> for PlainValue {
    fn eq(&self, other: &&str) -> bool {
        self.as_text() == Some(*other)
    }
}

/// Loosely typed input accepted by [`PropertyValue::insert`].
#[derive(Debug, Clone, PartialEq)]
pub enum PropertyInput {
    Text(String),
    List(Vec<String>),
    Integer(i64),
    Float(f64),
    Bool(bool),
}

impl PropertyInput {
    fn describe(&self) -> &'static str {
        match self {
            PropertyInput::Text(_) => "a string",
            PropertyInput::List(_) => "a list",
            PropertyInput::Integer(_) => "an integer",
            PropertyInput::Float(_) => "a float",
            PropertyInput::Bool(_) => "a boolean",
        }
    }
}

impl From<&str> for PropertyInput {
    fn from(s: &str) -> Self {
        PropertyInput::Text(s.to_string())
    }
}

impl From<String> for PropertyInput {
    fn from(s: String) -> Self {
        PropertyInput::Text(s)
    }
}

impl From<Vec<String>> for PropertyInput {
    fn from(items: Vec<String>) -> Self {
        PropertyInput::List(items)
    }
}

impl From<Vec<&str>> for PropertyInput {
    fn from(items: Vec<&str>) -> Self {
        PropertyInput::List(items.into_iter().map(str::to_string).collect())
    }
}

impl<const N: usize> From<[&str; N]> for PropertyInput {
    fn from(items: [&str; N]) -> Self {
        PropertyInput::List(items.iter().map(|s| s.to_string()).collect())
    }
}

impl From<i32> for PropertyInput {
    fn from(n: i32) -> Self {
        PropertyInput::Integer(n.into())
    }
}

impl From<i64> for PropertyInput {
    fn from(n: i64) -> Self {
        PropertyInput::Integer(n)
    }
}

impl From<f64> for PropertyInput {
    fn from(n: f64) -> Self {
        PropertyInput::Float(n)
    }
}

impl From<bool> for PropertyInput {
    fn from(b: bool) -> Self {
        PropertyInput::Bool(b)
    }
}

impl PropertyValue {
    /// Returns the wire tag for this property value.
    pub fn tag(&self) -> &str {
        match self {
            PropertyValue::Title(_) => "title",
            PropertyValue::RichText(_) => "rich_text",
            PropertyValue::Number(_) => "number",
            PropertyValue::Select(_) => "select",
            PropertyValue::MultiSelect(_) => "multi_select",
            PropertyValue::Status(_) => "status",
            PropertyValue::Date(_) => "date",
            PropertyValue::People(_) => "people",
            PropertyValue::Files(_) => "files",
            PropertyValue::Checkbox(_) => "checkbox",
            PropertyValue::Url(_) => "url",
            PropertyValue::Email(_) => "email",
            PropertyValue::PhoneNumber(_) => "phone_number",
            PropertyValue::Formula(_) => "formula",
            PropertyValue::Relation(_) => "relation",
            PropertyValue::Rollup(_) => "rollup",
            PropertyValue::CreatedBy(_) => "created_by",
            PropertyValue::CreatedTime(_) => "created_time",
            PropertyValue::LastEditedBy(_) => "last_edited_by",
            PropertyValue::LastEditedTime(_) => "last_edited_time",
            PropertyValue::Other { tag, .. } => tag,
        }
    }

    pub fn is_read_only(&self) -> bool {
        READ_ONLY_TAGS.contains(&self.tag())
    }

    /// Whether the value can be sent on create or update.
    ///
    /// Server-computed values (timestamps, authors, formulas and rollups)
    /// are rejected by the API.
    pub fn is_writable(&self) -> bool {
        !self.is_read_only()
            && !matches!(self, PropertyValue::Formula(_) | PropertyValue::Rollup(_))
    }

    /// A copy the store will accept on create; hosted files become external links.
    pub fn to_writable(&self) -> Self {
        match self {
            PropertyValue::Files(files) => PropertyValue::Files(
                files
                    .iter()
                    .map(|file| FileRef {
                        name: file.name.clone(),
                        source: file.source.to_writable(),
                    })
                    .collect(),
            ),
            other => other.clone(),
        }
    }

    /// True for a `rich_text` value whose first span is empty (or which has no spans).
    pub fn is_blank_rich_text(&self) -> bool {
        match self {
            PropertyValue::RichText(spans) => {
                spans.first().map_or(true, |span| span.content().is_empty())
            }
            _ => false,
        }
    }

    /// Projects the typed payload onto a plain value for reading.
    pub fn extract(&self) -> PlainValue {
        match self {
            PropertyValue::Title(spans) | PropertyValue::RichText(spans) => {
                PlainValue::Text(join_spans(spans, ","))
            }
            PropertyValue::Number(n) => n.map_or(PlainValue::Empty, PlainValue::Number),
            PropertyValue::Select(option) | PropertyValue::Status(option) => option
                .as_ref()
                .map_or(PlainValue::Empty, |o| PlainValue::Text(o.name.clone())),
            PropertyValue::MultiSelect(options) => PlainValue::Text(
                options
                    .iter()
                    .map(|o| o.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            PropertyValue::Date(date) => date
                .as_ref()
                .map_or(PlainValue::Empty, |d| PlainValue::Text(d.to_string())),
            PropertyValue::People(people) => PlainValue::Text(join_display(people)),
            PropertyValue::Files(files) => PlainValue::Text(
                files
                    .iter()
                    .map(|f| f.name.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            PropertyValue::Checkbox(checked) => PlainValue::Bool(*checked),
            PropertyValue::Url(s) | PropertyValue::Email(s) | PropertyValue::PhoneNumber(s) => s
                .as_ref()
                .map_or(PlainValue::Empty, |s| PlainValue::Text(s.clone())),
            PropertyValue::Formula(result) => extract_formula(result),
            PropertyValue::Relation(pages) => PlainValue::Text(
                pages
                    .iter()
                    .map(|p| p.id.as_str())
                    .collect::<Vec<_>>()
                    .join(", "),
            ),
            PropertyValue::Rollup(result) => extract_rollup(result),
            PropertyValue::CreatedBy(user) | PropertyValue::LastEditedBy(user) => {
                PlainValue::Text(user.to_string())
            }
            PropertyValue::CreatedTime(time) | PropertyValue::LastEditedTime(time) => {
                PlainValue::Text(time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            }
            PropertyValue::Other { payload, .. } => PlainValue::Raw(payload.clone()),
        }
    }

    /// Replaces the payload with `value`, validating its shape against the tag.
    pub fn insert(&mut self, value: impl Into<PropertyInput>) -> Result<(), AppError> {
        let value = value.into();
        let tag = self.tag().to_string();

        match (&mut *self, value) {
            (PropertyValue::Title(spans), PropertyInput::Text(text))
            | (PropertyValue::RichText(spans), PropertyInput::Text(text)) => {
                *spans = vec![RichTextSpan::plain(text)];
            }
            (PropertyValue::Select(option), PropertyInput::Text(name))
            | (PropertyValue::Status(option), PropertyInput::Text(name)) => {
                *option = Some(SelectOption::named(name));
            }
            (PropertyValue::MultiSelect(options), PropertyInput::List(names)) => {
                *options = names.into_iter().map(SelectOption::named).collect();
            }
            (PropertyValue::Number(number), PropertyInput::Integer(n)) => {
                *number = Some(n as f64);
            }
            (PropertyValue::Number(number), PropertyInput::Float(n)) => {
                *number = Some(n);
            }
            (PropertyValue::Date(date), PropertyInput::Text(start)) => {
                *date = Some(DateRange::new(start, None));
            }
            (PropertyValue::Date(date), PropertyInput::List(bounds)) if bounds.len() == 2 => {
                let mut bounds = bounds.into_iter();
                if let (Some(start), Some(end)) = (bounds.next(), bounds.next()) {
                    *date = Some(DateRange::new(start, Some(end)));
                }
            }
            (PropertyValue::Checkbox(checked), PropertyInput::Bool(b)) => {
                *checked = b;
            }
            (PropertyValue::Url(s), PropertyInput::Text(text))
            | (PropertyValue::Email(s), PropertyInput::Text(text))
            | (PropertyValue::PhoneNumber(s), PropertyInput::Text(text)) => {
                *s = Some(text);
            }
            (PropertyValue::Relation(pages), PropertyInput::List(ids)) => {
                *pages = ids.into_iter().map(|id| PageRef { id }).collect();
            }
            (PropertyValue::People(people), PropertyInput::List(ids)) => {
                *people = ids.into_iter().map(UserRef::new).collect();
            }
            (PropertyValue::CreatedBy(user), PropertyInput::Text(id))
            | (PropertyValue::LastEditedBy(user), PropertyInput::Text(id)) => {
                *user = UserRef::new(id);
            }
            (PropertyValue::CreatedTime(time), PropertyInput::Text(text))
            | (PropertyValue::LastEditedTime(time), PropertyInput::Text(text)) => {
                *time = chrono::DateTime::parse_from_rfc3339(&text)
                    .map_err(|_| AppError::TypeMismatch {
                        tag: tag.clone(),
                        expected: "an RFC 3339 timestamp string",
                        found: "a non-timestamp string",
                    })?
                    .with_timezone(&chrono::Utc);
            }
            (this, found) => {
                return Err(AppError::TypeMismatch {
                    tag,
                    expected: expected_input(this),
                    found: found.describe(),
                });
            }
        }
        Ok(())
    }

    /// Encodes the payload stored under the tag key on the wire.
    pub fn payload(&self) -> Value {
        match self {
            PropertyValue::Title(spans) | PropertyValue::RichText(spans) => json!(spans),
            PropertyValue::Number(n) => json!(n),
            PropertyValue::Select(option) | PropertyValue::Status(option) => json!(option),
            PropertyValue::MultiSelect(options) => json!(options),
            PropertyValue::Date(date) => json!(date),
            PropertyValue::People(people) => json!(people),
            PropertyValue::Files(files) => json!(files),
            PropertyValue::Checkbox(checked) => json!(checked),
            PropertyValue::Url(s) | PropertyValue::Email(s) | PropertyValue::PhoneNumber(s) => {
                json!(s)
            }
            PropertyValue::Formula(result) => json!(result),
            PropertyValue::Relation(pages) => json!(pages),
            PropertyValue::Rollup(result) => json!(result),
            PropertyValue::CreatedBy(user) | PropertyValue::LastEditedBy(user) => json!(user),
            PropertyValue::CreatedTime(time) | PropertyValue::LastEditedTime(time) => {
                json!(time.to_rfc3339_opts(chrono::SecondsFormat::Millis, true))
            }
            PropertyValue::Other { payload, .. } => payload.clone(),
        }
    }
}

fn expected_input(value: &PropertyValue) -> &'static str {
    match value {
        PropertyValue::Title(_)
        | PropertyValue::RichText(_)
        | PropertyValue::Select(_)
        | PropertyValue::Status(_)
        | PropertyValue::Url(_)
        | PropertyValue::Email(_)
        | PropertyValue::PhoneNumber(_) => "a string",
        PropertyValue::MultiSelect(_) => "a list of option names",
        PropertyValue::Relation(_) => "a list of page ids",
        PropertyValue::People(_) => "a list of user ids",
        PropertyValue::Number(_) => "an integer or float",
        PropertyValue::Date(_) => "a string or a 2-element list",
        PropertyValue::Checkbox(_) => "a boolean",
        PropertyValue::CreatedBy(_) | PropertyValue::LastEditedBy(_) => "a user id string",
        PropertyValue::CreatedTime(_) | PropertyValue::LastEditedTime(_) => {
            "an RFC 3339 timestamp string"
        }
        PropertyValue::Files(_)
        | PropertyValue::Formula(_)
        | PropertyValue::Rollup(_)
        | PropertyValue::Other { .. } => "nothing (not writable through insert)",
    }
}

fn join_display<T: fmt::Display>(items: &[T]) -> String {
    items
        .iter()
        .map(|item| item.to_string())
        .collect::<Vec<_>>()
        .join(", ")
}

fn extract_formula(result: &FormulaResult) -> PlainValue {
    match result {
        FormulaResult::String { string } => string
            .as_ref()
            .map_or(PlainValue::Empty, |s| PlainValue::Text(s.clone())),
        FormulaResult::Number { number } => number.map_or(PlainValue::Empty, PlainValue::Number),
        FormulaResult::Boolean { boolean } => boolean.map_or(PlainValue::Empty, PlainValue::Bool),
        FormulaResult::Date { date } => date
            .as_ref()
            .map_or(PlainValue::Empty, |d| PlainValue::Text(d.to_string())),
    }
}

fn extract_rollup(result: &RollupResult) -> PlainValue {
    match result {
        RollupResult::Number { number } => number.map_or(PlainValue::Empty, PlainValue::Number),
        RollupResult::Date { date } => date
            .as_ref()
            .map_or(PlainValue::Empty, |d| PlainValue::Text(d.to_string())),
        RollupResult::Array { array } => {
            let registry = super::registry::PropertyTypeRegistry::standard();
            let parts: Vec<String> = array
                .iter()
                .map(|item| match registry.build(item) {
                    Ok(property) => property.extract().to_string(),
                    Err(_) => item.to_string(),
                })
                .filter(|part| !part.is_empty())
                .collect();
            PlainValue::Text(parts.join(", "))
        }
        RollupResult::Unsupported { unsupported } => PlainValue::Raw(unsupported.clone()),
        RollupResult::Incomplete { incomplete } => PlainValue::Raw(incomplete.clone()),
    }
}

/// A named entry of a page's property map: the server-side id plus the value.
#[derive(Debug, Clone, PartialEq)]
pub struct Property {
    pub id: Option<String>,
    pub value: PropertyValue,
}

impl Property {
    /// A property authored locally, not yet known to the server.
    pub fn new(value: PropertyValue) -> Self {
        Self { id: None, value }
    }

    pub fn tag(&self) -> &str {
        self.value.tag()
    }

    pub fn extract(&self) -> PlainValue {
        self.value.extract()
    }

    pub fn insert(&mut self, value: impl Into<PropertyInput>) -> Result<(), AppError> {
        self.value.insert(value)
    }

    /// Same property with a value the store accepts on write.
    pub fn to_writable(&self) -> Self {
        Self {
            id: self.id.clone(),
            value: self.value.to_writable(),
        }
    }

    /// Encodes the full wire record: `{"id", "type", <tag>: payload}`.
    pub fn to_raw(&self) -> Value {
        let mut record = serde_json::Map::new();
        if let Some(id) = &self.id {
            record.insert("id".to_string(), json!(id));
        }
        record.insert("type".to_string(), json!(self.tag()));
        record.insert(self.tag().to_string(), self.value.payload());
        Value::Object(record)
    }
}
