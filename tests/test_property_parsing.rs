//! Decoding of page, database and block records.
//!
//! Covers every built-in property type, graceful skipping of types this
//! crate does not know, and database schemas.

use notion_replica::{
    BlockTree, BlockTypeRegistry, DocumentKind, DocumentNode, PlainValue, PropertyTypeRegistry,
    PropertyValue,
};
use pretty_assertions::assert_eq;
use serde_json::{json, Value};

const SPAN: &str = r#"{"type": "text", "text": {"content": "CONTENT", "link": null}, "plain_text": "CONTENT", "href": null,
    "annotations": {"bold": false, "italic": false, "strikethrough": false, "underline": false, "code": false, "color": "default"}}"#;

fn span(content: &str) -> String {
    SPAN.replace("CONTENT", content)
}

fn every_property_page() -> Value {
    let page_json = format!(
        r#"{{
        "object": "page",
        "id": "216cd412-8533-8087-a989-cf37889137c3",
        "created_time": "2023-01-01T00:00:00.000Z",
        "last_edited_time": "2023-01-01T00:00:00.000Z",
        "parent": {{"type": "database_id", "database_id": "a1b2c3d4-e5f6-7890-abcd-ef1234567890"}},
        "archived": false,
        "url": "https://www.notion.so/Test-Page-216cd41285338087a989cf37889137c3",
        "properties": {{
            "Title": {{"id": "title", "type": "title", "title": [{title}, {suffix}]}},
            "Description": {{"id": "desc", "type": "rich_text", "rich_text": [{description}]}},
            "Priority": {{"id": "prio", "type": "number", "number": 5}},
            "Stage": {{"id": "stage", "type": "select", "select": {{"id": "opt", "name": "In Progress", "color": "blue"}}}},
            "Labels": {{"id": "lab", "type": "multi_select", "multi_select": [
                {{"id": "a", "name": "backend", "color": "green"}},
                {{"id": "b", "name": "urgent", "color": "red"}}
            ]}},
            "State": {{"id": "state", "type": "status", "status": {{"id": "s", "name": "Done", "color": "green"}}}},
            "Due": {{"id": "due", "type": "date", "date": {{"start": "2024-03-01", "end": "2024-03-05", "time_zone": null}}}},
            "Owners": {{"id": "own", "type": "people", "people": [{{"object": "user", "id": "u-1", "name": "Ada"}}]}},
            "Attachments": {{"id": "att", "type": "files", "files": [
                {{"name": "plan.pdf", "type": "file", "file": {{"url": "https://s3.example.com/plan.pdf", "expiry_time": "2024-01-01T00:00:00.000Z"}}}}
            ]}},
            "Completed": {{"id": "done", "type": "checkbox", "checkbox": true}},
            "Link": {{"id": "url", "type": "url", "url": "https://example.com"}},
            "Contact": {{"id": "mail", "type": "email", "email": null}},
            "Phone": {{"id": "tel", "type": "phone_number", "phone_number": "+1 555 0100"}},
            "Score": {{"id": "f", "type": "formula", "formula": {{"type": "string", "string": "high"}}}},
            "Blocked by": {{"id": "rel", "type": "relation", "relation": [{{"id": "p-1"}}, {{"id": "p-2"}}], "has_more": false}},
            "Tag names": {{"id": "roll", "type": "rollup", "rollup": {{"type": "array", "function": "show_original", "array": [
                {{"type": "select", "select": {{"name": "alpha"}}}},
                {{"type": "select", "select": {{"name": "beta"}}}}
            ]}}}},
            "Author": {{"id": "cb", "type": "created_by", "created_by": {{"object": "user", "id": "u-2"}}}},
            "Created": {{"id": "ct", "type": "created_time", "created_time": "2023-01-01T00:00:00.000Z"}},
            "Editor": {{"id": "eb", "type": "last_edited_by", "last_edited_by": {{"object": "user", "id": "u-3", "name": "Grace"}}}},
            "Edited": {{"id": "et", "type": "last_edited_time", "last_edited_time": "2023-06-01T12:30:00.000Z"}},
            "Verify": {{"id": "ver", "type": "verification", "verification": {{"state": "unverified"}}}},
            "Action": {{"id": "btn", "type": "button", "button": {{}}}}
        }}
    }}"#,
        title = span("Test Page"),
        suffix = span("Title"),
        description = span("Test description"),
    );
    serde_json::from_str(&page_json).expect("fixture is valid JSON")
}

#[test]
fn test_every_builtin_property_type_decodes() {
    let page = DocumentNode::from_raw(&every_property_page()).expect("Page parsing should succeed");

    assert_eq!(page.kind, DocumentKind::Page);
    assert_eq!(page.properties.len(), 20);
    assert_eq!(page.title(), "Test Page,Title");

    let expected = [
        ("Description", PlainValue::Text("Test description".into())),
        ("Priority", PlainValue::Number(5.0)),
        ("Stage", PlainValue::Text("In Progress".into())),
        ("Labels", PlainValue::Text("backend, urgent".into())),
        ("State", PlainValue::Text("Done".into())),
        ("Due", PlainValue::Text("2024-03-01 -> 2024-03-05".into())),
        ("Owners", PlainValue::Text("Ada".into())),
        ("Attachments", PlainValue::Text("plan.pdf".into())),
        ("Completed", PlainValue::Bool(true)),
        ("Link", PlainValue::Text("https://example.com".into())),
        ("Contact", PlainValue::Empty),
        ("Phone", PlainValue::Text("+1 555 0100".into())),
        ("Score", PlainValue::Text("high".into())),
        ("Blocked by", PlainValue::Text("p-1, p-2".into())),
        ("Tag names", PlainValue::Text("alpha, beta".into())),
        ("Author", PlainValue::Text("User u-2".into())),
        ("Created", PlainValue::Text("2023-01-01T00:00:00.000Z".into())),
        ("Editor", PlainValue::Text("Grace".into())),
        ("Edited", PlainValue::Text("2023-06-01T12:30:00.000Z".into())),
    ];
    for (name, value) in expected {
        assert_eq!(page.extract(name).unwrap(), value, "property '{}'", name);
    }
}

#[test]
fn test_unsupported_property_types_are_skipped() {
    let page = DocumentNode::from_raw(&every_property_page()).unwrap();

    assert!(page.property("Verify").is_err());
    assert!(page.property("Action").is_err());
    // Display order of the remaining properties follows the record.
    let names: Vec<_> = page.properties.keys().take(3).map(|n| n.as_str()).collect();
    assert_eq!(names, vec!["Title", "Description", "Priority"]);
}

#[test]
fn test_registered_extension_keeps_unknown_type() {
    let mut registry = PropertyTypeRegistry::new();
    registry.register_opaque("verification");

    let page = DocumentNode::from_raw_with(&registry, &every_property_page()).unwrap();

    let verify = page.property("Verify").unwrap();
    assert_eq!(verify.tag(), "verification");
    assert_eq!(verify.extract(), PlainValue::Raw(json!({"state": "unverified"})));
    assert_eq!(verify.to_raw()["verification"]["state"], "unverified");
    assert!(page.property("Action").is_err());
}

#[test]
fn test_extraction_is_deterministic() {
    let raw = every_property_page();
    let first = DocumentNode::from_raw(&raw).unwrap();
    let second = DocumentNode::from_raw(&raw).unwrap();

    assert_eq!(first, second);
    for (name, property) in &first.properties {
        assert_eq!(property.extract(), property.extract(), "property '{}'", name);
        assert_eq!(property.extract(), second.extract(name.as_str()).unwrap());
    }
}

#[test]
fn test_read_only_and_writable_classification() {
    let page = DocumentNode::from_raw(&every_property_page()).unwrap();

    let read_only: Vec<_> = page
        .properties
        .iter()
        .filter(|(_, p)| p.value.is_read_only())
        .map(|(name, _)| name.as_str())
        .collect();
    assert_eq!(read_only, vec!["Author", "Created", "Editor", "Edited"]);

    let score = &page.property("Score").unwrap().value;
    assert!(!score.is_read_only());
    assert!(!score.is_writable());

    let attachments = page.property("Attachments").unwrap().value.to_writable();
    match attachments {
        PropertyValue::Files(files) => {
            assert_eq!(files[0].name, "plan.pdf");
            assert_eq!(
                serde_json::to_value(&files[0]).unwrap(),
                json!({"name": "plan.pdf", "type": "external", "external": {"url": "https://s3.example.com/plan.pdf"}})
            );
        }
        other => panic!("expected files, got {:?}", other),
    }
}

#[test]
fn test_property_record_reencodes_with_its_id() {
    let page = DocumentNode::from_raw(&every_property_page()).unwrap();

    let stage = page.property("Stage").unwrap().to_raw();
    assert_eq!(stage["id"], "stage");
    assert_eq!(stage["type"], "select");
    assert_eq!(stage["select"]["name"], "In Progress");

    let due = page.property("Due").unwrap().to_raw();
    assert_eq!(due["date"]["start"], "2024-03-01");
    assert_eq!(due["date"]["end"], "2024-03-05");
}

#[test]
fn test_database_schema_parsing() {
    let database_json = format!(
        r#"{{
        "object": "database",
        "id": "a1b2c3d4-e5f6-7890-abcd-ef1234567890",
        "parent": {{"type": "page_id", "page_id": "216cd412-8533-8087-a989-cf37889137c3"}},
        "archived": false,
        "url": "https://www.notion.so/a1b2c3d4e5f67890abcdef1234567890",
        "title": [{title}],
        "properties": {{
            "Name": {{"id": "title", "name": "Name", "type": "title", "title": {{}}}},
            "Stage": {{"id": "stg", "name": "Stage", "type": "select", "select": {{"options": [
                {{"id": "1", "name": "Open", "color": "green"}},
                {{"id": "2", "name": "Closed", "color": "gray"}}
            ]}}}},
            "Estimate": {{"id": "est", "name": "Estimate", "type": "number", "number": {{"format": "number"}}}},
            "Survey": {{"id": "srv", "name": "Survey", "type": "button", "button": {{}}}}
        }}
    }}"#,
        title = span("Project Tracker"),
    );
    let raw: Value = serde_json::from_str(&database_json).unwrap();

    let database = DocumentNode::from_raw(&raw).expect("Database parsing should succeed");

    assert_eq!(database.kind, DocumentKind::Database);
    assert_eq!(database.title(), "Project Tracker");
    assert!(database.properties.is_empty());
    let columns: Vec<_> = database.schema.keys().map(|k| k.as_str()).collect();
    assert_eq!(columns, vec!["Name", "Stage", "Estimate", "Survey"]);

    let stage = &database.schema["Stage"];
    assert_eq!(stage.tag, "select");
    assert_eq!(stage.config["options"][1]["name"], "Closed");
    assert_eq!(
        stage.to_raw(),
        json!({"name": "Stage", "type": "select", "select": stage.config.clone()})
    );
}

#[test]
fn test_non_document_record_is_rejected() {
    let raw = json!({"object": "block", "id": "216cd412-8533-8087-a989-cf37889137c3"});
    assert!(DocumentNode::from_raw(&raw).is_err());
}

#[test]
fn test_every_builtin_block_type_decodes() {
    let text = |content: &str| -> Value { serde_json::from_str(&format!("[{}]", span(content))).unwrap() };
    let records = vec![
        json!({"type": "paragraph", "paragraph": {"rich_text": text("para"), "color": "default"}}),
        json!({"type": "heading_1", "heading_1": {"rich_text": text("h1"), "is_toggleable": false}}),
        json!({"type": "heading_2", "heading_2": {"rich_text": text("h2")}}),
        json!({"type": "heading_3", "heading_3": {"rich_text": text("h3")}}),
        json!({"type": "callout", "callout": {"rich_text": text("note"), "icon": {"type": "emoji", "emoji": "💡"}}}),
        json!({"type": "quote", "quote": {"rich_text": text("quoted")}}),
        json!({"type": "bulleted_list_item", "bulleted_list_item": {"rich_text": text("bullet")}}),
        json!({"type": "numbered_list_item", "numbered_list_item": {"rich_text": text("number")}}),
        json!({"type": "to_do", "to_do": {"rich_text": text("task"), "checked": true}}),
        json!({"type": "toggle", "toggle": {"rich_text": text("fold")}}),
        json!({"type": "code", "code": {"rich_text": text("fn main() {}"), "language": "rust", "caption": []}}),
        json!({"type": "child_page", "child_page": {"title": "Sub page"}}),
        json!({"type": "child_database", "child_database": {"title": "Sub db"}}),
        json!({"type": "embed", "embed": {"url": "https://example.com/embed"}}),
        json!({"type": "image", "image": {"type": "external", "external": {"url": "https://example.com/a.png"}}}),
        json!({"type": "video", "video": {"type": "external", "external": {"url": "https://example.com/a.mp4"}}}),
        json!({"type": "file", "file": {"type": "external", "external": {"url": "https://example.com/a.zip"}}}),
        json!({"type": "pdf", "pdf": {"type": "external", "external": {"url": "https://example.com/a.pdf"}}}),
        json!({"type": "bookmark", "bookmark": {"url": "https://example.com", "caption": []}}),
        json!({"type": "equation", "equation": {"expression": "e=mc^2"}}),
        json!({"type": "divider", "divider": {}}),
        json!({"type": "table_of_contents", "table_of_contents": {"color": "default"}}),
    ];
    assert_eq!(records.len(), BlockTypeRegistry::standard().tags().len());

    let texts: Vec<_> = records
        .iter()
        .map(|raw| {
            let tree = BlockTree::from_raw(raw).expect("block should decode");
            assert_eq!(tree.to_raw()["type"], raw["type"]);
            tree.block.plain_text()
        })
        .collect();

    assert_eq!(
        texts,
        vec![
            "para",
            "h1",
            "h2",
            "h3",
            "note",
            "quoted",
            "bullet",
            "number",
            "task",
            "fold",
            "fn main() {}",
            "Sub page",
            "Sub db",
            "https://example.com/embed",
            "https://example.com/a.png",
            "https://example.com/a.mp4",
            "https://example.com/a.zip",
            "https://example.com/a.pdf",
            "https://example.com",
            "e=mc^2",
            "---",
            "",
        ]
    );
}

#[test]
fn test_unknown_block_type_is_unsupported() {
    let raw = json!({"type": "synced_block", "synced_block": {"synced_from": null}});
    let err = BlockTree::from_raw(&raw).unwrap_err();
    assert!(err.to_string().contains("synced_block"));
}
