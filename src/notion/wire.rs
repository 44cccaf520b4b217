//! Notion JSON shapes.

use serde::Deserialize;
use serde_json::{Value, json};

use super::{ChildBlock, ChildKind, Properties};
use crate::blocks::{ContentBlock, InlineSpan, ListItem};

/// Notion rejects rich text objects with more than this many characters.
pub const MAX_TEXT_CHARS: usize = 2000;

pub const PROP_CATEGORY: &str = "Category";
pub const PROP_SUBTITLE: &str = "Subtitle";
pub const PROP_AUTHOR: &str = "Author";
pub const PROP_PUBLISHER: &str = "Publisher";
pub const PROP_ISBN: &str = "ISBN";
pub const PROP_READ_PERCENT: &str = "Read Percent";

fn split_chars(text: &str, max: usize) -> Vec<String> {
    let chars: Vec<char> = text.chars().collect();
    chars.chunks(max).map(|c| c.iter().collect()).collect()
}

fn text_object(content: &str, bold: bool) -> Value {
    let mut obj = json!({
        "type": "text",
        "text": { "content": content },
    });
    if bold {
        obj["annotations"] = json!({ "bold": true });
    }
    obj
}

pub fn rich_text(spans: &[InlineSpan]) -> Vec<Value> {
    spans
        .iter()
        .flat_map(|span| {
            split_chars(&span.text, MAX_TEXT_CHARS)
                .into_iter()
                .map(move |piece| text_object(&piece, span.bold))
        })
        .collect()
}

fn plain_rich_text(text: &str) -> Value {
    Value::Array(rich_text(&[InlineSpan::plain(text)]))
}

fn block_object(block_type: &str, body: Value) -> Value {
    json!({
        "object": "block",
        "type": block_type,
        block_type: body,
    })
}

fn list_item_json(block_type: &str, item: &ListItem) -> Value {
    let mut body = json!({ "rich_text": rich_text(&item.spans) });
    if !item.children.is_empty() {
        body["children"] = item
            .children
            .iter()
            .map(|child| list_item_json(block_type, child))
            .collect();
    }
    block_object(block_type, body)
}

pub fn block_json(block: &ContentBlock) -> Value {
    match block {
        ContentBlock::Heading { level, spans } => block_object(
            &format!("heading_{}", level.as_u8()),
            json!({ "rich_text": rich_text(spans) }),
        ),
        ContentBlock::Paragraph { spans } => {
            block_object("paragraph", json!({ "rich_text": rich_text(spans) }))
        }
        ContentBlock::Quote { spans } => {
            block_object("quote", json!({ "rich_text": rich_text(spans) }))
        }
        ContentBlock::BulletItem(item) => list_item_json("bulleted_list_item", item),
        ContentBlock::NumberItem(item) => list_item_json("numbered_list_item", item),
    }
}

pub fn properties_json(properties: &Properties, title_property: &str) -> Value {
    match properties {
        Properties::Title(title) => json!({ "title": plain_rich_text(title) }),
        Properties::Book(book) => {
            let mut props = json!({
                title_property: { "title": plain_rich_text(&book.title) },
                PROP_CATEGORY: { "select": { "name": book.category } },
                PROP_AUTHOR: { "rich_text": plain_rich_text(&book.author) },
                PROP_PUBLISHER: { "rich_text": plain_rich_text(&book.publisher) },
                PROP_ISBN: { "rich_text": plain_rich_text(&book.isbn) },
                PROP_READ_PERCENT: { "number": book.read_percent },
            });
            if let Some(subtitle) = &book.subtitle {
                props[PROP_SUBTITLE] = json!({ "rich_text": plain_rich_text(subtitle) });
            }
            props
        }
    }
}

pub fn external_file(url: &str) -> Value {
    json!({ "type": "external", "external": { "url": url } })
}

pub fn title_filter(title_property: &str, title: &str) -> Value {
    json!({
        "filter": {
            "property": title_property,
            "title": { "equals": title },
        },
    })
}

#[derive(Debug, Deserialize)]
pub struct ObjectRef {
    pub id: String,
}

#[derive(Debug, Deserialize)]
pub struct QueryResponse {
    pub results: Vec<ObjectRef>,
}

#[derive(Debug, Deserialize)]
pub struct ChildPageBody {
    #[serde(default)]
    pub title: String,
}

#[derive(Debug, Deserialize)]
pub struct RawChild {
    pub id: String,
    #[serde(rename = "type")]
    pub block_type: String,
    #[serde(default)]
    pub archived: bool,
    #[serde(default)]
    pub child_page: Option<ChildPageBody>,
}

impl RawChild {
    pub fn into_child(self) -> ChildBlock {
        let kind = match (self.block_type.as_str(), self.child_page) {
            ("child_page", Some(page)) => ChildKind::ChildPage { title: page.title },
            _ => ChildKind::Other(self.block_type),
        };
        ChildBlock { id: self.id, kind }
    }
}

#[derive(Debug, Deserialize)]
pub struct ChildrenResponse {
    pub results: Vec<RawChild>,
    #[serde(default)]
    pub has_more: bool,
    #[serde(default)]
    pub next_cursor: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct ApiErrorBody {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}
