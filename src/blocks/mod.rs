//! Content Blocks
//!
//! The typed document tree written to the document store. Two producers feed it:
//!
//! - [`markup::compile`] turns summary markup (headings, lists, quotes, bold) into blocks
//! - [`render::render`] turns reader annotations into one block each
//!
//! List items only ever hold list items of their own variant, so a paragraph can never
//! have children and bullet lists never nest numbered items.

pub mod markup;
pub mod render;

pub use markup::compile;
pub use render::{render, summary_source};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct InlineSpan {
    pub text: String,
    pub bold: bool,
}

impl InlineSpan {
    pub fn plain(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: false,
        }
    }

    pub fn bold(text: impl Into<String>) -> Self {
        Self {
            text: text.into(),
            bold: true,
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum HeadingLevel {
    H1,
    H2,
    H3,
}

impl HeadingLevel {
    /// Levels deeper than three clamp to [`HeadingLevel::H3`].
    pub fn from_depth(depth: usize) -> Self {
        match depth {
            0 | 1 => HeadingLevel::H1,
            2 => HeadingLevel::H2,
            _ => HeadingLevel::H3,
        }
    }

    pub fn as_u8(&self) -> u8 {
        match self {
            HeadingLevel::H1 => 1,
            HeadingLevel::H2 => 2,
            HeadingLevel::H3 => 3,
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ListItem {
    pub spans: Vec<InlineSpan>,
    pub children: Vec<ListItem>,
}

impl ListItem {
    pub fn new(spans: Vec<InlineSpan>) -> Self {
        Self {
            spans,
            children: Vec::new(),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ListKind {
    Bullet,
    Number,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ContentBlock {
    Heading {
        level: HeadingLevel,
        spans: Vec<InlineSpan>,
    },
    Paragraph {
        spans: Vec<InlineSpan>,
    },
    Quote {
        spans: Vec<InlineSpan>,
    },
    BulletItem(ListItem),
    NumberItem(ListItem),
}

impl ContentBlock {
    pub fn paragraph(text: impl Into<String>) -> Self {
        ContentBlock::Paragraph {
            spans: vec![InlineSpan::plain(text)],
        }
    }

    pub fn quote(text: impl Into<String>) -> Self {
        ContentBlock::Quote {
            spans: vec![InlineSpan::plain(text)],
        }
    }

    pub fn list_item(kind: ListKind, item: ListItem) -> Self {
        match kind {
            ListKind::Bullet => ContentBlock::BulletItem(item),
            ListKind::Number => ContentBlock::NumberItem(item),
        }
    }

    pub fn spans(&self) -> &[InlineSpan] {
        match self {
            ContentBlock::Heading { spans, .. }
            | ContentBlock::Paragraph { spans }
            | ContentBlock::Quote { spans } => spans,
            ContentBlock::BulletItem(item) | ContentBlock::NumberItem(item) => &item.spans,
        }
    }

    /// Visible text of the block itself, children excluded.
    pub fn plain_text(&self) -> String {
        self.spans().iter().map(|s| s.text.as_str()).collect()
    }

    pub fn children(&self) -> &[ListItem] {
        match self {
            ContentBlock::BulletItem(item) | ContentBlock::NumberItem(item) => &item.children,
            _ => &[],
        }
    }
}
