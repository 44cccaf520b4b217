//! Document Store
//!
//! The hierarchical store book pages are synced into. [`DocumentStore`] is the seam the
//! orchestrator talks to; [`client::NotionClient`] implements it against the Notion REST
//! API and [`wire`] holds the JSON shapes it sends and reads.

pub mod client;
pub mod wire;

use async_trait::async_trait;

use crate::blocks::ContentBlock;
use crate::error::StoreError;
use crate::model::SourceRecord;

pub use client::NotionClient;

/// Hard ceiling on the number of blocks one append call may carry.
pub const MAX_APPEND_BLOCKS: usize = 100;

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Page {
    pub id: String,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Parent {
    /// The collection the store was configured with.
    Database,
    Page(String),
}

#[derive(Debug, Clone, PartialEq)]
pub struct BookProperties {
    pub title: String,
    pub subtitle: Option<String>,
    pub category: String,
    pub author: String,
    pub publisher: String,
    pub isbn: String,
    pub read_percent: u8,
}

impl BookProperties {
    pub fn from_record(record: &SourceRecord, category: &str) -> Self {
        Self {
            title: record.title.clone(),
            subtitle: record.subtitle.clone().filter(|s| !s.trim().is_empty()),
            category: category.to_string(),
            author: record.author.clone(),
            publisher: record.publisher.clone(),
            isbn: record.isbn.clone(),
            read_percent: record.read_percent,
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
pub enum Properties {
    Book(BookProperties),
    /// A plain sub-page that only carries a title.
    Title(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ChildKind {
    ChildPage { title: String },
    Other(String),
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ChildBlock {
    pub id: String,
    pub kind: ChildKind,
}

impl ChildBlock {
    pub fn is_page_titled(&self, wanted: &str) -> bool {
        matches!(&self.kind, ChildKind::ChildPage { title } if title == wanted)
    }

    pub fn is_page(&self) -> bool {
        matches!(self.kind, ChildKind::ChildPage { .. })
    }
}

#[async_trait]
pub trait DocumentStore: Send + Sync {
    /// Exact, case-sensitive match on the page title. `None` is a plain miss.
    async fn query_by_title(&self, title: &str) -> Result<Option<Page>, StoreError>;

    async fn create_page(
        &self,
        parent: &Parent,
        properties: &Properties,
        cover: Option<&str>,
        icon: Option<&str>,
    ) -> Result<Page, StoreError>;

    async fn update_page(
        &self,
        page_id: &str,
        properties: Option<&Properties>,
        cover: Option<&str>,
        icon: Option<&str>,
    ) -> Result<Page, StoreError>;

    /// Live children in document order.
    async fn list_children(&self, page_id: &str) -> Result<Vec<ChildBlock>, StoreError>;

    /// Hides a block or sub-page. Nothing is ever deleted.
    async fn archive(&self, block: &ChildBlock) -> Result<(), StoreError>;

    /// Appends at most [`MAX_APPEND_BLOCKS`] blocks; longer slices are rejected.
    async fn append_children(
        &self,
        page_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), StoreError>;
}
