use async_trait::async_trait;
use reqwest::{Client, Method, RequestBuilder};
use serde::de::DeserializeOwned;
use serde_json::{Value, json};
use std::time::Duration;

use super::wire::{self, ApiErrorBody, ChildrenResponse, ObjectRef, QueryResponse, RawChild};
use super::{ChildBlock, DocumentStore, MAX_APPEND_BLOCKS, Page, Parent, Properties};
use crate::blocks::ContentBlock;
use crate::config::NotionConfig;
use crate::error::StoreError;

pub const NOTION_VERSION: &str = "2022-06-28";
const REQUEST_TIMEOUT_SECS: u64 = 30;

pub struct NotionClient {
    http: Client,
    base_url: String,
    api_key: String,
    database_id: String,
    title_property: String,
}

impl NotionClient {
    pub fn new(cfg: &NotionConfig) -> Result<Self, StoreError> {
        let http = Client::builder()
            .timeout(Duration::from_secs(REQUEST_TIMEOUT_SECS))
            .build()?;

        Ok(Self {
            http,
            base_url: cfg.base_url.trim_end_matches('/').to_string(),
            api_key: cfg.api_key.clone(),
            database_id: cfg.database_id.clone(),
            title_property: cfg.title_property.clone(),
        })
    }

    fn request(&self, method: Method, path: &str) -> RequestBuilder {
        self.http
            .request(method, format!("{}{}", self.base_url, path))
            .bearer_auth(&self.api_key)
            .header("Notion-Version", NOTION_VERSION)
    }

    async fn send<T: DeserializeOwned>(&self, req: RequestBuilder) -> Result<T, StoreError> {
        let response = req.send().await?;
        let status = response.status();

        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            let parsed: ApiErrorBody = serde_json::from_str(&body).unwrap_or_default();
            return Err(StoreError::Api {
                status: status.as_u16(),
                code: parsed.code,
                message: if parsed.message.is_empty() { body } else { parsed.message },
            });
        }

        response
            .json::<T>()
            .await
            .map_err(|e| StoreError::MalformedResponse(e.to_string()))
    }

    fn page_body(
        &self,
        properties: Option<&Properties>,
        cover: Option<&str>,
        icon: Option<&str>,
    ) -> Value {
        let mut body = json!({});
        if let Some(properties) = properties {
            body["properties"] = wire::properties_json(properties, &self.title_property);
        }
        if let Some(url) = cover {
            body["cover"] = wire::external_file(url);
        }
        if let Some(url) = icon {
            body["icon"] = wire::external_file(url);
        }
        body
    }
}

#[async_trait]
impl DocumentStore for NotionClient {
    async fn query_by_title(&self, title: &str) -> Result<Option<Page>, StoreError> {
        let req = self
            .request(Method::POST, &format!("/databases/{}/query", self.database_id))
            .json(&wire::title_filter(&self.title_property, title));

        let response: QueryResponse = self.send(req).await?;
        Ok(response.results.into_iter().next().map(|r| Page { id: r.id }))
    }

    async fn create_page(
        &self,
        parent: &Parent,
        properties: &Properties,
        cover: Option<&str>,
        icon: Option<&str>,
    ) -> Result<Page, StoreError> {
        let mut body = self.page_body(Some(properties), cover, icon);
        body["parent"] = match parent {
            Parent::Database => json!({ "type": "database_id", "database_id": self.database_id }),
            Parent::Page(id) => json!({ "type": "page_id", "page_id": id }),
        };

        let created: ObjectRef = self.send(self.request(Method::POST, "/pages").json(&body)).await?;
        Ok(Page { id: created.id })
    }

    async fn update_page(
        &self,
        page_id: &str,
        properties: Option<&Properties>,
        cover: Option<&str>,
        icon: Option<&str>,
    ) -> Result<Page, StoreError> {
        let body = self.page_body(properties, cover, icon);
        let req = self
            .request(Method::PATCH, &format!("/pages/{}", page_id))
            .json(&body);

        let updated: ObjectRef = self.send(req).await?;
        Ok(Page { id: updated.id })
    }

    async fn list_children(&self, page_id: &str) -> Result<Vec<ChildBlock>, StoreError> {
        let mut children = Vec::new();
        let mut cursor: Option<String> = None;

        loop {
            let mut req = self.request(Method::GET, &format!("/blocks/{}/children", page_id));
            req = req.query(&[("page_size", "100")]);
            if let Some(c) = &cursor {
                req = req.query(&[("start_cursor", c.as_str())]);
            }

            let page: ChildrenResponse = self.send(req).await?;
            children.extend(
                page.results
                    .into_iter()
                    .filter(|c| !c.archived)
                    .map(RawChild::into_child),
            );

            match (page.has_more, page.next_cursor) {
                (true, Some(next)) => cursor = Some(next),
                _ => break,
            }
        }

        Ok(children)
    }

    async fn archive(&self, block: &ChildBlock) -> Result<(), StoreError> {
        let path = if block.is_page() {
            format!("/pages/{}", block.id)
        } else {
            format!("/blocks/{}", block.id)
        };

        let _: ObjectRef = self
            .send(self.request(Method::PATCH, &path).json(&json!({ "archived": true })))
            .await?;
        Ok(())
    }

    async fn append_children(
        &self,
        page_id: &str,
        blocks: &[ContentBlock],
    ) -> Result<(), StoreError> {
        if blocks.len() > MAX_APPEND_BLOCKS {
            return Err(StoreError::BatchTooLarge {
                len: blocks.len(),
                max: MAX_APPEND_BLOCKS,
            });
        }

        let children: Vec<Value> = blocks.iter().map(wire::block_json).collect();
        let req = self
            .request(Method::PATCH, &format!("/blocks/{}/children", page_id))
            .json(&json!({ "children": children }));

        let _: Value = self.send(req).await?;
        Ok(())
    }
}
