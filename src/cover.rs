//! Book cover lookup through the Google Books volume search.

use anyhow::Result;
use async_trait::async_trait;
use reqwest::Client;
use serde::Deserialize;
use std::time::Duration;

const VOLUMES_URL: &str = "https://www.googleapis.com/books/v1/volumes";
const FRONT_COVER_URL: &str = "https://books.google.com/books/publisher/content/images/frontcover";

#[async_trait]
pub trait CoverResolver: Send + Sync {
    async fn lookup(&self, title: &str, isbn: &str) -> Result<Option<String>>;
}

/// Used when covers are switched off.
pub struct NoCovers;

#[async_trait]
impl CoverResolver for NoCovers {
    async fn lookup(&self, _title: &str, _isbn: &str) -> Result<Option<String>> {
        Ok(None)
    }
}

#[derive(Debug, Deserialize)]
pub struct Identifier {
    #[serde(rename = "type")]
    pub kind: String,
    pub identifier: String,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct VolumeInfo {
    #[serde(default)]
    pub industry_identifiers: Vec<Identifier>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct Volume {
    pub id: String,
    #[serde(default)]
    pub volume_info: VolumeInfo,
}

#[derive(Debug, Default, Deserialize)]
pub struct VolumesResponse {
    #[serde(default)]
    pub items: Vec<Volume>,
}

/// The volume whose ISBN-13 matches, else the first search result.
pub fn pick_volume_id<'a>(response: &'a VolumesResponse, isbn: &str) -> Option<&'a str> {
    let by_isbn = response.items.iter().find(|volume| {
        !isbn.is_empty()
            && volume
                .volume_info
                .industry_identifiers
                .iter()
                .any(|id| id.kind == "ISBN_13" && id.identifier == isbn)
    });

    by_isbn
        .or_else(|| response.items.first())
        .map(|volume| volume.id.as_str())
}

pub fn front_cover_url(volume_id: &str) -> String {
    format!("{}/{}?fife=w1200-h1200", FRONT_COVER_URL, volume_id)
}

pub struct GoogleBooks {
    http: Client,
}

impl GoogleBooks {
    pub fn new() -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(15)).build()?;
        Ok(Self { http })
    }
}

#[async_trait]
impl CoverResolver for GoogleBooks {
    async fn lookup(&self, title: &str, isbn: &str) -> Result<Option<String>> {
        let url = format!("{}?q={}", VOLUMES_URL, urlencoding::encode(title));
        let response: VolumesResponse = self
            .http
            .get(&url)
            .send()
            .await?
            .error_for_status()?
            .json()
            .await?;

        let Some(volume_id) = pick_volume_id(&response, isbn) else {
            tracing::warn!("could not find book data for '{}'", title);
            return Ok(None);
        };

        // The publisher image endpoint answers non-200 when no cover exists.
        let image_url = front_cover_url(volume_id);
        let status = self.http.get(&image_url).send().await?.status();
        if status.as_u16() != 200 {
            tracing::debug!("no cover image for '{}' ({})", title, status);
            return Ok(None);
        }

        Ok(Some(image_url))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn response() -> VolumesResponse {
        serde_json::from_value(serde_json::json!({
            "items": [
                { "id": "first", "volumeInfo": { "industryIdentifiers": [
                    { "type": "ISBN_10", "identifier": "0441013597" }
                ] } },
                { "id": "match", "volumeInfo": { "industryIdentifiers": [
                    { "type": "ISBN_13", "identifier": "9780441013593" }
                ] } },
                { "id": "bare" }
            ]
        }))
        .unwrap()
    }

    #[test]
    fn test_pick_prefers_isbn_match() {
        assert_eq!(pick_volume_id(&response(), "9780441013593"), Some("match"));
    }

    #[test]
    fn test_pick_falls_back_to_first() {
        assert_eq!(pick_volume_id(&response(), "0000000000000"), Some("first"));
        assert_eq!(pick_volume_id(&response(), ""), Some("first"));
    }

    #[test]
    fn test_pick_empty_results() {
        let empty: VolumesResponse = serde_json::from_str("{}").unwrap();
        assert_eq!(pick_volume_id(&empty, "9780441013593"), None);
    }

    #[test]
    fn test_front_cover_url() {
        assert_eq!(
            front_cover_url("abc"),
            "https://books.google.com/books/publisher/content/images/frontcover/abc?fife=w1200-h1200"
        );
    }

    #[tokio::test]
    async fn test_no_covers() {
        assert_eq!(NoCovers.lookup("Dune", "1").await.unwrap(), None);
    }
}
