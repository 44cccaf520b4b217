//! Highlight summarization through the Gemini `generateContent` endpoint.

use anyhow::{Context, Result, bail};
use async_trait::async_trait;
use reqwest::Client;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::config::{Language, SummaryConfig};

const GEMINI_URL: &str = "https://generativelanguage.googleapis.com/v1beta/models";

#[async_trait]
pub trait Summarizer: Send + Sync {
    /// Returns summary markup for the given highlight text.
    async fn summarize(&self, title: &str, text: &str, language: Language) -> Result<String>;
}

pub fn build_prompt(title: &str, content: &str, language: Language) -> String {
    match language {
        Language::English => format!(
            r##"The following is a list of highlights from a book: {title}.
```
{content}
```

Please summarize the highlights into a concise and coherent summary using markdown format. Here are some guidelines:
1. The highlights are ordered, but don't have a specific chapter or section, so please group them into sections.
2. Please use bold text to highlight the most important words or sentences.
3. It's okay to have numbers in the heading, such as "# 1. Section Title" or "# 二、段落標題"
4. If there are duplicate highlights, please remove them to keep the summary concise.
5. Please add abstract at the beginning and conclusion at the end.
"##
        ),
        Language::TraditionalChinese => format!(
            r##"以下是從《{title}》節錄的重點：
```
{content}
```
請幫我以 markdown 格式統整、濃縮筆記，謝謝。以下為注意事項：
1. 請以繁體中文回答。
2. 這些重點的順序是連續的，但可能分散於不同章節，請依內容自行分類統整。謝謝。
3. 直接回答重點，不要有任何額外的說明。
4. 若有段落，其 heading 標籤可以同時附帶標號以更加醒目，例如：「# 一、段落標題」，其內容則以 numbered list 或 bullet point 表示。
5. 冒號和括號以全形「：」和「（）」表示。
6. 中、英文及數字間以半形空格隔開。
7. 若重點有所重複，可以刪減以保持簡潔。
8. 請於最開頭加上摘要，並於最後加上總結。
"##
        ),
    }
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Part {
    #[serde(default)]
    pub text: String,
}

#[derive(Debug, Serialize, Deserialize)]
pub struct Content {
    #[serde(default)]
    pub parts: Vec<Part>,
}

#[derive(Debug, Serialize)]
struct GenerateRequest {
    contents: Vec<Content>,
}

#[derive(Debug, Deserialize)]
pub struct Candidate {
    pub content: Option<Content>,
}

#[derive(Debug, Deserialize)]
pub struct GenerateResponse {
    #[serde(default)]
    pub candidates: Vec<Candidate>,
}

impl GenerateResponse {
    /// Text of the first candidate, all parts concatenated.
    pub fn text(&self) -> Option<String> {
        let content = self.candidates.first()?.content.as_ref()?;
        let text: String = content.parts.iter().map(|p| p.text.as_str()).collect();
        (!text.trim().is_empty()).then_some(text)
    }
}

pub struct Gemini {
    http: Client,
    model: String,
    api_key: String,
}

impl Gemini {
    pub fn new(cfg: &SummaryConfig) -> Result<Self> {
        let http = Client::builder().timeout(Duration::from_secs(120)).build()?;
        Ok(Self {
            http,
            model: cfg.model.clone(),
            api_key: cfg.api_key.clone(),
        })
    }
}

#[async_trait]
impl Summarizer for Gemini {
    async fn summarize(&self, title: &str, text: &str, language: Language) -> Result<String> {
        let request = GenerateRequest {
            contents: vec![Content {
                parts: vec![Part {
                    text: build_prompt(title, text, language),
                }],
            }],
        };

        let response = self
            .http
            .post(format!("{}/{}:generateContent", GEMINI_URL, self.model))
            .query(&[("key", self.api_key.as_str())])
            .json(&request)
            .send()
            .await
            .context("failed to reach Gemini")?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            bail!("Gemini API error {}: {}", status, body);
        }

        let parsed: GenerateResponse = response.json().await?;
        parsed
            .text()
            .ok_or_else(|| anyhow::anyhow!("Gemini returned no summary text for '{}'", title))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_prompt_per_language() {
        let en = build_prompt("Dune", "Fear is the mind-killer.", Language::English);
        assert!(en.contains("highlights from a book: Dune."));
        assert!(en.contains("Fear is the mind-killer."));
        assert!(en.contains(r##""# 1. Section Title""##));
        assert!(en.trim_end().ends_with("conclusion at the end."));

        let zh = build_prompt("沙丘", "恐懼是心靈殺手。", Language::TraditionalChinese);
        assert!(zh.contains("《沙丘》"));
        assert!(zh.contains("請以繁體中文回答"));
        assert!(zh.contains("「# 一、段落標題」"));
        assert_ne!(en, zh);
    }

    #[test]
    fn test_response_text_joins_parts() {
        let parsed: GenerateResponse = serde_json::from_value(serde_json::json!({
            "candidates": [
                { "content": { "parts": [ { "text": "# Abstract\n" }, { "text": "- point" } ] } },
                { "content": { "parts": [ { "text": "ignored" } ] } }
            ]
        }))
        .unwrap();
        assert_eq!(parsed.text().as_deref(), Some("# Abstract\n- point"));
    }

    #[test]
    fn test_empty_response_has_no_text() {
        let parsed: GenerateResponse = serde_json::from_str(r#"{"candidates": []}"#).unwrap();
        assert_eq!(parsed.text(), None);
        let blank: GenerateResponse =
            serde_json::from_str(r#"{"candidates": [{"content": {"parts": [{"text": "  "}]}}]}"#)
                .unwrap();
        assert_eq!(blank.text(), None);
    }
}
