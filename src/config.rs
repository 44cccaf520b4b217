use anyhow::{Result, bail};
use clap::Parser;
use serde::Deserialize;
use serde_yaml;
use std::env;
use std::fs;
use std::path::PathBuf;

use crate::notion::MAX_APPEND_BLOCKS;

#[derive(Parser, Debug)]
#[command(name = "kobo-notion")]
#[command(about = "Syncs Kobo highlights and notes into a Notion database", long_about = None)]
pub struct Cli {
    #[arg(short = 'c', long = "config")]
    pub config_path: Option<String>,

    /// Only sync the book with exactly this title.
    #[arg(long)]
    pub title: Option<String>,

    /// Skip summarization for this run even if the config enables it.
    #[arg(long)]
    pub no_summary: bool,

    #[arg(long)]
    pub json_logs: bool,
}

pub fn default_config_dir() -> PathBuf {
    dirs::home_dir()
        .unwrap_or_else(|| PathBuf::from("."))
        .join(".kobo-notion")
}

pub fn default_config_path() -> PathBuf {
    default_config_dir().join("config.yaml")
}

#[derive(Debug, Deserialize, Clone)]
pub struct KoboConfig {
    pub sqlite_source: PathBuf,
    #[serde(default = "default_working_copy")]
    pub working_copy: PathBuf,
}

fn default_working_copy() -> PathBuf {
    PathBuf::from("temp/KoboReader.sqlite")
}

#[derive(Debug, Deserialize, Clone)]
pub struct NotionConfig {
    pub api_key: String,
    pub database_id: String,
    #[serde(default = "default_base_url")]
    pub base_url: String,
    #[serde(default = "default_title_property")]
    pub title_property: String,
    #[serde(default = "default_category")]
    pub category: String,
    #[serde(default = "default_highlights_title")]
    pub highlights_title: String,
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
}

fn default_base_url() -> String {
    "https://api.notion.com/v1".to_string()
}

fn default_title_property() -> String {
    "Title".to_string()
}

fn default_category() -> String {
    "Books".to_string()
}

fn default_highlights_title() -> String {
    "Highlights".to_string()
}

fn default_batch_size() -> usize {
    MAX_APPEND_BLOCKS
}

#[derive(Debug, Deserialize, Clone)]
pub struct CoversConfig {
    #[serde(default = "default_true")]
    pub enabled: bool,
}

impl Default for CoversConfig {
    fn default() -> Self {
        Self { enabled: true }
    }
}

fn default_true() -> bool {
    true
}

#[derive(Debug, Deserialize, Clone, Copy, PartialEq, Eq, Default)]
pub enum Language {
    #[default]
    #[serde(rename = "en")]
    English,
    #[serde(rename = "zh-TW", alias = "zh-tw", alias = "zh")]
    TraditionalChinese,
}

#[derive(Debug, Deserialize, Clone, Default)]
pub struct SummaryConfig {
    #[serde(default)]
    pub enabled: bool,
    #[serde(default)]
    pub language: Language,
    #[serde(default = "default_model")]
    pub model: String,
    #[serde(default)]
    pub api_key: String,
    #[serde(default)]
    pub replace_existing: bool,
}

fn default_model() -> String {
    "gemini-1.5-flash".to_string()
}

#[derive(Debug, Deserialize)]
pub struct Config {
    pub kobo: KoboConfig,
    pub notion: NotionConfig,
    #[serde(default)]
    pub covers: CoversConfig,
    #[serde(default)]
    pub summary: SummaryConfig,
}

impl Config {
    pub fn new(path: &str) -> Result<Self> {
        let yaml_str = fs::read_to_string(path)?;
        Config::from_yaml(&yaml_str)
    }

    pub fn from_yaml(yaml_str: &str) -> Result<Self> {
        let yaml_with_env = Config::substitute_env_vars(yaml_str)?;
        let config: Config = serde_yaml::from_str(&yaml_with_env)?;
        config.validate()?;
        Ok(config)
    }

    fn validate(&self) -> Result<()> {
        if self.notion.api_key.trim().is_empty() {
            bail!("notion.api_key must be set");
        }
        if self.notion.database_id.trim().is_empty() {
            bail!("notion.database_id must be set");
        }
        if !(1..=MAX_APPEND_BLOCKS).contains(&self.notion.batch_size) {
            bail!(
                "notion.batch_size must be between 1 and {}, got {}",
                MAX_APPEND_BLOCKS,
                self.notion.batch_size
            );
        }
        if self.summary.enabled && self.summary.api_key.trim().is_empty() {
            bail!("summary.api_key must be set when summary.enabled is true");
        }
        Ok(())
    }

    /// Expands `${VAR}` and `${VAR:-default}` placeholders from the environment. A `${`
    /// without a closing brace is copied through untouched along with the rest of the text.
    fn substitute_env_vars(yaml_str: &str) -> Result<String> {
        let mut out = String::with_capacity(yaml_str.len());
        let mut rest = yaml_str;

        while let Some(start) = rest.find("${") {
            out.push_str(&rest[..start]);
            let after = &rest[start + 2..];
            let Some(end) = after.find('}') else {
                tracing::warn!("unterminated placeholder in config: '{}'", &rest[start..]);
                rest = &rest[start..];
                break;
            };
            out.push_str(&resolve_placeholder(&after[..end]));
            rest = &after[end + 1..];
        }

        out.push_str(rest);
        Ok(out)
    }
}

fn resolve_placeholder(placeholder: &str) -> String {
    match placeholder.split_once(":-") {
        Some((var, default)) => env::var(var).unwrap_or_else(|_| default.to_string()),
        None => env::var(placeholder).unwrap_or_else(|_| {
            tracing::warn!("environment variable '{}' not found", placeholder);
            String::new()
        }),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const MINIMAL: &str = r#"
kobo:
  sqlite_source: /Volumes/KOBOeReader/.kobo/KoboReader.sqlite
notion:
  api_key: secret
  database_id: db
"#;

    #[test]
    fn test_defaults() {
        let cfg = Config::from_yaml(MINIMAL).unwrap();
        assert_eq!(cfg.kobo.working_copy, PathBuf::from("temp/KoboReader.sqlite"));
        assert_eq!(cfg.notion.batch_size, 100);
        assert_eq!(cfg.notion.base_url, "https://api.notion.com/v1");
        assert_eq!(cfg.notion.title_property, "Title");
        assert_eq!(cfg.notion.highlights_title, "Highlights");
        assert!(cfg.covers.enabled);
        assert!(!cfg.summary.enabled);
        assert_eq!(cfg.summary.language, Language::English);
    }

    #[test]
    fn test_env_substitution_with_default() {
        let yaml = r#"
kobo:
  sqlite_source: ${KOBO_NOTION_TEST_UNSET_SOURCE:-/tmp/kobo.sqlite}
notion:
  api_key: ${KOBO_NOTION_TEST_UNSET_KEY:-fallback}
  database_id: db
summary:
  language: ${KOBO_NOTION_TEST_UNSET_LANG:-zh-TW}
"#;
        let cfg = Config::from_yaml(yaml).unwrap();
        assert_eq!(cfg.kobo.sqlite_source, PathBuf::from("/tmp/kobo.sqlite"));
        assert_eq!(cfg.notion.api_key, "fallback");
        assert_eq!(cfg.summary.language, Language::TraditionalChinese);
    }

    #[test]
    fn test_missing_variable_becomes_empty() {
        let out = Config::substitute_env_vars("a: '${KOBO_NOTION_TEST_UNSET_OTHER}'").unwrap();
        assert_eq!(out, "a: ''");
    }

    #[test]
    fn test_unterminated_placeholder_is_kept() {
        let out = Config::substitute_env_vars(
            "a: ${KOBO_NOTION_TEST_UNSET_A:-x}\nb: '${KOBO_NOTION_TEST_UNSET_B",
        )
        .unwrap();
        assert_eq!(out, "a: x\nb: '${KOBO_NOTION_TEST_UNSET_B");
    }

    #[test]
    fn test_default_may_contain_colons() {
        let out = Config::substitute_env_vars("u: ${KOBO_NOTION_TEST_UNSET_URL:-http://x:1}").unwrap();
        assert_eq!(out, "u: http://x:1");
    }

    #[test]
    fn test_batch_size_bounds() {
        for bad in [0, 101] {
            let yaml = format!("{}  batch_size: {}\n", MINIMAL, bad);
            assert!(Config::from_yaml(&yaml).is_err(), "batch_size {} accepted", bad);
        }
        let yaml = format!("{}  batch_size: 25\n", MINIMAL);
        assert_eq!(Config::from_yaml(&yaml).unwrap().notion.batch_size, 25);
    }

    #[test]
    fn test_summary_requires_api_key() {
        let yaml = format!("{}summary:\n  enabled: true\n", MINIMAL);
        assert!(Config::from_yaml(&yaml).is_err());

        let yaml = format!("{}summary:\n  enabled: true\n  api_key: k\n  language: zh\n", MINIMAL);
        let cfg = Config::from_yaml(&yaml).unwrap();
        assert!(cfg.summary.enabled);
        assert_eq!(cfg.summary.language, Language::TraditionalChinese);
    }

    #[test]
    fn test_missing_notion_key_is_rejected() {
        let yaml = MINIMAL.replace("api_key: secret", "api_key: ''");
        assert!(Config::from_yaml(&yaml).is_err());
    }
}
