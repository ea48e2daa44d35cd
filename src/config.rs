//! Configuration loader for the verse filler.
//!
//! Values come from the process environment (after `.env`), then an optional
//! flat YAML file keyed by the same variable names, then built-in defaults.
//! Per-request overrides are layered on top by [`Config::resolve`].
use serde::Deserialize;
use std::collections::BTreeMap;
use std::fs;
use std::net::SocketAddr;
use std::path::Path;
use thiserror::Error;

use crate::day_index::{self, Clock};
use crate::error::FillError;

#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),
    #[error("YAML parse error: {0}")]
    Parse(#[from] serde_yaml::Error),
    #[error("Missing the environment variable {0}")]
    MissingVar(&'static str),
    #[error("Invalid value for the environment variable {0}: {1}")]
    InvalidValue(&'static str, String),
}

/// Where named settings are read from.
#[derive(Debug, Clone, Default)]
pub struct EnvSource {
    process_env: bool,
    values: BTreeMap<String, String>,
}

impl EnvSource {
    /// Process environment only. Loads `.env` outside of tests.
    pub fn from_process() -> Self {
        if !cfg!(test) {
            dotenvy::dotenv().ok();
        }
        Self {
            process_env: true,
            values: BTreeMap::new(),
        }
    }

    /// Process environment first, then the YAML file at `path`.
    pub fn with_file(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path)?;
        let values: BTreeMap<String, String> = serde_yaml::from_str(&content)?;
        Ok(Self {
            values,
            ..Self::from_process()
        })
    }

    /// Fixed values without touching the process environment.
    pub fn from_pairs<I, K, V>(pairs: I) -> Self
    where
        I: IntoIterator<Item = (K, V)>,
        K: Into<String>,
        V: Into<String>,
    {
        Self {
            process_env: false,
            values: pairs
                .into_iter()
                .map(|(k, v)| (k.into(), v.into()))
                .collect(),
        }
    }

    /// Look up `key`; empty values count as unset.
    pub fn get(&self, key: &str) -> Option<String> {
        let from_env = if self.process_env {
            std::env::var(key).ok()
        } else {
            None
        };
        non_empty(from_env).or_else(|| non_empty(self.values.get(key).cloned()))
    }

    fn get_or(&self, key: &str, fallback: &str) -> String {
        self.get(key).unwrap_or_else(|| fallback.to_string())
    }

    fn require(&self, key: &'static str) -> Result<String, ConfigError> {
        self.get(key).ok_or(ConfigError::MissingVar(key))
    }

    fn parse_or<T>(&self, key: &'static str, fallback: T) -> Result<T, ConfigError>
    where
        T: std::str::FromStr,
        T::Err: std::fmt::Display,
    {
        match self.get(key) {
            Some(raw) => raw
                .trim()
                .parse::<T>()
                .map_err(|e| ConfigError::InvalidValue(key, e.to_string())),
            None => Ok(fallback),
        }
    }
}

fn non_empty(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}

/// Root configuration.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Config {
    pub fill_secret: Option<String>,
    pub bind_address: SocketAddr,
    pub notion: Notion,
    pub passages: Passages,
    pub default_version: String,
    pub max_rich_text: usize,
    pub sleep_ms: u64,
}

/// Document database settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Notion {
    pub token: String,
    pub version: String,
    pub word_db_id: Option<String>,
    pub photo_db_id: Option<String>,
    pub photo_active_prop: Option<String>,
    pub props: CardProps,
}

/// Property names on the word-card collection.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CardProps {
    pub order: String,
    pub verse_key: String,
    pub text: String,
    pub synced: String,
    pub version: String,
    pub photo_url: String,
    pub load: String,
    pub last_synced: String,
}

/// Relational text store settings.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Passages {
    pub url: String,
    pub secret: String,
    pub table: PassageTable,
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PassageTable {
    pub name: String,
    pub passage_col: String,
    pub version_col: String,
    pub text_col: String,
}

impl Config {
    pub fn load(src: &EnvSource) -> Result<Self, ConfigError> {
        let bind_raw = src.get_or("BIND_ADDRESS", "0.0.0.0:3000");
        let bind_address = bind_raw
            .parse::<SocketAddr>()
            .map_err(|e| ConfigError::InvalidValue("BIND_ADDRESS", e.to_string()))?;

        let max_rich_text = src.parse_or("MAX_RICH_TEXT", 2000usize)?;
        if max_rich_text == 0 {
            return Err(ConfigError::InvalidValue(
                "MAX_RICH_TEXT",
                "must be > 0".to_string(),
            ));
        }

        Ok(Self {
            fill_secret: src.get("FILL_SECRET"),
            bind_address,
            notion: Notion {
                token: src.require("NOTION_TOKEN")?,
                version: src.get_or("NOTION_API_VERSION", "2022-06-28"),
                word_db_id: src.get("NOTION_WORD_DB_ID"),
                photo_db_id: src.get("NOTION_PHOTOS_DB_ID"),
                photo_active_prop: src.get("NOTION_PHOTO_ACTIVE_PROP"),
                props: CardProps {
                    order: src.get_or("NOTION_ORDER_PROP", "Date1"),
                    verse_key: src.get_or("NOTION_VERSEKEY_PROP", "VerseKey"),
                    text: src.get_or("NOTION_TEXT_PROP", "Text"),
                    synced: src.get_or("NOTION_SYNCED_PROP", "Synced"),
                    version: src.get_or("NOTION_VERSION_PROP", "Version"),
                    photo_url: src.get_or("NOTION_PHOTOURL_PROP", "PhotoURL"),
                    load: src.get_or("NOTION_LOAD_PROP", "Load"),
                    last_synced: src.get_or("NOTION_LASTSYNCED_PROP", "LastSynced"),
                },
            },
            passages: Passages {
                url: src.require("SUPABASE_URL")?,
                secret: src.require("SUPABASE_SECRET")?,
                table: PassageTable {
                    name: src.get_or("SUPABASE_TEXT_TABLE", "bible_texts"),
                    passage_col: src.get_or("SUPABASE_TEXT_PASSAGE_COL", "Passage(en)"),
                    version_col: src.get_or("SUPABASE_TEXT_VERSION_COL", "version"),
                    text_col: src.get_or("SUPABASE_TEXT_TEXT_COL", "text"),
                },
            },
            default_version: src.get_or("DEFAULT_VERSION", "KJV"),
            max_rich_text,
            sleep_ms: src.parse_or("SLEEP_MS", 150u64)?,
        })
    }

    /// Layer the request overrides over the loaded defaults and settle the
    /// day index.
    pub fn resolve(
        &self,
        query: &FillQuery,
        clock: &dyn Clock,
    ) -> Result<RequestSettings, FillError> {
        let word_db_id = pick(&query.word_db_id, &self.notion.word_db_id)
            .ok_or(FillError::MissingConfig("NOTION_WORD_DB_ID"))?;
        let photo_db_id = pick(&query.photo_db_id, &self.notion.photo_db_id);
        let order_prop = pick(&query.order_prop, &None)
            .unwrap_or_else(|| self.notion.props.order.clone());
        let active_prop = pick(&query.active_prop, &self.notion.photo_active_prop);

        let index = match query.index.as_deref().filter(|raw| !raw.is_empty()) {
            Some(raw) => day_index::parse_explicit(raw)?,
            None => day_index::for_date(clock.today()),
        };

        Ok(RequestSettings {
            word_db_id,
            photo_db_id,
            order_prop,
            active_prop,
            index,
        })
    }
}

fn pick(over: &Option<String>, fallback: &Option<String>) -> Option<String> {
    non_empty(over.clone()).or_else(|| non_empty(fallback.clone()))
}

/// Query parameters accepted by the daily fill trigger.
#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct FillQuery {
    pub key: Option<String>,
    pub word_db_id: Option<String>,
    pub photo_db_id: Option<String>,
    pub order_prop: Option<String>,
    pub index: Option<String>,
    pub active_prop: Option<String>,
}

/// Settings for one fill, after every fallback has been applied.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RequestSettings {
    pub word_db_id: String,
    pub photo_db_id: Option<String>,
    pub order_prop: String,
    pub active_prop: Option<String>,
    pub index: i64,
}

/// Returns a sample YAML file covering every recognised key.
pub fn example() -> &'static str {
    r#"FILL_SECRET: "change-me"
NOTION_TOKEN: "YOUR_NOTION_INTEGRATION_TOKEN"
NOTION_API_VERSION: "2022-06-28"
NOTION_WORD_DB_ID: "NOTION_WORD_DATABASE_ID"
NOTION_PHOTOS_DB_ID: "NOTION_PHOTO_DATABASE_ID"
NOTION_ORDER_PROP: "Date1"
NOTION_VERSEKEY_PROP: "VerseKey"
NOTION_TEXT_PROP: "Text"
NOTION_SYNCED_PROP: "Synced"
NOTION_VERSION_PROP: "Version"
NOTION_PHOTOURL_PROP: "PhotoURL"
NOTION_LOAD_PROP: "Load"
NOTION_LASTSYNCED_PROP: "LastSynced"
SUPABASE_URL: "https://project.supabase.co"
SUPABASE_SECRET: "YOUR_SERVICE_ROLE_KEY"
SUPABASE_TEXT_TABLE: "bible_texts"
SUPABASE_TEXT_PASSAGE_COL: "Passage(en)"
SUPABASE_TEXT_VERSION_COL: "version"
SUPABASE_TEXT_TEXT_COL: "text"
DEFAULT_VERSION: "KJV"
MAX_RICH_TEXT: "2000"
SLEEP_MS: "150"
BIND_ADDRESS: "127.0.0.1:3000"
RUST_LOG: "info"
"#
}
