//! Passage text lookups against the Supabase REST endpoint.
use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use reqwest::{Client, Url};
use serde_json::{Map, Value};
use std::fmt;
use tracing::debug;

use crate::config::{PassageTable, Passages};

#[async_trait]
pub trait PassageStore: Send + Sync {
    /// Text of the first row matching `passage` and `version`.
    /// `None` when no row matches; a row with a null text column yields `Some("")`.
    async fn fetch_text(&self, passage: &str, version: &str) -> Result<Option<String>>;

    /// Text of the first row for `passage` in whichever version the table returns first.
    async fn fetch_text_any_version(&self, passage: &str) -> Result<Option<String>>;
}

#[derive(Clone)]
pub struct PostgrestClient {
    http: Client,
    base_url: Url,
    secret: String,
    table: PassageTable,
}

impl fmt::Debug for PostgrestClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("PostgrestClient")
            .field("base_url", &self.base_url)
            .field("table", &self.table.name)
            .finish_non_exhaustive()
    }
}

impl PostgrestClient {
    pub fn from_config(cfg: &Passages) -> Result<Self> {
        let base_url = Url::parse(&cfg.url)
            .with_context(|| format!("invalid SUPABASE_URL {:?}", cfg.url))?;
        let http = Client::builder()
            .user_agent(concat!("verse-filler/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build Supabase HTTP client")?;
        Ok(Self {
            http,
            base_url,
            secret: cfg.secret.clone(),
            table: cfg.table.clone(),
        })
    }

    /// Select request for `passage`, filtered by `version` when given.
    pub fn build_request(&self, passage: &str, version: Option<&str>) -> Result<reqwest::Request> {
        let mut endpoint = self
            .base_url
            .join(&format!("rest/v1/{}", self.table.name))
            .context("invalid Supabase base URL")?;
        {
            let mut pairs = endpoint.query_pairs_mut();
            pairs
                .append_pair("select", &quote_ident(&self.table.text_col))
                .append_pair(&quote_ident(&self.table.passage_col), &format!("eq.{}", passage));
            if let Some(version) = version {
                pairs.append_pair(&quote_ident(&self.table.version_col), &format!("eq.{}", version));
            }
            pairs.append_pair("limit", "1");
        }
        self.http
            .get(endpoint)
            .header("apikey", &self.secret)
            .header("Authorization", format!("Bearer {}", self.secret))
            .header("Accept", "application/json")
            .build()
            .context("failed to build Supabase request")
    }

    async fn select_text(&self, passage: &str, version: Option<&str>) -> Result<Option<String>> {
        let request = self.build_request(passage, version)?;
        debug!(url=%request.url(), "querying passage text");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Supabase")?;
        if !res.status().is_success() {
            let status = res.status();
            let body = res.text().await.unwrap_or_default();
            return Err(anyhow!("supabase error {}: {}", status, body));
        }
        let rows: Vec<Map<String, Value>> =
            res.json().await.context("invalid Supabase response")?;
        Ok(text_of_first_row(&rows, &self.table.text_col))
    }
}

#[async_trait]
impl PassageStore for PostgrestClient {
    async fn fetch_text(&self, passage: &str, version: &str) -> Result<Option<String>> {
        self.select_text(passage, Some(version)).await
    }

    async fn fetch_text_any_version(&self, passage: &str) -> Result<Option<String>> {
        self.select_text(passage, None).await
    }
}

pub fn text_of_first_row(rows: &[Map<String, Value>], text_col: &str) -> Option<String> {
    rows.first().map(|row| {
        row.get(text_col)
            .and_then(Value::as_str)
            .unwrap_or_default()
            .to_string()
    })
}

/// Double-quote identifiers PostgREST would otherwise parse as syntax.
pub fn quote_ident(name: &str) -> String {
    if name.chars().all(|c| c.is_ascii_alphanumeric() || c == '_') {
        name.to_string()
    } else {
        format!("\"{}\"", name.replace('"', "\\\""))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn client() -> PostgrestClient {
        PostgrestClient::from_config(&Passages {
            url: "https://proj.supabase.co".into(),
            secret: "svc-key".into(),
            table: PassageTable {
                name: "bible_texts".into(),
                passage_col: "Passage(en)".into(),
                version_col: "version".into(),
                text_col: "text".into(),
            },
        })
        .unwrap()
    }

    #[test]
    fn quotes_only_when_needed() {
        assert_eq!(quote_ident("version"), "version");
        assert_eq!(quote_ident("B_Text"), "B_Text");
        assert_eq!(quote_ident("Passage(en)"), "\"Passage(en)\"");
    }

    #[test]
    fn request_filters_by_passage_and_version() {
        let request = client().build_request("John 3:16", Some("KJV")).unwrap();
        assert_eq!(request.url().path(), "/rest/v1/bible_texts");
        let pairs: Vec<(String, String)> = request
            .url()
            .query_pairs()
            .map(|(k, v)| (k.into_owned(), v.into_owned()))
            .collect();
        assert_eq!(
            pairs,
            vec![
                ("select".to_string(), "text".to_string()),
                ("\"Passage(en)\"".to_string(), "eq.John 3:16".to_string()),
                ("version".to_string(), "eq.KJV".to_string()),
                ("limit".to_string(), "1".to_string()),
            ]
        );
        let headers = request.headers();
        assert_eq!(headers.get("apikey").unwrap(), "svc-key");
        assert_eq!(headers.get("Authorization").unwrap(), "Bearer svc-key");
    }

    #[test]
    fn request_without_version_filters_by_passage_only() {
        let request = client().build_request("Ps 23:1", None).unwrap();
        let keys: Vec<String> = request
            .url()
            .query_pairs()
            .map(|(k, _)| k.into_owned())
            .collect();
        assert_eq!(keys, vec!["select", "\"Passage(en)\"", "limit"]);
    }

    #[test]
    fn first_row_text() {
        let rows: Vec<Map<String, Value>> = serde_json::from_value(json!([
            { "text": "In the beginning" },
            { "text": "ignored" }
        ]))
        .unwrap();
        assert_eq!(
            text_of_first_row(&rows, "text").as_deref(),
            Some("In the beginning")
        );
    }

    #[test]
    fn null_text_and_no_rows() {
        let rows: Vec<Map<String, Value>> =
            serde_json::from_value(json!([{ "text": null }])).unwrap();
        assert_eq!(text_of_first_row(&rows, "text").as_deref(), Some(""));
        assert_eq!(text_of_first_row(&[], "text"), None);
    }

    #[test]
    fn rejects_bad_base_url() {
        let err = PostgrestClient::from_config(&Passages {
            url: "not a url".into(),
            secret: "k".into(),
            table: client().table,
        })
        .unwrap_err();
        assert!(err.to_string().contains("SUPABASE_URL"));
    }
}
