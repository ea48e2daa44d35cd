use anyhow::{anyhow, Context, Result};
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use reqwest::{Client, Method, Response, StatusCode, Url};
use serde::de::DeserializeOwned;
use serde_json::{json, Map, Value};
use std::fmt;
use tracing::{debug, warn};

use crate::notion::model::{Page, QueryResponse, RetrieveDatabaseResp};

pub mod model;

const NOTION_API_BASE: &str = "https://api.notion.com/";

/// Largest page the photo query asks for.
pub const PHOTO_PAGE_SIZE: u32 = 50;
/// Largest page the batch query asks for.
pub const BATCH_PAGE_SIZE: u32 = 100;

#[derive(Clone)]
pub struct NotionClient {
    http: Client,
    base_url: Url,
    token: String,
    version: String,
}

impl fmt::Debug for NotionClient {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("NotionClient")
            .field("base_url", &self.base_url)
            .finish_non_exhaustive()
    }
}

#[async_trait]
pub trait NotionService: Send + Sync {
    async fn query_database(&self, database_id: &str, body: &Value) -> Result<QueryResponse>;

    async fn retrieve_page(&self, page_id: &str) -> Result<Page>;

    async fn update_page(&self, page_id: &str, body: &Value) -> Result<()>;
}

impl NotionClient {
    pub fn new(token: String, version: String) -> Result<Self> {
        let base_url = Url::parse(NOTION_API_BASE).context("invalid default Notion URL")?;
        Self::with_base_url(token, version, base_url)
    }

    pub fn with_base_url(token: String, version: String, base_url: Url) -> Result<Self> {
        let http = Client::builder()
            .user_agent(concat!("verse-filler/", env!("CARGO_PKG_VERSION")))
            .build()
            .context("failed to build Notion HTTP client")?;
        Ok(Self {
            http,
            base_url,
            token,
            version,
        })
    }

    pub fn build_request(
        &self,
        method: Method,
        path: &str,
        body: Option<&Value>,
    ) -> Result<reqwest::Request> {
        let endpoint = self
            .base_url
            .join(path)
            .context("invalid Notion base URL")?;
        let mut builder = self
            .http
            .request(method, endpoint)
            .header("Authorization", format!("Bearer {}", self.token))
            .header("Notion-Version", &self.version);
        if let Some(body) = body {
            builder = builder
                .header("Content-Type", "application/json")
                .json(body);
        }
        builder.build().context("failed to build Notion request")
    }

    async fn execute<T: DeserializeOwned>(&self, request: reqwest::Request) -> Result<T> {
        debug!(method=%request.method(), url=%request.url(), "sending notion request");
        let res = self
            .http
            .execute(request)
            .await
            .context("failed to reach Notion")?;
        let res = check_status(res).await?;
        res.json::<T>().await.context("invalid Notion response")
    }

    pub async fn retrieve_database(&self, database_id: &str) -> Result<RetrieveDatabaseResp> {
        let request =
            self.build_request(Method::GET, &format!("v1/databases/{}", database_id), None)?;
        self.execute(request).await
    }
}

async fn check_status(res: Response) -> Result<Response> {
    if res.status() == StatusCode::TOO_MANY_REQUESTS {
        let body = res.text().await.unwrap_or_default();
        warn!("Rate limited by Notion: {}", body);
        return Err(anyhow!("received 429 from Notion: {}", body));
    }
    if !res.status().is_success() {
        let status = res.status();
        let body = res.text().await.unwrap_or_default();
        warn!(%status, %body, "notion request failed");
        return Err(anyhow!("notion error {}: {}", status, body));
    }
    Ok(res)
}

#[async_trait]
impl NotionService for NotionClient {
    async fn query_database(&self, database_id: &str, body: &Value) -> Result<QueryResponse> {
        let request = self.build_request(
            Method::POST,
            &format!("v1/databases/{}/query", database_id),
            Some(body),
        )?;
        self.execute(request).await
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        let request = self.build_request(Method::GET, &format!("v1/pages/{}", page_id), None)?;
        self.execute(request).await
    }

    async fn update_page(&self, page_id: &str, body: &Value) -> Result<()> {
        let request =
            self.build_request(Method::PATCH, &format!("v1/pages/{}", page_id), Some(body))?;
        let _: Value = self.execute(request).await?;
        Ok(())
    }
}

/// Query for the card whose ordering number equals `index`.
pub fn build_card_query(order_prop: &str, index: i64) -> Value {
    json!({
        "filter": {
            "property": order_prop,
            "number": { "equals": index }
        },
        "page_size": 1
    })
}

/// Query for photo candidates, optionally only those with `active_prop` ticked.
pub fn build_photo_query(active_prop: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("page_size".into(), json!(PHOTO_PAGE_SIZE));
    if let Some(prop) = active_prop {
        body.insert(
            "filter".into(),
            json!({ "property": prop, "checkbox": { "equals": true } }),
        );
    }
    Value::Object(body)
}

/// Query for cards flagged for loading or still missing their text.
pub fn build_pending_query(load_prop: &str, text_prop: &str, start_cursor: Option<&str>) -> Value {
    let mut body = Map::new();
    body.insert("page_size".into(), json!(BATCH_PAGE_SIZE));
    body.insert(
        "filter".into(),
        json!({
            "or": [
                { "property": load_prop, "checkbox": { "equals": true } },
                { "property": text_prop, "rich_text": { "is_empty": true } }
            ]
        }),
    );
    if let Some(cursor) = start_cursor {
        body.insert("start_cursor".into(), json!(cursor));
    }
    Value::Object(body)
}

/// Split `text` into rich-text segments of at most `max_chars` characters.
/// Empty text still yields one empty segment so the property is cleared.
pub fn rich_text_segments(text: &str, max_chars: usize) -> Vec<Value> {
    let max_chars = max_chars.max(1);
    let chars: Vec<char> = text.chars().collect();
    if chars.is_empty() {
        return vec![text_segment("")];
    }
    chars
        .chunks(max_chars)
        .map(|chunk| text_segment(&chunk.iter().collect::<String>()))
        .collect()
}

fn text_segment(content: &str) -> Value {
    json!({ "type": "text", "text": { "content": content } })
}

/// What to write back onto a card.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct CardUpdate<'a> {
    pub text_prop: &'a str,
    pub text: &'a str,
    pub max_rich_text: usize,
    /// Photo URL and the property it goes to.
    pub photo: Option<(&'a str, &'a str)>,
    /// Checkbox to tick.
    pub synced_prop: Option<&'a str>,
    /// Checkbox to clear.
    pub load_prop: Option<&'a str>,
    /// Date property stamped with the fill time.
    pub last_synced: Option<(&'a str, DateTime<Utc>)>,
}

pub fn build_card_update(update: &CardUpdate<'_>) -> Value {
    let mut properties = Map::new();
    properties.insert(
        update.text_prop.to_string(),
        json!({ "rich_text": rich_text_segments(update.text, update.max_rich_text) }),
    );

    if let Some((prop, url)) = update.photo {
        properties.insert(prop.to_string(), json!({ "url": url }));
    }
    if let Some(prop) = update.synced_prop {
        properties.insert(prop.to_string(), json!({ "checkbox": true }));
    }
    if let Some(prop) = update.load_prop {
        properties.insert(prop.to_string(), json!({ "checkbox": false }));
    }
    if let Some((prop, at)) = update.last_synced {
        properties.insert(prop.to_string(), json!({ "date": { "start": at } }));
    }

    let mut body = Map::new();
    body.insert("properties".into(), Value::Object(properties));
    if let Some((_, url)) = update.photo {
        body.insert(
            "cover".into(),
            json!({ "type": "external", "external": { "url": url } }),
        );
    }
    Value::Object(body)
}
