#![allow(dead_code)]

use anyhow::{anyhow, Result};
use async_trait::async_trait;
use chrono::NaiveDate;
use serde_json::{json, Value};
use std::collections::{BTreeMap, HashMap, VecDeque};
use std::sync::Arc;
use tokio::sync::Mutex;

use verse_filler::config::{Config, EnvSource};
use verse_filler::day_index::FixedClock;
use verse_filler::fill::Filler;
use verse_filler::notion::model::{Page, QueryResponse};
use verse_filler::notion::NotionService;
use verse_filler::passage::PassageStore;
use verse_filler::photo::FixedChooser;

pub const SECRET: &str = "s3cret";

pub fn config_with(extra: &[(&str, &str)]) -> Config {
    let mut pairs: Vec<(String, String)> = vec![
        ("FILL_SECRET".into(), SECRET.into()),
        ("NOTION_TOKEN".into(), "ntn".into()),
        ("NOTION_WORD_DB_ID".into(), "words".into()),
        ("SUPABASE_URL".into(), "https://db.example".into()),
        ("SUPABASE_SECRET".into(), "svc".into()),
        ("SLEEP_MS".into(), "0".into()),
    ];
    pairs.extend(extra.iter().map(|(k, v)| (k.to_string(), v.to_string())));
    Config::load(&EnvSource::from_pairs(pairs)).unwrap()
}

pub fn page(value: Value) -> Page {
    serde_json::from_value(value).unwrap()
}

/// A word card with the default property names.
pub fn card(id: &str, order: i64, verse_key: &str, version: Option<&str>) -> Page {
    let select = version.map(|v| json!({ "name": v }));
    page(json!({
        "id": id,
        "properties": {
            "Date1": { "type": "number", "number": order },
            "VerseKey": { "type": "rich_text", "rich_text": [ { "plain_text": verse_key } ] },
            "Version": { "type": "select", "select": select },
            "Text": { "type": "rich_text", "rich_text": [] },
            "Synced": { "type": "checkbox", "checkbox": false }
        }
    }))
}

pub fn photo(id: &str, url: &str) -> Page {
    page(json!({
        "id": id,
        "cover": { "type": "external", "external": { "url": url } },
        "properties": {}
    }))
}

pub fn results(pages: Vec<Page>) -> QueryResponse {
    QueryResponse {
        results: pages,
        has_more: false,
        next_cursor: None,
    }
}

#[derive(Debug, Clone)]
pub struct QueryCall {
    pub database_id: String,
    pub body: Value,
}

#[derive(Debug, Clone)]
pub struct UpdateCall {
    pub page_id: String,
    pub body: Value,
}

#[derive(Clone, Default)]
pub struct RecordingNotion {
    responses: Arc<Mutex<HashMap<String, VecDeque<Result<QueryResponse>>>>>,
    pages: Arc<Mutex<HashMap<String, Page>>>,
    failing_updates: Arc<Mutex<Vec<String>>>,
    query_calls: Arc<Mutex<Vec<QueryCall>>>,
    update_calls: Arc<Mutex<Vec<UpdateCall>>>,
}

impl RecordingNotion {
    pub async fn respond(&self, database_id: &str, response: Result<QueryResponse>) {
        self.responses
            .lock()
            .await
            .entry(database_id.to_string())
            .or_default()
            .push_back(response);
    }

    pub async fn add_page(&self, page: Page) {
        self.pages.lock().await.insert(page.id.clone(), page);
    }

    pub async fn fail_update(&self, page_id: &str) {
        self.failing_updates.lock().await.push(page_id.to_string());
    }

    pub async fn query_calls(&self) -> Vec<QueryCall> {
        self.query_calls.lock().await.clone()
    }

    pub async fn update_calls(&self) -> Vec<UpdateCall> {
        self.update_calls.lock().await.clone()
    }
}

#[async_trait]
impl NotionService for RecordingNotion {
    async fn query_database(&self, database_id: &str, body: &Value) -> Result<QueryResponse> {
        self.query_calls.lock().await.push(QueryCall {
            database_id: database_id.to_string(),
            body: body.clone(),
        });
        let mut guard = self.responses.lock().await;
        guard
            .get_mut(database_id)
            .and_then(VecDeque::pop_front)
            .unwrap_or_else(|| Ok(QueryResponse::default()))
    }

    async fn retrieve_page(&self, page_id: &str) -> Result<Page> {
        self.pages
            .lock()
            .await
            .get(page_id)
            .cloned()
            .ok_or_else(|| anyhow!("notion error 404 Not Found: page {}", page_id))
    }

    async fn update_page(&self, page_id: &str, body: &Value) -> Result<()> {
        self.update_calls.lock().await.push(UpdateCall {
            page_id: page_id.to_string(),
            body: body.clone(),
        });
        if self.failing_updates.lock().await.iter().any(|id| id == page_id) {
            return Err(anyhow!("notion error 409 Conflict: {}", page_id));
        }
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct FakePassages {
    rows: Arc<Mutex<BTreeMap<(String, String), String>>>,
    error: Arc<Mutex<Option<String>>>,
    calls: Arc<Mutex<Vec<(String, String)>>>,
    any_version_calls: Arc<Mutex<Vec<String>>>,
}

impl FakePassages {
    pub async fn insert(&self, passage: &str, version: &str, text: &str) {
        self.rows
            .lock()
            .await
            .insert((passage.to_string(), version.to_string()), text.to_string());
    }

    pub async fn fail_with(&self, message: &str) {
        *self.error.lock().await = Some(message.to_string());
    }

    pub async fn calls(&self) -> Vec<(String, String)> {
        self.calls.lock().await.clone()
    }

    pub async fn any_version_calls(&self) -> Vec<String> {
        self.any_version_calls.lock().await.clone()
    }
}

#[async_trait]
impl PassageStore for FakePassages {
    async fn fetch_text(&self, passage: &str, version: &str) -> Result<Option<String>> {
        self.calls
            .lock()
            .await
            .push((passage.to_string(), version.to_string()));
        if let Some(message) = self.error.lock().await.clone() {
            return Err(anyhow!(message));
        }
        Ok(self
            .rows
            .lock()
            .await
            .get(&(passage.to_string(), version.to_string()))
            .cloned())
    }

    async fn fetch_text_any_version(&self, passage: &str) -> Result<Option<String>> {
        self.any_version_calls.lock().await.push(passage.to_string());
        if let Some(message) = self.error.lock().await.clone() {
            return Err(anyhow!(message));
        }
        Ok(self
            .rows
            .lock()
            .await
            .iter()
            .find(|((p, _), _)| p == passage)
            .map(|(_, text)| text.clone()))
    }
}

pub struct Harness {
    pub notion: RecordingNotion,
    pub passages: FakePassages,
    pub filler: Arc<Filler>,
}

pub fn today() -> NaiveDate {
    NaiveDate::from_ymd_opt(2025, 3, 1).unwrap()
}

pub fn harness(cfg: Config, pick: usize) -> Harness {
    let notion = RecordingNotion::default();
    let passages = FakePassages::default();
    let filler = Filler::new(
        Arc::new(cfg),
        Arc::new(notion.clone()),
        Arc::new(passages.clone()),
        Arc::new(FixedChooser(pick)),
        Arc::new(FixedClock(today())),
    );
    Harness {
        notion,
        passages,
        filler: Arc::new(filler),
    }
}
