//! Card filling: look up the card, fetch its passage, attach a photo, write back.
use anyhow::Context;
use serde::{Deserialize, Serialize};
use std::sync::Arc;
use std::time::Duration;
use tracing::{debug, info, instrument, warn};

use crate::config::{Config, FillQuery, RequestSettings};
use crate::day_index::Clock;
use crate::error::FillError;
use crate::extract;
use crate::notion::model::Page;
use crate::notion::{self, CardUpdate, NotionService};
use crate::passage::PassageStore;
use crate::photo::{self, PhotoChooser};

/// Result of a daily fill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct DailyFill {
    pub ok: bool,
    pub index: i64,
    pub page_id: String,
    pub verse_key: String,
    pub version: String,
    pub photo_url: Option<String>,
}

/// Outcome for one page of a by-id or batch fill.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct PageReport {
    pub page_id: String,
    pub ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub verse_key: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub version: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub chars: Option<usize>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

#[derive(Debug, Clone, Default, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchOptions {
    pub word_db_id: Option<String>,
    #[serde(default)]
    pub dry_run: bool,
    #[serde(default)]
    pub empty_only: bool,
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq, Eq)]
#[serde(rename_all = "camelCase")]
pub struct BatchReport {
    pub target_count: usize,
    pub updated: usize,
    pub dry_run: bool,
    /// Page ids a dry run would fill.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub pending: Vec<String>,
    #[serde(default)]
    pub items: Vec<PageReport>,
}

/// Passage text and key resolved for one card. `text` is `None` when no row matched.
struct CardText {
    verse_key: String,
    version: String,
    text: Option<String>,
}

pub struct Filler {
    notion: Arc<dyn NotionService>,
    passages: Arc<dyn PassageStore>,
    chooser: Arc<dyn PhotoChooser>,
    clock: Arc<dyn Clock>,
    config: Arc<Config>,
}

impl Filler {
    pub fn new(
        config: Arc<Config>,
        notion: Arc<dyn NotionService>,
        passages: Arc<dyn PassageStore>,
        chooser: Arc<dyn PhotoChooser>,
        clock: Arc<dyn Clock>,
    ) -> Self {
        Self {
            notion,
            passages,
            chooser,
            clock,
            config,
        }
    }

    pub fn config(&self) -> &Config {
        &self.config
    }

    /// Succeeds only when a secret is configured and `key` matches it.
    pub fn authorize(&self, key: Option<&str>) -> Result<(), FillError> {
        match (self.config.fill_secret.as_deref(), key) {
            (Some(secret), Some(key)) if secret == key => Ok(()),
            _ => Err(FillError::Unauthorized),
        }
    }

    pub fn resolve(&self, query: &FillQuery) -> Result<RequestSettings, FillError> {
        self.config.resolve(query, self.clock.as_ref())
    }

    /// Authorize, resolve and run a daily fill.
    pub async fn handle(&self, query: &FillQuery) -> Result<DailyFill, FillError> {
        self.authorize(query.key.as_deref())?;
        let settings = self.resolve(query)?;
        self.fill_daily(&settings).await
    }

    #[instrument(skip_all, fields(index = settings.index, db = %settings.word_db_id))]
    pub async fn fill_daily(&self, settings: &RequestSettings) -> Result<DailyFill, FillError> {
        let body = notion::build_card_query(&settings.order_prop, settings.index);
        let cards = self
            .notion
            .query_database(&settings.word_db_id, &body)
            .await
            .context("failed to query word cards")?;
        let card = cards
            .results
            .into_iter()
            .next()
            .ok_or_else(|| FillError::CardNotFound {
                prop: settings.order_prop.clone(),
                index: settings.index,
            })?;
        info!(page_id = %card.id, "found card");

        let card_text = self.card_text(&card, false).await?;
        let text = card_text.text.unwrap_or_default();

        let photo_url = match settings.photo_db_id.as_deref() {
            Some(photo_db) => self.pick_photo(photo_db, settings.active_prop.as_deref()).await?,
            None => None,
        };

        let props = &self.config.notion.props;
        let update = CardUpdate {
            text_prop: &props.text,
            text: &text,
            max_rich_text: self.config.max_rich_text,
            photo: photo_url
                .as_deref()
                .map(|url| (props.photo_url.as_str(), url)),
            synced_prop: extract::is_checkbox(&card, &props.synced).then_some(props.synced.as_str()),
            load_prop: None,
            last_synced: None,
        };
        self.notion
            .update_page(&card.id, &notion::build_card_update(&update))
            .await
            .context("failed to update word card")?;
        info!(
            page_id = %card.id,
            verse_key = %card_text.verse_key,
            version = %card_text.version,
            photo = photo_url.is_some(),
            "card filled"
        );

        Ok(DailyFill {
            ok: true,
            index: settings.index,
            page_id: card.id,
            verse_key: card_text.verse_key,
            version: card_text.version,
            photo_url,
        })
    }

    /// Fill one card by page id. No photo is attached; the load flag is cleared
    /// and the sync date stamped. A card with no passage text is left untouched
    /// and reported as not ok.
    #[instrument(skip(self))]
    pub async fn fill_page(&self, page_id: &str) -> Result<PageReport, FillError> {
        let card = self
            .notion
            .retrieve_page(page_id)
            .await
            .context("failed to retrieve card")?;
        let card_text = self.card_text(&card, true).await?;
        let Some(text) = card_text.text else {
            return Ok(PageReport {
                page_id: card.id,
                ok: false,
                error: Some(format!(
                    "no passage text for {}/{}",
                    card_text.verse_key, card_text.version
                )),
                verse_key: Some(card_text.verse_key),
                version: Some(card_text.version),
                chars: None,
            });
        };

        let props = &self.config.notion.props;
        let update = CardUpdate {
            text_prop: &props.text,
            text: &text,
            max_rich_text: self.config.max_rich_text,
            photo: None,
            synced_prop: extract::is_checkbox(&card, &props.synced).then_some(props.synced.as_str()),
            load_prop: extract::is_checkbox(&card, &props.load).then_some(props.load.as_str()),
            last_synced: extract::is_date(&card, &props.last_synced)
                .then(|| (props.last_synced.as_str(), self.clock.now())),
        };
        self.notion
            .update_page(&card.id, &notion::build_card_update(&update))
            .await
            .context("failed to update card")?;

        Ok(PageReport {
            page_id: card.id,
            ok: true,
            chars: Some(text.chars().count()),
            verse_key: Some(card_text.verse_key),
            version: Some(card_text.version),
            error: None,
        })
    }

    /// Fill every card flagged for loading or missing its text.
    #[instrument(skip_all, fields(dry_run = options.dry_run, empty_only = options.empty_only))]
    pub async fn fill_batch(&self, options: &BatchOptions) -> Result<BatchReport, FillError> {
        let db_id = options
            .word_db_id
            .clone()
            .filter(|id| !id.trim().is_empty())
            .or_else(|| self.config.notion.word_db_id.clone())
            .ok_or(FillError::MissingConfig("NOTION_WORD_DB_ID"))?;

        let mut pages = self.pending_pages(&db_id).await?;
        if options.empty_only {
            let text_prop = &self.config.notion.props.text;
            pages.retain(|page| extract::text_is_empty(page, text_prop));
        }

        let mut report = BatchReport {
            target_count: pages.len(),
            updated: 0,
            dry_run: options.dry_run,
            pending: Vec::new(),
            items: Vec::new(),
        };
        info!(targets = report.target_count, "collected pending cards");

        if options.dry_run {
            report.pending = pages.into_iter().map(|page| page.id).collect();
            return Ok(report);
        }

        for (i, page) in pages.iter().enumerate() {
            if i > 0 {
                self.pause().await;
            }
            match self.fill_page(&page.id).await {
                Ok(item) => {
                    if item.ok {
                        report.updated += 1;
                    } else {
                        warn!(page_id = %page.id, error = ?item.error, "card skipped");
                    }
                    report.items.push(item);
                }
                Err(err) => {
                    warn!(page_id = %page.id, error = %err, "card fill failed");
                    report.items.push(PageReport {
                        page_id: page.id.clone(),
                        ok: false,
                        verse_key: None,
                        version: None,
                        chars: None,
                        error: Some(err.to_string()),
                    });
                }
            }
        }
        info!(updated = report.updated, "batch fill finished");
        Ok(report)
    }

    async fn pending_pages(&self, db_id: &str) -> Result<Vec<Page>, FillError> {
        let props = &self.config.notion.props;
        let mut pages = Vec::new();
        let mut cursor: Option<String> = None;
        loop {
            let body = notion::build_pending_query(&props.load, &props.text, cursor.as_deref());
            let res = self
                .notion
                .query_database(db_id, &body)
                .await
                .context("failed to query pending cards")?;
            pages.extend(res.results);
            match res.next_cursor {
                Some(next) if res.has_more => cursor = Some(next),
                _ => break,
            }
            self.pause().await;
        }
        Ok(pages)
    }

    /// Resolve the card's key and version and look up its text. With
    /// `any_version`, a miss is retried on the passage alone.
    async fn card_text(&self, card: &Page, any_version: bool) -> Result<CardText, FillError> {
        let props = &self.config.notion.props;
        let verse_key =
            extract::verse_key(card, &props.verse_key).ok_or_else(|| FillError::MissingVerseKey {
                prop: props.verse_key.clone(),
            })?;
        let version = extract::version(card, &props.version, &self.config.default_version);

        let mut text = self
            .passages
            .fetch_text(&verse_key, &version)
            .await
            .with_context(|| format!("failed to fetch text for {} ({})", verse_key, version))?;
        if text.is_none() && any_version {
            debug!(%verse_key, %version, "retrying passage lookup without version");
            text = self
                .passages
                .fetch_text_any_version(&verse_key)
                .await
                .with_context(|| format!("failed to fetch text for {}", verse_key))?;
        }
        if text.is_none() {
            warn!(%verse_key, %version, "no passage text found");
        }

        Ok(CardText {
            verse_key,
            version,
            text,
        })
    }

    async fn pick_photo(
        &self,
        photo_db: &str,
        active_prop: Option<&str>,
    ) -> Result<Option<String>, FillError> {
        let body = notion::build_photo_query(active_prop);
        let photos = self
            .notion
            .query_database(photo_db, &body)
            .await
            .context("failed to query photos")?;
        let url = photo::choose_url(&photos.results, self.chooser.as_ref());
        if url.is_none() {
            info!(candidates = photos.results.len(), "no photo selected");
        }
        Ok(url)
    }

    async fn pause(&self) {
        if self.config.sleep_ms > 0 {
            tokio::time::sleep(Duration::from_millis(self.config.sleep_ms)).await;
        }
    }
}
