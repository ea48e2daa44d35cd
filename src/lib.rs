//! Fills the daily word card in a Notion database with passage text from a
//! Supabase table and an optional random photo.

pub mod config;
pub mod day_index;
pub mod error;
pub mod extract;
pub mod fill;
pub mod notion;
pub mod passage;
pub mod photo;
pub mod web;

use anyhow::Result;
use std::sync::Arc;

use crate::config::{Config, EnvSource};
use crate::day_index::LocalClock;
use crate::fill::Filler;
use crate::notion::NotionClient;
use crate::passage::PostgrestClient;
use crate::photo::RandomChooser;

/// Build a filler wired to the real services.
pub fn live_filler(cfg: Config) -> Result<Filler> {
    let notion = NotionClient::new(cfg.notion.token.clone(), cfg.notion.version.clone())?;
    let passages = PostgrestClient::from_config(&cfg.passages)?;
    Ok(Filler::new(
        Arc::new(cfg),
        Arc::new(notion),
        Arc::new(passages),
        Arc::new(RandomChooser),
        Arc::new(LocalClock),
    ))
}

/// Install the fmt subscriber, filtered by `RUST_LOG` from `src` (default `info`).
/// Call after `src` is built so `.env` and the settings file are honoured.
pub fn init_tracing(src: &EnvSource) {
    let filter = tracing_subscriber::EnvFilter::try_new(log_directives(src))
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new("info"));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .compact()
        .init();
}

fn log_directives(src: &EnvSource) -> String {
    src.get("RUST_LOG").unwrap_or_else(|| "info".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::fs;
    use tempfile::tempdir;

    #[test]
    fn log_filter_comes_from_settings() {
        let src = EnvSource::from_pairs([("RUST_LOG", "verse_filler=debug")]);
        assert_eq!(log_directives(&src), "verse_filler=debug");
        assert_eq!(log_directives(&EnvSource::from_pairs([("RUST_LOG", "")])), "info");
    }

    #[test]
    fn log_filter_read_from_yaml_file() {
        if std::env::var_os("RUST_LOG").is_some() {
            return;
        }
        let td = tempdir().unwrap();
        let path = td.path().join("filler.yaml");
        fs::write(&path, "RUST_LOG: \"warn\"\n").unwrap();
        let src = EnvSource::with_file(&path).unwrap();
        assert_eq!(log_directives(&src), "warn");
    }
}
