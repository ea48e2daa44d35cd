use std::path::PathBuf;

use anyhow::Result;
use clap::Parser;
use verse_filler::config::{Config, EnvSource};
use verse_filler::notion::NotionClient;

/// List a Notion database's properties, to pick the NOTION_*_PROP names.
#[derive(Parser, Debug)]
struct Args {
    /// Optional YAML file of fallback settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Database ID to inspect; defaults to NOTION_WORD_DB_ID
    #[arg(long)]
    db_id: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();

    let src = match &args.config {
        Some(path) => EnvSource::with_file(path)?,
        None => EnvSource::from_process(),
    };
    let cfg = Config::load(&src)?;
    let db_id = args
        .db_id
        .or_else(|| cfg.notion.word_db_id.clone())
        .ok_or_else(|| anyhow::anyhow!("pass --db-id or set NOTION_WORD_DB_ID"))?;

    let client = NotionClient::new(cfg.notion.token.clone(), cfg.notion.version.clone())?;
    let db = client.retrieve_database(&db_id).await?;
    let title: String = db.title.iter().map(|t| t.plain_text.as_str()).collect();
    println!("Database: {} ({})", title, db.id);
    println!("Properties:");
    let mut props: Vec<_> = db.properties.into_iter().collect();
    props.sort_by(|a, b| a.0.cmp(&b.0));
    for (name, prop) in props {
        println!("  {} -> {{ id: {}, type: {} }}", name, prop.id, prop.typ);
    }
    Ok(())
}
