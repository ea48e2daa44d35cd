use anyhow::Result;
use clap::Parser;
use std::path::PathBuf;
use tracing::info;

use verse_filler::config::{Config, EnvSource, FillQuery};

#[derive(Debug, Parser)]
#[command(
    author,
    version,
    about = "Fill today's word card once and exit (for cron)"
)]
struct Args {
    /// Optional YAML file of fallback settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Card index to fill instead of today's
    #[arg(long)]
    index: Option<i64>,

    #[arg(long)]
    word_db_id: Option<String>,

    #[arg(long)]
    photo_db_id: Option<String>,

    #[arg(long)]
    order_prop: Option<String>,

    /// Only pick photos with this checkbox ticked
    #[arg(long)]
    active_prop: Option<String>,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    let src = match &args.config {
        Some(path) => EnvSource::with_file(path)?,
        None => EnvSource::from_process(),
    };
    verse_filler::init_tracing(&src);

    let cfg = Config::load(&src)?;
    let filler = verse_filler::live_filler(cfg)?;

    // Local runs are trusted; the shared secret only guards the HTTP trigger.
    let query = FillQuery {
        key: None,
        word_db_id: args.word_db_id,
        photo_db_id: args.photo_db_id,
        order_prop: args.order_prop,
        index: args.index.map(|i| i.to_string()),
        active_prop: args.active_prop,
    };
    let settings = filler.resolve(&query)?;
    info!(index = settings.index, "filling card");
    let outcome = filler.fill_daily(&settings).await?;
    println!("{}", serde_json::to_string_pretty(&outcome)?);
    Ok(())
}
