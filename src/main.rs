use anyhow::Result;
use clap::Parser;
use std::net::SocketAddr;
use std::path::PathBuf;
use std::sync::Arc;
use tracing::info;

use verse_filler::config::{self, Config, EnvSource};
use verse_filler::web;

#[derive(Debug, Parser)]
#[command(author, version, about)]
struct Args {
    /// Optional YAML file of fallback settings
    #[arg(long)]
    config: Option<PathBuf>,

    /// Listen address; overrides BIND_ADDRESS
    #[arg(long)]
    bind: Option<SocketAddr>,

    /// Print a sample settings file and exit
    #[arg(long)]
    print_example: bool,
}

#[tokio::main]
async fn main() -> Result<()> {
    let args = Args::parse();
    if args.print_example {
        print!("{}", config::example());
        return Ok(());
    }
    let src = match &args.config {
        Some(path) => EnvSource::with_file(path)?,
        None => EnvSource::from_process(),
    };
    verse_filler::init_tracing(&src);

    let cfg = Config::load(&src)?;
    if cfg.fill_secret.is_none() {
        tracing::warn!("FILL_SECRET is not set; every fill request will be rejected");
    }
    let bind = args.bind.unwrap_or(cfg.bind_address);

    let filler = Arc::new(verse_filler::live_filler(cfg)?);
    let app = web::router(filler);

    info!(%bind, "starting verse filler");
    let listener = tokio::net::TcpListener::bind(bind).await?;
    axum::serve(listener, app)
        .with_graceful_shutdown(async {
            tokio::signal::ctrl_c().await.ok();
            info!("shutting down");
        })
        .await?;

    Ok(())
}
