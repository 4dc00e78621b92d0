use anyhow::Result;
use std::io;
use tracing_subscriber::EnvFilter;

mod config;
mod errors;
mod models;
mod services;

use services::{renamer::RenameCopier, s3_store::S3Store};

#[tokio::main]
async fn main() -> Result<()> {
    // --- Logging setup ---
    // stdout is reserved for the per-copy lines.
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::from_default_env())
        .with_writer(io::stderr)
        .init();

    // --- Parse config ---
    let cfg = config::AppConfig::from_env_and_args()?;

    tracing::info!("Starting cur-rename-copy with config: {:?}", cfg);
    tracing::debug!(
        "Search prefix {} derived from base prefix {:?}",
        cfg.search_prefix,
        cfg.base_prefix
    );

    // --- Initialize storage client ---
    let store = S3Store::connect(&cfg.s3_settings()).await;

    // --- Run ---
    let plan = cfg.rename_plan();
    let stdout = io::stdout();
    RenameCopier::new(&store, &plan)
        .run(&mut stdout.lock())
        .await?;

    Ok(())
}
