use std::str::FromStr;
use std::sync::Arc;

use anyhow::Result;
use sqlx::postgres::PgConnectOptions;
use sqlx::ConnectOptions;
use tokio::select;
use tokio::signal::unix::{signal, SignalKind};

mod api;
mod config;
mod crypto;
mod database;
mod gc;
mod geo;
mod geocode;
mod global;
mod jwt;
mod logging;
mod notifier;
mod search;

#[tokio::main]
async fn main() -> Result<()> {
    let config = config::AppConfig::parse()?;

    logging::init(&config.logging.level, config.logging.mode)?;

    if let Some(file) = &config.config_file {
        tracing::info!(file = file, "loaded config from file");
    }

    tracing::debug!("config: {:#?}", config);

    let db = Arc::new(
        sqlx::PgPool::connect_with(
            PgConnectOptions::from_str(&config.database.uri)?
                .disable_statement_logging()
                .to_owned(),
        )
        .await?,
    );

    // Sets the similarity threshold for trigram matching to 0.1
    // Default is 0.3
    sqlx::query("SET pg_trgm.similarity_threshold = 0.1")
        .execute(&*db)
        .await?;

    let push = Arc::new(notifier::FcmClient::new(&config.push));

    let global = Arc::new(global::GlobalState::new(config, db, push));

    tracing::info!(name = %global.config.name, "starting api");

    let api_future = tokio::spawn(api::run(global.clone()));
    let prune_future = tokio::spawn(gc::device_prune_loop(global.clone()));

    // Listen on both sigint and sigterm and stop when either is received
    let mut sigint = signal(SignalKind::interrupt())?;
    let mut sigterm = signal(SignalKind::terminate())?;

    select! {
        r = api_future => tracing::error!("api stopped unexpectedly: {:?}", r),
        r = prune_future => tracing::error!("device prune loop stopped unexpectedly: {:?}", r),
        _ = sigint.recv() => tracing::info!("received sigint, shutting down"),
        _ = sigterm.recv() => tracing::info!("received sigterm, shutting down"),
    }

    Ok(())
}
