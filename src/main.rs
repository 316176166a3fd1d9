mod cache;
mod cli;
mod config;
mod error;
mod feed;
mod http;
mod locale;
mod model;
mod output;
mod query;
mod scraper;
mod server;

use anyhow::{Context, Result};
use clap::Parser;
use cli::{Cli, Commands};
use config::AppConfig;
use std::sync::Arc;

use crate::http::session::Session;
use crate::output::OutputFormat;
use crate::query::{QueryTarget, RawParams};

#[tokio::main]
async fn main() -> Result<()> {
    let cli = Cli::parse();

    let filter = if cli.debug {
        "amazon_feed=debug"
    } else {
        "amazon_feed=info"
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::try_from_default_env()
                .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();

    let bind = match &cli.command {
        Commands::Serve { bind } => bind.clone(),
        _ => None,
    };
    let config = AppConfig::load(cli.country.clone(), cli.no_cache, cli.debug, bind)
        .context("Failed to load configuration")?;
    if config.debug {
        tracing::debug!("Effective configuration: {:?}", config);
    }

    ctrlc::set_handler(|| {
        eprintln!("\nInterrupted.");
        std::process::exit(130);
    })
    .context("Failed to set Ctrl+C handler")?;

    let session = Session::new(&config).context("Failed to create HTTP session")?;

    match cli.command {
        Commands::Search { query, strict } => {
            let params = RawParams {
                query: Some(query),
                country: Some(config.country.clone()),
                min_price: cli.min_price,
                max_price: cli.max_price,
                strict: strict.then(|| "true".to_string()),
                jsonld: cli.jsonld.then(|| "true".to_string()),
            };
            cmd_feed(&session, &config, QueryTarget::Keyword, &params, cli.format).await?;
        }
        Commands::Item { id } => {
            let params = RawParams {
                query: Some(id),
                country: Some(config.country.clone()),
                min_price: cli.min_price,
                max_price: cli.max_price,
                strict: None,
                jsonld: cli.jsonld.then(|| "true".to_string()),
            };
            cmd_feed(&session, &config, QueryTarget::ItemId, &params, cli.format).await?;
        }
        Commands::Serve { .. } => {
            let state = server::AppState {
                session: Arc::new(session),
                config: Arc::new(config),
            };
            server::serve(state).await.context("HTTP server failed")?;
        }
    }

    Ok(())
}

async fn cmd_feed(
    session: &Session,
    config: &AppConfig,
    target: QueryTarget,
    params: &RawParams,
    format: OutputFormat,
) -> Result<()> {
    let query = query::resolve(target, params).map_err(error::FeedError::from)?;

    if query.linked_data {
        let products = scraper::generate_linked_data(session, config, &query)
            .await
            .with_context(|| format!("Failed to build linked data for \"{}\"", query.text))?;
        let page = feed::linked_data::linked_data_page(&products).context("Failed to render linked data")?;
        print!("{}", page);
        return Ok(());
    }

    let feed = scraper::generate_feed(session, config, &query)
        .await
        .with_context(|| format!("Failed to build feed for \"{}\"", query.text))?;

    let rendered = output::render_feed(&feed, format).context("Failed to render feed")?;
    print!("{}", rendered);
    Ok(())
}
