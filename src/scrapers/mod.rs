//! The extract stage: homepage link discovery and concurrent page scraping.
//!
//! Extraction runs in two phases per source:
//!
//! 1. **Indexing** ([`homepage`]): fetch the source homepage and collect every
//!    anchor `href` in document order
//! 2. **Fetching** ([`article`]): fetch each link on a bounded pool of
//!    concurrent requests and pull out title and description
//!
//! Sources are processed one after another. Within a source, results are
//! collected in link order regardless of which request finishes first.
//!
//! Network failures never escape this module. A homepage that cannot be
//! fetched skips the whole source; a link that cannot be fetched contributes
//! no record. Both are logged at error level.

pub mod article;
pub mod homepage;

use crate::config::PipelineConfig;
use crate::errors::FetchError;
use crate::models::{PageMeta, Record, SourceStats};
use futures::stream::{self, StreamExt};
use itertools::Itertools;
use reqwest::Client;
use tracing::{error, info, instrument};

/// Output of the extract stage.
#[derive(Debug, Default)]
pub struct Extraction {
    /// Records from every source, ids assigned from 1 in output order.
    pub records: Vec<Record>,
    /// One entry per configured source, in configuration order.
    pub sources: Vec<SourceStats>,
}

/// Build the HTTP client shared by every fetch in a run.
pub fn build_client(config: &PipelineConfig) -> Result<Client, reqwest::Error> {
    Client::builder()
        .timeout(config.request_timeout())
        .user_agent(config.user_agent.clone())
        .build()
}

/// Run the extract stage over every configured source.
#[instrument(level = "info", skip_all, fields(sources = config.sources.len(), pool = config.worker_pool_size))]
pub async fn extract(config: &PipelineConfig, client: &Client) -> Extraction {
    let mut pages: Vec<PageMeta> = Vec::new();
    let mut stats = Vec::with_capacity(config.sources.len());

    for source in &config.sources {
        let (source_pages, source_stats) =
            extract_source(client, source, config.worker_pool_size).await;
        pages.extend(source_pages);
        stats.push(source_stats);
    }

    let records: Vec<Record> = pages
        .into_iter()
        .zip(1u64..)
        .map(|(page, id)| page.into_record(id))
        .collect();

    info!(count = records.len(), "Extraction complete");
    Extraction {
        records,
        sources: stats,
    }
}

/// Run `fetch` over `links` with at most `pool_size` calls in flight.
///
/// Results come back in `links` order, not completion order. A `pool_size` of
/// zero is treated as one.
pub async fn fetch_all<T, F, Fut>(links: Vec<String>, pool_size: usize, fetch: F) -> Vec<T>
where
    F: FnMut(String) -> Fut,
    Fut: Future<Output = T>,
{
    stream::iter(links)
        .map(fetch)
        .buffered(pool_size.max(1))
        .collect()
        .await
}

/// Index one source and scrape all of its links.
#[instrument(level = "info", skip(client, pool_size))]
pub async fn extract_source(
    client: &Client,
    source: &str,
    pool_size: usize,
) -> (Vec<PageMeta>, SourceStats) {
    let mut stats = SourceStats {
        source: source.to_string(),
        ..Default::default()
    };

    let links = match homepage::index_links(client, source).await {
        Ok(links) => links,
        Err(e) => {
            error!(%source, error = %e, "Failed to fetch source homepage; skipping source");
            stats.source_failed = true;
            return (Vec::new(), stats);
        }
    };
    stats.links_found = links.len();

    let outcomes: Vec<Result<PageMeta, FetchError>> =
        fetch_all(links, pool_size, |href| article::fetch_and_extract(client, source, href)).await;

    let (pages, failures): (Vec<PageMeta>, Vec<FetchError>) =
        outcomes.into_iter().partition_result();

    for failure in &failures {
        error!(url = %failure.url(), error = %failure, "Failed to fetch linked page; dropping link");
    }

    stats.pages_fetched = pages.len();
    stats.fetch_failures = failures.len();
    info!(
        %source,
        links = stats.links_found,
        fetched = stats.pages_fetched,
        failed = stats.fetch_failures,
        "Scraped source"
    );

    (pages, stats)
}
