//! Source homepage fetching and link discovery.
//!
//! A homepage contributes every `<a href>` it contains, in document order.
//! No filtering is applied here: navigation, social and off-site links are
//! all fetched, and whatever fails simply yields no record.

use crate::errors::FetchError;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, info, instrument, warn};

static LINK_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("a[href]").expect("static selector"));

/// GET `url` and return the response body as text.
///
/// Only transport failures are errors. Non-2xx responses are logged and their
/// body is still returned, since error pages carry markup like any other.
#[instrument(level = "debug", skip(client))]
pub async fn fetch_page(client: &Client, url: &str) -> Result<String, FetchError> {
    let response = client
        .get(url)
        .send()
        .await
        .map_err(|source| FetchError::Request {
            url: url.to_string(),
            source,
        })?;

    let status = response.status();
    if !status.is_success() {
        warn!(%url, %status, "Non-success status; parsing body anyway");
    }

    response.text().await.map_err(|source| FetchError::Body {
        url: url.to_string(),
        source,
    })
}

/// Collect the `href` of every anchor in `html`, in document order.
pub fn discover_links(html: &str) -> Vec<String> {
    let document = Html::parse_document(html);
    document
        .select(&LINK_SELECTOR)
        .filter_map(|a| a.value().attr("href"))
        .map(str::to_string)
        .collect()
}

/// Fetch a source homepage and return its links.
#[instrument(level = "info", skip(client))]
pub async fn index_links(client: &Client, source: &str) -> Result<Vec<String>, FetchError> {
    let html = fetch_page(client, source).await?;
    let links = discover_links(&html);
    info!(count = links.len(), %source, "Indexed homepage links");
    debug!(links = ?links, "Homepage links");
    Ok(links)
}
