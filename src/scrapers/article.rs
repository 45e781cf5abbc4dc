//! Per-link fetch and metadata extraction.
//!
//! Each linked page contributes its `<title>` text and the `content` of its
//! `<meta name="description">`. Missing pieces become the sentinel strings
//! from [`crate::models`] so the record shape never changes.

use crate::errors::FetchError;
use crate::models::{NO_DESCRIPTION, NO_TITLE, PageMeta};
use crate::scrapers::homepage::fetch_page;
use crate::utils::resolve_href;
use once_cell::sync::Lazy;
use reqwest::Client;
use scraper::{Html, Selector};
use tracing::{debug, instrument};

static TITLE_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse("title").expect("static selector"));
static DESCRIPTION_SELECTOR: Lazy<Selector> =
    Lazy::new(|| Selector::parse(r#"meta[name="description"]"#).expect("static selector"));

/// Resolve `href` against `source`, fetch it, and extract its metadata.
#[instrument(level = "debug", skip(client, source))]
pub async fn fetch_and_extract(
    client: &Client,
    source: &str,
    href: String,
) -> Result<PageMeta, FetchError> {
    let url = resolve_href(source, &href);
    let body = fetch_page(client, &url).await?;
    let meta = parse_page_meta(&body, url);
    debug!(href = %meta.href, title = %meta.title, "Extracted page metadata");
    Ok(meta)
}

/// Pull title and description out of an HTML document.
///
/// Only the first `<title>` and the first `meta[name="description"]` are
/// considered; a description tag without a `content` attribute counts as
/// missing.
pub fn parse_page_meta(html: &str, href: String) -> PageMeta {
    let document = Html::parse_document(html);

    let title = document
        .select(&TITLE_SELECTOR)
        .next()
        .map(|t| t.text().collect::<String>().trim().to_string())
        .unwrap_or_else(|| NO_TITLE.to_string());

    let description = document
        .select(&DESCRIPTION_SELECTOR)
        .next()
        .and_then(|m| m.value().attr("content"))
        .map(|c| c.trim().to_string())
        .unwrap_or_else(|| NO_DESCRIPTION.to_string());

    PageMeta {
        title,
        description,
        href,
    }
}
