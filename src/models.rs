//! Data models flowing through the pipeline.
//!
//! - [`PageMeta`]: title and description scraped from one linked page
//! - [`Record`]: an identified [`PageMeta`], the unit written to the CSV file
//! - [`SourceStats`] and [`RunReport`]: per-run bookkeeping serialized as JSON
//!
//! Missing fields are carried as sentinel strings rather than `Option`s so the
//! CSV output keeps a fixed four-column shape.

use serde::{Deserialize, Serialize};

/// Placeholder stored when a linked page has no `<title>` element.
pub const NO_TITLE: &str = "No title available";

/// Placeholder stored when a linked page has no usable description meta tag.
pub const NO_DESCRIPTION: &str = "No description available";

/// Metadata extracted from a single linked page, before an id is assigned.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PageMeta {
    /// Trimmed text of the page's `<title>`, or [`NO_TITLE`].
    pub title: String,
    /// Trimmed `content` of `<meta name="description">`, or [`NO_DESCRIPTION`].
    pub description: String,
    /// The absolute URL the metadata was fetched from.
    pub href: String,
}

impl PageMeta {
    /// Attach an identifier, turning the page into a [`Record`].
    pub fn into_record(self, id: u64) -> Record {
        Record {
            id,
            title: self.title,
            description: self.description,
            href: self.href,
        }
    }
}

/// One scraped article.
///
/// Field order is the CSV column order: `id, title, description, href`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Record {
    pub id: u64,
    pub title: String,
    pub description: String,
    pub href: String,
}

impl Record {
    /// `true` when both title and description were actually found on the page.
    pub fn is_complete(&self) -> bool {
        self.title != NO_TITLE && self.description != NO_DESCRIPTION
    }
}

/// Counters collected while extracting one source homepage.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct SourceStats {
    pub source: String,
    /// Set when the homepage itself could not be fetched.
    pub source_failed: bool,
    pub links_found: usize,
    pub pages_fetched: usize,
    pub fetch_failures: usize,
}

/// Summary of one pipeline run.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct RunReport {
    /// Run start in RFC 3339.
    pub started_at: String,
    pub sources: Vec<SourceStats>,
    pub extracted: usize,
    pub kept: usize,
    pub output_path: Option<String>,
    pub snapshot_ran: bool,
    pub publish_ran: bool,
    /// Whether the publish step created a commit; `false` when nothing was staged.
    pub committed: bool,
    pub elapsed_ms: u128,
    /// Error that ended the run, if any.
    pub error: Option<String>,
}
