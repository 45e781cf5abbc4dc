//! Small helpers shared by the pipeline stages.
//!
//! - URL resolution for links discovered on a source homepage
//! - String truncation for log fields
//! - Directory preparation for the output file

use std::io;
use std::path::Path;
use tracing::{debug, instrument};
use url::Url;

/// Resolve a homepage link to the URL that should be fetched.
///
/// Links starting with `/` are joined against `source`. Everything else is
/// returned untouched; links that are not fetchable (fragments, `mailto:`,
/// bare relative paths) then fail at request time and are dropped there.
///
/// # Examples
///
/// ```ignore
/// assert_eq!(resolve_href("https://www.dawn.com/", "/news/1"), "https://www.dawn.com/news/1");
/// assert_eq!(resolve_href("https://www.dawn.com/", "https://bbc.com/x"), "https://bbc.com/x");
/// ```
pub fn resolve_href(source: &str, href: &str) -> String {
    if !href.starts_with('/') {
        return href.to_string();
    }
    match Url::parse(source).and_then(|base| base.join(href)) {
        Ok(resolved) => resolved.to_string(),
        Err(e) => {
            debug!(%source, %href, error = %e, "Could not resolve link against source");
            href.to_string()
        }
    }
}

/// Truncate a string for logging purposes.
///
/// Long strings are cut to at most `max` bytes (on a char boundary) and an
/// ellipsis with the number of dropped bytes is appended.
pub fn truncate_for_log(s: &str, max: usize) -> String {
    if s.len() <= max {
        return s.to_string();
    }
    let mut cut = max;
    while !s.is_char_boundary(cut) {
        cut -= 1;
    }
    format!("{}…(+{} bytes)", &s[..cut], s.len() - cut)
}

/// Create the parent directory of `path` if it is missing.
#[instrument(level = "debug", skip_all, fields(path = %path.display()))]
pub fn ensure_parent_dir(path: &Path) -> io::Result<()> {
    match path.parent() {
        Some(parent) if !parent.as_os_str().is_empty() => std::fs::create_dir_all(parent),
        _ => Ok(()),
    }
}
