//! The transform stage: drop records whose title or description is missing.

use crate::models::Record;
use tracing::{info, instrument};

/// Keep only records with both a real title and a real description.
///
/// Order is preserved. `None` (nothing handed over from extract) and an empty
/// vector both produce an empty result and are not errors.
#[instrument(level = "info", skip_all)]
pub fn transform(records: Option<Vec<Record>>) -> Vec<Record> {
    let records = match records {
        Some(r) if !r.is_empty() => r,
        _ => {
            info!("No data received from extract");
            return Vec::new();
        }
    };

    let total = records.len();
    let kept: Vec<Record> = records.into_iter().filter(Record::is_complete).collect();
    info!(total, kept = kept.len(), dropped = total - kept.len(), "Filtered incomplete records");
    kept
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NO_DESCRIPTION, NO_TITLE};

    fn rec(id: u64, title: &str, description: &str) -> Record {
        Record {
            id,
            title: title.to_string(),
            description: description.to_string(),
            href: format!("https://example.com/{id}"),
        }
    }

    #[test]
    fn test_transform_none_and_empty() {
        assert!(transform(None).is_empty());
        assert!(transform(Some(Vec::new())).is_empty());
    }

    #[test]
    fn test_transform_drops_sentinels() {
        let input = vec![
            rec(1, "A", "a"),
            rec(2, NO_TITLE, "b"),
            rec(3, "C", NO_DESCRIPTION),
            rec(4, NO_TITLE, NO_DESCRIPTION),
            rec(5, "E", "e"),
        ];
        let out = transform(Some(input));
        let ids: Vec<u64> = out.iter().map(|r| r.id).collect();
        assert_eq!(ids, vec![1, 5]);
    }

    #[test]
    fn test_transform_output_is_ordered_subsequence() {
        let input: Vec<Record> = (1..=20)
            .map(|i| match i % 3 {
                0 => rec(i, NO_TITLE, "x"),
                1 => rec(i, "t", NO_DESCRIPTION),
                _ => rec(i, "t", "x"),
            })
            .collect();

        let out = transform(Some(input.clone()));

        let mut it = input.iter();
        for kept in &out {
            assert!(it.any(|r| r == kept), "record {} out of order or invented", kept.id);
            assert_ne!(kept.title, NO_TITLE);
            assert_ne!(kept.description, NO_DESCRIPTION);
        }
        assert_eq!(out.len(), input.iter().filter(|r| r.is_complete()).count());
    }

    #[test]
    fn test_transform_empty_strings_are_kept() {
        let out = transform(Some(vec![rec(1, "", "")]));
        assert_eq!(out.len(), 1);
    }
}
