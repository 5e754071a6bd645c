// src/collect/status.rs
//
// Pure, derived views over `CollectedData`. Nothing here holds state;
// everything is recomputed from the run snapshot on demand.

use std::collections::BTreeMap;
use std::fmt;

use crate::collect::types::{CollectedData, SourceName, SourceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OverallStatus {
    /// Every configured source succeeded.
    Success,
    /// At least one configured source succeeded and at least one failed.
    Partial,
    /// Every configured source failed, or none were configured.
    Failed,
}

impl fmt::Display for OverallStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            OverallStatus::Success => "success",
            OverallStatus::Partial => "partial",
            OverallStatus::Failed => "failed",
        };
        f.write_str(s)
    }
}

/// Items collected for one source; 0 when it failed or is not configured.
pub fn items_collected(data: &CollectedData, source: SourceName) -> usize {
    data.result(source).map(|r| r.items.len()).unwrap_or(0)
}

pub fn total_items(data: &CollectedData) -> usize {
    data.results.values().map(|r| r.items.len()).sum()
}

pub fn source_counts(data: &CollectedData) -> BTreeMap<SourceName, usize> {
    data.results
        .iter()
        .map(|(name, r)| (*name, r.items.len()))
        .collect()
}

/// Derive the run verdict. Not-configured sources do not count as
/// configured, so a run where nothing had credentials is `failed`.
pub fn overall_status(data: &CollectedData) -> OverallStatus {
    let mut succeeded = 0usize;
    let mut failed = 0usize;
    for r in data.results.values() {
        match r.status {
            SourceStatus::Success | SourceStatus::Partial => succeeded += 1,
            SourceStatus::Failed => failed += 1,
            SourceStatus::NotConfigured => {}
        }
    }
    match (succeeded, failed) {
        (0, _) => OverallStatus::Failed,
        (_, 0) => OverallStatus::Success,
        _ => OverallStatus::Partial,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::types::{
        CollectionResult, FetchWindow, RawItem, SourceError, SourceName,
    };
    use chrono::Utc;

    fn item(source: SourceName, id: &str) -> RawItem {
        RawItem {
            source,
            external_id: id.to_string(),
            timestamp: Utc::now(),
            title: id.to_string(),
            body: String::new(),
            metadata: serde_json::Value::Null,
        }
    }

    fn data(results: Vec<CollectionResult>) -> CollectedData {
        CollectedData {
            window: FetchWindow::single_day("2026-02-01".parse().unwrap()),
            requested_at: Utc::now(),
            results: results.into_iter().map(|r| (r.source, r)).collect(),
        }
    }

    fn ok(source: SourceName, n: usize) -> CollectionResult {
        let items = (0..n).map(|i| item(source, &format!("{i}"))).collect();
        CollectionResult::success(source, items, 1, 5)
    }

    fn bad(source: SourceName) -> CollectionResult {
        CollectionResult::failed(source, &SourceError::Transient("boom".into()), 3, 5)
    }

    fn unconfigured(source: SourceName) -> CollectionResult {
        CollectionResult::failed(source, &SourceError::NotConfigured("no token".into()), 0, 0)
    }

    #[test]
    fn counts_come_from_item_sequences() {
        let d = data(vec![ok(SourceName::Chat, 3), bad(SourceName::Calls)]);
        assert_eq!(items_collected(&d, SourceName::Chat), 3);
        assert_eq!(items_collected(&d, SourceName::Calls), 0);
        assert_eq!(items_collected(&d, SourceName::Docs), 0);
        assert_eq!(total_items(&d), 3);
        assert_eq!(source_counts(&d)[&SourceName::Chat], 3);
    }

    #[test]
    fn all_success_is_success() {
        let d = data(vec![ok(SourceName::Chat, 1), ok(SourceName::Docs, 0)]);
        assert_eq!(overall_status(&d), OverallStatus::Success);
    }

    #[test]
    fn mixed_is_partial() {
        let d = data(vec![
            ok(SourceName::Chat, 2),
            ok(SourceName::Docs, 1),
            bad(SourceName::Calls),
        ]);
        assert_eq!(overall_status(&d), OverallStatus::Partial);
    }

    #[test]
    fn all_failed_is_failed() {
        let d = data(vec![bad(SourceName::Chat), bad(SourceName::Calls)]);
        assert_eq!(overall_status(&d), OverallStatus::Failed);
    }

    #[test]
    fn nothing_configured_is_failed() {
        let d = data(vec![unconfigured(SourceName::Chat)]);
        assert_eq!(overall_status(&d), OverallStatus::Failed);
        let empty = data(vec![]);
        assert_eq!(overall_status(&empty), OverallStatus::Failed);
    }

    #[test]
    fn not_configured_does_not_drag_down_success() {
        let d = data(vec![ok(SourceName::Chat, 1), unconfigured(SourceName::Docs)]);
        assert_eq!(overall_status(&d), OverallStatus::Success);
    }
}
