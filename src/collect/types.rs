// src/collect/types.rs
use std::collections::BTreeMap;
use std::fmt;

use chrono::{DateTime, NaiveDate, Utc};
use thiserror::Error;

/// The six productivity services a briefing can draw from.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash)]
#[derive(serde::Serialize, serde::Deserialize)]
pub enum SourceName {
    /// Gmail + Google Calendar (one credential, two endpoints).
    #[serde(rename = "google")]
    MailCalendar,
    #[serde(rename = "slack")]
    Chat,
    #[serde(rename = "gong")]
    Calls,
    #[serde(rename = "monday")]
    Boards,
    #[serde(rename = "notion")]
    Docs,
    #[serde(rename = "miro")]
    Whiteboard,
}

impl SourceName {
    pub const ALL: [SourceName; 6] = [
        SourceName::MailCalendar,
        SourceName::Chat,
        SourceName::Calls,
        SourceName::Boards,
        SourceName::Docs,
        SourceName::Whiteboard,
    ];

    pub fn as_str(&self) -> &'static str {
        match self {
            SourceName::MailCalendar => "google",
            SourceName::Chat => "slack",
            SourceName::Calls => "gong",
            SourceName::Boards => "monday",
            SourceName::Docs => "notion",
            SourceName::Whiteboard => "miro",
        }
    }

    pub fn parse(s: &str) -> Option<SourceName> {
        Self::ALL
            .into_iter()
            .find(|n| n.as_str().eq_ignore_ascii_case(s.trim()))
    }
}

impl fmt::Display for SourceName {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Inclusive calendar-date range a collection run covers.
#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
pub struct FetchWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("invalid fetch window: start {start} is after end {end}")]
pub struct InvalidWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl FetchWindow {
    pub fn new(start: NaiveDate, end: NaiveDate) -> Result<Self, InvalidWindow> {
        let w = Self { start, end };
        w.validate()?;
        Ok(w)
    }

    pub fn single_day(date: NaiveDate) -> Self {
        Self {
            start: date,
            end: date,
        }
    }

    pub fn validate(&self) -> Result<(), InvalidWindow> {
        if self.start > self.end {
            return Err(InvalidWindow {
                start: self.start,
                end: self.end,
            });
        }
        Ok(())
    }

    /// Midnight UTC at the start of the first day.
    pub fn start_utc(&self) -> DateTime<Utc> {
        self.start
            .and_hms_opt(0, 0, 0)
            .expect("midnight is always valid")
            .and_utc()
    }

    /// Last second UTC of the final day (inclusive upper bound).
    pub fn end_utc(&self) -> DateTime<Utc> {
        self.end
            .and_hms_opt(23, 59, 59)
            .expect("23:59:59 is always valid")
            .and_utc()
    }

    pub fn contains(&self, ts: DateTime<Utc>) -> bool {
        ts >= self.start_utc() && ts <= self.end_utc()
    }
}

/// Common envelope for provider records (a message, event, call, task,
/// page or board). `external_id` is unique only within one source.
#[derive(Debug, Clone, PartialEq, serde::Serialize, serde::Deserialize)]
pub struct RawItem {
    pub source: SourceName,
    pub external_id: String,
    pub timestamp: DateTime<Utc>,
    pub title: String,
    pub body: String,
    #[serde(default)]
    pub metadata: serde_json::Value,
}

/// Typed failure taxonomy for one source fetch.
///
/// `NotConfigured` is raised at client construction when credentials are
/// absent; it must stay distinguishable from `Auth` so status reporting can
/// say "not configured" instead of "broken".
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum SourceError {
    #[error("not configured: {0}")]
    NotConfigured(String),
    #[error("auth failed: {0}")]
    Auth(String),
    #[error("transient: {0}")]
    Transient(String),
}

impl SourceError {
    pub fn is_retryable(&self) -> bool {
        matches!(self, SourceError::Transient(_))
    }
}

/// Capability contract every provider client implements.
///
/// Clients own their HTTP session exclusively and share no state, so the
/// orchestrator can drive all of them concurrently without locking.
#[async_trait::async_trait]
pub trait SourceClient: Send + Sync {
    fn name(&self) -> SourceName;

    /// Cheapest authenticated call the provider offers. Never errors:
    /// ordinary auth/network failure is reported as `false`.
    async fn test_connection(&self) -> bool;

    /// Fetch provider records overlapping the window. Providers that
    /// support server-side time filtering get the bounds pushed down;
    /// the rest are filtered client-side after the fetch.
    async fn fetch_items(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError>;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum SourceStatus {
    Success,
    Partial,
    Failed,
    NotConfigured,
}

impl fmt::Display for SourceStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            SourceStatus::Success => "success",
            SourceStatus::Partial => "partial",
            SourceStatus::Failed => "failed",
            SourceStatus::NotConfigured => "not_configured",
        };
        f.write_str(s)
    }
}

/// Outcome of one source in one collection run. Immutable once built.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CollectionResult {
    pub source: SourceName,
    pub status: SourceStatus,
    pub items: Vec<RawItem>,
    pub error_message: Option<String>,
    /// Fetch attempts made, including retries. 0 for not-configured sources.
    pub attempts: u32,
    pub duration_ms: u64,
}

impl CollectionResult {
    pub fn success(source: SourceName, items: Vec<RawItem>, attempts: u32, duration_ms: u64) -> Self {
        Self {
            source,
            status: SourceStatus::Success,
            items,
            error_message: None,
            attempts,
            duration_ms,
        }
    }

    pub fn failed(source: SourceName, err: &SourceError, attempts: u32, duration_ms: u64) -> Self {
        let status = match err {
            SourceError::NotConfigured(_) => SourceStatus::NotConfigured,
            _ => SourceStatus::Failed,
        };
        Self {
            source,
            status,
            items: Vec::new(),
            error_message: Some(err.to_string()),
            attempts,
            duration_ms,
        }
    }
}

/// Aggregate snapshot of one collection run: exactly one result per known
/// source. Built once by the orchestrator and never mutated afterwards.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct CollectedData {
    pub window: FetchWindow,
    pub requested_at: DateTime<Utc>,
    pub results: BTreeMap<SourceName, CollectionResult>,
}

impl CollectedData {
    pub fn result(&self, source: SourceName) -> Option<&CollectionResult> {
        self.results.get(&source)
    }

    pub fn items(&self, source: SourceName) -> &[RawItem] {
        self.results
            .get(&source)
            .map(|r| r.items.as_slice())
            .unwrap_or(&[])
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn d(s: &str) -> NaiveDate {
        s.parse().unwrap()
    }

    #[test]
    fn window_rejects_reversed_dates() {
        let err = FetchWindow::new(d("2026-01-10"), d("2026-01-01")).unwrap_err();
        assert_eq!(err.start, d("2026-01-10"));
        assert!(err.to_string().contains("is after"));
    }

    #[test]
    fn window_bounds_cover_whole_days() {
        let w = FetchWindow::single_day(d("2026-03-05"));
        assert_eq!(w.start_utc().to_rfc3339(), "2026-03-05T00:00:00+00:00");
        assert_eq!(w.end_utc().to_rfc3339(), "2026-03-05T23:59:59+00:00");
        assert!(w.contains(d("2026-03-05").and_hms_opt(12, 0, 0).unwrap().and_utc()));
        assert!(!w.contains(d("2026-03-06").and_hms_opt(0, 0, 0).unwrap().and_utc()));
    }

    #[test]
    fn source_name_round_trips_wire_string() {
        for name in SourceName::ALL {
            assert_eq!(SourceName::parse(name.as_str()), Some(name));
        }
        assert_eq!(SourceName::parse(" SLACK "), Some(SourceName::Chat));
        assert_eq!(SourceName::parse("jira"), None);
    }

    #[test]
    fn only_transient_errors_are_retryable() {
        assert!(SourceError::Transient("timeout".into()).is_retryable());
        assert!(!SourceError::Auth("expired".into()).is_retryable());
        assert!(!SourceError::NotConfigured("no token".into()).is_retryable());
    }

    #[test]
    fn failed_result_keeps_error_kind_wording() {
        let r = CollectionResult::failed(
            SourceName::Docs,
            &SourceError::NotConfigured("NOTION_API_TOKEN missing".into()),
            0,
            0,
        );
        assert_eq!(r.status, SourceStatus::NotConfigured);
        assert_eq!(
            r.error_message.as_deref(),
            Some("not configured: NOTION_API_TOKEN missing")
        );
    }
}
