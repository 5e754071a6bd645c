// src/briefing.rs
//
// Briefing model, the summarizer boundary, and a deterministic digest
// summarizer. The LLM-backed summarizer lives behind the `Summarizer`
// trait and is swapped in by the deployment; the core only hands over
// `CollectedData` unmodified and in full.

use chrono::{DateTime, NaiveDate, Utc};

use crate::collect::status::{self, OverallStatus};
use crate::collect::types::{CollectedData, RawItem, SourceName, SourceStatus};

#[derive(Debug, Clone, Copy, PartialEq, Eq, serde::Serialize, serde::Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum BriefingStatus {
    Pending,
    Collecting,
    Processing,
    Completed,
    Failed,
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct BriefingSection {
    pub title: String,
    /// Markdown body.
    pub content: String,
    /// Higher sorts first.
    pub priority: i32,
    pub source_count: usize,
}

#[derive(Debug, Clone, Default, serde::Serialize, serde::Deserialize)]
pub struct BriefingSummary {
    pub key_highlights: Vec<String>,
    pub action_items: Vec<String>,
}

/// Read-only per-source row for rendering; everything a delivery layer
/// needs, nothing format-specific.
#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct DataSourceStatus {
    pub source_name: SourceName,
    pub status: SourceStatus,
    pub items_collected: usize,
    pub error_message: Option<String>,
    pub duration_ms: u64,
}

impl DataSourceStatus {
    pub fn from_collected(data: &CollectedData) -> Vec<Self> {
        data.results
            .values()
            .map(|r| Self {
                source_name: r.source,
                status: r.status,
                items_collected: r.items.len(),
                error_message: r.error_message.clone(),
                duration_ms: r.duration_ms,
            })
            .collect()
    }
}

pub fn briefing_id(date: NaiveDate) -> String {
    format!("briefing-{date}")
}

#[derive(Debug, Clone, serde::Serialize, serde::Deserialize)]
pub struct Briefing {
    pub id: String,
    pub date: NaiveDate,
    pub status: BriefingStatus,
    pub overall_status: OverallStatus,
    pub summary: Option<BriefingSummary>,
    pub sections: Vec<BriefingSection>,
    pub generated_at: DateTime<Utc>,
    pub processing_time_seconds: Option<f64>,
    pub data_sources: Vec<DataSourceStatus>,
    /// Raw collected data, included only when the caller asked for it.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub raw_data: Option<CollectedData>,
}

/// Downstream narrative producer. Consumes the whole run snapshot and
/// returns an executive summary plus ordered sections.
#[async_trait::async_trait]
pub trait Summarizer: Send + Sync {
    async fn summarize(
        &self,
        data: &CollectedData,
    ) -> anyhow::Result<(BriefingSummary, Vec<BriefingSection>)>;
}

/// Deterministic fallback summarizer: one markdown section per source
/// that produced items, newest first. Keeps the service end-to-end
/// useful without any model behind it.
pub struct DigestSummarizer;

fn section_title(source: SourceName) -> &'static str {
    match source {
        SourceName::MailCalendar => "Mail & Calendar",
        SourceName::Chat => "Team Chat",
        SourceName::Calls => "Customer Calls",
        SourceName::Boards => "Project Boards",
        SourceName::Docs => "Docs & Notes",
        SourceName::Whiteboard => "Whiteboards",
    }
}

fn section_priority(source: SourceName) -> i32 {
    match source {
        SourceName::Calls => 10,
        SourceName::MailCalendar => 8,
        SourceName::Chat => 6,
        SourceName::Boards => 5,
        SourceName::Docs => 4,
        SourceName::Whiteboard => 3,
    }
}

const MAX_LINES_PER_SECTION: usize = 20;

fn digest_line(item: &RawItem) -> String {
    let mut line = format!("- [{}] {}", item.timestamp.format("%H:%M"), item.title);
    if !item.body.is_empty() {
        let preview: String = item.body.chars().take(120).collect();
        line.push_str(" — ");
        line.push_str(&preview);
    }
    line
}

#[async_trait::async_trait]
impl Summarizer for DigestSummarizer {
    async fn summarize(
        &self,
        data: &CollectedData,
    ) -> anyhow::Result<(BriefingSummary, Vec<BriefingSection>)> {
        let mut sections = Vec::new();
        let mut highlights = Vec::new();
        let mut action_items = Vec::new();

        for result in data.results.values() {
            if result.items.is_empty() {
                if result.status == SourceStatus::Failed {
                    action_items.push(format!(
                        "Check {} connection ({})",
                        result.source,
                        result.error_message.as_deref().unwrap_or("unknown error")
                    ));
                }
                continue;
            }

            let mut items: Vec<&RawItem> = result.items.iter().collect();
            items.sort_by_key(|i| std::cmp::Reverse(i.timestamp));

            let content = items
                .iter()
                .take(MAX_LINES_PER_SECTION)
                .map(|i| digest_line(i))
                .collect::<Vec<_>>()
                .join("\n");

            highlights.push(format!(
                "{} items from {}",
                result.items.len(),
                section_title(result.source)
            ));
            sections.push(BriefingSection {
                title: section_title(result.source).to_string(),
                content,
                priority: section_priority(result.source),
                source_count: 1,
            });
        }

        sections.sort_by_key(|s| std::cmp::Reverse(s.priority));
        highlights.truncate(5);

        Ok((
            BriefingSummary {
                key_highlights: highlights,
                action_items,
            },
            sections,
        ))
    }
}

/// Assemble a finished briefing from a collection run and the
/// summarizer's output.
pub fn build_briefing(
    date: NaiveDate,
    data: CollectedData,
    summary: BriefingSummary,
    sections: Vec<BriefingSection>,
    processing_time_seconds: f64,
    include_raw_data: bool,
) -> Briefing {
    Briefing {
        id: briefing_id(date),
        date,
        status: BriefingStatus::Completed,
        overall_status: status::overall_status(&data),
        summary: Some(summary),
        sections,
        generated_at: Utc::now(),
        processing_time_seconds: Some(processing_time_seconds),
        data_sources: DataSourceStatus::from_collected(&data),
        raw_data: include_raw_data.then_some(data),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::collect::types::{CollectionResult, FetchWindow, SourceError};

    fn item(source: SourceName, id: &str, hour: u32) -> RawItem {
        RawItem {
            source,
            external_id: id.to_string(),
            timestamp: "2026-02-01"
                .parse::<NaiveDate>()
                .unwrap()
                .and_hms_opt(hour, 0, 0)
                .unwrap()
                .and_utc(),
            title: format!("item {id}"),
            body: String::new(),
            metadata: serde_json::Value::Null,
        }
    }

    fn run(results: Vec<CollectionResult>) -> CollectedData {
        CollectedData {
            window: FetchWindow::single_day("2026-02-01".parse().unwrap()),
            requested_at: Utc::now(),
            results: results.into_iter().map(|r| (r.source, r)).collect(),
        }
    }

    #[tokio::test]
    async fn digest_orders_sections_by_priority_and_items_newest_first() {
        let data = run(vec![
            CollectionResult::success(
                SourceName::Chat,
                vec![item(SourceName::Chat, "a", 9), item(SourceName::Chat, "b", 15)],
                1,
                3,
            ),
            CollectionResult::success(
                SourceName::Calls,
                vec![item(SourceName::Calls, "c", 11)],
                1,
                3,
            ),
        ]);
        let (summary, sections) = DigestSummarizer.summarize(&data).await.unwrap();

        assert_eq!(sections.len(), 2);
        assert_eq!(sections[0].title, "Customer Calls");
        assert!(sections[1].content.starts_with("- [15:00] item b"));
        assert_eq!(summary.key_highlights.len(), 2);
        assert!(summary.action_items.is_empty());
    }

    #[tokio::test]
    async fn failed_sources_become_action_items_not_sections() {
        let data = run(vec![CollectionResult::failed(
            SourceName::Docs,
            &SourceError::Transient("timeout".into()),
            3,
            90,
        )]);
        let (summary, sections) = DigestSummarizer.summarize(&data).await.unwrap();
        assert!(sections.is_empty());
        assert_eq!(summary.action_items.len(), 1);
        assert!(summary.action_items[0].contains("notion"));
    }

    #[test]
    fn raw_data_is_opt_in() {
        let data = run(vec![]);
        let b = build_briefing(
            "2026-02-01".parse().unwrap(),
            data.clone(),
            BriefingSummary::default(),
            vec![],
            0.5,
            false,
        );
        assert_eq!(b.id, "briefing-2026-02-01");
        assert!(b.raw_data.is_none());

        let b2 = build_briefing(
            "2026-02-01".parse().unwrap(),
            data,
            BriefingSummary::default(),
            vec![],
            0.5,
            true,
        );
        assert!(b2.raw_data.is_some());
    }
}
