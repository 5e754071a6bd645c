// tests/briefing_pipeline.rs
//
// End-to-end pipeline without HTTP: stub clients -> orchestrator ->
// digest summarizer -> assembled briefing, covering the partial-failure
// annotation the delivery layer renders.

use std::sync::Arc;

use async_trait::async_trait;
use chrono::Utc;

use daybrief::briefing::{build_briefing, DigestSummarizer, Summarizer};
use daybrief::collect::status;
use daybrief::{
    collect_all, CollectorCfg, FetchWindow, OverallStatus, RawItem, SourceClient, SourceError,
    SourceName, SourceStatus,
};

struct FixedClient {
    name: SourceName,
    outcome: Result<Vec<RawItem>, SourceError>,
}

#[async_trait]
impl SourceClient for FixedClient {
    fn name(&self) -> SourceName {
        self.name
    }
    async fn test_connection(&self) -> bool {
        self.outcome.is_ok()
    }
    async fn fetch_items(&self, _window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        self.outcome.clone()
    }
}

fn item(source: SourceName, id: &str, title: &str) -> RawItem {
    RawItem {
        source,
        external_id: id.to_string(),
        timestamp: Utc::now(),
        title: title.to_string(),
        body: String::new(),
        metadata: serde_json::Value::Null,
    }
}

#[tokio::test]
async fn degraded_run_still_produces_an_annotated_briefing() {
    let date: chrono::NaiveDate = "2026-02-01".parse().unwrap();
    let clients: Vec<Arc<dyn SourceClient>> = vec![
        Arc::new(FixedClient {
            name: SourceName::Calls,
            outcome: Ok(vec![item(SourceName::Calls, "c1", "Acme renewal call")]),
        }),
        Arc::new(FixedClient {
            name: SourceName::Chat,
            outcome: Err(SourceError::Auth("token revoked".into())),
        }),
    ];
    let unconfigured = vec![(
        SourceName::Whiteboard,
        "not configured: MIRO_ACCESS_TOKEN missing".to_string(),
    )];

    let cfg = CollectorCfg {
        retry_backoff: std::time::Duration::from_millis(1),
        ..CollectorCfg::default()
    };
    let data = collect_all(FetchWindow::single_day(date), clients, unconfigured, &cfg)
        .await
        .expect("valid window");

    assert_eq!(status::overall_status(&data), OverallStatus::Partial);
    assert_eq!(status::items_collected(&data, SourceName::Calls), 1);
    assert_eq!(status::items_collected(&data, SourceName::Chat), 0);

    let (summary, sections) = DigestSummarizer.summarize(&data).await.expect("summarize");
    assert_eq!(sections.len(), 1);
    assert_eq!(sections[0].title, "Customer Calls");
    assert!(sections[0].content.contains("Acme renewal call"));
    assert!(summary
        .action_items
        .iter()
        .any(|a| a.contains("slack") && a.contains("token revoked")));

    let briefing = build_briefing(date, data, summary, sections, 0.2, false);
    assert_eq!(briefing.id, "briefing-2026-02-01");
    assert_eq!(briefing.overall_status, OverallStatus::Partial);
    assert_eq!(briefing.data_sources.len(), 3);

    let chat_row = briefing
        .data_sources
        .iter()
        .find(|r| r.source_name == SourceName::Chat)
        .unwrap();
    assert_eq!(chat_row.status, SourceStatus::Failed);
    assert_eq!(chat_row.error_message.as_deref(), Some("auth failed: token revoked"));

    let miro_row = briefing
        .data_sources
        .iter()
        .find(|r| r.source_name == SourceName::Whiteboard)
        .unwrap();
    assert_eq!(miro_row.status, SourceStatus::NotConfigured);
}
