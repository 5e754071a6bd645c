// src/collect/clients/monday.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::collect::clients::{classify_reqwest, classify_status, parse_rfc3339};
use crate::collect::normalize_text;
use crate::collect::types::{FetchWindow, RawItem, SourceClient, SourceError, SourceName};
use crate::config::Settings;

const API_URL: &str = "https://api.monday.com/v2";

/// Project-board client. Monday's GraphQL API has no updated-at range
/// filter on items, so we fetch recent items and filter client-side.
pub struct MondayClient {
    http: reqwest::Client,
    api_key: String,
}

#[derive(Debug, Deserialize)]
struct GraphQlResponse {
    #[serde(default)]
    data: Option<BoardsData>,
    #[serde(default)]
    errors: Vec<GraphQlError>,
}

#[derive(Debug, Deserialize)]
struct GraphQlError {
    message: String,
}

#[derive(Debug, Deserialize)]
struct BoardsData {
    #[serde(default)]
    boards: Vec<Board>,
}

#[derive(Debug, Deserialize)]
struct Board {
    id: String,
    name: String,
    #[serde(default)]
    items_page: Option<ItemsPage>,
}

#[derive(Debug, Deserialize)]
struct ItemsPage {
    #[serde(default)]
    items: Vec<BoardItem>,
}

#[derive(Debug, Deserialize)]
struct BoardItem {
    id: String,
    name: String,
    #[serde(default)]
    updated_at: Option<String>,
}

const ITEMS_QUERY: &str = r#"query {
  boards(limit: 25) {
    id
    name
    items_page(limit: 100) {
      items { id name updated_at }
    }
  }
}"#;

impl MondayClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let api_key = settings
            .monday_api_key
            .clone()
            .ok_or_else(|| SourceError::NotConfigured("MONDAY_API_KEY missing".into()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            api_key,
        })
    }

    async fn graphql(&self, query: &str) -> Result<GraphQlResponse, SourceError> {
        let resp = self
            .http
            .post(API_URL)
            .header("Authorization", &self.api_key)
            .json(&serde_json::json!({ "query": query }))
            .send()
            .await
            .map_err(classify_reqwest)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        let body: GraphQlResponse = resp.json().await.map_err(classify_reqwest)?;
        if let Some(err) = body.errors.first() {
            let msg = &err.message;
            if msg.to_ascii_lowercase().contains("not authenticated") {
                return Err(SourceError::Auth(format!("monday: {msg}")));
            }
            return Err(SourceError::Transient(format!("monday: {msg}")));
        }
        Ok(body)
    }
}

#[async_trait]
impl SourceClient for MondayClient {
    fn name(&self) -> SourceName {
        SourceName::Boards
    }

    async fn test_connection(&self) -> bool {
        self.graphql("query { me { id } }").await.is_ok()
    }

    async fn fetch_items(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        let body = self.graphql(ITEMS_QUERY).await?;
        let boards = body.data.map(|d| d.boards).unwrap_or_default();

        let mut items = Vec::new();
        for board in boards {
            let page_items = board.items_page.map(|p| p.items).unwrap_or_default();
            for it in page_items {
                let Some(updated) = it.updated_at.as_deref().and_then(parse_rfc3339) else {
                    continue;
                };
                if !window.contains(updated) {
                    continue;
                }
                items.push(RawItem {
                    source: SourceName::Boards,
                    external_id: it.id,
                    timestamp: updated,
                    title: normalize_text(&it.name),
                    body: String::new(),
                    metadata: serde_json::json!({
                        "board_id": board.id,
                        "board_name": board.name,
                    }),
                });
            }
        }
        Ok(items)
    }
}
