// src/collect/clients/miro.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::collect::clients::{classify_reqwest, classify_status, parse_rfc3339};
use crate::collect::normalize_text;
use crate::collect::types::{FetchWindow, RawItem, SourceClient, SourceError, SourceName};
use crate::config::Settings;

const API_URL: &str = "https://api.miro.com/v2";

/// Whiteboard client. Boards carry only a modification timestamp, so the
/// window filter is applied client-side over the board list.
pub struct MiroClient {
    http: reqwest::Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct BoardList {
    #[serde(default)]
    data: Vec<Board>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Board {
    id: String,
    name: String,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    modified_at: Option<String>,
    #[serde(default)]
    created_at: Option<String>,
    #[serde(default)]
    view_link: Option<String>,
}

impl MiroClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let token = settings
            .miro_access_token
            .clone()
            .ok_or_else(|| SourceError::NotConfigured("MIRO_ACCESS_TOKEN missing".into()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            token,
        })
    }

    async fn boards(&self, limit: u32) -> Result<Vec<Board>, SourceError> {
        let resp = self
            .http
            .get(format!("{API_URL}/boards"))
            .bearer_auth(&self.token)
            .query(&[("limit", limit.to_string())])
            .send()
            .await
            .map_err(classify_reqwest)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        let list: BoardList = resp.json().await.map_err(classify_reqwest)?;
        Ok(list.data)
    }
}

#[async_trait]
impl SourceClient for MiroClient {
    fn name(&self) -> SourceName {
        SourceName::Whiteboard
    }

    async fn test_connection(&self) -> bool {
        self.boards(1).await.is_ok()
    }

    async fn fetch_items(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        let boards = self.boards(50).await?;

        let mut items = Vec::new();
        for board in boards {
            let Some(modified) = board.modified_at.as_deref().and_then(parse_rfc3339) else {
                continue;
            };
            if !window.contains(modified) {
                continue;
            }
            items.push(RawItem {
                source: SourceName::Whiteboard,
                external_id: board.id,
                timestamp: modified,
                title: normalize_text(&board.name),
                body: normalize_text(board.description.as_deref().unwrap_or_default()),
                metadata: serde_json::json!({
                    "created_at": board.created_at,
                    "url": board.view_link,
                }),
            });
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn missing_token_is_not_configured() {
        let err = MiroClient::from_settings(&Settings::default()).err().unwrap();
        assert_eq!(err.to_string(), "not configured: MIRO_ACCESS_TOKEN missing");
    }

    #[test]
    fn board_list_shape_parses() {
        let raw = r#"{"data":[{"id":"b1","name":"Q2 planning","modifiedAt":"2026-02-10T08:30:00Z"}]}"#;
        let list: BoardList = serde_json::from_str(raw).unwrap();
        assert_eq!(list.data[0].name, "Q2 planning");
        assert!(list.data[0].modified_at.is_some());
    }
}
