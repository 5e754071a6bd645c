// src/collect/clients/notion.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::collect::clients::{classify_reqwest, classify_status, parse_rfc3339};
use crate::collect::normalize_text;
use crate::collect::types::{FetchWindow, RawItem, SourceClient, SourceError, SourceName};
use crate::config::Settings;

const API_URL: &str = "https://api.notion.com/v1";
const NOTION_VERSION: &str = "2022-06-28";

/// Documentation client. Notion's search endpoint cannot filter by an
/// edit-time range, so we pull newest-first and filter client-side.
pub struct NotionClient {
    http: reqwest::Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SearchResponse {
    #[serde(default)]
    results: Vec<Page>,
}

#[derive(Debug, Deserialize)]
struct Page {
    id: String,
    #[serde(default)]
    last_edited_time: Option<String>,
    #[serde(default)]
    created_time: Option<String>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    properties: serde_json::Value,
}

/// Page titles live in whichever property has `"type": "title"`.
fn extract_title(properties: &serde_json::Value) -> Option<String> {
    let props = properties.as_object()?;
    for prop in props.values() {
        if prop.get("type").and_then(|t| t.as_str()) != Some("title") {
            continue;
        }
        let parts = prop.get("title")?.as_array()?;
        let title: String = parts
            .iter()
            .filter_map(|p| p.get("plain_text").and_then(|t| t.as_str()))
            .collect::<Vec<_>>()
            .join("");
        if !title.is_empty() {
            return Some(title);
        }
    }
    None
}

impl NotionClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let token = settings
            .notion_api_token
            .clone()
            .ok_or_else(|| SourceError::NotConfigured("NOTION_API_TOKEN missing".into()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            token,
        })
    }
}

#[async_trait]
impl SourceClient for NotionClient {
    fn name(&self) -> SourceName {
        SourceName::Docs
    }

    async fn test_connection(&self) -> bool {
        let resp = self
            .http
            .get(format!("{API_URL}/users/me"))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }

    async fn fetch_items(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        let resp = self
            .http
            .post(format!("{API_URL}/search"))
            .bearer_auth(&self.token)
            .header("Notion-Version", NOTION_VERSION)
            .json(&serde_json::json!({
                "sort": { "direction": "descending", "timestamp": "last_edited_time" },
                "page_size": 100,
            }))
            .send()
            .await
            .map_err(classify_reqwest)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        let body: SearchResponse = resp.json().await.map_err(classify_reqwest)?;

        let mut items = Vec::new();
        for page in body.results {
            let Some(edited) = page.last_edited_time.as_deref().and_then(parse_rfc3339) else {
                continue;
            };
            if !window.contains(edited) {
                continue;
            }
            items.push(RawItem {
                source: SourceName::Docs,
                external_id: page.id,
                timestamp: edited,
                title: normalize_text(
                    &extract_title(&page.properties).unwrap_or_else(|| "(untitled page)".into()),
                ),
                body: String::new(),
                metadata: serde_json::json!({
                    "created_time": page.created_time,
                    "url": page.url,
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
        let err = NotionClient::from_settings(&Settings::default()).err().unwrap();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }

    #[test]
    fn title_extraction_finds_title_typed_property() {
        let props = serde_json::json!({
            "Status": { "type": "select", "select": { "name": "Live" } },
            "Name": {
                "type": "title",
                "title": [
                    { "plain_text": "Launch " },
                    { "plain_text": "plan" }
                ]
            }
        });
        assert_eq!(extract_title(&props).as_deref(), Some("Launch plan"));
        assert_eq!(extract_title(&serde_json::json!({})), None);
    }
}
