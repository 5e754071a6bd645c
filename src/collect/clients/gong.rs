// src/collect/clients/gong.rs
use async_trait::async_trait;
use serde::Deserialize;

use crate::collect::clients::{classify_reqwest, classify_status, parse_rfc3339};
use crate::collect::normalize_text;
use crate::collect::types::{FetchWindow, RawItem, SourceClient, SourceError, SourceName};
use crate::config::Settings;

/// Call-recording client. Gong supports server-side time filtering, so
/// the window bounds are pushed down as fromDateTime/toDateTime.
pub struct GongClient {
    http: reqwest::Client,
    access_key: String,
    secret: String,
    base_url: String,
}

#[derive(Debug, Deserialize)]
struct CallList {
    #[serde(default)]
    calls: Vec<Call>,
}

#[derive(Debug, Deserialize)]
struct Call {
    id: String,
    #[serde(default)]
    title: Option<String>,
    #[serde(default)]
    started: Option<String>,
    #[serde(default)]
    duration: Option<u64>,
    #[serde(default)]
    url: Option<String>,
    #[serde(default)]
    parties: Vec<Party>,
}

#[derive(Debug, Deserialize)]
struct Party {
    #[serde(default)]
    name: Option<String>,
}

impl GongClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let access_key = settings.gong_access_key.clone().ok_or_else(|| {
            SourceError::NotConfigured("GONG_ACCESS_KEY missing".into())
        })?;
        let secret = settings.gong_access_key_secret.clone().ok_or_else(|| {
            SourceError::NotConfigured("GONG_ACCESS_KEY_SECRET missing".into())
        })?;
        Ok(Self {
            http: reqwest::Client::new(),
            access_key,
            secret,
            base_url: settings.gong_base_url.clone(),
        })
    }
}

#[async_trait]
impl SourceClient for GongClient {
    fn name(&self) -> SourceName {
        SourceName::Calls
    }

    async fn test_connection(&self) -> bool {
        let resp = self
            .http
            .get(format!("{}/users", self.base_url))
            .basic_auth(&self.access_key, Some(&self.secret))
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }

    async fn fetch_items(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        let resp = self
            .http
            .get(format!("{}/calls", self.base_url))
            .basic_auth(&self.access_key, Some(&self.secret))
            .query(&[
                ("fromDateTime", window.start_utc().to_rfc3339()),
                ("toDateTime", window.end_utc().to_rfc3339()),
            ])
            .send()
            .await
            .map_err(classify_reqwest)?;
        // Gong answers 404 for ranges with no calls; that is an empty day,
        // not a failure.
        if resp.status() == reqwest::StatusCode::NOT_FOUND {
            return Ok(Vec::new());
        }
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        let list: CallList = resp.json().await.map_err(classify_reqwest)?;

        let items = list
            .calls
            .into_iter()
            .map(|call| {
                let participants: Vec<String> =
                    call.parties.into_iter().filter_map(|p| p.name).collect();
                RawItem {
                    source: SourceName::Calls,
                    external_id: call.id,
                    timestamp: call
                        .started
                        .as_deref()
                        .and_then(parse_rfc3339)
                        .unwrap_or_else(|| window.start_utc()),
                    title: normalize_text(call.title.as_deref().unwrap_or("(untitled call)")),
                    body: String::new(),
                    metadata: serde_json::json!({
                        "duration_seconds": call.duration,
                        "participants": participants,
                        "url": call.url,
                    }),
                }
            })
            .collect();
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn settings_with_keys() -> Settings {
        Settings {
            gong_access_key: Some("key".into()),
            gong_access_key_secret: Some("secret".into()),
            ..Settings::default()
        }
    }

    #[test]
    fn both_halves_of_the_credential_are_required() {
        let err = GongClient::from_settings(&Settings {
            gong_access_key: Some("key".into()),
            ..Settings::default()
        })
        .err()
        .unwrap();
        assert_eq!(
            err.to_string(),
            "not configured: GONG_ACCESS_KEY_SECRET missing"
        );
        assert!(GongClient::from_settings(&settings_with_keys()).is_ok());
    }

    #[test]
    fn base_url_comes_from_settings() {
        let mut s = settings_with_keys();
        s.gong_base_url = "https://gong.example.test/v2".into();
        let c = GongClient::from_settings(&s).unwrap();
        assert_eq!(c.base_url, "https://gong.example.test/v2");
    }
}
