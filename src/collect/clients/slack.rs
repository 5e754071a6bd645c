// src/collect/clients/slack.rs
use async_trait::async_trait;
use chrono::{DateTime, Utc};
use serde::Deserialize;

use crate::collect::clients::classify_reqwest;
use crate::collect::normalize_text;
use crate::collect::types::{FetchWindow, RawItem, SourceClient, SourceError, SourceName};
use crate::config::Settings;

const API_BASE: &str = "https://slack.com/api";

/// Chat client: walks the channels the bot is a member of (public,
/// private and DMs) and pulls history bounded by the window.
pub struct SlackClient {
    http: reqwest::Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct SlackEnvelope<T> {
    ok: bool,
    error: Option<String>,
    #[serde(flatten)]
    payload: Option<T>,
}

#[derive(Debug, Deserialize)]
struct ChannelList {
    #[serde(default)]
    channels: Vec<Channel>,
}

#[derive(Debug, Deserialize)]
struct Channel {
    id: String,
    #[serde(default)]
    name: Option<String>,
    #[serde(default)]
    is_im: bool,
}

#[derive(Debug, Deserialize)]
struct HistoryPage {
    #[serde(default)]
    messages: Vec<SlackMessage>,
}

#[derive(Debug, Deserialize)]
struct SlackMessage {
    ts: String,
    #[serde(default)]
    user: Option<String>,
    #[serde(default)]
    text: Option<String>,
    #[serde(default)]
    thread_ts: Option<String>,
    #[serde(default)]
    reply_count: Option<u32>,
}

/// Slack reports failures in-band as `{ok:false, error:"..."}` with
/// HTTP 200, so the error string carries the auth/transient distinction.
fn classify_slack_error(err: &str) -> SourceError {
    match err {
        "invalid_auth" | "not_authed" | "account_inactive" | "token_revoked"
        | "token_expired" | "missing_scope" => SourceError::Auth(format!("slack: {err}")),
        _ => SourceError::Transient(format!("slack: {err}")),
    }
}

fn ts_to_datetime(ts: &str) -> Option<DateTime<Utc>> {
    // Slack timestamps are "seconds.micros" strings.
    let secs: f64 = ts.parse().ok()?;
    DateTime::from_timestamp(secs as i64, 0)
}

impl SlackClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let token = settings
            .slack_bot_token
            .clone()
            .ok_or_else(|| SourceError::NotConfigured("SLACK_BOT_TOKEN missing".into()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            token,
        })
    }

    async fn call<T: serde::de::DeserializeOwned>(
        &self,
        method: &str,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let resp = self
            .http
            .get(format!("{API_BASE}/{method}"))
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await
            .map_err(classify_reqwest)?;
        let env: SlackEnvelope<T> = resp.json().await.map_err(classify_reqwest)?;
        if !env.ok {
            return Err(classify_slack_error(env.error.as_deref().unwrap_or("unknown")));
        }
        env.payload
            .ok_or_else(|| SourceError::Transient("slack: empty payload".into()))
    }

    async fn member_channels(&self) -> Result<Vec<Channel>, SourceError> {
        let list: ChannelList = self
            .call(
                "conversations.list",
                &[
                    ("types", "public_channel,private_channel,im".to_string()),
                    ("limit", "200".to_string()),
                ],
            )
            .await?;
        Ok(list.channels)
    }

    async fn channel_items(
        &self,
        channel: &Channel,
        window: &FetchWindow,
    ) -> Result<Vec<RawItem>, SourceError> {
        let page: HistoryPage = self
            .call(
                "conversations.history",
                &[
                    ("channel", channel.id.clone()),
                    ("oldest", format!("{}", window.start_utc().timestamp())),
                    ("latest", format!("{}", window.end_utc().timestamp())),
                    ("limit", "200".to_string()),
                ],
            )
            .await?;

        let channel_label = if channel.is_im {
            "dm".to_string()
        } else {
            channel.name.clone().unwrap_or_else(|| channel.id.clone())
        };

        let mut items = Vec::with_capacity(page.messages.len());
        for msg in page.messages {
            let body = normalize_text(msg.text.as_deref().unwrap_or_default());
            if body.is_empty() {
                continue;
            }
            let Some(timestamp) = ts_to_datetime(&msg.ts) else {
                continue;
            };
            items.push(RawItem {
                source: SourceName::Chat,
                external_id: format!("{}:{}", channel.id, msg.ts),
                timestamp,
                title: format!("#{channel_label}"),
                body,
                metadata: serde_json::json!({
                    "channel_id": channel.id,
                    "channel_name": channel_label,
                    "user": msg.user,
                    "thread_ts": msg.thread_ts,
                    "reply_count": msg.reply_count.unwrap_or(0),
                    "is_dm": channel.is_im,
                }),
            });
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceClient for SlackClient {
    fn name(&self) -> SourceName {
        SourceName::Chat
    }

    async fn test_connection(&self) -> bool {
        #[derive(Deserialize)]
        struct AuthTest {
            #[serde(default)]
            #[allow(dead_code)]
            user_id: Option<String>,
        }
        self.call::<AuthTest>("auth.test", &[]).await.is_ok()
    }

    async fn fetch_items(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        let channels = self.member_channels().await?;

        let mut items = Vec::new();
        for channel in &channels {
            match self.channel_items(channel, window).await {
                Ok(mut v) => items.append(&mut v),
                // Auth problems affect every channel; bail out.
                Err(e @ SourceError::Auth(_)) => return Err(e),
                Err(e) => {
                    tracing::warn!(channel = %channel.id, error = %e, "slack channel fetch failed");
                }
            }
        }
        Ok(items)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn in_band_errors_split_auth_from_transient() {
        assert!(matches!(
            classify_slack_error("invalid_auth"),
            SourceError::Auth(_)
        ));
        assert!(matches!(
            classify_slack_error("ratelimited"),
            SourceError::Transient(_)
        ));
    }

    #[test]
    fn slack_ts_parses_to_utc() {
        let dt = ts_to_datetime("1767225600.000200").unwrap();
        assert_eq!(dt.to_rfc3339(), "2026-01-01T00:00:00+00:00");
        assert!(ts_to_datetime("not-a-ts").is_none());
    }

    #[test]
    fn missing_token_is_not_configured() {
        let err = SlackClient::from_settings(&Settings::default()).err().unwrap();
        assert!(matches!(err, SourceError::NotConfigured(_)));
    }
}
