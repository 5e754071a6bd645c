// src/collect/clients/google.rs
use async_trait::async_trait;
use chrono::DateTime;
use serde::Deserialize;

use crate::collect::clients::{classify_reqwest, classify_status, parse_rfc3339};
use crate::collect::normalize_text;
use crate::collect::types::{FetchWindow, RawItem, SourceClient, SourceError, SourceName};
use crate::config::Settings;

const GMAIL_BASE: &str = "https://gmail.googleapis.com/gmail/v1";
const CALENDAR_BASE: &str = "https://www.googleapis.com/calendar/v3";

/// Mail + calendar client: one Google credential, two endpoints. Items
/// from both are merged into a single sequence.
pub struct GoogleClient {
    http: reqwest::Client,
    token: String,
}

#[derive(Debug, Deserialize)]
struct MessageList {
    #[serde(default)]
    messages: Vec<MessageRef>,
}

#[derive(Debug, Deserialize)]
struct MessageRef {
    id: String,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct Message {
    id: String,
    #[serde(default)]
    internal_date: Option<String>,
    #[serde(default)]
    snippet: Option<String>,
    #[serde(default)]
    payload: Option<MessagePayload>,
}

#[derive(Debug, Deserialize)]
struct MessagePayload {
    #[serde(default)]
    headers: Vec<Header>,
}

#[derive(Debug, Deserialize)]
struct Header {
    name: String,
    value: String,
}

#[derive(Debug, Deserialize)]
struct EventList {
    #[serde(default)]
    items: Vec<Event>,
}

#[derive(Debug, Deserialize)]
struct Event {
    id: String,
    #[serde(default)]
    summary: Option<String>,
    #[serde(default)]
    description: Option<String>,
    #[serde(default)]
    location: Option<String>,
    #[serde(default)]
    start: Option<EventTime>,
    #[serde(default)]
    organizer: Option<Organizer>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
struct EventTime {
    #[serde(default)]
    date_time: Option<String>,
    #[serde(default)]
    date: Option<String>,
}

#[derive(Debug, Deserialize)]
struct Organizer {
    #[serde(default)]
    email: Option<String>,
}

impl GoogleClient {
    pub fn from_settings(settings: &Settings) -> Result<Self, SourceError> {
        let token = settings
            .google_access_token
            .clone()
            .ok_or_else(|| SourceError::NotConfigured("GOOGLE_ACCESS_TOKEN missing".into()))?;
        Ok(Self {
            http: reqwest::Client::new(),
            token,
        })
    }

    async fn get_json<T: serde::de::DeserializeOwned>(
        &self,
        url: String,
        params: &[(&str, String)],
    ) -> Result<T, SourceError> {
        let resp = self
            .http
            .get(url)
            .bearer_auth(&self.token)
            .query(params)
            .send()
            .await
            .map_err(classify_reqwest)?;
        if !resp.status().is_success() {
            return Err(classify_status(resp.status()));
        }
        resp.json().await.map_err(classify_reqwest)
    }

    async fn fetch_emails(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        // Gmail's `before:` is exclusive, so bound with the day after the
        // window's end.
        let after = window.start.format("%Y/%m/%d");
        let before = window
            .end
            .succ_opt()
            .unwrap_or(window.end)
            .format("%Y/%m/%d");
        let list: MessageList = self
            .get_json(
                format!("{GMAIL_BASE}/users/me/messages"),
                &[
                    ("q", format!("after:{after} before:{before}")),
                    ("maxResults", "50".to_string()),
                ],
            )
            .await?;

        let mut items = Vec::with_capacity(list.messages.len());
        for msg_ref in list.messages {
            let msg: Message = self
                .get_json(
                    format!("{GMAIL_BASE}/users/me/messages/{}", msg_ref.id),
                    &[
                        ("format", "metadata".to_string()),
                        ("metadataHeaders", "Subject".to_string()),
                    ],
                )
                .await?;

            let subject = msg
                .payload
                .as_ref()
                .and_then(|p| {
                    p.headers
                        .iter()
                        .find(|h| h.name.eq_ignore_ascii_case("Subject"))
                })
                .map(|h| h.value.clone())
                .unwrap_or_else(|| "(no subject)".to_string());
            let timestamp = msg
                .internal_date
                .as_deref()
                .and_then(|ms| ms.parse::<i64>().ok())
                .and_then(|ms| DateTime::from_timestamp_millis(ms))
                .unwrap_or_else(|| window.start_utc());

            items.push(RawItem {
                source: SourceName::MailCalendar,
                external_id: format!("gmail:{}", msg.id),
                timestamp,
                title: normalize_text(&subject),
                body: normalize_text(msg.snippet.as_deref().unwrap_or_default()),
                metadata: serde_json::json!({ "kind": "email" }),
            });
        }
        Ok(items)
    }

    async fn fetch_events(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        let list: EventList = self
            .get_json(
                format!("{CALENDAR_BASE}/calendars/primary/events"),
                &[
                    ("timeMin", window.start_utc().to_rfc3339()),
                    ("timeMax", window.end_utc().to_rfc3339()),
                    ("singleEvents", "true".to_string()),
                    ("orderBy", "startTime".to_string()),
                ],
            )
            .await?;

        let mut items = Vec::with_capacity(list.items.len());
        for ev in list.items {
            let timestamp = ev
                .start
                .as_ref()
                .and_then(|s| {
                    s.date_time
                        .as_deref()
                        .and_then(parse_rfc3339)
                        .or_else(|| {
                            // All-day events carry only a date.
                            s.date
                                .as_deref()
                                .and_then(|d| d.parse::<chrono::NaiveDate>().ok())
                                .and_then(|d| d.and_hms_opt(0, 0, 0))
                                .map(|dt| dt.and_utc())
                        })
                })
                .unwrap_or_else(|| window.start_utc());

            items.push(RawItem {
                source: SourceName::MailCalendar,
                external_id: format!("calendar:{}", ev.id),
                timestamp,
                title: normalize_text(ev.summary.as_deref().unwrap_or("(untitled event)")),
                body: normalize_text(ev.description.as_deref().unwrap_or_default()),
                metadata: serde_json::json!({
                    "kind": "calendar_event",
                    "location": ev.location,
                    "organizer": ev.organizer.and_then(|o| o.email),
                }),
            });
        }
        Ok(items)
    }
}

#[async_trait]
impl SourceClient for GoogleClient {
    fn name(&self) -> SourceName {
        SourceName::MailCalendar
    }

    async fn test_connection(&self) -> bool {
        let resp = self
            .http
            .get(format!("{GMAIL_BASE}/users/me/profile"))
            .bearer_auth(&self.token)
            .send()
            .await;
        matches!(resp, Ok(r) if r.status().is_success())
    }

    async fn fetch_items(&self, window: &FetchWindow) -> Result<Vec<RawItem>, SourceError> {
        let mut items = self.fetch_emails(window).await?;
        items.extend(self.fetch_events(window).await?);
        Ok(items)
    }
}
