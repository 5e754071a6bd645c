// src/collect/clients/mod.rs
//
// One client per provider, uniform shape: constructible from `Settings`
// (missing credentials -> `NotConfigured`), a cheap `test_connection`,
// and a window-bounded `fetch_items`. All HTTP failures funnel through
// the shared classifier below so the orchestrator sees one taxonomy.

pub mod gong;
pub mod google;
pub mod miro;
pub mod monday;
pub mod notion;
pub mod slack;

use std::sync::Arc;

use chrono::{DateTime, Utc};
use reqwest::StatusCode;

use crate::collect::types::{SourceClient, SourceError, SourceName};
use crate::config::Settings;

/// 401/403 mean bad credentials; 408/429/5xx are worth a retry; anything
/// else unexpected is treated as transient so one odd response cannot
/// permanently mark a source broken.
pub(crate) fn classify_status(status: StatusCode) -> SourceError {
    match status {
        StatusCode::UNAUTHORIZED | StatusCode::FORBIDDEN => {
            SourceError::Auth(format!("http {status}"))
        }
        StatusCode::REQUEST_TIMEOUT | StatusCode::TOO_MANY_REQUESTS => {
            SourceError::Transient(format!("http {status}"))
        }
        s if s.is_server_error() => SourceError::Transient(format!("http {s}")),
        s => SourceError::Transient(format!("unexpected http {s}")),
    }
}

pub(crate) fn classify_reqwest(err: reqwest::Error) -> SourceError {
    if let Some(status) = err.status() {
        return classify_status(status);
    }
    if err.is_timeout() {
        return SourceError::Transient("timeout".to_string());
    }
    if err.is_connect() {
        return SourceError::Transient(format!("connect: {err}"));
    }
    SourceError::Transient(err.to_string())
}

pub(crate) fn parse_rfc3339(s: &str) -> Option<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(s)
        .ok()
        .map(|dt| dt.with_timezone(&Utc))
}

/// Build every client the settings have credentials for, honoring an
/// optional source filter. Sources left out for missing credentials come
/// back with a human-readable reason so the orchestrator can report them
/// as not-configured without any network call.
pub fn build_clients(
    settings: &Settings,
    filter: Option<&[SourceName]>,
) -> (Vec<Arc<dyn SourceClient>>, Vec<(SourceName, String)>) {
    let mut configured: Vec<Arc<dyn SourceClient>> = Vec::new();
    let mut unconfigured: Vec<(SourceName, String)> = Vec::new();

    for name in SourceName::ALL {
        if let Some(allow) = filter {
            if !allow.contains(&name) {
                continue;
            }
        }
        let built: Result<Arc<dyn SourceClient>, SourceError> = match name {
            SourceName::MailCalendar => {
                google::GoogleClient::from_settings(settings).map(|c| Arc::new(c) as _)
            }
            SourceName::Chat => {
                slack::SlackClient::from_settings(settings).map(|c| Arc::new(c) as _)
            }
            SourceName::Calls => {
                gong::GongClient::from_settings(settings).map(|c| Arc::new(c) as _)
            }
            SourceName::Boards => {
                monday::MondayClient::from_settings(settings).map(|c| Arc::new(c) as _)
            }
            SourceName::Docs => {
                notion::NotionClient::from_settings(settings).map(|c| Arc::new(c) as _)
            }
            SourceName::Whiteboard => {
                miro::MiroClient::from_settings(settings).map(|c| Arc::new(c) as _)
            }
        };
        match built {
            Ok(client) => configured.push(client),
            Err(e) => unconfigured.push((name, e.to_string())),
        }
    }

    (configured, unconfigured)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn classifier_maps_status_families() {
        assert!(matches!(
            classify_status(StatusCode::UNAUTHORIZED),
            SourceError::Auth(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::TOO_MANY_REQUESTS),
            SourceError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::BAD_GATEWAY),
            SourceError::Transient(_)
        ));
        assert!(matches!(
            classify_status(StatusCode::NOT_FOUND),
            SourceError::Transient(_)
        ));
    }

    #[test]
    fn empty_settings_yield_no_clients_and_six_reasons() {
        let (clients, unconfigured) = build_clients(&Settings::default(), None);
        assert!(clients.is_empty());
        assert_eq!(unconfigured.len(), SourceName::ALL.len());
        for (_, reason) in &unconfigured {
            assert!(reason.starts_with("not configured:"), "got {reason:?}");
        }
    }

    #[test]
    fn filter_limits_which_sources_are_considered() {
        let settings = Settings {
            slack_bot_token: Some("xoxb-test".into()),
            notion_api_token: Some("secret".into()),
            ..Settings::default()
        };
        let (clients, unconfigured) =
            build_clients(&settings, Some(&[SourceName::Chat, SourceName::Whiteboard]));
        assert_eq!(clients.len(), 1);
        assert_eq!(clients[0].name(), SourceName::Chat);
        assert_eq!(unconfigured, vec![(
            SourceName::Whiteboard,
            "not configured: MIRO_ACCESS_TOKEN missing".to_string()
        )]);
    }
}
