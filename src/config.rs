// src/config.rs
//
// Environment-driven settings. Every provider credential is optional:
// absence makes that source not-configured, it is never a startup error.

use std::time::Duration;

use crate::collect::CollectorCfg;

pub const DEFAULT_GONG_BASE_URL: &str = "https://api.gong.io/v2";

#[derive(Debug, Clone)]
pub struct Settings {
    pub api_port: u16,
    pub allowed_origins: Vec<String>,

    // Google Workspace (Gmail + Calendar). Token refresh is handled
    // outside this service; we only consume an access token.
    pub google_access_token: Option<String>,

    pub slack_bot_token: Option<String>,

    pub gong_access_key: Option<String>,
    pub gong_access_key_secret: Option<String>,
    pub gong_base_url: String,

    pub monday_api_key: Option<String>,
    pub notion_api_token: Option<String>,
    pub miro_access_token: Option<String>,

    // Collector tuning
    pub collect_timeout_secs: u64,
    pub collect_retry_attempts: u32,
    pub collect_retry_backoff_ms: u64,
    pub collect_overall_deadline_secs: Option<u64>,
}

impl Default for Settings {
    fn default() -> Self {
        Self {
            api_port: 8000,
            allowed_origins: vec!["http://localhost:3000".to_string()],
            google_access_token: None,
            slack_bot_token: None,
            gong_access_key: None,
            gong_access_key_secret: None,
            gong_base_url: DEFAULT_GONG_BASE_URL.to_string(),
            monday_api_key: None,
            notion_api_token: None,
            miro_access_token: None,
            collect_timeout_secs: 30,
            collect_retry_attempts: 2,
            collect_retry_backoff_ms: 500,
            collect_overall_deadline_secs: None,
        }
    }
}

fn env_opt(name: &str) -> Option<String> {
    std::env::var(name)
        .ok()
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn env_parse<T: std::str::FromStr>(name: &str, default: T) -> T {
    env_opt(name)
        .and_then(|v| v.parse().ok())
        .unwrap_or(default)
}

impl Settings {
    /// Read settings from the process environment (`.env` is loaded by
    /// `main` via dotenvy before this runs).
    pub fn from_env() -> Self {
        let base = Self::default();
        Self {
            api_port: env_parse("API_PORT", base.api_port),
            allowed_origins: env_opt("ALLOWED_ORIGINS")
                .map(|s| {
                    s.split(',')
                        .map(|o| o.trim().to_string())
                        .filter(|o| !o.is_empty())
                        .collect()
                })
                .unwrap_or(base.allowed_origins),
            google_access_token: env_opt("GOOGLE_ACCESS_TOKEN"),
            slack_bot_token: env_opt("SLACK_BOT_TOKEN"),
            gong_access_key: env_opt("GONG_ACCESS_KEY"),
            gong_access_key_secret: env_opt("GONG_ACCESS_KEY_SECRET"),
            gong_base_url: env_opt("GONG_BASE_URL").unwrap_or(base.gong_base_url),
            monday_api_key: env_opt("MONDAY_API_KEY"),
            notion_api_token: env_opt("NOTION_API_TOKEN"),
            miro_access_token: env_opt("MIRO_ACCESS_TOKEN"),
            collect_timeout_secs: env_parse("COLLECT_TIMEOUT_SECS", base.collect_timeout_secs),
            collect_retry_attempts: env_parse(
                "COLLECT_RETRY_ATTEMPTS",
                base.collect_retry_attempts,
            ),
            collect_retry_backoff_ms: env_parse(
                "COLLECT_RETRY_BACKOFF_MS",
                base.collect_retry_backoff_ms,
            ),
            collect_overall_deadline_secs: env_opt("COLLECT_OVERALL_DEADLINE_SECS")
                .and_then(|v| v.parse().ok()),
        }
    }

    pub fn collector_cfg(&self) -> CollectorCfg {
        CollectorCfg {
            source_timeout: Duration::from_secs(self.collect_timeout_secs),
            retry_attempts: self.collect_retry_attempts,
            retry_backoff: Duration::from_millis(self.collect_retry_backoff_ms),
            overall_deadline: self
                .collect_overall_deadline_secs
                .map(Duration::from_secs),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::env;

    #[serial_test::serial]
    #[test]
    fn from_env_picks_up_credentials_and_tuning() {
        env::set_var("SLACK_BOT_TOKEN", "xoxb-test");
        env::set_var("COLLECT_TIMEOUT_SECS", "5");
        env::set_var("ALLOWED_ORIGINS", "http://a.test, http://b.test");
        env::remove_var("NOTION_API_TOKEN");

        let s = Settings::from_env();
        assert_eq!(s.slack_bot_token.as_deref(), Some("xoxb-test"));
        assert_eq!(s.notion_api_token, None);
        assert_eq!(s.collect_timeout_secs, 5);
        assert_eq!(s.allowed_origins, vec!["http://a.test", "http://b.test"]);

        env::remove_var("SLACK_BOT_TOKEN");
        env::remove_var("COLLECT_TIMEOUT_SECS");
        env::remove_var("ALLOWED_ORIGINS");
    }

    #[serial_test::serial]
    #[test]
    fn blank_credential_counts_as_absent() {
        env::set_var("MIRO_ACCESS_TOKEN", "   ");
        let s = Settings::from_env();
        assert_eq!(s.miro_access_token, None);
        env::remove_var("MIRO_ACCESS_TOKEN");
    }

    #[test]
    fn collector_cfg_reflects_settings() {
        let s = Settings {
            collect_timeout_secs: 7,
            collect_retry_attempts: 1,
            collect_overall_deadline_secs: Some(60),
            ..Settings::default()
        };
        let cfg = s.collector_cfg();
        assert_eq!(cfg.source_timeout, Duration::from_secs(7));
        assert_eq!(cfg.retry_attempts, 1);
        assert_eq!(cfg.overall_deadline, Some(Duration::from_secs(60)));
    }
}
