use serde::{Deserialize, Serialize};
use std::{env, time::Duration};
use url::Url;

use crate::models::moderation::SubjectType;

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Config {
    // Runtime
    pub environment: String,
    pub log_level: String,

    // Backend endpoints
    pub api_base_url: String,
    pub push_url: String,

    // Session
    pub session_cookie: Option<String>,
    pub session_user_id: Option<String>,

    // Network
    pub request_timeout_secs: u64,
    pub reconnect_delay_ms: u64,

    // Notifications
    pub alert_duration_ms: u64,

    // Moderation
    pub escalate_subjects: String,

    // Theme
    pub theme_accent: String,
    pub theme_background: String,
}

impl Config {
    pub fn from_env() -> anyhow::Result<Self> {
        let config = Config {
            environment: env::var("ENVIRONMENT").unwrap_or_else(|_| "development".to_string()),
            log_level: env::var("LOG_LEVEL")
                .unwrap_or_else(|_| "social_client=debug".to_string()),

            api_base_url: env::var("API_BASE_URL")
                .unwrap_or_else(|_| "http://localhost:5000".to_string()),
            push_url: env::var("PUSH_URL")
                .unwrap_or_else(|_| "ws://localhost:5000/ws".to_string()),

            session_cookie: env::var("SESSION_COOKIE").ok(),
            session_user_id: env::var("SESSION_USER_ID")
                .ok()
                .filter(|id| !id.trim().is_empty()),

            request_timeout_secs: env::var("REQUEST_TIMEOUT_SECS")
                .unwrap_or_else(|_| "30".to_string())
                .parse()?,
            reconnect_delay_ms: env::var("RECONNECT_DELAY_MS")
                .unwrap_or_else(|_| "2000".to_string())
                .parse()?,

            alert_duration_ms: env::var("ALERT_DURATION_MS")
                .unwrap_or_else(|_| "5000".to_string())
                .parse()?,

            escalate_subjects: env::var("ESCALATE_SUBJECTS")
                .unwrap_or_else(|_| "user".to_string()),

            theme_accent: env::var("THEME_ACCENT")
                .unwrap_or_else(|_| "#1d9bf0".to_string()),
            theme_background: env::var("THEME_BACKGROUND")
                .unwrap_or_else(|_| "#15202b".to_string()),
        };

        config.validate()?;
        Ok(config)
    }

    /// 校验URL格式，避免运行期才发现配置错误
    pub fn validate(&self) -> anyhow::Result<()> {
        let api = Url::parse(&self.api_base_url)
            .map_err(|e| anyhow::anyhow!("invalid API_BASE_URL: {}", e))?;
        if !matches!(api.scheme(), "http" | "https") {
            anyhow::bail!("invalid API_BASE_URL: unsupported scheme {}", api.scheme());
        }

        let push = Url::parse(&self.push_url)
            .map_err(|e| anyhow::anyhow!("invalid PUSH_URL: {}", e))?;
        if !matches!(push.scheme(), "ws" | "wss") {
            anyhow::bail!("invalid PUSH_URL: unsupported scheme {}", push.scheme());
        }

        self.escalated_subject_types()?;
        Ok(())
    }

    pub fn request_timeout(&self) -> Duration {
        Duration::from_secs(self.request_timeout_secs)
    }

    pub fn reconnect_delay(&self) -> Duration {
        Duration::from_millis(self.reconnect_delay_ms)
    }

    pub fn alert_duration(&self) -> Duration {
        Duration::from_millis(self.alert_duration_ms)
    }

    /// 需要二次确认的操作对象类型，逗号分隔
    pub fn escalated_subject_types(&self) -> anyhow::Result<Vec<SubjectType>> {
        self.escalate_subjects
            .split(',')
            .map(str::trim)
            .filter(|s| !s.is_empty())
            .map(|s| {
                s.parse::<SubjectType>()
                    .map_err(|e| anyhow::anyhow!("invalid ESCALATE_SUBJECTS: {}", e))
            })
            .collect()
    }

    pub fn is_production(&self) -> bool {
        self.environment == "production"
    }
}

impl Default for Config {
    fn default() -> Self {
        Self {
            environment: "development".to_string(),
            log_level: "social_client=debug".to_string(),
            api_base_url: "http://localhost:5000".to_string(),
            push_url: "ws://localhost:5000/ws".to_string(),
            session_cookie: None,
            session_user_id: None,
            request_timeout_secs: 30,
            reconnect_delay_ms: 2000,
            alert_duration_ms: 5000,
            escalate_subjects: "user".to_string(),
            theme_accent: "#1d9bf0".to_string(),
            theme_background: "#15202b".to_string(),
        }
    }
}
