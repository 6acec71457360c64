use std::{path::PathBuf, time::Duration};

use crate::error::{ClientError, Result};

pub const DEFAULT_API_URL: &str = "http://localhost:8001";
const DEFAULT_CONNECT_TIMEOUT_SECS: u64 = 10;

/// What the view does locally after the backend accepted a reset.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default)]
pub enum ResetMode {
    /// Fetch the context again and show whatever the backend now holds.
    #[default]
    Refetch,
    /// Clear the local transcript instead of fetching the context again.
    ClearLocal,
}

#[derive(Clone, Debug)]
pub struct ClientConfig {
    pub api_url: String,
    pub session_file: Option<PathBuf>,
    pub markdown: bool,
    pub color: bool,
    pub reset_mode: ResetMode,
    pub connect_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            api_url: DEFAULT_API_URL.to_string(),
            session_file: None,
            markdown: true,
            color: true,
            reset_mode: ResetMode::default(),
            connect_timeout: Duration::from_secs(DEFAULT_CONNECT_TIMEOUT_SECS),
        }
    }
}

impl ClientConfig {
    /// Read configuration from the process environment, after loading `.env` if present.
    pub fn from_env() -> Result<Self> {
        dotenvy::dotenv().ok();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    pub fn from_lookup<F>(lookup: F) -> Result<Self>
    where
        F: Fn(&str) -> Option<String>,
    {
        let defaults = Self::default();
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let api_url = get("CHAT_API_URL")
            .map(|v| v.trim().trim_end_matches('/').to_string())
            .unwrap_or(defaults.api_url);
        reqwest::Url::parse(&api_url)
            .map_err(|e| ClientError::Config(format!("CHAT_API_URL {api_url:?}: {e}")))?;

        let reset_mode = match get("CHAT_RESET_MODE").as_deref().map(str::trim) {
            None => defaults.reset_mode,
            Some(v) if v.eq_ignore_ascii_case("refetch") => ResetMode::Refetch,
            Some(v) if v.eq_ignore_ascii_case("clear") => ResetMode::ClearLocal,
            Some(other) => {
                return Err(ClientError::Config(format!(
                    "CHAT_RESET_MODE must be `refetch` or `clear`, got {other:?}"
                )));
            }
        };

        let connect_timeout = match get("CHAT_CONNECT_TIMEOUT_SECS") {
            None => defaults.connect_timeout,
            Some(v) => v
                .trim()
                .parse::<u64>()
                .map(Duration::from_secs)
                .map_err(|e| ClientError::Config(format!("CHAT_CONNECT_TIMEOUT_SECS {v:?}: {e}")))?,
        };

        Ok(Self {
            api_url,
            session_file: get("CHAT_SESSION_FILE").map(PathBuf::from),
            markdown: parse_flag("CHAT_MARKDOWN", get("CHAT_MARKDOWN"), defaults.markdown)?,
            color: parse_flag("CHAT_COLOR", get("CHAT_COLOR"), defaults.color)?,
            reset_mode,
            connect_timeout,
        })
    }
}

fn parse_flag(key: &str, value: Option<String>, default: bool) -> Result<bool> {
    let Some(value) = value else {
        return Ok(default);
    };
    match value.trim().to_ascii_lowercase().as_str() {
        "1" | "true" | "yes" | "on" => Ok(true),
        "0" | "false" | "no" | "off" => Ok(false),
        other => Err(ClientError::Config(format!("{key} must be a boolean, got {other:?}"))),
    }
}
