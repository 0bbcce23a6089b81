//! Client configuration from environment variables

use crate::session::{SendPath, SessionContext, SubmitPolicy};
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

pub const DEFAULT_BACKEND_URL: &str = "http://localhost:5000";
pub const DEFAULT_HTTP_TIMEOUT: Duration = Duration::from_secs(300);

#[derive(Debug, Error, PartialEq, Eq)]
pub enum ConfigError {
    #[error("Invalid value {value:?} for {key}, expected {expected}")]
    Invalid {
        key: &'static str,
        value: String,
        expected: &'static str,
    },
}

/// Everything the binary needs to wire up a session
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ClientConfig {
    pub backend_url: String,
    pub channel_url: String,
    pub send_path: SendPath,
    pub submit_policy: SubmitPolicy,
    pub http_timeout: Duration,
}

impl Default for ClientConfig {
    fn default() -> Self {
        Self {
            backend_url: DEFAULT_BACKEND_URL.to_string(),
            channel_url: channel_url_for(DEFAULT_BACKEND_URL),
            send_path: SendPath::default(),
            submit_policy: SubmitPolicy::default(),
            http_timeout: DEFAULT_HTTP_TIMEOUT,
        }
    }
}

impl ClientConfig {
    pub fn from_env() -> Result<Self, ConfigError> {
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Build from any key lookup; unset or empty values take the default
    pub fn from_lookup(lookup: impl Fn(&str) -> Option<String>) -> Result<Self, ConfigError> {
        let get = |key: &str| lookup(key).filter(|v| !v.trim().is_empty());

        let backend_url = get("CLIPCHAT_BACKEND_URL")
            .map_or_else(|| DEFAULT_BACKEND_URL.to_string(), |v| v.trim_end_matches('/').to_string());
        let channel_url = get("CLIPCHAT_CHANNEL_URL").unwrap_or_else(|| channel_url_for(&backend_url));

        let send_path = get("CLIPCHAT_SEND_PATH")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();
        let submit_policy = get("CLIPCHAT_SUBMIT_POLICY")
            .map(|v| v.parse())
            .transpose()?
            .unwrap_or_default();

        let http_timeout = match get("CLIPCHAT_HTTP_TIMEOUT_SECS") {
            Some(v) => v
                .trim()
                .parse::<u64>()
                .ok()
                .filter(|secs| *secs > 0)
                .map(Duration::from_secs)
                .ok_or(ConfigError::Invalid {
                    key: "CLIPCHAT_HTTP_TIMEOUT_SECS",
                    value: v,
                    expected: "a positive number of seconds",
                })?,
            None => DEFAULT_HTTP_TIMEOUT,
        };

        Ok(Self {
            backend_url,
            channel_url,
            send_path,
            submit_policy,
            http_timeout,
        })
    }

    pub fn session_context(&self) -> SessionContext {
        SessionContext::new(self.submit_policy, self.send_path)
    }
}

/// Push channel URL served next to the backend: same host, `ws`/`wss`
/// scheme, `/ws` path
pub fn channel_url_for(backend_url: &str) -> String {
    let base = backend_url.trim_end_matches('/');
    if let Some(rest) = base.strip_prefix("https://") {
        format!("wss://{rest}/ws")
    } else if let Some(rest) = base.strip_prefix("http://") {
        format!("ws://{rest}/ws")
    } else {
        format!("ws://{base}/ws")
    }
}

impl FromStr for SendPath {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "request" => Ok(SendPath::Request),
            "channel" => Ok(SendPath::Channel),
            _ => Err(ConfigError::Invalid {
                key: "CLIPCHAT_SEND_PATH",
                value: s.to_string(),
                expected: "request or channel",
            }),
        }
    }
}

impl FromStr for SubmitPolicy {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "optimistic" => Ok(SubmitPolicy::Optimistic),
            "confirmed" => Ok(SubmitPolicy::AwaitConfirmation),
            _ => Err(ConfigError::Invalid {
                key: "CLIPCHAT_SUBMIT_POLICY",
                value: s.to_string(),
                expected: "optimistic or confirmed",
            }),
        }
    }
}
