use std::fmt;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;

use tracing::warn;

use crate::error::ConfigError;

pub const DEFAULT_SITES_FILE: &str = "sites.json";
pub const DEFAULT_DATABASE_PATH: &str = "site_monitor.db";
pub const DEFAULT_API_URL: &str = "http://localhost:8000";
pub const DEFAULT_TELEGRAM_API_URL: &str = "https://api.telegram.org";

fn default_check_interval() -> u64 { 60 }
fn default_request_timeout() -> u64 { 20 }
fn default_smtp_port() -> u16 { 587 }
fn default_status_port() -> u16 { 8000 }

#[derive(Debug, Clone)]
pub struct MonitorConfig {
    pub sites_file: PathBuf,
    pub database_path: PathBuf,
    pub check_interval: Duration,
    pub request_timeout: Duration,
    pub api_url: String,
    pub serve_status: bool,
    pub status_port: u16,
    pub smtp: Option<SmtpConfig>,
    pub telegram: Option<TelegramConfig>,
}

#[derive(Clone, PartialEq, Eq)]
pub struct SmtpConfig {
    pub host: String,
    pub port: u16,
    pub username: Option<String>,
    pub password: Option<String>,
    /// Sender address. Falls back to the username when that is an address, else the recipient.
    pub from: Option<String>,
    pub recipient: String,
}

#[derive(Clone, PartialEq, Eq)]
pub struct TelegramConfig {
    pub bot_token: String,
    pub chat_id: String,
    pub api_url: String,
}

const REDACTED: &str = "<redacted>";

impl fmt::Debug for SmtpConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("SmtpConfig")
            .field("host", &self.host)
            .field("port", &self.port)
            .field("username", &self.username)
            .field("password", &self.password.as_ref().map(|_| REDACTED))
            .field("from", &self.from)
            .field("recipient", &self.recipient)
            .finish()
    }
}

impl fmt::Debug for TelegramConfig {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TelegramConfig")
            .field("bot_token", &REDACTED)
            .field("chat_id", &self.chat_id)
            .field("api_url", &self.api_url)
            .finish()
    }
}

impl MonitorConfig {
    /// Reads `.env` (if any) and then the process environment.
    pub fn from_env() -> Result<Self, ConfigError> {
        let _ = dotenvy::dotenv();
        Self::from_lookup(|key| std::env::var(key).ok())
    }

    /// Builds the configuration from an arbitrary key lookup. Empty values count as unset.
    pub fn from_lookup<F>(lookup: F) -> Result<Self, ConfigError>
    where
        F: Fn(&str) -> Option<String>,
    {
        let get = |key: &str| lookup(key).map(|v| v.trim().to_string()).filter(|v| !v.is_empty());

        let check_interval = parse_or(&get, "CHECK_INTERVAL", default_check_interval())?;
        let request_timeout = parse_or(&get, "REQUEST_TIMEOUT", default_request_timeout())?;
        if check_interval == 0 {
            return Err(invalid("CHECK_INTERVAL", "0", "must be at least one second"));
        }
        if request_timeout == 0 {
            return Err(invalid("REQUEST_TIMEOUT", "0", "must be at least one second"));
        }

        let smtp = match (get("SMTP_SERVER"), get("RECIPIENT_EMAIL")) {
            (Some(host), Some(recipient)) => Some(SmtpConfig {
                host,
                port: parse_or(&get, "SMTP_PORT", default_smtp_port())?,
                username: get("SMTP_USERNAME"),
                password: get("SMTP_PASSWORD"),
                from: get("SMTP_FROM"),
                recipient,
            }),
            _ => {
                warn!("SMTP_SERVER or RECIPIENT_EMAIL not set, email alerts disabled");
                None
            }
        };

        let telegram = match (get("TELEGRAM_BOT_TOKEN"), get("TELEGRAM_CHAT_ID")) {
            (Some(bot_token), Some(chat_id)) => Some(TelegramConfig {
                bot_token,
                chat_id,
                api_url: get("TELEGRAM_API_URL")
                    .unwrap_or_else(|| DEFAULT_TELEGRAM_API_URL.to_string()),
            }),
            _ => None,
        };

        Ok(Self {
            sites_file: get("SITES_FILE").unwrap_or_else(|| DEFAULT_SITES_FILE.into()).into(),
            database_path: get("DATABASE_PATH")
                .unwrap_or_else(|| DEFAULT_DATABASE_PATH.into())
                .into(),
            check_interval: Duration::from_secs(check_interval),
            request_timeout: Duration::from_secs(request_timeout),
            api_url: get("API_URL").unwrap_or_else(|| DEFAULT_API_URL.to_string()),
            serve_status: parse_bool_or(&get, "SERVE_STATUS", true)?,
            status_port: parse_or(&get, "STATUS_PORT", default_status_port())?,
            smtp,
            telegram,
        })
    }

    pub fn update_status_url(&self) -> String {
        format!("{}/api/update_status", self.api_url.trim_end_matches('/'))
    }
}

fn invalid(key: &'static str, value: &str, details: impl ToString) -> ConfigError {
    ConfigError::InvalidValue {
        key,
        value: value.to_string(),
        details: details.to_string(),
    }
}

fn parse_or<T, G>(get: &G, key: &'static str, default: T) -> Result<T, ConfigError>
where
    T: FromStr,
    T::Err: std::fmt::Display,
    G: Fn(&str) -> Option<String>,
{
    match get(key) {
        Some(raw) => raw.parse().map_err(|e: T::Err| invalid(key, &raw, e)),
        None => Ok(default),
    }
}

fn parse_bool_or<G>(get: &G, key: &'static str, default: bool) -> Result<bool, ConfigError>
where
    G: Fn(&str) -> Option<String>,
{
    match get(key).map(|v| v.to_ascii_lowercase()) {
        None => Ok(default),
        Some(v) if matches!(v.as_str(), "1" | "true" | "yes" | "on") => Ok(true),
        Some(v) if matches!(v.as_str(), "0" | "false" | "no" | "off") => Ok(false),
        Some(v) => Err(invalid(key, &v, "expected true or false")),
    }
}
