use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};
use std::time::Duration;

use crate::error::CheckError;

/// A monitoring target, loaded once at startup.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Site {
    pub url: String,
    #[serde(default, alias = "label", skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
}

impl Site {
    #[cfg(test)]
    pub fn new(url: impl Into<String>) -> Self {
        Self { url: url.into(), name: None }
    }
}

/// What one check of one site observed.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum CheckOutcome {
    Online { status_code: u16, elapsed: Duration },
    HttpFailure { status_code: u16, elapsed: Duration },
    TransportFailure(CheckError),
}

impl CheckOutcome {
    pub fn from_status(status_code: u16, elapsed: Duration) -> Self {
        if (200..300).contains(&status_code) {
            CheckOutcome::Online { status_code, elapsed }
        } else {
            CheckOutcome::HttpFailure { status_code, elapsed }
        }
    }

    pub fn is_online(&self) -> bool {
        matches!(self, CheckOutcome::Online { .. })
    }

    pub fn into_result(self, url: &str) -> CheckResult {
        let is_online = self.is_online();
        let (status_code, response_time_ms) = match self {
            CheckOutcome::Online { status_code, elapsed }
            | CheckOutcome::HttpFailure { status_code, elapsed } => {
                (Some(status_code), Some(elapsed.as_millis() as u64))
            }
            CheckOutcome::TransportFailure(_) => (None, None),
        };
        CheckResult {
            url: url.to_string(),
            status_code,
            is_online,
            response_time_ms,
        }
    }
}

/// One row of the per-cycle batch, also the published snapshot element.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CheckResult {
    pub url: String,
    pub status_code: Option<u16>,
    pub is_online: bool,
    pub response_time_ms: Option<u64>,
}

/// A persisted [`CheckResult`] as read back from the log store.
#[cfg_attr(not(test), allow(dead_code))]
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct LogRow {
    pub id: i64,
    pub timestamp: NaiveDateTime,
    pub site_url: String,
    pub status_code: Option<u16>,
    pub response_time_ms: Option<u64>,
    pub is_online: bool,
}
