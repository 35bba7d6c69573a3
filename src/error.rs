use std::path::PathBuf;

use thiserror::Error;

/// Startup failures. These are the only errors that stop the process.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("invalid value for {key}: {value:?} ({details})")]
    InvalidValue {
        key: &'static str,
        value: String,
        details: String,
    },

    #[error("site list {path} could not be read: {source}")]
    SiteListRead {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("site list {path} is not valid JSON: {source}")]
    SiteListParse {
        path: PathBuf,
        #[source]
        source: serde_json::Error,
    },

    #[error("site list entry {index} has an invalid url {url:?}: {details}")]
    InvalidSiteUrl {
        index: usize,
        url: String,
        details: String,
    },

    #[error("no sites configured to monitor")]
    EmptySiteList,
}

/// Reasons a check produced no HTTP status.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum CheckError {
    #[error("request timed out after {0}s")]
    Timeout(u64),

    #[error("connection failed: {0}")]
    Connect(String),

    #[error("request failed: {0}")]
    Request(String),

    #[error("unexpected failure: {0}")]
    Internal(String),
}

impl CheckError {
    pub fn from_reqwest(err: &reqwest::Error, timeout_secs: u64) -> Self {
        if err.is_timeout() {
            CheckError::Timeout(timeout_secs)
        } else if err.is_connect() {
            CheckError::Connect(err.to_string())
        } else {
            CheckError::Request(err.to_string())
        }
    }
}

#[derive(Debug, Error)]
pub enum AlertError {
    #[error("invalid email address {address:?}: {details}")]
    Address { address: String, details: String },

    #[error("email could not be built: {0}")]
    Message(String),

    #[error("smtp delivery failed: {0}")]
    Smtp(String),

    #[error("chat endpoint unreachable: {0}")]
    ChatTransport(String),

    #[error("chat endpoint rejected message with status {status}: {body}")]
    ChatRejected { status: u16, body: String },
}

#[derive(Debug, Error)]
pub enum StoreError {
    #[error("sqlite failure in {context}: {source}")]
    Sql {
        context: &'static str,
        #[source]
        source: rusqlite::Error,
    },
}

impl StoreError {
    pub fn sql(context: &'static str) -> impl FnOnce(rusqlite::Error) -> Self {
        move |source| StoreError::Sql { context, source }
    }
}

#[derive(Debug, Error)]
pub enum PublishError {
    #[error("status endpoint unreachable: {0}")]
    Transport(#[from] reqwest::Error),

    #[error("status endpoint answered {0}")]
    Rejected(u16),
}
