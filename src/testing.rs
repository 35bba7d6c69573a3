//! In-memory doubles for the checker, dispatcher and loop tests.

use std::collections::HashMap;
use std::time::Duration;

use async_trait::async_trait;
use parking_lot::Mutex;

use crate::alerts::{Alert, AlertChannel};
use crate::checker::{Probe, ProbeResponse};
use crate::error::{AlertError, CheckError, PublishError, StoreError};
use crate::models::CheckResult;
use crate::publisher::StatusPublisher;
use crate::store::ResultLog;

#[derive(Clone)]
enum Script {
    Status { code: u16, delay: Duration },
    Fail(CheckError),
}

/// Answers per URL from a script; unknown URLs fail to connect.
#[derive(Default)]
pub struct ScriptedProbe {
    scripts: HashMap<String, Script>,
    panics: bool,
}

impl ScriptedProbe {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn panicking() -> Self {
        Self { panics: true, ..Self::default() }
    }

    pub fn status(self, url: &str, code: u16) -> Self {
        self.status_after(url, code, Duration::ZERO)
    }

    pub fn status_after(mut self, url: &str, code: u16, delay: Duration) -> Self {
        self.scripts.insert(url.to_string(), Script::Status { code, delay });
        self
    }

    pub fn failure(mut self, url: &str, err: CheckError) -> Self {
        self.scripts.insert(url.to_string(), Script::Fail(err));
        self
    }
}

#[async_trait]
impl Probe for ScriptedProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, CheckError> {
        if self.panics {
            panic!("probe exploded for {url}");
        }
        match self.scripts.get(url).cloned() {
            Some(Script::Status { code, delay }) => {
                tokio::time::sleep(delay).await;
                Ok(ProbeResponse { status_code: code, elapsed: delay })
            }
            Some(Script::Fail(err)) => Err(err),
            None => Err(CheckError::Connect(format!("no script for {url}"))),
        }
    }
}

#[derive(Default)]
pub struct MemoryLog {
    rows: Mutex<Vec<CheckResult>>,
    attempts: Mutex<usize>,
    fail: bool,
}

impl MemoryLog {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn results(&self) -> Vec<CheckResult> {
        self.rows.lock().clone()
    }

    pub fn attempts(&self) -> usize {
        *self.attempts.lock()
    }
}

impl ResultLog for MemoryLog {
    fn append(&self, result: &CheckResult) -> Result<i64, StoreError> {
        *self.attempts.lock() += 1;
        if self.fail {
            return Err(StoreError::Sql {
                context: "insert",
                source: rusqlite::Error::InvalidQuery,
            });
        }
        let mut rows = self.rows.lock();
        rows.push(result.clone());
        Ok(rows.len() as i64)
    }
}

/// Log store whose every append panics.
pub struct PanickingLog;

impl ResultLog for PanickingLog {
    fn append(&self, result: &CheckResult) -> Result<i64, StoreError> {
        panic!("log store corrupted while writing {}", result.url);
    }
}

pub struct RecordingChannel {
    name: &'static str,
    fail: bool,
    panics: bool,
    sent: Mutex<Vec<Alert>>,
}

impl RecordingChannel {
    pub fn new(name: &'static str) -> Self {
        Self { name, fail: false, panics: false, sent: Mutex::new(Vec::new()) }
    }

    pub fn failing(name: &'static str) -> Self {
        Self { fail: true, ..Self::new(name) }
    }

    pub fn panicking(name: &'static str) -> Self {
        Self { panics: true, ..Self::new(name) }
    }

    pub fn sent(&self) -> Vec<Alert> {
        self.sent.lock().clone()
    }
}

#[async_trait]
impl AlertChannel for RecordingChannel {
    fn name(&self) -> &'static str {
        self.name
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        self.sent.lock().push(alert.clone());
        if self.panics {
            panic!("channel {} blew up", self.name);
        }
        if self.fail {
            return Err(AlertError::Smtp("connection refused".into()));
        }
        Ok(())
    }
}

#[derive(Default)]
pub struct RecordingPublisher {
    batches: Mutex<Vec<Vec<CheckResult>>>,
    fail: bool,
}

impl RecordingPublisher {
    pub fn failing() -> Self {
        Self { fail: true, ..Self::default() }
    }

    pub fn batches(&self) -> Vec<Vec<CheckResult>> {
        self.batches.lock().clone()
    }
}

#[async_trait]
impl StatusPublisher for RecordingPublisher {
    async fn publish(&self, batch: &[CheckResult]) -> Result<(), PublishError> {
        self.batches.lock().push(batch.to_vec());
        if self.fail {
            return Err(PublishError::Rejected(503));
        }
        Ok(())
    }
}
