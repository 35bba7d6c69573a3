use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::sync::Arc;
use std::time::{Duration, Instant};

use async_trait::async_trait;
use futures::FutureExt;
use tracing::{error, info, warn};

use crate::alerts::{Alert, AlertDispatcher};
use crate::error::CheckError;
use crate::models::{CheckOutcome, CheckResult, Site};
use crate::store::ResultLog;

/// A received HTTP response, reduced to what the checker records.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ProbeResponse {
    pub status_code: u16,
    pub elapsed: Duration,
}

/// Issues the request for one check.
#[async_trait]
pub trait Probe: Send + Sync {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, CheckError>;
}

/// Single GET with a fixed overall timeout. Redirects are followed.
pub struct HttpProbe {
    client: reqwest::Client,
    timeout: Duration,
}

impl HttpProbe {
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder().timeout(timeout).build()?;
        Ok(Self { client, timeout })
    }
}

#[async_trait]
impl Probe for HttpProbe {
    async fn probe(&self, url: &str) -> Result<ProbeResponse, CheckError> {
        let start = Instant::now();
        let response = self
            .client
            .get(url)
            .send()
            .await
            .map_err(|e| CheckError::from_reqwest(&e, self.timeout.as_secs()))?;
        Ok(ProbeResponse {
            status_code: response.status().as_u16(),
            elapsed: start.elapsed(),
        })
    }
}

/// Availability checker: probe, then log, then alert when offline.
///
/// [`Checker::check`] never fails. Whatever happens inside the probe, including a
/// panic, ends up as a [`CheckResult`] with exactly one log write behind it. Panics
/// in the log store or an alert channel are logged and contained here too.
#[derive(Clone)]
pub struct Checker {
    probe: Arc<dyn Probe>,
    log: Arc<dyn ResultLog>,
    alerts: AlertDispatcher,
}

impl Checker {
    pub fn new(probe: Arc<dyn Probe>, log: Arc<dyn ResultLog>, alerts: AlertDispatcher) -> Self {
        Self { probe, log, alerts }
    }

    pub async fn check(&self, site: &Site) -> CheckResult {
        let url = site.url.as_str();
        let outcome = match AssertUnwindSafe(self.probe.probe(url)).catch_unwind().await {
            Ok(Ok(response)) => CheckOutcome::from_status(response.status_code, response.elapsed),
            Ok(Err(err)) => CheckOutcome::TransportFailure(err),
            Err(payload) => CheckOutcome::TransportFailure(CheckError::Internal(panic_message(payload))),
        };

        match &outcome {
            CheckOutcome::Online { status_code, elapsed } => info!(
                url,
                status_code,
                response_time_ms = elapsed.as_millis() as u64,
                "Site online"
            ),
            CheckOutcome::HttpFailure { status_code, elapsed } => warn!(
                url,
                status_code,
                response_time_ms = elapsed.as_millis() as u64,
                "Site offline"
            ),
            CheckOutcome::TransportFailure(err) => error!(url, error = %err, "Error checking site"),
        }

        let alert = Alert::for_outcome(url, &outcome);
        let result = outcome.into_result(url);

        match panic::catch_unwind(AssertUnwindSafe(|| self.log.append(&result))) {
            Ok(Ok(_)) => {}
            Ok(Err(e)) => error!(url, error = %e, "Failed to record check result"),
            Err(p) => error!(url, error = %panic_message(p), "Result log panicked"),
        }
        if let Some(alert) = alert {
            if let Err(p) = AssertUnwindSafe(self.alerts.dispatch(&alert)).catch_unwind().await {
                error!(url, error = %panic_message(p), "Alert dispatch panicked");
            }
        }
        result
    }
}

fn panic_message(payload: Box<dyn Any + Send>) -> String {
    if let Some(msg) = payload.downcast_ref::<&str>() {
        (*msg).to_string()
    } else if let Some(msg) = payload.downcast_ref::<String>() {
        msg.clone()
    } else {
        "check panicked".to_string()
    }
}
