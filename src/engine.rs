use chrono::Utc;
use futures::future::join_all;
use std::sync::Arc;
use std::time::Duration;
use tracing::{error, info};

use crate::checker::Checker;
use crate::models::{CheckResult, Site};
use crate::publisher::StatusPublisher;

pub struct Monitor {
    sites: Vec<Site>,
    checker: Checker,
    publisher: Arc<dyn StatusPublisher>,
    check_interval: Duration,
}

impl Monitor {
    pub fn new(
        sites: Vec<Site>,
        checker: Checker,
        publisher: Arc<dyn StatusPublisher>,
        check_interval: Duration,
    ) -> Self {
        Self { sites, checker, publisher, check_interval }
    }

    /// Runs cycles until the task is dropped.
    pub async fn run(&self) {
        info!(
            sites = self.sites.len(),
            interval_secs = self.check_interval.as_secs(),
            "Site monitor active"
        );

        loop {
            let start_time = Utc::now();
            let results = self.run_cycle().await;

            let duration = Utc::now() - start_time;
            let offline = results.iter().filter(|r| !r.is_online).count();
            info!(
                "Cycle completed {} checks ({} offline) in {:.2}s. Next check in {}s.",
                results.len(),
                offline,
                duration.num_milliseconds() as f64 / 1000.0,
                self.check_interval.as_secs()
            );

            tokio::time::sleep(self.check_interval).await;
        }
    }

    /// Checks every site concurrently, then publishes the batch in site order.
    pub async fn run_cycle(&self) -> Vec<CheckResult> {
        info!("Checking sites...");
        let results = join_all(self.sites.iter().map(|site| self.checker.check(site))).await;

        if let Err(e) = self.publisher.publish(&results).await {
            error!(error = %e, "Failed to publish status");
        }
        results
    }
}
