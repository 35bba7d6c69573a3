use anyhow::{Context, Result};
use std::sync::Arc;
use tokio::signal;
use tracing::{error, info};

mod alerts;
mod api;
mod checker;
mod config;
mod engine;
mod error;
mod models;
mod publisher;
mod sites;
mod store;
#[cfg(test)]
mod testing;

use crate::alerts::AlertDispatcher;
use crate::api::StatusStore;
use crate::checker::{Checker, HttpProbe};
use crate::config::MonitorConfig;
use crate::engine::Monitor;
use crate::publisher::HttpPublisher;
use crate::store::SqliteLog;

#[tokio::main]
async fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env()
            .add_directive(tracing::Level::INFO.into()))
        .with_ansi(true)
        .init();

    let config = MonitorConfig::from_env().context("Failed to load configuration")?;

    let sites = match sites::load_sites(&config.sites_file) {
        Ok(sites) => sites,
        Err(e) => {
            error!(error = %e, "No sites to monitor. Exiting.");
            return Err(e.into());
        }
    };

    let log = SqliteLog::open(&config.database_path)
        .with_context(|| format!("Failed to open {}", config.database_path.display()))?;
    let probe = HttpProbe::new(config.request_timeout).context("Failed to build HTTP client")?;
    let alerts = AlertDispatcher::from_config(config.smtp.as_ref(), config.telegram.as_ref());
    let publisher = HttpPublisher::new(config.update_status_url())
        .context("Failed to build status publisher")?;

    if config.serve_status {
        let port = config.status_port;
        tokio::spawn(async move {
            if let Err(e) = api::start_server(port, StatusStore::new()).await {
                error!(port, error = %e, "Status endpoint failed");
            }
        });
    }

    let checker = Checker::new(Arc::new(probe), Arc::new(log), alerts);
    let monitor = Monitor::new(sites, checker, Arc::new(publisher), config.check_interval);

    tokio::select! {
        _ = monitor.run() => {}
        result = signal::ctrl_c() => {
            result.context("Failed to listen for shutdown signal")?;
            info!("Monitoring interrupted by user.");
        }
    }

    Ok(())
}
