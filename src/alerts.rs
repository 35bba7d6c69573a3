use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::message::Mailbox;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use serde_json::json;
use tracing::{error, info, warn};

use crate::config::{SmtpConfig, TelegramConfig};
use crate::error::AlertError;
use crate::models::CheckOutcome;

const SMTP_TIMEOUT: Duration = Duration::from_secs(30);
const CHAT_TIMEOUT: Duration = Duration::from_secs(20);

/// A notification about one offline site, pre-rendered for every channel.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Alert {
    pub url: String,
    pub subject: String,
    pub body: String,
    pub short_text: String,
}

impl Alert {
    /// Renders the alert for a failed check. Online outcomes produce nothing.
    pub fn for_outcome(url: &str, outcome: &CheckOutcome) -> Option<Self> {
        match outcome {
            CheckOutcome::Online { .. } => None,
            CheckOutcome::HttpFailure { status_code, .. } => Some(Self {
                url: url.to_string(),
                subject: format!("ALERT: Site {url} offline"),
                body: format!(
                    "The site {url} is offline. Status code: {status_code}. Check it immediately."
                ),
                short_text: format!("ALERT: Site {url} offline! Status code: {status_code}"),
            }),
            CheckOutcome::TransportFailure(err) => Some(Self {
                url: url.to_string(),
                subject: format!("ALERT: Error checking {url}"),
                body: format!(
                    "Error checking site {url}: {err}. Check the connection or the site configuration."
                ),
                short_text: format!("ALERT: Error checking {url}: {err}"),
            }),
        }
    }
}

/// One independent way of delivering an alert.
#[async_trait]
pub trait AlertChannel: Send + Sync {
    fn name(&self) -> &'static str;

    async fn send(&self, alert: &Alert) -> Result<(), AlertError>;
}

fn mailbox(address: &str) -> Result<Mailbox, AlertError> {
    address.parse().map_err(|e: lettre::address::AddressError| AlertError::Address {
        address: address.to_string(),
        details: e.to_string(),
    })
}

/// Email over SMTP with STARTTLS.
pub struct EmailChannel {
    transport: AsyncSmtpTransport<Tokio1Executor>,
    from: Mailbox,
    to: Mailbox,
}

impl EmailChannel {
    pub fn new(config: &SmtpConfig) -> Result<Self, AlertError> {
        let mut builder = AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.host)
            .map_err(|e| AlertError::Smtp(e.to_string()))?
            .port(config.port)
            .timeout(Some(SMTP_TIMEOUT));
        if let Some(username) = &config.username {
            builder = builder.credentials(Credentials::new(
                username.clone(),
                config.password.clone().unwrap_or_default(),
            ));
        }

        let to = mailbox(&config.recipient)?;
        let from = match (&config.from, &config.username) {
            (Some(from), _) => mailbox(from)?,
            // login names such as "apikey" are credentials only
            (None, Some(username)) => mailbox(username).unwrap_or_else(|_| to.clone()),
            (None, None) => to.clone(),
        };
        Ok(Self { transport: builder.build(), from, to })
    }

    fn compose(&self, alert: &Alert) -> Result<Message, AlertError> {
        Message::builder()
            .from(self.from.clone())
            .to(self.to.clone())
            .subject(alert.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(alert.body.clone())
            .map_err(|e| AlertError::Message(e.to_string()))
    }
}

#[async_trait]
impl AlertChannel for EmailChannel {
    fn name(&self) -> &'static str {
        "email"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let message = self.compose(alert)?;
        self.transport
            .send(message)
            .await
            .map_err(|e| AlertError::Smtp(e.to_string()))?;
        info!(to = %self.to, subject = %alert.subject, "Alert email sent");
        Ok(())
    }
}

/// Plain-text message through the Telegram Bot API.
pub struct TelegramChannel {
    client: reqwest::Client,
    endpoint: String,
    chat_id: String,
}

impl TelegramChannel {
    pub fn new(config: &TelegramConfig) -> Result<Self, AlertError> {
        let client = reqwest::Client::builder()
            .timeout(CHAT_TIMEOUT)
            .build()
            .map_err(|e| AlertError::ChatTransport(e.to_string()))?;
        Ok(Self {
            client,
            endpoint: format!(
                "{}/bot{}/sendMessage",
                config.api_url.trim_end_matches('/'),
                config.bot_token
            ),
            chat_id: config.chat_id.clone(),
        })
    }
}

#[async_trait]
impl AlertChannel for TelegramChannel {
    fn name(&self) -> &'static str {
        "telegram"
    }

    async fn send(&self, alert: &Alert) -> Result<(), AlertError> {
        let response = self
            .client
            .post(&self.endpoint)
            .json(&json!({ "chat_id": self.chat_id, "text": alert.short_text }))
            .send()
            .await
            // the endpoint embeds the bot token
            .map_err(|e| AlertError::ChatTransport(e.without_url().to_string()))?;

        let status = response.status();
        if !status.is_success() {
            let body = response.text().await.unwrap_or_default();
            return Err(AlertError::ChatRejected { status: status.as_u16(), body });
        }
        info!(chat_id = %self.chat_id, "Alert chat message sent");
        Ok(())
    }
}

/// Fans one alert out to every configured channel, once each, in order.
#[derive(Clone, Default)]
pub struct AlertDispatcher {
    channels: Vec<Arc<dyn AlertChannel>>,
}

impl AlertDispatcher {
    pub fn new(channels: Vec<Arc<dyn AlertChannel>>) -> Self {
        Self { channels }
    }

    /// Builds the channels present in the configuration. A channel that fails to
    /// initialise is logged and left out.
    pub fn from_config(smtp: Option<&SmtpConfig>, telegram: Option<&TelegramConfig>) -> Self {
        let mut channels: Vec<Arc<dyn AlertChannel>> = Vec::new();

        if let Some(smtp) = smtp {
            match EmailChannel::new(smtp) {
                Ok(channel) => channels.push(Arc::new(channel)),
                Err(e) => error!(error = %e, "Email alerts disabled"),
            }
        }
        if let Some(telegram) = telegram {
            match TelegramChannel::new(telegram) {
                Ok(channel) => channels.push(Arc::new(channel)),
                Err(e) => error!(error = %e, "Telegram alerts disabled"),
            }
        }

        let dispatcher = Self::new(channels);
        if dispatcher.channels.is_empty() {
            warn!("No alert channels configured, failures will only be logged");
        } else {
            info!(channels = ?dispatcher.channel_names(), "Alert channels ready");
        }
        dispatcher
    }

    pub fn channel_names(&self) -> Vec<&'static str> {
        self.channels.iter().map(|c| c.name()).collect()
    }

    /// Returns how many channels accepted the alert. Failures are logged, never raised.
    pub async fn dispatch(&self, alert: &Alert) -> usize {
        let mut delivered = 0;
        for channel in &self.channels {
            match channel.send(alert).await {
                Ok(()) => delivered += 1,
                Err(e) => error!(
                    channel = channel.name(),
                    url = %alert.url,
                    error = %e,
                    "Failed to deliver alert"
                ),
            }
        }
        delivered
    }
}
