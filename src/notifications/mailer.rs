//! Outbound email transports

use std::sync::Arc;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use thiserror::Error;
use tokio::sync::Mutex;

#[derive(Error, Debug)]
pub enum MailError {
    #[error("Mail relay request failed: {0}")]
    Transport(String),

    #[error("Mail relay rejected the message with status {0}")]
    Rejected(u16),
}

impl From<reqwest::Error> for MailError {
    fn from(err: reqwest::Error) -> Self {
        MailError::Transport(err.to_string())
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Email {
    pub from: String,
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, email: Email) -> Result<(), MailError>;
}

/// Posts each message as JSON to an HTTP mail relay
pub struct HttpMailer {
    endpoint: String,
    client: Client,
}

impl HttpMailer {
    pub fn new(endpoint: impl Into<String>) -> Self {
        Self {
            endpoint: endpoint.into(),
            client: Client::builder()
                .timeout(Duration::from_secs(10))
                .build()
                .unwrap_or_else(|_| Client::new()),
        }
    }
}

#[async_trait]
impl Mailer for HttpMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        let response = self.client.post(&self.endpoint).json(&email).send().await?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailError::Rejected(status.as_u16()));
        }

        tracing::debug!(to = %email.to, subject = %email.subject, "Email relayed");
        Ok(())
    }
}

/// Writes messages to the log instead of sending them
#[derive(Default)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        tracing::info!(
            to = %email.to,
            subject = %email.subject,
            body = %email.body,
            "Email (log only)"
        );
        Ok(())
    }
}

/// Keeps every message in memory, for tests
#[derive(Default, Clone)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<Email>>>,
}

impl RecordingMailer {
    pub fn new() -> Self {
        Self::default()
    }

    pub async fn sent(&self) -> Vec<Email> {
        self.sent.lock().await.clone()
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, email: Email) -> Result<(), MailError> {
        self.sent.lock().await.push(email);
        Ok(())
    }
}
