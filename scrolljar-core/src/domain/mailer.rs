//! Outbound mail contract

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use thiserror::Error;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum MailTemplate {
    /// Sent after registration, carries the first activation token
    UserWelcome,
    /// Sent on request for a new activation token
    ActivationToken,
}

impl MailTemplate {
    pub fn as_str(&self) -> &'static str {
        match self {
            MailTemplate::UserWelcome => "user_welcome",
            MailTemplate::ActivationToken => "activation_token",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MailMessage {
    pub recipient: String,
    pub template: MailTemplate,
    /// Template variables; rendering happens downstream
    pub data: serde_json::Value,
}

#[derive(Error, Debug, Clone)]
pub enum MailerError {
    #[error("mail delivery failed: {0}")]
    Delivery(String),

    #[error("mail relay rejected message with status {status}")]
    Rejected { status: u16 },
}

#[async_trait]
pub trait IMailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<(), MailerError>;
}
