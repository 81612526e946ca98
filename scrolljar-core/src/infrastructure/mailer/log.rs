//! Mailer that records messages in the log instead of sending them

use async_trait::async_trait;
use std::sync::{Arc, Mutex, PoisonError};

use crate::domain::mailer::{IMailer, MailMessage, MailerError};

#[derive(Clone, Default)]
pub struct LogMailer {
    sent: Arc<Mutex<Vec<MailMessage>>>,
}

impl LogMailer {
    pub fn new() -> Self {
        Self::default()
    }

    /// Messages recorded so far, oldest first
    pub fn sent(&self) -> Vec<MailMessage> {
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .clone()
    }
}

#[async_trait]
impl IMailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<(), MailerError> {
        tracing::info!(
            recipient = %message.recipient,
            template = message.template.as_str(),
            "Mail recorded (log mailer)"
        );
        self.sent
            .lock()
            .unwrap_or_else(PoisonError::into_inner)
            .push(message.clone());
        Ok(())
    }
}
