//! Mailer posting messages to an HTTP mail relay
//!
//! Templates are rendered by the relay; this side only ships the template
//! name and its variables.

use async_trait::async_trait;
use reqwest::Client;
use serde::Serialize;
use std::time::Duration;
use tracing::{debug, error};

use crate::domain::mailer::{IMailer, MailMessage, MailerError};

#[derive(Serialize)]
struct RelayRequest<'a> {
    from: &'a str,
    to: &'a str,
    template: &'a str,
    data: &'a serde_json::Value,
}

pub struct HttpMailer {
    client: Client,
    relay_url: String,
    api_key: Option<String>,
    sender: String,
}

impl HttpMailer {
    pub fn new(
        relay_url: impl Into<String>,
        api_key: Option<String>,
        sender: impl Into<String>,
        timeout: Duration,
    ) -> Self {
        let client = Client::builder().timeout(timeout).build().unwrap_or_else(|e| {
            error!(error = %e, "Failed to build mail relay client with custom timeout, using default client");
            Client::new()
        });

        Self {
            client,
            relay_url: relay_url.into(),
            api_key,
            sender: sender.into(),
        }
    }
}

#[async_trait]
impl IMailer for HttpMailer {
    #[tracing::instrument(skip(self, message), fields(recipient = %message.recipient, template = message.template.as_str()))]
    async fn send(&self, message: &MailMessage) -> Result<(), MailerError> {
        let body = RelayRequest {
            from: &self.sender,
            to: &message.recipient,
            template: message.template.as_str(),
            data: &message.data,
        };

        let mut request = self.client.post(&self.relay_url).json(&body);
        if let Some(api_key) = &self.api_key {
            request = request.bearer_auth(api_key);
        }

        let response = request
            .send()
            .await
            .map_err(|e| MailerError::Delivery(e.to_string()))?;

        let status = response.status();
        if !status.is_success() {
            return Err(MailerError::Rejected {
                status: status.as_u16(),
            });
        }

        debug!("Mail relay accepted message");
        Ok(())
    }
}
