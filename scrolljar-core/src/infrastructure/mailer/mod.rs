//! Outbound mail backends

pub mod http;
pub mod log;

pub use http::HttpMailer;
pub use log::LogMailer;

use std::sync::Arc;
use std::time::Duration;

use crate::config::{MailerBackend, MailerConfig};
use crate::domain::mailer::IMailer;

/// Build the configured mailer
pub fn from_config(config: &MailerConfig) -> Arc<dyn IMailer> {
    match (config.backend, &config.relay_url) {
        (MailerBackend::Http, Some(relay_url)) => Arc::new(HttpMailer::new(
            relay_url.clone(),
            config.api_key.clone(),
            config.sender.clone(),
            Duration::from_secs(config.timeout_seconds),
        )),
        (MailerBackend::Http, None) => {
            tracing::warn!("HTTP mailer selected without a relay URL; falling back to the log mailer");
            Arc::new(LogMailer::new())
        }
        (MailerBackend::Log, _) => Arc::new(LogMailer::new()),
    }
}
