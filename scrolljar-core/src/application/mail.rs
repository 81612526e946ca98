//! Fire-and-forget mail delivery on tracked background tasks

use std::sync::Arc;
use std::time::Duration;
use tokio_util::task::TaskTracker;

use crate::config::MailerConfig;
use crate::domain::mailer::{IMailer, MailMessage};

/// Sends mail off the request path. Tasks are tracked so shutdown can drain them.
#[derive(Clone)]
pub struct MailDispatcher {
    mailer: Arc<dyn IMailer>,
    tracker: TaskTracker,
    max_attempts: u32,
    retry_delay: Duration,
}

impl MailDispatcher {
    pub fn new(mailer: Arc<dyn IMailer>, tracker: TaskTracker, config: &MailerConfig) -> Self {
        Self {
            mailer,
            tracker,
            max_attempts: config.max_attempts.max(1),
            retry_delay: Duration::from_millis(config.retry_delay_ms),
        }
    }

    /// Queue `message` for delivery, retrying until the first success
    pub fn dispatch(&self, message: MailMessage) {
        let mailer = self.mailer.clone();
        let max_attempts = self.max_attempts;
        let retry_delay = self.retry_delay;

        self.tracker.spawn(async move {
            for attempt in 1..=max_attempts {
                match mailer.send(&message).await {
                    Ok(()) => {
                        tracing::debug!(
                            template = message.template.as_str(),
                            attempt,
                            "Mail delivered"
                        );
                        return;
                    }
                    Err(e) => {
                        tracing::warn!(
                            template = message.template.as_str(),
                            attempt,
                            max_attempts,
                            error = %e,
                            "Mail delivery attempt failed"
                        );
                        if attempt < max_attempts {
                            tokio::time::sleep(retry_delay).await;
                        }
                    }
                }
            }

            tracing::error!(
                template = message.template.as_str(),
                "Giving up on mail delivery"
            );
        });
    }

    pub fn tracker(&self) -> &TaskTracker {
        &self.tracker
    }
}
