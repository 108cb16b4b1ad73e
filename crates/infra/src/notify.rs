//! Outbound notifications.
//!
//! Delivery is best-effort: a failing notifier never fails the business
//! operation that triggered it.

use async_trait::async_trait;
use thiserror::Error;
use tracing::{info, warn};

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Message {
    pub to: String,
    pub subject: String,
    pub body: String,
}

#[derive(Debug, Error, Clone, PartialEq, Eq)]
#[error("notification delivery failed: {0}")]
pub struct NotifyError(pub String);

#[async_trait]
pub trait Notifier: Send + Sync {
    async fn send(&self, message: Message) -> Result<(), NotifyError>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone, Copy)]
pub struct LogNotifier;

#[async_trait]
impl Notifier for LogNotifier {
    async fn send(&self, message: Message) -> Result<(), NotifyError> {
        info!(to = %message.to, subject = %message.subject, "notification (log only)");
        Ok(())
    }
}

/// Send and swallow any failure after logging it.
pub async fn notify_best_effort(notifier: &dyn Notifier, message: Message) {
    let to = message.to.clone();
    if let Err(e) = notifier.send(message).await {
        warn!(to = %to, error = %e, "notification failed; continuing");
    }
}

pub fn welcome_message(to: &str, client_name: &str) -> Message {
    Message {
        to: to.to_string(),
        subject: "Welcome to the loyalty program".to_string(),
        body: format!("Hi {client_name}, you are now enrolled. Every visit counts towards your next gift."),
    }
}

pub fn redemption_message(to: &str, client_name: &str, gift_name: &str) -> Message {
    Message {
        to: to.to_string(),
        subject: "Gift redeemed".to_string(),
        body: format!("Hi {client_name}, you redeemed: {gift_name}. Your visit count starts over now."),
    }
}
