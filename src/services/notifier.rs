// src/services/notifier.rs

//! Notification of interested subscribers when a section opens up.
//!
//! Delivery is behind the `Mailer` trait. The crate ships a log-only mailer
//! and an outbox mailer that appends JSON lines for an external relay.

use std::path::PathBuf;
use std::sync::Arc;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use tokio::io::AsyncWriteExt;

use crate::error::{AppError, Result};
use crate::models::{CourseRecord, NotifyConfig, Transition};
use crate::storage::CourseStore;

/// A message ready for delivery.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct MailMessage {
    pub recipient: String,
    pub subject: String,
    pub body: String,
}

/// Capability to deliver one message.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, message: &MailMessage) -> Result<()>;
}

/// Writes messages to the log instead of delivering them.
#[derive(Debug, Default, Clone)]
pub struct LogMailer;

#[async_trait]
impl Mailer for LogMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        log::info!(
            "[dry-run] mail to {}: {} | {}",
            message.recipient,
            message.subject,
            message.body
        );
        Ok(())
    }
}

/// Appends each message as one JSON line to an outbox file.
#[derive(Debug, Clone)]
pub struct OutboxMailer {
    path: PathBuf,
}

impl OutboxMailer {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }
}

#[async_trait]
impl Mailer for OutboxMailer {
    async fn send(&self, message: &MailMessage) -> Result<()> {
        if let Some(parent) = self.path.parent() {
            if !parent.as_os_str().is_empty() {
                tokio::fs::create_dir_all(parent).await?;
            }
        }

        let mut line = serde_json::to_vec(message)?;
        line.push(b'\n');

        let mut file = tokio::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)
            .await?;
        file.write_all(&line).await?;
        file.flush().await?;
        Ok(())
    }
}

/// Delivery counts for one transition.
#[derive(Debug, Default, Clone, Copy, PartialEq, Eq)]
pub struct NotifyOutcome {
    pub sent: usize,
    pub failed: usize,
}

/// Turns availability transitions into messages for interested subscribers.
pub struct TransitionNotifier {
    mailer: Arc<dyn Mailer>,
    subject: String,
    body_template: String,
}

impl TransitionNotifier {
    pub fn new(mailer: Arc<dyn Mailer>, config: &NotifyConfig) -> Self {
        Self {
            mailer,
            subject: config.subject.clone(),
            body_template: config.body_template.clone(),
        }
    }

    /// Build the message for one recipient.
    pub fn message_for(&self, recipient: &str, record: &CourseRecord) -> MailMessage {
        MailMessage {
            recipient: recipient.to_string(),
            subject: self.subject.clone(),
            body: record.format(&self.body_template),
        }
    }

    /// Message every subscriber interested in the transitioned section.
    ///
    /// A failed send is logged and counted; the remaining recipients are
    /// still tried. Nothing here is propagated to the caller.
    pub async fn notify(
        &self,
        store: &Arc<dyn CourseStore>,
        transition: &Transition,
    ) -> NotifyOutcome {
        let mut outcome = NotifyOutcome::default();
        if !transition.became_available {
            return outcome;
        }

        // SQLite is synchronous; keep it off the async workers.
        let lookup = Arc::clone(store);
        let course_id = transition.course_id;
        let found = tokio::task::spawn_blocking(move || lookup.interested_subscribers(course_id))
            .await
            .map_err(AppError::from)
            .and_then(|subscribers| subscribers);

        let subscribers = match found {
            Ok(subscribers) => subscribers,
            Err(e) => {
                log::error!(
                    "Failed to resolve subscribers for {}: {}",
                    transition.record.key(),
                    e
                );
                return outcome;
            }
        };

        for subscriber in subscribers {
            let message = self.message_for(&subscriber.email, &transition.record);
            match self.mailer.send(&message).await {
                Ok(()) => outcome.sent += 1,
                Err(e) => {
                    outcome.failed += 1;
                    log::warn!("Failed to notify {}: {}", subscriber.email, e);
                }
            }
        }

        if outcome.sent + outcome.failed > 0 {
            log::info!(
                "{} opened up: notified {} subscriber(s), {} failed",
                transition.record.key(),
                outcome.sent,
                outcome.failed
            );
        }
        outcome
    }
}
