//! Best-effort mail dispatch.
//!
//! Sending never fails the caller: errors are logged and recorded in
//! `mail_logs`. With no SMTP configuration every message is skipped.

use std::sync::Arc;

use learnhub_db::repositories::MailLogRepo;
use learnhub_db::DbPool;

use super::email::{EmailDelivery, TemplatedMail};

/// Sends templated mail and records failures.
#[derive(Clone)]
pub struct MailDispatcher {
    pool: DbPool,
    delivery: Option<Arc<EmailDelivery>>,
}

impl MailDispatcher {
    pub fn new(pool: DbPool, delivery: Option<Arc<EmailDelivery>>) -> Self {
        Self { pool, delivery }
    }

    /// Whether an SMTP transport is configured.
    pub fn is_enabled(&self) -> bool {
        self.delivery.is_some()
    }

    /// Send one message. Returns `true` if it was handed to the SMTP server.
    pub async fn dispatch(&self, mail: &TemplatedMail) -> bool {
        let Some(delivery) = &self.delivery else {
            tracing::debug!(to = %mail.email, template = %mail.template, "Email disabled, skipping");
            return false;
        };

        match delivery.send(mail).await {
            Ok(()) => true,
            Err(e) => {
                tracing::warn!(
                    to = %mail.email,
                    template = %mail.template,
                    error = %e,
                    "Email delivery failed"
                );
                self.record_failure(mail, &e.to_string()).await;
                false
            }
        }
    }

    /// Send on a background task.
    pub fn spawn(&self, mail: TemplatedMail) {
        let dispatcher = self.clone();
        tokio::spawn(async move {
            dispatcher.dispatch(&mail).await;
        });
    }

    async fn record_failure(&self, mail: &TemplatedMail, error: &str) {
        if let Err(e) = MailLogRepo::create(
            &self.pool,
            &mail.email,
            &mail.subject,
            &mail.template,
            &mail.context,
            error,
        )
        .await
        {
            tracing::error!(to = %mail.email, error = %e, "Failed to write mail log");
        }
    }
}
