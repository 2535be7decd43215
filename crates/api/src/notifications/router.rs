//! Event-to-notification routing.
//!
//! Every event whose type maps to a [`NotificationKind`] is rendered through
//! the dispatch table, stored once per recipient, pushed to the recipient's
//! open WebSocket connections and, when the kind has an email template and
//! SMTP is configured, mailed. Delivery failures never undo the stored row.

use std::collections::HashMap;
use std::sync::Arc;

use axum::extract::ws::Message;
use learnhub_core::channels::CHANNEL_IN_APP;
use learnhub_core::notification::{
    self, LinkContext, NotificationContent, NotificationKind, EVENT_CONTENT_UPDATE_SUBMITTED,
};
use learnhub_core::roles::ROLE_ADMIN;
use learnhub_core::types::DbId;
use learnhub_db::models::notification::{CreateNotification, Notification};
use learnhub_db::models::user::User;
use learnhub_db::repositories::{NotificationRepo, UserRepo};
use learnhub_db::DbPool;
use learnhub_events::{MailDispatcher, PlatformEvent, TemplatedMail};
use serde_json::{json, Value};
use tokio::sync::broadcast;

use crate::site::SiteConfig;
use crate::ws::WsManager;

pub struct NotificationRouter {
    pool: DbPool,
    ws_manager: Arc<WsManager>,
    mailer: MailDispatcher,
    site: Arc<SiteConfig>,
}

impl NotificationRouter {
    pub fn new(
        pool: DbPool,
        ws_manager: Arc<WsManager>,
        mailer: MailDispatcher,
        site: Arc<SiteConfig>,
    ) -> Self {
        Self {
            pool,
            ws_manager,
            mailer,
            site,
        }
    }

    /// Consume events until the bus is dropped.
    pub async fn run(self, mut receiver: broadcast::Receiver<PlatformEvent>) {
        loop {
            match receiver.recv().await {
                Ok(event) => {
                    if let Err(e) = self.route_event(&event).await {
                        tracing::error!(
                            error = %e,
                            event_type = %event.event_type,
                            "Failed to route event"
                        );
                    }
                }
                Err(broadcast::error::RecvError::Lagged(n)) => {
                    tracing::warn!(skipped = n, "Notification router lagged");
                }
                Err(broadcast::error::RecvError::Closed) => {
                    tracing::info!("Event bus closed, notification router shutting down");
                    break;
                }
            }
        }
    }

    /// Store and deliver the notifications one event raises.
    ///
    /// Returns the stored rows; events that notify nobody return none.
    pub async fn route_event(&self, event: &PlatformEvent) -> Result<Vec<Notification>, sqlx::Error> {
        let Some(kind) = NotificationKind::from_event_type(&event.event_type) else {
            return Ok(Vec::new());
        };

        let recipients = self.recipients(event).await?;
        if recipients.is_empty() {
            tracing::debug!(event_type = %event.event_type, "Event has no recipients");
            return Ok(Vec::new());
        }

        let ctx = LinkContext {
            base_url: &self.site.base_url,
            default_image: self.site.default_image.as_deref(),
        };
        let content = notification::render(kind, &event.payload, &ctx);

        let mut stored = Vec::with_capacity(recipients.len());
        for &user_id in &recipients {
            let row = NotificationRepo::create(
                &self.pool,
                &CreateNotification {
                    user_id,
                    kind: kind.as_str().to_string(),
                    channel: CHANNEL_IN_APP.to_string(),
                    title: content.title.clone(),
                    link: Some(content.link.clone()),
                    image: content.image.clone(),
                    payload: event.payload.clone(),
                },
            )
            .await?;
            self.push(&row).await;
            stored.push(row);
        }

        if content.email.is_some() && self.mailer.is_enabled() {
            self.mail(&recipients, &content, &event.payload).await;
        }

        tracing::debug!(
            event_type = %event.event_type,
            kind = %kind,
            count = stored.len(),
            "Notifications stored"
        );
        Ok(stored)
    }

    /// Addressed users, or every admin for a submission awaiting review.
    async fn recipients(&self, event: &PlatformEvent) -> Result<Vec<DbId>, sqlx::Error> {
        let explicit = notification::recipients(&event.payload);
        if explicit.is_empty() && event.event_type == EVENT_CONTENT_UPDATE_SUBMITTED {
            return UserRepo::ids_with_role(&self.pool, ROLE_ADMIN).await;
        }
        Ok(explicit)
    }

    async fn push(&self, row: &Notification) {
        let frame = json!({
            "type": "notification",
            "data": row,
        });
        let sent = self
            .ws_manager
            .send_to_user(row.user_id, Message::Text(frame.to_string().into()))
            .await;
        tracing::trace!(user_id = row.user_id, connections = sent, "Notification pushed");
    }

    async fn mail(&self, recipients: &[DbId], content: &NotificationContent, payload: &Value) {
        let Some(email) = &content.email else {
            return;
        };
        let users: HashMap<DbId, User> = match UserRepo::find_many(&self.pool, recipients).await {
            Ok(users) => users.into_iter().map(|u| (u.id, u)).collect(),
            Err(e) => {
                tracing::warn!(error = %e, "Failed to load mail recipients");
                return;
            }
        };

        for user in recipients.iter().filter_map(|id| users.get(id)) {
            if !user.is_active {
                continue;
            }
            let mut context = match payload {
                Value::Object(map) => map.clone(),
                _ => Default::default(),
            };
            context.insert("display_name".into(), json!(user.display_name));
            context.insert("site_name".into(), json!(self.site.site_name));
            context.insert("link".into(), json!(content.link));
            context.entry("title").or_insert_with(|| json!(content.title));

            self.mailer.spawn(TemplatedMail {
                email: user.email.clone(),
                subject: email.subject.clone(),
                template: email.template.to_string(),
                context: Value::Object(context),
            });
        }
    }
}
