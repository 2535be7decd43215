use std::sync::Arc;

use learnhub_events::{EventBus, MailDispatcher, PlatformEvent, RecountQueue};

use crate::config::ServerConfig;
use crate::site::SiteConfig;
use crate::ws::WsManager;

/// Shared application state available to all handlers via axum's `State` extractor.
#[derive(Clone)]
pub struct AppState {
    pub pool: learnhub_db::DbPool,
    pub config: Arc<ServerConfig>,
    pub site: Arc<SiteConfig>,
    pub ws_manager: Arc<WsManager>,
    pub event_bus: Arc<EventBus>,
    /// Background org unit counter maintenance.
    pub recount: RecountQueue,
    /// Best-effort templated email.
    pub mailer: MailDispatcher,
}

impl AppState {
    pub fn publish(&self, event: PlatformEvent) {
        self.event_bus.publish(event);
    }
}
