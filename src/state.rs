use std::sync::Arc;

use sqlx::SqlitePool;
use tokio::sync::broadcast;

use crate::{
    auth::{CsrfValidator, SessionStore, SessionTokenCsrf},
    cache::{Clock, DashboardCache, SystemClock},
    events::AppEvent,
};

pub const EVENT_CHANNEL_CAPACITY: usize = 64;

#[derive(Clone)]
pub struct AppState {
    pub db: SqlitePool,
    pub sessions: Arc<SessionStore>,
    pub dashboard_cache: Arc<DashboardCache>,
    pub events: broadcast::Sender<AppEvent>,
    pub clock: Arc<dyn Clock>,
    pub csrf: Arc<dyn CsrfValidator>,
}

impl AppState {
    pub fn new(db: SqlitePool) -> Self {
        let (events, _) = broadcast::channel(EVENT_CHANNEL_CAPACITY);
        AppState {
            db,
            sessions: Arc::new(SessionStore::default()),
            dashboard_cache: Arc::new(DashboardCache::new()),
            events,
            clock: Arc::new(SystemClock),
            csrf: Arc::new(SessionTokenCsrf),
        }
    }

    /// Publish a post-commit event. Best-effort: with no live subscribers the
    /// send fails and the write that triggered it is unaffected.
    pub fn publish(&self, event: AppEvent) {
        let _ = self.events.send(event);
    }
}
