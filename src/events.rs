use actix_web::web;
use serde::Serialize;

/// Post-commit application event, published on the broadcast channel after a
/// durable write. Delivery is best-effort; the originating request never
/// waits on or fails with a subscriber.
#[derive(Clone, Debug, Serialize)]
pub struct AppEvent {
    pub kind: String,
    pub user_id: Option<String>,
    pub entity_id: Option<String>,
    pub title: String,
    pub body: String,
}

impl AppEvent {
    pub fn new(
        kind: &str,
        user_id: Option<&str>,
        entity_id: Option<&str>,
        title: &str,
        body: &str,
    ) -> Self {
        AppEvent {
            kind: kind.to_string(),
            user_id: user_id.map(str::to_string),
            entity_id: entity_id.map(str::to_string),
            title: title.to_string(),
            body: body.to_string(),
        }
    }
}

pub fn event_to_bytes(event: &AppEvent) -> web::Bytes {
    let payload = serde_json::to_string(event).unwrap_or_else(|_| "{}".to_string());
    web::Bytes::from(format!("event: update\ndata: {}\n\n", payload))
}
