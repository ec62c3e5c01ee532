use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;
use sqlx::SqlitePool;

use crate::{
    auth::{new_id, Identity},
    db,
    error::{ApiError, ApiResult},
    events::AppEvent,
    models::{ConversationDto, ConversationRow, MessageDto, MessageRow},
    response::Envelope,
    state::AppState,
};

/// Latest message per unordered sender/receiver pair, from the caller's side,
/// with the caller's unread backlog per partner. The pair is normalised with
/// SQLite's two-argument MIN/MAX so A->B and B->A share one partition.
const CONVERSATIONS_SQL: &str = r#"WITH ranked AS (
    SELECT m.id, m.sender_id, m.receiver_id, m.message, m.sent_at, m.is_read,
           ROW_NUMBER() OVER (
               PARTITION BY MIN(m.sender_id, m.receiver_id), MAX(m.sender_id, m.receiver_id)
               ORDER BY m.sent_at DESC, m.id DESC
           ) AS rn
    FROM messages m
    WHERE m.sender_id = ? OR m.receiver_id = ?
)
SELECT CASE WHEN r.sender_id = ? THEN r.receiver_id ELSE r.sender_id END AS partner_id,
       u.full_name AS partner_name,
       r.id AS message_id,
       r.sender_id,
       r.message,
       r.sent_at,
       r.is_read,
       (SELECT COUNT(*) FROM messages um
         WHERE um.receiver_id = ?
           AND um.sender_id = CASE WHEN r.sender_id = ? THEN r.receiver_id ELSE r.sender_id END
           AND um.is_read = 0) AS unread_count
FROM ranked r
JOIN users u ON u.id = CASE WHEN r.sender_id = ? THEN r.receiver_id ELSE r.sender_id END
WHERE r.rn = 1
ORDER BY r.sent_at DESC, r.id DESC"#;

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/messages").route(web::post().to(send)))
        .service(web::resource("/messages/unread-count").route(web::get().to(unread_count)))
        .service(web::resource("/messages/{id}/read").route(web::post().to(mark_read)))
        .service(web::resource("/conversations").route(web::get().to(conversations)))
        .service(web::resource("/conversations/{partner_id}").route(web::get().to(history)))
        .service(
            web::resource("/conversations/{partner_id}/read")
                .route(web::post().to(mark_conversation_read)),
        );
}

#[derive(Debug, Deserialize)]
struct SendPayload {
    receiver_id: String,
    message: String,
}

async fn fetch_message(pool: &SqlitePool, id: &str) -> Result<Option<MessageRow>, sqlx::Error> {
    sqlx::query_as::<_, MessageRow>(
        r#"SELECT id, sender_id, receiver_id, message, sent_at, is_read
           FROM messages
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

async fn send(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    payload: web::Json<SendPayload>,
) -> ApiResult<HttpResponse> {
    let sender_id = identity.require()?.to_string();

    let payload = payload.into_inner();
    let body = payload.message.trim().to_string();
    if body.is_empty() {
        return Err(ApiError::validation("Message cannot be empty"));
    }
    if payload.receiver_id == sender_id {
        return Err(ApiError::validation("You cannot message yourself"));
    }

    let receiver = db::fetch_user(&state.db, &payload.receiver_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Receiver not found"))?;
    let sender = db::fetch_user(&state.db, &sender_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Sender not found"))?;

    let id = new_id();
    sqlx::query(
        r#"INSERT INTO messages (id, sender_id, receiver_id, message, sent_at, is_read)
           VALUES (?, ?, ?, ?, ?, 0)"#,
    )
    .bind(&id)
    .bind(&sender.id)
    .bind(&receiver.id)
    .bind(&body)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let message = fetch_message(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;

    let note = format!("New message from {}", sender.full_name);
    state.publish(AppEvent::new(
        "message_sent",
        Some(&receiver.id),
        Some(&id),
        "New message",
        &note,
    ));
    db::notify_user(&state, &receiver.id, "New message", &note).await;

    Ok(HttpResponse::Ok()
        .json(Envelope::message("Message sent").with_data(MessageDto::from(message))))
}

async fn conversations(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;

    let rows = sqlx::query_as::<_, ConversationRow>(CONVERSATIONS_SQL)
        .bind(caller)
        .bind(caller)
        .bind(caller)
        .bind(caller)
        .bind(caller)
        .bind(caller)
        .fetch_all(&state.db)
        .await?;
    let conversations: Vec<ConversationDto> = rows.into_iter().map(ConversationDto::from).collect();

    Ok(HttpResponse::Ok().json(Envelope::data(conversations)))
}

async fn history(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let partner = path.into_inner();

    let rows = sqlx::query_as::<_, MessageRow>(
        r#"SELECT id, sender_id, receiver_id, message, sent_at, is_read
           FROM messages
           WHERE (sender_id = ? AND receiver_id = ?) OR (sender_id = ? AND receiver_id = ?)
           ORDER BY sent_at ASC, id ASC"#,
    )
    .bind(caller)
    .bind(&partner)
    .bind(&partner)
    .bind(caller)
    .fetch_all(&state.db)
    .await?;
    let messages: Vec<MessageDto> = rows.into_iter().map(MessageDto::from).collect();

    Ok(HttpResponse::Ok().json(Envelope::data(messages)))
}

async fn mark_read(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let id = path.into_inner();

    let message = fetch_message(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Message not found"))?;
    if message.receiver_id != caller {
        return Err(ApiError::unauthorized(
            "Only the receiver can mark a message as read",
        ));
    }

    sqlx::query("UPDATE messages SET is_read = 1 WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::message("Message marked as read")))
}

/// No check that the partner exists or that any rows match; only the
/// caller's own inbox side of the pair is touched.
async fn mark_conversation_read(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let partner = path.into_inner();

    let result = sqlx::query(
        "UPDATE messages SET is_read = 1 WHERE sender_id = ? AND receiver_id = ? AND is_read = 0",
    )
    .bind(&partner)
    .bind(caller)
    .execute(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(
        Envelope::message("Conversation marked as read")
            .with_data(json!({"updated": result.rows_affected()})),
    ))
}

async fn unread_count(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM messages WHERE receiver_id = ? AND is_read = 0",
    )
    .bind(caller)
    .fetch_one(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(Envelope::data(json!({"count": count}))))
}
