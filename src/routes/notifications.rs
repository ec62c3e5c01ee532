use actix_web::{web, HttpResponse};
use serde_json::json;

use crate::{
    auth::Identity,
    error::{ApiError, ApiResult},
    models::{NotificationDto, NotificationRow},
    response::Envelope,
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/notifications").route(web::get().to(list)))
        .service(web::resource("/notifications/unread-count").route(web::get().to(unread_count)))
        .service(web::resource("/notifications/{id}/read").route(web::post().to(mark_read)));
}

async fn list(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;

    let rows = sqlx::query_as::<_, NotificationRow>(
        r#"SELECT id, user_id, title, message, created_at, is_read
           FROM notifications
           WHERE user_id = ?
           ORDER BY created_at DESC, id DESC"#,
    )
    .bind(caller)
    .fetch_all(&state.db)
    .await?;
    let notifications: Vec<NotificationDto> = rows.into_iter().map(NotificationDto::from).collect();

    Ok(HttpResponse::Ok().json(Envelope::data(notifications)))
}

async fn mark_read(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let id = path.into_inner();

    let notification = sqlx::query_as::<_, NotificationRow>(
        r#"SELECT id, user_id, title, message, created_at, is_read
           FROM notifications
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(&id)
    .fetch_optional(&state.db)
    .await?
    .ok_or_else(|| ApiError::not_found("Notification not found"))?;

    if notification.user_id != caller {
        return Err(ApiError::unauthorized(
            "Only the owner can mark a notification as read",
        ));
    }

    sqlx::query("UPDATE notifications SET is_read = 1 WHERE id = ?")
        .bind(&id)
        .execute(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::message("Notification marked as read")))
}

async fn unread_count(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;

    let count: i64 = sqlx::query_scalar(
        "SELECT COUNT(*) FROM notifications WHERE user_id = ? AND is_read = 0",
    )
    .bind(caller)
    .fetch_one(&state.db)
    .await?;

    Ok(HttpResponse::Ok().json(Envelope::data(json!({"count": count}))))
}
