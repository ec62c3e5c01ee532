use actix_web::{web, HttpResponse};
use serde_json::{json, Value};
use sqlx::SqlitePool;

use crate::{
    auth::Identity,
    error::{ApiError, ApiResult},
    models::{AppointmentStatus, Role},
    response::Envelope,
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/dashboard/stats").route(web::get().to(stats)));
}

fn require_stat<T>(name: &str, value: Option<T>) -> ApiResult<T> {
    value.ok_or_else(|| ApiError::Aggregation(name.to_string()))
}

async fn role_count(pool: &SqlitePool, name: &str, role: Role) -> ApiResult<i64> {
    require_stat(
        name,
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM users WHERE role = ?")
            .bind(role)
            .fetch_optional(pool)
            .await?,
    )
}

async fn status_count(
    pool: &SqlitePool,
    name: &str,
    status: AppointmentStatus,
) -> ApiResult<i64> {
    require_stat(
        name,
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments WHERE status = ?")
            .bind(status)
            .fetch_optional(pool)
            .await?,
    )
}

async fn stats(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
) -> ApiResult<HttpResponse> {
    identity.require_admin()?;

    // Param-only callers have no session token, hence no cache slot; they
    // recompute on every request.
    let now = state.clock.now_utc();
    if let Some(token) = identity.session_token.as_deref() {
        if let Some(report) = state.dashboard_cache.get(token, now) {
            return Ok(HttpResponse::Ok().json(Envelope::data(report).with_cached(true)));
        }
    }

    let report = compute_report(&state).await?;
    if let Some(token) = identity.session_token.as_deref() {
        state.dashboard_cache.put(token, now, report.clone());
    }

    Ok(HttpResponse::Ok().json(Envelope::data(report).with_cached(false)))
}

async fn compute_report(state: &AppState) -> ApiResult<Value> {
    let pool = &state.db;

    let total_clients = role_count(pool, "total_clients", Role::Client).await?;
    let total_staff = role_count(pool, "total_staff", Role::Staff).await?;
    let total_appointments = require_stat(
        "total_appointments",
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments")
            .fetch_optional(pool)
            .await?,
    )?;

    let pending_appointments =
        status_count(pool, "pending_appointments", AppointmentStatus::Pending).await?;
    let confirmed_appointments =
        status_count(pool, "confirmed_appointments", AppointmentStatus::Confirmed).await?;
    let completed_appointments =
        status_count(pool, "completed_appointments", AppointmentStatus::Completed).await?;
    let cancelled_appointments =
        status_count(pool, "cancelled_appointments", AppointmentStatus::Cancelled).await?;

    let total_revenue = require_stat(
        "total_revenue",
        sqlx::query_scalar::<_, f64>(
            "SELECT COALESCE(SUM(price), 0.0) FROM appointments WHERE status = ?",
        )
        .bind(AppointmentStatus::Completed)
        .fetch_optional(pool)
        .await?,
    )?;

    let today = state.clock.now_utc().format("%Y-%m-%d").to_string();
    let appointments_today = require_stat(
        "appointments_today",
        sqlx::query_scalar::<_, i64>("SELECT COUNT(*) FROM appointments WHERE date = ?")
            .bind(&today)
            .fetch_optional(pool)
            .await?,
    )?;

    let top_services = sqlx::query_as::<_, (String, i64)>(
        r#"SELECT sv.name AS name, COUNT(*) AS bookings
           FROM appointments a
           JOIN services sv ON a.service_id = sv.id
           GROUP BY sv.id, sv.name
           ORDER BY bookings DESC, name ASC
           LIMIT 5"#,
    )
    .fetch_all(pool)
    .await?;

    let service_ratings = sqlx::query_as::<_, (String, f64, i64)>(
        r#"SELECT sv.name AS name, AVG(f.rating) AS avg_rating, COUNT(f.id) AS ratings
           FROM feedback f
           JOIN appointments a ON f.booking_id = a.id
           JOIN services sv ON a.service_id = sv.id
           GROUP BY sv.id, sv.name
           ORDER BY avg_rating DESC, name ASC"#,
    )
    .fetch_all(pool)
    .await?;

    let staff_ratings = sqlx::query_as::<_, (String, f64, i64)>(
        r#"SELECT s.full_name AS name, AVG(f.rating) AS avg_rating, COUNT(f.id) AS ratings
           FROM feedback f
           JOIN appointments a ON f.booking_id = a.id
           JOIN users s ON a.staff_id = s.id
           GROUP BY s.id, s.full_name
           ORDER BY avg_rating DESC, name ASC"#,
    )
    .fetch_all(pool)
    .await?;

    Ok(json!({
        "total_clients": total_clients,
        "total_staff": total_staff,
        "total_appointments": total_appointments,
        "pending_appointments": pending_appointments,
        "confirmed_appointments": confirmed_appointments,
        "completed_appointments": completed_appointments,
        "cancelled_appointments": cancelled_appointments,
        "total_revenue": total_revenue,
        "appointments_today": appointments_today,
        "top_services": top_services
            .into_iter()
            .map(|(name, bookings)| json!({"name": name, "bookings": bookings}))
            .collect::<Vec<_>>(),
        "service_ratings": service_ratings
            .into_iter()
            .map(|(name, avg_rating, ratings)| {
                json!({"name": name, "avg_rating": avg_rating, "ratings": ratings})
            })
            .collect::<Vec<_>>(),
        "staff_ratings": staff_ratings
            .into_iter()
            .map(|(name, avg_rating, ratings)| {
                json!({"name": name, "avg_rating": avg_rating, "ratings": ratings})
            })
            .collect::<Vec<_>>(),
    }))
}
