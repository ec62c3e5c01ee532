use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::{new_id, Identity},
    db,
    error::{ApiError, ApiResult},
    events::AppEvent,
    models::{AppointmentDto, AppointmentRow, AppointmentStatus, Role, ServiceRow},
    query::{Filters, Page, PAGE_SIZE},
    response::{Envelope, Pagination},
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/appointments")
            .route(web::get().to(list))
            .route(web::post().to(book)),
    )
    .service(web::resource("/appointments/{id}").route(web::get().to(get_one)))
    .service(web::resource("/appointments/{id}/status").route(web::post().to(set_status)))
    .service(web::resource("/feedback").route(web::post().to(leave_feedback)));
}

#[derive(Debug, Deserialize)]
struct BookPayload {
    staff_id: String,
    service_id: String,
    date: String,
    time: String,
    client_id: Option<String>,
}

#[derive(Debug, Deserialize)]
struct AppointmentsQuery {
    page: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct StatusPayload {
    status: String,
}

#[derive(Debug, Deserialize)]
struct FeedbackPayload {
    booking_id: String,
    rating: f64,
}

async fn book(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    payload: web::Json<BookPayload>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?.to_string();

    let payload = payload.into_inner();
    let date = payload.date.trim().to_string();
    let time = payload.time.trim().to_string();
    if date.is_empty() || time.is_empty() {
        return Err(ApiError::validation("Date and time are required"));
    }

    let client_id = match payload.client_id.filter(|id| !id.is_empty()) {
        Some(client) if client != caller => {
            identity.require_admin()?;
            client
        }
        Some(client) => client,
        None => caller,
    };

    let staff = db::fetch_user(&state.db, &payload.staff_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Staff member not found"))?;
    if staff.role != Role::Staff {
        return Err(ApiError::validation("Selected user is not a staff member"));
    }
    let client = db::fetch_user(&state.db, &client_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Client not found"))?;
    let service =
        sqlx::query_as::<_, ServiceRow>("SELECT id, name, price FROM services WHERE id = ?")
            .bind(&payload.service_id)
            .fetch_optional(&state.db)
            .await?
            .ok_or_else(|| ApiError::not_found("Service not found"))?;

    let id = new_id();
    sqlx::query(
        r#"INSERT INTO appointments (id, client_id, staff_id, service_id, date, time, status, price, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(&client_id)
    .bind(&staff.id)
    .bind(&service.id)
    .bind(&date)
    .bind(&time)
    .bind(AppointmentStatus::Pending)
    .bind(service.price)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let appointment = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    state.publish(AppEvent::new(
        "appointment_booked",
        Some(&staff.id),
        Some(&id),
        "New appointment",
        &format!(
            "{} booked {} on {} at {}.",
            client.full_name, service.name, date, time
        ),
    ));

    Ok(HttpResponse::Ok().json(
        Envelope::message("Appointment booked").with_data(AppointmentDto::from(appointment)),
    ))
}

async fn list(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    query: web::Query<AppointmentsQuery>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?.to_string();

    let query = query.into_inner();
    let page = Page::parse(query.page.as_deref());

    let mut filters = Filters::new();
    if let Some(raw) = query.status.as_deref().filter(|raw| !raw.is_empty()) {
        let status = raw
            .parse::<AppointmentStatus>()
            .map_err(|_| ApiError::validation("Unknown status"))?;
        filters.add_text("a.status = ?", status.to_string());
    }
    match identity.role {
        Some(Role::Admin) => {}
        Some(Role::Staff) => filters.add_text("a.staff_id = ?", caller),
        Some(Role::Client) | None => filters.add_text("a.client_id = ?", caller),
    }

    let count_sql = filters.count_sql("appointments a");
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    for param in filters.params() {
        count = count.bind(param);
    }
    let total = count.fetch_one(&state.db).await?;

    let select_sql =
        filters.select_sql(db::APPOINTMENT_SELECT, "a.date DESC, a.time DESC, a.id DESC");
    let mut select = sqlx::query_as::<_, AppointmentRow>(&select_sql);
    for param in filters.params() {
        select = select.bind(param);
    }
    let rows = select
        .bind(PAGE_SIZE)
        .bind(page.offset())
        .fetch_all(&state.db)
        .await?;
    let appointments: Vec<AppointmentDto> = rows.into_iter().map(AppointmentDto::from).collect();

    Ok(HttpResponse::Ok()
        .json(Envelope::data(appointments).with_pagination(Pagination::new(page.number(), total))))
}

async fn get_one(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let id = path.into_inner();

    let appointment = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    let involved = appointment.client_id == caller || appointment.staff_id == caller;
    if !involved && !identity.is_admin() {
        return Err(ApiError::unauthorized("Not allowed to view this appointment"));
    }

    Ok(HttpResponse::Ok().json(Envelope::data(AppointmentDto::from(appointment))))
}

async fn set_status(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
    payload: web::Json<StatusPayload>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let id = path.into_inner();

    let status = payload
        .status
        .parse::<AppointmentStatus>()
        .map_err(|_| ApiError::validation("Unknown status"))?;

    let appointment = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;
    if appointment.staff_id != caller && !identity.is_admin() {
        return Err(ApiError::unauthorized("Not allowed to update this appointment"));
    }

    // Any status may overwrite any other; the enum parse above is the only
    // gate on the value itself.
    sqlx::query("UPDATE appointments SET status = ? WHERE id = ?")
        .bind(status)
        .bind(&id)
        .execute(&state.db)
        .await?;

    let updated = db::fetch_appointment(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;

    let note = format!(
        "Your {} on {} at {} is now {}.",
        updated.service_name.as_deref().unwrap_or("appointment"),
        updated.date,
        updated.time,
        status
    );
    state.publish(AppEvent::new(
        "appointment_status",
        Some(&updated.client_id),
        Some(&id),
        "Appointment update",
        &note,
    ));
    db::notify_user(&state, &updated.client_id, "Appointment update", &note).await;

    Ok(HttpResponse::Ok()
        .json(Envelope::message("Status updated").with_data(AppointmentDto::from(updated))))
}

async fn leave_feedback(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    payload: web::Json<FeedbackPayload>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;

    let payload = payload.into_inner();
    if !payload.rating.is_finite() || !(1.0..=5.0).contains(&payload.rating) {
        return Err(ApiError::validation("Rating must be between 1 and 5"));
    }

    let appointment = db::fetch_appointment(&state.db, &payload.booking_id)
        .await?
        .ok_or_else(|| ApiError::not_found("Appointment not found"))?;
    if appointment.client_id != caller {
        return Err(ApiError::unauthorized(
            "Only the booking's client can leave feedback",
        ));
    }

    sqlx::query("INSERT INTO feedback (id, booking_id, rating, created_at) VALUES (?, ?, ?, ?)")
        .bind(new_id())
        .bind(&appointment.id)
        .bind(payload.rating)
        .bind(Utc::now().to_rfc3339())
        .execute(&state.db)
        .await?;

    Ok(HttpResponse::Ok().json(Envelope::message("Feedback recorded")))
}
