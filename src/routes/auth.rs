use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;
use serde_json::json;

use crate::{
    auth::{authenticate_credentials, hash_password, new_id, Identity},
    db,
    error::{ApiError, ApiResult},
    models::{Role, UserDto},
    response::Envelope,
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(web::resource("/register").route(web::post().to(register)))
        .service(web::resource("/login").route(web::post().to(login)))
        .service(web::resource("/logout").route(web::post().to(logout)));
}

#[derive(Debug, Deserialize)]
struct RegisterPayload {
    full_name: String,
    email: String,
    password: String,
    phone: Option<String>,
    dob: Option<String>,
}

#[derive(Debug, Deserialize)]
struct LoginPayload {
    email: String,
    password: String,
}

/// Self-service signup always produces a client account; staff and admin
/// accounts come from the admin-only user endpoint.
async fn register(
    state: web::Data<AppState>,
    payload: web::Json<RegisterPayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let full_name = payload.full_name.trim().to_string();
    let email = payload.email.trim().to_lowercase();

    if full_name.is_empty() {
        return Err(ApiError::validation("Full name is required"));
    }
    if email.is_empty() {
        return Err(ApiError::validation("Email is required"));
    }
    if payload.password.len() < 6 {
        return Err(ApiError::validation("Password must be at least 6 characters"));
    }

    let existing = sqlx::query_scalar::<_, String>("SELECT id FROM users WHERE email = ? LIMIT 1")
        .bind(&email)
        .fetch_optional(&state.db)
        .await?;
    if existing.is_some() {
        return Err(ApiError::validation("Email is already registered"));
    }

    let password_hash = hash_password(&payload.password).map_err(|_| ApiError::Execution)?;
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO users (id, full_name, phone, email, dob, role, password_hash, is_active, is_verified, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, 1, 0, ?)"#,
    )
    .bind(&id)
    .bind(&full_name)
    .bind(payload.phone.as_deref().unwrap_or("").trim())
    .bind(&email)
    .bind(payload.dob.as_deref())
    .bind(Role::Client)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let user = db::fetch_user(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(
        Envelope::message("Registration successful").with_data(UserDto::from(user)),
    ))
}

async fn login(
    state: web::Data<AppState>,
    payload: web::Json<LoginPayload>,
) -> ApiResult<HttpResponse> {
    let payload = payload.into_inner();
    let email = payload.email.trim().to_lowercase();
    if email.is_empty() || payload.password.is_empty() {
        return Err(ApiError::validation("Email and password are required"));
    }

    let user = match authenticate_credentials(&state, &email, &payload.password).await {
        Some(user) => user,
        None => {
            return Ok(
                HttpResponse::Unauthorized().json(Envelope::error("Invalid email or password"))
            );
        }
    };

    let (token, session) = state.sessions.open(&user.id, user.role);
    let body = json!({
        "token": token,
        "csrf_token": session.csrf_token,
        "user": UserDto::from(user),
    });

    Ok(HttpResponse::Ok().json(Envelope::message("Login successful").with_data(body)))
}

async fn logout(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
) -> ApiResult<HttpResponse> {
    let token = identity
        .session_token
        .as_deref()
        .ok_or(ApiError::Unauthenticated)?;
    state.sessions.close(token);
    state.dashboard_cache.invalidate(token);

    Ok(HttpResponse::Ok().json(Envelope::message("Logged out")))
}
