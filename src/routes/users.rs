use actix_web::{web, HttpResponse};
use chrono::Utc;
use serde::Deserialize;

use crate::{
    auth::{hash_password, new_id, Identity},
    db,
    error::{ApiError, ApiResult},
    models::{Role, UserDto, UserRow},
    query::{like_pattern, Filters, Page, PAGE_SIZE},
    response::{Envelope, Pagination},
    state::AppState,
};

pub fn configure(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/users")
            .route(web::get().to(list))
            .route(web::post().to(create)),
    )
    .service(
        web::resource("/users/{id}")
            .route(web::get().to(get_one))
            .route(web::post().to(update)),
    )
    .service(web::resource("/users/{id}/active").route(web::post().to(toggle_active)));
}

#[derive(Debug, Deserialize)]
struct DirectoryQuery {
    page: Option<String>,
    name: Option<String>,
    role: Option<String>,
    status: Option<String>,
}

#[derive(Debug, Deserialize)]
struct CreateUserPayload {
    full_name: String,
    email: String,
    password: String,
    role: String,
    phone: Option<String>,
    dob: Option<String>,
}

#[derive(Debug, Deserialize)]
struct UpdateUserPayload {
    full_name: Option<String>,
    phone: Option<String>,
    dob: Option<String>,
}

/// On this endpoint `role` doubles as the directory filter, so a session
/// admin must not be demoted by their own filter parameter.
fn require_directory_admin(identity: &Identity) -> ApiResult<&str> {
    let user_id = identity.require()?;
    if identity.is_admin() || matches!(identity.session_role, Some(Role::Admin)) {
        Ok(user_id)
    } else {
        Err(ApiError::unauthorized("Admin access required"))
    }
}

async fn list(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    query: web::Query<DirectoryQuery>,
) -> ApiResult<HttpResponse> {
    require_directory_admin(&identity)?;

    let query = query.into_inner();
    let page = Page::parse(query.page.as_deref());

    let mut filters = Filters::new();
    if let Some(name) = query
        .name
        .as_deref()
        .map(str::trim)
        .filter(|name| !name.is_empty())
    {
        let pattern = like_pattern(name);
        filters.add_texts(
            "(full_name LIKE ? OR email LIKE ?)",
            vec![pattern.clone(), pattern],
        );
    }
    if let Some(raw) = query.role.as_deref().filter(|raw| !raw.is_empty()) {
        let role = raw
            .parse::<Role>()
            .map_err(|_| ApiError::validation("Unknown role"))?;
        filters.add_text("role = ?", role.to_string());
    }
    match query.status.as_deref() {
        Some("active") => filters.add("is_active = 1"),
        Some("inactive") => filters.add("is_active = 0"),
        _ => {}
    }

    let count_sql = filters.count_sql("users");
    let mut count = sqlx::query_scalar::<_, i64>(&count_sql);
    for param in filters.params() {
        count = count.bind(param);
    }
    let total = count.fetch_one(&state.db).await?;

    let select_sql = filters.select_sql(
        "SELECT id, full_name, phone, email, dob, role, password_hash, is_active, is_verified, created_at FROM users",
        "created_at DESC, id DESC",
    );
    let mut select = sqlx::query_as::<_, UserRow>(&select_sql);
    for param in filters.params() {
        select = select.bind(param);
    }
    let rows = select
        .bind(PAGE_SIZE)
        .bind(page.offset())
        .fetch_all(&state.db)
        .await?;
    let users: Vec<UserDto> = rows.into_iter().map(UserDto::from).collect();

    Ok(HttpResponse::Ok()
        .json(Envelope::data(users).with_pagination(Pagination::new(page.number(), total))))
}

async fn get_one(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let target = path.into_inner();
    if target != caller && !identity.is_admin() {
        return Err(ApiError::unauthorized("Not allowed to view this user"));
    }

    let user = db::fetch_user(&state.db, &target)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(Envelope::data(UserDto::from(user))))
}

async fn create(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    payload: web::Json<CreateUserPayload>,
) -> ApiResult<HttpResponse> {
    identity.require_admin()?;

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
    let role = payload
        .role
        .parse::<Role>()
        .map_err(|_| ApiError::validation("Unknown role"))?;

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
           VALUES (?, ?, ?, ?, ?, ?, ?, 1, 1, ?)"#,
    )
    .bind(&id)
    .bind(&full_name)
    .bind(payload.phone.as_deref().unwrap_or("").trim())
    .bind(&email)
    .bind(payload.dob.as_deref())
    .bind(role)
    .bind(password_hash)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await?;

    let user = db::fetch_user(&state.db, &id)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(Envelope::message("User created").with_data(UserDto::from(user))))
}

async fn update(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
    payload: web::Json<UpdateUserPayload>,
) -> ApiResult<HttpResponse> {
    let caller = identity.require()?;
    let target = path.into_inner();
    if target != caller && !identity.is_admin() {
        return Err(ApiError::unauthorized("Not allowed to update this user"));
    }

    let current = db::fetch_user(&state.db, &target)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    let payload = payload.into_inner();
    let full_name = match payload.full_name {
        Some(name) => {
            let name = name.trim().to_string();
            if name.is_empty() {
                return Err(ApiError::validation("Full name cannot be empty"));
            }
            name
        }
        None => current.full_name,
    };
    let phone = match payload.phone {
        Some(phone) => phone.trim().to_string(),
        None => current.phone,
    };
    let dob = payload.dob.or(current.dob);

    sqlx::query("UPDATE users SET full_name = ?, phone = ?, dob = ? WHERE id = ?")
        .bind(&full_name)
        .bind(&phone)
        .bind(&dob)
        .bind(&target)
        .execute(&state.db)
        .await?;

    let user = db::fetch_user(&state.db, &target)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(Envelope::message("User updated").with_data(UserDto::from(user))))
}

async fn toggle_active(
    state: web::Data<AppState>,
    identity: web::ReqData<Identity>,
    path: web::Path<String>,
) -> ApiResult<HttpResponse> {
    identity.require_admin()?;
    let target = path.into_inner();

    let current = db::fetch_user(&state.db, &target)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    sqlx::query("UPDATE users SET is_active = 1 - is_active WHERE id = ?")
        .bind(&target)
        .execute(&state.db)
        .await?;

    let message = if current.is_active == 1 {
        "User deactivated"
    } else {
        "User activated"
    };
    let user = db::fetch_user(&state.db, &target)
        .await?
        .ok_or_else(|| ApiError::not_found("User not found"))?;

    Ok(HttpResponse::Ok().json(Envelope::message(message).with_data(UserDto::from(user))))
}
