#![allow(dead_code)]

use chrono::Utc;
use sqlx::sqlite::SqlitePoolOptions;

use salondesk::{
    auth::new_id,
    models::{AppointmentStatus, Role},
    state::AppState,
};

/// Fresh in-memory database with the schema applied. One connection so every
/// query sees the same memory-backed file.
pub async fn test_state() -> AppState {
    let pool = SqlitePoolOptions::new()
        .max_connections(1)
        .connect("sqlite::memory:")
        .await
        .expect("connect in-memory sqlite");
    salondesk::db::run_migrations(&pool)
        .await
        .expect("run migrations");
    AppState::new(pool)
}

/// Builds the full application service around `$state`.
#[macro_export]
macro_rules! test_app {
    ($state:expr) => {
        actix_web::test::init_service(
            actix_web::App::new()
                .app_data(actix_web::web::Data::new($state.clone()))
                .configure(salondesk::routes::configure),
        )
        .await
    };
}

/// Inserts a user directly; the password hash is unusable, sessions for these
/// fixtures are opened straight on the store.
pub async fn create_user(state: &AppState, name: &str, email: &str, role: Role) -> String {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO users (id, full_name, phone, email, dob, role, password_hash, is_active, is_verified, created_at)
           VALUES (?, ?, '', ?, NULL, ?, 'x', 1, 1, ?)"#,
    )
    .bind(&id)
    .bind(name)
    .bind(email)
    .bind(role)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .expect("insert user");
    id
}

pub async fn create_service(state: &AppState, name: &str, price: f64) -> String {
    let id = new_id();
    sqlx::query("INSERT INTO services (id, name, price) VALUES (?, ?, ?)")
        .bind(&id)
        .bind(name)
        .bind(price)
        .execute(&state.db)
        .await
        .expect("insert service");
    id
}

pub async fn create_appointment(
    state: &AppState,
    client_id: &str,
    staff_id: &str,
    service_id: &str,
    date: &str,
    time: &str,
    status: AppointmentStatus,
    price: f64,
) -> String {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO appointments (id, client_id, staff_id, service_id, date, time, status, price, created_at)
           VALUES (?, ?, ?, ?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(client_id)
    .bind(staff_id)
    .bind(service_id)
    .bind(date)
    .bind(time)
    .bind(status)
    .bind(price)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await
    .expect("insert appointment");
    id
}

pub async fn insert_message(
    state: &AppState,
    sender_id: &str,
    receiver_id: &str,
    body: &str,
    sent_at: &str,
    is_read: i64,
) -> String {
    let id = new_id();
    sqlx::query(
        r#"INSERT INTO messages (id, sender_id, receiver_id, message, sent_at, is_read)
           VALUES (?, ?, ?, ?, ?, ?)"#,
    )
    .bind(&id)
    .bind(sender_id)
    .bind(receiver_id)
    .bind(body)
    .bind(sent_at)
    .bind(is_read)
    .execute(&state.db)
    .await
    .expect("insert message");
    id
}

pub async fn insert_feedback(state: &AppState, booking_id: &str, rating: f64) {
    sqlx::query("INSERT INTO feedback (id, booking_id, rating, created_at) VALUES (?, ?, ?, ?)")
        .bind(new_id())
        .bind(booking_id)
        .bind(rating)
        .bind(Utc::now().to_rfc3339())
        .execute(&state.db)
        .await
        .expect("insert feedback");
}

/// Opens a session for the user and returns `(bearer_token, csrf_token)`.
pub fn open_session(state: &AppState, user_id: &str, role: Role) -> (String, String) {
    let (token, session) = state.sessions.open(user_id, role);
    (token, session.csrf_token)
}
