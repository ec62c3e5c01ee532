use std::{fs, path::Path};

use chrono::Utc;
use sqlx::SqlitePool;

use crate::{
    auth::{hash_password, new_id},
    config::AppConfig,
    events::AppEvent,
    models::{AppointmentRow, Role, UserRow},
    state::AppState,
};

/// Appointment head shared by the single fetch and the paginated listings so
/// both return the same joined columns.
pub const APPOINTMENT_SELECT: &str = r#"SELECT a.id, a.client_id, a.staff_id, a.service_id,
       a.date, a.time, a.status, a.price, a.created_at,
       c.full_name AS client_name, s.full_name AS staff_name, sv.name AS service_name
  FROM appointments a
  LEFT JOIN users c ON a.client_id = c.id
  LEFT JOIN users s ON a.staff_id = s.id
  LEFT JOIN services sv ON a.service_id = sv.id"#;

pub async fn run_migrations(pool: &SqlitePool) -> Result<(), sqlx::migrate::MigrateError> {
    sqlx::migrate!("./migrations").run(pool).await
}

pub fn ensure_sqlite_dir(db_url: &str) -> std::io::Result<()> {
    let path = if let Some(path) = db_url.strip_prefix("sqlite://") {
        Some(path)
    } else if let Some(path) = db_url.strip_prefix("sqlite:") {
        Some(path)
    } else {
        None
    };

    let Some(path) = path else {
        return Ok(());
    };

    let path = path.split('?').next().unwrap_or(path);
    if path == ":memory:" || path.is_empty() {
        return Ok(());
    }

    let path = path.strip_prefix("file:").unwrap_or(path);
    let db_path = Path::new(path);
    if let Some(parent) = db_path.parent() {
        fs::create_dir_all(parent)?;
    }
    Ok(())
}

pub async fn seed_defaults(pool: &SqlitePool, config: &AppConfig) -> Result<(), sqlx::Error> {
    seed_admin(pool, config).await?;
    seed_services(pool).await?;
    Ok(())
}

async fn seed_admin(pool: &SqlitePool, config: &AppConfig) -> Result<(), sqlx::Error> {
    let existing = sqlx::query_as::<_, (String,)>("SELECT id FROM users WHERE role = ? LIMIT 1")
        .bind(Role::Admin)
        .fetch_optional(pool)
        .await?;

    if existing.is_some() {
        return Ok(());
    }

    if config.admin_password == "admin" {
        log::warn!("ADMIN_PASSWORD not set. Using default password 'admin'. Set ADMIN_PASSWORD in production.");
    }

    let password_hash = hash_password(&config.admin_password)
        .map_err(|_| sqlx::Error::Protocol("password hash failed".into()))?;
    let now = Utc::now().to_rfc3339();

    sqlx::query(
        r#"INSERT INTO users (id, full_name, phone, email, dob, role, password_hash, is_active, is_verified, created_at)
           VALUES (?, ?, '', ?, NULL, ?, ?, 1, 1, ?)"#,
    )
    .bind(new_id())
    .bind(&config.admin_name)
    .bind(&config.admin_email)
    .bind(Role::Admin)
    .bind(password_hash)
    .bind(now)
    .execute(pool)
    .await?;

    Ok(())
}

async fn seed_services(pool: &SqlitePool) -> Result<(), sqlx::Error> {
    let catalog = [
        ("Haircut", 25.0),
        ("Beard Trim", 15.0),
        ("Hair Coloring", 60.0),
        ("Manicure", 20.0),
        ("Pedicure", 25.0),
        ("Facial", 40.0),
    ];

    for (name, price) in catalog {
        let exists =
            sqlx::query_as::<_, (String,)>("SELECT id FROM services WHERE name = ? LIMIT 1")
                .bind(name)
                .fetch_optional(pool)
                .await?;
        if exists.is_some() {
            continue;
        }
        sqlx::query("INSERT INTO services (id, name, price) VALUES (?, ?, ?)")
            .bind(new_id())
            .bind(name)
            .bind(price)
            .execute(pool)
            .await?;
    }

    Ok(())
}

/// Stores an in-app notification and publishes a `notification_created`
/// event for it. A post-commit side effect of a write that already succeeded,
/// so insert failures are logged and swallowed instead of failing the
/// request.
pub async fn notify_user(state: &AppState, user_id: &str, title: &str, body: &str) {
    let id = new_id();
    let inserted = sqlx::query(
        r#"INSERT INTO notifications (id, user_id, title, message, created_at, is_read)
           VALUES (?, ?, ?, ?, ?, 0)"#,
    )
    .bind(&id)
    .bind(user_id)
    .bind(title)
    .bind(body)
    .bind(Utc::now().to_rfc3339())
    .execute(&state.db)
    .await;
    if let Err(err) = inserted {
        log::warn!("Failed to store notification for user {user_id}: {err}");
        return;
    }

    state.publish(AppEvent::new(
        "notification_created",
        Some(user_id),
        Some(&id),
        title,
        body,
    ));
}

pub async fn fetch_user(pool: &SqlitePool, id: &str) -> Result<Option<UserRow>, sqlx::Error> {
    sqlx::query_as::<_, UserRow>(
        r#"SELECT id, full_name, phone, email, dob, role, password_hash, is_active, is_verified, created_at
           FROM users
           WHERE id = ?
           LIMIT 1"#,
    )
    .bind(id)
    .fetch_optional(pool)
    .await
}

pub async fn fetch_appointment(
    pool: &SqlitePool,
    id: &str,
) -> Result<Option<AppointmentRow>, sqlx::Error> {
    let sql = format!("{APPOINTMENT_SELECT} WHERE a.id = ? LIMIT 1");
    sqlx::query_as::<_, AppointmentRow>(&sql)
        .bind(id)
        .fetch_optional(pool)
        .await
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn memory_urls_need_no_directory() {
        assert!(ensure_sqlite_dir("sqlite::memory:").is_ok());
        assert!(ensure_sqlite_dir("sqlite://:memory:").is_ok());
        assert!(ensure_sqlite_dir("postgres://elsewhere").is_ok());
    }
}
