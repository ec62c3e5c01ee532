use std::fmt;
use std::str::FromStr;

use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum Role {
    Admin,
    Staff,
    Client,
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            Role::Admin => "admin",
            Role::Staff => "staff",
            Role::Client => "client",
        };
        f.write_str(name)
    }
}

impl FromStr for Role {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "admin" => Ok(Role::Admin),
            "staff" => Ok(Role::Staff),
            "client" => Ok(Role::Client),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, sqlx::Type)]
#[serde(rename_all = "lowercase")]
#[sqlx(rename_all = "lowercase")]
pub enum AppointmentStatus {
    Pending,
    Confirmed,
    Completed,
    Cancelled,
}

impl fmt::Display for AppointmentStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            AppointmentStatus::Pending => "pending",
            AppointmentStatus::Confirmed => "confirmed",
            AppointmentStatus::Completed => "completed",
            AppointmentStatus::Cancelled => "cancelled",
        };
        f.write_str(name)
    }
}

impl FromStr for AppointmentStatus {
    type Err = ();

    fn from_str(value: &str) -> Result<Self, Self::Err> {
        match value {
            "pending" => Ok(AppointmentStatus::Pending),
            "confirmed" => Ok(AppointmentStatus::Confirmed),
            "completed" => Ok(AppointmentStatus::Completed),
            "cancelled" => Ok(AppointmentStatus::Cancelled),
            _ => Err(()),
        }
    }
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct UserRow {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub dob: Option<String>,
    pub role: Role,
    pub password_hash: String,
    pub is_active: i64,
    pub is_verified: i64,
    pub created_at: String,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ServiceRow {
    pub id: String,
    pub name: String,
    pub price: f64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct AppointmentRow {
    pub id: String,
    pub client_id: String,
    pub staff_id: String,
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub price: f64,
    pub created_at: String,
    pub client_name: Option<String>,
    pub staff_name: Option<String>,
    pub service_name: Option<String>,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct MessageRow {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub sent_at: String,
    pub is_read: i64,
}

#[derive(Debug, Clone, sqlx::FromRow)]
pub struct NotificationRow {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub created_at: String,
    pub is_read: i64,
}

/// One row of the conversation list: the latest message exchanged with
/// `partner_id` plus the caller's unread backlog for that pair.
#[derive(Debug, Clone, sqlx::FromRow)]
pub struct ConversationRow {
    pub partner_id: String,
    pub partner_name: String,
    pub message_id: String,
    pub sender_id: String,
    pub message: String,
    pub sent_at: String,
    pub is_read: i64,
    pub unread_count: i64,
}

#[derive(Debug, Clone, Serialize)]
pub struct UserDto {
    pub id: String,
    pub full_name: String,
    pub phone: String,
    pub email: String,
    pub dob: Option<String>,
    pub role: Role,
    pub is_active: bool,
    pub is_verified: bool,
    pub created_at: String,
}

impl From<UserRow> for UserDto {
    fn from(row: UserRow) -> Self {
        UserDto {
            id: row.id,
            full_name: row.full_name,
            phone: row.phone,
            email: row.email,
            dob: row.dob,
            role: row.role,
            is_active: row.is_active == 1,
            is_verified: row.is_verified == 1,
            created_at: row.created_at,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ServiceDto {
    pub id: String,
    pub name: String,
    pub price: f64,
}

impl From<ServiceRow> for ServiceDto {
    fn from(row: ServiceRow) -> Self {
        ServiceDto {
            id: row.id,
            name: row.name,
            price: row.price,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct AppointmentDto {
    pub id: String,
    pub client_id: String,
    pub staff_id: String,
    pub service_id: String,
    pub date: String,
    pub time: String,
    pub status: AppointmentStatus,
    pub price: f64,
    pub created_at: String,
    pub client_name: String,
    pub staff_name: String,
    pub service_name: String,
}

impl From<AppointmentRow> for AppointmentDto {
    fn from(row: AppointmentRow) -> Self {
        AppointmentDto {
            id: row.id,
            client_id: row.client_id,
            staff_id: row.staff_id,
            service_id: row.service_id,
            date: row.date,
            time: row.time,
            status: row.status,
            price: row.price,
            created_at: row.created_at,
            client_name: row.client_name.unwrap_or_default(),
            staff_name: row.staff_name.unwrap_or_default(),
            service_name: row.service_name.unwrap_or_default(),
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct MessageDto {
    pub id: String,
    pub sender_id: String,
    pub receiver_id: String,
    pub message: String,
    pub sent_at: String,
    pub is_read: bool,
}

impl From<MessageRow> for MessageDto {
    fn from(row: MessageRow) -> Self {
        MessageDto {
            id: row.id,
            sender_id: row.sender_id,
            receiver_id: row.receiver_id,
            message: row.message,
            sent_at: row.sent_at,
            is_read: row.is_read == 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct NotificationDto {
    pub id: String,
    pub user_id: String,
    pub title: String,
    pub message: String,
    pub created_at: String,
    pub is_read: bool,
}

impl From<NotificationRow> for NotificationDto {
    fn from(row: NotificationRow) -> Self {
        NotificationDto {
            id: row.id,
            user_id: row.user_id,
            title: row.title,
            message: row.message,
            created_at: row.created_at,
            is_read: row.is_read == 1,
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct ConversationDto {
    pub partner_id: String,
    pub partner_name: String,
    pub message_id: String,
    pub sender_id: String,
    pub message: String,
    pub sent_at: String,
    pub is_read: bool,
    pub unread_count: i64,
}

impl From<ConversationRow> for ConversationDto {
    fn from(row: ConversationRow) -> Self {
        ConversationDto {
            partner_id: row.partner_id,
            partner_name: row.partner_name,
            message_id: row.message_id,
            sender_id: row.sender_id,
            message: row.message,
            sent_at: row.sent_at,
            is_read: row.is_read == 1,
            unread_count: row.unread_count,
        }
    }
}
