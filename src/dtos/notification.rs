// src/dtos/notification.rs
use serde::Serialize;
use chrono::{DateTime, Utc};

#[derive(Debug, Serialize)]
pub struct NotificationResponse {
    pub id: i64,
    pub admin_user_id: i64,
    pub order_id: Option<i64>,
    pub message: String,
    pub is_read: bool,
    pub created_at: DateTime<Utc>,
}

impl From<crate::models::notification::AdminNotification> for NotificationResponse {
    fn from(n: crate::models::notification::AdminNotification) -> Self {
        Self {
            id: n.id,
            admin_user_id: n.admin_user_id,
            order_id: n.order_id,
            message: n.message,
            is_read: n.is_read,
            created_at: n.created_at,
        }
    }
}
