// src/handlers/notification.rs
use axum::{extract::{Path, State}, Extension, Json};

use crate::dtos::notification::NotificationResponse;
use crate::error::AppError;
use crate::middleware::auth::AuthContext;
use crate::models::notification::AdminNotification;
use crate::state::AppState;

// GET /admin/notifications - newest first, scoped to the calling admin
pub async fn list_notifications(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
) -> Result<Json<Vec<NotificationResponse>>, AppError> {
    let notifications = sqlx::query_as::<_, AdminNotification>(
        "SELECT id, admin_user_id, order_id, message, is_read, created_at
         FROM admin_notifications
         WHERE admin_user_id = $1
         ORDER BY created_at DESC",
    )
    .bind(auth.user_id)
    .fetch_all(&db_pool)
    .await?;

    Ok(Json(notifications.into_iter().map(NotificationResponse::from).collect()))
}

// PATCH /admin/notifications/:id
pub async fn mark_as_read(
    State(AppState { db_pool, .. }): State<AppState>,
    Extension(auth): Extension<AuthContext>,
    Path(id): Path<i64>,
) -> Result<Json<NotificationResponse>, AppError> {
    let notification = sqlx::query_as::<_, AdminNotification>(
        "UPDATE admin_notifications SET is_read = TRUE
         WHERE id = $1 AND admin_user_id = $2
         RETURNING id, admin_user_id, order_id, message, is_read, created_at",
    )
    .bind(id)
    .bind(auth.user_id)
    .fetch_optional(&db_pool)
    .await?
    .ok_or_else(|| AppError::not_found("Notification not found"))?;

    Ok(Json(NotificationResponse::from(notification)))
}
