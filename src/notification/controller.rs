use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::middleware::auth::AuthUser;
use crate::notification::service::NotificationService;
use crate::utils::error::CustomError;
use crate::utils::helpers::parse_id;

pub async fn list_notifications(
    notification_service: web::Data<NotificationService>,
    user: AuthUser,
) -> Result<HttpResponse, CustomError> {
    let notifications = notification_service.list(&user.id).await?;
    Ok(HttpResponse::Ok().json(notifications))
}

pub async fn unread_count(
    notification_service: web::Data<NotificationService>,
    user: AuthUser,
) -> Result<HttpResponse, CustomError> {
    let count = notification_service.unread_count(&user.id).await?;
    Ok(HttpResponse::Ok().json(json!({ "count": count })))
}

pub async fn mark_read(
    notification_service: web::Data<NotificationService>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let id = parse_id(&path, "Notification")?;
    notification_service.mark_read(&id, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Notification marked as read",
    })))
}
