use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::admin::service::AdminService;
use crate::middleware::auth::AdminUser;
use crate::utils::error::CustomError;
use crate::utils::helpers::parse_id;

pub async fn list_users(
    admin_service: web::Data<AdminService>,
    _admin: AdminUser,
) -> Result<HttpResponse, CustomError> {
    Ok(HttpResponse::Ok().json(admin_service.list_users().await?))
}

pub async fn delete_user(
    admin_service: web::Data<AdminService>,
    admin: AdminUser,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let user_id = parse_id(&path, "User")?;
    let report = admin_service.delete_user(&user_id, &admin.0.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "User deleted",
        "deleted": report,
    })))
}

pub async fn cleanup_notifications(
    admin_service: web::Data<AdminService>,
    _admin: AdminUser,
) -> Result<HttpResponse, CustomError> {
    Ok(HttpResponse::Ok().json(admin_service.cleanup_notifications().await?))
}
