use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

use super::controller::{list_notifications, mark_read, unread_count};
use crate::middleware::auth::verify_token;

pub fn notification_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/notifications")
            .wrap(HttpAuthentication::with_fn(verify_token))
            .route("", web::get().to(list_notifications))
            .route("/unread-count", web::get().to(unread_count))
            .route("/{id}/read", web::put().to(mark_read)),
    );
}
