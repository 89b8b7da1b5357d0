use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

use super::controller::{cleanup_notifications, delete_user, list_users};
use crate::middleware::auth::verify_token;

// The token check runs for the whole scope; each handler also demands the
// admin role through the `AdminUser` extractor.
pub fn admin_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/admin")
            .wrap(HttpAuthentication::with_fn(verify_token))
            .route("/users", web::get().to(list_users))
            .route("/users/{id}", web::delete().to(delete_user))
            .route("/notifications/cleanup", web::post().to(cleanup_notifications)),
    );
}
