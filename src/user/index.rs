use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

use super::controller::{
    get_profile, login_user, register_user, resend_verification, save_push_token, update_address,
    verify_email, verify_email_link,
};
use crate::middleware::auth::verify_token;

pub fn user_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/register", web::post().to(register_user))
        .route("/login", web::post().to(login_user))
        .service(
            web::resource("/verify-email")
                .route(web::post().to(verify_email))
                .route(web::get().to(verify_email_link)),
        )
        .route("/resend-verification", web::post().to(resend_verification))
        .service(
            web::scope("/user")
                .wrap(HttpAuthentication::with_fn(verify_token))
                .route("/profile", web::get().to(get_profile))
                .route("/address", web::put().to(update_address))
                .route("/push-token", web::post().to(save_push_token)),
        );
}
