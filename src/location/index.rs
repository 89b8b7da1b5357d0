use actix_web::web;

use super::controller::{districts, neighborhoods, provinces};

pub fn location_routes(cfg: &mut web::ServiceConfig) {
    cfg.route("/provinces", web::get().to(provinces))
        .route("/districts/{province}", web::get().to(districts))
        .route(
            "/neighborhoods/{province}/{district}",
            web::get().to(neighborhoods),
        );
}
