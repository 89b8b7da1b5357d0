use actix_web::body::MessageBody;
use actix_web::dev::{ServiceFactory, ServiceRequest, ServiceResponse};
use actix_web::http::StatusCode;
use actix_web::middleware::ErrorHandlers;
use actix_web::{App, HttpResponse, Responder, web};
use serde_json::json;

use crate::admin::index::admin_routes;
use crate::listing::index::listing_routes;
use crate::location::index::location_routes;
use crate::middleware::error_handler::{json_config, path_config, query_config};
use crate::middleware::not_found::not_found;
use crate::notification::index::notification_routes;
use crate::offer::index::offer_routes;
use crate::state::AppServices;
use crate::user::index::user_routes;
use crate::utils::helpers::service_name;

async fn health() -> impl Responder {
    HttpResponse::Ok().json(json!({
        "status": "OK",
        "timestamp": chrono::Utc::now(),
        "service": service_name(),
    }))
}

pub fn routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/api")
            .route("/health", web::get().to(health))
            .configure(location_routes)
            .configure(user_routes)
            .configure(listing_routes)
            .configure(offer_routes)
            .configure(notification_routes)
            .configure(admin_routes),
    );
}

/// The application with every service, extractor config and route mounted.
/// Used by the server and by the HTTP tests.
pub fn app(
    services: AppServices,
) -> App<
    impl ServiceFactory<
        ServiceRequest,
        Config = (),
        Response = ServiceResponse<impl MessageBody>,
        Error = actix_web::Error,
        InitError = (),
    >,
> {
    App::new()
        .configure(|cfg| services.register(cfg))
        .app_data(json_config())
        .app_data(query_config())
        .app_data(path_config())
        .configure(routes)
        .wrap(ErrorHandlers::new().handler(StatusCode::NOT_FOUND, not_found))
}
