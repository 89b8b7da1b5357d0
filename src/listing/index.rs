use actix_web::web;

use super::controller::{create_listing, delete_listing, list_listings, my_listings};

// Browsing is public, so these routes authenticate per handler through the
// `AuthUser` extractor instead of a scope-wide guard.
pub fn listing_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::resource("/listings")
            .route(web::get().to(list_listings))
            .route(web::post().to(create_listing)),
    )
    .route("/listings/{id}", web::delete().to(delete_listing))
    .route("/my-listings", web::get().to(my_listings));
}
