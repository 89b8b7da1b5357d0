use actix_web::web;
use actix_web_httpauth::middleware::HttpAuthentication;

use super::controller::{
    accept_offer, create_offer, incoming_offers, listing_offers, my_offers, reject_offer,
    resolve_offer,
};
use crate::middleware::auth::verify_token;

pub fn offer_routes(cfg: &mut web::ServiceConfig) {
    cfg.service(
        web::scope("/offers")
            .wrap(HttpAuthentication::with_fn(verify_token))
            .route("", web::post().to(create_offer))
            .route("/{id}", web::put().to(resolve_offer))
            .route("/{id}/accept", web::put().to(accept_offer))
            .route("/{id}/reject", web::put().to(reject_offer)),
    )
    .service(
        web::scope("/listing-offers")
            .wrap(HttpAuthentication::with_fn(verify_token))
            .route("", web::get().to(incoming_offers))
            .route("/{listing_id}", web::get().to(listing_offers)),
    )
    .route("/my-offers", web::get().to(my_offers));
}
