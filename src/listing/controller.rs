use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::listing::model::{CreateListingRequest, ListingQuery, MyListingsQuery};
use crate::listing::service::ListingService;
use crate::middleware::auth::AuthUser;
use crate::utils::error::CustomError;
use crate::utils::helpers::parse_id;

pub async fn list_listings(
    listing_service: web::Data<ListingService>,
    query: web::Query<ListingQuery>,
) -> Result<HttpResponse, CustomError> {
    let listings = listing_service.list_active(query.into_inner()).await?;
    Ok(HttpResponse::Ok().json(listings))
}

pub async fn create_listing(
    listing_service: web::Data<ListingService>,
    user: AuthUser,
    body: web::Json<CreateListingRequest>,
) -> Result<HttpResponse, CustomError> {
    let listing = listing_service.create(&user.id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Listing created",
        "listingId": listing.id.to_hex(),
    })))
}

pub async fn delete_listing(
    listing_service: web::Data<ListingService>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let listing_id = parse_id(&path, "Listing")?;
    listing_service.delete(&listing_id, &user.id).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Listing deleted",
    })))
}

pub async fn my_listings(
    listing_service: web::Data<ListingService>,
    user: AuthUser,
    query: web::Query<MyListingsQuery>,
) -> Result<HttpResponse, CustomError> {
    let listings = listing_service
        .list_mine(&user.id, query.status.as_deref())
        .await?;
    Ok(HttpResponse::Ok().json(listings))
}
