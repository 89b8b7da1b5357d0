use actix_web::{HttpResponse, web};
use serde_json::json;

use crate::middleware::auth::AuthUser;
use crate::offer::model::{CreateOfferRequest, Decision, OfferView, ResolveOfferRequest};
use crate::offer::service::OfferService;
use crate::utils::error::CustomError;
use crate::utils::helpers::parse_id;

pub async fn create_offer(
    offer_service: web::Data<OfferService>,
    user: AuthUser,
    body: web::Json<CreateOfferRequest>,
) -> Result<HttpResponse, CustomError> {
    let offer = offer_service.create_offer(&user.id, body.into_inner()).await?;
    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": "Offer sent",
        "offerId": offer.id.to_hex(),
    })))
}

fn parse_decision(status: Option<&str>) -> Result<Decision, CustomError> {
    match status.map(|s| s.trim().to_lowercase()).as_deref() {
        Some("accepted") | Some("accept") => Ok(Decision::Accepted),
        Some("rejected") | Some("reject") => Ok(Decision::Rejected),
        _ => Err(CustomError::ValidationError(
            "Status must be 'accepted' or 'rejected'".into(),
        )),
    }
}

async fn resolve(
    offer_service: &OfferService,
    user: &AuthUser,
    raw_id: &str,
    decision: Decision,
) -> Result<HttpResponse, CustomError> {
    let offer_id = parse_id(raw_id, "Offer")?;
    let offer = offer_service
        .resolve_offer(&offer_id, &user.id, decision)
        .await?;
    let message = match decision {
        Decision::Accepted => "Offer accepted",
        Decision::Rejected => "Offer rejected",
    };
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": message,
        "offer": OfferView::from(&offer),
    })))
}

pub async fn resolve_offer(
    offer_service: web::Data<OfferService>,
    user: AuthUser,
    path: web::Path<String>,
    body: web::Json<ResolveOfferRequest>,
) -> Result<HttpResponse, CustomError> {
    let decision = parse_decision(body.status.as_deref())?;
    resolve(&offer_service, &user, &path, decision).await
}

pub async fn accept_offer(
    offer_service: web::Data<OfferService>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    resolve(&offer_service, &user, &path, Decision::Accepted).await
}

pub async fn reject_offer(
    offer_service: web::Data<OfferService>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    resolve(&offer_service, &user, &path, Decision::Rejected).await
}

pub async fn my_offers(
    offer_service: web::Data<OfferService>,
    user: AuthUser,
) -> Result<HttpResponse, CustomError> {
    Ok(HttpResponse::Ok().json(offer_service.my_offers(&user.id).await?))
}

pub async fn incoming_offers(
    offer_service: web::Data<OfferService>,
    user: AuthUser,
) -> Result<HttpResponse, CustomError> {
    Ok(HttpResponse::Ok().json(offer_service.incoming_offers(&user.id).await?))
}

pub async fn listing_offers(
    offer_service: web::Data<OfferService>,
    user: AuthUser,
    path: web::Path<String>,
) -> Result<HttpResponse, CustomError> {
    let listing_id = parse_id(&path, "Listing")?;
    Ok(HttpResponse::Ok().json(
        offer_service
            .offers_for_listing(&listing_id, &user.id)
            .await?,
    ))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn decision_parsing() {
        assert_eq!(parse_decision(Some("accepted")).unwrap(), Decision::Accepted);
        assert_eq!(parse_decision(Some(" Reject ")).unwrap(), Decision::Rejected);
        assert!(parse_decision(Some("pending")).is_err());
        assert!(parse_decision(None).is_err());
    }
}
