use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::listing::model::Listing;
use crate::user::model::ContactSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OfferStatus {
    Pending,
    Accepted,
    Rejected,
}

impl OfferStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OfferStatus::Pending => "pending",
            OfferStatus::Accepted => "accepted",
            OfferStatus::Rejected => "rejected",
        }
    }

    pub fn is_terminal(&self) -> bool {
        !matches!(self, OfferStatus::Pending)
    }
}

/// The owner's answer to a pending offer.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Decision {
    Accepted,
    Rejected,
}

impl From<Decision> for OfferStatus {
    fn from(decision: Decision) -> Self {
        match decision {
            Decision::Accepted => OfferStatus::Accepted,
            Decision::Rejected => OfferStatus::Rejected,
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Offer {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub listing_id: ObjectId,
    pub offerer_id: ObjectId,
    pub status: OfferStatus,
    pub created_at: bson::DateTime,
    #[serde(default)]
    pub resolved_at: Option<bson::DateTime>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateOfferRequest {
    pub listing_id: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResolveOfferRequest {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferView {
    pub id: String,
    pub listing_id: String,
    pub offerer_id: String,
    pub status: OfferStatus,
    pub created_at: DateTime<Utc>,
    pub resolved_at: Option<DateTime<Utc>>,
}

impl From<&Offer> for OfferView {
    fn from(offer: &Offer) -> Self {
        OfferView {
            id: offer.id.to_hex(),
            listing_id: offer.listing_id.to_hex(),
            offerer_id: offer.offerer_id.to_hex(),
            status: offer.status,
            created_at: offer.created_at.to_chrono(),
            resolved_at: offer.resolved_at.map(|at| at.to_chrono()),
        }
    }
}

/// An offer joined with the listing it targets and the other party's contact.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct OfferDetailView {
    #[serde(flatten)]
    pub offer: OfferView,
    pub food_name: String,
    pub quantity: u32,
    pub details: String,
    pub start_time: String,
    pub end_time: String,
    /// Listing owner for the offerer's view, offerer for the owner's view.
    pub counterpart: ContactSummary,
}

impl OfferDetailView {
    pub fn new(offer: &Offer, listing: &Listing, counterpart: ContactSummary) -> Self {
        OfferDetailView {
            offer: OfferView::from(offer),
            food_name: listing.food_name.clone(),
            quantity: listing.quantity,
            details: listing.details.clone(),
            start_time: listing.start_time.clone(),
            end_time: listing.end_time.clone(),
            counterpart,
        }
    }
}
