use chrono::{DateTime, NaiveTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::user::model::ContactSummary;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ListingStatus {
    Active,
    Completed,
}

impl ListingStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            ListingStatus::Active => "active",
            ListingStatus::Completed => "completed",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Listing {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub owner_id: ObjectId,
    pub food_name: String,
    pub quantity: u32,
    #[serde(default)]
    pub details: String,
    /// Time of day, `HH:MM`.
    pub start_time: String,
    /// Time of day, `HH:MM`; always later than `start_time`.
    pub end_time: String,
    pub status: ListingStatus,
    pub created_at: bson::DateTime,
    #[serde(default)]
    pub completed_at: Option<bson::DateTime>,
    #[serde(default)]
    pub accepted_offer_id: Option<ObjectId>,
}

/// Query over the listings collection. Empty filters match everything.
#[derive(Debug, Clone, Default)]
pub struct ListingFilter {
    pub ids: Option<Vec<ObjectId>>,
    pub status: Option<ListingStatus>,
    pub owner_ids: Option<Vec<ObjectId>>,
    pub skip: u64,
    pub limit: Option<i64>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct CreateListingRequest {
    pub food_name: Option<String>,
    /// Browsers submit number inputs as strings, so both forms are accepted.
    pub quantity: Option<serde_json::Value>,
    pub details: Option<String>,
    pub start_time: Option<String>,
    pub end_time: Option<String>,
}

/// Validated listing input.
#[derive(Debug, Clone)]
pub struct NewListing {
    pub food_name: String,
    pub quantity: u32,
    pub details: String,
    pub start_time: NaiveTime,
    pub end_time: NaiveTime,
}

#[derive(Debug, Deserialize)]
pub struct ListingQuery {
    pub province: Option<String>,
    pub district: Option<String>,
    pub page: Option<u64>,
    pub limit: Option<i64>,
}

#[derive(Debug, Deserialize)]
pub struct MyListingsQuery {
    pub status: Option<String>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ListingView {
    pub id: String,
    pub food_name: String,
    pub quantity: u32,
    pub details: String,
    pub start_time: String,
    pub end_time: String,
    pub status: ListingStatus,
    pub created_at: DateTime<Utc>,
    pub completed_at: Option<DateTime<Utc>>,
    pub accepted_offer_id: Option<String>,
    pub owner: ContactSummary,
}

impl ListingView {
    pub fn new(listing: &Listing, owner: ContactSummary) -> Self {
        ListingView {
            id: listing.id.to_hex(),
            food_name: listing.food_name.clone(),
            quantity: listing.quantity,
            details: listing.details.clone(),
            start_time: listing.start_time.clone(),
            end_time: listing.end_time.clone(),
            status: listing.status,
            created_at: listing.created_at.to_chrono(),
            completed_at: listing.completed_at.map(|at| at.to_chrono()),
            accepted_offer_id: listing.accepted_offer_id.map(|id| id.to_hex()),
            owner,
        }
    }
}
