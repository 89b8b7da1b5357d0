use std::collections::HashMap;
use std::sync::Arc;

use chrono::NaiveTime;
use mongodb::bson::{self, oid::ObjectId};
use serde_json::Value;

use crate::listing::model::{
    CreateListingRequest, Listing, ListingFilter, ListingQuery, ListingStatus, ListingView,
    NewListing,
};
use crate::listing::store::ListingStore;
use crate::offer::store::OfferStore;
use crate::user::model::ContactSummary;
use crate::user::store::UserStore;
use crate::utils::error::CustomError;
use crate::utils::helpers::required;

pub const DEFAULT_PAGE_SIZE: i64 = 20;
pub const MAX_PAGE_SIZE: i64 = 100;

const TIME_FORMAT: &str = "%H:%M";

pub struct ListingService {
    listings: Arc<dyn ListingStore>,
    offers: Arc<dyn OfferStore>,
    users: Arc<dyn UserStore>,
}

impl ListingService {
    pub fn new(
        listings: Arc<dyn ListingStore>,
        offers: Arc<dyn OfferStore>,
        users: Arc<dyn UserStore>,
    ) -> Self {
        ListingService {
            listings,
            offers,
            users,
        }
    }

    pub async fn create(
        &self,
        owner_id: &ObjectId,
        req: CreateListingRequest,
    ) -> Result<Listing, CustomError> {
        let new = validate_listing(req)?;

        if self.users.find_user(owner_id).await?.is_none() {
            return Err(CustomError::NotFoundError("User not found".into()));
        }

        let listing = self
            .listings
            .insert_listing(Listing {
                id: ObjectId::new(),
                owner_id: *owner_id,
                food_name: new.food_name,
                quantity: new.quantity,
                details: new.details,
                start_time: new.start_time.format(TIME_FORMAT).to_string(),
                end_time: new.end_time.format(TIME_FORMAT).to_string(),
                status: ListingStatus::Active,
                created_at: bson::DateTime::now(),
                completed_at: None,
                accepted_offer_id: None,
            })
            .await?;

        log::info!("User {} created listing {}", owner_id, listing.id);
        Ok(listing)
    }

    /// Active listings, newest first, optionally narrowed to owners living in
    /// a province and district.
    pub async fn list_active(&self, query: ListingQuery) -> Result<Vec<ListingView>, CustomError> {
        let limit = query
            .limit
            .unwrap_or(DEFAULT_PAGE_SIZE)
            .clamp(1, MAX_PAGE_SIZE);
        let page = query.page.unwrap_or(1).max(1);

        let province = required(&query.province);
        let district = required(&query.district);
        let owner_ids = if province.is_some() || district.is_some() {
            let ids = self
                .users
                .user_ids_in_area(province.as_deref(), district.as_deref())
                .await?;
            if ids.is_empty() {
                return Ok(Vec::new());
            }
            Some(ids)
        } else {
            None
        };

        let listings = self
            .listings
            .list_listings(&ListingFilter {
                ids: None,
                status: Some(ListingStatus::Active),
                owner_ids,
                skip: (page - 1).saturating_mul(limit as u64),
                limit: Some(limit),
            })
            .await?;

        self.attach_owners(listings).await
    }

    /// The caller's own listings. `status` is `active`, `completed` or `all`.
    pub async fn list_mine(
        &self,
        owner_id: &ObjectId,
        status: Option<&str>,
    ) -> Result<Vec<ListingView>, CustomError> {
        let status = match status.map(str::trim) {
            None | Some("") | Some("all") => None,
            Some("active") => Some(ListingStatus::Active),
            Some("completed") => Some(ListingStatus::Completed),
            Some(other) => {
                return Err(CustomError::ValidationError(format!(
                    "Unknown listing status: {}",
                    other
                )));
            }
        };

        let listings = self
            .listings
            .list_listings(&ListingFilter {
                status,
                owner_ids: Some(vec![*owner_id]),
                ..Default::default()
            })
            .await?;

        self.attach_owners(listings).await
    }

    /// Deletes a listing together with every offer made on it. Listings of
    /// other users are reported as missing.
    pub async fn delete(&self, listing_id: &ObjectId, requester: &ObjectId) -> Result<(), CustomError> {
        let listing = self
            .listings
            .find_listing(listing_id)
            .await?
            .filter(|l| l.owner_id == *requester)
            .ok_or_else(|| CustomError::NotFoundError("Listing not found".into()))?;

        let removed_offers = self.offers.delete_offers_for_listings(&[listing.id]).await?;
        self.listings.delete_listing(&listing.id).await?;

        log::info!(
            "User {} deleted listing {} and {} offers",
            requester,
            listing.id,
            removed_offers
        );
        Ok(())
    }

    /// Joins owner contact details onto listings with a single batched
    /// lookup. Listings whose owner no longer exists are dropped.
    async fn attach_owners(&self, listings: Vec<Listing>) -> Result<Vec<ListingView>, CustomError> {
        let mut owner_ids: Vec<ObjectId> = listings.iter().map(|l| l.owner_id).collect();
        owner_ids.sort();
        owner_ids.dedup();

        let owners: HashMap<ObjectId, ContactSummary> = self
            .users
            .find_users(&owner_ids)
            .await?
            .iter()
            .map(|u| (u.id, ContactSummary::from(u)))
            .collect();

        Ok(listings
            .iter()
            .filter_map(|listing| {
                let owner = owners.get(&listing.owner_id)?;
                Some(ListingView::new(listing, owner.clone()))
            })
            .collect())
    }
}

fn validate_listing(req: CreateListingRequest) -> Result<NewListing, CustomError> {
    let (Some(food_name), Some(quantity), Some(start_time), Some(end_time)) = (
        required(&req.food_name),
        req.quantity.filter(|q| !q.is_null()),
        required(&req.start_time),
        required(&req.end_time),
    ) else {
        return Err(CustomError::ValidationError(
            "Food name, quantity, start time and end time are required".into(),
        ));
    };

    let quantity = parse_quantity(&quantity)?;
    let start_time = parse_time(&start_time)?;
    let end_time = parse_time(&end_time)?;

    // Windows never wrap past midnight.
    if end_time <= start_time {
        return Err(CustomError::ValidationError(
            "End time must be later than start time".into(),
        ));
    }

    Ok(NewListing {
        food_name,
        quantity,
        details: required(&req.details).unwrap_or_default(),
        start_time,
        end_time,
    })
}

fn parse_quantity(value: &Value) -> Result<u32, CustomError> {
    let parsed = match value {
        Value::Number(n) => n.as_u64().and_then(|q| u32::try_from(q).ok()),
        Value::String(s) => s.trim().parse::<u32>().ok(),
        _ => None,
    };

    match parsed {
        Some(q) if q > 0 => Ok(q),
        _ => Err(CustomError::ValidationError(
            "Quantity must be a positive integer".into(),
        )),
    }
}

fn parse_time(value: &str) -> Result<NaiveTime, CustomError> {
    NaiveTime::parse_from_str(value, TIME_FORMAT)
        .or_else(|_| NaiveTime::parse_from_str(value, "%H:%M:%S"))
        .map_err(|_| {
            CustomError::ValidationError(format!("Invalid time '{}', expected HH:MM", value))
        })
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::offer::model::{Offer, OfferStatus};
    use crate::test_support::sample_user;
    use crate::user::model::Role;
    use serde_json::json;

    fn request(quantity: Value, start: &str, end: &str) -> CreateListingRequest {
        CreateListingRequest {
            food_name: Some("Lentil soup".into()),
            quantity: Some(quantity),
            details: None,
            start_time: Some(start.into()),
            end_time: Some(end.into()),
        }
    }

    fn service(store: &MemoryStore) -> ListingService {
        ListingService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
        )
    }

    #[test]
    fn end_must_follow_start() {
        assert!(validate_listing(request(json!(3), "12:00", "13:00")).is_ok());
        for (start, end) in [("13:00", "13:00"), ("23:00", "01:00"), ("12:30", "12:29")] {
            let err = validate_listing(request(json!(3), start, end)).unwrap_err();
            assert!(matches!(err, CustomError::ValidationError(_)), "{start}-{end}");
        }
    }

    #[test]
    fn quantity_accepts_numbers_and_numeric_strings() {
        assert_eq!(parse_quantity(&json!(3)).unwrap(), 3);
        assert_eq!(parse_quantity(&json!(" 7 ")).unwrap(), 7);
        for bad in [json!(0), json!(-2), json!(1.5), json!("lots"), json!(true)] {
            assert!(parse_quantity(&bad).is_err(), "{bad}");
        }
    }

    #[test]
    fn times_are_normalized() {
        let listing = validate_listing(request(json!(1), "09:05:00", "09:30")).unwrap();
        assert_eq!(listing.start_time.format(TIME_FORMAT).to_string(), "09:05");
        assert_eq!(listing.end_time.format(TIME_FORMAT).to_string(), "09:30");
    }

    #[actix_web::test]
    async fn area_filter_and_owner_join() {
        let store = MemoryStore::new();
        let listings = service(&store);
        let ada = sample_user("ada@example.com", "5550001", Role::Cook);
        let mut bob = sample_user("bob@example.com", "5550002", Role::Waiter);
        bob.address.district = "Kadikoy".into();
        store.insert_user(ada.clone()).await.unwrap();
        store.insert_user(bob.clone()).await.unwrap();

        listings.create(&ada.id, request(json!(3), "12:00", "13:00")).await.unwrap();
        listings.create(&bob.id, request(json!(2), "18:00", "19:00")).await.unwrap();

        let all = listings
            .list_active(ListingQuery { province: None, district: None, page: None, limit: None })
            .await
            .unwrap();
        assert_eq!(all.len(), 2);

        let kadikoy = listings
            .list_active(ListingQuery {
                province: Some(bob.address.province.clone()),
                district: Some("Kadikoy".into()),
                page: None,
                limit: None,
            })
            .await
            .unwrap();
        assert_eq!(kadikoy.len(), 1);
        assert_eq!(kadikoy[0].owner.phone, "5550002");

        let nowhere = listings
            .list_active(ListingQuery {
                province: Some("Nowhere".into()),
                district: None,
                page: None,
                limit: None,
            })
            .await
            .unwrap();
        assert!(nowhere.is_empty());
    }

    #[actix_web::test]
    async fn pagination_limits_results() {
        let store = MemoryStore::new();
        let listings = service(&store);
        let ada = sample_user("ada@example.com", "5550001", Role::Cook);
        store.insert_user(ada.clone()).await.unwrap();
        for _ in 0..5 {
            listings.create(&ada.id, request(json!(1), "12:00", "13:00")).await.unwrap();
        }

        let page = |page, limit| ListingQuery { province: None, district: None, page: Some(page), limit: Some(limit) };
        assert_eq!(listings.list_active(page(1, 2)).await.unwrap().len(), 2);
        assert_eq!(listings.list_active(page(3, 2)).await.unwrap().len(), 1);
        assert_eq!(listings.list_active(page(4, 2)).await.unwrap().len(), 0);
    }

    #[actix_web::test]
    async fn delete_cascades_offers_and_hides_listing() {
        let store = MemoryStore::new();
        let listings = service(&store);
        let ada = sample_user("ada@example.com", "5550001", Role::Cook);
        store.insert_user(ada.clone()).await.unwrap();
        let listing = listings
            .create(&ada.id, request(json!(3), "12:00", "13:00"))
            .await
            .unwrap();

        for _ in 0..2 {
            store
                .insert_offer(Offer {
                    id: ObjectId::new(),
                    listing_id: listing.id,
                    offerer_id: ObjectId::new(),
                    status: OfferStatus::Pending,
                    created_at: bson::DateTime::now(),
                    resolved_at: None,
                })
                .await
                .unwrap();
        }

        let stranger = ObjectId::new();
        let err = listings.delete(&listing.id, &stranger).await.unwrap_err();
        assert!(matches!(err, CustomError::NotFoundError(_)));

        listings.delete(&listing.id, &ada.id).await.unwrap();
        assert!(store.offers_for_listings(&[listing.id]).await.unwrap().is_empty());
        let active = listings
            .list_active(ListingQuery { province: None, district: None, page: None, limit: None })
            .await
            .unwrap();
        assert!(active.is_empty());
    }

    #[actix_web::test]
    async fn my_listings_filter_by_status() {
        let store = MemoryStore::new();
        let listings = service(&store);
        let ada = sample_user("ada@example.com", "5550001", Role::Cook);
        store.insert_user(ada.clone()).await.unwrap();
        let first = listings.create(&ada.id, request(json!(1), "12:00", "13:00")).await.unwrap();
        listings.create(&ada.id, request(json!(1), "14:00", "15:00")).await.unwrap();
        store.complete_listing(&first.id, &ObjectId::new()).await.unwrap();

        assert_eq!(listings.list_mine(&ada.id, None).await.unwrap().len(), 2);
        assert_eq!(listings.list_mine(&ada.id, Some("completed")).await.unwrap().len(), 1);
        assert_eq!(listings.list_mine(&ada.id, Some("active")).await.unwrap().len(), 1);
        assert!(listings.list_mine(&ada.id, Some("archived")).await.is_err());
    }
}
