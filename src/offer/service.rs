use std::collections::HashMap;
use std::sync::Arc;

use mongodb::bson::{self, oid::ObjectId};

use crate::listing::model::{Listing, ListingFilter, ListingStatus};
use crate::listing::store::ListingStore;
use crate::notification::model::NotificationKind;
use crate::notification::service::{NewNotification, NotificationService};
use crate::offer::model::{CreateOfferRequest, Decision, Offer, OfferDetailView, OfferStatus};
use crate::offer::store::{DUPLICATE_OFFER, OfferStore};
use crate::user::model::{ContactSummary, User};
use crate::user::store::UserStore;
use crate::utils::email::{new_offer_email, offer_accepted_email, offer_rejected_email};
use crate::utils::error::CustomError;
use crate::utils::helpers::{parse_id, required};

pub const OWN_LISTING: &str = "You cannot make an offer on your own listing";
pub const ALREADY_RESOLVED: &str = "Offer has already been resolved";
pub const LISTING_CLOSED: &str = "This listing is no longer active";

pub struct OfferService {
    offers: Arc<dyn OfferStore>,
    listings: Arc<dyn ListingStore>,
    users: Arc<dyn UserStore>,
    notifications: Arc<NotificationService>,
    frontend_url: String,
}

impl OfferService {
    pub fn new(
        offers: Arc<dyn OfferStore>,
        listings: Arc<dyn ListingStore>,
        users: Arc<dyn UserStore>,
        notifications: Arc<NotificationService>,
        frontend_url: String,
    ) -> Self {
        OfferService {
            offers,
            listings,
            users,
            notifications,
            frontend_url: frontend_url.trim_end_matches('/').to_string(),
        }
    }

    pub async fn create_offer(
        &self,
        offerer_id: &ObjectId,
        req: CreateOfferRequest,
    ) -> Result<Offer, CustomError> {
        let listing_id = required(&req.listing_id)
            .ok_or_else(|| CustomError::ValidationError("Listing id is required".into()))?;
        let listing_id = parse_id(&listing_id, "Listing")?;

        let listing = self
            .listings
            .find_listing(&listing_id)
            .await?
            .filter(|l| l.status == ListingStatus::Active)
            .ok_or_else(|| CustomError::NotFoundError("Listing not found".into()))?;

        if listing.owner_id == *offerer_id {
            return Err(CustomError::ConflictError(OWN_LISTING.into()));
        }

        // Fast path for the common case; the unique (listing, offerer) index
        // still rejects a concurrent duplicate at insert time.
        if self
            .offers
            .find_offer_by_pair(&listing.id, offerer_id)
            .await?
            .is_some()
        {
            return Err(CustomError::ConflictError(DUPLICATE_OFFER.into()));
        }

        let offerer = self.find_user(offerer_id).await?;

        let offer = self
            .offers
            .insert_offer(Offer {
                id: ObjectId::new(),
                listing_id: listing.id,
                offerer_id: *offerer_id,
                status: OfferStatus::Pending,
                created_at: bson::DateTime::now(),
                resolved_at: None,
            })
            .await?;

        // An accept or delete may have closed the listing, and swept its
        // offers, between the read above and this insert.
        if !self.still_open(&listing.id, &offer.id).await? {
            self.withdraw_late_offer(&offer, &listing.id).await;
            return Err(CustomError::NotFoundError("Listing not found".into()));
        }

        log::info!(
            "User {} made offer {} on listing {}",
            offerer_id,
            offer.id,
            listing.id
        );

        let offerer_name = offerer.full_name();
        self.notifications
            .notify_quietly(NewNotification {
                user_id: listing.owner_id,
                kind: NotificationKind::NewOffer,
                title: "New offer".into(),
                message: format!(
                    "{} made an offer on your listing \"{}\"",
                    offerer_name, listing.food_name
                ),
                related_id: Some(offer.id),
                email: Some(new_offer_email(
                    &offerer_name,
                    &listing.food_name,
                    &format!("{}/my-listings", self.frontend_url),
                )),
            })
            .await;

        Ok(offer)
    }

    async fn still_open(&self, listing_id: &ObjectId, offer_id: &ObjectId) -> Result<bool, CustomError> {
        Ok(self
            .listings
            .find_listing(listing_id)
            .await?
            .is_some_and(|l| {
                l.status == ListingStatus::Active || l.accepted_offer_id == Some(*offer_id)
            }))
    }

    async fn withdraw_late_offer(&self, offer: &Offer, listing_id: &ObjectId) {
        let outcome = match self.listings.find_listing(listing_id).await {
            // Deleted listing: its offers go with it.
            Ok(None) => self
                .offers
                .delete_offers_for_listings(&[*listing_id])
                .await
                .map(|_| ()),
            Ok(Some(_)) => self
                .offers
                .transition_offer(&offer.id, OfferStatus::Pending, OfferStatus::Rejected)
                .await
                .map(|_| ()),
            Err(e) => Err(e),
        };
        match outcome {
            Ok(()) => log::info!(
                "Withdrew offer {} made while listing {} was closing",
                offer.id,
                listing_id
            ),
            Err(e) => log::error!("Failed to withdraw late offer {}: {}", offer.id, e),
        }
    }

    /// Moves a pending offer to its terminal state. Only the owner of the
    /// listing may decide; anyone else sees the offer as missing. Each status
    /// flip is a compare-and-swap so concurrent calls fire at most once.
    pub async fn resolve_offer(
        &self,
        offer_id: &ObjectId,
        requester: &ObjectId,
        decision: Decision,
    ) -> Result<Offer, CustomError> {
        let offer = self
            .offers
            .find_offer(offer_id)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("Offer not found".into()))?;

        let listing = self
            .listings
            .find_listing(&offer.listing_id)
            .await?
            .filter(|l| l.owner_id == *requester)
            .ok_or_else(|| CustomError::NotFoundError("Offer not found".into()))?;

        if offer.status.is_terminal() {
            return Err(CustomError::ConflictError(ALREADY_RESOLVED.into()));
        }
        if decision == Decision::Accepted && listing.status != ListingStatus::Active {
            return Err(CustomError::ConflictError(LISTING_CLOSED.into()));
        }

        let resolved = self
            .offers
            .transition_offer(&offer.id, OfferStatus::Pending, decision.into())
            .await?
            .ok_or_else(|| CustomError::ConflictError(ALREADY_RESOLVED.into()))?;

        match decision {
            Decision::Accepted => self.complete_exchange(&resolved, &listing).await?,
            Decision::Rejected => self.announce_rejection(&resolved, &listing).await,
        }

        log::info!(
            "Offer {} on listing {} {}",
            resolved.id,
            listing.id,
            resolved.status.as_str()
        );
        Ok(resolved)
    }

    async fn complete_exchange(&self, accepted: &Offer, listing: &Listing) -> Result<(), CustomError> {
        if self
            .listings
            .complete_listing(&listing.id, &accepted.id)
            .await?
            .is_none()
        {
            // Another offer won the listing between our read and our write.
            match self
                .offers
                .transition_offer(&accepted.id, OfferStatus::Accepted, OfferStatus::Rejected)
                .await
            {
                Ok(Some(rolled_back)) => self.announce_rejection(&rolled_back, listing).await,
                Ok(None) => {}
                Err(e) => log::error!("Failed to roll back offer {}: {}", accepted.id, e),
            }
            return Err(CustomError::ConflictError(LISTING_CLOSED.into()));
        }

        let owner = self.users.find_user(&listing.owner_id).await?;
        let (owner_name, owner_phone, owner_email) = match &owner {
            Some(owner) => (owner.full_name(), owner.phone.clone(), owner.email.clone()),
            None => ("The owner".to_string(), String::new(), String::new()),
        };

        self.notifications
            .notify_quietly(NewNotification {
                user_id: accepted.offerer_id,
                kind: NotificationKind::OfferAccepted,
                title: "Offer accepted".into(),
                message: format!(
                    "Your offer on \"{}\" was accepted. Contact {} at {} ({}) to arrange the pickup.",
                    listing.food_name, owner_name, owner_phone, owner_email
                ),
                related_id: Some(accepted.id),
                email: Some(offer_accepted_email(
                    &listing.food_name,
                    &owner_phone,
                    &format!("{}/my-offers", self.frontend_url),
                )),
            })
            .await;

        // The listing is gone, so every other pending offer on it is declined.
        let siblings = self.offers.offers_for_listings(&[listing.id]).await?;
        for sibling in siblings
            .iter()
            .filter(|o| o.id != accepted.id && o.status == OfferStatus::Pending)
        {
            match self
                .offers
                .transition_offer(&sibling.id, OfferStatus::Pending, OfferStatus::Rejected)
                .await
            {
                Ok(Some(rejected)) => self.announce_rejection(&rejected, listing).await,
                Ok(None) => {}
                Err(e) => log::error!("Failed to auto-reject offer {}: {}", sibling.id, e),
            }
        }

        Ok(())
    }

    async fn announce_rejection(&self, rejected: &Offer, listing: &Listing) {
        self.notifications
            .notify_quietly(NewNotification {
                user_id: rejected.offerer_id,
                kind: NotificationKind::OfferRejected,
                title: "Offer rejected".into(),
                message: format!("Your offer on \"{}\" was not accepted.", listing.food_name),
                related_id: Some(rejected.id),
                email: Some(offer_rejected_email(
                    &listing.food_name,
                    &format!("{}/", self.frontend_url),
                )),
            })
            .await;
    }

    /// Offers the caller made, joined with each listing and its owner.
    pub async fn my_offers(&self, offerer_id: &ObjectId) -> Result<Vec<OfferDetailView>, CustomError> {
        let offers = self.offers.offers_by_offerer(offerer_id).await?;
        if offers.is_empty() {
            return Ok(Vec::new());
        }

        let listings = self
            .listings_by_id(offers.iter().map(|o| o.listing_id).collect())
            .await?;
        let owners = self
            .contacts_by_id(listings.values().map(|l| l.owner_id).collect())
            .await?;

        Ok(offers
            .iter()
            .filter_map(|offer| {
                let listing = listings.get(&offer.listing_id)?;
                let owner = owners.get(&listing.owner_id)?;
                Some(OfferDetailView::new(offer, listing, owner.clone()))
            })
            .collect())
    }

    /// Offers received on every listing the caller owns.
    pub async fn incoming_offers(&self, owner_id: &ObjectId) -> Result<Vec<OfferDetailView>, CustomError> {
        let listings = self
            .listings
            .list_listings(&ListingFilter {
                owner_ids: Some(vec![*owner_id]),
                ..Default::default()
            })
            .await?;
        self.offers_with_offerers(listings).await
    }

    /// Offers on one listing. Only its owner may look.
    pub async fn offers_for_listing(
        &self,
        listing_id: &ObjectId,
        owner_id: &ObjectId,
    ) -> Result<Vec<OfferDetailView>, CustomError> {
        let listing = self
            .listings
            .find_listing(listing_id)
            .await?
            .filter(|l| l.owner_id == *owner_id)
            .ok_or_else(|| CustomError::NotFoundError("Listing not found".into()))?;
        self.offers_with_offerers(vec![listing]).await
    }

    async fn offers_with_offerers(&self, listings: Vec<Listing>) -> Result<Vec<OfferDetailView>, CustomError> {
        if listings.is_empty() {
            return Ok(Vec::new());
        }
        let listing_ids: Vec<ObjectId> = listings.iter().map(|l| l.id).collect();
        let listings: HashMap<ObjectId, Listing> = listings.into_iter().map(|l| (l.id, l)).collect();

        let offers = self.offers.offers_for_listings(&listing_ids).await?;
        let offerers = self
            .contacts_by_id(offers.iter().map(|o| o.offerer_id).collect())
            .await?;

        Ok(offers
            .iter()
            .filter_map(|offer| {
                let listing = listings.get(&offer.listing_id)?;
                let offerer = offerers.get(&offer.offerer_id)?;
                Some(OfferDetailView::new(offer, listing, offerer.clone()))
            })
            .collect())
    }

    async fn listings_by_id(&self, mut ids: Vec<ObjectId>) -> Result<HashMap<ObjectId, Listing>, CustomError> {
        ids.sort();
        ids.dedup();
        let listings = self
            .listings
            .list_listings(&ListingFilter {
                ids: Some(ids),
                ..Default::default()
            })
            .await?;
        Ok(listings.into_iter().map(|l| (l.id, l)).collect())
    }

    async fn contacts_by_id(&self, mut ids: Vec<ObjectId>) -> Result<HashMap<ObjectId, ContactSummary>, CustomError> {
        ids.sort();
        ids.dedup();
        let users = self.users.find_users(&ids).await?;
        Ok(users
            .iter()
            .map(|u| (u.id, ContactSummary::from(u)))
            .collect())
    }

    async fn find_user(&self, id: &ObjectId) -> Result<User, CustomError> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("User not found".into()))
    }
}
