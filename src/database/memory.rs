use std::collections::HashMap;
use std::sync::{Arc, Mutex, MutexGuard};

use async_trait::async_trait;
use mongodb::bson::{self, oid::ObjectId};

use crate::database::StoreError;
use crate::listing::model::{Listing, ListingFilter, ListingStatus};
use crate::listing::store::ListingStore;
use crate::notification::model::Notification;
use crate::notification::store::NotificationStore;
use crate::offer::model::{Offer, OfferStatus};
use crate::offer::store::{DUPLICATE_OFFER, OfferStore};
use crate::user::model::{Address, EmailVerification, User};
use crate::user::store::{UserStore, VerificationStore};

#[derive(Default)]
struct Collections {
    users: HashMap<ObjectId, User>,
    verifications: HashMap<ObjectId, EmailVerification>,
    listings: HashMap<ObjectId, Listing>,
    offers: HashMap<ObjectId, Offer>,
    notifications: HashMap<ObjectId, Notification>,
}

/// Implementation of every store trait that keeps documents in memory.
/// Useful for local runs without MongoDB and for tests. Uniqueness and
/// compare-and-swap semantics match the MongoDB stores because every
/// operation runs under a single lock.
#[derive(Clone, Default)]
pub struct MemoryStore {
    inner: Arc<Mutex<Collections>>,
}

impl MemoryStore {
    pub fn new() -> Self {
        MemoryStore::default()
    }

    fn lock(&self) -> Result<MutexGuard<'_, Collections>, StoreError> {
        self.inner
            .lock()
            .map_err(|_| StoreError::Backend("Cannot access memory store: mutex lock poisoned".into()))
    }
}

fn newest_first<T>(items: &mut [T], created_at: impl Fn(&T) -> bson::DateTime) {
    items.sort_by_key(|item| std::cmp::Reverse(created_at(item)));
}

#[async_trait]
impl UserStore for MemoryStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        let mut inner = self.lock()?;
        if inner
            .users
            .values()
            .any(|u| u.email == user.email || u.phone == user.phone)
        {
            return Err(StoreError::Duplicate(
                "This email address or phone number is already in use".into(),
            ));
        }
        inner.users.insert(user.id, user.clone());
        Ok(user)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.get(id).cloned())
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.lock()?.users.values().find(|u| u.email == email).cloned())
    }

    async fn contact_taken(&self, email: &str, phone: &str) -> Result<bool, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .any(|u| u.email == email || u.phone == phone))
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>, StoreError> {
        let inner = self.lock()?;
        Ok(ids.iter().filter_map(|id| inner.users.get(id).cloned()).collect())
    }

    async fn user_ids_in_area(
        &self,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Result<Vec<ObjectId>, StoreError> {
        Ok(self
            .lock()?
            .users
            .values()
            .filter(|u| province.is_none_or(|p| u.address.province == p))
            .filter(|u| district.is_none_or(|d| u.address.district == d))
            .map(|u| u.id)
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let mut users: Vec<User> = self.lock()?.users.values().cloned().collect();
        newest_first(&mut users, |u| u.created_at);
        Ok(users)
    }

    async fn mark_email_verified(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        Ok(match inner.users.get_mut(id) {
            Some(user) => {
                user.is_email_verified = true;
                user.updated_at = bson::DateTime::now();
                true
            }
            None => false,
        })
    }

    async fn update_address(&self, id: &ObjectId, address: &Address) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        Ok(match inner.users.get_mut(id) {
            Some(user) => {
                user.address = address.clone();
                user.updated_at = bson::DateTime::now();
                true
            }
            None => false,
        })
    }

    async fn set_push_token(&self, id: &ObjectId, token: &str) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        Ok(match inner.users.get_mut(id) {
            Some(user) => {
                user.push_token = Some(token.to_string());
                user.updated_at = bson::DateTime::now();
                true
            }
            None => false,
        })
    }

    async fn delete_user(&self, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.lock()?.users.remove(id).is_some())
    }
}

#[async_trait]
impl VerificationStore for MemoryStore {
    async fn insert_verification(&self, verification: EmailVerification) -> Result<(), StoreError> {
        let mut inner = self.lock()?;
        if inner
            .verifications
            .values()
            .any(|v| v.token == verification.token)
        {
            return Err(StoreError::Duplicate("Verification token collision".into()));
        }
        inner.verifications.insert(verification.id, verification);
        Ok(())
    }

    async fn find_verification(&self, token: &str) -> Result<Option<EmailVerification>, StoreError> {
        Ok(self
            .lock()?
            .verifications
            .values()
            .find(|v| v.token == token)
            .cloned())
    }

    async fn delete_verification(&self, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.lock()?.verifications.remove(id).is_some())
    }

    async fn delete_verifications_for_user(&self, user_id: &ObjectId) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.verifications.len();
        inner.verifications.retain(|_, v| v.user_id != *user_id);
        Ok((before - inner.verifications.len()) as u64)
    }
}

#[async_trait]
impl ListingStore for MemoryStore {
    async fn insert_listing(&self, listing: Listing) -> Result<Listing, StoreError> {
        self.lock()?.listings.insert(listing.id, listing.clone());
        Ok(listing)
    }

    async fn find_listing(&self, id: &ObjectId) -> Result<Option<Listing>, StoreError> {
        Ok(self.lock()?.listings.get(id).cloned())
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let mut listings: Vec<Listing> = self
            .lock()?
            .listings
            .values()
            .filter(|l| filter.ids.as_ref().is_none_or(|ids| ids.contains(&l.id)))
            .filter(|l| filter.status.is_none_or(|s| l.status == s))
            .filter(|l| {
                filter
                    .owner_ids
                    .as_ref()
                    .is_none_or(|ids| ids.contains(&l.owner_id))
            })
            .cloned()
            .collect();
        newest_first(&mut listings, |l| l.created_at);

        let limit = filter
            .limit
            .and_then(|l| usize::try_from(l).ok())
            .unwrap_or(usize::MAX);
        Ok(listings
            .into_iter()
            .skip(filter.skip as usize)
            .take(limit)
            .collect())
    }

    async fn complete_listing(
        &self,
        id: &ObjectId,
        accepted_offer_id: &ObjectId,
    ) -> Result<Option<Listing>, StoreError> {
        let mut inner = self.lock()?;
        Ok(match inner.listings.get_mut(id) {
            Some(listing) if listing.status == ListingStatus::Active => {
                listing.status = ListingStatus::Completed;
                listing.completed_at = Some(bson::DateTime::now());
                listing.accepted_offer_id = Some(*accepted_offer_id);
                Some(listing.clone())
            }
            _ => None,
        })
    }

    async fn delete_listing(&self, id: &ObjectId) -> Result<bool, StoreError> {
        Ok(self.lock()?.listings.remove(id).is_some())
    }

    async fn delete_listings_by_owner(&self, owner_id: &ObjectId) -> Result<Vec<ObjectId>, StoreError> {
        let mut inner = self.lock()?;
        let ids: Vec<ObjectId> = inner
            .listings
            .values()
            .filter(|l| l.owner_id == *owner_id)
            .map(|l| l.id)
            .collect();
        for id in &ids {
            inner.listings.remove(id);
        }
        Ok(ids)
    }
}

#[async_trait]
impl OfferStore for MemoryStore {
    async fn insert_offer(&self, offer: Offer) -> Result<Offer, StoreError> {
        let mut inner = self.lock()?;
        if inner
            .offers
            .values()
            .any(|o| o.listing_id == offer.listing_id && o.offerer_id == offer.offerer_id)
        {
            return Err(StoreError::Duplicate(DUPLICATE_OFFER.into()));
        }
        inner.offers.insert(offer.id, offer.clone());
        Ok(offer)
    }

    async fn find_offer(&self, id: &ObjectId) -> Result<Option<Offer>, StoreError> {
        Ok(self.lock()?.offers.get(id).cloned())
    }

    async fn find_offer_by_pair(
        &self,
        listing_id: &ObjectId,
        offerer_id: &ObjectId,
    ) -> Result<Option<Offer>, StoreError> {
        Ok(self
            .lock()?
            .offers
            .values()
            .find(|o| o.listing_id == *listing_id && o.offerer_id == *offerer_id)
            .cloned())
    }

    async fn offers_for_listings(&self, listing_ids: &[ObjectId]) -> Result<Vec<Offer>, StoreError> {
        let mut offers: Vec<Offer> = self
            .lock()?
            .offers
            .values()
            .filter(|o| listing_ids.contains(&o.listing_id))
            .cloned()
            .collect();
        newest_first(&mut offers, |o| o.created_at);
        Ok(offers)
    }

    async fn offers_by_offerer(&self, offerer_id: &ObjectId) -> Result<Vec<Offer>, StoreError> {
        let mut offers: Vec<Offer> = self
            .lock()?
            .offers
            .values()
            .filter(|o| o.offerer_id == *offerer_id)
            .cloned()
            .collect();
        newest_first(&mut offers, |o| o.created_at);
        Ok(offers)
    }

    async fn transition_offer(
        &self,
        id: &ObjectId,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<Option<Offer>, StoreError> {
        let mut inner = self.lock()?;
        Ok(match inner.offers.get_mut(id) {
            Some(offer) if offer.status == from => {
                offer.status = to;
                offer.resolved_at = Some(bson::DateTime::now());
                Some(offer.clone())
            }
            _ => None,
        })
    }

    async fn delete_offers_for_listings(&self, listing_ids: &[ObjectId]) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.offers.len();
        inner.offers.retain(|_, o| !listing_ids.contains(&o.listing_id));
        Ok((before - inner.offers.len()) as u64)
    }

    async fn delete_offers_by_offerer(&self, offerer_id: &ObjectId) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.offers.len();
        inner.offers.retain(|_, o| o.offerer_id != *offerer_id);
        Ok((before - inner.offers.len()) as u64)
    }
}

#[async_trait]
impl NotificationStore for MemoryStore {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification, StoreError> {
        self.lock()?
            .notifications
            .insert(notification.id, notification.clone());
        Ok(notification)
    }

    async fn notifications_for_user(
        &self,
        user_id: &ObjectId,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let mut notifications: Vec<Notification> = self
            .lock()?
            .notifications
            .values()
            .filter(|n| n.user_id == *user_id)
            .cloned()
            .collect();
        newest_first(&mut notifications, |n| n.created_at);
        notifications.truncate(usize::try_from(limit).unwrap_or(0));
        Ok(notifications)
    }

    async fn count_unread(&self, user_id: &ObjectId) -> Result<u64, StoreError> {
        Ok(self
            .lock()?
            .notifications
            .values()
            .filter(|n| n.user_id == *user_id && !n.is_read)
            .count() as u64)
    }

    async fn mark_read(&self, id: &ObjectId, user_id: &ObjectId) -> Result<bool, StoreError> {
        let mut inner = self.lock()?;
        Ok(match inner.notifications.get_mut(id) {
            Some(n) if n.user_id == *user_id => {
                n.is_read = true;
                true
            }
            _ => false,
        })
    }

    async fn delete_older_than(&self, cutoff: bson::DateTime) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.notifications.len();
        inner.notifications.retain(|_, n| n.created_at >= cutoff);
        Ok((before - inner.notifications.len()) as u64)
    }

    async fn delete_notifications_for_user(&self, user_id: &ObjectId) -> Result<u64, StoreError> {
        let mut inner = self.lock()?;
        let before = inner.notifications.len();
        inner.notifications.retain(|_, n| n.user_id != *user_id);
        Ok((before - inner.notifications.len()) as u64)
    }
}
