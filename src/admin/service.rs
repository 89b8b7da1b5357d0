use std::sync::Arc;

use chrono::Duration;
use mongodb::bson::oid::ObjectId;
use serde::Serialize;

use crate::listing::store::ListingStore;
use crate::notification::model::CleanupReport;
use crate::notification::service::NotificationService;
use crate::notification::store::NotificationStore;
use crate::offer::store::OfferStore;
use crate::user::model::UserProfile;
use crate::user::store::{UserStore, VerificationStore};
use crate::utils::error::CustomError;

/// What an account deletion removed along with the user.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct DeletionReport {
    pub deleted_listings: usize,
    pub deleted_offers: u64,
    pub deleted_notifications: u64,
}

pub struct AdminService {
    users: Arc<dyn UserStore>,
    verifications: Arc<dyn VerificationStore>,
    listings: Arc<dyn ListingStore>,
    offers: Arc<dyn OfferStore>,
    notification_records: Arc<dyn NotificationStore>,
    notifications: Arc<NotificationService>,
    retention: Duration,
}

impl AdminService {
    pub fn new(
        users: Arc<dyn UserStore>,
        verifications: Arc<dyn VerificationStore>,
        listings: Arc<dyn ListingStore>,
        offers: Arc<dyn OfferStore>,
        notification_records: Arc<dyn NotificationStore>,
        notifications: Arc<NotificationService>,
        retention: Duration,
    ) -> Self {
        AdminService {
            users,
            verifications,
            listings,
            offers,
            notification_records,
            notifications,
            retention,
        }
    }

    pub async fn list_users(&self) -> Result<Vec<UserProfile>, CustomError> {
        let users = self.users.list_users().await?;
        Ok(users.iter().map(UserProfile::from).collect())
    }

    /// Removes a user and everything hanging off the account: their
    /// listings and the offers on them, their own offers, notifications and
    /// pending verification records.
    pub async fn delete_user(
        &self,
        target: &ObjectId,
        admin_id: &ObjectId,
    ) -> Result<DeletionReport, CustomError> {
        if target == admin_id {
            return Err(CustomError::BadRequestError(
                "You cannot delete your own account".into(),
            ));
        }
        if self.users.find_user(target).await?.is_none() {
            return Err(CustomError::NotFoundError("User not found".into()));
        }

        let listing_ids = self.listings.delete_listings_by_owner(target).await?;
        let mut deleted_offers = 0;
        if !listing_ids.is_empty() {
            deleted_offers += self.offers.delete_offers_for_listings(&listing_ids).await?;
        }
        deleted_offers += self.offers.delete_offers_by_offerer(target).await?;
        let deleted_notifications = self
            .notification_records
            .delete_notifications_for_user(target)
            .await?;
        self.verifications.delete_verifications_for_user(target).await?;
        self.users.delete_user(target).await?;

        log::info!(
            "Admin {} deleted user {} ({} listings, {} offers, {} notifications)",
            admin_id,
            target,
            listing_ids.len(),
            deleted_offers,
            deleted_notifications
        );

        Ok(DeletionReport {
            deleted_listings: listing_ids.len(),
            deleted_offers,
            deleted_notifications,
        })
    }

    pub async fn cleanup_notifications(&self) -> Result<CleanupReport, CustomError> {
        self.notifications.cleanup(self.retention).await
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::listing::model::{Listing, ListingStatus};
    use crate::notification::dispatcher::DeliveryQueue;
    use crate::offer::model::{Offer, OfferStatus};
    use crate::test_support::sample_user;
    use crate::user::model::Role;
    use mongodb::bson;

    fn service(store: &MemoryStore) -> AdminService {
        let (queue, _rx) = DeliveryQueue::new(8);
        let notifications = Arc::new(NotificationService::new(Arc::new(store.clone()), queue));
        AdminService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            notifications,
            Duration::hours(24),
        )
    }

    fn listing(owner_id: ObjectId) -> Listing {
        Listing {
            id: ObjectId::new(),
            owner_id,
            food_name: "Pilaf".into(),
            quantity: 2,
            details: String::new(),
            start_time: "10:00".into(),
            end_time: "11:00".into(),
            status: ListingStatus::Active,
            created_at: bson::DateTime::now(),
            completed_at: None,
            accepted_offer_id: None,
        }
    }

    fn offer(listing_id: ObjectId, offerer_id: ObjectId) -> Offer {
        Offer {
            id: ObjectId::new(),
            listing_id,
            offerer_id,
            status: OfferStatus::Pending,
            created_at: bson::DateTime::now(),
            resolved_at: None,
        }
    }

    #[actix_web::test]
    async fn deleting_a_user_cascades() {
        let store = MemoryStore::new();
        let admin = service(&store);
        let ada = sample_user("ada@example.com", "5550001", Role::Cook);
        let bob = sample_user("bob@example.com", "5550002", Role::Waiter);
        store.insert_user(ada.clone()).await.unwrap();
        store.insert_user(bob.clone()).await.unwrap();

        let ada_listing = store.insert_listing(listing(ada.id)).await.unwrap();
        let bob_listing = store.insert_listing(listing(bob.id)).await.unwrap();
        store.insert_offer(offer(ada_listing.id, bob.id)).await.unwrap();
        store.insert_offer(offer(bob_listing.id, ada.id)).await.unwrap();

        let report = admin.delete_user(&ada.id, &ObjectId::new()).await.unwrap();
        assert_eq!(report.deleted_listings, 1);
        assert_eq!(report.deleted_offers, 2);

        assert!(store.find_user(&ada.id).await.unwrap().is_none());
        assert!(store.find_listing(&ada_listing.id).await.unwrap().is_none());
        assert!(store.find_listing(&bob_listing.id).await.unwrap().is_some());
        assert!(store.offers_by_offerer(&bob.id).await.unwrap().is_empty());
    }

    #[actix_web::test]
    async fn admin_cannot_delete_self() {
        let store = MemoryStore::new();
        let root = sample_user("root@example.com", "admin:root", Role::Admin);
        store.insert_user(root.clone()).await.unwrap();

        let err = service(&store).delete_user(&root.id, &root.id).await.unwrap_err();
        assert!(matches!(err, CustomError::BadRequestError(_)));
    }
}
