use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::options::ReturnDocument;
use mongodb::{Collection, Database};

use crate::database::StoreError;
use crate::offer::model::{Offer, OfferStatus};

pub const OFFERS_COLLECTION: &str = "exchange_offers";

pub const DUPLICATE_OFFER: &str = "You have already made an offer on this listing";

#[async_trait]
pub trait OfferStore: Send + Sync {
    /// Inserts an offer. Fails with `Duplicate` when the offerer already has
    /// an offer on the same listing.
    async fn insert_offer(&self, offer: Offer) -> Result<Offer, StoreError>;

    async fn find_offer(&self, id: &ObjectId) -> Result<Option<Offer>, StoreError>;

    async fn find_offer_by_pair(
        &self,
        listing_id: &ObjectId,
        offerer_id: &ObjectId,
    ) -> Result<Option<Offer>, StoreError>;

    /// Newest first.
    async fn offers_for_listings(&self, listing_ids: &[ObjectId]) -> Result<Vec<Offer>, StoreError>;

    /// Newest first.
    async fn offers_by_offerer(&self, offerer_id: &ObjectId) -> Result<Vec<Offer>, StoreError>;

    /// Compare-and-swap on the offer status. Returns the updated offer, or
    /// `None` when the offer is gone or its status is no longer `from`.
    async fn transition_offer(
        &self,
        id: &ObjectId,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<Option<Offer>, StoreError>;

    async fn delete_offers_for_listings(&self, listing_ids: &[ObjectId]) -> Result<u64, StoreError>;

    async fn delete_offers_by_offerer(&self, offerer_id: &ObjectId) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct MongoOfferStore {
    offers: Collection<Offer>,
}

impl MongoOfferStore {
    pub fn new(db: &Database) -> Self {
        MongoOfferStore {
            offers: db.collection::<Offer>(OFFERS_COLLECTION),
        }
    }
}

#[async_trait]
impl OfferStore for MongoOfferStore {
    async fn insert_offer(&self, offer: Offer) -> Result<Offer, StoreError> {
        self.offers
            .insert_one(&offer)
            .await
            .map_err(|e| StoreError::from_mongo(e, DUPLICATE_OFFER))?;
        Ok(offer)
    }

    async fn find_offer(&self, id: &ObjectId) -> Result<Option<Offer>, StoreError> {
        Ok(self.offers.find_one(doc! { "_id": *id }).await?)
    }

    async fn find_offer_by_pair(
        &self,
        listing_id: &ObjectId,
        offerer_id: &ObjectId,
    ) -> Result<Option<Offer>, StoreError> {
        Ok(self
            .offers
            .find_one(doc! { "listing_id": *listing_id, "offerer_id": *offerer_id })
            .await?)
    }

    async fn offers_for_listings(&self, listing_ids: &[ObjectId]) -> Result<Vec<Offer>, StoreError> {
        if listing_ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .offers
            .find(doc! { "listing_id": { "$in": listing_ids.to_vec() } })
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn offers_by_offerer(&self, offerer_id: &ObjectId) -> Result<Vec<Offer>, StoreError> {
        let cursor = self
            .offers
            .find(doc! { "offerer_id": *offerer_id })
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn transition_offer(
        &self,
        id: &ObjectId,
        from: OfferStatus,
        to: OfferStatus,
    ) -> Result<Option<Offer>, StoreError> {
        let updated = self
            .offers
            .find_one_and_update(
                doc! { "_id": *id, "status": from.as_str() },
                doc! { "$set": { "status": to.as_str(), "resolved_at": bson::DateTime::now() } },
            )
            .return_document(ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn delete_offers_for_listings(&self, listing_ids: &[ObjectId]) -> Result<u64, StoreError> {
        if listing_ids.is_empty() {
            return Ok(0);
        }
        let result = self
            .offers
            .delete_many(doc! { "listing_id": { "$in": listing_ids.to_vec() } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_offers_by_offerer(&self, offerer_id: &ObjectId) -> Result<u64, StoreError> {
        let result = self
            .offers
            .delete_many(doc! { "offerer_id": *offerer_id })
            .await?;
        Ok(result.deleted_count)
    }
}
