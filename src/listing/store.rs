use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document, doc, oid::ObjectId};
use mongodb::{Collection, Database};

use crate::database::StoreError;
use crate::listing::model::{Listing, ListingFilter, ListingStatus};

pub const LISTINGS_COLLECTION: &str = "food_listings";

#[async_trait]
pub trait ListingStore: Send + Sync {
    async fn insert_listing(&self, listing: Listing) -> Result<Listing, StoreError>;

    async fn find_listing(&self, id: &ObjectId) -> Result<Option<Listing>, StoreError>;

    /// Newest first, honouring `filter.skip`/`filter.limit`.
    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError>;

    /// Flips an `active` listing to `completed`, recording the accepted offer.
    /// Returns `None` when the listing is missing or no longer active.
    async fn complete_listing(
        &self,
        id: &ObjectId,
        accepted_offer_id: &ObjectId,
    ) -> Result<Option<Listing>, StoreError>;

    async fn delete_listing(&self, id: &ObjectId) -> Result<bool, StoreError>;

    /// Deletes every listing of `owner_id`, returning the removed ids.
    async fn delete_listings_by_owner(&self, owner_id: &ObjectId) -> Result<Vec<ObjectId>, StoreError>;
}

#[derive(Clone)]
pub struct MongoListingStore {
    listings: Collection<Listing>,
}

impl MongoListingStore {
    pub fn new(db: &Database) -> Self {
        MongoListingStore {
            listings: db.collection::<Listing>(LISTINGS_COLLECTION),
        }
    }
}

fn filter_document(filter: &ListingFilter) -> Document {
    let mut query = Document::new();
    if let Some(ids) = &filter.ids {
        query.insert("_id", doc! { "$in": ids.clone() });
    }
    if let Some(status) = filter.status {
        query.insert("status", status.as_str());
    }
    if let Some(owner_ids) = &filter.owner_ids {
        query.insert("owner_id", doc! { "$in": owner_ids.clone() });
    }
    query
}

#[async_trait]
impl ListingStore for MongoListingStore {
    async fn insert_listing(&self, listing: Listing) -> Result<Listing, StoreError> {
        self.listings.insert_one(&listing).await?;
        Ok(listing)
    }

    async fn find_listing(&self, id: &ObjectId) -> Result<Option<Listing>, StoreError> {
        Ok(self.listings.find_one(doc! { "_id": *id }).await?)
    }

    async fn list_listings(&self, filter: &ListingFilter) -> Result<Vec<Listing>, StoreError> {
        let mut find = self
            .listings
            .find(filter_document(filter))
            .sort(doc! { "created_at": -1 })
            .skip(filter.skip);
        if let Some(limit) = filter.limit {
            find = find.limit(limit);
        }
        Ok(find.await?.try_collect().await?)
    }

    async fn complete_listing(
        &self,
        id: &ObjectId,
        accepted_offer_id: &ObjectId,
    ) -> Result<Option<Listing>, StoreError> {
        let updated = self
            .listings
            .find_one_and_update(
                doc! { "_id": *id, "status": ListingStatus::Active.as_str() },
                doc! {
                    "$set": {
                        "status": ListingStatus::Completed.as_str(),
                        "completed_at": bson::DateTime::now(),
                        "accepted_offer_id": *accepted_offer_id,
                    }
                },
            )
            .return_document(mongodb::options::ReturnDocument::After)
            .await?;
        Ok(updated)
    }

    async fn delete_listing(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self.listings.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_listings_by_owner(&self, owner_id: &ObjectId) -> Result<Vec<ObjectId>, StoreError> {
        let owned: Vec<Listing> = self
            .listings
            .find(doc! { "owner_id": *owner_id })
            .await?
            .try_collect()
            .await?;
        let ids: Vec<ObjectId> = owned.iter().map(|l| l.id).collect();
        if !ids.is_empty() {
            self.listings
                .delete_many(doc! { "_id": { "$in": ids.clone() } })
                .await?;
        }
        Ok(ids)
    }
}
