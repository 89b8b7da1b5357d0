use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, doc, oid::ObjectId};
use mongodb::{Collection, Database};

use crate::database::StoreError;
use crate::notification::model::Notification;

pub const NOTIFICATIONS_COLLECTION: &str = "notifications";

#[async_trait]
pub trait NotificationStore: Send + Sync {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification, StoreError>;

    /// Newest first, at most `limit` records.
    async fn notifications_for_user(
        &self,
        user_id: &ObjectId,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError>;

    async fn count_unread(&self, user_id: &ObjectId) -> Result<u64, StoreError>;

    /// Marks a notification read if it belongs to `user_id`. Returns false
    /// when no such notification exists for that user.
    async fn mark_read(&self, id: &ObjectId, user_id: &ObjectId) -> Result<bool, StoreError>;

    /// Removes every notification created before `cutoff` in one batch.
    async fn delete_older_than(&self, cutoff: bson::DateTime) -> Result<u64, StoreError>;

    async fn delete_notifications_for_user(&self, user_id: &ObjectId) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct MongoNotificationStore {
    notifications: Collection<Notification>,
}

impl MongoNotificationStore {
    pub fn new(db: &Database) -> Self {
        MongoNotificationStore {
            notifications: db.collection::<Notification>(NOTIFICATIONS_COLLECTION),
        }
    }
}

#[async_trait]
impl NotificationStore for MongoNotificationStore {
    async fn insert_notification(&self, notification: Notification) -> Result<Notification, StoreError> {
        self.notifications.insert_one(&notification).await?;
        Ok(notification)
    }

    async fn notifications_for_user(
        &self,
        user_id: &ObjectId,
        limit: i64,
    ) -> Result<Vec<Notification>, StoreError> {
        let cursor = self
            .notifications
            .find(doc! { "user_id": *user_id })
            .sort(doc! { "created_at": -1 })
            .limit(limit)
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn count_unread(&self, user_id: &ObjectId) -> Result<u64, StoreError> {
        Ok(self
            .notifications
            .count_documents(doc! { "user_id": *user_id, "is_read": false })
            .await?)
    }

    async fn mark_read(&self, id: &ObjectId, user_id: &ObjectId) -> Result<bool, StoreError> {
        let result = self
            .notifications
            .update_one(
                doc! { "_id": *id, "user_id": *user_id },
                doc! { "$set": { "is_read": true } },
            )
            .await?;
        Ok(result.matched_count > 0)
    }

    async fn delete_older_than(&self, cutoff: bson::DateTime) -> Result<u64, StoreError> {
        let result = self
            .notifications
            .delete_many(doc! { "created_at": { "$lt": cutoff } })
            .await?;
        Ok(result.deleted_count)
    }

    async fn delete_notifications_for_user(&self, user_id: &ObjectId) -> Result<u64, StoreError> {
        let result = self
            .notifications
            .delete_many(doc! { "user_id": *user_id })
            .await?;
        Ok(result.deleted_count)
    }
}
