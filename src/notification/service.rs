use std::sync::Arc;

use chrono::{Duration, Utc};
use mongodb::bson::{self, oid::ObjectId};

use crate::notification::dispatcher::DeliveryQueue;
use crate::notification::model::{
    CleanupReport, Delivery, Notification, NotificationKind, NotificationView,
};
use crate::notification::store::NotificationStore;
use crate::utils::email::EmailContent;
use crate::utils::error::CustomError;

/// Most notifications returned by a single listing request.
pub const NOTIFICATION_PAGE_LIMIT: i64 = 50;

/// An event to record for one user.
#[derive(Debug, Clone)]
pub struct NewNotification {
    pub user_id: ObjectId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_id: Option<ObjectId>,
    pub email: Option<EmailContent>,
}

pub struct NotificationService {
    store: Arc<dyn NotificationStore>,
    queue: DeliveryQueue,
}

impl NotificationService {
    pub fn new(store: Arc<dyn NotificationStore>, queue: DeliveryQueue) -> Self {
        NotificationService { store, queue }
    }

    /// Writes the notification record, then hands push/email delivery to the
    /// background dispatcher. Only the write can fail.
    pub async fn notify(&self, new: NewNotification) -> Result<Notification, CustomError> {
        let notification = Notification {
            id: ObjectId::new(),
            user_id: new.user_id,
            kind: new.kind,
            title: new.title,
            message: new.message,
            is_read: false,
            related_id: new.related_id,
            created_at: bson::DateTime::now(),
        };
        let notification = self.store.insert_notification(notification).await?;

        self.queue.enqueue(Delivery {
            notification_id: notification.id,
            user_id: notification.user_id,
            kind: notification.kind,
            title: notification.title.clone(),
            message: notification.message.clone(),
            related_id: notification.related_id,
            email: new.email,
        });

        Ok(notification)
    }

    /// Side-channel variant of `notify` for callers whose own operation has
    /// already succeeded: failures are logged and swallowed.
    pub async fn notify_quietly(&self, new: NewNotification) {
        let user_id = new.user_id;
        let kind = new.kind;
        if let Err(e) = self.notify(new).await {
            log::error!(
                "Failed to record {} notification for user {}: {}",
                kind.as_str(),
                user_id,
                e
            );
        }
    }

    pub async fn list(&self, user_id: &ObjectId) -> Result<Vec<NotificationView>, CustomError> {
        let notifications = self
            .store
            .notifications_for_user(user_id, NOTIFICATION_PAGE_LIMIT)
            .await?;
        Ok(notifications.iter().map(NotificationView::from).collect())
    }

    pub async fn unread_count(&self, user_id: &ObjectId) -> Result<u64, CustomError> {
        Ok(self.store.count_unread(user_id).await?)
    }

    pub async fn mark_read(&self, id: &ObjectId, user_id: &ObjectId) -> Result<(), CustomError> {
        if self.store.mark_read(id, user_id).await? {
            Ok(())
        } else {
            Err(CustomError::NotFoundError("Notification not found".into()))
        }
    }

    /// Deletes every notification older than `retention` in one batch.
    pub async fn cleanup(&self, retention: Duration) -> Result<CleanupReport, CustomError> {
        let cutoff = Utc::now() - retention;
        let deleted_count = self
            .store
            .delete_older_than(bson::DateTime::from_chrono(cutoff))
            .await?;

        log::info!(
            "Notification cleanup removed {} records older than {}",
            deleted_count,
            cutoff
        );

        Ok(CleanupReport {
            deleted_count,
            cutoff_date: cutoff,
        })
    }
}

/// Periodic retention sweep. Runs for the life of the process.
pub async fn run_cleanup(service: Arc<NotificationService>, retention: Duration, every: std::time::Duration) {
    let mut ticker = tokio::time::interval(every);
    // The first tick completes immediately, so a sweep also runs at startup.
    loop {
        ticker.tick().await;
        if let Err(e) = service.cleanup(retention).await {
            log::error!("Scheduled notification cleanup failed: {}", e);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;

    fn new_notification(user_id: ObjectId) -> NewNotification {
        NewNotification {
            user_id,
            kind: NotificationKind::NewOffer,
            title: "New offer".into(),
            message: "Someone wants your soup".into(),
            related_id: None,
            email: None,
        }
    }

    #[actix_web::test]
    async fn notify_records_before_enqueueing() {
        let store = MemoryStore::new();
        let (queue, mut rx) = DeliveryQueue::new(8);
        let service = NotificationService::new(Arc::new(store.clone()), queue);
        let user = ObjectId::new();

        let notification = service.notify(new_notification(user)).await.unwrap();

        assert_eq!(service.unread_count(&user).await.unwrap(), 1);
        let delivery = rx.try_recv().unwrap();
        assert_eq!(delivery.notification_id, notification.id);
    }

    #[actix_web::test]
    async fn record_survives_a_full_queue() {
        let (queue, _rx) = DeliveryQueue::new(1);
        let service = NotificationService::new(Arc::new(MemoryStore::new()), queue);
        let user = ObjectId::new();

        for _ in 0..3 {
            service.notify(new_notification(user)).await.unwrap();
        }
        assert_eq!(service.list(&user).await.unwrap().len(), 3);
    }

    #[actix_web::test]
    async fn only_the_recipient_can_mark_read() {
        let (queue, _rx) = DeliveryQueue::new(8);
        let service = NotificationService::new(Arc::new(MemoryStore::new()), queue);
        let (owner, stranger) = (ObjectId::new(), ObjectId::new());
        let n = service.notify(new_notification(owner)).await.unwrap();

        let err = service.mark_read(&n.id, &stranger).await.unwrap_err();
        assert!(matches!(err, CustomError::NotFoundError(_)));

        service.mark_read(&n.id, &owner).await.unwrap();
        assert_eq!(service.unread_count(&owner).await.unwrap(), 0);
    }

    #[actix_web::test]
    async fn cleanup_reports_cutoff() {
        let (queue, _rx) = DeliveryQueue::new(8);
        let service = NotificationService::new(Arc::new(MemoryStore::new()), queue);
        service.notify(new_notification(ObjectId::new())).await.unwrap();

        let report = service.cleanup(Duration::hours(24)).await.unwrap();
        assert_eq!(report.deleted_count, 0);
        assert!(report.cutoff_date < Utc::now() - Duration::hours(23));

        let report = service.cleanup(Duration::seconds(-60)).await.unwrap();
        assert_eq!(report.deleted_count, 1);
    }
}
