use std::collections::HashMap;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::mpsc::{self, error::TrySendError};
use tokio::time::timeout;

use crate::notification::model::Delivery;
use crate::user::store::UserStore;
use crate::utils::email::Mailer;
use crate::utils::push::{PushMessage, PushSender};

/// Sending half of the outbound delivery queue. Enqueueing never waits:
/// when the queue is full the delivery is dropped and logged, the stored
/// notification record stays the source of truth.
#[derive(Clone)]
pub struct DeliveryQueue {
    tx: mpsc::Sender<Delivery>,
}

impl DeliveryQueue {
    pub fn new(capacity: usize) -> (Self, mpsc::Receiver<Delivery>) {
        let (tx, rx) = mpsc::channel(capacity.max(1));
        (DeliveryQueue { tx }, rx)
    }

    pub fn enqueue(&self, delivery: Delivery) {
        match self.tx.try_send(delivery) {
            Ok(()) => {}
            Err(TrySendError::Full(d)) => {
                log::warn!(
                    "Delivery queue full, dropping push/email for notification {} (user {})",
                    d.notification_id,
                    d.user_id
                );
            }
            Err(TrySendError::Closed(d)) => {
                log::warn!(
                    "Delivery queue closed, dropping push/email for notification {} (user {})",
                    d.notification_id,
                    d.user_id
                );
            }
        }
    }
}

/// Drains the delivery queue in the background and fans each delivery out
/// to push and email.
pub struct Dispatcher {
    rx: mpsc::Receiver<Delivery>,
    users: Arc<dyn UserStore>,
    mailer: Arc<dyn Mailer>,
    push: Arc<dyn PushSender>,
    timeout: Duration,
}

impl Dispatcher {
    pub fn new(
        rx: mpsc::Receiver<Delivery>,
        users: Arc<dyn UserStore>,
        mailer: Arc<dyn Mailer>,
        push: Arc<dyn PushSender>,
        timeout: Duration,
    ) -> Self {
        Dispatcher {
            rx,
            users,
            mailer,
            push,
            timeout,
        }
    }

    /// Runs until every `DeliveryQueue` handle has been dropped.
    pub async fn run(mut self) {
        log::info!("Notification dispatcher started");
        while let Some(delivery) = self.rx.recv().await {
            self.deliver(&delivery).await;
        }
        log::info!("Notification dispatcher stopped");
    }

    pub async fn deliver(&self, delivery: &Delivery) {
        let user = match self.users.find_user(&delivery.user_id).await {
            Ok(Some(user)) => user,
            Ok(None) => {
                log::warn!(
                    "Skipping delivery of notification {}: user {} no longer exists",
                    delivery.notification_id,
                    delivery.user_id
                );
                return;
            }
            Err(e) => {
                log::error!(
                    "Skipping delivery of notification {}: cannot load user {}: {}",
                    delivery.notification_id,
                    delivery.user_id,
                    e
                );
                return;
            }
        };

        if let Some(token) = user.push_token.as_deref() {
            let message = push_message(delivery);
            match timeout(self.timeout, self.push.send(token, &message)).await {
                Ok(Ok(())) => log::debug!("Push sent for notification {}", delivery.notification_id),
                Ok(Err(e)) => log::warn!("Push failed for user {}: {}", user.id, e),
                Err(_) => log::warn!("Push timed out for user {}", user.id),
            }
        }

        if let Some(content) = &delivery.email {
            match timeout(self.timeout, self.mailer.send(&user.email, content)).await {
                Ok(Ok(())) => log::debug!("Email sent for notification {}", delivery.notification_id),
                Ok(Err(e)) => log::warn!("Email failed for user {}: {}", user.id, e),
                Err(_) => log::warn!("Email timed out for user {}", user.id),
            }
        }
    }
}

fn push_message(delivery: &Delivery) -> PushMessage {
    let mut data = HashMap::from([
        ("type".to_string(), delivery.kind.as_str().to_string()),
        (
            "notificationId".to_string(),
            delivery.notification_id.to_hex(),
        ),
    ]);
    if let Some(related) = delivery.related_id {
        data.insert("relatedId".to_string(), related.to_hex());
    }

    PushMessage {
        title: delivery.title.clone(),
        body: delivery.message.clone(),
        data,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::notification::model::NotificationKind;
    use crate::test_support::{RecordingMailer, RecordingPush, sample_user};
    use crate::user::model::Role;
    use crate::user::store::UserStore;
    use crate::utils::email::EmailContent;
    use mongodb::bson::oid::ObjectId;

    fn delivery(user_id: ObjectId, email: bool) -> Delivery {
        Delivery {
            notification_id: ObjectId::new(),
            user_id,
            kind: NotificationKind::OfferAccepted,
            title: "Offer accepted".into(),
            message: "Call 5550001".into(),
            related_id: Some(ObjectId::new()),
            email: email.then(|| EmailContent {
                subject: "Accepted".into(),
                body: "Call 5550001".into(),
            }),
        }
    }

    fn dispatcher(store: &MemoryStore, mailer: &RecordingMailer, push: &RecordingPush) -> Dispatcher {
        let (_queue, rx) = DeliveryQueue::new(4);
        Dispatcher::new(
            rx,
            Arc::new(store.clone()),
            Arc::new(mailer.clone()),
            Arc::new(push.clone()),
            Duration::from_secs(1),
        )
    }

    #[actix_web::test]
    async fn delivers_push_and_email_when_available() {
        let store = MemoryStore::new();
        let mut user = sample_user("bob@example.com", "5550002", Role::Waiter);
        user.push_token = Some("device-bob".into());
        store.insert_user(user.clone()).await.unwrap();

        let (mailer, push) = (RecordingMailer::default(), RecordingPush::default());
        dispatcher(&store, &mailer, &push)
            .deliver(&delivery(user.id, true))
            .await;

        let pushes = push.sent();
        assert_eq!(pushes.len(), 1);
        assert_eq!(pushes[0].0, "device-bob");
        assert_eq!(pushes[0].1.data["type"], "offer_accepted");

        let emails = mailer.sent();
        assert_eq!(emails.len(), 1);
        assert_eq!(emails[0].0, "bob@example.com");
    }

    #[actix_web::test]
    async fn skips_push_without_token_and_survives_mail_failure() {
        let store = MemoryStore::new();
        let user = sample_user("bob@example.com", "5550002", Role::Waiter);
        store.insert_user(user.clone()).await.unwrap();

        let (mailer, push) = (RecordingMailer::failing(), RecordingPush::default());
        dispatcher(&store, &mailer, &push)
            .deliver(&delivery(user.id, true))
            .await;

        assert!(push.sent().is_empty());
        assert!(mailer.sent().is_empty());
    }

    #[actix_web::test]
    async fn full_queue_drops_without_blocking() {
        let (queue, mut rx) = DeliveryQueue::new(1);
        queue.enqueue(delivery(ObjectId::new(), false));
        queue.enqueue(delivery(ObjectId::new(), false));

        assert!(rx.try_recv().is_ok());
        assert!(rx.try_recv().is_err());
    }
}
