use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

use crate::utils::email::EmailContent;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum NotificationKind {
    NewOffer,
    OfferAccepted,
    OfferRejected,
}

impl NotificationKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            NotificationKind::NewOffer => "new_offer",
            NotificationKind::OfferAccepted => "offer_accepted",
            NotificationKind::OfferRejected => "offer_rejected",
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Notification {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    #[serde(default)]
    pub related_id: Option<ObjectId>,
    pub created_at: bson::DateTime,
}

/// Push/email work produced by a notification, handled off the request path.
#[derive(Debug, Clone)]
pub struct Delivery {
    pub notification_id: ObjectId,
    pub user_id: ObjectId,
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub related_id: Option<ObjectId>,
    pub email: Option<EmailContent>,
}

#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct NotificationView {
    pub id: String,
    #[serde(rename = "type")]
    pub kind: NotificationKind,
    pub title: String,
    pub message: String,
    pub is_read: bool,
    pub related_id: Option<String>,
    pub created_at: DateTime<Utc>,
}

impl From<&Notification> for NotificationView {
    fn from(n: &Notification) -> Self {
        NotificationView {
            id: n.id.to_hex(),
            kind: n.kind,
            title: n.title.clone(),
            message: n.message.clone(),
            is_read: n.is_read,
            related_id: n.related_id.map(|id| id.to_hex()),
            created_at: n.created_at.to_chrono(),
        }
    }
}

/// Result of a retention sweep.
#[derive(Debug, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CleanupReport {
    pub deleted_count: u64,
    pub cutoff_date: DateTime<Utc>,
}
