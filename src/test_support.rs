//! Fakes and fixtures shared by the unit and HTTP tests.

use std::sync::{Arc, Mutex};
use std::time::Duration as StdDuration;

use async_trait::async_trait;
use chrono::Duration;
use mongodb::bson::{self, oid::ObjectId};

use crate::database::MemoryStore;
use crate::middleware::auth::JwtConfig;
use crate::notification::dispatcher::Dispatcher;
use crate::state::{AppServices, ServiceSettings, Stores};
use crate::user::model::{Address, RegisterRequest, Role, User};
use crate::utils::email::{EmailContent, Mailer};
use crate::utils::push::{PushMessage, PushSender};

pub const TEST_PASSWORD: &str = "password123";
pub const TEST_FRONTEND: &str = "http://localhost:3000";
/// Cheapest cost bcrypt accepts.
pub const TEST_BCRYPT_COST: u32 = 4;

/// Records every email it is asked to send. A failing mailer records nothing.
#[derive(Clone, Default)]
pub struct RecordingMailer {
    sent: Arc<Mutex<Vec<(String, EmailContent)>>>,
    fail: bool,
}

impl RecordingMailer {
    pub fn failing() -> Self {
        RecordingMailer {
            fail: true,
            ..Default::default()
        }
    }

    pub fn sent(&self) -> Vec<(String, EmailContent)> {
        self.sent.lock().unwrap().clone()
    }

    /// Token from the most recent verification link.
    pub fn last_verification_token(&self) -> Option<String> {
        self.sent().iter().rev().find_map(|(_, content)| {
            let (_, rest) = content.body.split_once("token=")?;
            let token: String = rest.chars().take_while(|c| c.is_ascii_alphanumeric()).collect();
            (!token.is_empty()).then_some(token)
        })
    }
}

#[async_trait]
impl Mailer for RecordingMailer {
    async fn send(&self, to_email: &str, content: &EmailContent) -> Result<(), String> {
        if self.fail {
            return Err("smtp unavailable".into());
        }
        self.sent
            .lock()
            .unwrap()
            .push((to_email.to_string(), content.clone()));
        Ok(())
    }
}

#[derive(Clone, Default)]
pub struct RecordingPush {
    sent: Arc<Mutex<Vec<(String, PushMessage)>>>,
}

impl RecordingPush {
    pub fn sent(&self) -> Vec<(String, PushMessage)> {
        self.sent.lock().unwrap().clone()
    }
}

#[async_trait]
impl PushSender for RecordingPush {
    async fn send(&self, device_token: &str, message: &PushMessage) -> Result<(), String> {
        self.sent
            .lock()
            .unwrap()
            .push((device_token.to_string(), message.clone()));
        Ok(())
    }
}

pub fn test_jwt() -> JwtConfig {
    JwtConfig {
        secret: "test-secret".into(),
        ttl_hours: 1,
    }
}

/// A verified user whose password is `TEST_PASSWORD`.
pub fn sample_user(email: &str, phone: &str, role: Role) -> User {
    let now = bson::DateTime::now();
    User {
        id: ObjectId::new(),
        role,
        first_name: "Ada".into(),
        last_name: "Yilmaz".into(),
        email: email.into(),
        phone: phone.into(),
        address: Address {
            province: "İstanbul".into(),
            district: "Beşiktaş".into(),
            neighborhood: "Levazım".into(),
            full_address: "Kitchen Street 1".into(),
        },
        password: bcrypt::hash(TEST_PASSWORD, TEST_BCRYPT_COST).unwrap(),
        is_email_verified: true,
        push_token: None,
        created_at: now,
        updated_at: now,
    }
}

pub fn register_request(email: &str, phone: &str) -> RegisterRequest {
    RegisterRequest {
        role: Some("cook".into()),
        first_name: Some("Ada".into()),
        last_name: Some("Yilmaz".into()),
        email: Some(email.into()),
        phone: Some(phone.into()),
        province: Some("İstanbul".into()),
        district: Some("Beşiktaş".into()),
        neighborhood: Some("Levazım".into()),
        full_address: Some("Kitchen Street 1".into()),
        password: Some(TEST_PASSWORD.into()),
    }
}

/// Services over an in-memory store. The dispatcher is returned so the
/// caller decides whether deliveries are drained.
pub fn memory_services(store: &MemoryStore, mailer: &RecordingMailer) -> (AppServices, Dispatcher) {
    AppServices::build(
        Stores::memory(store.clone()),
        Arc::new(mailer.clone()),
        Arc::new(RecordingPush::default()),
        ServiceSettings {
            jwt: test_jwt(),
            bcrypt_cost: TEST_BCRYPT_COST,
            verification_ttl: Duration::hours(24),
            notification_retention: Duration::hours(24),
            frontend_url: TEST_FRONTEND.into(),
            delivery_timeout: StdDuration::from_secs(1),
            delivery_queue_capacity: 64,
        },
    )
}
