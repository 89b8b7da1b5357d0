use std::sync::Arc;
use std::time::Duration as StdDuration;

use actix_web::web;
use chrono::Duration;

use crate::admin::service::AdminService;
use crate::config::AppConfig;
use crate::database::MemoryStore;
use crate::listing::service::ListingService;
use crate::listing::store::{ListingStore, MongoListingStore};
use crate::middleware::auth::JwtConfig;
use crate::notification::dispatcher::{DeliveryQueue, Dispatcher};
use crate::notification::service::NotificationService;
use crate::notification::store::{MongoNotificationStore, NotificationStore};
use crate::offer::service::OfferService;
use crate::offer::store::{MongoOfferStore, OfferStore};
use crate::user::controller::FrontendUrl;
use crate::user::service::{UserService, UserSettings};
use crate::user::store::{MongoUserStore, UserStore, VerificationStore};
use crate::utils::email::Mailer;
use crate::utils::push::PushSender;

/// One handle per storage concern, all backed by the same database.
#[derive(Clone)]
pub struct Stores {
    pub users: Arc<dyn UserStore>,
    pub verifications: Arc<dyn VerificationStore>,
    pub listings: Arc<dyn ListingStore>,
    pub offers: Arc<dyn OfferStore>,
    pub notifications: Arc<dyn NotificationStore>,
}

impl Stores {
    pub fn mongo(db: &mongodb::Database) -> Self {
        let users = Arc::new(MongoUserStore::new(db));
        Stores {
            users: users.clone(),
            verifications: users,
            listings: Arc::new(MongoListingStore::new(db)),
            offers: Arc::new(MongoOfferStore::new(db)),
            notifications: Arc::new(MongoNotificationStore::new(db)),
        }
    }

    pub fn memory(store: MemoryStore) -> Self {
        let store = Arc::new(store);
        Stores {
            users: store.clone(),
            verifications: store.clone(),
            listings: store.clone(),
            offers: store.clone(),
            notifications: store,
        }
    }
}

/// Settings the services take from `AppConfig`.
#[derive(Debug, Clone)]
pub struct ServiceSettings {
    pub jwt: JwtConfig,
    pub bcrypt_cost: u32,
    pub verification_ttl: Duration,
    pub notification_retention: Duration,
    pub frontend_url: String,
    pub delivery_timeout: StdDuration,
    pub delivery_queue_capacity: usize,
}

impl From<&AppConfig> for ServiceSettings {
    fn from(config: &AppConfig) -> Self {
        ServiceSettings {
            jwt: JwtConfig {
                secret: config.jwt_secret.clone(),
                ttl_hours: config.jwt_ttl_hours,
            },
            bcrypt_cost: config.bcrypt_cost,
            verification_ttl: Duration::hours(config.verification_ttl_hours),
            notification_retention: Duration::hours(config.notification_retention_hours),
            frontend_url: config.frontend_url.clone(),
            delivery_timeout: StdDuration::from_secs(config.delivery_timeout_seconds),
            delivery_queue_capacity: config.delivery_queue_capacity,
        }
    }
}

/// Every service the handlers need, built once and shared across workers.
#[derive(Clone)]
pub struct AppServices {
    pub users: web::Data<UserService>,
    pub listings: web::Data<ListingService>,
    pub offers: web::Data<OfferService>,
    pub notifications: web::Data<NotificationService>,
    pub admin: web::Data<AdminService>,
    pub jwt: web::Data<JwtConfig>,
    pub frontend_url: web::Data<FrontendUrl>,
}

impl AppServices {
    /// Wires the services together. The returned dispatcher must be spawned
    /// for push and email to go out.
    pub fn build(
        stores: Stores,
        mailer: Arc<dyn Mailer>,
        push: Arc<dyn PushSender>,
        settings: ServiceSettings,
    ) -> (Self, Dispatcher) {
        let (queue, rx) = DeliveryQueue::new(settings.delivery_queue_capacity);
        let dispatcher = Dispatcher::new(
            rx,
            stores.users.clone(),
            mailer.clone(),
            push,
            settings.delivery_timeout,
        );

        let notifications = Arc::new(NotificationService::new(
            stores.notifications.clone(),
            queue,
        ));

        let users = UserService::new(
            stores.users.clone(),
            stores.verifications.clone(),
            mailer,
            settings.jwt.clone(),
            UserSettings {
                bcrypt_cost: settings.bcrypt_cost,
                verification_ttl: settings.verification_ttl,
                frontend_url: settings.frontend_url.clone(),
                email_timeout: settings.delivery_timeout,
            },
        );
        let listings = ListingService::new(
            stores.listings.clone(),
            stores.offers.clone(),
            stores.users.clone(),
        );
        let offers = OfferService::new(
            stores.offers.clone(),
            stores.listings.clone(),
            stores.users.clone(),
            notifications.clone(),
            settings.frontend_url.clone(),
        );
        let admin = AdminService::new(
            stores.users,
            stores.verifications,
            stores.listings,
            stores.offers,
            stores.notifications,
            notifications.clone(),
            settings.notification_retention,
        );

        let services = AppServices {
            users: web::Data::new(users),
            listings: web::Data::new(listings),
            offers: web::Data::new(offers),
            notifications: web::Data::from(notifications),
            admin: web::Data::new(admin),
            jwt: web::Data::new(settings.jwt),
            frontend_url: web::Data::new(FrontendUrl(settings.frontend_url)),
        };
        (services, dispatcher)
    }

    /// Registers every service as app data.
    pub fn register(&self, cfg: &mut web::ServiceConfig) {
        cfg.app_data(self.users.clone())
            .app_data(self.listings.clone())
            .app_data(self.offers.clone())
            .app_data(self.notifications.clone())
            .app_data(self.admin.clone())
            .app_data(self.jwt.clone())
            .app_data(self.frontend_url.clone());
    }

    /// Shared handle for the background retention sweep.
    pub fn notification_service(&self) -> Arc<NotificationService> {
        self.notifications.clone().into_inner()
    }
}
