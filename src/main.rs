use std::sync::Arc;
use std::time::Duration as StdDuration;

use actix_web::HttpServer;
use actix_web::middleware::Logger;
use dotenv::dotenv;
use env_logger::Env;
use log::{error, info, warn};

mod admin;
mod config;
mod database;
mod listing;
mod location;
mod middleware;
mod notification;
mod offer;
mod router;
mod state;
#[cfg(test)]
mod test_support;
mod user;
mod utils;

use config::{AppConfig, StorageBackend};
use database::{MemoryStore, connect_to_mongo};
use notification::service::run_cleanup;
use router::index::app;
use state::{AppServices, ServiceSettings, Stores};
use utils::email::{DisabledMailer, EmailConfig, EmailService, Mailer};
use utils::push::{DisabledPush, FcmPushService, PushConfig, PushSender};

fn startup_error(message: impl std::fmt::Display) -> std::io::Error {
    std::io::Error::other(message.to_string())
}

fn build_mailer() -> Result<Arc<dyn Mailer>, std::io::Error> {
    match EmailConfig::from_env().map_err(startup_error)? {
        Some(config) => Ok(Arc::new(EmailService::with_config(config).map_err(startup_error)?)),
        None => {
            warn!("SMTP is not configured, emails will not be sent");
            Ok(Arc::new(DisabledMailer))
        }
    }
}

fn build_push() -> Arc<dyn PushSender> {
    match PushConfig::from_env() {
        Some(config) => Arc::new(FcmPushService::with_config(config)),
        None => {
            warn!("FCM is not configured, push notifications will not be sent");
            Arc::new(DisabledPush)
        }
    }
}

#[actix_web::main]
async fn main() -> std::io::Result<()> {
    // Load environment variables from .env file
    dotenv().ok();

    // Initialize logger with environment variable support
    env_logger::Builder::from_env(Env::default().default_filter_or("info")).init();

    let config = AppConfig::from_env().map_err(|e| {
        error!("Invalid configuration: {}", e);
        startup_error(e)
    })?;

    let (stores, mongo_client) = match config.storage_backend {
        StorageBackend::Mongo => {
            let database = connect_to_mongo(&config.mongodb_uri, &config.mongodb_database)
                .await
                .map_err(startup_error)?;
            (Stores::mongo(&database.db), Some(database.client))
        }
        StorageBackend::Memory => {
            warn!("Using the in-memory store, data is lost on shutdown");
            (Stores::memory(MemoryStore::new()), None)
        }
    };

    let (services, dispatcher) = AppServices::build(
        stores,
        build_mailer()?,
        build_push(),
        ServiceSettings::from(&config),
    );

    if let (Some(email), Some(password)) = (&config.admin_email, &config.admin_password) {
        if let Err(e) = services.users.ensure_admin(email, password).await {
            error!("Failed to seed admin account: {}", e);
        }
    }

    actix_web::rt::spawn(dispatcher.run());
    actix_web::rt::spawn(run_cleanup(
        services.notification_service(),
        chrono::Duration::hours(config.notification_retention_hours),
        StdDuration::from_secs(config.cleanup_interval_minutes * 60),
    ));

    info!("Starting server on http://{}:{}", config.host, config.port);

    HttpServer::new(move || {
        app(services.clone())
            .wrap(Logger::default())
            .wrap(Logger::new("%a %{User-Agent}i"))
    })
    .bind((config.host.as_str(), config.port))?
    .run()
    .await?;

    if let Some(client) = mongo_client {
        client.shutdown().await;
    }

    // Reached only once the server has shut down
    info!("Server has stopped");

    Ok(())
}
