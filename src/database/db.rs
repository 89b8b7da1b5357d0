use mongodb::bson::{Document, doc};
use mongodb::options::{ClientOptions, IndexOptions};
use mongodb::{Client, IndexModel};

use crate::listing::store::LISTINGS_COLLECTION;
use crate::notification::store::NOTIFICATIONS_COLLECTION;
use crate::offer::store::OFFERS_COLLECTION;
use crate::user::store::{USERS_COLLECTION, VERIFICATIONS_COLLECTION};

/// Connected MongoDB handle. Constructed once at startup and handed to the stores.
pub struct Database {
    pub client: Client,
    pub db: mongodb::Database,
}

impl Database {
    pub async fn init(uri: &str, database_name: &str) -> Result<Self, mongodb::error::Error> {
        let mut client_options = ClientOptions::parse(uri).await?;
        client_options.app_name = Some("food-exchange-backend".to_string());

        let client = Client::with_options(client_options)?;

        // Ping the server to see if you can connect to the cluster
        client
            .database("admin")
            .run_command(doc! { "ping": 1 })
            .await?;

        log::info!("Connected successfully to MongoDB");

        let db = client.database(database_name);
        Ok(Self { client, db })
    }

    /// Creates the indexes the stores rely on. Unique indexes are what close
    /// the duplicate-registration and duplicate-offer races.
    pub async fn ensure_indexes(&self) -> Result<(), mongodb::error::Error> {
        self.create_index(USERS_COLLECTION, doc! { "email": 1 }, true).await?;
        self.create_index(USERS_COLLECTION, doc! { "phone": 1 }, true).await?;
        self.create_index(VERIFICATIONS_COLLECTION, doc! { "token": 1 }, true)
            .await?;
        self.create_index(VERIFICATIONS_COLLECTION, doc! { "user_id": 1 }, false)
            .await?;
        self.create_index(
            LISTINGS_COLLECTION,
            doc! { "status": 1, "created_at": -1 },
            false,
        )
        .await?;
        self.create_index(LISTINGS_COLLECTION, doc! { "owner_id": 1 }, false)
            .await?;
        self.create_index(
            OFFERS_COLLECTION,
            doc! { "listing_id": 1, "offerer_id": 1 },
            true,
        )
        .await?;
        self.create_index(OFFERS_COLLECTION, doc! { "offerer_id": 1 }, false)
            .await?;
        self.create_index(
            NOTIFICATIONS_COLLECTION,
            doc! { "user_id": 1, "created_at": -1 },
            false,
        )
        .await?;
        self.create_index(NOTIFICATIONS_COLLECTION, doc! { "created_at": 1 }, false)
            .await?;

        log::info!("MongoDB indexes ensured");
        Ok(())
    }

    async fn create_index(
        &self,
        collection: &str,
        keys: Document,
        unique: bool,
    ) -> Result<(), mongodb::error::Error> {
        let model = IndexModel::builder()
            .keys(keys)
            .options(IndexOptions::builder().unique(unique).build())
            .build();
        self.db
            .collection::<Document>(collection)
            .create_index(model)
            .await?;
        Ok(())
    }
}

// This function is a convenience wrapper around Database::init()
pub async fn connect_to_mongo(
    uri: &str,
    database_name: &str,
) -> Result<Database, mongodb::error::Error> {
    let database = Database::init(uri, database_name).await.map_err(|e| {
        log::error!("Failed to initialize database: {:?}", e);
        e
    })?;
    database.ensure_indexes().await?;
    Ok(database)
}
