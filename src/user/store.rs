use async_trait::async_trait;
use futures_util::TryStreamExt;
use mongodb::bson::{self, Document, doc, oid::ObjectId};
use mongodb::{Collection, Database};

use crate::database::StoreError;
use crate::user::model::{Address, EmailVerification, User};

pub const USERS_COLLECTION: &str = "users";
pub const VERIFICATIONS_COLLECTION: &str = "email_verifications";

const DUPLICATE_USER: &str = "This email address or phone number is already in use";

#[async_trait]
pub trait UserStore: Send + Sync {
    /// Inserts a user. Fails with `Duplicate` when the email or phone is taken.
    async fn insert_user(&self, user: User) -> Result<User, StoreError>;

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError>;

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError>;

    /// True when any user already holds `email` or `phone`.
    async fn contact_taken(&self, email: &str, phone: &str) -> Result<bool, StoreError>;

    /// Fetches every user in `ids` in one round trip. Missing ids are skipped.
    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>, StoreError>;

    /// Ids of users living in the given province/district. `None` matches any.
    async fn user_ids_in_area(
        &self,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Result<Vec<ObjectId>, StoreError>;

    /// Newest first.
    async fn list_users(&self) -> Result<Vec<User>, StoreError>;

    async fn mark_email_verified(&self, id: &ObjectId) -> Result<bool, StoreError>;

    async fn update_address(&self, id: &ObjectId, address: &Address) -> Result<bool, StoreError>;

    async fn set_push_token(&self, id: &ObjectId, token: &str) -> Result<bool, StoreError>;

    async fn delete_user(&self, id: &ObjectId) -> Result<bool, StoreError>;
}

#[async_trait]
pub trait VerificationStore: Send + Sync {
    async fn insert_verification(&self, verification: EmailVerification) -> Result<(), StoreError>;

    async fn find_verification(&self, token: &str) -> Result<Option<EmailVerification>, StoreError>;

    async fn delete_verification(&self, id: &ObjectId) -> Result<bool, StoreError>;

    async fn delete_verifications_for_user(&self, user_id: &ObjectId) -> Result<u64, StoreError>;
}

#[derive(Clone)]
pub struct MongoUserStore {
    users: Collection<User>,
    verifications: Collection<EmailVerification>,
}

impl MongoUserStore {
    pub fn new(db: &Database) -> Self {
        MongoUserStore {
            users: db.collection::<User>(USERS_COLLECTION),
            verifications: db.collection::<EmailVerification>(VERIFICATIONS_COLLECTION),
        }
    }

    async fn update_user(&self, id: &ObjectId, set: Document) -> Result<bool, StoreError> {
        let result = self
            .users
            .update_one(doc! { "_id": *id }, doc! { "$set": set })
            .await?;
        Ok(result.matched_count > 0)
    }
}

#[async_trait]
impl UserStore for MongoUserStore {
    async fn insert_user(&self, user: User) -> Result<User, StoreError> {
        self.users
            .insert_one(&user)
            .await
            .map_err(|e| StoreError::from_mongo(e, DUPLICATE_USER))?;
        Ok(user)
    }

    async fn find_user(&self, id: &ObjectId) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "_id": *id }).await?)
    }

    async fn find_user_by_email(&self, email: &str) -> Result<Option<User>, StoreError> {
        Ok(self.users.find_one(doc! { "email": email }).await?)
    }

    async fn contact_taken(&self, email: &str, phone: &str) -> Result<bool, StoreError> {
        let count = self
            .users
            .count_documents(doc! { "$or": [ { "email": email }, { "phone": phone } ] })
            .await?;
        Ok(count > 0)
    }

    async fn find_users(&self, ids: &[ObjectId]) -> Result<Vec<User>, StoreError> {
        if ids.is_empty() {
            return Ok(Vec::new());
        }
        let cursor = self
            .users
            .find(doc! { "_id": { "$in": ids.to_vec() } })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn user_ids_in_area(
        &self,
        province: Option<&str>,
        district: Option<&str>,
    ) -> Result<Vec<ObjectId>, StoreError> {
        let mut filter = Document::new();
        if let Some(province) = province {
            filter.insert("province", province);
        }
        if let Some(district) = district {
            filter.insert("district", district);
        }

        let docs: Vec<Document> = self
            .users
            .clone_with_type::<Document>()
            .find(filter)
            .projection(doc! { "_id": 1 })
            .await?
            .try_collect()
            .await?;
        Ok(docs
            .iter()
            .filter_map(|d| d.get_object_id("_id").ok())
            .collect())
    }

    async fn list_users(&self) -> Result<Vec<User>, StoreError> {
        let cursor = self
            .users
            .find(doc! {})
            .sort(doc! { "created_at": -1 })
            .await?;
        Ok(cursor.try_collect().await?)
    }

    async fn mark_email_verified(&self, id: &ObjectId) -> Result<bool, StoreError> {
        self.update_user(
            id,
            doc! { "is_email_verified": true, "updated_at": bson::DateTime::now() },
        )
        .await
    }

    async fn update_address(&self, id: &ObjectId, address: &Address) -> Result<bool, StoreError> {
        self.update_user(
            id,
            doc! {
                "province": address.province.as_str(),
                "district": address.district.as_str(),
                "neighborhood": address.neighborhood.as_str(),
                "full_address": address.full_address.as_str(),
                "updated_at": bson::DateTime::now(),
            },
        )
        .await
    }

    async fn set_push_token(&self, id: &ObjectId, token: &str) -> Result<bool, StoreError> {
        self.update_user(
            id,
            doc! { "push_token": token, "updated_at": bson::DateTime::now() },
        )
        .await
    }

    async fn delete_user(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self.users.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count > 0)
    }
}

#[async_trait]
impl VerificationStore for MongoUserStore {
    async fn insert_verification(&self, verification: EmailVerification) -> Result<(), StoreError> {
        self.verifications
            .insert_one(&verification)
            .await
            .map_err(|e| StoreError::from_mongo(e, "Verification token collision"))?;
        Ok(())
    }

    async fn find_verification(&self, token: &str) -> Result<Option<EmailVerification>, StoreError> {
        Ok(self.verifications.find_one(doc! { "token": token }).await?)
    }

    async fn delete_verification(&self, id: &ObjectId) -> Result<bool, StoreError> {
        let result = self.verifications.delete_one(doc! { "_id": *id }).await?;
        Ok(result.deleted_count > 0)
    }

    async fn delete_verifications_for_user(&self, user_id: &ObjectId) -> Result<u64, StoreError> {
        let result = self
            .verifications
            .delete_many(doc! { "user_id": *user_id })
            .await?;
        Ok(result.deleted_count)
    }
}
