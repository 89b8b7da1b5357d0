use std::sync::{Arc, OnceLock};
use std::time::Duration as StdDuration;

use chrono::{Duration, Utc};
use mongodb::bson::{self, oid::ObjectId};

use crate::middleware::auth::JwtConfig;
use crate::user::model::{
    Address, EmailVerification, Registration, RegisterRequest, Role, UpdateAddressRequest, User,
    UserProfile,
};
use crate::user::store::{UserStore, VerificationStore};
use crate::utils::email::{Mailer, verification_email};
use crate::utils::error::CustomError;
use crate::utils::helpers::{generate_verification_token, required};
use crate::utils::model::LoginRequest;
use crate::utils::{hashing, password_validation};

const INVALID_CREDENTIALS: &str = "Invalid email or password";
pub const CONTACT_IN_USE: &str = "This email address or phone number is already in use";
pub const INVALID_VERIFICATION_TOKEN: &str = "Invalid verification token";
pub const EXPIRED_VERIFICATION_TOKEN: &str = "Verification token has expired";

/// Session token plus the profile it was issued for.
#[derive(Debug)]
pub struct Session {
    pub token: String,
    pub user: UserProfile,
}

/// Knobs the user service needs from the application config.
#[derive(Debug, Clone)]
pub struct UserSettings {
    pub bcrypt_cost: u32,
    pub verification_ttl: Duration,
    pub frontend_url: String,
    pub email_timeout: StdDuration,
}

pub struct UserService {
    users: Arc<dyn UserStore>,
    verifications: Arc<dyn VerificationStore>,
    mailer: Arc<dyn Mailer>,
    jwt: JwtConfig,
    settings: UserSettings,
    /// Hash checked against when the email is unknown, built on first use.
    unknown_user_hash: OnceLock<String>,
}

impl UserService {
    pub fn new(
        users: Arc<dyn UserStore>,
        verifications: Arc<dyn VerificationStore>,
        mailer: Arc<dyn Mailer>,
        jwt: JwtConfig,
        settings: UserSettings,
    ) -> Self {
        UserService {
            users,
            verifications,
            mailer,
            jwt,
            settings,
            unknown_user_hash: OnceLock::new(),
        }
    }

    pub async fn register(&self, req: RegisterRequest) -> Result<Registration, CustomError> {
        let fields = [
            ("role", required(&req.role)),
            ("firstName", required(&req.first_name)),
            ("lastName", required(&req.last_name)),
            ("email", required(&req.email)),
            ("phone", required(&req.phone)),
            ("province", required(&req.province)),
            ("district", required(&req.district)),
            ("neighborhood", required(&req.neighborhood)),
            ("fullAddress", required(&req.full_address)),
        ];
        let missing: Vec<&str> = fields
            .iter()
            .filter(|(_, value)| value.is_none())
            .map(|(name, _)| *name)
            .collect();
        let password = req.password.filter(|p| !p.is_empty());
        if !missing.is_empty() || password.is_none() {
            let mut missing = missing;
            if password.is_none() {
                missing.push("password");
            }
            return Err(CustomError::ValidationError(format!(
                "Missing required fields: {}",
                missing.join(", ")
            )));
        }

        let [role, first_name, last_name, email, phone, province, district, neighborhood, full_address] =
            fields.map(|(_, value)| value.unwrap_or_default());
        let password = password.unwrap_or_default();

        let role: Role = role
            .parse()
            .map_err(|_| CustomError::ValidationError("Invalid role".into()))?;
        if role == Role::Admin {
            return Err(CustomError::ValidationError("Invalid role".into()));
        }

        let email = password_validation::normalize_email(&email);
        password_validation::validate_email(&email)?;
        password_validation::validate_password(&password)?;

        if self.users.contact_taken(&email, &phone).await? {
            return Err(CustomError::ConflictError(CONTACT_IN_USE.into()));
        }

        let hashed_password = hashing::hash_password(&password, self.settings.bcrypt_cost)
            .map_err(|e| CustomError::InternalServerError(e.to_string()))?;

        let now = bson::DateTime::now();
        let user = self
            .users
            .insert_user(User {
                id: ObjectId::new(),
                role,
                first_name,
                last_name,
                email,
                phone,
                address: Address {
                    province,
                    district,
                    neighborhood,
                    full_address,
                },
                password: hashed_password,
                is_email_verified: false,
                push_token: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        log::info!("Registered user {} ({})", user.id, user.role);

        let email_sent = match self.issue_verification(&user).await {
            Ok(()) => true,
            Err(e) => {
                log::warn!("Verification email for user {} not sent: {}", user.id, e);
                false
            }
        };

        Ok(Registration { user, email_sent })
    }

    /// Creates a fresh verification record and mails its link.
    async fn issue_verification(&self, user: &User) -> Result<(), CustomError> {
        let now = Utc::now();
        let token = generate_verification_token();
        self.verifications
            .insert_verification(EmailVerification {
                id: ObjectId::new(),
                user_id: user.id,
                email: user.email.clone(),
                token: token.clone(),
                expires_at: bson::DateTime::from_chrono(now + self.settings.verification_ttl),
                created_at: bson::DateTime::from_chrono(now),
            })
            .await?;

        let url = format!(
            "{}/api/verify-email?token={}",
            self.settings.frontend_url.trim_end_matches('/'),
            token
        );
        let content = verification_email(&url, self.settings.verification_ttl.num_hours());

        match tokio::time::timeout(
            self.settings.email_timeout,
            self.mailer.send(&user.email, &content),
        )
        .await
        {
            Ok(Ok(())) => Ok(()),
            Ok(Err(e)) => Err(CustomError::InternalServerError(e)),
            Err(_) => Err(CustomError::InternalServerError(
                "Timed out sending verification email".into(),
            )),
        }
    }

    pub async fn login(&self, req: LoginRequest) -> Result<Session, CustomError> {
        let (Some(email), Some(password)) = (required(&req.email), req.password.filter(|p| !p.is_empty()))
        else {
            return Err(CustomError::ValidationError(
                "Email and password are required".into(),
            ));
        };

        let email = password_validation::normalize_email(&email);
        let Some(user) = self.users.find_user_by_email(&email).await? else {
            // Same bcrypt work as a real check, so response time does not
            // tell registered emails apart.
            let _ = hashing::verify_password(&password, self.unknown_user_hash());
            return Err(CustomError::UnauthenticatedError(INVALID_CREDENTIALS.into()));
        };

        let matches = hashing::verify_password(&password, &user.password)
            .map_err(|e| CustomError::InternalServerError(e.to_string()))?;
        if !matches {
            return Err(CustomError::UnauthenticatedError(INVALID_CREDENTIALS.into()));
        }

        if !user.is_email_verified {
            return Err(CustomError::VerificationRequired);
        }

        self.session_for(&user)
    }

    /// Consumes a verification token and signs the user in. Issuing a session
    /// here skips the separate login step after clicking the email link.
    pub async fn verify_email(&self, token: &str) -> Result<Session, CustomError> {
        let token = token.trim();
        if token.is_empty() {
            return Err(CustomError::ValidationError(
                "Verification token is required".into(),
            ));
        }

        let verification = self
            .verifications
            .find_verification(token)
            .await?
            .ok_or_else(|| CustomError::BadRequestError(INVALID_VERIFICATION_TOKEN.into()))?;

        if verification.is_expired(bson::DateTime::now()) {
            self.verifications.delete_verification(&verification.id).await?;
            return Err(CustomError::BadRequestError(
                EXPIRED_VERIFICATION_TOKEN.into(),
            ));
        }

        if !self.users.mark_email_verified(&verification.user_id).await? {
            return Err(CustomError::NotFoundError("User not found".into()));
        }
        self.verifications.delete_verification(&verification.id).await?;

        let user = self.find(&verification.user_id).await?;
        log::info!("User {} verified their email", user.id);
        self.session_for(&user)
    }

    pub async fn resend_verification(&self, email: &Option<String>) -> Result<(), CustomError> {
        let email = required(email)
            .map(|e| password_validation::normalize_email(&e))
            .ok_or_else(|| CustomError::ValidationError("Email is required".into()))?;

        let user = self
            .users
            .find_user_by_email(&email)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("User not found".into()))?;

        if user.is_email_verified {
            return Err(CustomError::BadRequestError(
                "Email address is already verified".into(),
            ));
        }

        self.verifications.delete_verifications_for_user(&user.id).await?;
        self.issue_verification(&user).await.map_err(|e| {
            log::error!("Resending verification to user {} failed: {}", user.id, e);
            CustomError::InternalServerError("Failed to send verification email".into())
        })
    }

    pub async fn get_profile(&self, id: &ObjectId) -> Result<UserProfile, CustomError> {
        Ok(UserProfile::from(&self.find(id).await?))
    }

    pub async fn update_address(
        &self,
        id: &ObjectId,
        req: UpdateAddressRequest,
    ) -> Result<UserProfile, CustomError> {
        let (Some(province), Some(district), Some(neighborhood), Some(full_address)) = (
            required(&req.province),
            required(&req.district),
            required(&req.neighborhood),
            required(&req.full_address),
        ) else {
            return Err(CustomError::ValidationError(
                "Province, district, neighborhood and full address are required".into(),
            ));
        };

        let address = Address {
            province,
            district,
            neighborhood,
            full_address,
        };
        if !self.users.update_address(id, &address).await? {
            return Err(CustomError::NotFoundError("User not found".into()));
        }
        self.get_profile(id).await
    }

    pub async fn save_push_token(&self, id: &ObjectId, token: &Option<String>) -> Result<(), CustomError> {
        let token = required(token)
            .ok_or_else(|| CustomError::ValidationError("Push token is required".into()))?;
        if !self.users.set_push_token(id, &token).await? {
            return Err(CustomError::NotFoundError("User not found".into()));
        }
        Ok(())
    }

    /// Creates the configured admin account when it does not exist yet.
    pub async fn ensure_admin(&self, email: &str, password: &str) -> Result<(), CustomError> {
        let email = password_validation::normalize_email(email);
        if let Some(existing) = self.users.find_user_by_email(&email).await? {
            if existing.role != Role::Admin {
                log::warn!("Admin seed email {} belongs to a non-admin account", email);
            }
            return Ok(());
        }

        password_validation::validate_email(&email)?;
        password_validation::validate_password(password)?;
        let hashed_password = hashing::hash_password(password, self.settings.bcrypt_cost)
            .map_err(|e| CustomError::InternalServerError(e.to_string()))?;

        let now = bson::DateTime::now();
        let admin = self
            .users
            .insert_user(User {
                id: ObjectId::new(),
                role: Role::Admin,
                first_name: "Admin".into(),
                last_name: "User".into(),
                phone: format!("admin:{}", email),
                email,
                address: Address {
                    province: String::new(),
                    district: String::new(),
                    neighborhood: String::new(),
                    full_address: String::new(),
                },
                password: hashed_password,
                is_email_verified: true,
                push_token: None,
                created_at: now,
                updated_at: now,
            })
            .await?;

        log::info!("Seeded admin account {}", admin.id);
        Ok(())
    }

    fn unknown_user_hash(&self) -> &str {
        self.unknown_user_hash.get_or_init(|| {
            hashing::hash_password("unregistered-account", self.settings.bcrypt_cost).unwrap_or_default()
        })
    }

    async fn find(&self, id: &ObjectId) -> Result<User, CustomError> {
        self.users
            .find_user(id)
            .await?
            .ok_or_else(|| CustomError::NotFoundError("User not found".into()))
    }

    fn session_for(&self, user: &User) -> Result<Session, CustomError> {
        Ok(Session {
            token: self.jwt.create_token(user)?,
            user: UserProfile::from(user),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::database::MemoryStore;
    use crate::test_support::{RecordingMailer, TEST_BCRYPT_COST, register_request, test_jwt};

    fn service(store: &MemoryStore, mailer: &RecordingMailer) -> UserService {
        UserService::new(
            Arc::new(store.clone()),
            Arc::new(store.clone()),
            Arc::new(mailer.clone()),
            test_jwt(),
            UserSettings {
                bcrypt_cost: TEST_BCRYPT_COST,
                verification_ttl: Duration::hours(24),
                frontend_url: "http://localhost:3000".into(),
                email_timeout: StdDuration::from_secs(1),
            },
        )
    }

    fn login(email: &str, password: &str) -> LoginRequest {
        LoginRequest {
            email: Some(email.into()),
            password: Some(password.into()),
        }
    }

    #[actix_web::test]
    async fn unverified_user_cannot_log_in() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        users
            .register(register_request("ada@example.com", "5550001"))
            .await
            .unwrap();

        let err = users
            .login(login("ada@example.com", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomError::VerificationRequired));
    }

    #[actix_web::test]
    async fn wrong_password_is_generic_even_when_unverified() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        users
            .register(register_request("ada@example.com", "5550001"))
            .await
            .unwrap();

        for (email, password) in [("ada@example.com", "wrong-pass"), ("nobody@example.com", "password123")] {
            let err = users.login(login(email, password)).await.unwrap_err();
            assert!(matches!(err, CustomError::UnauthenticatedError(ref m) if m == INVALID_CREDENTIALS));
        }
    }

    #[actix_web::test]
    async fn unknown_email_still_pays_for_a_hash_check() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        assert!(users.unknown_user_hash.get().is_none());

        let err = users
            .login(login("nobody@example.com", "password123"))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomError::UnauthenticatedError(ref m) if m == INVALID_CREDENTIALS));

        let dummy = users.unknown_user_hash.get().expect("hash built on unknown email");
        assert!(dummy.starts_with(&format!("$2b${:02}$", TEST_BCRYPT_COST)));
    }

    #[actix_web::test]
    async fn verification_link_signs_user_in_once() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        let registration = users
            .register(register_request("Ada@Example.com ", "5550001"))
            .await
            .unwrap();
        assert!(registration.email_sent);
        assert_eq!(registration.user.email, "ada@example.com");

        let token = mailer.last_verification_token().unwrap();
        let session = users.verify_email(&token).await.unwrap();
        assert!(session.user.is_email_verified);

        assert!(users.verify_email(&token).await.is_err());
        assert!(users.login(login("ada@example.com", "password123")).await.is_ok());
    }

    #[actix_web::test]
    async fn registration_survives_mail_failure() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::failing());
        let registration = service(&store, &mailer)
            .register(register_request("ada@example.com", "5550001"))
            .await
            .unwrap();
        assert!(!registration.email_sent);
    }

    #[actix_web::test]
    async fn duplicate_email_or_phone_is_a_conflict() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        users
            .register(register_request("ada@example.com", "5550001"))
            .await
            .unwrap();

        for (email, phone) in [("ADA@example.com", "5550009"), ("other@example.com", "5550001")] {
            let err = users.register(register_request(email, phone)).await.unwrap_err();
            assert!(matches!(err, CustomError::ConflictError(ref m) if m == CONTACT_IN_USE));
        }
    }

    #[actix_web::test]
    async fn registration_validates_input() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);

        let mut short = register_request("ada@example.com", "5550001");
        short.password = Some("short".into());
        assert!(matches!(users.register(short).await, Err(CustomError::ValidationError(_))));

        let mut admin = register_request("ada@example.com", "5550001");
        admin.role = Some("admin".into());
        assert!(matches!(users.register(admin).await, Err(CustomError::ValidationError(_))));

        let mut missing = register_request("ada@example.com", "5550001");
        missing.district = Some("  ".into());
        let err = users.register(missing).await.unwrap_err();
        assert!(err.to_string().contains("district"));
    }

    #[actix_web::test]
    async fn resend_replaces_previous_token() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        users
            .register(register_request("ada@example.com", "5550001"))
            .await
            .unwrap();
        let first = mailer.last_verification_token().unwrap();

        users
            .resend_verification(&Some("ada@example.com".into()))
            .await
            .unwrap();
        let second = mailer.last_verification_token().unwrap();
        assert_ne!(first, second);

        assert!(users.verify_email(&first).await.is_err());
        assert!(users.verify_email(&second).await.is_ok());

        let err = users
            .resend_verification(&Some("ada@example.com".into()))
            .await
            .unwrap_err();
        assert!(matches!(err, CustomError::BadRequestError(_)));
    }

    #[actix_web::test]
    async fn address_update_round_trips_through_profile() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        let user = users
            .register(register_request("ada@example.com", "5550001"))
            .await
            .unwrap()
            .user;

        let updated = users
            .update_address(
                &user.id,
                UpdateAddressRequest {
                    province: Some("Izmir".into()),
                    district: Some("Konak".into()),
                    neighborhood: Some("Alsancak".into()),
                    full_address: Some("Kibris Sehitleri Cd. 12".into()),
                },
            )
            .await
            .unwrap();
        let profile = users.get_profile(&user.id).await.unwrap();

        assert_eq!(profile.province, "Izmir");
        assert_eq!(profile.district, "Konak");
        assert_eq!(profile.neighborhood, "Alsancak");
        assert_eq!(profile.full_address, "Kibris Sehitleri Cd. 12");
        assert_eq!(updated.full_address, profile.full_address);
    }

    #[actix_web::test]
    async fn admin_seed_is_idempotent() {
        let (store, mailer) = (MemoryStore::new(), RecordingMailer::default());
        let users = service(&store, &mailer);
        users.ensure_admin("root@example.com", "admin-pass-1").await.unwrap();
        users.ensure_admin("root@example.com", "admin-pass-1").await.unwrap();

        let session = users
            .login(login("root@example.com", "admin-pass-1"))
            .await
            .unwrap();
        assert_eq!(session.user.role, Role::Admin);
    }
}
