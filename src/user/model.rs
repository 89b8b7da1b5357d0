use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use mongodb::bson::{self, oid::ObjectId};
use serde::{Deserialize, Serialize};

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Role {
    Cook,
    Waiter,
    KitchenStaff,
    Manager,
    Admin,
    Other,
}

impl Role {
    pub fn as_str(&self) -> &'static str {
        match self {
            Role::Cook => "cook",
            Role::Waiter => "waiter",
            Role::KitchenStaff => "kitchen_staff",
            Role::Manager => "manager",
            Role::Admin => "admin",
            Role::Other => "other",
        }
    }
}

impl fmt::Display for Role {
    fn fmt(&self, f: &mut fmt::Formatter) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Role {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().replace([' ', '-'], "_").as_str() {
            "cook" => Ok(Role::Cook),
            "waiter" => Ok(Role::Waiter),
            "kitchen_staff" => Ok(Role::KitchenStaff),
            "manager" => Ok(Role::Manager),
            "admin" => Ok(Role::Admin),
            "other" => Ok(Role::Other),
            other => Err(format!("Unknown role: {}", other)),
        }
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Address {
    pub province: String,
    pub district: String,
    pub neighborhood: String,
    pub full_address: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    #[serde(flatten)]
    pub address: Address,
    pub password: String,
    pub is_email_verified: bool,
    #[serde(default)]
    pub push_token: Option<String>,
    pub created_at: bson::DateTime,
    pub updated_at: bson::DateTime,
}

impl User {
    pub fn full_name(&self) -> String {
        format!("{} {}", self.first_name, self.last_name)
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct EmailVerification {
    #[serde(rename = "_id")]
    pub id: ObjectId,
    pub user_id: ObjectId,
    pub email: String,
    pub token: String,
    pub expires_at: bson::DateTime,
    pub created_at: bson::DateTime,
}

impl EmailVerification {
    pub fn is_expired(&self, now: bson::DateTime) -> bool {
        now > self.expires_at
    }
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RegisterRequest {
    pub role: Option<String>,
    pub first_name: Option<String>,
    pub last_name: Option<String>,
    pub email: Option<String>,
    pub phone: Option<String>,
    pub province: Option<String>,
    pub district: Option<String>,
    pub neighborhood: Option<String>,
    pub full_address: Option<String>,
    pub password: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct UpdateAddressRequest {
    pub province: Option<String>,
    pub district: Option<String>,
    pub neighborhood: Option<String>,
    pub full_address: Option<String>,
}

#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PushTokenRequest {
    pub push_token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct VerifyEmailRequest {
    pub token: Option<String>,
}

#[derive(Debug, Deserialize)]
pub struct ResendVerificationRequest {
    pub email: Option<String>,
}

/// Public view of a user. Never carries the password hash.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct UserProfile {
    pub id: String,
    pub role: Role,
    pub first_name: String,
    pub last_name: String,
    pub email: String,
    pub phone: String,
    pub province: String,
    pub district: String,
    pub neighborhood: String,
    pub full_address: String,
    pub is_email_verified: bool,
    pub has_push_token: bool,
    pub created_at: DateTime<Utc>,
}

impl From<&User> for UserProfile {
    fn from(user: &User) -> Self {
        UserProfile {
            id: user.id.to_hex(),
            role: user.role,
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            email: user.email.clone(),
            phone: user.phone.clone(),
            province: user.address.province.clone(),
            district: user.address.district.clone(),
            neighborhood: user.address.neighborhood.clone(),
            full_address: user.address.full_address.clone(),
            is_email_verified: user.is_email_verified,
            has_push_token: user.push_token.is_some(),
            created_at: user.created_at.to_chrono(),
        }
    }
}

/// Contact fields of a listing owner or offerer shown next to listings and offers.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ContactSummary {
    pub id: String,
    pub first_name: String,
    pub last_name: String,
    pub phone: String,
    pub province: String,
    pub district: String,
    pub neighborhood: String,
}

impl From<&User> for ContactSummary {
    fn from(user: &User) -> Self {
        ContactSummary {
            id: user.id.to_hex(),
            first_name: user.first_name.clone(),
            last_name: user.last_name.clone(),
            phone: user.phone.clone(),
            province: user.address.province.clone(),
            district: user.address.district.clone(),
            neighborhood: user.address.neighborhood.clone(),
        }
    }
}

/// Outcome of a registration. `email_sent` is false when the verification
/// email could not be delivered; the account exists either way.
#[derive(Debug)]
pub struct Registration {
    pub user: User,
    pub email_sent: bool,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn role_parsing_accepts_common_spellings() {
        assert_eq!("Kitchen Staff".parse::<Role>(), Ok(Role::KitchenStaff));
        assert_eq!("kitchen-staff".parse::<Role>(), Ok(Role::KitchenStaff));
        assert_eq!(" COOK ".parse::<Role>(), Ok(Role::Cook));
        assert!("chef de partie".parse::<Role>().is_err());
    }
}
