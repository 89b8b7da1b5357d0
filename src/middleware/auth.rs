use std::future::{Ready, ready};

use actix_web::dev::{Payload, ServiceRequest};
use actix_web::http::header::AUTHORIZATION;
use actix_web::{Error, FromRequest, HttpMessage, HttpRequest, web};
use actix_web_httpauth::extractors::bearer::BearerAuth;
use jsonwebtoken::{DecodingKey, EncodingKey, Header, Validation, decode, encode};
use mongodb::bson::oid::ObjectId;
use serde::{Deserialize, Serialize};

use crate::user::model::{Role, User};
use crate::utils::error::CustomError;

#[derive(Debug, Serialize, Deserialize, Clone)]
pub struct Claims {
    pub id: String,
    pub role: Role,
    pub name: String,
    pub exp: usize,
}

/// Signing settings for session tokens.
#[derive(Debug, Clone)]
pub struct JwtConfig {
    pub secret: String,
    pub ttl_hours: i64,
}

impl JwtConfig {
    /// Create a session token embedding the user's id, role and name
    pub fn create_token(&self, user: &User) -> Result<String, CustomError> {
        let expiration = chrono::Utc::now()
            .checked_add_signed(chrono::Duration::hours(self.ttl_hours))
            .ok_or_else(|| CustomError::InternalServerError("Token expiry overflow".into()))?
            .timestamp() as usize;

        let claims = Claims {
            id: user.id.to_hex(),
            role: user.role,
            name: user.full_name(),
            exp: expiration,
        };

        encode(
            &Header::default(),
            &claims,
            &EncodingKey::from_secret(self.secret.as_bytes()),
        )
        .map_err(|e| CustomError::InternalServerError(format!("Token generation failed: {}", e)))
    }

    pub fn decode_token(&self, token: &str) -> Result<Claims, CustomError> {
        decode::<Claims>(
            token,
            &DecodingKey::from_secret(self.secret.as_bytes()),
            &Validation::default(),
        )
        .map(|data| data.claims)
        .map_err(|_| CustomError::UnauthenticatedError("Invalid or expired token".into()))
    }
}

/// Verify the bearer token on every request of a protected scope and stash
/// the claims for the handlers.
pub async fn verify_token(
    req: ServiceRequest,
    credentials: Option<BearerAuth>,
) -> Result<ServiceRequest, (Error, ServiceRequest)> {
    let Some(credentials) = credentials else {
        let err = CustomError::UnauthenticatedError("Access token required".into());
        return Err((err.into(), req));
    };

    let jwt = match req.app_data::<web::Data<JwtConfig>>() {
        Some(jwt) => jwt,
        None => {
            let err = CustomError::InternalServerError("JWT config is not registered".into());
            return Err((err.into(), req));
        }
    };

    match jwt.decode_token(credentials.token()) {
        Ok(claims) => {
            req.extensions_mut().insert(claims);
            Ok(req)
        }
        Err(err) => Err((err.into(), req)),
    }
}

/// The caller of an authenticated route.
#[derive(Debug, Clone)]
pub struct AuthUser {
    pub id: ObjectId,
    pub role: Role,
}

impl TryFrom<Claims> for AuthUser {
    type Error = CustomError;

    fn try_from(claims: Claims) -> Result<Self, Self::Error> {
        let id = ObjectId::parse_str(&claims.id)
            .map_err(|_| CustomError::UnauthenticatedError("Invalid or expired token".into()))?;
        Ok(AuthUser {
            id,
            role: claims.role,
        })
    }
}

fn authenticate(req: &HttpRequest) -> Result<AuthUser, CustomError> {
    // Set by `verify_token` on protected scopes.
    if let Some(claims) = req.extensions().get::<Claims>().cloned() {
        return AuthUser::try_from(claims);
    }

    // Routes that share a path with a public route decode the header here.
    let token = req
        .headers()
        .get(AUTHORIZATION)
        .and_then(|value| value.to_str().ok())
        .and_then(|value| value.strip_prefix("Bearer "))
        .map(str::trim)
        .filter(|token| !token.is_empty())
        .ok_or_else(|| CustomError::UnauthenticatedError("Access token required".into()))?;

    let jwt = req
        .app_data::<web::Data<JwtConfig>>()
        .ok_or_else(|| CustomError::InternalServerError("JWT config is not registered".into()))?;

    AuthUser::try_from(jwt.decode_token(token)?)
}

impl FromRequest for AuthUser {
    type Error = CustomError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req))
    }
}

/// An authenticated caller whose session token carries the admin role.
#[derive(Debug, Clone)]
pub struct AdminUser(pub AuthUser);

impl FromRequest for AdminUser {
    type Error = CustomError;
    type Future = Ready<Result<Self, Self::Error>>;

    fn from_request(req: &HttpRequest, _: &mut Payload) -> Self::Future {
        ready(authenticate(req).and_then(|user| {
            if user.role == Role::Admin {
                Ok(AdminUser(user))
            } else {
                log::warn!("User {} attempted an admin action", user.id);
                Err(CustomError::ForbiddenError("Admin access required".into()))
            }
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::sample_user;

    fn config() -> JwtConfig {
        JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: 1,
        }
    }

    #[test]
    fn token_round_trips_identity_and_role() {
        let user = sample_user("ada@example.com", "5550001", Role::Cook);
        let token = config().create_token(&user).unwrap();

        let claims = config().decode_token(&token).unwrap();
        assert_eq!(claims.id, user.id.to_hex());
        assert_eq!(claims.role, Role::Cook);
        assert_eq!(claims.name, user.full_name());
    }

    #[test]
    fn token_signed_with_other_secret_is_rejected() {
        let user = sample_user("ada@example.com", "5550001", Role::Cook);
        let token = config().create_token(&user).unwrap();

        let other = JwtConfig {
            secret: "another-secret".into(),
            ttl_hours: 1,
        };
        assert!(matches!(
            other.decode_token(&token),
            Err(CustomError::UnauthenticatedError(_))
        ));
    }

    #[test]
    fn expired_token_is_rejected() {
        let user = sample_user("ada@example.com", "5550001", Role::Cook);
        let expired = JwtConfig {
            secret: "test-secret".into(),
            ttl_hours: -2,
        };
        let token = expired.create_token(&user).unwrap();
        assert!(config().decode_token(&token).is_err());
    }
}
