use actix_web::http::header::LOCATION;
use actix_web::{HttpResponse, web};
use serde::Deserialize;
use serde_json::json;

use crate::middleware::auth::AuthUser;
use crate::user::model::{
    PushTokenRequest, RegisterRequest, ResendVerificationRequest, UpdateAddressRequest,
    VerifyEmailRequest,
};
use crate::user::service::{EXPIRED_VERIFICATION_TOKEN, UserService};
use crate::utils::error::CustomError;
use crate::utils::model::LoginRequest;

pub async fn register_user(
    user_service: web::Data<UserService>,
    user_info: web::Json<RegisterRequest>,
) -> Result<HttpResponse, CustomError> {
    let registration = user_service.register(user_info.into_inner()).await?;

    let message = if registration.email_sent {
        "Registration successful. Check your inbox to verify your email address."
    } else {
        "Registration successful, but the verification email could not be sent. Request a new one to continue."
    };

    Ok(HttpResponse::Created().json(json!({
        "success": true,
        "message": message,
        "userId": registration.user.id.to_hex(),
        "requiresVerification": true,
        "emailSent": registration.email_sent,
    })))
}

pub async fn login_user(
    user_service: web::Data<UserService>,
    login_info: web::Json<LoginRequest>,
) -> Result<HttpResponse, CustomError> {
    let session = user_service.login(login_info.into_inner()).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Login successful",
        "token": session.token,
        "user": session.user,
    })))
}

pub async fn verify_email(
    user_service: web::Data<UserService>,
    body: web::Json<VerifyEmailRequest>,
) -> Result<HttpResponse, CustomError> {
    let token = body.into_inner().token.unwrap_or_default();
    let session = user_service.verify_email(&token).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Email verified successfully",
        "token": session.token,
        "user": session.user,
    })))
}

#[derive(Debug, Deserialize)]
pub struct VerifyLinkQuery {
    pub token: Option<String>,
}

/// Target of the link in the verification email. Always answers with a
/// redirect to the frontend's verification page.
pub async fn verify_email_link(
    user_service: web::Data<UserService>,
    frontend_url: web::Data<FrontendUrl>,
    query: web::Query<VerifyLinkQuery>,
) -> HttpResponse {
    let base = frontend_url.0.trim_end_matches('/');
    let outcome = match query.into_inner().token {
        Some(token) if !token.trim().is_empty() => user_service.verify_email(&token).await,
        _ => Err(CustomError::ValidationError("missing".into())),
    };

    let location = match outcome {
        Ok(_) => format!("{}/verify-email?success=true", base),
        Err(err) => {
            let reason = match &err {
                CustomError::ValidationError(_) => "missing_token",
                CustomError::BadRequestError(msg) if msg == EXPIRED_VERIFICATION_TOKEN => "expired_token",
                CustomError::BadRequestError(_) | CustomError::NotFoundError(_) => "invalid_token",
                _ => {
                    log::error!("Email verification via link failed: {}", err);
                    "server_error"
                }
            };
            format!("{}/verify-email?error={}", base, reason)
        }
    };

    HttpResponse::Found()
        .insert_header((LOCATION, location))
        .finish()
}

pub async fn resend_verification(
    user_service: web::Data<UserService>,
    body: web::Json<ResendVerificationRequest>,
) -> Result<HttpResponse, CustomError> {
    user_service.resend_verification(&body.email).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Verification email sent",
    })))
}

pub async fn get_profile(
    user_service: web::Data<UserService>,
    user: AuthUser,
) -> Result<HttpResponse, CustomError> {
    let profile = user_service.get_profile(&user.id).await?;
    Ok(HttpResponse::Ok().json(profile))
}

pub async fn update_address(
    user_service: web::Data<UserService>,
    user: AuthUser,
    body: web::Json<UpdateAddressRequest>,
) -> Result<HttpResponse, CustomError> {
    let profile = user_service
        .update_address(&user.id, body.into_inner())
        .await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Address updated",
        "user": profile,
    })))
}

pub async fn save_push_token(
    user_service: web::Data<UserService>,
    user: AuthUser,
    body: web::Json<PushTokenRequest>,
) -> Result<HttpResponse, CustomError> {
    user_service.save_push_token(&user.id, &body.push_token).await?;
    Ok(HttpResponse::Ok().json(json!({
        "success": true,
        "message": "Push token saved",
    })))
}

/// Base URL of the web client, used for redirects.
#[derive(Debug, Clone)]
pub struct FrontendUrl(pub String);
