use std::collections::HashMap;
use std::env;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

/// A push message addressed to one device token.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PushMessage {
    pub title: String,
    pub body: String,
    pub data: HashMap<String, String>,
}

#[async_trait]
pub trait PushSender: Send + Sync {
    async fn send(&self, device_token: &str, message: &PushMessage) -> Result<(), String>;
}

/// Firebase Cloud Messaging configuration loaded from environment variables
#[derive(Debug, Clone)]
pub struct PushConfig {
    pub project_id: String,
    /// OAuth2 bearer token for the FCM HTTP v1 API.
    pub access_token: String,
}

impl PushConfig {
    /// Returns `None` when push delivery is not configured.
    pub fn from_env() -> Option<Self> {
        Some(Self {
            project_id: env::var("FCM_PROJECT_ID").ok()?,
            access_token: env::var("FCM_ACCESS_TOKEN").ok()?,
        })
    }

    /// Get the send URL for the FCM v1 API
    pub fn send_url(&self) -> String {
        format!(
            "https://fcm.googleapis.com/v1/projects/{}/messages:send",
            self.project_id
        )
    }
}

#[derive(Serialize)]
struct FcmRequest<'a> {
    message: FcmMessage<'a>,
}

#[derive(Serialize)]
struct FcmMessage<'a> {
    token: &'a str,
    notification: FcmNotification<'a>,
    data: &'a HashMap<String, String>,
}

#[derive(Serialize)]
struct FcmNotification<'a> {
    title: &'a str,
    body: &'a str,
}

/// FCM error response
#[derive(Debug, Deserialize)]
struct FcmErrorResponse {
    error: FcmError,
}

#[derive(Debug, Deserialize)]
struct FcmError {
    message: String,
}

/// Push service for Firebase Cloud Messaging
pub struct FcmPushService {
    config: PushConfig,
    client: reqwest::Client,
}

impl FcmPushService {
    pub fn with_config(config: PushConfig) -> Self {
        let client = reqwest::Client::new();
        Self { config, client }
    }
}

#[async_trait]
impl PushSender for FcmPushService {
    async fn send(&self, device_token: &str, message: &PushMessage) -> Result<(), String> {
        let request = FcmRequest {
            message: FcmMessage {
                token: device_token,
                notification: FcmNotification {
                    title: &message.title,
                    body: &message.body,
                },
                data: &message.data,
            },
        };

        let response = self
            .client
            .post(self.config.send_url())
            .bearer_auth(&self.config.access_token)
            .json(&request)
            .send()
            .await
            .map_err(|e| format!("Failed to reach FCM: {}", e))?;

        if response.status().is_success() {
            return Ok(());
        }

        let status = response.status();
        let reason = match response.json::<FcmErrorResponse>().await {
            Ok(body) => body.error.message,
            Err(_) => "unknown error".to_string(),
        };
        Err(format!("FCM rejected push ({}): {}", status, reason))
    }
}

/// Stand-in used when FCM is not configured.
pub struct DisabledPush;

#[async_trait]
impl PushSender for DisabledPush {
    async fn send(&self, _device_token: &str, message: &PushMessage) -> Result<(), String> {
        log::debug!("Push delivery disabled, dropping '{}'", message.title);
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn fcm_payload_shape() {
        let data = HashMap::from([("type".to_string(), "new_offer".to_string())]);
        let request = FcmRequest {
            message: FcmMessage {
                token: "device-1",
                notification: FcmNotification {
                    title: "New offer",
                    body: "Ada made an offer",
                },
                data: &data,
            },
        };

        let value = serde_json::to_value(&request).unwrap();
        assert_eq!(value["message"]["token"], "device-1");
        assert_eq!(value["message"]["notification"]["title"], "New offer");
        assert_eq!(value["message"]["data"]["type"], "new_offer");
    }

    #[test]
    fn send_url_contains_project() {
        let config = PushConfig {
            project_id: "food-exchange".into(),
            access_token: "t".into(),
        };
        assert_eq!(
            config.send_url(),
            "https://fcm.googleapis.com/v1/projects/food-exchange/messages:send"
        );
    }
}
