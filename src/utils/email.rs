use async_trait::async_trait;
use lettre::message::header::ContentType;
use lettre::transport::smtp::authentication::Credentials;
use lettre::{AsyncSmtpTransport, AsyncTransport, Message, Tokio1Executor};
use std::env;

const STARTTLS_PORT: u16 = 587;

/// Subject and plain-text body of an outgoing email.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct EmailContent {
    pub subject: String,
    pub body: String,
}

/// Anything that can deliver an email. Failures are reported as strings and
/// are never fatal to the caller's operation.
#[async_trait]
pub trait Mailer: Send + Sync {
    async fn send(&self, to_email: &str, content: &EmailContent) -> Result<(), String>;
}

/// SMTP configuration
#[derive(Debug, Clone)]
pub struct EmailConfig {
    pub smtp_host: String,
    pub smtp_port: u16,
    pub smtp_username: String,
    pub smtp_password: String,
    pub from_email: String,
    pub from_name: String,
}

impl EmailConfig {
    /// Load email configuration from environment variables. Returns `Ok(None)`
    /// when SMTP credentials are not configured at all.
    pub fn from_env() -> Result<Option<Self>, String> {
        let (username, password) = match (env::var("SMTP_USERNAME"), env::var("SMTP_PASSWORD")) {
            (Ok(u), Ok(p)) => (u, p),
            _ => return Ok(None),
        };

        Ok(Some(Self {
            smtp_host: env::var("SMTP_HOST").unwrap_or_else(|_| "smtp.gmail.com".to_string()),
            smtp_port: env::var("SMTP_PORT")
                .unwrap_or_else(|_| "465".to_string())
                .parse()
                .map_err(|_| "SMTP_PORT must be a valid number")?,
            from_email: env::var("SMTP_FROM_EMAIL").unwrap_or_else(|_| username.clone()),
            smtp_username: username,
            smtp_password: password,
            from_name: env::var("SMTP_FROM_NAME").unwrap_or_else(|_| "Food Exchange".to_string()),
        }))
    }
}

/// Email service for sending emails over SMTP
pub struct EmailService {
    config: EmailConfig,
    transport: AsyncSmtpTransport<Tokio1Executor>,
}

impl EmailService {
    /// Create a new EmailService with its pooled SMTP transport
    pub fn with_config(config: EmailConfig) -> Result<Self, String> {
        let creds = Credentials::new(config.smtp_username.clone(), config.smtp_password.clone());

        // Port 587 upgrades with STARTTLS, everything else uses implicit TLS (SMTPS)
        let builder = if config.smtp_port == STARTTLS_PORT {
            AsyncSmtpTransport::<Tokio1Executor>::starttls_relay(&config.smtp_host)
        } else {
            AsyncSmtpTransport::<Tokio1Executor>::relay(&config.smtp_host)
        }
        .map_err(|e| format!("Failed to create SMTP transport: {}", e))?;

        let transport = builder.credentials(creds).port(config.smtp_port).build();

        Ok(Self { config, transport })
    }
}

#[async_trait]
impl Mailer for EmailService {
    async fn send(&self, to_email: &str, content: &EmailContent) -> Result<(), String> {
        let from_address = format!("{} <{}>", self.config.from_name, self.config.from_email);

        let email = Message::builder()
            .from(
                from_address
                    .parse()
                    .map_err(|e| format!("Invalid from address: {}", e))?,
            )
            .to(to_email
                .parse()
                .map_err(|e| format!("Invalid to address: {}", e))?)
            .subject(content.subject.as_str())
            .header(ContentType::TEXT_PLAIN)
            .body(content.body.clone())
            .map_err(|e| format!("Failed to build email: {}", e))?;

        self.transport
            .send(email)
            .await
            .map_err(|e| format!("Failed to send email: {}", e))?;

        Ok(())
    }
}

/// Stand-in used when SMTP is not configured.
pub struct DisabledMailer;

#[async_trait]
impl Mailer for DisabledMailer {
    async fn send(&self, to_email: &str, content: &EmailContent) -> Result<(), String> {
        log::warn!(
            "Email delivery disabled, dropping '{}' for {}",
            content.subject,
            to_email
        );
        Err("Email service is not configured".to_string())
    }
}

pub fn verification_email(verification_url: &str, ttl_hours: i64) -> EmailContent {
    EmailContent {
        subject: "Verify your email address - Food Exchange".to_string(),
        body: format!(
            "Welcome to Food Exchange!\n\n\
            Confirm your email address by opening the link below:\n\n\
            {}\n\n\
            This link expires in {} hours.\n\n\
            If you didn't create an account, please ignore this email.",
            verification_url, ttl_hours
        ),
    }
}

pub fn new_offer_email(offerer_name: &str, food_name: &str, listings_url: &str) -> EmailContent {
    EmailContent {
        subject: "New offer on your listing - Food Exchange".to_string(),
        body: format!(
            "{} made an offer on your listing \"{}\".\n\n\
            Review it here: {}",
            offerer_name, food_name, listings_url
        ),
    }
}

pub fn offer_accepted_email(food_name: &str, owner_phone: &str, offers_url: &str) -> EmailContent {
    EmailContent {
        subject: "Your offer was accepted - Food Exchange".to_string(),
        body: format!(
            "Good news! Your offer on \"{}\" was accepted.\n\n\
            Contact the owner to arrange the pickup: {}\n\n\
            Your offers: {}",
            food_name, owner_phone, offers_url
        ),
    }
}

pub fn offer_rejected_email(food_name: &str, browse_url: &str) -> EmailContent {
    EmailContent {
        subject: "Update on your offer - Food Exchange".to_string(),
        body: format!(
            "Your offer on \"{}\" was not accepted.\n\n\
            Other listings are waiting for you: {}",
            food_name, browse_url
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn accepted_email_contains_owner_phone() {
        let email = offer_accepted_email("Lentil soup", "+90 555 000 11 22", "http://x/my-offers");
        assert!(email.body.contains("+90 555 000 11 22"));
        assert!(email.body.contains("Lentil soup"));
    }

    #[actix_web::test]
    async fn disabled_mailer_reports_failure() {
        let content = verification_email("http://x/verify", 24);
        assert!(DisabledMailer.send("a@b.co", &content).await.is_err());
    }
}
