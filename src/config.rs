use std::env;
use std::fmt::Display;
use std::ops::RangeInclusive;
use std::str::FromStr;

/// Upper bound for every hour-based setting: ten years.
const MAX_HOURS: i64 = 24 * 365 * 10;

/// Where documents are kept.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum StorageBackend {
    Mongo,
    Memory,
}

impl FromStr for StorageBackend {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "mongo" | "mongodb" => Ok(StorageBackend::Mongo),
            "memory" => Ok(StorageBackend::Memory),
            other => Err(format!("STORAGE_BACKEND must be 'mongo' or 'memory', got '{}'", other)),
        }
    }
}

/// Process-wide settings read once from the environment at startup.
#[derive(Debug, Clone)]
pub struct AppConfig {
    pub host: String,
    pub port: u16,
    pub mongodb_uri: String,
    pub mongodb_database: String,
    pub storage_backend: StorageBackend,
    pub jwt_secret: String,
    pub jwt_ttl_hours: i64,
    pub frontend_url: String,
    pub bcrypt_cost: u32,
    pub verification_ttl_hours: i64,
    pub notification_retention_hours: i64,
    pub cleanup_interval_minutes: u64,
    pub delivery_timeout_seconds: u64,
    pub delivery_queue_capacity: usize,
    pub admin_email: Option<String>,
    pub admin_password: Option<String>,
}

fn var_or(name: &str, default: &str) -> String {
    env::var(name).unwrap_or_else(|_| default.to_string())
}

fn parse_setting<T>(name: &str, raw: Option<String>, default: T, range: RangeInclusive<T>) -> Result<T, String>
where
    T: FromStr + PartialOrd + Display,
{
    let value = match raw {
        Some(raw) => raw
            .trim()
            .parse()
            .map_err(|_| format!("{} must be a valid number, got '{}'", name, raw))?,
        None => default,
    };
    if !range.contains(&value) {
        return Err(format!(
            "{} must be between {} and {}",
            name,
            range.start(),
            range.end()
        ));
    }
    Ok(value)
}

fn parsed_in<T>(name: &str, default: T, range: RangeInclusive<T>) -> Result<T, String>
where
    T: FromStr + PartialOrd + Display,
{
    parse_setting(name, env::var(name).ok(), default, range)
}

impl AppConfig {
    pub fn from_env() -> Result<Self, String> {
        let jwt_secret = env::var("JWT_SECRET")
            .ok()
            .filter(|s| !s.trim().is_empty())
            .ok_or("JWT_SECRET must be set")?;

        Ok(AppConfig {
            host: var_or("HOST", "127.0.0.1"),
            port: parsed_in("PORT", 5000, 1..=u16::MAX)?,
            mongodb_uri: var_or("MONGODB_URI", "mongodb://localhost:27017"),
            mongodb_database: var_or("MONGODB_DATABASE", "food_exchange"),
            storage_backend: var_or("STORAGE_BACKEND", "mongo").parse()?,
            jwt_secret,
            jwt_ttl_hours: parsed_in("JWT_TTL_HOURS", 24, 1..=MAX_HOURS)?,
            frontend_url: var_or("FRONTEND_URL", "http://localhost:3000"),
            bcrypt_cost: parsed_in("BCRYPT_COST", bcrypt::DEFAULT_COST, 4..=31)?,
            verification_ttl_hours: parsed_in("VERIFICATION_TTL_HOURS", 24, 1..=MAX_HOURS)?,
            notification_retention_hours: parsed_in("NOTIFICATION_RETENTION_HOURS", 24, 1..=MAX_HOURS)?,
            cleanup_interval_minutes: parsed_in(
                "NOTIFICATION_CLEANUP_INTERVAL_MINUTES",
                60,
                1..=MAX_HOURS as u64 * 60,
            )?,
            delivery_timeout_seconds: parsed_in("DELIVERY_TIMEOUT_SECONDS", 10, 1..=300)?,
            delivery_queue_capacity: parsed_in("DELIVERY_QUEUE_CAPACITY", 1024, 1..=1_000_000)?,
            admin_email: env::var("ADMIN_EMAIL").ok().filter(|s| !s.trim().is_empty()),
            admin_password: env::var("ADMIN_PASSWORD").ok().filter(|s| !s.is_empty()),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_backend_names() {
        assert_eq!("memory".parse::<StorageBackend>(), Ok(StorageBackend::Memory));
        assert_eq!(" MongoDB ".parse::<StorageBackend>(), Ok(StorageBackend::Mongo));
        assert!("sqlite".parse::<StorageBackend>().is_err());
    }

    #[test]
    fn settings_fall_back_to_default() {
        assert_eq!(parse_setting("JWT_TTL_HOURS", None, 24, 1..=MAX_HOURS), Ok(24));
        assert_eq!(parse_setting("JWT_TTL_HOURS", Some(" 48 ".into()), 24, 1..=MAX_HOURS), Ok(48));
    }

    #[test]
    fn out_of_range_settings_are_rejected() {
        for raw in ["0", "-5", "9223372036854775807"] {
            let parsed = parse_setting("NOTIFICATION_RETENTION_HOURS", Some(raw.into()), 24, 1..=MAX_HOURS);
            assert!(parsed.is_err(), "{}", raw);
        }
        assert!(parse_setting("PORT", Some("0".into()), 5000u16, 1..=u16::MAX).is_err());
        assert!(parse_setting("BCRYPT_COST", Some("3".into()), 10u32, 4..=31).is_err());
        assert!(parse_setting::<i64>("JWT_TTL_HOURS", Some("soon".into()), 24, 1..=MAX_HOURS).is_err());
    }
}
