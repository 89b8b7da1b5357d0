use mongodb::bson::oid::ObjectId;
use rand::Rng;
use rand::distr::Alphanumeric;

use crate::utils::error::CustomError;

const VERIFICATION_TOKEN_LENGTH: usize = 48;

/// Generate a random, URL-safe email verification token
pub fn generate_verification_token() -> String {
    rand::rng()
        .sample_iter(&Alphanumeric)
        .take(VERIFICATION_TOKEN_LENGTH)
        .map(char::from)
        .collect()
}

/// Trims a required field, treating blank input as missing.
pub fn required(value: &Option<String>) -> Option<String> {
    value
        .as_deref()
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Parses an id taken from a path or body. A malformed id cannot name an
/// existing document, so it is reported as not found.
pub fn parse_id(raw: &str, what: &str) -> Result<ObjectId, CustomError> {
    ObjectId::parse_str(raw.trim()).map_err(|_| CustomError::NotFoundError(format!("{} not found", what)))
}

pub fn service_name() -> String {
    std::env::var("SERVICE_NAME").unwrap_or_else(|_| "food-exchange-backend".to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tokens_are_long_and_distinct() {
        let a = generate_verification_token();
        let b = generate_verification_token();
        assert_eq!(a.len(), VERIFICATION_TOKEN_LENGTH);
        assert!(a.chars().all(|c| c.is_ascii_alphanumeric()));
        assert_ne!(a, b);
    }

    #[test]
    fn blank_fields_count_as_missing() {
        assert_eq!(required(&Some("  ".into())), None);
        assert_eq!(required(&None), None);
        assert_eq!(required(&Some(" Ada ".into())), Some("Ada".into()));
    }

    #[test]
    fn malformed_ids_read_as_missing() {
        let err = parse_id("not-an-id", "Listing").unwrap_err();
        assert!(matches!(err, CustomError::NotFoundError(ref m) if m == "Listing not found"));

        let id = ObjectId::new();
        assert_eq!(parse_id(&id.to_hex(), "Listing").unwrap(), id);
    }
}
