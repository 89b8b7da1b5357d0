use bcrypt::BcryptError;

pub fn hash_password(password: &str, cost: u32) -> Result<String, BcryptError> {
    bcrypt::hash(password, cost)
}

pub fn verify_password(password: &str, hashed: &str) -> Result<bool, BcryptError> {
    bcrypt::verify(password, hashed)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::test_support::TEST_BCRYPT_COST;

    #[test]
    fn hashes_verify_against_their_password_only() {
        let hashed = hash_password("correct horse", TEST_BCRYPT_COST).unwrap();
        assert_ne!(hashed, "correct horse");
        assert!(verify_password("correct horse", &hashed).unwrap());
        assert!(!verify_password("battery staple", &hashed).unwrap());
    }
}
