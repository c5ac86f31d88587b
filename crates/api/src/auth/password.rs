//! Argon2id password hashing.
//!
//! Hashes are stored in PHC string form, which embeds the parameters and
//! salt.

use argon2::password_hash::rand_core::OsRng;
use argon2::password_hash::{PasswordHash, PasswordHasher, PasswordVerifier, SaltString};
use argon2::Argon2;

/// Minimum accepted password length.
pub const MIN_PASSWORD_LENGTH: usize = 8;

pub fn hash_password(password: &str) -> Result<String, argon2::password_hash::Error> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = Argon2::default().hash_password(password.as_bytes(), &salt)?;
    Ok(hash.to_string())
}

/// `Ok(false)` for a wrong password; `Err` only for a malformed hash.
pub fn verify_password(password: &str, hash: &str) -> Result<bool, argon2::password_hash::Error> {
    let parsed = PasswordHash::new(hash)?;
    match Argon2::default().verify_password(password.as_bytes(), &parsed) {
        Ok(()) => Ok(true),
        Err(argon2::password_hash::Error::Password) => Ok(false),
        Err(e) => Err(e),
    }
}

/// Length plus at least one letter and one digit.
pub fn validate_password_strength(password: &str, min_length: usize) -> Result<(), String> {
    if password.chars().count() < min_length {
        return Err(format!(
            "Password must be at least {min_length} characters long"
        ));
    }
    let has_letter = password.chars().any(char::is_alphabetic);
    let has_digit = password.chars().any(|c| c.is_ascii_digit());
    if !has_letter || !has_digit {
        return Err("Password must contain at least one letter and one digit".to_string());
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let hash = hash_password("s3cure-enough").unwrap();
        assert!(hash.starts_with("$argon2id$"));
        assert!(verify_password("s3cure-enough", &hash).unwrap());
        assert!(!verify_password("not-it-99", &hash).unwrap());
    }

    #[test]
    fn malformed_hash_is_an_error() {
        assert!(verify_password("whatever1", "plain-text").is_err());
    }

    #[test]
    fn strength_rules() {
        assert!(validate_password_strength("abc123", MIN_PASSWORD_LENGTH)
            .unwrap_err()
            .contains("at least 8"));
        assert!(validate_password_strength("onlyletters", MIN_PASSWORD_LENGTH).is_err());
        assert!(validate_password_strength("12345678", MIN_PASSWORD_LENGTH).is_err());
        assert!(validate_password_strength("letters123", MIN_PASSWORD_LENGTH).is_ok());
    }
}
