//! Shared SHA-256 / HMAC hex digest utilities.
//!
//! Used for refresh-token hashing and billing webhook signatures.

use hmac::{Hmac, Mac};
use sha2::{Digest, Sha256};

type HmacSha256 = Hmac<Sha256>;

/// Compute a SHA-256 hex digest of the given bytes.
pub fn sha256_hex(data: &[u8]) -> String {
    hex::encode(Sha256::digest(data))
}

fn keyed(secret: &[u8], payload: &[u8]) -> HmacSha256 {
    let mut mac = HmacSha256::new_from_slice(secret).expect("HMAC accepts any key length");
    mac.update(payload);
    mac
}

/// Compute a lowercase hex HMAC-SHA256 of `payload` keyed by `secret`.
pub fn hmac_sha256_hex(secret: &[u8], payload: &[u8]) -> String {
    hex::encode(keyed(secret, payload).finalize().into_bytes())
}

/// Check a hex HMAC-SHA256 against `payload` in constant time.
///
/// Malformed hex never matches.
pub fn verify_hmac_sha256_hex(secret: &[u8], payload: &[u8], signature_hex: &str) -> bool {
    match hex::decode(signature_hex) {
        Ok(signature) => keyed(secret, payload).verify_slice(&signature).is_ok(),
        Err(_) => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_input_produces_known_hash() {
        let hash = sha256_hex(b"");
        assert_eq!(
            hash,
            "e3b0c44298fc1c149afbf4c8996fb92427ae41e4649b934ca495991b7852b855"
        );
    }

    #[test]
    fn hmac_matches_rfc4231_case_2() {
        let sig = hmac_sha256_hex(b"Jefe", b"what do ya want for nothing?");
        assert_eq!(
            sig,
            "5bdcc146bf60754e6a042426089575c75a003f089d2739839dec58b964ec3843"
        );
    }

    #[test]
    fn hmac_verification() {
        let payload = b"what do ya want for nothing?";
        let sig = hmac_sha256_hex(b"Jefe", payload);
        assert!(verify_hmac_sha256_hex(b"Jefe", payload, &sig));
        assert!(verify_hmac_sha256_hex(b"Jefe", payload, &sig.to_uppercase()));
        assert!(!verify_hmac_sha256_hex(b"Jefe", b"other", &sig));
        assert!(!verify_hmac_sha256_hex(b"Jefe", payload, &sig[..62]));
        assert!(!verify_hmac_sha256_hex(b"Jefe", payload, "not-hex"));
    }
}
