use base64::{Engine as _, engine::general_purpose::STANDARD as BASE64};
use hmac::{Hmac, Mac};
use rand::RngCore;
use sha2::{Digest, Sha512};

use crate::error::AppError;

type HmacSha512 = Hmac<Sha512>;

const SALT_LEN: usize = 64;

/// Base64 hash/salt pair as persisted on the users row.
pub struct HashedCredential {
    pub hash: String,
    pub salt: String,
}

pub fn hash_password(password: &str) -> Result<HashedCredential, AppError> {
    let mut salt = [0u8; SALT_LEN];
    rand::rngs::OsRng.fill_bytes(&mut salt);

    let mut mac = HmacSha512::new_from_slice(&salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    mac.update(password.as_bytes());
    let digest = mac.finalize().into_bytes();

    Ok(HashedCredential {
        hash: BASE64.encode(digest),
        salt: BASE64.encode(salt),
    })
}

pub fn verify_password(password: &str, hash: &str, salt: &str) -> Result<bool, AppError> {
    let salt = BASE64
        .decode(salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let expected = BASE64
        .decode(hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;

    let mut mac = HmacSha512::new_from_slice(&salt)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    mac.update(password.as_bytes());

    // verify_slice is constant-time
    Ok(mac.verify_slice(&expected).is_ok())
}

/// Unsalted SHA-512 digest used by accounts created before salting shipped.
/// Rows carrying one are rewritten to the salted form on first login.
pub fn legacy_digest(password: &str) -> String {
    BASE64.encode(Sha512::digest(password.as_bytes()))
}

pub fn verify_legacy_password(password: &str, hash: &str) -> Result<bool, AppError> {
    let expected = BASE64
        .decode(hash)
        .map_err(|e| AppError::InternalServerError(e.to_string()))?;
    let digest = Sha512::digest(password.as_bytes());

    Ok(digest.as_slice() == expected.as_slice())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify_roundtrip() {
        let cred = hash_password("correct horse battery").unwrap();
        assert!(verify_password("correct horse battery", &cred.hash, &cred.salt).unwrap());
    }

    #[test]
    fn wrong_password_is_rejected() {
        let cred = hash_password("correct horse battery").unwrap();
        assert!(!verify_password("incorrect horse battery", &cred.hash, &cred.salt).unwrap());
    }

    #[test]
    fn each_hash_gets_its_own_salt() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert_ne!(a.salt, b.salt);
        assert_ne!(a.hash, b.hash);
    }

    #[test]
    fn salt_is_not_interchangeable() {
        let a = hash_password("same password").unwrap();
        let b = hash_password("same password").unwrap();
        assert!(!verify_password("same password", &a.hash, &b.salt).unwrap());
    }

    #[test]
    fn legacy_digest_verifies() {
        let stored = legacy_digest("old account password");
        assert!(verify_legacy_password("old account password", &stored).unwrap());
        assert!(!verify_legacy_password("guess", &stored).unwrap());
    }

    #[test]
    fn corrupt_stored_hash_is_an_error() {
        assert!(verify_password("pw", "%%% not base64 %%%", "AAAA").is_err());
        assert!(verify_legacy_password("pw", "%%% not base64 %%%").is_err());
    }
}
