//! PBKDF2-SHA256 password hashing.
//!
//! Hashes are stored as `pbkdf2-sha256$<iterations>$<salt_hex>$<hash_hex>`,
//! so the iteration count can be raised later without invalidating existing
//! credentials.

use pbkdf2::pbkdf2_hmac;
use sha2::Sha256;

use crate::{EngineError, ResultEngine};

pub const DEFAULT_ITERATIONS: u32 = 100_000;
const SCHEME: &str = "pbkdf2-sha256";
const SALT_LEN: usize = 16;
const HASH_LEN: usize = 32;
pub(crate) const MIN_PASSWORD_LEN: usize = 8;

pub(crate) fn validate_password(password: &str) -> ResultEngine<()> {
    if password.chars().count() < MIN_PASSWORD_LEN {
        return Err(EngineError::InvalidName(format!(
            "password must be at least {MIN_PASSWORD_LEN} characters"
        )));
    }
    Ok(())
}

pub(crate) fn hash_password(password: &str, iterations: u32) -> ResultEngine<String> {
    let mut salt = [0u8; SALT_LEN];
    getrandom::getrandom(&mut salt)
        .map_err(|e| EngineError::Internal(format!("RNG failure: {e}")))?;

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    Ok(format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode(salt),
        hex::encode(hash)
    ))
}

/// A well-formed hash no password matches. Verifying against it costs the
/// same as a real check, so unknown logins take as long as wrong passwords.
pub(crate) fn decoy_hash(iterations: u32) -> String {
    format!(
        "{SCHEME}${iterations}${}${}",
        hex::encode([0u8; SALT_LEN]),
        hex::encode([0u8; HASH_LEN])
    )
}

/// [`hash_password`] on the blocking pool.
pub(crate) async fn hash_password_blocking(password: &str, iterations: u32) -> ResultEngine<String> {
    let password = password.to_string();
    tokio::task::spawn_blocking(move || hash_password(&password, iterations))
        .await
        .map_err(|e| EngineError::Internal(format!("password hashing task: {e}")))?
}

/// [`verify_password`] on the blocking pool.
pub(crate) async fn verify_password_blocking(password: &str, stored: &str) -> ResultEngine<bool> {
    let password = password.to_string();
    let stored = stored.to_string();
    tokio::task::spawn_blocking(move || verify_password(&password, &stored))
        .await
        .map_err(|e| EngineError::Internal(format!("password check task: {e}")))
}

pub(crate) fn verify_password(password: &str, stored: &str) -> bool {
    let mut parts = stored.split('$');
    let (Some(SCHEME), Some(iterations), Some(salt_hex), Some(hash_hex), None) = (
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
        parts.next(),
    ) else {
        return false;
    };
    let Ok(iterations) = iterations.parse::<u32>() else {
        return false;
    };
    let Ok(salt) = hex::decode(salt_hex) else {
        return false;
    };
    let Ok(expected) = hex::decode(hash_hex) else {
        return false;
    };

    let mut hash = [0u8; HASH_LEN];
    pbkdf2_hmac::<Sha256>(password.as_bytes(), &salt, iterations, &mut hash);

    hash.len() == expected.len()
        && hash
            .iter()
            .zip(expected.iter())
            .fold(0u8, |acc, (a, b)| acc | (a ^ b))
            == 0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() {
        let stored = hash_password("correct horse", 1_000).unwrap();
        assert!(stored.starts_with("pbkdf2-sha256$1000$"));
        assert!(verify_password("correct horse", &stored));
        assert!(!verify_password("wrong horse", &stored));
    }

    #[test]
    fn salts_differ() {
        let a = hash_password("same-password", 1_000).unwrap();
        let b = hash_password("same-password", 1_000).unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn malformed_hashes_never_verify() {
        assert!(!verify_password("x", ""));
        assert!(!verify_password("x", "plain"));
        assert!(!verify_password("x", "pbkdf2-sha256$abc$00$00"));
        assert!(!verify_password("x", "md5$1$00$00"));
    }

    #[test]
    fn decoy_hash_never_verifies() {
        let decoy = decoy_hash(1_000);
        assert!(decoy.starts_with("pbkdf2-sha256$1000$"));
        assert!(!verify_password("", &decoy));
        assert!(!verify_password("correct horse", &decoy));
    }

    #[tokio::test]
    async fn blocking_helpers_agree_with_sync_ones() {
        let stored = hash_password_blocking("correct horse", 1_000).await.unwrap();
        assert!(verify_password_blocking("correct horse", &stored).await.unwrap());
        assert!(!verify_password_blocking("wrong horse", &stored).await.unwrap());
    }

    #[test]
    fn short_passwords_are_rejected() {
        assert!(validate_password("short").is_err());
        assert!(validate_password("long enough").is_ok());
    }
}
