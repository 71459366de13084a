//! Password hashing and verification.
//!
//! Argon2id with default parameters, PHC string output (salt embedded), so a
//! stored hash is self-describing and verification needs no side lookups.

use anyhow::{anyhow, Context, Result};
use argon2::{Argon2, PasswordHasher, PasswordVerifier};
use password_hash::{PasswordHash, SaltString};

/// Hash a password with a fresh random salt.
///
/// # Errors
///
/// Returns an error if the OS RNG or the hasher fails; callers must treat
/// this as fatal for the operation, never as "no hash".
pub fn hash(password: &str) -> Result<String> {
    let mut salt_bytes = [0u8; 16];
    getrandom::getrandom(&mut salt_bytes)
        .map_err(|e| anyhow!(e.to_string()))
        .context("failed to generate password salt")?;
    let salt = SaltString::encode_b64(&salt_bytes).map_err(|e| anyhow!(e.to_string()))?;

    let argon2 = Argon2::default();
    let phc = argon2
        .hash_password(password.as_bytes(), &salt)
        .map_err(|e| anyhow!(e.to_string()))
        .context("failed to hash password")?
        .to_string();

    Ok(phc)
}

/// Check a password against a stored PHC hash.
///
/// Any malformed hash verifies as `false`; callers never see an error on
/// this path.
#[must_use]
pub fn verify(password: &str, hash: &str) -> bool {
    if let Ok(parsed) = PasswordHash::new(hash) {
        Argon2::default()
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    } else {
        false
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_then_verify() -> Result<()> {
        let phc = hash("wonderland")?;

        assert!(verify("wonderland", &phc));
        assert!(!verify("looking-glass", &phc));
        Ok(())
    }

    #[test]
    fn hashes_are_salted() -> Result<()> {
        let first = hash("wonderland")?;
        let second = hash("wonderland")?;

        assert_ne!(first, second);
        Ok(())
    }

    #[test]
    fn malformed_hash_never_verifies() {
        assert!(!verify("wonderland", ""));
        assert!(!verify("wonderland", "not-a-phc-string"));
        assert!(!verify("wonderland", "$argon2id$v=19$truncated"));
    }
}
