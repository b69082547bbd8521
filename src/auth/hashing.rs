//! Password hashing primitives used by the credential verifier.

use argon2::{
    password_hash::SaltString, Algorithm, Argon2, Params, PasswordHash, PasswordHasher,
    PasswordVerifier, Version,
};
use rand::rngs::OsRng;

use crate::errors::{Error, Result};

pub fn password_hasher() -> Argon2<'static> {
    // Tuned for interactive API calls: Argon2id with moderate memory and a single iteration
    // keeps verification under 10ms on development hardware while retaining side-channel
    // protections.
    const MEMORY_COST_KIB: u32 = 768;
    const ITERATIONS: u32 = 1;
    const PARALLELISM: u32 = 1;
    let params = Params::new(MEMORY_COST_KIB, ITERATIONS, PARALLELISM, Some(32))
        .expect("valid Argon2 parameters");
    Argon2::new(Algorithm::Argon2id, Version::V0x13, params)
}

/// Hash a password for storage.
pub fn hash_password(password: &str) -> Result<String> {
    let salt = SaltString::generate(&mut OsRng);
    let hash = password_hasher()
        .hash_password(password.as_bytes(), &salt)
        .map_err(|err| Error::internal(format!("Failed to hash password: {}", err)))?;
    Ok(hash.to_string())
}

/// Verify a candidate password against a stored hash.
pub fn verify_password(password: &str, stored: &str) -> Result<bool> {
    let parsed = PasswordHash::new(stored)
        .map_err(|err| Error::internal(format!("Invalid password hash: {}", err)))?;
    Ok(password_hasher().verify_password(password.as_bytes(), &parsed).is_ok())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hash_and_verify_round_trip() {
        let hash = hash_password("correct horse battery staple").unwrap();
        assert!(verify_password("correct horse battery staple", &hash).unwrap());
        assert!(!verify_password("wrong password", &hash).unwrap());
    }

    #[test]
    fn verify_rejects_garbage_hash() {
        assert!(verify_password("anything", "not-a-phc-string").is_err());
    }
}
