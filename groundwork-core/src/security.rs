//! Password hashing
//!
//! Digests are Argon2id PHC strings (`$argon2id$v=19$m=...$salt$hash`), so the
//! algorithm, parameters and salt travel with the hash itself.

use argon2::password_hash::{
    rand_core::OsRng, PasswordHash, PasswordHasher, PasswordVerifier, SaltString,
};
use argon2::Argon2;

use crate::error::SecurityError;

/// Produces and checks salted password digests.
#[derive(Clone, Default)]
pub struct PasswordService {
    argon: Argon2<'static>,
}

impl std::fmt::Debug for PasswordService {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("PasswordService").finish_non_exhaustive()
    }
}

impl PasswordService {
    pub fn new() -> Self {
        Self::default()
    }

    /// Hash a password with a fresh random salt.
    pub fn hash_password(&self, password: &str) -> Result<String, SecurityError> {
        let salt = SaltString::generate(&mut OsRng);
        let digest = self.argon.hash_password(password.as_bytes(), &salt)?;
        Ok(digest.to_string())
    }

    /// Check a password against a stored digest.
    ///
    /// A malformed digest and a wrong password both yield `false`, so callers
    /// cannot tell the two apart.
    pub fn verify_password(&self, digest: &str, password: &str) -> bool {
        let Ok(parsed) = PasswordHash::new(digest) else {
            tracing::debug!("stored digest could not be parsed");
            return false;
        };
        self.argon
            .verify_password(password.as_bytes(), &parsed)
            .is_ok()
    }
}
