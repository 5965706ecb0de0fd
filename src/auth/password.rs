use crate::error::AppError;
use tracing::warn;

/// One-way password hashing over bcrypt.
///
/// The cost factor is taken from configuration at construction. Hashing and
/// verification are CPU-bound and deliberately slow; callers on an async
/// runtime should push them onto the blocking pool (see `AuthService`).
#[derive(Debug, Clone)]
pub struct PasswordHasher {
    cost: u32,
}

impl PasswordHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }

    pub fn hash(&self, plaintext: &str) -> Result<String, AppError> {
        bcrypt::hash(plaintext, self.cost)
            .map_err(|e| AppError::InternalError(format!("Password hashing failed: {}", e)))
    }

    /// Returns true iff `plaintext` matches `hash` under bcrypt's own
    /// constant-time comparison. A malformed hash encoding is treated as a
    /// non-match rather than an error.
    pub fn verify(&self, plaintext: &str, hash: &str) -> bool {
        match bcrypt::verify(plaintext, hash) {
            Ok(matched) => matched,
            Err(e) => {
                warn!("Rejecting credential with undecodable password hash: {}", e);
                false
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt's minimum cost, to keep the suite fast
    fn hasher() -> PasswordHasher {
        PasswordHasher::new(4)
    }

    #[test]
    fn test_hash_and_verify_round_trip() {
        let hasher = hasher();
        let hash = hasher.hash("secret").unwrap();
        assert_ne!(hash, "secret");
        assert!(hasher.verify("secret", &hash));
        assert!(!hasher.verify("wrong", &hash));
    }

    #[test]
    fn test_hashes_are_salted() {
        let hasher = hasher();
        let first = hasher.hash("secret").unwrap();
        let second = hasher.hash("secret").unwrap();
        assert_ne!(first, second);
        assert!(hasher.verify("secret", &first));
        assert!(hasher.verify("secret", &second));
    }

    #[test]
    fn test_unicode_password() {
        let hasher = hasher();
        let hash = hasher.hash("pässwörd🔒").unwrap();
        assert!(hasher.verify("pässwörd🔒", &hash));
        assert!(!hasher.verify("password", &hash));
    }

    #[test]
    fn test_empty_password_hashes() {
        // The verifier itself accepts the empty string; signup rejects it
        // before it ever reaches hashing.
        let hasher = hasher();
        let hash = hasher.hash("").unwrap();
        assert!(hasher.verify("", &hash));
        assert!(!hasher.verify("x", &hash));
    }

    #[test]
    fn test_malformed_hash_is_no_match() {
        let hasher = hasher();
        assert!(!hasher.verify("secret", "not-a-bcrypt-hash"));
        assert!(!hasher.verify("secret", ""));
    }
}
