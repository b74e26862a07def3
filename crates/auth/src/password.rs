//! Password hashing port and its bcrypt adapter.

use thiserror::Error;

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum PasswordError {
    #[error("password hashing failed: {0}")]
    Hash(String),

    #[error("stored password hash is unreadable: {0}")]
    CorruptHash(String),
}

/// One-way password hashing.
pub trait PasswordHasher: Send + Sync {
    fn hash(&self, plain: &str) -> Result<String, PasswordError>;

    /// `Ok(false)` means a well-formed hash that does not match.
    fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError>;
}

/// bcrypt with a configurable work factor.
#[derive(Debug, Clone, Copy)]
pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new(cost: u32) -> Self {
        Self { cost }
    }
}

impl PasswordHasher for BcryptHasher {
    fn hash(&self, plain: &str) -> Result<String, PasswordError> {
        bcrypt::hash(plain, self.cost).map_err(|e| PasswordError::Hash(e.to_string()))
    }

    fn verify(&self, plain: &str, hash: &str) -> Result<bool, PasswordError> {
        bcrypt::verify(plain, hash).map_err(|e| PasswordError::CorruptHash(e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    // bcrypt's minimum cost keeps these fast.
    fn hasher() -> BcryptHasher {
        BcryptHasher::new(4)
    }

    #[test]
    fn hash_differs_from_plaintext_and_verifies() {
        let h = hasher().hash("password123").unwrap();
        assert_ne!(h, "password123");
        assert!(hasher().verify("password123", &h).unwrap());
        assert!(!hasher().verify("wrong", &h).unwrap());
    }

    #[test]
    fn salts_make_hashes_unique() {
        let a = hasher().hash("p").unwrap();
        let b = hasher().hash("p").unwrap();
        assert_ne!(a, b);
    }

    #[test]
    fn invalid_cost_is_reported() {
        assert!(matches!(BcryptHasher::new(2).hash("p"), Err(PasswordError::Hash(_))));
    }

    #[test]
    fn corrupt_hash_is_an_error_not_a_mismatch() {
        assert!(matches!(
            hasher().verify("p", "definitely-not-bcrypt"),
            Err(PasswordError::CorruptHash(_))
        ));
    }
}
