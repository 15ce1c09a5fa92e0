//! Password hashing with bcrypt

use tenancy_core::{CredentialHasher, DomainError};

pub struct BcryptHasher {
    cost: u32,
}

impl BcryptHasher {
    pub fn new() -> Self {
        Self::with_cost(bcrypt::DEFAULT_COST)
    }

    /// Tests use `bcrypt::MIN_COST`.
    pub fn with_cost(cost: u32) -> Self {
        Self { cost }
    }
}

impl Default for BcryptHasher {
    fn default() -> Self {
        Self::new()
    }
}

impl CredentialHasher for BcryptHasher {
    fn hash(&self, password: &str) -> Result<String, DomainError> {
        bcrypt::hash(password, self.cost).map_err(|e| DomainError::InternalError(format!("Hash error: {}", e)))
    }

    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError> {
        bcrypt::verify(password, hash).map_err(|e| DomainError::InternalError(format!("Hash error: {}", e)))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hash_and_verify() {
        let hasher = BcryptHasher::with_cost(4);
        let hash = hasher.hash("correct horse").unwrap();
        assert!(hash.starts_with("$2"));
        assert!(hasher.verify("correct horse", &hash).unwrap());
        assert!(!hasher.verify("wrong horse", &hash).unwrap());
    }

    #[test]
    fn test_malformed_hash_is_error() {
        let hasher = BcryptHasher::with_cost(4);
        assert!(hasher.verify("pw", "not-a-hash").is_err());
    }
}
