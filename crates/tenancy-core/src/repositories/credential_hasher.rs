//! Credential hashing (port)

use crate::error::DomainError;

pub trait CredentialHasher: Send + Sync {
    fn hash(&self, password: &str) -> Result<String, DomainError>;
    fn verify(&self, password: &str, hash: &str) -> Result<bool, DomainError>;
}
