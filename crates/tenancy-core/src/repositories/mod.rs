//! Repository traits (ports)

pub mod credential_hasher;
pub mod tenant_directory;

pub use credential_hasher::CredentialHasher;
pub use tenant_directory::{StoreTenantDirectory, TenantDirectory};

#[cfg(test)]
pub use tenant_directory::MockTenantDirectory;
