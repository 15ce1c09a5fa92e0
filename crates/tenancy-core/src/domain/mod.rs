//! Domain types owned by the tenancy core.

pub mod tenant_key;
pub mod tenant_record;

pub use tenant_key::TenantKey;
pub use tenant_record::TenantRecord;
