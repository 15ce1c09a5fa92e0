//! Domain services

pub mod tenant_resolver;

pub use tenant_resolver::TenantResolver;
