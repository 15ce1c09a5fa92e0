//! Shard connection routing.

use std::fmt;

use serde::{Deserialize, Serialize};
use tenancy_shared::constants::DATABASE_KEY;
use tenancy_shared::config::ShardingSettings;
use tenancy_shared::ShardId;

use crate::error::DomainError;

/// A `key=value;` connection string for one database.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct ConnectionDescriptor(String);

impl ConnectionDescriptor {
    pub fn new(value: impl Into<String>) -> Self {
        Self(value.into())
    }

    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Value of `key` (case-insensitive), trimmed.
    pub fn get(&self, key: &str) -> Option<&str> {
        self.parts().find_map(|part| {
            let (k, v) = part.split_once('=')?;
            k.trim().eq_ignore_ascii_case(key).then(|| v.trim())
        })
    }

    pub fn database(&self) -> Option<&str> {
        self.get(DATABASE_KEY)
    }

    /// Non-empty `key=value` parts in order.
    pub fn parts(&self) -> impl Iterator<Item = &str> {
        self.0.split(';').map(str::trim).filter(|p| !p.is_empty())
    }
}

impl fmt::Display for ConnectionDescriptor {
    /// Prints the descriptor with any password masked.
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        for part in self.parts() {
            match part.split_once('=') {
                Some((k, _)) if k.trim().eq_ignore_ascii_case("password") || k.trim().eq_ignore_ascii_case("pwd") => {
                    write!(f, "{}=***;", k.trim())?
                }
                _ => write!(f, "{};", part)?,
            }
        }
        Ok(())
    }
}

/// Maps shard numbers to connection descriptors.
///
/// `route` is a pure function of the base template and the shard id: any
/// `Database=` part of the template is dropped and `Database=<prefix><id>` is
/// appended, so routing the same shard twice always yields the same
/// descriptor.
#[derive(Debug, Clone)]
pub struct ShardConnectionRouter {
    base_parts: Vec<String>,
    prefix: String,
}

impl ShardConnectionRouter {
    /// Fails when no base connection template is configured.
    pub fn new(settings: &ShardingSettings) -> Result<Self, DomainError> {
        let template = settings
            .base_connection
            .as_deref()
            .filter(|t| !t.trim().is_empty())
            .ok_or_else(|| {
                DomainError::Configuration("sharding.base_connection is not configured".into())
            })?;
        settings.validate()?;

        let base_parts = ConnectionDescriptor::new(template)
            .parts()
            .filter(|part| {
                part.split_once('=')
                    .map_or(true, |(k, _)| !k.trim().eq_ignore_ascii_case(DATABASE_KEY))
            })
            .map(str::to_string)
            .collect();

        Ok(Self { base_parts, prefix: settings.database_prefix.clone() })
    }

    pub fn route(&self, shard: ShardId) -> ConnectionDescriptor {
        let mut descriptor = String::new();
        for part in &self.base_parts {
            descriptor.push_str(part);
            descriptor.push(';');
        }
        descriptor.push_str(&format!("{}={}{};", DATABASE_KEY, self.prefix, shard));
        ConnectionDescriptor(descriptor)
    }
}
