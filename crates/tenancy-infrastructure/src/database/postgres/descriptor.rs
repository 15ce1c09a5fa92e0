//! Key/value connection descriptors to sqlx connect options.

use sqlx::postgres::{PgConnectOptions, PgSslMode};
use tenancy_core::{ConnectionDescriptor, DomainError};
use tracing::debug;

/// Translates a `key=value;` descriptor into [`PgConnectOptions`].
///
/// Recognised keys (case-insensitive): `Host`/`Server`, `Port`,
/// `Database`, `Username`/`User Id`/`User`, `Password`/`Pwd`, `SslMode`,
/// `Application Name`. A `Server=host,port` value carries its port inline.
/// Unknown keys are ignored.
pub fn to_pg_options(descriptor: &ConnectionDescriptor) -> Result<PgConnectOptions, DomainError> {
    let mut options = PgConnectOptions::new();

    for part in descriptor.parts() {
        let (key, value) = part
            .split_once('=')
            .ok_or_else(|| DomainError::Configuration(format!("malformed connection option: {:?}", part)))?;
        let value = value.trim();

        options = match key.trim().to_ascii_lowercase().as_str() {
            "host" | "server" => match value.split_once(',') {
                Some((host, port)) => options.host(host.trim()).port(parse_port(port)?),
                None => options.host(value),
            },
            "port" => options.port(parse_port(value)?),
            "database" => options.database(value),
            "username" | "user id" | "user" => options.username(value),
            "password" | "pwd" => options.password(value),
            "sslmode" | "ssl mode" => options.ssl_mode(
                value
                    .to_ascii_lowercase()
                    .parse::<PgSslMode>()
                    .map_err(|e| DomainError::Configuration(format!("invalid SslMode {:?}: {}", value, e)))?,
            ),
            "application name" => options.application_name(value),
            other => {
                debug!("Ignoring connection option: {}", other);
                options
            }
        };
    }

    Ok(options)
}

fn parse_port(raw: &str) -> Result<u16, DomainError> {
    raw.trim()
        .parse()
        .map_err(|_| DomainError::Configuration(format!("invalid port: {:?}", raw)))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_full_descriptor() {
        let descriptor = ConnectionDescriptor::new(
            "Host=db.internal;Port=6432;Database=Shard3;Username=fleet;Password=secret;SslMode=Disable;",
        );
        let options = to_pg_options(&descriptor).unwrap();
        assert_eq!(options.get_host(), "db.internal");
        assert_eq!(options.get_port(), 6432);
        assert_eq!(options.get_database(), Some("Shard3"));
        assert_eq!(options.get_username(), "fleet");
    }

    #[test]
    fn test_server_alias_with_inline_port() {
        let descriptor = ConnectionDescriptor::new("Server=db,5433;User Id=sa;Database=Master");
        let options = to_pg_options(&descriptor).unwrap();
        assert_eq!(options.get_host(), "db");
        assert_eq!(options.get_port(), 5433);
        assert_eq!(options.get_username(), "sa");
    }

    #[test]
    fn test_invalid_values_are_configuration_errors() {
        for raw in ["Port=abc", "Server=x;SslMode=sometimes", "Server"] {
            assert!(
                matches!(to_pg_options(&ConnectionDescriptor::new(raw)), Err(DomainError::Configuration(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn test_unknown_keys_are_ignored() {
        let descriptor = ConnectionDescriptor::new("Server=db;Trusted_Connection=True;Database=Shard1");
        assert_eq!(to_pg_options(&descriptor).unwrap().get_database(), Some("Shard1"));
    }
}
