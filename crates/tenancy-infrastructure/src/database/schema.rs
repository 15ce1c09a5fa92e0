//! Document-table bootstrap.

use sqlx::PgPool;
use tracing::{error, info};

use tenancy_core::persistence::validate_table_name;
use tenancy_core::DomainError;

/// Creates the document tables (and their filter indexes) if they are missing.
pub async fn ensure_document_tables(pool: &PgPool, tables: &[&str]) -> Result<(), DomainError> {
    for table in tables {
        for statement in ddl(table)? {
            sqlx::query(&statement).execute(pool).await.map_err(|e| {
                error!("Database error creating table {}: {}", table, e);
                DomainError::DatabaseError(e.to_string())
            })?;
        }
        info!(table, "Document table ready");
    }
    Ok(())
}

fn ddl(table: &str) -> Result<Vec<String>, DomainError> {
    validate_table_name(table)?;
    Ok(vec![
        format!(
            r#"CREATE TABLE IF NOT EXISTS "{t}" (
                id BIGSERIAL PRIMARY KEY,
                owner_id BIGINT NULL,
                is_deleted BOOLEAN NOT NULL DEFAULT FALSE,
                body JSONB NOT NULL
            )"#,
            t = table
        ),
        format!(r#"CREATE INDEX IF NOT EXISTS "{t}_owner_idx" ON "{t}" (owner_id) WHERE NOT is_deleted"#, t = table),
        format!(r#"CREATE INDEX IF NOT EXISTS "{t}_body_idx" ON "{t}" USING GIN (body jsonb_path_ops)"#, t = table),
    ])
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_ddl_for_valid_table() {
        let statements = ddl("vehicles").unwrap();
        assert_eq!(statements.len(), 3);
        assert!(statements[0].starts_with(r#"CREATE TABLE IF NOT EXISTS "vehicles""#));
        assert!(statements[2].contains("jsonb_path_ops"));
    }

    #[test]
    fn test_ddl_rejects_bad_names() {
        assert!(ddl("Vehicles").is_err());
        assert!(ddl("a b").is_err());
    }
}
