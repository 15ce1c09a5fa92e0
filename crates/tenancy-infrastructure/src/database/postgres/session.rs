// ============================================================================
// Tenancy Infrastructure - PostgreSQL Store Session
// File: crates/tenancy-infrastructure/src/database/postgres/session.rs
// ============================================================================
//! Document-table store session on a PostgreSQL pool.
//!
//! Every table has the columns `id BIGSERIAL`, `owner_id BIGINT NULL`,
//! `is_deleted BOOLEAN` and `body JSONB`. The tenant and soft-delete filters
//! are evaluated by the database.

use async_trait::async_trait;
use serde_json::Value;
use sqlx::types::Json;
use sqlx::{FromRow, PgPool, Postgres, Transaction};
use tracing::{debug, error};

use tenancy_core::persistence::{validate_table_name, RowQuery, RowValues, StoreSession, StoredRow};
use tenancy_core::DomainError;

const ROW_FILTER: &str = r#"
    ($1::BIGINT IS NULL OR owner_id IS NULL OR owner_id = $1)
    AND ($2 OR NOT is_deleted)
    AND ($3::JSONB IS NULL OR body @> $3)
    AND ($4::TEXT IS NULL OR body->>($5::TEXT) ILIKE '%' || $4 || '%')
"#;

/// Writes never touch rows owned by another tenant; `$2` is the writer.
const OWNER_GUARD: &str = "($2::BIGINT IS NULL OR owner_id IS NULL OR owner_id = $2)";

pub struct PgStoreSession {
    pool: PgPool,
    tx: Option<Transaction<'static, Postgres>>,
}

impl PgStoreSession {
    pub fn new(pool: PgPool) -> Self {
        Self { pool, tx: None }
    }
}

// Internal row type for SQLx mapping
#[derive(Debug, FromRow)]
struct DocumentRow {
    pub id: i64,
    pub owner_id: Option<i64>,
    pub is_deleted: bool,
    pub body: Json<Value>,
}

impl From<DocumentRow> for StoredRow {
    fn from(row: DocumentRow) -> Self {
        StoredRow {
            id: row.id,
            owner_id: row.owner_id,
            is_deleted: row.is_deleted,
            body: row.body.0,
        }
    }
}

/// Double-quoted identifier; quoting keeps validated names case-exact.
fn quoted(table: &str) -> Result<String, DomainError> {
    validate_table_name(table)?;
    Ok(format!("\"{}\"", table))
}

/// Escapes `%`, `_` and `\` so the needle matches literally inside ILIKE.
fn escape_like(needle: &str) -> String {
    let mut escaped = String::with_capacity(needle.len());
    for c in needle.chars() {
        if matches!(c, '%' | '_' | '\\') {
            escaped.push('\\');
        }
        escaped.push(c);
    }
    escaped
}

fn db_error<'a>(operation: &'static str, table: &'a str) -> impl FnOnce(sqlx::Error) -> DomainError + 'a {
    move |e| {
        error!("Database error during {} on {}: {}", operation, table, e);
        DomainError::DatabaseError(e.to_string())
    }
}

struct FilterBinds {
    owner: Option<i64>,
    include_deleted: bool,
    matching: Option<Json<Value>>,
    needle: Option<String>,
    field: Option<String>,
}

impl From<&RowQuery> for FilterBinds {
    fn from(query: &RowQuery) -> Self {
        FilterBinds {
            owner: query.owner,
            include_deleted: query.include_deleted,
            matching: query.matching.clone().map(Json),
            needle: query.search.as_ref().map(|s| escape_like(&s.needle)),
            field: query.search.as_ref().map(|s| s.field.clone()),
        }
    }
}

#[async_trait]
impl StoreSession for PgStoreSession {
    async fn find(&mut self, table: &str, id: i64) -> Result<Option<StoredRow>, DomainError> {
        let sql = format!("SELECT id, owner_id, is_deleted, body FROM {} WHERE id = $1", quoted(table)?);
        let query = sqlx::query_as::<_, DocumentRow>(&sql).bind(id);
        let row = match self.tx.as_mut() {
            Some(tx) => query.fetch_optional(&mut **tx).await,
            None => query.fetch_optional(&self.pool).await,
        }
        .map_err(db_error("find", table))?;

        Ok(row.map(|r| r.into()))
    }

    async fn query(&mut self, table: &str, query: &RowQuery) -> Result<Vec<StoredRow>, DomainError> {
        let sql = format!(
            "SELECT id, owner_id, is_deleted, body FROM {} WHERE {} ORDER BY id OFFSET $6 LIMIT $7",
            quoted(table)?,
            ROW_FILTER
        );
        let binds = FilterBinds::from(query);
        let statement = sqlx::query_as::<_, DocumentRow>(&sql)
            .bind(binds.owner)
            .bind(binds.include_deleted)
            .bind(binds.matching)
            .bind(binds.needle)
            .bind(binds.field)
            .bind(query.offset as i64)
            .bind(query.limit.map(|l| l as i64));
        let rows = match self.tx.as_mut() {
            Some(tx) => statement.fetch_all(&mut **tx).await,
            None => statement.fetch_all(&self.pool).await,
        }
        .map_err(db_error("query", table))?;

        Ok(rows.into_iter().map(|r| r.into()).collect())
    }

    async fn count(&mut self, table: &str, query: &RowQuery) -> Result<u64, DomainError> {
        let sql = format!("SELECT COUNT(*) FROM {} WHERE {}", quoted(table)?, ROW_FILTER);
        let binds = FilterBinds::from(query);
        let statement = sqlx::query_scalar::<_, i64>(&sql)
            .bind(binds.owner)
            .bind(binds.include_deleted)
            .bind(binds.matching)
            .bind(binds.needle)
            .bind(binds.field);
        let count = match self.tx.as_mut() {
            Some(tx) => statement.fetch_one(&mut **tx).await,
            None => statement.fetch_one(&self.pool).await,
        }
        .map_err(db_error("count", table))?;

        Ok(count.max(0) as u64)
    }

    async fn insert(&mut self, table: &str, values: RowValues) -> Result<i64, DomainError> {
        let sql = format!(
            "INSERT INTO {} (owner_id, is_deleted, body) VALUES ($1, $2, $3) RETURNING id",
            quoted(table)?
        );
        let statement = sqlx::query_scalar::<_, i64>(&sql)
            .bind(values.owner_id)
            .bind(values.is_deleted)
            .bind(Json(values.body));
        let id = match self.tx.as_mut() {
            Some(tx) => statement.fetch_one(&mut **tx).await,
            None => statement.fetch_one(&self.pool).await,
        }
        .map_err(db_error("insert", table))?;

        debug!(table, id, "Inserted row");
        Ok(id)
    }

    async fn update(
        &mut self,
        table: &str,
        id: i64,
        owner: Option<i64>,
        values: RowValues,
    ) -> Result<u64, DomainError> {
        let sql = format!(
            "UPDATE {} SET owner_id = $3, is_deleted = $4, body = $5 WHERE id = $1 AND {}",
            quoted(table)?,
            OWNER_GUARD
        );
        let statement = sqlx::query(&sql)
            .bind(id)
            .bind(owner)
            .bind(values.owner_id)
            .bind(values.is_deleted)
            .bind(Json(values.body));
        let result = match self.tx.as_mut() {
            Some(tx) => statement.execute(&mut **tx).await,
            None => statement.execute(&self.pool).await,
        }
        .map_err(db_error("update", table))?;

        Ok(result.rows_affected())
    }

    async fn delete(&mut self, table: &str, id: i64, owner: Option<i64>) -> Result<u64, DomainError> {
        let sql = format!("DELETE FROM {} WHERE id = $1 AND {}", quoted(table)?, OWNER_GUARD);
        let statement = sqlx::query(&sql).bind(id).bind(owner);
        let result = match self.tx.as_mut() {
            Some(tx) => statement.execute(&mut **tx).await,
            None => statement.execute(&self.pool).await,
        }
        .map_err(db_error("delete", table))?;

        Ok(result.rows_affected())
    }

    async fn begin(&mut self) -> Result<(), DomainError> {
        if self.tx.is_some() {
            return Err(DomainError::InvalidUsage("transaction already open on session".into()));
        }
        let tx = self.pool.begin().await.map_err(db_error("begin", "session"))?;
        self.tx = Some(tx);
        Ok(())
    }

    async fn commit(&mut self) -> Result<(), DomainError> {
        let tx = self
            .tx
            .take()
            .ok_or_else(|| DomainError::InvalidUsage("no transaction open on session".into()))?;
        tx.commit().await.map_err(db_error("commit", "session"))
    }

    async fn rollback(&mut self) -> Result<(), DomainError> {
        match self.tx.take() {
            Some(tx) => tx.rollback().await.map_err(db_error("rollback", "session")),
            None => Ok(()),
        }
    }

    fn in_transaction(&self) -> bool {
        self.tx.is_some()
    }
}
