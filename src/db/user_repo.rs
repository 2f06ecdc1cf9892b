//! Durable user-name -> record mapping.
//!
//! Each row holds one user's whole document. The `subjects` and `dailylogs`
//! columns are JSON text stored verbatim; the repository (de)serializes them
//! but never inspects their contents.

use chrono::{DateTime, Utc};
use sqlx::SqlitePool;
use thiserror::Error;

use crate::models::{UserPatch, UserRecord};

/// Errors from the document store.
#[derive(Debug, Error)]
pub enum StoreError {
    /// A record with this name already exists.
    #[error("a user named '{0}' already exists")]
    DuplicateKey(String),
    /// Underlying database failure, including connectivity.
    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
    /// A stored JSON column failed to (de)serialize.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

pub struct UserRepository {
    pool: SqlitePool,
}

#[derive(sqlx::FromRow)]
struct UserRow {
    name: String,
    subjects: String,
    dailylogs: String,
    created_at: String,
    updated_at: String,
}

impl UserRow {
    fn into_record(self) -> Result<UserRecord, StoreError> {
        Ok(UserRecord {
            name: self.name,
            subjects: serde_json::from_str(&self.subjects)?,
            dailylogs: serde_json::from_str(&self.dailylogs)?,
            created_at: parse_timestamp(&self.created_at),
            updated_at: parse_timestamp(&self.updated_at),
        })
    }
}

fn parse_timestamp(s: &str) -> DateTime<Utc> {
    DateTime::parse_from_rfc3339(s)
        .map(|dt| dt.with_timezone(&Utc))
        .unwrap_or_else(|_| Utc::now())
}

impl UserRepository {
    pub fn new(pool: SqlitePool) -> Self {
        Self { pool }
    }

    /// Looks up a record by exact name. No case folding.
    pub async fn find_by_name(&self, name: &str) -> Result<Option<UserRecord>, StoreError> {
        let row: Option<UserRow> = sqlx::query_as(
            "SELECT name, subjects, dailylogs, created_at, updated_at FROM users WHERE name = ?",
        )
        .bind(name)
        .fetch_optional(&self.pool)
        .await?;

        row.map(UserRow::into_record).transpose()
    }

    /// Returns the record for `name`, inserting a blank one if absent.
    ///
    /// The insert-or-ignore runs as a single statement so two concurrent
    /// first reads of the same name cannot race each other into an error.
    pub async fn get_or_create(&self, name: &str) -> Result<UserRecord, StoreError> {
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (name, subjects, dailylogs, created_at, updated_at)
            VALUES (?, '[]', '[]', ?, ?)
            ON CONFLICT(name) DO NOTHING
            "#,
        )
        .bind(name)
        .bind(&now)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_name(name)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    /// Replaces only the fields present in `patch`, creating the record with
    /// empty collections if it does not exist. Returns the resulting record.
    ///
    /// A single upsert statement; absent patch fields fall through to the
    /// existing column values (or `[]` on first insert).
    pub async fn upsert_by_name(
        &self,
        name: &str,
        patch: UserPatch,
    ) -> Result<UserRecord, StoreError> {
        let subjects = patch
            .subjects
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let dailylogs = patch
            .dailylogs
            .as_ref()
            .map(serde_json::to_string)
            .transpose()?;
        let now = Utc::now().to_rfc3339();

        sqlx::query(
            r#"
            INSERT INTO users (name, subjects, dailylogs, created_at, updated_at)
            VALUES (?1, COALESCE(?2, '[]'), COALESCE(?3, '[]'), ?4, ?4)
            ON CONFLICT(name) DO UPDATE SET
                subjects = COALESCE(?2, subjects),
                dailylogs = COALESCE(?3, dailylogs),
                updated_at = ?4
            "#,
        )
        .bind(name)
        .bind(&subjects)
        .bind(&dailylogs)
        .bind(&now)
        .execute(&self.pool)
        .await?;

        self.find_by_name(name)
            .await?
            .ok_or(StoreError::Database(sqlx::Error::RowNotFound))
    }

    /// Inserts a new record. Fails with `DuplicateKey` if the name is taken.
    pub async fn create(&self, record: &UserRecord) -> Result<UserRecord, StoreError> {
        let subjects = serde_json::to_string(&record.subjects)?;
        let dailylogs = serde_json::to_string(&record.dailylogs)?;

        let result = sqlx::query(
            r#"
            INSERT INTO users (name, subjects, dailylogs, created_at, updated_at)
            VALUES (?, ?, ?, ?, ?)
            "#,
        )
        .bind(&record.name)
        .bind(&subjects)
        .bind(&dailylogs)
        .bind(record.created_at.to_rfc3339())
        .bind(record.updated_at.to_rfc3339())
        .execute(&self.pool)
        .await;

        match result {
            Ok(_) => Ok(record.clone()),
            Err(e) if is_unique_violation(&e) => {
                Err(StoreError::DuplicateKey(record.name.clone()))
            }
            Err(e) => Err(e.into()),
        }
    }

    /// All known user names, in insertion order.
    pub async fn list_names(&self) -> Result<Vec<String>, StoreError> {
        let names: Vec<(String,)> = sqlx::query_as("SELECT name FROM users ORDER BY id")
            .fetch_all(&self.pool)
            .await?;

        Ok(names.into_iter().map(|(name,)| name).collect())
    }
}

fn is_unique_violation(e: &sqlx::Error) -> bool {
    e.as_database_error()
        .map(|db_err| db_err.is_unique_violation())
        .unwrap_or(false)
}
