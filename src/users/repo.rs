use axum::async_trait;
use sqlx::{PgConnection, PgPool};
use tracing::{debug, error, warn};
use uuid::Uuid;

use crate::users::repo_types::{ConflictField, UserRecord};

#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    #[error("{0} already exists")]
    Conflict(ConflictField),

    #[error("user not found")]
    NotFound,

    #[error("database error: {0}")]
    Database(#[from] sqlx::Error),
}

/// Durable user persistence. Lookups only see non-deleted rows.
#[async_trait]
pub trait UserStore: Send + Sync {
    /// Insert a new user, rejecting duplicate id, email or username.
    async fn create(&self, user: &UserRecord) -> Result<(), StoreError>;
    async fn find_by_email(&self, email: &str) -> Result<UserRecord, StoreError>;
    async fn find_by_username(&self, username: &str) -> Result<UserRecord, StoreError>;
}

#[derive(Clone)]
pub struct PgUserStore {
    db: PgPool,
}

impl PgUserStore {
    pub fn new(db: PgPool) -> Self {
        Self { db }
    }
}

#[async_trait]
impl UserStore for PgUserStore {
    async fn create(&self, user: &UserRecord) -> Result<(), StoreError> {
        let mut tx = self.db.begin().await?;

        // Fast path for a precise conflict reason; the unique indexes stay authoritative.
        if exists_by_id(&mut tx, user.id).await? {
            warn!(user_id = %user.id, "create user: id already exists");
            return Err(StoreError::Conflict(ConflictField::Id));
        }
        if exists_by_email(&mut tx, &user.email).await? {
            warn!(user_id = %user.id, "create user: email already exists");
            return Err(StoreError::Conflict(ConflictField::Email));
        }
        if exists_by_username(&mut tx, &user.username).await? {
            warn!(user_id = %user.id, "create user: username already exists");
            return Err(StoreError::Conflict(ConflictField::Username));
        }

        sqlx::query(
            r#"
            INSERT INTO users (
                id, name, username, password, email,
                created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            )
            VALUES ($1, $2, $3, $4, $5, $6, $7, $8, $9, $10, $11)
            "#,
        )
        .bind(user.id)
        .bind(&user.name)
        .bind(&user.username)
        .bind(&user.password_hash)
        .bind(&user.email)
        .bind(user.created_at)
        .bind(user.created_by)
        .bind(user.updated_at)
        .bind(user.updated_by)
        .bind(user.deleted_at)
        .bind(user.deleted_by)
        .execute(&mut *tx)
        .await
        .map_err(map_insert_error)?;

        tx.commit().await?;
        debug!(user_id = %user.id, "user row inserted");
        Ok(())
    }

    async fn find_by_email(&self, email: &str) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, username, password, email,
                   created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            FROM users
            WHERE email = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(email)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }

    async fn find_by_username(&self, username: &str) -> Result<UserRecord, StoreError> {
        sqlx::query_as::<_, UserRecord>(
            r#"
            SELECT id, name, username, password, email,
                   created_at, created_by, updated_at, updated_by, deleted_at, deleted_by
            FROM users
            WHERE username = $1 AND deleted_at IS NULL
            "#,
        )
        .bind(username)
        .fetch_optional(&self.db)
        .await?
        .ok_or(StoreError::NotFound)
    }
}

async fn exists_by_id(conn: &mut PgConnection, id: Uuid) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(r#"SELECT EXISTS (SELECT 1 FROM users WHERE id = $1)"#)
        .bind(id)
        .fetch_one(conn)
        .await
}

async fn exists_by_email(conn: &mut PgConnection, email: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS (SELECT 1 FROM users WHERE email = $1 AND deleted_at IS NULL)"#,
    )
    .bind(email)
    .fetch_one(conn)
    .await
}

async fn exists_by_username(conn: &mut PgConnection, username: &str) -> Result<bool, sqlx::Error> {
    sqlx::query_scalar::<_, bool>(
        r#"SELECT EXISTS (SELECT 1 FROM users WHERE username = $1 AND deleted_at IS NULL)"#,
    )
    .bind(username)
    .fetch_one(conn)
    .await
}

fn map_insert_error(err: sqlx::Error) -> StoreError {
    if let sqlx::Error::Database(db) = &err {
        if db.is_unique_violation() {
            let field = conflict_for_constraint(db.constraint());
            warn!(constraint = ?db.constraint(), field = %field, "unique violation on insert");
            return StoreError::Conflict(field);
        }
    }
    error!(error = %err, "insert user failed");
    StoreError::Database(err)
}

/// Maps a unique index name from the migrations back to the guarded field.
fn conflict_for_constraint(constraint: Option<&str>) -> ConflictField {
    match constraint {
        Some("users_pkey") => ConflictField::Id,
        Some(name) if name.contains("email") => ConflictField::Email,
        _ => ConflictField::Username,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn constraint_names_map_to_fields() {
        assert_eq!(conflict_for_constraint(Some("users_pkey")), ConflictField::Id);
        assert_eq!(
            conflict_for_constraint(Some("users_email_active_key")),
            ConflictField::Email
        );
        assert_eq!(
            conflict_for_constraint(Some("users_username_active_key")),
            ConflictField::Username
        );
        assert_eq!(conflict_for_constraint(None), ConflictField::Username);
    }

    const CREATE_USERS: &str = include_str!("../../migrations/20240101000000_create_users.sql");

    /// `(index name, indexed column)` for every unique index the migration creates.
    fn unique_indexes(sql: &str) -> Vec<(String, String)> {
        sql.split(';')
            .filter_map(|stmt| stmt.trim().strip_prefix("CREATE UNIQUE INDEX"))
            .filter_map(|rest| {
                let rest = rest.trim_start();
                let rest = rest.strip_prefix("IF NOT EXISTS").unwrap_or(rest).trim_start();
                let (name, rest) = rest.split_once(char::is_whitespace)?;
                let column = rest.split_once('(')?.1.split_once(')')?.0;
                Some((name.to_string(), column.trim().to_string()))
            })
            .collect()
    }

    #[test]
    fn migration_index_names_map_to_their_columns() {
        let indexes = unique_indexes(CREATE_USERS);
        assert_eq!(indexes.len(), 2, "{indexes:?}");

        for (name, column) in indexes {
            let expected = match column.as_str() {
                "email" => ConflictField::Email,
                "username" => ConflictField::Username,
                other => panic!("unexpected unique column {other}"),
            };
            assert_eq!(conflict_for_constraint(Some(&name)), expected, "{name}");
        }
    }

    #[test]
    fn migration_primary_key_gets_the_default_pkey_name() {
        // Postgres names an unnamed primary key `<table>_pkey`.
        assert!(CREATE_USERS.contains("CREATE TABLE IF NOT EXISTS users ("));
        let id_line = CREATE_USERS
            .lines()
            .map(str::trim)
            .find(|line| line.starts_with("id "))
            .expect("id column");
        assert!(id_line.contains("PRIMARY KEY"), "{id_line}");
        assert!(!CREATE_USERS.contains("CONSTRAINT users_pkey"));
        assert_eq!(conflict_for_constraint(Some("users_pkey")), ConflictField::Id);
    }

    #[test]
    fn non_database_insert_errors_stay_storage_failures() {
        assert!(matches!(
            map_insert_error(sqlx::Error::PoolTimedOut),
            StoreError::Database(_)
        ));
    }
}
