use async_trait::async_trait;
use rusqlite::{params, ErrorCode, OptionalExtension, Row};
use std::sync::Arc;

use crate::auth::validation::validate_new_user;
use crate::db::models::{NewUser, User, UserId};
use crate::repository::{RepoResult, RepositoryError};
use crate::state::DbPool;

#[async_trait]
pub trait CredentialStore: Send + Sync {
    /// Validate, hash and persist a new user.
    async fn create_user(&self, user: NewUser) -> RepoResult<UserId>;

    /// Check a username/password pair. Unknown users and wrong passwords are
    /// indistinguishable to the caller.
    async fn verify(&self, username: &str, password: &str) -> RepoResult<User>;

    async fn user(&self, id: UserId) -> RepoResult<Option<User>>;
}

pub struct SqliteCredentialStore {
    pool: DbPool,
    bcrypt_cost: u32,
}

impl SqliteCredentialStore {
    pub fn new(pool: DbPool, bcrypt_cost: u32) -> Self {
        Self { pool, bcrypt_cost }
    }
}

const USER_COLUMNS: &str = "id, username, email, password_hash, created_at";

fn user_from_row(row: &Row<'_>) -> rusqlite::Result<User> {
    Ok(User {
        id: row.get(0)?,
        username: row.get(1)?,
        email: row.get(2)?,
        password_hash: row.get(3)?,
        created_at: row.get(4)?,
    })
}

#[async_trait]
impl CredentialStore for SqliteCredentialStore {
    async fn create_user(&self, user: NewUser) -> RepoResult<UserId> {
        validate_new_user(&user).map_err(RepositoryError::InvalidInput)?;

        let conn = self.pool.get()?;

        let email_taken: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE email = ?1",
            params![user.email],
            |row| row.get(0),
        )?;
        if email_taken {
            return Err(RepositoryError::AlreadyExists("email".to_string()));
        }

        let username_taken: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM users WHERE username = ?1",
            params![user.username],
            |row| row.get(0),
        )?;
        if username_taken {
            return Err(RepositoryError::AlreadyExists("username".to_string()));
        }

        let password_hash = bcrypt::hash(&user.password, self.bcrypt_cost)?;

        // A sign-up racing this one can still trip the UNIQUE constraints.
        conn.execute(
            "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, ?3)",
            params![user.username, user.email, password_hash],
        )
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => {
                RepositoryError::AlreadyExists("username or email".to_string())
            }
            _ => e.into(),
        })?;

        let id = UserId(conn.last_insert_rowid());
        tracing::info!("Created user {} ({})", user.username, id);
        Ok(id)
    }

    async fn verify(&self, username: &str, password: &str) -> RepoResult<User> {
        let conn = self.pool.get()?;

        let user = conn
            .query_row(
                &format!("SELECT {} FROM users WHERE username = ?1", USER_COLUMNS),
                params![username],
                user_from_row,
            )
            .optional()?
            .ok_or(RepositoryError::InvalidCredentials)?;

        if !bcrypt::verify(password, &user.password_hash).unwrap_or(false) {
            return Err(RepositoryError::InvalidCredentials);
        }

        Ok(user)
    }

    async fn user(&self, id: UserId) -> RepoResult<Option<User>> {
        let conn = self.pool.get()?;
        Ok(conn
            .query_row(
                &format!("SELECT {} FROM users WHERE id = ?1", USER_COLUMNS),
                params![id],
                user_from_row,
            )
            .optional()?)
    }
}

/// Type alias for Arc-wrapped credential store (for AppState)
pub type DynCredentialStore = Arc<dyn CredentialStore>;
