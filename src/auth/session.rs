use async_trait::async_trait;
use chrono::{DateTime, Duration, Utc};
use rand::rngs::OsRng;
use rand::RngCore;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::sync::Arc;

use crate::db::models::{Session, User, UserId};
use crate::repository::{RepoResult, RepositoryError};
use crate::state::DbPool;

/// Issues, validates and revokes session tokens. Holds at most one live
/// session per user.
#[async_trait]
pub trait SessionManager: Send + Sync {
    /// Replace any session of `user_id` with a fresh one.
    async fn create_session(&self, user_id: UserId) -> RepoResult<Session>;

    /// Resolve a bearer token to its user. Unknown (or, when enforced, expired)
    /// tokens are NotFound.
    async fn validate_token(&self, token: &str) -> RepoResult<User>;

    /// Delete a session by token. Deleting an unknown token is not an error.
    async fn delete_session(&self, token: &str) -> RepoResult<()>;

    async fn delete_all_sessions_for_user(&self, user_id: UserId) -> RepoResult<()>;
}

pub struct SqliteSessionManager {
    pool: DbPool,
    lifetime: Duration,
    enforce_expiry: bool,
}

impl SqliteSessionManager {
    pub fn new(pool: DbPool, session_hours: u64, enforce_expiry: bool) -> Self {
        Self {
            pool,
            lifetime: Duration::hours(session_hours as i64),
            enforce_expiry,
        }
    }

    fn create_at(&self, user_id: UserId, now: DateTime<Utc>) -> RepoResult<Session> {
        let token = generate_token()?;
        let expires_at = now + self.lifetime;

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        delete_for_user(&tx, user_id)?;
        tx.execute(
            "INSERT INTO sessions (user_id, token, expires_at) VALUES (?1, ?2, ?3)",
            params![user_id, token, expires_at.to_rfc3339()],
        )
        .map_err(|e| match e.sqlite_error_code() {
            // user_id is unique and was just cleared, so only the user FK can fail here.
            Some(ErrorCode::ConstraintViolation) => {
                RepositoryError::NotFound(format!("user {}", user_id))
            }
            _ => e.into(),
        })?;
        let id = tx.last_insert_rowid();

        tx.commit()?;

        tracing::info!("Session created for user {}", user_id);
        Ok(Session {
            id,
            user_id,
            token,
            expires_at,
        })
    }

    fn validate_at(&self, token: &str, now: DateTime<Utc>) -> RepoResult<User> {
        let conn = self.pool.get()?;

        let row = conn
            .query_row(
                "SELECT u.id, u.username, u.email, u.password_hash, u.created_at, s.expires_at
                 FROM sessions s
                 JOIN users u ON u.id = s.user_id
                 WHERE s.token = ?1",
                params![token],
                |row| {
                    Ok((
                        User {
                            id: row.get(0)?,
                            username: row.get(1)?,
                            email: row.get(2)?,
                            password_hash: row.get(3)?,
                            created_at: row.get(4)?,
                        },
                        row.get::<_, String>(5)?,
                    ))
                },
            )
            .optional()?;

        let (user, expires_at) =
            row.ok_or_else(|| RepositoryError::NotFound("session".to_string()))?;

        if self.enforce_expiry && parse_expiry(&expires_at)? <= now {
            tracing::debug!("Rejected expired session for user {}", user.id);
            return Err(RepositoryError::NotFound("session".to_string()));
        }

        Ok(user)
    }
}

#[async_trait]
impl SessionManager for SqliteSessionManager {
    async fn create_session(&self, user_id: UserId) -> RepoResult<Session> {
        self.create_at(user_id, Utc::now())
    }

    async fn validate_token(&self, token: &str) -> RepoResult<User> {
        self.validate_at(token, Utc::now())
    }

    async fn delete_session(&self, token: &str) -> RepoResult<()> {
        let conn = self.pool.get()?;
        conn.execute("DELETE FROM sessions WHERE token = ?1", params![token])?;
        Ok(())
    }

    async fn delete_all_sessions_for_user(&self, user_id: UserId) -> RepoResult<()> {
        let conn = self.pool.get()?;
        delete_for_user(&conn, user_id)
    }
}

fn delete_for_user(conn: &Connection, user_id: UserId) -> RepoResult<()> {
    conn.execute("DELETE FROM sessions WHERE user_id = ?1", params![user_id])?;
    Ok(())
}

fn parse_expiry(raw: &str) -> RepoResult<DateTime<Utc>> {
    DateTime::parse_from_rfc3339(raw)
        .map(|dt| dt.with_timezone(&Utc))
        .map_err(|e| RepositoryError::Conflict(format!("unreadable session expiry {:?}: {}", raw, e)))
}

/// Generate a cryptographically random 32-byte hex token.
pub fn generate_token() -> RepoResult<String> {
    let mut bytes = [0u8; 32];
    OsRng
        .try_fill_bytes(&mut bytes)
        .map_err(|e| RepositoryError::TokenGeneration(e.to_string()))?;
    Ok(hex::encode(bytes))
}

/// Type alias for Arc-wrapped session manager (for AppState)
pub type DynSessionManager = Arc<dyn SessionManager>;
