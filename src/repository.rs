// Shared error type for every storage-facing component
use thiserror::Error;

#[derive(Debug, Error)]
pub enum RepositoryError {
    #[error("Database error: {0}")]
    Database(#[from] r2d2::Error),

    #[error("SQL error: {0}")]
    Sql(#[from] rusqlite::Error),

    #[error("Password hashing error: {0}")]
    Hash(#[from] bcrypt::BcryptError),

    #[error("Not found: {0}")]
    NotFound(String),

    #[error("Invalid input: {0}")]
    InvalidInput(String),

    #[error("Invalid vote value: {0:?}")]
    InvalidVoteValue(String),

    #[error("{0} is already taken")]
    AlreadyExists(String),

    #[error("Invalid username or password")]
    InvalidCredentials,

    /// A stored row breaks an invariant the writers are supposed to uphold.
    #[error("Conflict: {0}")]
    Conflict(String),

    #[error("Token generation failed: {0}")]
    TokenGeneration(String),
}

impl RepositoryError {
    /// True for failures of the backing store rather than of the caller's input.
    pub fn is_storage(&self) -> bool {
        matches!(self, Self::Database(_) | Self::Sql(_))
    }
}

pub type RepoResult<T> = Result<T, RepositoryError>;

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn storage_errors_are_classified() {
        let sql = RepositoryError::Sql(rusqlite::Error::QueryReturnedNoRows);
        assert!(sql.is_storage());
        assert!(!RepositoryError::NotFound("post 1".into()).is_storage());
        assert!(!RepositoryError::InvalidVoteValue("2".into()).is_storage());
    }

    #[test]
    fn messages_do_not_leak_structure() {
        assert_eq!(
            RepositoryError::AlreadyExists("username".into()).to_string(),
            "username is already taken"
        );
        assert_eq!(
            RepositoryError::InvalidVoteValue("abc".into()).to_string(),
            "Invalid vote value: \"abc\""
        );
    }
}
