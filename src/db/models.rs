use chrono::{DateTime, Utc};
use rusqlite::types::{FromSql, FromSqlResult, ToSql, ToSqlOutput, ValueRef};
use serde::{Deserialize, Serialize};
use std::fmt;

/// Integer row ids wrapped so a post id can't be passed where a user id is expected.
macro_rules! id_type {
    ($name:ident) => {
        #[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
        #[serde(transparent)]
        pub struct $name(pub i64);

        impl $name {
            pub fn new(id: i64) -> Self {
                Self(id)
            }

            pub fn get(self) -> i64 {
                self.0
            }
        }

        impl fmt::Display for $name {
            fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
                write!(f, "{}", self.0)
            }
        }

        impl ToSql for $name {
            fn to_sql(&self) -> rusqlite::Result<ToSqlOutput<'_>> {
                self.0.to_sql()
            }
        }

        impl FromSql for $name {
            fn column_result(value: ValueRef<'_>) -> FromSqlResult<Self> {
                i64::column_result(value).map(Self)
            }
        }
    };
}

id_type!(UserId);
id_type!(PostId);
id_type!(CommentId);

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct User {
    pub id: UserId,
    pub username: String,
    pub email: String,
    #[serde(skip_serializing)]
    pub password_hash: String,
    pub created_at: String,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Session {
    pub id: i64,
    pub user_id: UserId,
    pub token: String,
    pub expires_at: DateTime<Utc>,
}

/// Sign-up input as submitted. The password is plaintext until the credential
/// store hashes it.
#[derive(Debug, Clone, Deserialize)]
pub struct NewUser {
    pub email: String,
    pub username: String,
    pub password: String,
    pub confirm_password: String,
}

#[derive(Debug, Clone)]
pub struct NewPost {
    pub author_id: UserId,
    pub title: String,
    pub content: String,
    pub categories: Vec<String>,
    /// Encoded image payloads, in display order.
    pub images: Vec<String>,
}

#[derive(Debug, Clone)]
pub struct NewComment {
    pub author_id: UserId,
    pub post_id: PostId,
    pub content: String,
}

/// A post as stored, without any reaction-derived fields.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct PostRecord {
    pub id: PostId,
    pub author_id: UserId,
    pub author: String,
    pub title: String,
    pub content: String,
    pub categories: Vec<String>,
    pub images: Vec<String>,
    pub created_at: String,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct CommentRecord {
    pub id: CommentId,
    pub post_id: PostId,
    pub author_id: UserId,
    pub author: String,
    pub content: String,
    pub created_at: String,
}
