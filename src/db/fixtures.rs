// Test-only database helpers shared by the repository test modules
use rusqlite::params;
use tempfile::TempDir;

use crate::db::models::{CommentId, PostId, UserId};
use crate::db::{create_pool, run_migrations};
use crate::state::DbPool;

pub fn test_pool() -> (DbPool, TempDir) {
    let temp_dir = TempDir::new().unwrap();
    let pool = create_pool(&temp_dir.path().join("test.db")).unwrap();
    run_migrations(&pool).unwrap();
    (pool, temp_dir)
}

pub fn insert_user(pool: &DbPool, username: &str) -> UserId {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO users (username, email, password_hash) VALUES (?1, ?2, 'not-a-hash')",
        params![username, format!("{}@example.com", username)],
    )
    .unwrap();
    UserId(conn.last_insert_rowid())
}

pub fn insert_post(pool: &DbPool, author: UserId, title: &str) -> PostId {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO posts (author_id, title, content) VALUES (?1, ?2, 'body')",
        params![author, title],
    )
    .unwrap();
    PostId(conn.last_insert_rowid())
}

pub fn insert_comment(pool: &DbPool, author: UserId, post: PostId) -> CommentId {
    let conn = pool.get().unwrap();
    conn.execute(
        "INSERT INTO comments (author_id, post_id, content) VALUES (?1, ?2, 'nice')",
        params![author, post],
    )
    .unwrap();
    CommentId(conn.last_insert_rowid())
}

pub fn reaction_rows(pool: &DbPool, user: UserId, column: &str, key: i64) -> i64 {
    let conn = pool.get().unwrap();
    conn.query_row(
        &format!(
            "SELECT COUNT(*) FROM reactions WHERE user_id = ?1 AND {} = ?2",
            column
        ),
        params![user, key],
        |row| row.get(0),
    )
    .unwrap()
}
