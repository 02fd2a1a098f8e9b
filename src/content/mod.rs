// Content store - posts, comments, categories and images
pub mod images;

use async_trait::async_trait;
use rusqlite::{params, Connection, OptionalExtension, Row, TransactionBehavior};
use std::collections::BTreeSet;
use std::sync::Arc;

use crate::db::models::{
    CommentId, CommentRecord, NewComment, NewPost, PostId, PostRecord, UserId,
};
use crate::repository::{RepoResult, RepositoryError};
use crate::state::DbPool;

/// Which posts a listing shows. All listings are newest first.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Feed {
    Home,
    Category(String),
    Author(UserId),
    /// Posts the given user upvoted.
    Liked(UserId),
}

#[async_trait]
pub trait ContentStore: Send + Sync {
    async fn create_post(&self, post: NewPost) -> RepoResult<PostId>;

    async fn create_comment(&self, comment: NewComment) -> RepoResult<CommentId>;

    async fn post(&self, id: PostId) -> RepoResult<Option<PostRecord>>;

    async fn list_posts(&self, feed: &Feed) -> RepoResult<Vec<PostRecord>>;

    /// Comments on a post, oldest first.
    async fn comments_for_post(&self, post: PostId) -> RepoResult<Vec<CommentRecord>>;
}

pub struct SqliteContentStore {
    pool: DbPool,
}

impl SqliteContentStore {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

const POST_SELECT: &str = "SELECT p.id, p.author_id, u.username, p.title, p.content, p.created_at
     FROM posts p
     JOIN users u ON u.id = p.author_id";

fn post_from_row(row: &Row<'_>) -> rusqlite::Result<PostRecord> {
    Ok(PostRecord {
        id: row.get(0)?,
        author_id: row.get(1)?,
        author: row.get(2)?,
        title: row.get(3)?,
        content: row.get(4)?,
        categories: Vec::new(),
        images: Vec::new(),
        created_at: row.get(5)?,
    })
}

/// Fill in the categories and images of a post row.
fn hydrate(conn: &Connection, mut post: PostRecord) -> RepoResult<PostRecord> {
    let mut stmt =
        conn.prepare_cached("SELECT category FROM categories WHERE post_id = ?1 ORDER BY category")?;
    post.categories = stmt
        .query_map(params![post.id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    let mut stmt =
        conn.prepare_cached("SELECT payload FROM images WHERE post_id = ?1 ORDER BY position")?;
    post.images = stmt
        .query_map(params![post.id], |row| row.get(0))?
        .collect::<Result<Vec<String>, _>>()?;

    Ok(post)
}

fn normalize_categories(categories: &[String]) -> BTreeSet<String> {
    categories
        .iter()
        .map(|c| c.trim())
        .filter(|c| !c.is_empty())
        .map(str::to_string)
        .collect()
}

#[async_trait]
impl ContentStore for SqliteContentStore {
    async fn create_post(&self, post: NewPost) -> RepoResult<PostId> {
        if post.title.trim().is_empty() {
            return Err(RepositoryError::InvalidInput("post title is empty".into()));
        }
        if post.content.trim().is_empty() {
            return Err(RepositoryError::InvalidInput("can't create an empty post".into()));
        }
        let categories = normalize_categories(&post.categories);
        if categories.is_empty() {
            return Err(RepositoryError::InvalidInput(
                "a post needs at least one category".into(),
            ));
        }

        let mut conn = self.pool.get()?;
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        tx.execute(
            "INSERT INTO posts (author_id, title, content) VALUES (?1, ?2, ?3)",
            params![post.author_id, post.title, post.content],
        )?;
        let id = PostId(tx.last_insert_rowid());

        for category in &categories {
            tx.execute(
                "INSERT INTO categories (post_id, category) VALUES (?1, ?2)",
                params![id, category],
            )?;
        }
        for (position, payload) in post.images.iter().enumerate() {
            tx.execute(
                "INSERT INTO images (post_id, position, payload) VALUES (?1, ?2, ?3)",
                params![id, position as i64, payload],
            )?;
        }

        tx.commit()?;

        tracing::info!(
            "Post {} created by user {} ({} images)",
            id,
            post.author_id,
            post.images.len()
        );
        Ok(id)
    }

    async fn create_comment(&self, comment: NewComment) -> RepoResult<CommentId> {
        if comment.content.trim().is_empty() {
            return Err(RepositoryError::InvalidInput(
                "can't create an empty comment".into(),
            ));
        }

        let conn = self.pool.get()?;

        let exists: bool = conn.query_row(
            "SELECT COUNT(*) > 0 FROM posts WHERE id = ?1",
            params![comment.post_id],
            |row| row.get(0),
        )?;
        if !exists {
            return Err(RepositoryError::NotFound(format!("post {}", comment.post_id)));
        }

        conn.execute(
            "INSERT INTO comments (author_id, post_id, content) VALUES (?1, ?2, ?3)",
            params![comment.author_id, comment.post_id, comment.content],
        )?;

        Ok(CommentId(conn.last_insert_rowid()))
    }

    async fn post(&self, id: PostId) -> RepoResult<Option<PostRecord>> {
        let conn = self.pool.get()?;

        let row = conn
            .query_row(
                &format!("{} WHERE p.id = ?1", POST_SELECT),
                params![id],
                post_from_row,
            )
            .optional()?;

        row.map(|post| hydrate(&conn, post)).transpose()
    }

    async fn list_posts(&self, feed: &Feed) -> RepoResult<Vec<PostRecord>> {
        let conn = self.pool.get()?;

        let rows = match feed {
            Feed::Home => {
                let mut stmt = conn.prepare(&format!("{} ORDER BY p.id DESC", POST_SELECT))?;
                let rows = stmt.query_map([], post_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            Feed::Category(category) => {
                let mut stmt = conn.prepare(&format!(
                    "{} JOIN categories c ON c.post_id = p.id
                     WHERE c.category = ?1 ORDER BY p.id DESC",
                    POST_SELECT
                ))?;
                let rows = stmt.query_map(params![category], post_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            Feed::Author(author) => {
                let mut stmt = conn.prepare(&format!(
                    "{} WHERE p.author_id = ?1 ORDER BY p.id DESC",
                    POST_SELECT
                ))?;
                let rows = stmt.query_map(params![author], post_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
            Feed::Liked(viewer) => {
                let mut stmt = conn.prepare(&format!(
                    "{} JOIN reactions r ON r.post_id = p.id
                     WHERE r.user_id = ?1 AND r.vote = 1 ORDER BY p.id DESC",
                    POST_SELECT
                ))?;
                let rows = stmt.query_map(params![viewer], post_from_row)?;
                rows.collect::<Result<Vec<_>, _>>()?
            }
        };

        rows.into_iter().map(|post| hydrate(&conn, post)).collect()
    }

    async fn comments_for_post(&self, post: PostId) -> RepoResult<Vec<CommentRecord>> {
        let conn = self.pool.get()?;

        let mut stmt = conn.prepare(
            "SELECT c.id, c.post_id, c.author_id, u.username, c.content, c.created_at
             FROM comments c
             JOIN users u ON u.id = c.author_id
             WHERE c.post_id = ?1
             ORDER BY c.id ASC",
        )?;

        let comments = stmt
            .query_map(params![post], |row| {
                Ok(CommentRecord {
                    id: row.get(0)?,
                    post_id: row.get(1)?,
                    author_id: row.get(2)?,
                    author: row.get(3)?,
                    content: row.get(4)?,
                    created_at: row.get(5)?,
                })
            })?
            .collect::<Result<Vec<_>, _>>()?;

        Ok(comments)
    }
}

/// Type alias for Arc-wrapped content store (for AppState)
pub type DynContentStore = Arc<dyn ContentStore>;
