// Read-side aggregation: counts and viewer vote, recomputed on every read
use async_trait::async_trait;
use rusqlite::{params, OptionalExtension};
use serde::Serialize;
use std::sync::Arc;

use crate::db::models::{CommentId, PostId, UserId};
use crate::reactions::domain::VoteState;
use crate::repository::{RepoResult, RepositoryError};
use crate::state::DbPool;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct PostTally {
    pub like_count: i64,
    pub dislike_count: i64,
    pub comment_count: i64,
    pub vote: VoteState,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
pub struct CommentTally {
    pub like_count: i64,
    pub dislike_count: i64,
    pub vote: VoteState,
}

#[async_trait]
pub trait Aggregates: Send + Sync {
    /// Counts for a post and the viewer's own vote (NoVote when anonymous).
    async fn post_tally(&self, post: PostId, viewer: Option<UserId>) -> RepoResult<PostTally>;

    async fn comment_tally(
        &self,
        comment: CommentId,
        viewer: Option<UserId>,
    ) -> RepoResult<CommentTally>;
}

pub struct SqliteAggregates {
    pool: DbPool,
}

impl SqliteAggregates {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

// Each tally is one statement so every value comes from the same snapshot.
// A NULL viewer matches no reaction row, which resolves to 0.
const POST_TALLY: &str = "
    SELECT
        (SELECT COUNT(*) FROM reactions WHERE post_id = p.id AND vote = 1),
        (SELECT COUNT(*) FROM reactions WHERE post_id = p.id AND vote = -1),
        (SELECT COUNT(*) FROM comments WHERE post_id = p.id),
        (SELECT vote FROM reactions WHERE post_id = p.id AND user_id = ?2)
    FROM posts p
    WHERE p.id = ?1";

const COMMENT_TALLY: &str = "
    SELECT
        (SELECT COUNT(*) FROM reactions WHERE comment_id = c.id AND vote = 1),
        (SELECT COUNT(*) FROM reactions WHERE comment_id = c.id AND vote = -1),
        (SELECT vote FROM reactions WHERE comment_id = c.id AND user_id = ?2)
    FROM comments c
    WHERE c.id = ?1";

#[async_trait]
impl Aggregates for SqliteAggregates {
    async fn post_tally(&self, post: PostId, viewer: Option<UserId>) -> RepoResult<PostTally> {
        let conn = self.pool.get()?;

        let row: Option<(i64, i64, i64, Option<i64>)> = conn
            .query_row(POST_TALLY, params![post, viewer], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?, row.get(3)?))
            })
            .optional()?;

        let (like_count, dislike_count, comment_count, vote) =
            row.ok_or_else(|| RepositoryError::NotFound(format!("post {}", post)))?;

        Ok(PostTally {
            like_count,
            dislike_count,
            comment_count,
            vote: VoteState::from_stored(vote)?,
        })
    }

    async fn comment_tally(
        &self,
        comment: CommentId,
        viewer: Option<UserId>,
    ) -> RepoResult<CommentTally> {
        let conn = self.pool.get()?;

        let row: Option<(i64, i64, Option<i64>)> = conn
            .query_row(COMMENT_TALLY, params![comment, viewer], |row| {
                Ok((row.get(0)?, row.get(1)?, row.get(2)?))
            })
            .optional()?;

        let (like_count, dislike_count, vote) =
            row.ok_or_else(|| RepositoryError::NotFound(format!("comment {}", comment)))?;

        Ok(CommentTally {
            like_count,
            dislike_count,
            vote: VoteState::from_stored(vote)?,
        })
    }
}

/// Type alias for Arc-wrapped aggregates (for AppState)
pub type DynAggregates = Arc<dyn Aggregates>;
