// Vote ledger - the only writer of the reactions table
use async_trait::async_trait;
use rusqlite::{params, Connection, ErrorCode, OptionalExtension, TransactionBehavior};
use std::sync::Arc;

use crate::db::models::{PostId, UserId};
use crate::reactions::domain::{LedgerAction, Target, ToggleOutcome, Vote, VoteState};
use crate::repository::{RepoResult, RepositoryError};
use crate::state::DbPool;

#[async_trait]
pub trait VoteLedger: Send + Sync {
    /// Apply a toggle for (voter, target) and return the resulting state.
    async fn toggle(&self, voter: UserId, target: Target, vote: Vote) -> RepoResult<ToggleOutcome>;

    /// Current state of (voter, target) without changing it.
    async fn current(&self, voter: UserId, target: Target) -> RepoResult<VoteState>;
}

pub struct SqliteVoteLedger {
    pool: DbPool,
}

impl SqliteVoteLedger {
    pub fn new(pool: DbPool) -> Self {
        Self { pool }
    }
}

#[async_trait]
impl VoteLedger for SqliteVoteLedger {
    async fn toggle(&self, voter: UserId, target: Target, vote: Vote) -> RepoResult<ToggleOutcome> {
        let mut conn = self.pool.get()?;

        // IMMEDIATE takes the write lock before the read, so two toggles on the
        // same pair can never both observe NoVote.
        let tx = conn.transaction_with_behavior(TransactionBehavior::Immediate)?;

        let post_id = resolve_post(&tx, target)?;
        let current = VoteState::from_stored(stored_vote(&tx, voter, target)?)?;
        let transition = current.apply(vote);

        match transition.action {
            LedgerAction::Insert(v) => insert_vote(&tx, voter, target, v)?,
            LedgerAction::Delete => delete_vote(&tx, voter, target)?,
            LedgerAction::Replace(v) => {
                delete_vote(&tx, voter, target)?;
                insert_vote(&tx, voter, target, v)?;
            }
        }

        tx.commit()?;

        tracing::debug!(
            "user {} on {}: {} -> {}",
            voter,
            target,
            current,
            transition.next
        );

        Ok(ToggleOutcome {
            post_id,
            state: transition.next,
        })
    }

    async fn current(&self, voter: UserId, target: Target) -> RepoResult<VoteState> {
        let conn = self.pool.get()?;
        VoteState::from_stored(stored_vote(&conn, voter, target)?)
    }
}

/// Post the target belongs to. Fails with NotFound if the target is gone.
fn resolve_post(conn: &Connection, target: Target) -> RepoResult<PostId> {
    let sql = match target {
        Target::Post(_) => "SELECT id FROM posts WHERE id = ?1",
        Target::Comment(_) => "SELECT post_id FROM comments WHERE id = ?1",
    };

    conn.query_row(sql, params![target.key()], |row| row.get(0))
        .optional()?
        .ok_or_else(|| RepositoryError::NotFound(target.to_string()))
}

fn stored_vote(conn: &Connection, voter: UserId, target: Target) -> RepoResult<Option<i64>> {
    let sql = format!(
        "SELECT vote FROM reactions WHERE user_id = ?1 AND {} = ?2",
        target.column()
    );
    Ok(conn
        .query_row(&sql, params![voter, target.key()], |row| row.get(0))
        .optional()?)
}

fn insert_vote(conn: &Connection, voter: UserId, target: Target, vote: Vote) -> RepoResult<()> {
    let sql = format!(
        "INSERT INTO reactions (user_id, {}, vote) VALUES (?1, ?2, ?3)",
        target.column()
    );
    conn.execute(&sql, params![voter, target.key(), vote.value()])
        .map_err(|e| match e.sqlite_error_code() {
            Some(ErrorCode::ConstraintViolation) => RepositoryError::Conflict(format!(
                "second reaction by user {} on {}",
                voter, target
            )),
            _ => e.into(),
        })?;
    Ok(())
}

fn delete_vote(conn: &Connection, voter: UserId, target: Target) -> RepoResult<()> {
    let sql = format!(
        "DELETE FROM reactions WHERE user_id = ?1 AND {} = ?2",
        target.column()
    );
    conn.execute(&sql, params![voter, target.key()])?;
    Ok(())
}

/// Type alias for Arc-wrapped ledger (for AppState)
pub type DynVoteLedger = Arc<dyn VoteLedger>;

#[cfg(test)]
mod tests {
    use super::*;
    use crate::db::fixtures::*;
    use crate::db::models::CommentId;

    fn setup() -> (SqliteVoteLedger, DbPool, tempfile::TempDir) {
        let (pool, temp) = test_pool();
        (SqliteVoteLedger::new(pool.clone()), pool, temp)
    }

    #[tokio::test]
    async fn upvote_toggles_off_then_flips_to_downvote() {
        let (ledger, pool, _temp) = setup();
        let alice = insert_user(&pool, "alice");
        let post = insert_post(&pool, alice, "hello");
        let target = Target::Post(post);

        let out = ledger.toggle(alice, target, Vote::Up).await.unwrap();
        assert_eq!(out.state, VoteState::Upvoted);
        assert_eq!(out.post_id, post);
        assert_eq!(reaction_rows(&pool, alice, "post_id", post.get()), 1);

        let out = ledger.toggle(alice, target, Vote::Up).await.unwrap();
        assert_eq!(out.state, VoteState::NoVote);
        assert_eq!(reaction_rows(&pool, alice, "post_id", post.get()), 0);

        let out = ledger.toggle(alice, target, Vote::Down).await.unwrap();
        assert_eq!(out.state, VoteState::Downvoted);
        assert_eq!(reaction_rows(&pool, alice, "post_id", post.get()), 1);
        assert_eq!(
            ledger.current(alice, target).await.unwrap(),
            VoteState::Downvoted
        );
    }

    #[tokio::test]
    async fn flip_keeps_exactly_one_row() {
        let (ledger, pool, _temp) = setup();
        let bob = insert_user(&pool, "bob");
        let post = insert_post(&pool, bob, "p");
        let target = Target::Post(post);

        ledger.toggle(bob, target, Vote::Down).await.unwrap();
        let out = ledger.toggle(bob, target, Vote::Up).await.unwrap();
        assert_eq!(out.state, VoteState::Upvoted);
        assert_eq!(reaction_rows(&pool, bob, "post_id", post.get()), 1);

        let conn = pool.get().unwrap();
        let stored: i64 = conn
            .query_row(
                "SELECT vote FROM reactions WHERE user_id = ?1 AND post_id = ?2",
                params![bob, post],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(stored, 1);
    }

    #[tokio::test]
    async fn comment_toggle_returns_owning_post() {
        let (ledger, pool, _temp) = setup();
        let carol = insert_user(&pool, "carol");
        let post = insert_post(&pool, carol, "p");
        let comment = insert_comment(&pool, carol, post);

        let out = ledger
            .toggle(carol, Target::Comment(comment), Vote::Down)
            .await
            .unwrap();
        assert_eq!(out.post_id, post);
        assert_eq!(out.state, VoteState::Downvoted);
        assert_eq!(reaction_rows(&pool, carol, "comment_id", comment.get()), 1);
        // The post itself has no reaction from carol.
        assert_eq!(reaction_rows(&pool, carol, "post_id", post.get()), 0);
    }

    #[tokio::test]
    async fn missing_targets_are_not_found() {
        let (ledger, pool, _temp) = setup();
        let dave = insert_user(&pool, "dave");

        let post = ledger.toggle(dave, Target::Post(PostId(404)), Vote::Up).await;
        assert!(matches!(post, Err(RepositoryError::NotFound(_))));

        let comment = ledger
            .toggle(dave, Target::Comment(CommentId(404)), Vote::Up)
            .await;
        assert!(matches!(comment, Err(RepositoryError::NotFound(_))));
    }

    #[tokio::test]
    async fn failed_insert_rolls_back_the_delete() {
        let (ledger, pool, _temp) = setup();
        let erin = insert_user(&pool, "erin");
        let post = insert_post(&pool, erin, "p");
        let target = Target::Post(post);
        ledger.toggle(erin, target, Vote::Up).await.unwrap();

        // Make every insert into reactions fail, so the replace step dies
        // between its delete and its insert.
        {
            let conn = pool.get().unwrap();
            conn.execute_batch(
                "CREATE TRIGGER block_inserts BEFORE INSERT ON reactions
                 BEGIN SELECT RAISE(ABORT, 'blocked'); END;",
            )
            .unwrap();
        }

        let result = ledger.toggle(erin, target, Vote::Down).await;
        assert!(result.is_err());
        assert_eq!(
            ledger.current(erin, target).await.unwrap(),
            VoteState::Upvoted
        );
        assert_eq!(reaction_rows(&pool, erin, "post_id", post.get()), 1);
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn concurrent_toggles_never_duplicate_rows() {
        let (ledger, pool, _temp) = setup();
        let ledger = Arc::new(ledger);
        let frank = insert_user(&pool, "frank");
        let post = insert_post(&pool, frank, "p");
        let target = Target::Post(post);

        let handles: Vec<_> = (0..8)
            .map(|_| {
                let ledger = ledger.clone();
                tokio::spawn(async move { ledger.toggle(frank, target, Vote::Up).await })
            })
            .collect();

        for handle in handles {
            handle.await.unwrap().unwrap();
        }

        // Eight serialized toggles of the same vote cancel out.
        assert_eq!(reaction_rows(&pool, frank, "post_id", post.get()), 0);
        assert_eq!(
            ledger.current(frank, target).await.unwrap(),
            VoteState::NoVote
        );
    }
}
