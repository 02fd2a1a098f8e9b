// Domain types - Pure, no side effects
use serde::{Serialize, Serializer};
use std::fmt;
use std::str::FromStr;

use crate::db::models::{CommentId, PostId};
use crate::repository::RepositoryError;

/// A requested reaction. Only the two values the ledger stores exist.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Vote {
    Up,
    Down,
}

impl Vote {
    pub fn value(self) -> i64 {
        match self {
            Self::Up => 1,
            Self::Down => -1,
        }
    }

    pub fn from_value(value: i64) -> Option<Self> {
        match value {
            1 => Some(Self::Up),
            -1 => Some(Self::Down),
            _ => None,
        }
    }
}

/// Parses the form value submitted by the client (`"1"` or `"-1"`).
impl FromStr for Vote {
    type Err = RepositoryError;

    fn from_str(raw: &str) -> Result<Self, Self::Err> {
        raw.trim()
            .parse::<i64>()
            .ok()
            .and_then(Self::from_value)
            .ok_or_else(|| RepositoryError::InvalidVoteValue(raw.to_string()))
    }
}

/// State of one (voter, target) pair.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum VoteState {
    #[default]
    NoVote,
    Upvoted,
    Downvoted,
}

/// What the ledger must do to storage to move between states.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum LedgerAction {
    Insert(Vote),
    Delete,
    /// Delete the existing row, then insert the new vote.
    Replace(Vote),
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Transition {
    pub next: VoteState,
    pub action: LedgerAction,
}

impl VoteState {
    /// Map a stored row (or its absence) to a state.
    pub fn from_stored(vote: Option<i64>) -> Result<Self, RepositoryError> {
        match vote {
            None => Ok(Self::NoVote),
            Some(1) => Ok(Self::Upvoted),
            Some(-1) => Ok(Self::Downvoted),
            Some(other) => Err(RepositoryError::Conflict(format!(
                "stored vote {} is outside {{1, -1}}",
                other
            ))),
        }
    }

    /// Signed value as rendered to viewers: 1, -1, or 0 for no vote.
    pub fn value(self) -> i64 {
        match self {
            Self::NoVote => 0,
            Self::Upvoted => 1,
            Self::Downvoted => -1,
        }
    }

    /// Toggle transition. Repeating the current vote clears it, the opposite
    /// vote replaces it.
    pub fn apply(self, requested: Vote) -> Transition {
        match (self, requested) {
            (Self::NoVote, vote) => Transition {
                next: Self::voted(vote),
                action: LedgerAction::Insert(vote),
            },
            (Self::Upvoted, Vote::Up) | (Self::Downvoted, Vote::Down) => Transition {
                next: Self::NoVote,
                action: LedgerAction::Delete,
            },
            (Self::Upvoted, Vote::Down) | (Self::Downvoted, Vote::Up) => Transition {
                next: Self::voted(requested),
                action: LedgerAction::Replace(requested),
            },
        }
    }

    fn voted(vote: Vote) -> Self {
        match vote {
            Vote::Up => Self::Upvoted,
            Vote::Down => Self::Downvoted,
        }
    }
}

impl Serialize for VoteState {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_i64(self.value())
    }
}

impl fmt::Display for VoteState {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::NoVote => write!(f, "NoVote"),
            Self::Upvoted => write!(f, "Upvoted"),
            Self::Downvoted => write!(f, "Downvoted"),
        }
    }
}

/// The entity a reaction applies to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum Target {
    Post(PostId),
    Comment(CommentId),
}

impl Target {
    /// Column in `reactions` holding this target's key.
    pub(crate) fn column(self) -> &'static str {
        match self {
            Self::Post(_) => "post_id",
            Self::Comment(_) => "comment_id",
        }
    }

    pub(crate) fn key(self) -> i64 {
        match self {
            Self::Post(id) => id.get(),
            Self::Comment(id) => id.get(),
        }
    }
}

impl fmt::Display for Target {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Post(id) => write!(f, "post {}", id),
            Self::Comment(id) => write!(f, "comment {}", id),
        }
    }
}

/// Result of a toggle: the state the pair ended in and the post the target
/// belongs to (the post itself for post targets).
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ToggleOutcome {
    pub post_id: PostId,
    pub state: VoteState,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_only_the_two_vote_values() {
        assert_eq!("1".parse::<Vote>().unwrap(), Vote::Up);
        assert_eq!("+1".parse::<Vote>().unwrap(), Vote::Up);
        assert_eq!(" -1 ".parse::<Vote>().unwrap(), Vote::Down);

        for raw in ["0", "2", "-2", "like", "", "1.0", "99999999999999999999"] {
            assert!(
                matches!(raw.parse::<Vote>(), Err(RepositoryError::InvalidVoteValue(_))),
                "{:?} should be rejected",
                raw
            );
        }
    }

    #[test]
    fn transition_table() {
        use LedgerAction::*;
        use VoteState::*;

        let cases = [
            (NoVote, Vote::Up, Upvoted, Insert(Vote::Up)),
            (NoVote, Vote::Down, Downvoted, Insert(Vote::Down)),
            (Upvoted, Vote::Up, NoVote, Delete),
            (Upvoted, Vote::Down, Downvoted, Replace(Vote::Down)),
            (Downvoted, Vote::Down, NoVote, Delete),
            (Downvoted, Vote::Up, Upvoted, Replace(Vote::Up)),
        ];

        for (current, requested, next, action) in cases {
            let t = current.apply(requested);
            assert_eq!(t.next, next, "{} + {:?}", current, requested);
            assert_eq!(t.action, action, "{} + {:?}", current, requested);
        }
    }

    #[test]
    fn same_vote_twice_returns_to_no_vote() {
        for vote in [Vote::Up, Vote::Down] {
            let once = VoteState::NoVote.apply(vote).next;
            assert_eq!(once.apply(vote).next, VoteState::NoVote);
        }
    }

    #[test]
    fn opposite_vote_flips() {
        let up = VoteState::NoVote.apply(Vote::Up).next;
        assert_eq!(up.apply(Vote::Down).next, VoteState::Downvoted);
    }

    #[test]
    fn stored_values_map_to_states() {
        assert_eq!(VoteState::from_stored(None).unwrap(), VoteState::NoVote);
        assert_eq!(VoteState::from_stored(Some(1)).unwrap(), VoteState::Upvoted);
        assert_eq!(
            VoteState::from_stored(Some(-1)).unwrap(),
            VoteState::Downvoted
        );
        assert!(matches!(
            VoteState::from_stored(Some(0)),
            Err(RepositoryError::Conflict(_))
        ));
    }

    #[test]
    fn vote_state_serializes_as_signed_integer() {
        assert_eq!(serde_json::to_string(&VoteState::NoVote).unwrap(), "0");
        assert_eq!(serde_json::to_string(&VoteState::Upvoted).unwrap(), "1");
        assert_eq!(serde_json::to_string(&VoteState::Downvoted).unwrap(), "-1");
    }
}
