pub mod aggregate;
pub mod domain;
pub mod ledger;

pub use aggregate::{Aggregates, CommentTally, PostTally, SqliteAggregates};
pub use domain::{Target, ToggleOutcome, Vote, VoteState};
pub use ledger::{SqliteVoteLedger, VoteLedger};
