use std::sync::Arc;

use r2d2::Pool;
use r2d2_sqlite::SqliteConnectionManager;

use crate::auth::credentials::{DynCredentialStore, SqliteCredentialStore};
use crate::auth::session::{DynSessionManager, SqliteSessionManager};
use crate::config::Config;
use crate::content::{DynContentStore, SqliteContentStore};
use crate::reactions::aggregate::DynAggregates;
use crate::reactions::ledger::DynVoteLedger;
use crate::reactions::{SqliteAggregates, SqliteVoteLedger};

pub type DbPool = Pool<SqliteConnectionManager>;

#[derive(Clone)]
pub struct AppState {
    pub db: DbPool,
    pub config: Config,
    pub sessions: DynSessionManager,
    pub credentials: DynCredentialStore,
    pub ledger: DynVoteLedger,
    pub aggregates: DynAggregates,
    pub content: DynContentStore,
}

impl AppState {
    /// Wire every component to the same pool.
    pub fn new(db: DbPool, config: Config) -> Self {
        let sessions = Arc::new(SqliteSessionManager::new(
            db.clone(),
            config.auth.session_hours,
            config.auth.enforce_expiry,
        ));
        let credentials = Arc::new(SqliteCredentialStore::new(
            db.clone(),
            config.auth.bcrypt_cost,
        ));

        Self {
            sessions,
            credentials,
            ledger: Arc::new(SqliteVoteLedger::new(db.clone())),
            aggregates: Arc::new(SqliteAggregates::new(db.clone())),
            content: Arc::new(SqliteContentStore::new(db.clone())),
            db,
            config,
        }
    }
}
