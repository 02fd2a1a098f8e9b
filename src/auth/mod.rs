pub mod credentials;
pub mod handlers;
pub mod session;
pub mod validation;

pub use credentials::{CredentialStore, SqliteCredentialStore};
pub use session::{SessionManager, SqliteSessionManager};
