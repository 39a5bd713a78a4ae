//! Storage Layer - SQLite-backed persistence
//!
//! Two independent database files, each owned by one store:
//! - users(username, password)
//! - products(name, cost_price, sell_price, in_stock)
//!
//! Every operation runs inside its own connection scope; no connection
//! outlives the call that opened it.

pub mod schema;
pub mod scope;
pub mod users;
pub mod products;

pub use scope::{ensure_database_file, with_scope};
pub use users::{CredentialStore, LoginOutcome};
pub use products::ProductStore;

/// True when a SQLite failure is a UNIQUE / PRIMARY KEY violation.
pub(crate) fn is_unique_violation(err: &rusqlite::Error) -> bool {
    matches!(
        err,
        rusqlite::Error::SqliteFailure(e, _) if e.code == rusqlite::ErrorCode::ConstraintViolation
    )
}
