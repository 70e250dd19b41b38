//! Database access: the shared connection pool, request-scoped sessions and
//! the schema definitions applied at startup.
//!
//! Route handlers never touch the pool directly. They borrow a
//! [`ScopedSession`] through [`SessionFactory::run_with_session`], which
//! commits when the work succeeds, rolls back when it fails, and returns the
//! connection to the pool either way.

mod postgres;
pub mod schema;
mod session;
#[cfg(test)]
pub(crate) mod testing;

use thiserror::Error;

pub use postgres::{PgSessionSource, PgUnitOfWork};
pub use session::{ScopedSession, SessionFactory, SessionSource, UnitOfWork};

/// The session factory used by the running application.
pub type Database = SessionFactory<PgSessionSource>;

/// Failures of the session layer. None of them are retried here.
#[derive(Debug, Error)]
pub enum DbError {
    /// Malformed connection string, unreachable server, rejected credentials,
    /// missing database or pool acquire timeout.
    #[error("database connection failed: {0}")]
    Connection(#[source] sqlx::Error),
    /// Commit or rollback of a unit of work failed.
    #[error("transaction failed: {0}")]
    Transaction(#[source] sqlx::Error),
    #[error("query failed: {0}")]
    Query(#[source] sqlx::Error),
    /// The pool was disposed; no further sessions are handed out.
    #[error("connection pool is closed")]
    PoolClosed,
}

impl DbError {
    /// Classifies an error raised by a statement. Errors that show the
    /// connection itself is unusable count as [`DbError::Connection`].
    pub fn from_pool(error: sqlx::Error) -> Self {
        if is_connection_failure(&error) {
            return DbError::Connection(error);
        }
        match error {
            sqlx::Error::PoolClosed => DbError::PoolClosed,
            other => DbError::Query(other),
        }
    }

    /// Classifies an error raised while leasing a connection or opening a
    /// transaction on it. Nothing has run yet, so anything other than a
    /// closed pool means the database is not reachable as configured.
    pub fn from_lease(error: sqlx::Error) -> Self {
        match error {
            sqlx::Error::PoolClosed => DbError::PoolClosed,
            other => DbError::Connection(other),
        }
    }
}

fn is_connection_failure(error: &sqlx::Error) -> bool {
    match error {
        sqlx::Error::PoolTimedOut
        | sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::Configuration(_) => true,
        sqlx::Error::Database(db_err) => db_err
            .code()
            .map_or(false, |code| is_connection_sqlstate(&code)),
        _ => false,
    }
}

/// SQLSTATE classes 08 (connection exception), 28 (invalid authorization)
/// and 3D (invalid catalog name), plus 57P0x (server shutting down).
fn is_connection_sqlstate(code: &str) -> bool {
    ["08", "28", "3D", "57P0"]
        .iter()
        .any(|class| code.starts_with(class))
}
