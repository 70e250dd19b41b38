use std::borrow::Cow;
use std::str::FromStr;

use async_trait::async_trait;
use log::LevelFilter;
use sqlx::postgres::{PgConnectOptions, PgPoolOptions};
use sqlx::{ConnectOptions, PgConnection, PgPool, Postgres, Transaction};

use super::{DbError, SessionSource, UnitOfWork};
use crate::config::Settings;

/// PostgreSQL connection pool backing the application's sessions.
#[derive(Debug, Clone)]
pub struct PgSessionSource {
    pool: PgPool,
}

impl PgSessionSource {
    /// Builds the pool without opening a connection; the server is first
    /// contacted when a session is leased. Fails only if `connection_string`
    /// cannot be parsed. With `debug` set every executed statement is logged.
    pub fn create_pool(connection_string: &str, debug: bool) -> Result<Self, DbError> {
        Self::with_options(connection_string, debug, PgPoolOptions::new())
    }

    /// Like [`create_pool`](Self::create_pool), sized and timed by `settings`.
    pub fn from_settings(settings: &Settings) -> Result<Self, DbError> {
        let options = PgPoolOptions::new()
            .max_connections(settings.database_max_connections)
            .acquire_timeout(settings.database_acquire_timeout);
        Self::with_options(&settings.database_url, settings.debug, options)
    }

    fn with_options(
        connection_string: &str,
        debug: bool,
        options: PgPoolOptions,
    ) -> Result<Self, DbError> {
        let connect = PgConnectOptions::from_str(&normalize_url(connection_string))
            .map_err(DbError::Connection)?;
        let connect = if debug {
            connect.log_statements(LevelFilter::Info)
        } else {
            connect.disable_statement_logging()
        };

        Ok(Self {
            pool: options.connect_lazy_with(connect),
        })
    }

    pub fn pool(&self) -> &PgPool {
        &self.pool
    }
}

#[async_trait]
impl SessionSource for PgSessionSource {
    type Unit = PgUnitOfWork;

    async fn lease(&self) -> Result<PgUnitOfWork, DbError> {
        let tx = self.pool.begin().await.map_err(DbError::from_lease)?;
        Ok(PgUnitOfWork { tx })
    }

    async fn ping(&self) -> Result<(), DbError> {
        sqlx::query("SELECT 1")
            .execute(&self.pool)
            .await
            .map(|_| ())
            .map_err(DbError::from_lease)
    }

    async fn close(&self) {
        self.pool.close().await;
    }

    fn is_closed(&self) -> bool {
        self.pool.is_closed()
    }
}

/// A PostgreSQL transaction on a pooled connection. If it is dropped while
/// still open, sqlx queues a rollback before the connection is reused.
pub struct PgUnitOfWork {
    tx: Transaction<'static, Postgres>,
}

#[async_trait]
impl UnitOfWork for PgUnitOfWork {
    type Connection = PgConnection;

    fn connection(&mut self) -> &mut PgConnection {
        &mut self.tx
    }

    async fn commit(self) -> Result<(), DbError> {
        self.tx.commit().await.map_err(DbError::Transaction)
    }

    async fn rollback(self) -> Result<(), DbError> {
        self.tx.rollback().await.map_err(DbError::Transaction)
    }
}

/// Drops a driver suffix from the scheme (`postgresql+asyncpg://`) so such
/// URLs keep working.
fn normalize_url(url: &str) -> Cow<'_, str> {
    match url.split_once("://") {
        Some((scheme, rest)) if scheme.contains('+') => {
            let base = scheme.split('+').next().unwrap_or(scheme);
            Cow::Owned(format!("{}://{}", base, rest))
        }
        _ => Cow::Borrowed(url),
    }
}
