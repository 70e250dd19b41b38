use std::sync::Arc;

use async_trait::async_trait;
use futures::future::BoxFuture;

use super::DbError;

/// A pool able to hand out units of work.
#[async_trait]
pub trait SessionSource: Send + Sync + 'static {
    type Unit: UnitOfWork;

    /// Leases a connection and begins a unit of work on it.
    async fn lease(&self) -> Result<Self::Unit, DbError>;

    /// One round trip to the datastore.
    async fn ping(&self) -> Result<(), DbError>;

    /// Closes idle connections now and leased ones as they come back.
    async fn close(&self);

    fn is_closed(&self) -> bool;
}

/// One transaction on one leased connection. Dropping the value returns the
/// connection to its pool.
#[async_trait]
pub trait UnitOfWork: Send + Sized + 'static {
    type Connection: Send;

    fn connection(&mut self) -> &mut Self::Connection;

    async fn commit(self) -> Result<(), DbError>;

    async fn rollback(self) -> Result<(), DbError>;

    /// Invoked when a session is dropped before it completed, e.g. because
    /// the request future was cancelled. Must not block.
    fn abandon(self) {
        drop(self);
    }
}

/// Hands out request-scoped sessions from a shared [`SessionSource`].
///
/// Cloning is cheap; every clone leases from the same pool.
pub struct SessionFactory<S> {
    source: Arc<S>,
}

impl<S> Clone for SessionFactory<S> {
    fn clone(&self) -> Self {
        Self {
            source: Arc::clone(&self.source),
        }
    }
}

impl<S: SessionSource> SessionFactory<S> {
    pub fn new(source: S) -> Self {
        Self {
            source: Arc::new(source),
        }
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    /// Leases one session. The caller owns it until it calls
    /// [`ScopedSession::commit`], [`ScopedSession::rollback`] or
    /// [`ScopedSession::finish`]; dropping it instead rolls back.
    pub async fn acquire_session(&self) -> Result<ScopedSession<S::Unit>, DbError> {
        if self.source.is_closed() {
            return Err(DbError::PoolClosed);
        }

        let unit = self.source.lease().await?;
        log::trace!("session acquired");
        Ok(ScopedSession::new(unit))
    }

    /// Runs `work` inside a fresh session.
    ///
    /// On `Ok` the unit of work is committed; a commit failure is returned as
    /// `E::from(DbError::Transaction)`. On `Err` it is rolled back and the
    /// error from `work` is returned unchanged. The connection goes back to the
    /// pool exactly once on every path, including when the returned future
    /// is dropped half-way.
    pub async fn run_with_session<T, E, F>(&self, work: F) -> Result<T, E>
    where
        F: for<'s> FnOnce(&'s mut ScopedSession<S::Unit>) -> BoxFuture<'s, Result<T, E>>,
        E: From<DbError>,
    {
        let mut session = self.acquire_session().await?;
        let outcome = work(&mut session).await;
        session.finish(outcome).await
    }

    pub async fn ping(&self) -> Result<(), DbError> {
        if self.source.is_closed() {
            return Err(DbError::PoolClosed);
        }
        self.source.ping().await
    }

    /// Closes the pool. Later acquisitions fail with [`DbError::PoolClosed`].
    pub async fn dispose_pool(&self) {
        if self.source.is_closed() {
            log::warn!("connection pool already disposed");
            return;
        }
        self.source.close().await;
        log::info!("connection pool disposed");
    }

    pub fn is_closed(&self) -> bool {
        self.source.is_closed()
    }
}

/// A unit of work bound to one request.
#[must_use = "a session that is dropped without being finished is rolled back"]
pub struct ScopedSession<U: UnitOfWork> {
    unit: Option<U>,
}

impl<U: UnitOfWork> ScopedSession<U> {
    fn new(unit: U) -> Self {
        Self { unit: Some(unit) }
    }

    /// The connection to run statements on.
    pub fn conn(&mut self) -> &mut U::Connection {
        self.unit
            .as_mut()
            .expect("unit of work is present until the session completes")
            .connection()
    }

    pub async fn commit(mut self) -> Result<(), DbError> {
        let unit = self.take_unit();
        let result = unit.commit().await;
        log::trace!("session committed and released");
        result
    }

    pub async fn rollback(mut self) -> Result<(), DbError> {
        let unit = self.take_unit();
        let result = unit.rollback().await;
        log::trace!("session rolled back and released");
        result
    }

    /// Commits on `Ok`, rolls back on `Err`. A failed rollback is logged and
    /// the original error is returned.
    pub async fn finish<T, E>(self, outcome: Result<T, E>) -> Result<T, E>
    where
        E: From<DbError>,
    {
        match outcome {
            Ok(value) => {
                self.commit().await?;
                Ok(value)
            }
            Err(error) => {
                if let Err(rollback_error) = self.rollback().await {
                    log::error!("rollback failed: {}", rollback_error);
                }
                Err(error)
            }
        }
    }

    fn take_unit(&mut self) -> U {
        self.unit
            .take()
            .expect("unit of work is present until the session completes")
    }
}

impl<U: UnitOfWork> Drop for ScopedSession<U> {
    fn drop(&mut self) {
        if let Some(unit) = self.unit.take() {
            log::debug!("session dropped before completion, rolling back");
            unit.abandon();
        }
    }
}
