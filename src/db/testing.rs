//! In-memory session source used by unit tests. It models a fixed-size pool
//! of numbered connections and records every lifecycle step.

use std::borrow::Cow;
use std::error::Error as StdError;
use std::fmt;
use std::sync::atomic::{AtomicBool, AtomicUsize, Ordering};
use std::sync::{Arc, Mutex};

use async_trait::async_trait;
use sqlx::error::{DatabaseError, ErrorKind};
use tokio::sync::{OwnedSemaphorePermit, Semaphore};

use super::{DbError, SessionSource, UnitOfWork};

#[derive(Debug, Default)]
pub struct Ledger {
    leases: AtomicUsize,
    commits: AtomicUsize,
    rollbacks: AtomicUsize,
    releases: AtomicUsize,
    committed: Mutex<Vec<String>>,
    idle: Mutex<Vec<usize>>,
}

impl Ledger {
    pub fn leases(&self) -> usize {
        self.leases.load(Ordering::SeqCst)
    }

    pub fn commits(&self) -> usize {
        self.commits.load(Ordering::SeqCst)
    }

    pub fn rollbacks(&self) -> usize {
        self.rollbacks.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }

    pub fn committed(&self) -> Vec<String> {
        self.committed.lock().unwrap().clone()
    }

    /// Connections currently sitting in the pool.
    pub fn idle(&self) -> usize {
        self.idle.lock().unwrap().len()
    }
}

pub struct MemorySource {
    ledger: Arc<Ledger>,
    permits: Arc<Semaphore>,
    closed: AtomicBool,
    reachable: AtomicBool,
    fail_commits: AtomicBool,
}

impl MemorySource {
    pub fn new(capacity: usize) -> Self {
        let ledger = Ledger {
            idle: Mutex::new((0..capacity).collect()),
            ..Ledger::default()
        };
        Self {
            ledger: Arc::new(ledger),
            permits: Arc::new(Semaphore::new(capacity)),
            closed: AtomicBool::new(false),
            reachable: AtomicBool::new(true),
            fail_commits: AtomicBool::new(false),
        }
    }

    pub fn ledger(&self) -> Arc<Ledger> {
        Arc::clone(&self.ledger)
    }

    pub fn set_reachable(&self, reachable: bool) {
        self.reachable.store(reachable, Ordering::SeqCst);
    }

    pub fn fail_commits(&self) {
        self.fail_commits.store(true, Ordering::SeqCst);
    }
}

#[async_trait]
impl SessionSource for MemorySource {
    type Unit = MemoryUnit;

    async fn lease(&self) -> Result<MemoryUnit, DbError> {
        if !self.reachable.load(Ordering::SeqCst) {
            return Err(DbError::Connection(sqlx::Error::PoolTimedOut));
        }

        let permit = Arc::clone(&self.permits)
            .acquire_owned()
            .await
            .map_err(|_| DbError::PoolClosed)?;
        let id = self
            .ledger
            .idle
            .lock()
            .unwrap()
            .pop()
            .expect("a permit guarantees an idle connection");
        self.ledger.leases.fetch_add(1, Ordering::SeqCst);

        Ok(MemoryUnit {
            conn: MemoryConnection {
                id,
                pending: Vec::new(),
            },
            ledger: Arc::clone(&self.ledger),
            fail_commit: self.fail_commits.load(Ordering::SeqCst),
            _permit: permit,
        })
    }

    async fn ping(&self) -> Result<(), DbError> {
        if self.reachable.load(Ordering::SeqCst) {
            Ok(())
        } else {
            Err(DbError::Connection(sqlx::Error::PoolTimedOut))
        }
    }

    async fn close(&self) {
        self.closed.store(true, Ordering::SeqCst);
        self.permits.close();
    }

    fn is_closed(&self) -> bool {
        self.closed.load(Ordering::SeqCst)
    }
}

pub struct MemoryConnection {
    id: usize,
    pending: Vec<String>,
}

impl MemoryConnection {
    pub fn id(&self) -> usize {
        self.id
    }

    pub fn write(&mut self, statement: &str) {
        self.pending.push(statement.to_string());
    }
}

pub struct MemoryUnit {
    conn: MemoryConnection,
    ledger: Arc<Ledger>,
    fail_commit: bool,
    _permit: OwnedSemaphorePermit,
}

#[async_trait]
impl UnitOfWork for MemoryUnit {
    type Connection = MemoryConnection;

    fn connection(&mut self) -> &mut MemoryConnection {
        &mut self.conn
    }

    async fn commit(mut self) -> Result<(), DbError> {
        if self.fail_commit {
            return Err(DbError::Transaction(sqlx::Error::Protocol(
                "commit rejected".into(),
            )));
        }
        let pending = std::mem::take(&mut self.conn.pending);
        self.ledger.committed.lock().unwrap().extend(pending);
        self.ledger.commits.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    async fn rollback(mut self) -> Result<(), DbError> {
        self.conn.pending.clear();
        self.ledger.rollbacks.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn abandon(self) {
        self.ledger.rollbacks.fetch_add(1, Ordering::SeqCst);
    }
}

impl Drop for MemoryUnit {
    fn drop(&mut self) {
        self.ledger.idle.lock().unwrap().push(self.conn.id);
        self.ledger.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// A server-side error with a chosen SQLSTATE, as PostgreSQL would report it.
#[derive(Debug)]
pub struct FakeDatabaseError {
    code: &'static str,
    constraint: Option<&'static str>,
}

impl FakeDatabaseError {
    pub fn with_code(code: &'static str) -> Self {
        Self {
            code,
            constraint: None,
        }
    }

    /// SQLSTATE 23505 raised by `constraint`.
    pub fn unique_violation(constraint: &'static str) -> Self {
        Self {
            code: "23505",
            constraint: Some(constraint),
        }
    }
}

impl fmt::Display for FakeDatabaseError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "database error {}", self.code)
    }
}

impl StdError for FakeDatabaseError {}

impl DatabaseError for FakeDatabaseError {
    fn message(&self) -> &str {
        "simulated database error"
    }

    fn code(&self) -> Option<Cow<'_, str>> {
        Some(Cow::Borrowed(self.code))
    }

    fn as_error(&self) -> &(dyn StdError + Send + Sync + 'static) {
        self
    }

    fn as_error_mut(&mut self) -> &mut (dyn StdError + Send + Sync + 'static) {
        self
    }

    fn into_error(self: Box<Self>) -> Box<dyn StdError + Send + Sync + 'static> {
        self
    }

    fn constraint(&self) -> Option<&str> {
        self.constraint
    }

    fn kind(&self) -> ErrorKind {
        if self.code == "23505" {
            ErrorKind::UniqueViolation
        } else {
            ErrorKind::Other
        }
    }
}

// `From<FakeDatabaseError> for sqlx::Error` comes from sqlx's blanket impl over `DatabaseError`.
