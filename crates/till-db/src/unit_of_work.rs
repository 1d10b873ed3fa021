//! # Unit of Work
//!
//! One transaction on one pooled connection, covering every write of a
//! multi-step operation.
//!
//! ## Lifecycle
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                                                                         │
//! │  db.begin_unit("commit_sale")     ← acquire connection,                 │
//! │                                     BEGIN IMMEDIATE (write lock)        │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  uow.execute(INSERT ...)          ← writes counted                      │
//! │  uow.execute(UPDATE ...)                                                │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  uow.finish(result)                                                     │
//! │       ├── Ok(v)   → COMMIT  → Ok(v)                                     │
//! │       └── Err(e)  → ROLLBACK                                            │
//! │              ├── writes == 0 → Err(e)                                   │
//! │              └── writes  > 0 → Err(RolledBack { operation, writes, e }) │
//! │                                                                         │
//! │  dropped without finish (panic, cancelled request, timeout)             │
//! │       └── ROLLBACK queued on the connection before it is reused         │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```

use sqlx::sqlite::{SqliteArguments, SqliteConnection, SqliteQueryResult};
use sqlx::{Sqlite, SqlitePool, Transaction};
use tracing::{debug, error, warn};

use crate::error::{DbError, DbResult};

/// An open transaction plus a count of the writes applied through it.
pub struct UnitOfWork {
    tx: Transaction<'static, Sqlite>,
    operation: &'static str,
    writes: u32,
}

impl std::fmt::Debug for UnitOfWork {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("UnitOfWork")
            .field("operation", &self.operation)
            .field("writes", &self.writes)
            .finish_non_exhaustive()
    }
}

impl UnitOfWork {
    /// Takes SQLite's write lock up front (`BEGIN IMMEDIATE`).
    ///
    /// A deferred transaction that reads and then writes fails with
    /// `SQLITE_BUSY` as soon as another writer commits in between, and
    /// `busy_timeout` cannot help it. An immediate one waits its turn under
    /// `busy_timeout` before its first read.
    pub(crate) async fn begin(pool: &SqlitePool, operation: &'static str) -> DbResult<Self> {
        let tx = pool.begin_with("BEGIN IMMEDIATE").await?;
        debug!(operation, "Unit of work started");
        Ok(UnitOfWork {
            tx,
            operation,
            writes: 0,
        })
    }

    /// Name used in logs and in [`DbError::RolledBack`].
    pub fn operation(&self) -> &'static str {
        self.operation
    }

    /// Writes applied so far.
    pub fn writes(&self) -> u32 {
        self.writes
    }

    /// The transaction's connection, for reads and `RETURNING` statements.
    ///
    /// Writes issued here must be followed by [`UnitOfWork::record_write`].
    pub fn conn(&mut self) -> &mut SqliteConnection {
        &mut self.tx
    }

    /// Marks one write issued through [`UnitOfWork::conn`].
    pub fn record_write(&mut self) {
        self.writes += 1;
    }

    /// Executes a write statement, counting it when it touched a row.
    pub async fn execute<'q>(
        &mut self,
        query: sqlx::query::Query<'q, Sqlite, SqliteArguments<'q>>,
    ) -> DbResult<SqliteQueryResult> {
        let result = query.execute(&mut *self.tx).await?;
        if result.rows_affected() > 0 {
            self.writes += 1;
        }
        Ok(result)
    }

    /// Commits on `Ok`, rolls back on `Err`.
    pub async fn finish<T>(self, result: DbResult<T>) -> DbResult<T> {
        let UnitOfWork {
            tx,
            operation,
            writes,
        } = self;

        match result {
            Ok(value) => {
                if let Err(err) = tx.commit().await {
                    warn!(operation, writes, error = %err, "Commit failed; rolled back");
                    return Err(rolled_back(operation, writes, err.into()));
                }
                debug!(operation, writes, "Unit of work committed");
                Ok(value)
            }
            Err(err) => {
                if let Err(rb) = tx.rollback().await {
                    error!(operation, error = %rb, "Rollback failed; connection discarded");
                }
                warn!(operation, writes, error = %err, "Unit of work rolled back");
                Err(rolled_back(operation, writes, err))
            }
        }
    }
}

fn rolled_back(operation: &'static str, writes: u32, err: DbError) -> DbError {
    if writes == 0 {
        return err;
    }
    DbError::RolledBack {
        operation: operation.to_string(),
        writes,
        source: Box::new(err),
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
