//! # Database Pool Management
//!
//! Connection pool creation and configuration for SQLite, plus the knobs that
//! bound every unit of work.
//!
//! ## Architecture
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                      Database Connection Pool                           │
//! │                                                                         │
//! │  main() / test                                                         │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  DbConfig::new(path) ← pool size, timeouts, retries, stock policy      │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  Database::new(config).await ← Create pool + run migrations            │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  ┌─────────────────────────────────────────┐                           │
//! │  │            SqlitePool                    │                           │
//! │  │  ┌─────┐ ┌─────┐ ┌─────┐ ┌─────┐       │  (max_connections)        │
//! │  │  │Conn1│ │Conn2│ │Conn3│ │Conn4│ ...   │  callers block up to      │
//! │  │  └─────┘ └─────┘ └─────┘ └─────┘       │  acquire_timeout          │
//! │  └─────────────────────────────────────────┘                           │
//! │       │                                                                 │
//! │       ▼                                                                 │
//! │  db.inventory() / db.sales() / db.members()                            │
//! │  (every repository receives this handle; nothing is global)            │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## WAL Mode
//! Readers don't block the writer and the writer doesn't block readers.
//! SQLite still admits one writer at a time; `busy_timeout` makes a second
//! writer wait for the lock instead of failing at once.

use serde::{Deserialize, Serialize};
use sqlx::sqlite::{SqliteConnectOptions, SqliteJournalMode, SqlitePoolOptions, SqliteSynchronous};
use sqlx::SqlitePool;
use std::future::Future;
use std::path::PathBuf;
use std::str::FromStr;
use std::time::Duration;
use tracing::{debug, info, warn};

use crate::error::{DbError, DbResult};
use crate::migrations;
use crate::repository::inventory::InventoryRepository;
use crate::repository::member::MemberRepository;
use crate::repository::sale::SaleRepository;
use crate::unit_of_work::UnitOfWork;

// =============================================================================
// Stock Policy
// =============================================================================

/// Whether committing a sale also decrements stock.
///
/// ```text
/// Separate        POST /sales writes sale + lines (+ points) only.
///                 Stock is adjusted by a separate PATCH /inventory/{id}/stock.
///
/// DecrementInSale POST /sales also decrements every line's item and writes
///                 a stock history entry, all in the same unit of work. A line
///                 asking for more than is on hand fails the whole sale.
/// ```
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum StockPolicy {
    #[default]
    Separate,
    DecrementInSale,
}

impl FromStr for StockPolicy {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_lowercase().as_str() {
            "separate" => Ok(StockPolicy::Separate),
            "decrement_in_sale" | "decrement" => Ok(StockPolicy::DecrementInSale),
            other => Err(format!(
                "Unknown stock policy: '{}'. Valid options: separate, decrement_in_sale",
                other
            )),
        }
    }
}

// =============================================================================
// Configuration
// =============================================================================

/// Database configuration.
///
/// ## Example
/// ```rust,ignore
/// let config = DbConfig::new("/var/lib/till/till.db")
///     .max_connections(8)
///     .unit_timeout(Duration::from_secs(5))
///     .stock_policy(StockPolicy::DecrementInSale);
/// ```
#[derive(Debug, Clone)]
pub struct DbConfig {
    /// Path to the SQLite database file.
    pub database_path: PathBuf,

    /// Maximum number of connections in the pool. Bounds in-flight units of work.
    /// Default: 5
    pub max_connections: u32,

    /// Minimum number of connections to keep alive.
    /// Default: 1
    pub min_connections: u32,

    /// How long a caller waits for a free connection.
    /// Default: 30 seconds
    pub connect_timeout: Duration,

    /// Idle timeout before closing a connection.
    /// Default: 10 minutes
    pub idle_timeout: Duration,

    /// How long a writer waits for SQLite's write lock.
    /// Default: 5 seconds
    pub busy_timeout: Duration,

    /// Upper bound on the lifetime of one unit of work.
    /// Default: 10 seconds
    pub unit_timeout: Duration,

    /// Attempts for operations that retry on conflict or lost races
    /// (stock adjustment, member creation). Default: 5
    pub max_write_retries: u32,

    /// Whether sale commit decrements stock. Default: Separate
    pub stock_policy: StockPolicy,

    /// Whether to run migrations on connect.
    /// Default: true
    pub run_migrations: bool,
}

impl DbConfig {
    /// Creates a new database configuration with the given path.
    pub fn new(path: impl Into<PathBuf>) -> Self {
        DbConfig {
            database_path: path.into(),
            max_connections: 5,
            min_connections: 1,
            connect_timeout: Duration::from_secs(30),
            idle_timeout: Duration::from_secs(600),
            busy_timeout: Duration::from_secs(5),
            unit_timeout: Duration::from_secs(10),
            max_write_retries: 5,
            stock_policy: StockPolicy::Separate,
            run_migrations: true,
        }
    }

    /// Sets the maximum number of connections.
    pub fn max_connections(mut self, max: u32) -> Self {
        self.max_connections = max;
        self
    }

    /// Sets the minimum number of connections.
    pub fn min_connections(mut self, min: u32) -> Self {
        self.min_connections = min;
        self
    }

    /// Sets the connection acquire timeout.
    pub fn connect_timeout(mut self, timeout: Duration) -> Self {
        self.connect_timeout = timeout;
        self
    }

    /// Sets the unit-of-work deadline.
    pub fn unit_timeout(mut self, timeout: Duration) -> Self {
        self.unit_timeout = timeout;
        self
    }

    /// Sets the retry budget for conflicting writes.
    pub fn max_write_retries(mut self, attempts: u32) -> Self {
        self.max_write_retries = attempts.max(1);
        self
    }

    /// Sets the sale stock policy.
    pub fn stock_policy(mut self, policy: StockPolicy) -> Self {
        self.stock_policy = policy;
        self
    }

    /// Sets whether to run migrations on connect.
    pub fn run_migrations(mut self, run: bool) -> Self {
        self.run_migrations = run;
        self
    }

    /// Creates an in-memory database configuration (for testing).
    pub fn in_memory() -> Self {
        DbConfig {
            database_path: PathBuf::from(":memory:"),
            max_connections: 1, // In-memory requires single connection
            min_connections: 1,
            connect_timeout: Duration::from_secs(5),
            idle_timeout: Duration::from_secs(60),
            busy_timeout: Duration::from_secs(5),
            unit_timeout: Duration::from_secs(5),
            max_write_retries: 5,
            stock_policy: StockPolicy::Separate,
            run_migrations: true,
        }
    }
}

// =============================================================================
// Database
// =============================================================================

/// Main database handle providing repository access.
///
/// Cloning is cheap (the pool is reference-counted). Construct one at startup
/// and hand clones to whatever needs storage.
#[derive(Debug, Clone)]
pub struct Database {
    /// The SQLite connection pool.
    pool: SqlitePool,
    unit_timeout: Duration,
    max_write_retries: u32,
    stock_policy: StockPolicy,
}

impl Database {
    /// Creates a new database connection pool.
    ///
    /// ## What This Does
    /// 1. Creates the database file if it doesn't exist
    /// 2. Configures SQLite: WAL, NORMAL synchronous, foreign keys, busy timeout
    /// 3. Creates the connection pool
    /// 4. Runs migrations (if enabled)
    pub async fn new(config: DbConfig) -> DbResult<Self> {
        info!(
            path = %config.database_path.display(),
            "Initializing database connection"
        );

        let connect_url = format!("sqlite://{}?mode=rwc", config.database_path.display());

        let connect_options = SqliteConnectOptions::from_str(&connect_url)
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?
            .journal_mode(SqliteJournalMode::Wal)
            .synchronous(SqliteSynchronous::Normal)
            // SQLite has them disabled by default for backwards compatibility
            .foreign_keys(true)
            .busy_timeout(config.busy_timeout)
            .create_if_missing(true);

        debug!("Connection options configured");

        let pool = SqlitePoolOptions::new()
            .max_connections(config.max_connections)
            .min_connections(config.min_connections)
            .acquire_timeout(config.connect_timeout)
            .idle_timeout(Some(config.idle_timeout))
            .connect_with(connect_options)
            .await
            .map_err(|e| DbError::ConnectionFailed(e.to_string()))?;

        info!(
            max_connections = config.max_connections,
            stock_policy = ?config.stock_policy,
            "Database pool created"
        );

        let db = Database {
            pool,
            unit_timeout: config.unit_timeout,
            max_write_retries: config.max_write_retries.max(1),
            stock_policy: config.stock_policy,
        };

        if config.run_migrations {
            db.run_migrations().await?;
        }

        Ok(db)
    }

    /// Runs database migrations. Idempotent.
    pub async fn run_migrations(&self) -> DbResult<()> {
        info!("Running database migrations");
        migrations::run_migrations(&self.pool).await?;
        info!("Migrations complete");
        Ok(())
    }

    /// Returns a reference to the connection pool.
    pub fn pool(&self) -> &SqlitePool {
        &self.pool
    }

    /// The configured sale stock policy.
    pub fn stock_policy(&self) -> StockPolicy {
        self.stock_policy
    }

    /// Returns the inventory repository (Stock Ledger).
    pub fn inventory(&self) -> InventoryRepository {
        InventoryRepository::new(self.clone())
    }

    /// Returns the sale repository (Sale Commit Engine).
    pub fn sales(&self) -> SaleRepository {
        SaleRepository::new(self.clone())
    }

    /// Returns the member repository (Identifier Allocator, points).
    pub fn members(&self) -> MemberRepository {
        MemberRepository::new(self.clone())
    }

    /// Opens a unit of work on a pooled connection.
    pub async fn begin_unit(&self, operation: &'static str) -> DbResult<UnitOfWork> {
        UnitOfWork::begin(&self.pool, operation).await
    }

    /// Runs `work` under the unit-of-work deadline.
    ///
    /// On expiry the future is dropped, which drops its open transaction and
    /// rolls it back, and `DbError::Timeout` is returned.
    pub async fn bounded<T, F>(&self, operation: &'static str, work: F) -> DbResult<T>
    where
        F: Future<Output = DbResult<T>>,
    {
        match tokio::time::timeout(self.unit_timeout, work).await {
            Ok(result) => result,
            Err(_) => {
                let millis = self.unit_timeout.as_millis() as u64;
                warn!(operation, millis, "Unit of work timed out; rolled back");
                Err(DbError::Timeout {
                    operation: operation.to_string(),
                    millis,
                })
            }
        }
    }

    /// Repeats `attempt` while it fails with a retryable error.
    ///
    /// Each attempt must be a complete unit of work that re-reads whatever it
    /// depends on. Gives up after `max_write_retries` attempts and returns the
    /// last error.
    pub(crate) async fn with_retries<T, F, Fut>(
        &self,
        operation: &'static str,
        mut attempt: F,
    ) -> DbResult<T>
    where
        F: FnMut() -> Fut,
        Fut: Future<Output = DbResult<T>>,
    {
        let mut tries = 0;
        loop {
            tries += 1;
            match attempt().await {
                Err(err) if err.is_retryable() && tries < self.max_write_retries => {
                    warn!(operation, attempt = tries, error = %err, "Retrying unit of work");
                    tokio::time::sleep(Duration::from_millis(5 * u64::from(tries))).await;
                }
                other => return other,
            }
        }
    }

    /// Closes the database connection pool.
    pub async fn close(&self) {
        info!("Closing database connection pool");
        self.pool.close().await;
    }

    /// Checks if the database is healthy (can execute queries).
    pub async fn health_check(&self) -> bool {
        sqlx::query("SELECT 1").execute(&self.pool).await.is_ok()
    }
}

// =============================================================================
// Unit Tests
// =============================================================================
