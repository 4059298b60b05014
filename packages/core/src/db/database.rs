//! Database Connection Management
//!
//! This module owns the libsql database handle backing the ordered tree
//! store: opening the file, creating the schema, handing out connections and
//! framing transactions.
//!
//! # Architecture
//!
//! - **Path-agnostic**: Accepts any valid PathBuf; parent directories are created
//! - **Idempotent schema**: `CREATE ... IF NOT EXISTS` only, never ALTER
//! - **WAL mode**: Readers proceed while a single writer holds the lock
//! - **Busy timeout**: Set on every connection so writers queue instead of failing
//!
//! # Transactions
//!
//! Mutations run between [`DatabaseService::begin`] and either
//! [`DatabaseService::commit`] or [`DatabaseService::rollback`] on the same
//! connection. `begin` issues `BEGIN IMMEDIATE`, which takes the write lock up
//! front so a read-then-write sequence cannot interleave with another writer.
//!
//! ```no_run
//! # use ordertree_core::db::DatabaseService;
//! # use std::path::PathBuf;
//! # async fn example() -> Result<(), ordertree_core::db::DatabaseError> {
//! let db = DatabaseService::new(PathBuf::from("./data/ordertree.db")).await?;
//! let conn = db.connect_with_timeout().await?;
//! db.begin(&conn).await?;
//! conn.execute("UPDATE nodes SET importance = 0", ()).await?;
//! db.commit(&conn).await?;
//! # Ok(())
//! # }
//! ```

use crate::config::DEFAULT_BUSY_TIMEOUT_MS;
use crate::db::error::DatabaseError;
use libsql::{Builder, Connection, Database};
use std::path::PathBuf;
use std::sync::Arc;

/// Database service for managing the libsql handle and schema
#[derive(Debug, Clone)]
pub struct DatabaseService {
    /// libsql database (wrapped in Arc for sharing)
    pub db: Arc<Database>,

    /// Path to the database file
    pub db_path: PathBuf,

    busy_timeout_ms: u64,
}

impl DatabaseService {
    /// Open (or create) the database at `db_path` with the default busy timeout
    ///
    /// This will:
    /// 1. Ensure the parent directory exists (create if needed)
    /// 2. Open/create the database file
    /// 3. Enable WAL mode and set the busy timeout
    /// 4. Create the `nodes` table and its index if missing
    ///
    /// # Errors
    ///
    /// Returns `DatabaseError` if:
    /// - Parent directory cannot be created
    /// - Database connection fails
    /// - Schema initialization fails
    pub async fn new(db_path: PathBuf) -> Result<Self, DatabaseError> {
        Self::with_busy_timeout(db_path, DEFAULT_BUSY_TIMEOUT_MS).await
    }

    /// Same as [`DatabaseService::new`] with an explicit busy timeout
    pub async fn with_busy_timeout(
        db_path: PathBuf,
        busy_timeout_ms: u64,
    ) -> Result<Self, DatabaseError> {
        if let Some(parent) = db_path.parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                std::fs::create_dir_all(parent).map_err(|e| {
                    if e.kind() == std::io::ErrorKind::PermissionDenied {
                        DatabaseError::permission_denied(db_path.clone())
                    } else {
                        DatabaseError::DirectoryCreationFailed(e)
                    }
                })?;
            }
        }

        let db = Builder::new_local(&db_path)
            .build()
            .await
            .map_err(|e| DatabaseError::connection_failed(db_path.clone(), e))?;

        let service = Self {
            db: Arc::new(db),
            db_path,
            busy_timeout_ms,
        };

        service.initialize_schema().await?;

        tracing::debug!("Database ready at {}", service.db_path.display());
        Ok(service)
    }

    /// Execute a PRAGMA statement
    ///
    /// PRAGMA statements return rows, so they go through query() instead of
    /// execute(). The first row is pulled so the statement is stepped.
    async fn execute_pragma(&self, conn: &Connection, pragma: &str) -> Result<(), DatabaseError> {
        let mut rows = conn.query(pragma, ()).await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        rows.next().await.map_err(|e| {
            DatabaseError::sql_execution(format!("Failed to execute '{}': {}", pragma, e))
        })?;
        Ok(())
    }

    /// Create the schema and configure the database file
    ///
    /// # Schema
    ///
    /// - `nodes` table: one row per node, `parent_id` NULL for roots
    /// - `idx_nodes_parent_sort`: sibling lookups ordered by position
    async fn initialize_schema(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;

        self.execute_pragma(&conn, "PRAGMA journal_mode = WAL")
            .await?;

        conn.execute(
            "CREATE TABLE IF NOT EXISTS nodes (
                id INTEGER PRIMARY KEY AUTOINCREMENT,
                parent_id INTEGER,
                name TEXT NOT NULL,
                description TEXT,
                notes TEXT,
                tags TEXT,
                metadata TEXT,
                status TEXT,
                importance INTEGER NOT NULL DEFAULT 0,
                sort_order INTEGER NOT NULL DEFAULT 1
            )",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!("Failed to create nodes table: {}", e))
        })?;

        conn.execute(
            "CREATE INDEX IF NOT EXISTS idx_nodes_parent_sort ON nodes(parent_id, sort_order)",
            (),
        )
        .await
        .map_err(|e| {
            DatabaseError::initialization_failed(format!(
                "Failed to create index 'idx_nodes_parent_sort': {}",
                e
            ))
        })?;

        Ok(())
    }

    /// Get a raw connection without configuring it
    ///
    /// Prefer [`DatabaseService::connect_with_timeout`]; without the busy
    /// timeout a concurrent writer makes statements fail with `SQLITE_BUSY`.
    pub fn connect(&self) -> Result<Connection, DatabaseError> {
        self.db.connect().map_err(DatabaseError::LibsqlError)
    }

    /// Get a connection with the busy timeout configured
    pub async fn connect_with_timeout(&self) -> Result<Connection, DatabaseError> {
        let conn = self.connect()?;

        self.execute_pragma(
            &conn,
            &format!("PRAGMA busy_timeout = {}", self.busy_timeout_ms),
        )
        .await?;

        Ok(conn)
    }

    /// Start a write transaction on `conn`
    pub async fn begin(&self, conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute("BEGIN IMMEDIATE", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to begin transaction: {}", e))
        })?;
        Ok(())
    }

    /// Commit the transaction open on `conn`
    ///
    /// If COMMIT itself fails the transaction is rolled back before the
    /// error is returned.
    pub async fn commit(&self, conn: &Connection) -> Result<(), DatabaseError> {
        if let Err(e) = conn.execute("COMMIT", ()).await {
            if let Err(rollback_err) = conn.execute("ROLLBACK", ()).await {
                tracing::warn!("Rollback after failed commit also failed: {}", rollback_err);
            }
            return Err(DatabaseError::transaction_failed(format!(
                "Failed to commit transaction: {}",
                e
            )));
        }
        Ok(())
    }

    /// Roll back the transaction open on `conn`
    pub async fn rollback(&self, conn: &Connection) -> Result<(), DatabaseError> {
        conn.execute("ROLLBACK", ()).await.map_err(|e| {
            DatabaseError::transaction_failed(format!("Failed to roll back transaction: {}", e))
        })?;
        Ok(())
    }

    /// Flush the WAL into the main database file
    ///
    /// Call before shutdown or before copying the database file.
    pub async fn db_close(&self) -> Result<(), DatabaseError> {
        let conn = self.connect_with_timeout().await?;
        self.execute_pragma(&conn, "PRAGMA wal_checkpoint(TRUNCATE)")
            .await?;
        Ok(())
    }
}
