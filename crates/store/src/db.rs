use std::fs;
use std::path::Path;
use std::sync::{Arc, Mutex, MutexGuard};

use duckdb::Connection;
use tracing::{info, warn};
use xesload_core::error::{Result, XesError};

use crate::schema::{DROP_SQL, SCHEMA_SQL};

#[derive(Clone)]
pub struct Store {
    conn: Arc<Mutex<Connection>>,
    db_path: String,
}

impl Store {
    pub fn open(path: &Path) -> Result<Self> {
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)
                .map_err(|e| XesError::Io(format!("failed to create db dir: {e}")))?;
        }

        let conn = Connection::open(path)
            .map_err(|e| XesError::Store(format!("failed to open duckdb: {e}")))?;
        conn.execute_batch("PRAGMA threads=4;")
            .map_err(|e| XesError::Store(format!("failed to set pragmas: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| XesError::Store(format!("failed to initialize schema: {e}")))?;

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: path.display().to_string(),
        })
    }

    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory()
            .map_err(|e| XesError::Store(format!("failed to open in-memory db: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| XesError::Store(format!("failed to initialize schema: {e}")))?;
        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            db_path: ":memory:".to_string(),
        })
    }

    pub fn db_path(&self) -> &str {
        &self.db_path
    }

    pub(crate) fn conn(&self) -> Result<MutexGuard<'_, Connection>> {
        self.conn
            .lock()
            .map_err(|_| XesError::Internal("store mutex poisoned".to_string()))
    }

    /// Drops every table and sequence and creates them again, empty.
    pub fn reset(&self) -> Result<()> {
        let conn = self.conn()?;
        conn.execute_batch(DROP_SQL)
            .map_err(|e| XesError::Store(format!("failed to drop schema: {e}")))?;
        conn.execute_batch(SCHEMA_SQL)
            .map_err(|e| XesError::Store(format!("failed to recreate schema: {e}")))?;
        info!(db_path = %self.db_path, "recreated schema");
        Ok(())
    }

    /// Exclusive write handle for one import. Other users of this store block
    /// until it is dropped.
    pub fn writer(&self) -> Result<StoreWriter<'_>> {
        Ok(StoreWriter {
            conn: self.conn()?,
            in_transaction: false,
        })
    }
}

pub struct StoreWriter<'a> {
    pub(crate) conn: MutexGuard<'a, Connection>,
    pub(crate) in_transaction: bool,
}

impl Drop for StoreWriter<'_> {
    fn drop(&mut self) {
        if self.in_transaction
            && let Err(e) = self.conn.execute_batch("ROLLBACK")
        {
            warn!(error = %e, "failed to roll back abandoned import");
        }
    }
}
