//! Bounded pool of SQLite connections for async callers.
//!
//! SQLite work is blocking, so [`DbPool::run`] hands each closure a pooled
//! connection on the tokio blocking pool. Idle connections older than the
//! idle timeout are closed the next time a connection is acquired.

use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use deadpool::managed::{self, Metrics, PoolError, RecycleError, RecycleResult};
use deadpool::Runtime;

use super::{Database, DbError, DbResult};

/// Path that selects a private in-memory database.
pub const IN_MEMORY_PATH: &str = ":memory:";

/// Pool sizing and timeouts.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct PoolConfig {
    pub max_connections: usize,
    /// Idle connections older than this are closed
    pub idle_timeout: Duration,
    /// How long a caller waits for a free connection
    pub acquire_timeout: Duration,
}

impl Default for PoolConfig {
    fn default() -> Self {
        Self {
            max_connections: 10,
            idle_timeout: Duration::from_secs(30),
            acquire_timeout: Duration::from_secs(5),
        }
    }
}

enum Target {
    File(PathBuf),
    /// The single connection owns the data, so it is never closed
    Memory,
}

/// Opens and recycles [`Database`] connections for the pool.
pub struct ConnectionManager {
    target: Target,
    idle_timeout: Duration,
    /// Connection opened at startup, handed out first
    seed: Mutex<Option<Database>>,
}

impl ConnectionManager {
    fn take_seed(&self) -> DbResult<Option<Database>> {
        let mut seed = self
            .seed
            .lock()
            .map_err(|_| DbError::Pool("seed connection lock poisoned".into()))?;
        Ok(seed.take())
    }
}

impl managed::Manager for ConnectionManager {
    type Type = Database;
    type Error = DbError;

    async fn create(&self) -> DbResult<Database> {
        if let Some(db) = self.take_seed()? {
            return Ok(db);
        }
        let path = match &self.target {
            Target::File(path) => path.clone(),
            Target::Memory => {
                return Err(DbError::Pool("in-memory database connection was lost".into()))
            }
        };
        tokio::task::spawn_blocking(move || Database::open(path))
            .await
            .map_err(|e| DbError::Pool(format!("connect task failed: {e}")))?
    }

    async fn recycle(&self, _db: &mut Database, metrics: &Metrics) -> RecycleResult<DbError> {
        if let Target::File(_) = self.target {
            if metrics.last_used() >= self.idle_timeout {
                tracing::debug!(
                    idle_ms = metrics.last_used().as_millis() as u64,
                    "closed idle database connection"
                );
                return Err(RecycleError::Backend(DbError::Pool(
                    "idle connection expired".into(),
                )));
            }
        }
        Ok(())
    }
}

/// A connection checked out of the pool. Returned to the pool on drop.
pub type PooledConnection = managed::Object<ConnectionManager>;

/// Shared handle to the connection pool.
#[derive(Clone)]
pub struct DbPool {
    pool: managed::Pool<ConnectionManager>,
    config: PoolConfig,
}

impl DbPool {
    /// Open a pool over the database at `path`, creating the schema if needed.
    ///
    /// `":memory:"` selects an in-memory database limited to one connection.
    pub fn open<P: AsRef<Path>>(path: P, config: PoolConfig) -> DbResult<Self> {
        let path = path.as_ref();
        if path == Path::new(IN_MEMORY_PATH) {
            return Self::in_memory_with(config);
        }
        if config.max_connections == 0 {
            return Err(DbError::Pool("max_connections must be at least 1".into()));
        }

        // Open one connection up front so a bad path fails at startup.
        let first = Database::open(path)?;
        tracing::info!(
            path = %path.display(),
            max_connections = config.max_connections,
            "opened database pool"
        );
        Self::build(Target::File(path.to_path_buf()), config, first)
    }

    /// In-memory pool with default timeouts.
    pub fn in_memory() -> DbResult<Self> {
        Self::in_memory_with(PoolConfig::default())
    }

    fn in_memory_with(config: PoolConfig) -> DbResult<Self> {
        let config = PoolConfig {
            max_connections: 1,
            ..config
        };
        let db = Database::open_in_memory()?;
        tracing::info!("opened in-memory database");
        Self::build(Target::Memory, config, db)
    }

    fn build(target: Target, config: PoolConfig, first: Database) -> DbResult<Self> {
        let manager = ConnectionManager {
            target,
            idle_timeout: config.idle_timeout,
            seed: Mutex::new(Some(first)),
        };
        let pool = managed::Pool::builder(manager)
            .max_size(config.max_connections)
            .wait_timeout(Some(config.acquire_timeout))
            .runtime(Runtime::Tokio1)
            .build()
            .map_err(|e| DbError::Pool(format!("failed to build pool: {e}")))?;
        Ok(Self { pool, config })
    }

    pub fn config(&self) -> PoolConfig {
        self.config
    }

    /// Number of connections currently parked in the pool.
    pub fn idle_connections(&self) -> usize {
        usize::try_from(self.pool.status().available).unwrap_or(0)
    }

    /// Wait for a connection, up to the acquire timeout.
    pub async fn acquire(&self) -> DbResult<PooledConnection> {
        self.pool.get().await.map_err(|e| match e {
            PoolError::Backend(err) => err,
            PoolError::Timeout(_) => {
                let wait = self.config.acquire_timeout;
                tracing::warn!(timeout_ms = wait.as_millis() as u64, "database pool exhausted");
                DbError::Pool(format!("timed out after {wait:?} waiting for a connection"))
            }
            other => DbError::Pool(other.to_string()),
        })
    }

    /// Run blocking database work on a pooled connection.
    pub async fn run<T, F>(&self, f: F) -> DbResult<T>
    where
        F: FnOnce(&mut Database) -> DbResult<T> + Send + 'static,
        T: Send + 'static,
    {
        let mut conn = self.acquire().await?;
        tokio::task::spawn_blocking(move || f(&mut conn))
            .await
            .map_err(|e| DbError::Pool(format!("database task failed: {e}")))?
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::models::{NewPatient, Patient};

    fn patient(name: &str) -> Patient {
        Patient::from_new(NewPatient::new(name, "Test", "1990-01-01", "0820000000"))
    }

    #[tokio::test]
    async fn test_in_memory_pool_shares_data() {
        let pool = DbPool::in_memory().unwrap();
        assert_eq!(pool.config().max_connections, 1);

        pool.run(|db| db.insert_patient(patient("Thandi")).map(|_| ()))
            .await
            .unwrap();
        let count = pool.run(|db| db.count_patients()).await.unwrap();
        assert_eq!(count, 1);
    }

    #[tokio::test]
    async fn test_acquire_times_out() {
        let config = PoolConfig {
            acquire_timeout: Duration::from_millis(20),
            ..PoolConfig::default()
        };
        let pool = DbPool::open(IN_MEMORY_PATH, config).unwrap();

        let held = pool.acquire().await.unwrap();
        let err = pool.acquire().await.err().unwrap();
        assert!(matches!(err, DbError::Pool(_)));

        drop(held);
        assert!(pool.acquire().await.is_ok());
    }

    #[tokio::test]
    async fn test_file_pool_opens_extra_connections() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig {
            max_connections: 2,
            ..PoolConfig::default()
        };
        let pool = DbPool::open(dir.path().join("clinic.db"), config).unwrap();

        let first = pool.acquire().await.unwrap();
        let second = pool.acquire().await.unwrap();
        first.insert_patient(patient("Sipho")).unwrap();
        assert_eq!(second.count_patients().unwrap(), 1);

        drop(first);
        drop(second);
        assert_eq!(pool.idle_connections(), 2);
    }

    #[tokio::test]
    async fn test_idle_connections_reaped_on_acquire() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig {
            max_connections: 2,
            idle_timeout: Duration::ZERO,
            ..PoolConfig::default()
        };
        let pool = DbPool::open(dir.path().join("clinic.db"), config).unwrap();

        let a = pool.acquire().await.unwrap();
        let b = pool.acquire().await.unwrap();
        drop(a);
        drop(b);
        assert_eq!(pool.idle_connections(), 2);

        let c = pool.acquire().await.unwrap();
        assert_eq!(pool.idle_connections(), 0);
        drop(c);
        assert_eq!(pool.idle_connections(), 1);
    }

    #[test]
    fn test_zero_connections_rejected() {
        let dir = tempfile::tempdir().unwrap();
        let config = PoolConfig {
            max_connections: 0,
            ..PoolConfig::default()
        };
        assert!(DbPool::open(dir.path().join("clinic.db"), config).is_err());
    }
}
