//! Database Connection Manager
//!
//! Owns the connection pool behind every tool, keeps it alive with a periodic
//! health check and exposes the typed read queries.

#[cfg(test)]
mod tests;

use sqlx::any::AnyPoolOptions;
use sqlx::{AnyPool, Connection};
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::{Arc, Weak};
use std::time::Duration;
use tokio::sync::{Mutex, RwLock};
use tokio::task::JoinHandle;
use tokio::time::MissedTickBehavior;
use tokio_util::sync::CancellationToken;
use tracing::{debug, error, info, warn};

use super::DatabaseError;
use super::models::{PlayerRecord, SupplyDetail, SupplyRecord, TableCounts};
use super::queries::{PlayerQueries, SupplyQueries};
use crate::config::{Config, DatabaseConfig, TableConfig};

pub const DEFAULT_HEALTH_CHECK_INTERVAL: Duration = Duration::from_secs(5);

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum DatabaseState {
    Disconnected,
    Connected,
}

impl std::fmt::Display for DatabaseState {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match *self {
            DatabaseState::Disconnected => write!(f, "Disconnected"),
            DatabaseState::Connected => write!(f, "Connected"),
        }
    }
}

pub struct ConnectionManager {
    settings: DatabaseConfig,
    tables: TableConfig,
    health_interval: Duration,
    /// `None` or a closed pool means Disconnected
    pool: RwLock<Option<AnyPool>>,
    /// Serializes connect attempts and pool release
    connect_lock: Mutex<()>,
    health_task: Mutex<Option<JoinHandle<()>>>,
    cancel: CancellationToken,
    shut_down: AtomicBool,
}

impl ConnectionManager {
    #[inline]
    pub fn new(settings: DatabaseConfig, tables: TableConfig) -> Self {
        Self {
            settings,
            tables,
            health_interval: DEFAULT_HEALTH_CHECK_INTERVAL,
            pool: RwLock::new(None),
            connect_lock: Mutex::new(()),
            health_task: Mutex::new(None),
            cancel: CancellationToken::new(),
            shut_down: AtomicBool::new(false),
        }
    }

    #[inline]
    pub fn from_config(config: &Config) -> Self {
        Self::new(config.database.clone(), config.tables.clone())
            .with_health_interval(config.health_check.interval())
    }

    #[inline]
    #[must_use]
    pub fn with_health_interval(mut self, interval: Duration) -> Self {
        self.health_interval = interval;
        self
    }

    #[inline]
    pub fn tables(&self) -> &TableConfig {
        &self.tables
    }

    /// Connect and start the health check loop.
    ///
    /// Never fails: an unusable driver configuration leaves the manager
    /// disconnected for good, a failed connection leaves it disconnected until
    /// the health check manages to connect.
    #[inline]
    pub async fn initialize(self: &Arc<Self>) {
        sqlx::any::install_default_drivers();

        match self.settings.resolve_driver() {
            Ok(driver) => debug!("Using {} driver", driver),
            Err(e) => {
                error!("❌ Database driver unavailable: {}", e);
                return;
            }
        }

        if let Err(e) = self.connect().await {
            warn!(
                "Database unavailable at startup ({}), retrying every {:?}",
                e, self.health_interval
            );
        }

        self.start_health_check().await;
    }

    /// Open a pool unless a live one already exists.
    #[inline]
    pub async fn connect(&self) -> Result<(), DatabaseError> {
        let _guard = self.connect_lock.lock().await;

        if self.shut_down.load(Ordering::Acquire) {
            return Err(DatabaseError::ShutDown);
        }

        if self.state().await == DatabaseState::Connected {
            return Ok(());
        }

        let url = self.settings.connect_url()?;
        let result = AnyPoolOptions::new()
            .max_connections(self.settings.max_connections)
            .acquire_timeout(self.settings.acquire_timeout())
            .connect(&url)
            .await;

        match result {
            Ok(pool) => {
                *self.pool.write().await = Some(pool);
                info!(
                    "✅ Database connection established: {}",
                    self.settings.redacted_url()
                );
                Ok(())
            }
            Err(e) => {
                error!("❌ Database connection failed: {}", e);
                Err(DatabaseError::Connect(e))
            }
        }
    }

    /// Close the current pool. The health check loop keeps running and will
    /// reconnect on its next tick.
    #[inline]
    pub async fn disconnect(&self) {
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            warn!("Database connection closed");
        }
    }

    #[inline]
    pub async fn state(&self) -> DatabaseState {
        let pool = self.pool.read().await;
        match pool.as_ref() {
            Some(pool) if !pool.is_closed() => DatabaseState::Connected,
            _ => DatabaseState::Disconnected,
        }
    }

    #[inline]
    pub async fn is_connected(&self) -> bool {
        self.state().await == DatabaseState::Connected
    }

    #[inline]
    pub async fn is_health_check_running(&self) -> bool {
        self.health_task
            .lock()
            .await
            .as_ref()
            .is_some_and(|handle| !handle.is_finished())
    }

    /// Run one health check: probe the pool and reconnect if it is missing or
    /// dead. A pool whose connections are all checked out counts as alive.
    #[inline]
    pub async fn check_health(&self) -> DatabaseState {
        let pool = self.pool.read().await.clone();

        match pool {
            Some(pool) if !pool.is_closed() => match self.probe(&pool).await {
                Probe::Alive => return DatabaseState::Connected,
                Probe::Busy => {
                    debug!(
                        "All {} connections in use, skipping liveness check",
                        self.settings.max_connections
                    );
                    return DatabaseState::Connected;
                }
                Probe::Dead => {
                    warn!("⚠️ Database connection lost, reconnecting...");
                    self.release_pool().await;
                }
            },
            _ => info!("⚠️ Database disconnected, attempting to reconnect..."),
        }

        if let Err(e) = self.connect().await {
            debug!("Reconnect attempt failed: {}", e);
        }

        self.state().await
    }

    async fn probe(&self, pool: &AnyPool) -> Probe {
        let mut conn = match pool.acquire().await {
            Ok(conn) => conn,
            Err(sqlx::Error::PoolTimedOut) if self.is_saturated(pool) => return Probe::Busy,
            Err(e) => {
                warn!("Failed to acquire database connection: {}", e);
                return Probe::Dead;
            }
        };

        match with_deadline("ping", self.settings.acquire_timeout(), conn.ping()).await {
            Ok(()) => Probe::Alive,
            Err(e) => {
                warn!("Database ping failed: {}", e);
                Probe::Dead
            }
        }
    }

    fn is_saturated(&self, pool: &AnyPool) -> bool {
        pool.size() >= self.settings.max_connections && pool.num_idle() == 0
    }

    /// Detach the current pool so queries stop using it. In-flight queries
    /// finish on their own connections while the pool drains in the
    /// background.
    async fn release_pool(&self) {
        let _guard = self.connect_lock.lock().await;
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            tokio::spawn(async move {
                pool.close().await;
                debug!("Stale connection pool drained");
            });
        }
    }

    async fn start_health_check(self: &Arc<Self>) {
        let mut slot = self.health_task.lock().await;
        if slot.is_some() || self.cancel.is_cancelled() {
            return;
        }

        let manager = Arc::downgrade(self);
        let cancel = self.cancel.clone();
        let period = self.health_interval;
        *slot = Some(tokio::spawn(health_check_loop(manager, cancel, period)));

        debug!("Health check started, interval {:?}", period);
    }

    /// Stop the health check and release the pool. Safe to call more than
    /// once; the pool is closed exactly once.
    #[inline]
    pub async fn shutdown(&self) {
        self.shut_down.store(true, Ordering::Release);
        self.cancel.cancel();

        let handle = self.health_task.lock().await.take();
        if let Some(handle) = handle
            && let Err(e) = handle.await
            && !e.is_cancelled()
        {
            warn!("Health check task ended abnormally: {}", e);
        }

        let _guard = self.connect_lock.lock().await;
        let pool = self.pool.write().await.take();
        if let Some(pool) = pool {
            pool.close().await;
            info!("✅ Database connection closed");
        }
    }

    /// Statements share the acquire timeout as their deadline
    async fn bounded<T, F>(&self, operation: &'static str, future: F) -> Result<T, DatabaseError>
    where
        F: Future<Output = Result<T, sqlx::Error>>,
    {
        with_deadline(operation, self.settings.acquire_timeout(), future).await
    }

    async fn live_pool(&self) -> Result<AnyPool, DatabaseError> {
        if self.shut_down.load(Ordering::Acquire) {
            return Err(DatabaseError::ShutDown);
        }

        let pool = self.pool.read().await.clone();
        match pool {
            Some(pool) if !pool.is_closed() => Ok(pool),
            _ => Err(DatabaseError::Disconnected),
        }
    }

    #[inline]
    pub async fn query_player_by_name(
        &self,
        name: &str,
    ) -> Result<Option<PlayerRecord>, DatabaseError> {
        let pool = self.live_pool().await?;
        self.bounded(
            "query_player_by_name",
            PlayerQueries::find_by_name(&pool, &self.tables, name),
        )
        .await
    }

    #[inline]
    pub async fn query_recent_players(&self) -> Result<Vec<String>, DatabaseError> {
        let pool = self.live_pool().await?;
        self.bounded(
            "query_recent_players",
            PlayerQueries::recent_names(&pool, &self.tables),
        )
        .await
    }

    #[inline]
    pub async fn query_supplies(&self) -> Result<Vec<SupplyRecord>, DatabaseError> {
        let pool = self.live_pool().await?;
        self.bounded("query_supplies", SupplyQueries::list_all(&pool, &self.tables))
            .await
    }

    #[inline]
    pub async fn query_supply_detail(
        &self,
        id: &str,
    ) -> Result<Option<SupplyDetail>, DatabaseError> {
        let pool = self.live_pool().await?;
        self.bounded(
            "query_supply_detail",
            SupplyQueries::get_detail_by_id(&pool, &self.tables, id),
        )
        .await
    }

    #[inline]
    pub async fn count_rows(&self) -> Result<TableCounts, DatabaseError> {
        let pool = self.live_pool().await?;
        let players = self
            .bounded("count_players", PlayerQueries::count(&pool, &self.tables))
            .await?;
        let supplies = self
            .bounded("count_supplies", SupplyQueries::count(&pool, &self.tables))
            .await?;

        Ok(TableCounts { players, supplies })
    }
}

/// Outcome of one liveness probe
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Probe {
    Alive,
    /// Every connection is checked out by a query
    Busy,
    Dead,
}

async fn with_deadline<T, F>(
    operation: &'static str,
    limit: Duration,
    future: F,
) -> Result<T, DatabaseError>
where
    F: Future<Output = Result<T, sqlx::Error>>,
{
    match tokio::time::timeout(limit, future).await {
        Ok(Ok(value)) => Ok(value),
        Ok(Err(source)) => Err(DatabaseError::Query { operation, source }),
        Err(_) => Err(DatabaseError::Timeout {
            operation,
            after: limit,
        }),
    }
}

impl Drop for ConnectionManager {
    fn drop(&mut self) {
        self.cancel.cancel();
    }
}

async fn health_check_loop(
    manager: Weak<ConnectionManager>,
    cancel: CancellationToken,
    period: Duration,
) {
    let mut ticker = tokio::time::interval(period);
    ticker.set_missed_tick_behavior(MissedTickBehavior::Delay);

    loop {
        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            _ = ticker.tick() => {}
        }

        let Some(strong) = manager.upgrade() else {
            break;
        };

        tokio::select! {
            biased;
            () = cancel.cancelled() => break,
            state = strong.check_health() => {
                debug!("Health check complete: {}", state);
            }
        }
    }

    debug!("Health check stopped");
}
