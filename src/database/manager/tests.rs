use super::*;
use std::path::Path;
use tempfile::TempDir;

const FAST_INTERVAL: Duration = Duration::from_millis(50);

fn sqlite_url(path: &Path) -> String {
    format!("sqlite://{}", path.display())
}

/// Create the AuthMe and supplies tables in a fresh SQLite file and seed one
/// player.
async fn seed_database(path: &Path) {
    sqlx::any::install_default_drivers();

    let pool = AnyPoolOptions::new()
        .max_connections(1)
        .connect(&format!("{}?mode=rwc", sqlite_url(path)))
        .await
        .expect("Failed to create seed pool");

    for statement in [
        "CREATE TABLE authme (realname TEXT NOT NULL, lastlogin INTEGER, regdate INTEGER, isLogged INTEGER)",
        "CREATE TABLE supplies (id TEXT, world TEXT, x INTEGER, y INTEGER, z INTEGER, efficiency TEXT, status INTEGER, message TEXT, content TEXT)",
        "INSERT INTO authme VALUES ('Notch', 1700500000000, 1700000000000, 1)",
    ] {
        sqlx::query(statement)
            .execute(&pool)
            .await
            .expect("Failed to seed database");
    }

    pool.close().await;
}

fn manager_for(url: String) -> Arc<ConnectionManager> {
    let settings = DatabaseConfig {
        url,
        ..DatabaseConfig::default()
    };
    Arc::new(
        ConnectionManager::new(settings, TableConfig::default())
            .with_health_interval(FAST_INTERVAL),
    )
}

async fn wait_for_state(manager: &ConnectionManager, expected: DatabaseState) -> bool {
    for _ in 0..100 {
        if manager.state().await == expected {
            return true;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    false
}

#[tokio::test]
async fn initialize_connects_and_serves_queries() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");
    seed_database(&db_path).await;

    let manager = manager_for(sqlite_url(&db_path));
    manager.initialize().await;

    assert_eq!(manager.state().await, DatabaseState::Connected);
    assert!(manager.is_health_check_running().await);

    let player = manager
        .query_player_by_name("NOTCH")
        .await
        .expect("Query should succeed")
        .expect("Player should exist");
    assert_eq!(player.realname, "Notch");

    let counts = manager.count_rows().await.expect("Count should succeed");
    assert_eq!(counts.players, 1);
    assert_eq!(counts.supplies, 0);

    manager.shutdown().await;
}

#[tokio::test]
async fn connect_is_idempotent() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");
    seed_database(&db_path).await;

    let manager = manager_for(sqlite_url(&db_path));
    sqlx::any::install_default_drivers();

    manager.connect().await.expect("First connect should succeed");
    manager.connect().await.expect("Second connect should be a no-op");
    assert!(manager.is_connected().await);

    manager.shutdown().await;
}

#[tokio::test]
async fn unreachable_database_degrades_gracefully() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("missing").join("game.db");

    let manager = manager_for(sqlite_url(&db_path));
    manager.initialize().await;

    assert_eq!(manager.state().await, DatabaseState::Disconnected);
    assert!(manager.is_health_check_running().await);

    let result = manager.query_player_by_name("Notch").await;
    assert!(matches!(result, Err(DatabaseError::Disconnected)));

    let result = manager.query_supplies().await;
    assert!(matches!(result, Err(ref e) if e.is_connectivity()));

    manager.shutdown().await;
}

#[tokio::test]
async fn unsupported_driver_skips_health_check() {
    let settings = DatabaseConfig {
        url: "postgres://localhost/game".to_string(),
        ..DatabaseConfig::default()
    };
    let manager = Arc::new(ConnectionManager::new(settings, TableConfig::default()));
    manager.initialize().await;

    assert_eq!(manager.state().await, DatabaseState::Disconnected);
    assert!(!manager.is_health_check_running().await);
    assert!(matches!(
        manager.connect().await,
        Err(DatabaseError::Configuration(_))
    ));
}

#[tokio::test]
async fn health_check_reconnects_after_forced_disconnect() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");
    seed_database(&db_path).await;

    let manager = manager_for(sqlite_url(&db_path));
    manager.initialize().await;
    assert!(manager.is_connected().await);

    manager.disconnect().await;
    assert_eq!(manager.state().await, DatabaseState::Disconnected);

    assert!(
        wait_for_state(&manager, DatabaseState::Connected).await,
        "health check should reconnect without a query"
    );

    let names = manager
        .query_recent_players()
        .await
        .expect("Query should succeed after reconnect");
    assert_eq!(names, vec!["Notch"]);

    manager.shutdown().await;
}

#[tokio::test]
async fn health_check_connects_once_database_appears() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");

    let manager = manager_for(sqlite_url(&db_path));
    manager.initialize().await;
    assert_eq!(manager.state().await, DatabaseState::Disconnected);

    seed_database(&db_path).await;

    assert!(
        wait_for_state(&manager, DatabaseState::Connected).await,
        "health check should pick up the new database"
    );

    manager.shutdown().await;
}

#[tokio::test]
async fn manual_health_check_restores_connection() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");
    seed_database(&db_path).await;

    let manager = manager_for(sqlite_url(&db_path));
    sqlx::any::install_default_drivers();

    assert_eq!(manager.check_health().await, DatabaseState::Connected);
    assert_eq!(manager.check_health().await, DatabaseState::Connected);

    manager.disconnect().await;
    assert_eq!(manager.check_health().await, DatabaseState::Connected);

    manager.shutdown().await;
}

#[tokio::test]
async fn shutdown_is_idempotent_and_final() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");
    seed_database(&db_path).await;

    let manager = manager_for(sqlite_url(&db_path));
    manager.initialize().await;
    assert!(manager.is_connected().await);

    manager.shutdown().await;
    manager.shutdown().await;

    assert_eq!(manager.state().await, DatabaseState::Disconnected);
    assert!(!manager.is_health_check_running().await);
    assert!(matches!(
        manager.query_player_by_name("Notch").await,
        Err(DatabaseError::ShutDown)
    ));

    tokio::time::sleep(FAST_INTERVAL * 4).await;
    assert_eq!(manager.state().await, DatabaseState::Disconnected);
    assert!(matches!(manager.connect().await, Err(DatabaseError::ShutDown)));
}

#[tokio::test]
async fn dropping_manager_stops_health_check() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("missing").join("game.db");

    let manager = manager_for(sqlite_url(&db_path));
    manager.initialize().await;
    let cancel = manager.cancel.clone();

    drop(manager);

    // The loop may still hold a strong reference for the tick in flight
    let mut cancelled = false;
    for _ in 0..100 {
        if cancel.is_cancelled() {
            cancelled = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(cancelled);
}

#[tokio::test]
async fn busy_pool_is_not_declared_dead() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");
    seed_database(&db_path).await;

    let settings = DatabaseConfig {
        url: sqlite_url(&db_path),
        max_connections: 1,
        acquire_timeout_secs: 1,
        ..DatabaseConfig::default()
    };
    let manager = Arc::new(ConnectionManager::new(settings, TableConfig::default()));
    sqlx::any::install_default_drivers();
    manager.connect().await.expect("Connect should succeed");

    let pool = manager.live_pool().await.expect("Pool should be live");
    let held = pool.acquire().await.expect("Failed to hold the only connection");

    assert_eq!(manager.check_health().await, DatabaseState::Connected);
    assert_eq!(manager.state().await, DatabaseState::Connected);
    assert!(!pool.is_closed());

    drop(held);

    let player = manager
        .query_player_by_name("notch")
        .await
        .expect("Query should succeed once the connection is free")
        .expect("Player should exist");
    assert_eq!(player.realname, "Notch");

    manager.shutdown().await;
}

#[tokio::test]
async fn failed_liveness_check_replaces_pool() {
    let temp_dir = TempDir::new().expect("Failed to create temp directory");
    let db_path = temp_dir.path().join("game.db");
    seed_database(&db_path).await;

    let manager = manager_for(sqlite_url(&db_path));
    sqlx::any::install_default_drivers();

    // A pool that is open but can never hand out a connection
    let broken = AnyPoolOptions::new()
        .max_connections(1)
        .acquire_timeout(Duration::from_secs(1))
        .connect_lazy(&sqlite_url(&temp_dir.path().join("missing").join("game.db")))
        .expect("Lazy pool should build");
    *manager.pool.write().await = Some(broken.clone());
    assert_eq!(manager.state().await, DatabaseState::Connected);

    assert_eq!(manager.check_health().await, DatabaseState::Connected);

    let names = manager
        .query_recent_players()
        .await
        .expect("Query should use the new pool");
    assert_eq!(names, vec!["Notch"]);

    let mut drained = false;
    for _ in 0..50 {
        if broken.is_closed() {
            drained = true;
            break;
        }
        tokio::time::sleep(Duration::from_millis(20)).await;
    }
    assert!(drained, "stale pool should be closed");

    manager.shutdown().await;
}

#[tokio::test]
async fn statements_are_bounded_by_deadline() {
    let limit = Duration::from_millis(20);

    let result: Result<(), DatabaseError> =
        with_deadline("stalled", limit, std::future::pending()).await;
    assert!(matches!(
        result,
        Err(DatabaseError::Timeout { operation: "stalled", after }) if after == limit
    ));
    assert!(matches!(result, Err(ref e) if e.is_connectivity()));

    let result = with_deadline("quick", limit, async { Ok::<_, sqlx::Error>(7) }).await;
    assert_eq!(result.expect("Ready future should finish"), 7);

    let result: Result<(), DatabaseError> =
        with_deadline("failing", limit, async { Err(sqlx::Error::RowNotFound) }).await;
    assert!(matches!(
        result,
        Err(DatabaseError::Query { operation: "failing", .. })
    ));
}
