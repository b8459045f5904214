
use super::models::*;
use crate::config::TableConfig;
use sqlx::AnyPool;
use tracing::debug;

/// Upper bound on `PlayerQueries::recent_names`
pub const RECENT_PLAYERS_LIMIT: i64 = 10;

pub struct PlayerQueries;

impl PlayerQueries {
    /// Case-insensitive lookup on `realname`.
    #[inline]
    pub async fn find_by_name(
        pool: &AnyPool,
        tables: &TableConfig,
        name: &str,
    ) -> Result<Option<PlayerRecord>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT realname,
                   COALESCE(lastlogin, 0) AS lastlogin,
                   COALESCE(regdate, 0) AS regdate,
                   COALESCE(isLogged, 0) AS is_logged
            FROM {} WHERE LOWER(realname) = LOWER(?)
            "#,
            tables.players
        );

        debug!("Looking up player '{}'", name);
        sqlx::query_as::<_, PlayerRecord>(&sql)
            .bind(name)
            .fetch_optional(pool)
            .await
    }

    /// Names of the most recently logged-in players, newest first.
    #[inline]
    pub async fn recent_names(
        pool: &AnyPool,
        tables: &TableConfig,
    ) -> Result<Vec<String>, sqlx::Error> {
        let sql = format!(
            "SELECT realname FROM {} ORDER BY lastlogin DESC LIMIT ?",
            tables.players
        );

        sqlx::query_scalar::<_, String>(&sql)
            .bind(RECENT_PLAYERS_LIMIT)
            .fetch_all(pool)
            .await
    }

    #[inline]
    pub async fn count(pool: &AnyPool, tables: &TableConfig) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", tables.players);
        sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await
    }
}

pub struct SupplyQueries;

impl SupplyQueries {
    /// Every supply in storage order.
    #[inline]
    pub async fn list_all(
        pool: &AnyPool,
        tables: &TableConfig,
    ) -> Result<Vec<SupplyRecord>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT COALESCE(CAST(id AS CHAR), '') AS id,
                   COALESCE(CAST(content AS CHAR), '') AS content
            FROM {}
            "#,
            tables.supplies
        );

        sqlx::query_as::<_, SupplyRecord>(&sql)
            .fetch_all(pool)
            .await
    }

    #[inline]
    pub async fn get_detail_by_id(
        pool: &AnyPool,
        tables: &TableConfig,
        id: &str,
    ) -> Result<Option<SupplyDetail>, sqlx::Error> {
        let sql = format!(
            r#"
            SELECT COALESCE(CAST(world AS CHAR), '') AS world,
                   COALESCE(CAST(x AS CHAR), '') AS x,
                   COALESCE(CAST(y AS CHAR), '') AS y,
                   COALESCE(CAST(z AS CHAR), '') AS z,
                   COALESCE(CAST(efficiency AS CHAR), '') AS efficiency,
                   COALESCE(CAST(status AS CHAR), '') AS status,
                   COALESCE(CAST(message AS CHAR), '') AS message
            FROM {} WHERE id = ?
            "#,
            tables.supplies
        );

        debug!("Looking up supply '{}'", id);
        sqlx::query_as::<_, SupplyDetail>(&sql)
            .bind(id)
            .fetch_optional(pool)
            .await
    }

    #[inline]
    pub async fn count(pool: &AnyPool, tables: &TableConfig) -> Result<i64, sqlx::Error> {
        let sql = format!("SELECT COUNT(*) FROM {}", tables.supplies);
        sqlx::query_scalar::<_, i64>(&sql).fetch_one(pool).await
    }
}
