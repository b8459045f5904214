
use serde::{Deserialize, Serialize};
use sqlx::FromRow;

/// A row of the AuthMe players table
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct PlayerRecord {
    pub realname: String,
    /// Epoch milliseconds
    pub lastlogin: i64,
    /// Epoch milliseconds
    pub regdate: i64,
    pub is_logged: i64,
}

impl PlayerRecord {
    #[inline]
    pub fn is_online(&self) -> bool {
        self.is_logged == 1
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SupplyRecord {
    pub id: String,
    pub content: String,
}

/// Location and state of a single supply point. Numeric columns are read as
/// text so the values render exactly as stored.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize, FromRow)]
pub struct SupplyDetail {
    pub world: String,
    pub x: String,
    pub y: String,
    pub z: String,
    pub efficiency: String,
    pub status: String,
    pub message: String,
}

impl SupplyDetail {
    #[inline]
    pub fn supply_status(&self) -> SupplyStatus {
        SupplyStatus::from_code(&self.status)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SupplyStatus {
    Unavailable,
    Available,
    Unknown,
}

impl SupplyStatus {
    #[inline]
    pub fn from_code(code: &str) -> Self {
        match code.trim() {
            "0" => SupplyStatus::Unavailable,
            "1" => SupplyStatus::Available,
            _ => SupplyStatus::Unknown,
        }
    }

    #[inline]
    pub fn label(self) -> &'static str {
        match self {
            SupplyStatus::Unavailable => "unavailable",
            SupplyStatus::Available => "available",
            SupplyStatus::Unknown => "unknown",
        }
    }
}

impl std::fmt::Display for SupplyStatus {
    #[inline]
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Row counts reported by `mcp-gateway check`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TableCounts {
    pub players: i64,
    pub supplies: i64,
}
