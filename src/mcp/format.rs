//! Text rendering for tool results
//!
//! Agents read these strings directly, so every outcome (including "nothing
//! found") renders to a plain sentence.

use chrono::{DateTime, FixedOffset};

use crate::database::{PlayerRecord, SupplyDetail, SupplyRecord};

/// Timestamps are shown in UTC+8
pub const DISPLAY_UTC_OFFSET_SECS: i32 = 8 * 3600;

pub const TIMESTAMP_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

pub const PLAYER_NOT_FOUND: &str = "Player not found";

pub const NO_SUPPLIES_FOUND: &str = "No supplies found";

/// Render epoch milliseconds as `YYYY-MM-DD HH:MM:SS` in UTC+8. Values chrono
/// cannot represent fall back to the raw number.
#[inline]
pub fn format_timestamp(millis: i64) -> String {
    let Some(offset) = FixedOffset::east_opt(DISPLAY_UTC_OFFSET_SECS) else {
        return millis.to_string();
    };

    DateTime::from_timestamp_millis(millis).map_or_else(
        || millis.to_string(),
        |utc| utc.with_timezone(&offset).format(TIMESTAMP_FORMAT).to_string(),
    )
}

#[inline]
pub fn player_info(record: Option<&PlayerRecord>) -> String {
    let Some(player) = record else {
        return PLAYER_NOT_FOUND.to_string();
    };

    let status = if player.is_online() { "online" } else { "offline" };

    format!(
        "Player {} registered at {}, last logged in at {}, currently {}",
        player.realname,
        format_timestamp(player.regdate),
        format_timestamp(player.lastlogin),
        status
    )
}

/// One `- ID: .., content: ..` line per supply, in the order given.
#[inline]
pub fn supply_list(records: &[SupplyRecord]) -> String {
    if records.is_empty() {
        return NO_SUPPLIES_FOUND.to_string();
    }

    records
        .iter()
        .map(|supply| format!("- ID: {}, content: {}", supply.id, supply.content))
        .collect::<Vec<_>>()
        .join("\n")
}

#[inline]
pub fn supply_not_found(id: &str) -> String {
    format!("No details found for supply ID {}", id)
}

#[inline]
pub fn supply_detail(id: &str, detail: Option<&SupplyDetail>) -> String {
    let Some(detail) = detail else {
        return supply_not_found(id);
    };

    [
        format!("Supply ID: {}", id),
        format!("World: {}", detail.world),
        format!("Coordinates: X={}, Y={}, Z={}", detail.x, detail.y, detail.z),
        format!("Efficiency: {}", detail.efficiency),
        format!("Status: {}", detail.supply_status()),
        format!("Message: {}", detail.message),
    ]
    .join("\n")
}
