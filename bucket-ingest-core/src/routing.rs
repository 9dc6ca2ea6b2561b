//! Maps a file name to its destination table.

use crate::event::FileEvent;

/// Table ids per filename marker. `daily` is checked before `weekly`.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RoutingRule {
    pub daily_table: String,
    pub weekly_table: String,
    pub default_table: String,
}

/// Always returns exactly one table id.
pub fn resolve_table<'a>(event: &FileEvent, rule: &'a RoutingRule) -> &'a str {
    let file_name = event.leaf_name();
    if file_name.contains("daily") {
        &rule.daily_table
    } else if file_name.contains("weekly") {
        &rule.weekly_table
    } else {
        &rule.default_table
    }
}
