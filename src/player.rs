use serde::Serialize;

use crate::source::{ProfileRow, TimeValue};

/// Canonical text form for timestamps sent to clients.
pub const TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// A ranked player profile as served by `/api/getList`.
#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct PlayerEntry {
    pub id: i64,
    pub last_name: Option<String>,
    pub total_exp: i64,
    pub total_time: i64,
    pub last_time: Option<String>,
}

impl From<ProfileRow> for PlayerEntry {
    fn from(row: ProfileRow) -> Self {
        Self {
            id: row.id,
            last_name: row.last_name,
            total_exp: row.total_exp,
            total_time: row.total_time,
            last_time: row.last_time.map(render_time),
        }
    }
}

/// Native timestamps are normalized, text is passed through as stored.
fn render_time(value: TimeValue) -> String {
    match value {
        TimeValue::Timestamp(ts) => ts.format(TIME_FORMAT).to_string(),
        TimeValue::Text(text) => text,
    }
}
