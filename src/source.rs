//! Read-only access to the game database.
//!
//! Rows are decoded into fixed-shape structs here so the ranking code never
//! deals with column lookups.

use async_trait::async_trait;
use chrono::NaiveDateTime;

pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

#[derive(Debug, thiserror::Error)]
pub enum SourceError {
    /// Connecting to the store failed or timed out.
    #[error("database unavailable")]
    Unavailable(#[source] BoxError),
    /// The store rejected the query or returned an unexpected shape.
    #[error("query failed")]
    Query(#[source] BoxError),
}

/// A time column that may be stored natively or as text.
#[derive(Debug, Clone, PartialEq)]
pub enum TimeValue {
    Timestamp(NaiveDateTime),
    Text(String),
}

/// One row of `PlayerProfile`.
#[derive(Debug, Clone, PartialEq)]
pub struct ProfileRow {
    pub id: i64,
    pub last_name: Option<String>,
    pub total_exp: i64,
    pub total_time: i64,
    pub last_time: Option<TimeValue>,
}

/// One row of `playerban`. Every column is optional so a single bad row
/// can be skipped instead of failing the whole query.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct SessionRow {
    pub id: Option<i64>,
    pub profile: Option<String>,
    pub reason: Option<String>,
    pub operator: Option<String>,
    pub create_time: Option<TimeValue>,
    pub end_time: Option<TimeValue>,
}

#[async_trait]
pub trait LeaderboardSource: Send + Sync {
    /// Top profiles by experience, highest first, at most 50.
    async fn query_top_experience(&self) -> Result<Vec<ProfileRow>, SourceError>;

    /// Every ban record, newest first.
    async fn query_all_session_records(&self) -> Result<Vec<SessionRow>, SourceError>;
}
