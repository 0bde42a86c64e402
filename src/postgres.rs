use std::time::Duration;

use anyhow::Context;
use async_trait::async_trait;
use chrono::{DateTime, Local, NaiveDateTime, Utc};
use futures_util::TryStreamExt;
use sqlx::postgres::{PgConnectOptions, PgPool, PgPoolOptions, PgRow};
use sqlx::Row;

use crate::config::Database as DatabaseConfig;
use crate::leaderboard::TOP_N;
use crate::source::{LeaderboardSource, ProfileRow, SessionRow, SourceError, TimeValue};

/// Null `totalExp` rows sort last so they never take a ranked slot ahead of
/// real scores.
const TOP_EXPERIENCE_QUERY: &str = r#"
SELECT "id"::bigint AS "id",
       "lastName"::text AS "lastName",
       COALESCE("totalExp", 0)::bigint AS "totalExp",
       COALESCE("totalTime", 0)::bigint AS "totalTime",
       "lastTime"
FROM "PlayerProfile"
ORDER BY "totalExp" DESC NULLS LAST
LIMIT $1
"#;

const SESSION_RECORDS_QUERY: &str = r#"
SELECT "id"::bigint AS "id",
       "profile"::text AS "profile",
       "reason"::text AS "reason",
       "operator"::text AS "operator",
       "createTime",
       "endTime"
FROM public.playerban
ORDER BY "createTime" DESC
"#;

pub struct PgSource {
    pool: PgPool,
}

impl PgSource {
    /// Builds a lazily connecting pool, so the server starts even while the
    /// database is down and requests report the outage instead.
    pub fn new(config: &DatabaseConfig) -> anyhow::Result<Self> {
        let timeout = Duration::from_secs(config.timeout_secs);
        let options: PgConnectOptions = config
            .url
            .parse()
            .context("could not parse database url")?;
        let options = options.options([("statement_timeout", timeout.as_millis())]);

        let pool = PgPoolOptions::new()
            .max_connections(config.max_connections)
            .acquire_timeout(timeout)
            .connect_lazy_with(options);

        Ok(Self { pool })
    }
}

#[async_trait]
impl LeaderboardSource for PgSource {
    async fn query_top_experience(&self) -> Result<Vec<ProfileRow>, SourceError> {
        let rows = sqlx::query(TOP_EXPERIENCE_QUERY)
            .bind(TOP_N as i64)
            .fetch_all(&self.pool)
            .await
            .map_err(classify)?;

        rows.iter()
            .map(profile_row)
            .collect::<Result<Vec<_>, _>>()
            .map_err(|e| SourceError::Query(e.into()))
    }

    async fn query_all_session_records(&self) -> Result<Vec<SessionRow>, SourceError> {
        let mut stream = sqlx::query(SESSION_RECORDS_QUERY).fetch(&self.pool);
        let mut records = Vec::new();

        while let Some(row) = stream.try_next().await.map_err(classify)? {
            match session_row(&row) {
                Ok(record) => records.push(record),
                Err(e) => tracing::warn!("skipping undecodable ban row: {}", e),
            }
        }

        Ok(records)
    }
}

/// Connection-level failures become `Unavailable`, everything else is
/// treated as a problem with the query itself.
fn classify(e: sqlx::Error) -> SourceError {
    match e {
        sqlx::Error::Io(_)
        | sqlx::Error::Tls(_)
        | sqlx::Error::PoolTimedOut
        | sqlx::Error::PoolClosed
        | sqlx::Error::WorkerCrashed
        | sqlx::Error::Configuration(_) => SourceError::Unavailable(e.into()),
        e => SourceError::Query(e.into()),
    }
}

fn profile_row(row: &PgRow) -> Result<ProfileRow, sqlx::Error> {
    Ok(ProfileRow {
        id: row.try_get("id")?,
        last_name: row.try_get("lastName")?,
        total_exp: row.try_get("totalExp")?,
        total_time: row.try_get("totalTime")?,
        last_time: time_column(row, "lastTime")?,
    })
}

fn session_row(row: &PgRow) -> Result<SessionRow, sqlx::Error> {
    Ok(SessionRow {
        id: row.try_get("id")?,
        profile: row.try_get("profile")?,
        reason: row.try_get("reason")?,
        operator: row.try_get("operator")?,
        create_time: time_column(row, "createTime")?,
        end_time: time_column(row, "endTime")?,
    })
}

/// Accepts `timestamp`, `timestamptz` and text columns. Zoned values are
/// shifted to server local time to line up with naive ones.
fn time_column(row: &PgRow, column: &str) -> Result<Option<TimeValue>, sqlx::Error> {
    if let Ok(value) = row.try_get::<Option<NaiveDateTime>, _>(column) {
        return Ok(value.map(TimeValue::Timestamp));
    }
    if let Ok(value) = row.try_get::<Option<DateTime<Utc>>, _>(column) {
        return Ok(value.map(|v| TimeValue::Timestamp(v.with_timezone(&Local).naive_local())));
    }

    let value: Option<String> = row.try_get(column)?;
    Ok(value.map(TimeValue::Text))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn is_unavailable(e: sqlx::Error) -> bool {
        matches!(classify(e), SourceError::Unavailable(_))
    }

    #[test]
    fn connection_failures_are_unavailable() {
        assert!(is_unavailable(sqlx::Error::Io(std::io::Error::new(
            std::io::ErrorKind::ConnectionRefused,
            "connection refused",
        ))));
        assert!(is_unavailable(sqlx::Error::PoolTimedOut));
        assert!(is_unavailable(sqlx::Error::PoolClosed));
        assert!(is_unavailable(sqlx::Error::WorkerCrashed));
        assert!(is_unavailable(sqlx::Error::Configuration("bad url".into())));
    }

    #[test]
    fn query_problems_are_query_failures() {
        assert!(!is_unavailable(sqlx::Error::RowNotFound));
        assert!(!is_unavailable(sqlx::Error::ColumnNotFound("totalExp".to_string())));
        assert!(!is_unavailable(sqlx::Error::Protocol("unexpected message".to_string())));
    }

    #[test]
    fn classified_errors_hide_driver_text() {
        let e = classify(sqlx::Error::ColumnNotFound("totalExp".to_string()));
        assert_eq!(e.to_string(), "query failed");

        let e = classify(sqlx::Error::PoolTimedOut);
        assert_eq!(e.to_string(), "database unavailable");
    }

    #[test]
    fn experience_query_puts_null_scores_last() {
        assert!(TOP_EXPERIENCE_QUERY.contains(r#"ORDER BY "totalExp" DESC NULLS LAST"#));
    }
}
