//! Turns database rows into the ranked lists served to clients.

use std::collections::HashMap;

use chrono::NaiveDateTime;
use serde::{Deserialize, Serialize};

use crate::ban::{BanEntry, BanSpan};
use crate::player::PlayerEntry;
use crate::source::{LeaderboardSource, ProfileRow, SessionRow, SourceError};

/// Maximum number of entries in a ranking.
pub const TOP_N: usize = 50;

/// Ranking served at `/api/getList`.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Strategy {
    /// Profiles ordered by total experience.
    #[default]
    Experience,
    /// Profiles ordered by their summed ban time.
    Duration,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct DurationEntry {
    pub profile: String,
    pub total_duration_seconds: f64,
}

#[derive(Debug, Clone, PartialEq, Serialize)]
#[serde(untagged)]
pub enum Entry {
    Player(PlayerEntry),
    Duration(DurationEntry),
}

impl Strategy {
    pub async fn fetch(self, source: &dyn LeaderboardSource) -> Result<Vec<Entry>, SourceError> {
        Ok(match self {
            Strategy::Experience => rank_by_experience(source.query_top_experience().await?)
                .into_iter()
                .map(Entry::Player)
                .collect(),
            Strategy::Duration => sum_durations(&source.query_all_session_records().await?)
                .into_iter()
                .map(Entry::Duration)
                .collect(),
        })
    }
}

/// Keeps the source order, which is already highest experience first.
pub fn rank_by_experience(rows: Vec<ProfileRow>) -> Vec<PlayerEntry> {
    rows.into_iter().take(TOP_N).map(PlayerEntry::from).collect()
}

/// Sums ban time per profile and returns the longest totals first.
///
/// Records that are missing a field or carry an unparsable time are logged
/// and skipped. Equal totals keep the order in which their profile first
/// appeared.
pub fn sum_durations(rows: &[SessionRow]) -> Vec<DurationEntry> {
    let mut index: HashMap<String, usize> = HashMap::new();
    let mut totals: Vec<DurationEntry> = Vec::new();

    for row in rows {
        let span = match BanSpan::try_from(row) {
            Ok(span) => span,
            Err(e) => {
                tracing::warn!("skipping ban record {:?}: {}", row.id, e);
                continue;
            }
        };

        let duration = span.duration_seconds();
        let slot = *index.entry(span.profile.clone()).or_insert_with(|| {
            totals.push(DurationEntry {
                profile: span.profile,
                total_duration_seconds: 0.0,
            });
            totals.len() - 1
        });
        totals[slot].total_duration_seconds += duration;
    }

    totals.sort_by(|a, b| b.total_duration_seconds.total_cmp(&a.total_duration_seconds));
    totals.truncate(TOP_N);
    totals
}

/// Every ban, in source order, with its derived fields.
pub async fn fetch_bans(
    source: &dyn LeaderboardSource,
    now: NaiveDateTime,
) -> Result<Vec<BanEntry>, SourceError> {
    let rows = source.query_all_session_records().await?;

    Ok(rows
        .into_iter()
        .filter_map(|row| {
            let id = row.id;
            match BanEntry::from_row(row, now) {
                Ok(entry) => Some(entry),
                Err(e) => {
                    tracing::warn!("skipping ban record {:?}: {}", id, e);
                    None
                }
            }
        })
        .collect())
}
