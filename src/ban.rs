use chrono::{NaiveDateTime, TimeDelta};
use serde::Serialize;

use crate::player::TIME_FORMAT;
use crate::source::{SessionRow, TimeValue};

const FRACTIONAL_FORMAT: &str = "%Y-%m-%d %H:%M:%S%.f";

/// Why a ban record was left out of a result.
#[derive(Debug, thiserror::Error)]
pub enum RecordError {
    #[error("missing field `{0}`")]
    MissingField(&'static str),
    #[error("could not parse `{field}` from {value:?}")]
    BadTime {
        field: &'static str,
        value: String,
        #[source]
        source: chrono::ParseError,
    },
}

/// Parses a stored time, trying the fractional text form before the
/// whole-second one.
pub fn parse_time(value: &TimeValue) -> Result<NaiveDateTime, chrono::ParseError> {
    match value {
        TimeValue::Timestamp(ts) => Ok(*ts),
        TimeValue::Text(text) => NaiveDateTime::parse_from_str(text, FRACTIONAL_FORMAT)
            .or_else(|_| NaiveDateTime::parse_from_str(text, TIME_FORMAT)),
    }
}

fn required_time(field: &'static str, value: Option<&TimeValue>) -> Result<NaiveDateTime, RecordError> {
    let value = value.ok_or(RecordError::MissingField(field))?;
    parse_time(value).map_err(|source| RecordError::BadTime {
        field,
        value: describe(value),
        source,
    })
}

fn describe(value: &TimeValue) -> String {
    match value {
        TimeValue::Timestamp(ts) => ts.to_string(),
        TimeValue::Text(text) => text.clone(),
    }
}

/// Seconds between two instants, keeping sub-second precision. Negative when
/// `end` precedes `start`.
pub fn seconds_between(start: NaiveDateTime, end: NaiveDateTime) -> f64 {
    let delta = end - start;
    match delta.num_microseconds() {
        Some(us) => us as f64 / 1_000_000.0,
        None => delta.num_seconds() as f64,
    }
}

/// A ban record with both ends parsed, ready to be summed per profile.
#[derive(Debug, Clone, PartialEq)]
pub struct BanSpan {
    pub profile: String,
    pub create_time: NaiveDateTime,
    pub end_time: NaiveDateTime,
}

impl BanSpan {
    pub fn duration_seconds(&self) -> f64 {
        seconds_between(self.create_time, self.end_time)
    }
}

impl TryFrom<&SessionRow> for BanSpan {
    type Error = RecordError;

    fn try_from(row: &SessionRow) -> Result<Self, Self::Error> {
        let profile = row.profile.clone().ok_or(RecordError::MissingField("profile"))?;
        let create_time = required_time("createTime", row.create_time.as_ref())?;
        let end_time = required_time("endTime", row.end_time.as_ref())?;

        Ok(Self {
            profile,
            create_time,
            end_time,
        })
    }
}

/// A single ban as listed by `/api/bans`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct BanEntry {
    pub id: Option<i64>,
    pub profile: Option<String>,
    pub reason: Option<String>,
    pub operator: Option<String>,
    #[serde(rename = "createTime")]
    pub create_time: String,
    #[serde(rename = "endTime")]
    pub end_time: Option<String>,
    /// Absent for open-ended bans.
    pub duration_seconds: Option<f64>,
    #[serde(rename = "timePeriod")]
    pub time_period: String,
    #[serde(rename = "isUnbanned")]
    pub is_unbanned: bool,
}

impl BanEntry {
    pub fn from_row(row: SessionRow, now: NaiveDateTime) -> Result<Self, RecordError> {
        let create_time = required_time("createTime", row.create_time.as_ref())?;
        let end_time = match row.end_time.as_ref() {
            Some(_) => Some(required_time("endTime", row.end_time.as_ref())?),
            None => None,
        };

        Ok(Self {
            id: row.id,
            profile: row.profile,
            reason: row.reason,
            operator: row.operator,
            create_time: create_time.format(TIME_FORMAT).to_string(),
            end_time: end_time.map(|t| t.format(TIME_FORMAT).to_string()),
            duration_seconds: end_time.map(|end| seconds_between(create_time, end)),
            time_period: time_period(create_time, end_time, now),
            is_unbanned: end_time.map_or(false, |end| end < now),
        })
    }
}

/// Coarse length of a ban in the largest whole unit: years (of 365 days),
/// days, hours, then minutes. Open-ended bans run to a century from `now`.
pub fn time_period(start: NaiveDateTime, end: Option<NaiveDateTime>, now: NaiveDateTime) -> String {
    let end = end.unwrap_or_else(|| now + TimeDelta::days(365 * 100));
    let millis = (end - start).num_milliseconds();

    let minutes = millis.div_euclid(60 * 1000);
    let hours = millis.div_euclid(60 * 60 * 1000);
    let days = millis.div_euclid(24 * 60 * 60 * 1000);
    let years = days.div_euclid(365);

    if years > 0 {
        format!("{}年", years)
    } else if days > 0 {
        format!("{}天", days)
    } else if hours > 0 {
        format!("{}小时", hours)
    } else {
        format!("{}分钟", minutes)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn at(y: i32, mo: u32, d: u32, h: u32, mi: u32, s: u32) -> NaiveDateTime {
        NaiveDate::from_ymd_opt(y, mo, d)
            .unwrap()
            .and_hms_opt(h, mi, s)
            .unwrap()
    }

    fn text(s: &str) -> Option<TimeValue> {
        Some(TimeValue::Text(s.to_string()))
    }

    #[test]
    fn parses_both_text_precisions() {
        let whole = parse_time(&TimeValue::Text("2024-01-01 00:00:10".into())).unwrap();
        assert_eq!(whole, at(2024, 1, 1, 0, 0, 10));

        let fractional = parse_time(&TimeValue::Text("2024-01-01 00:00:10.500000".into())).unwrap();
        assert_eq!(seconds_between(whole, fractional), 0.5);
    }

    #[test]
    fn rejects_garbage_text() {
        assert!(parse_time(&TimeValue::Text("yesterday".into())).is_err());
        assert!(parse_time(&TimeValue::Text("2024-01-01".into())).is_err());
    }

    #[test]
    fn span_requires_every_field() {
        let row = SessionRow {
            profile: Some("a".into()),
            create_time: text("2024-01-01 00:00:00"),
            end_time: None,
            ..Default::default()
        };
        assert!(matches!(
            BanSpan::try_from(&row),
            Err(RecordError::MissingField("endTime"))
        ));

        let row = SessionRow {
            profile: None,
            create_time: text("2024-01-01 00:00:00"),
            end_time: text("2024-01-01 00:01:00"),
            ..Default::default()
        };
        assert!(matches!(
            BanSpan::try_from(&row),
            Err(RecordError::MissingField("profile"))
        ));
    }

    #[test]
    fn negative_durations_pass_through() {
        let row = SessionRow {
            profile: Some("a".into()),
            create_time: text("2024-01-01 00:01:00"),
            end_time: text("2024-01-01 00:00:00"),
            ..Default::default()
        };
        assert_eq!(BanSpan::try_from(&row).unwrap().duration_seconds(), -60.0);
    }

    #[test]
    fn time_period_picks_largest_unit() {
        let start = at(2024, 1, 1, 0, 0, 0);
        let now = at(2024, 6, 1, 0, 0, 0);

        assert_eq!(time_period(start, Some(at(2024, 1, 1, 0, 42, 59)), now), "42分钟");
        assert_eq!(time_period(start, Some(at(2024, 1, 1, 5, 0, 0)), now), "5小时");
        assert_eq!(time_period(start, Some(at(2024, 1, 31, 0, 0, 0)), now), "30天");
        assert_eq!(time_period(start, Some(at(2026, 1, 1, 0, 0, 0)), now), "2年");
        assert_eq!(time_period(start, None, now), "100年");
    }

    #[test]
    fn ban_entry_marks_expired_bans() {
        let now = at(2024, 6, 1, 0, 0, 0);
        let row = SessionRow {
            id: Some(3),
            profile: Some("griefer".into()),
            reason: Some("spam".into()),
            operator: Some("admin".into()),
            create_time: Some(TimeValue::Timestamp(at(2024, 5, 1, 0, 0, 0))),
            end_time: text("2024-05-02 00:00:00.000000"),
        };

        let entry = BanEntry::from_row(row, now).unwrap();
        assert!(entry.is_unbanned);
        assert_eq!(entry.time_period, "1天");
        assert_eq!(entry.duration_seconds, Some(86_400.0));
        assert_eq!(entry.end_time.as_deref(), Some("2024-05-02 00:00:00"));
    }

    #[test]
    fn ban_with_unparsable_end_is_rejected() {
        let now = at(2024, 6, 1, 0, 0, 0);
        let row = SessionRow {
            profile: Some("griefer".into()),
            create_time: text("2024-05-01 00:00:00"),
            end_time: text("garbage"),
            ..Default::default()
        };

        assert!(matches!(
            BanEntry::from_row(row, now),
            Err(RecordError::BadTime { field: "endTime", .. })
        ));
    }

    #[test]
    fn open_ended_ban_is_active() {
        let now = at(2024, 6, 1, 0, 0, 0);
        let row = SessionRow {
            profile: Some("griefer".into()),
            create_time: text("2024-05-01 00:00:00"),
            ..Default::default()
        };

        let entry = BanEntry::from_row(row, now).unwrap();
        assert!(!entry.is_unbanned);
        assert_eq!(entry.duration_seconds, None);
        assert_eq!(entry.end_time, None);

        let json = serde_json::to_value(&entry).unwrap();
        assert_eq!(json["createTime"], "2024-05-01 00:00:00");
        assert_eq!(json["isUnbanned"], false);
        assert!(json["duration_seconds"].is_null());
    }
}
