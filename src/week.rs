// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Resolve the Monday–Friday reporting week that keys every per-week artifact
// role: time/week-bucketing
// inputs: A timestamp in any chrono TimeZone, or a stored week key (YYYY-MM-DD Monday)
// outputs: WeekPeriod {start, end, key}
// invariants:
// - start is a Monday, end = start + 4 days (Friday)
// - Sunday belongs to the upcoming Monday's week (business-week semantics)
// - resolve is pure: same calendar day ⇒ same WeekPeriod
// errors: from_key rejects malformed dates and non-Mondays
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use anyhow::{bail, Context, Result};
use chrono::{DateTime, Datelike, Duration, Local, NaiveDate, TimeZone, Weekday};
use serde::{Deserialize, Serialize};

const KEY_FORMAT: &str = "%Y-%m-%d";

#[derive(Clone, Eq, PartialEq, Debug, Serialize, Deserialize)]
pub struct WeekPeriod {
  pub start: NaiveDate,
  pub end: NaiveDate,
  pub key: String,
}

impl WeekPeriod {
  fn from_monday(monday: NaiveDate) -> Self {
    WeekPeriod {
      start: monday,
      end: monday + Duration::days(4),
      key: monday.format(KEY_FORMAT).to_string(),
    }
  }

  /// Re-derive a period from a stored key.
  pub fn from_key(key: &str) -> Result<Self> {
    let date = NaiveDate::parse_from_str(key.trim(), KEY_FORMAT)
      .with_context(|| format!("parsing week key {:?} (expected YYYY-MM-DD)", key))?;
    if date.weekday() != Weekday::Mon {
      bail!("week key {} is a {:?}, expected a Monday", key, date.weekday());
    }
    Ok(Self::from_monday(date))
  }

  /// Human label used in document headers, e.g. "2024-06-03 to 2024-06-07".
  pub fn label(&self) -> String {
    format!("{} to {}", self.start.format(KEY_FORMAT), self.end.format(KEY_FORMAT))
  }

  /// Start of the week (Monday 00:00) in the given timezone, as a Unix timestamp.
  pub fn start_epoch<Tz: TimeZone>(&self, tz: &Tz) -> i64 {
    let midnight = self.start.and_hms_opt(0, 0, 0).unwrap_or_default();
    match tz.from_local_datetime(&midnight).earliest() {
      Some(dt) => dt.timestamp(),
      None => midnight.and_utc().timestamp(),
    }
  }

  /// Lower bound for pulling chat history at `now`: Monday 00:00 of this week, or of the
  /// week just ending when `now` is a Sunday already keyed to the upcoming Monday.
  pub fn pull_since<Tz: TimeZone>(&self, now: &DateTime<Tz>) -> i64 {
    let start = self.start_epoch(&now.timezone());
    if now.timestamp() >= start {
      return start;
    }
    Self::from_monday(self.start - Duration::days(7)).start_epoch(&now.timezone())
  }
}

/// Compute the reporting week containing `now`'s local calendar date.
pub fn resolve<Tz: TimeZone>(now: &DateTime<Tz>) -> WeekPeriod {
  let date = now.date_naive();
  let monday = match date.weekday() {
    Weekday::Sun => date + Duration::days(1),
    wd => date - Duration::days(wd.num_days_from_monday() as i64),
  };
  WeekPeriod::from_monday(monday)
}

/// Parse a `--now-override` string into a local DateTime.
/// Accepts RFC3339 (e.g. 2025-08-15T12:00:00Z) or a naive local timestamp
/// formatted as `%Y-%m-%dT%H:%M:%S`.
pub fn parse_now_override(s: Option<&str>) -> Option<DateTime<Local>> {
  s.and_then(|raw| {
    DateTime::parse_from_rfc3339(raw)
      .ok()
      .map(|dt| dt.with_timezone(&Local))
      .or_else(|| {
        chrono::NaiveDateTime::parse_from_str(raw, "%Y-%m-%dT%H:%M:%S")
          .ok()
          .and_then(|ndt| ndt.and_local_timezone(Local).single())
      })
  })
}

/// Returns the effective "now" given an optional override.
pub fn effective_now(override_now: Option<DateTime<Local>>) -> DateTime<Local> {
  override_now.unwrap_or_else(Local::now)
}
