use chrono::{Datelike, Duration, NaiveDate, TimeZone, Utc, Weekday};
use proptest::prelude::*;

use team_update_report::model::SectionKind;
use team_update_report::parse::{parse_text, ParsePolicy};
use team_update_report::week::resolve;

fn line() -> impl Strategy<Value = String> {
  prop_oneof![
    Just("Progress:".to_string()),
    Just("Problems".to_string()),
    Just("Plan:".to_string()),
    Just("Insights:".to_string()),
    Just("Risks:".to_string()),
    Just("Team: Prop".to_string()),
    Just(String::new()),
    "[a-z ]{0,12}".prop_map(|s| format!("• {}", s)),
    "[a-z ]{0,12}".prop_map(|s| format!("- {}", s)),
    "[a-zA-Z:•* -]{0,16}",
  ]
}

proptest! {
  #[test]
  fn parser_is_total_and_idempotent(lines in proptest::collection::vec(line(), 0..24)) {
    let text = lines.join("\n");
    for policy in [ParsePolicy::Strict, ParsePolicy::Permissive] {
      let a = parse_text("", &text, policy);
      let b = parse_text("", &text, policy);
      prop_assert_eq!(&a, &b);
      prop_assert_eq!(a.sections.len(), 4);
      for kind in SectionKind::ALL {
        prop_assert!(a.lines(kind).iter().all(|l| !l.trim().is_empty()));
      }
    }
  }

  #[test]
  fn reserializing_a_parsed_update_is_stable(lines in proptest::collection::vec(line(), 0..24)) {
    let first = parse_text("Prop", &lines.join("\n"), ParsePolicy::Strict);
    let second = parse_text("Prop", &first.to_text(), ParsePolicy::Strict);
    prop_assert_eq!(first, second);
  }

  #[test]
  fn week_is_constant_monday_to_friday(days in 0i64..3000, weekday in 0i64..5, hour in 0u32..24) {
    let monday = NaiveDate::from_ymd_opt(2020, 1, 6).unwrap() + Duration::weeks(days / 7);
    prop_assert_eq!(monday.weekday(), Weekday::Mon);
    let day = monday + Duration::days(weekday);
    let now = Utc.from_utc_datetime(&day.and_hms_opt(hour, 0, 0).unwrap());
    let period = resolve(&now);
    prop_assert_eq!(period.start, monday);
    prop_assert_eq!(period.end, monday + Duration::days(4));
    prop_assert_eq!(period.key, monday.format("%Y-%m-%d").to_string());

    let next = resolve(&(now + Duration::days(7)));
    prop_assert_eq!(next.start, monday + Duration::days(7));
  }
}
