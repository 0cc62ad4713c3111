// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Merge per-team enhanced updates into one per-section report for a week
// role: aggregation
// inputs: week key, EnhancedTeamUpdate list (order = contribution order)
// outputs: AggregatedReport with all four sections present (possibly empty)
// invariants:
// - within a section, contributions follow input order (the pipeline feeds team-id order)
// - teams with no lines in a section contribute nothing to it
// - a team id appears at most once
// errors: NoTeams when given nothing, DuplicateTeam on repeated team ids
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::{BTreeMap, BTreeSet};

use crate::error::AggregationError;
use crate::model::{AggregatedReport, Contribution, EnhancedTeamUpdate, SectionKind};

pub fn aggregate(week_key: &str, updates: &[EnhancedTeamUpdate]) -> Result<AggregatedReport, AggregationError> {
  if updates.is_empty() {
    return Err(AggregationError::NoTeams(week_key.to_string()));
  }

  let mut seen = BTreeSet::new();
  for u in updates {
    if !seen.insert(u.team_id()) {
      return Err(AggregationError::DuplicateTeam(u.team_id().to_string()));
    }
  }

  let mut by_section: BTreeMap<SectionKind, Vec<Contribution>> =
    SectionKind::ALL.iter().map(|k| (*k, Vec::new())).collect();
  for u in updates {
    for kind in SectionKind::ALL {
      let lines = u.effective_lines(kind);
      if lines.is_empty() {
        continue;
      }
      by_section.entry(kind).or_default().push(Contribution {
        team_id: u.team_id().to_string(),
        lines: lines.to_vec(),
      });
    }
  }

  Ok(AggregatedReport {
    week_key: week_key.to_string(),
    by_section,
  })
}
