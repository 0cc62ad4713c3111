// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Turn a team's free-text weekly update into the four fixed sections
// role: parsing/sections
// inputs: RawTeamUpdate (team id may be empty), ParsePolicy
// outputs: TeamUpdate with all four sections present
// invariants:
// - total: never fails; malformed input yields empty or partial sections
// - idempotent: same input ⇒ identical output
// - headers are exact, case-sensitive keywords with an optional trailing ':'
// - unrecognized headers clear the cursor; bullets before any header are dropped
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

use crate::model::{RawTeamUpdate, SectionKind, TeamUpdate};

pub const TEAM_MARKER: &str = "Team:";
const GLYPH_BULLET: char = '•';
const ASCII_BULLETS: [char; 2] = ['-', '*'];

/// What to do with non-bullet, non-header lines inside an active section.
#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum ParsePolicy {
  /// Only bullet lines contribute content.
  #[default]
  Strict,
  /// Any non-blank line contributes content verbatim.
  Permissive,
}

enum Line<'a> {
  Blank,
  Team(&'a str),
  Header(Option<SectionKind>),
  Bullet(&'a str),
  Text(&'a str),
}

/// Team id carried by a `Team:` line, if the line is one.
pub fn team_marker_value(line: &str) -> Option<&str> {
  line.trim().strip_prefix(TEAM_MARKER).map(str::trim)
}

/// Body of a bullet line (already trimmed), or `None` when the line is not a bullet.
pub(crate) fn bullet_body(line: &str) -> Option<&str> {
  if let Some(rest) = line.strip_prefix(GLYPH_BULLET) {
    return Some(rest.trim());
  }
  let mut chars = line.chars();
  let first = chars.next()?;
  if !ASCII_BULLETS.contains(&first) {
    return None;
  }
  let rest = chars.as_str();
  // "-foo" and "**bold**" are text, "- foo" and a lone "-" are bullets
  match rest.chars().next() {
    None => Some(""),
    Some(c) if c.is_whitespace() => Some(rest.trim()),
    Some(_) => None,
  }
}

fn classify(line: &str) -> Line<'_> {
  let trimmed = line.trim();
  if trimmed.is_empty() {
    return Line::Blank;
  }
  if let Some(team) = team_marker_value(trimmed) {
    return Line::Team(team);
  }
  if let Some(body) = bullet_body(trimmed) {
    return Line::Bullet(body);
  }
  let word = trimmed.strip_suffix(':').unwrap_or(trimmed).trim_end();
  if let Some(kind) = SectionKind::from_header(word) {
    return Line::Header(Some(kind));
  }
  if trimmed.ends_with(':') {
    return Line::Header(None);
  }
  Line::Text(trimmed)
}

/// Parse a raw update into its structured sections.
pub fn parse(raw: &RawTeamUpdate, policy: ParsePolicy) -> TeamUpdate {
  parse_text(&raw.team_id, &raw.text, policy)
}

/// Parse free text; `known_team` wins over any `Team:` line when non-empty.
pub fn parse_text(known_team: &str, text: &str, policy: ParsePolicy) -> TeamUpdate {
  let mut update = TeamUpdate::new(known_team.trim());
  let mut cursor: Option<SectionKind> = None;

  for line in text.lines() {
    match classify(line) {
      Line::Blank => {}
      Line::Team(team) => {
        if update.team_id.is_empty() && !team.is_empty() {
          update.team_id = team.to_string();
        }
      }
      Line::Header(kind) => cursor = kind,
      Line::Bullet(body) => {
        if let Some(kind) = cursor {
          if !body.is_empty() {
            update.push(kind, body.to_string());
          }
        }
      }
      Line::Text(body) => {
        if let (Some(kind), ParsePolicy::Permissive) = (cursor, policy) {
          update.push(kind, body.to_string());
        }
      }
    }
  }

  update
}
