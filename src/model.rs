// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Define the data model shared by ingestion, parsing, enhancement, aggregation, rendering and publishing
// role: model/types
// outputs: Serializable structs for raw/structured/enhanced team updates, aggregated reports and rendered documents
// invariants:
// - SectionKind is closed: Progress, Problems, Plan, Insights (canonical order = declaration order)
// - TeamUpdate always carries all four section keys, possibly empty
// - RenderedDocument is the only value handed to publishing
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::collections::BTreeMap;
use std::fmt;

use clap::ValueEnum;
use serde::{Deserialize, Serialize};

/// The closed set of report sections, declared in canonical render order.
#[derive(Copy, Clone, Eq, PartialEq, Ord, PartialOrd, Hash, Debug, Serialize, Deserialize)]
pub enum SectionKind {
  Progress,
  Problems,
  Plan,
  Insights,
}

impl SectionKind {
  pub const ALL: [SectionKind; 4] = [
    SectionKind::Progress,
    SectionKind::Problems,
    SectionKind::Plan,
    SectionKind::Insights,
  ];

  /// Exact, case-sensitive header keyword match. `Plans` is accepted as an alias of `Plan`.
  pub fn from_header(word: &str) -> Option<SectionKind> {
    match word {
      "Progress" => Some(SectionKind::Progress),
      "Problems" => Some(SectionKind::Problems),
      "Plan" | "Plans" => Some(SectionKind::Plan),
      "Insights" => Some(SectionKind::Insights),
      _ => None,
    }
  }

  pub fn title(&self) -> &'static str {
    match self {
      SectionKind::Progress => "Progress",
      SectionKind::Problems => "Problems",
      SectionKind::Plan => "Plan",
      SectionKind::Insights => "Insights",
    }
  }
}

impl fmt::Display for SectionKind {
  fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
    f.write_str(self.title())
  }
}

/// One team's unprocessed submission for one week.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RawTeamUpdate {
  pub team_id: String,
  pub week_key: String,
  pub text: String,
}

pub type Sections = BTreeMap<SectionKind, Vec<String>>;

fn empty_sections() -> Sections {
  SectionKind::ALL.iter().map(|k| (*k, Vec::new())).collect()
}

/// Structured team update. Built by the section parser.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct TeamUpdate {
  pub team_id: String,
  pub sections: Sections,
}

impl TeamUpdate {
  pub fn new(team_id: impl Into<String>) -> Self {
    Self {
      team_id: team_id.into(),
      sections: empty_sections(),
    }
  }

  pub fn lines(&self, kind: SectionKind) -> &[String] {
    self.sections.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
  }

  pub fn push(&mut self, kind: SectionKind, line: String) {
    self.sections.entry(kind).or_default().push(line);
  }

  pub fn is_empty(&self) -> bool {
    self.sections.values().all(|v| v.is_empty())
  }

  /// Serialize back into the submission text format understood by the parser.
  pub fn to_text(&self) -> String {
    let mut out = format!("Team: {}\n", self.team_id);
    for kind in SectionKind::ALL {
      let lines = self.lines(kind);
      if lines.is_empty() {
        continue;
      }
      out.push_str(&format!("{}:\n", kind.title()));
      for line in lines {
        out.push_str(&format!("• {}\n", line));
      }
    }
    out
  }
}

/// A section-level enhancement failure kept alongside the update for reporting.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SectionFailure {
  /// `None` when the whole document was enhanced in a single call.
  pub section: Option<SectionKind>,
  pub message: String,
}

/// A team update after the enhancement stage. Sections without an enhanced
/// version fall back to the original lines.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnhancedTeamUpdate {
  pub original: TeamUpdate,
  pub enhanced: BTreeMap<SectionKind, Vec<String>>,
  pub failures: Vec<SectionFailure>,
}

impl EnhancedTeamUpdate {
  pub fn unenhanced(original: TeamUpdate) -> Self {
    Self {
      original,
      enhanced: BTreeMap::new(),
      failures: Vec::new(),
    }
  }

  pub fn team_id(&self) -> &str {
    &self.original.team_id
  }

  /// Enhanced lines when present, original lines otherwise.
  pub fn effective_lines(&self, kind: SectionKind) -> &[String] {
    match self.enhanced.get(&kind) {
      Some(lines) => lines.as_slice(),
      None => self.original.lines(kind),
    }
  }

  /// Materialize the effective text as a plain `TeamUpdate`.
  pub fn effective(&self) -> TeamUpdate {
    let mut out = TeamUpdate::new(self.team_id());
    for kind in SectionKind::ALL {
      out.sections.insert(kind, self.effective_lines(kind).to_vec());
    }
    out
  }
}

impl From<TeamUpdate> for EnhancedTeamUpdate {
  fn from(update: TeamUpdate) -> Self {
    EnhancedTeamUpdate::unenhanced(update)
  }
}

/// One team's lines inside one section of the aggregate.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Contribution {
  pub team_id: String,
  pub lines: Vec<String>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct AggregatedReport {
  pub week_key: String,
  pub by_section: BTreeMap<SectionKind, Vec<Contribution>>,
}

impl AggregatedReport {
  pub fn section(&self, kind: SectionKind) -> &[Contribution] {
    self.by_section.get(&kind).map(|v| v.as_slice()).unwrap_or(&[])
  }
}

#[derive(Copy, Clone, Eq, PartialEq, Debug, Default, Serialize, Deserialize, ValueEnum)]
#[serde(rename_all = "lowercase")]
#[value(rename_all = "lowercase")]
pub enum DocFormat {
  #[default]
  Markdown,
  Html,
}

impl DocFormat {
  pub fn extension(&self) -> &'static str {
    match self {
      DocFormat::Markdown => "md",
      DocFormat::Html => "html",
    }
  }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct RenderedDocument {
  pub week_key: String,
  pub format: DocFormat,
  pub body: String,
}

impl RenderedDocument {
  /// Deterministic file name for this week's document.
  pub fn file_name(&self) -> String {
    format!("{}.{}", self.week_key, self.format.extension())
  }
}
