// === Module Header (agents-tooling) START ===
// header: Parsed by scripts/check_module_headers.sh for purpose/role presence; keep keys on single-line entries.
// purpose: Render an AggregatedReport into the weekly Markdown or HTML document
// role: rendering
// inputs: AggregatedReport, WeekPeriod, DocFormat
// outputs: RenderedDocument (week key + format + body)
// invariants:
// - sections always appear in order Progress, Problems, Plan, Insights, all four every time
// - within a section, team sub-blocks follow aggregate order
// - empty sections render the fixed "no updates" line
// - HTML output escapes team ids and text
// tie_breakers: contracts > orchestration > correctness > performance > minimal_diffs
// === Module Header END ===

use std::fmt::Write as _;

use crate::model::{AggregatedReport, DocFormat, RenderedDocument, SectionKind};
use crate::week::WeekPeriod;

pub const DOCUMENT_TITLE: &str = "Weekly progress updates";
pub const EMPTY_SECTION: &str = "No updates this week.";

pub fn render(report: &AggregatedReport, period: &WeekPeriod, format: DocFormat) -> RenderedDocument {
  let body = match format {
    DocFormat::Markdown => render_markdown(report, period),
    DocFormat::Html => render_html(report, period),
  };
  RenderedDocument {
    week_key: report.week_key.clone(),
    format,
    body,
  }
}

fn render_markdown(report: &AggregatedReport, period: &WeekPeriod) -> String {
  let mut out = String::new();
  let _ = writeln!(out, "# {}\n\n---\n", DOCUMENT_TITLE);
  let _ = writeln!(out, "## Week of Monday {}\n", report.week_key);
  let _ = writeln!(out, "_{}_\n", period.label());
  out.push_str("<div class=\"grid cards\" markdown>\n\n");
  for kind in SectionKind::ALL {
    let _ = writeln!(out, "- __{}__\n", kind.title());
    let contributions = report.section(kind);
    if contributions.is_empty() {
      let _ = writeln!(out, "    _{}_\n", EMPTY_SECTION);
      continue;
    }
    for c in contributions {
      let _ = writeln!(out, "    **{}**\n", c.team_id);
      for line in &c.lines {
        let _ = writeln!(out, "    - {}", line);
      }
      out.push('\n');
    }
  }
  out.push_str("</div>\n");
  out
}

fn escape_html(s: &str) -> String {
  let mut out = String::with_capacity(s.len());
  for ch in s.chars() {
    match ch {
      '&' => out.push_str("&amp;"),
      '<' => out.push_str("&lt;"),
      '>' => out.push_str("&gt;"),
      '"' => out.push_str("&quot;"),
      '\'' => out.push_str("&#39;"),
      c => out.push(c),
    }
  }
  out
}

fn render_html(report: &AggregatedReport, period: &WeekPeriod) -> String {
  let mut out = String::new();
  out.push_str("<!DOCTYPE html>\n<html>\n<head>\n<meta charset=\"utf-8\">\n");
  let _ = writeln!(out, "<title>{} {}</title>", DOCUMENT_TITLE, escape_html(&report.week_key));
  out.push_str("</head>\n<body>\n");
  let _ = writeln!(out, "<h1>{}</h1>", DOCUMENT_TITLE);
  let _ = writeln!(out, "<h2>Week of Monday {}</h2>", escape_html(&report.week_key));
  let _ = writeln!(out, "<p><em>{}</em></p>", escape_html(&period.label()));
  out.push_str("<div class=\"grid cards\">\n");
  for kind in SectionKind::ALL {
    let _ = writeln!(out, "<section class=\"{}\">", kind.title().to_lowercase());
    let _ = writeln!(out, "<h3>{}</h3>", kind.title());
    let contributions = report.section(kind);
    if contributions.is_empty() {
      let _ = writeln!(out, "<p><em>{}</em></p>", EMPTY_SECTION);
    }
    for c in contributions {
      let _ = writeln!(out, "<div class=\"team\">\n<h4>{}</h4>\n<ul>", escape_html(&c.team_id));
      for line in &c.lines {
        let _ = writeln!(out, "<li>{}</li>", escape_html(line));
      }
      out.push_str("</ul>\n</div>\n");
    }
    out.push_str("</section>\n");
  }
  out.push_str("</div>\n</body>\n</html>\n");
  out
}
