//! Human-readable rendering of comparison verdicts.

use std::fmt::Write as _;

use xcheck_runtime::Event;

use crate::oracle::{DivergenceReport, Verdict};
use crate::sitemap::SiteMap;

/// Output format for reports.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub enum ReportFormat {
    #[default]
    Text,
    Markdown,
}

/// Render a verdict. `compared` is the number of expected events.
#[must_use]
pub fn render(verdict: &Verdict, compared: usize, sites: &SiteMap, format: ReportFormat) -> String {
    match (verdict.report(), format) {
        (None, ReportFormat::Text) => format!("MATCH ({compared} events)\n"),
        (None, ReportFormat::Markdown) => {
            format!("## Cross-check: MATCH\n\n{compared} events compared, no divergence.\n")
        }
        (Some(report), ReportFormat::Text) => render_text(verdict, report, sites),
        (Some(report), ReportFormat::Markdown) => render_markdown(verdict, report, sites),
    }
}

fn headline(verdict: &Verdict) -> &'static str {
    match verdict {
        Verdict::Match => "MATCH",
        Verdict::Diverged(_) => "DIVERGED",
        Verdict::LengthMismatch(_) => "LENGTH_MISMATCH",
    }
}

fn describe(event: Option<&Event>, sites: &SiteMap) -> String {
    event.map_or_else(
        || "<end of stream>".to_string(),
        |e| {
            format!(
                "#{} {} {} hash={:#018x}",
                e.sequence,
                e.kind,
                sites.label(e.site_id),
                e.payload_hash
            )
        },
    )
}

fn last_common(report: &DivergenceReport) -> String {
    report
        .last_common_sequence
        .map_or_else(|| "none".to_string(), |s| s.to_string())
}

fn render_text(verdict: &Verdict, report: &DivergenceReport, sites: &SiteMap) -> String {
    let mut out = String::new();
    let _ = writeln!(
        out,
        "{} at sequence {}: {}",
        headline(verdict),
        report.first_mismatched_sequence,
        report.kind
    );
    let _ = writeln!(out, "  last common: {}", last_common(report));
    let _ = writeln!(out, "  expected:    {}", describe(report.expected.as_ref(), sites));
    let _ = writeln!(out, "  actual:      {}", describe(report.actual.as_ref(), sites));
    if !report.context.is_empty() {
        let _ = writeln!(out, "  context:");
        for event in &report.context {
            let _ = writeln!(out, "    {}", describe(Some(event), sites));
        }
    }
    out
}

fn render_markdown(verdict: &Verdict, report: &DivergenceReport, sites: &SiteMap) -> String {
    let mut out = String::new();
    let _ = writeln!(out, "## Cross-check: {}", headline(verdict));
    let _ = writeln!(out);
    let _ = writeln!(
        out,
        "First mismatch at sequence **{}** ({}), last common sequence {}.",
        report.first_mismatched_sequence,
        report.kind,
        last_common(report)
    );
    let _ = writeln!(out);

    let mut table = Table::new(vec!["", "seq", "kind", "site", "hash"])
        .with_alignments(vec![
            Alignment::Left,
            Alignment::Right,
            Alignment::Left,
            Alignment::Left,
            Alignment::Right,
        ]);
    for event in &report.context {
        table.add_row(event_row("", Some(event), sites));
    }
    table.add_row(event_row("expected", report.expected.as_ref(), sites));
    table.add_row(event_row("actual", report.actual.as_ref(), sites));
    out.push_str(&table.render());
    out
}

fn event_row(label: &str, event: Option<&Event>, sites: &SiteMap) -> Vec<String> {
    event.map_or_else(
        || {
            vec![
                label.to_string(),
                "-".to_string(),
                "-".to_string(),
                "<end of stream>".to_string(),
                "-".to_string(),
            ]
        },
        |e| {
            vec![
                label.to_string(),
                e.sequence.to_string(),
                e.kind.to_string(),
                sites.label(e.site_id),
                format!("{:#018x}", e.payload_hash),
            ]
        },
    )
}

// ============================================================================
// Markdown tables
// ============================================================================

/// Column alignment.
#[derive(Clone, Copy, Default)]
pub enum Alignment {
    #[default]
    Left,
    Right,
}

/// A builder for markdown tables.
pub struct Table {
    headers: Vec<String>,
    rows: Vec<Vec<String>>,
    alignments: Vec<Alignment>,
}

impl Table {
    #[must_use]
    pub fn new(headers: Vec<&str>) -> Self {
        let count = headers.len();
        Self {
            headers: headers.into_iter().map(String::from).collect(),
            rows: Vec::new(),
            alignments: vec![Alignment::Left; count],
        }
    }

    #[must_use]
    pub fn with_alignments(mut self, alignments: Vec<Alignment>) -> Self {
        self.alignments = alignments;
        self
    }

    pub fn add_row(&mut self, row: Vec<String>) {
        self.rows.push(row);
    }

    #[must_use]
    pub fn render(&self) -> String {
        if self.headers.is_empty() {
            return String::new();
        }

        let mut widths: Vec<usize> = self.headers.iter().map(String::len).collect();
        for row in &self.rows {
            for (i, cell) in row.iter().enumerate() {
                if i < widths.len() {
                    widths[i] = widths[i].max(cell.len());
                }
            }
        }

        let mut output = String::new();

        output.push('|');
        for (i, header) in self.headers.iter().enumerate() {
            let w = widths.get(i).copied().unwrap_or(0);
            let _ = write!(output, " {header:w$} |");
        }
        output.push('\n');

        output.push('|');
        for (i, &width) in widths.iter().enumerate() {
            let sep = match self.alignments.get(i).copied().unwrap_or_default() {
                Alignment::Left => format!(":{:-<w$}|", "", w = width + 1),
                Alignment::Right => format!("{:-<w$}:|", "", w = width + 1),
            };
            output.push_str(&sep);
        }
        output.push('\n');

        for row in &self.rows {
            output.push('|');
            for (i, cell) in row.iter().enumerate() {
                let w = widths.get(i).copied().unwrap_or(0);
                let _ = match self.alignments.get(i).copied().unwrap_or_default() {
                    Alignment::Left => write!(output, " {cell:<w$} |"),
                    Alignment::Right => write!(output, " {cell:>w$} |"),
                };
            }
            output.push('\n');
        }

        output
    }
}
