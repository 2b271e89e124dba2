//! Markdown rendering of a threat graph
//!
//! The renderer only reads the graph. Every section is a table; empty sections say so rather
//! than disappearing, so two reports of the same project always have the same shape.

use std::fmt::Write;

use chrono::{DateTime, Utc};
use threatline_config::ProjectConfig;
use threatline_core::{Source, ThreatGraph};

/// Default report file name
pub const DEFAULT_REPORT_FILE: &str = "ThreatModel.md";

/// Pipe table with a header row
#[derive(Debug, Clone, Default)]
pub struct MarkdownTable {
    header: Vec<String>,
    rows: Vec<Vec<String>>,
}

impl MarkdownTable {
    pub fn new(header: &[&str]) -> Self {
        Self {
            header: header.iter().map(|h| h.to_string()).collect(),
            rows: Vec::new(),
        }
    }

    /// Append a row; cells are escaped, missing cells are left blank
    pub fn row<I, S>(&mut self, cells: I) -> &mut Self
    where
        I: IntoIterator<Item = S>,
        S: AsRef<str>,
    {
        let mut row: Vec<String> = cells.into_iter().map(|c| escape_cell(c.as_ref())).collect();
        row.resize(self.header.len(), String::new());
        self.rows.push(row);
        self
    }

    pub fn is_empty(&self) -> bool {
        self.rows.is_empty()
    }

    pub fn render(&self) -> String {
        let mut out = String::new();
        let line = |cells: &[String]| format!("| {} |\n", cells.join(" | "));
        out.push_str(&line(&self.header));
        out.push_str(&line(&vec!["---".to_string(); self.header.len()]));
        for row in &self.rows {
            out.push_str(&line(row));
        }
        out
    }
}

fn escape_cell(text: &str) -> String {
    text.replace('|', "\\|").replace(['\r', '\n'], " ")
}

/// Render `graph` as the project's threat model document
pub fn render_report(
    graph: &ThreatGraph,
    config: &ProjectConfig,
    generated_at: DateTime<Utc>,
) -> String {
    let registry = graph.registry();
    let relations = graph.relations();
    let link = |source: &Source| source_link(source, config.repository_url.as_deref());

    let mut out = String::new();
    let _ = writeln!(out, "# {} Threat Model", config.project.name);
    out.push('\n');
    if !config.project.description.is_empty() {
        let _ = writeln!(out, "{}\n", config.project.description);
    }
    let _ = writeln!(
        out,
        "Generated {} from run `{}`.\n",
        generated_at.format("%Y-%m-%d %H:%M:%S UTC"),
        graph.run_id()
    );

    let mut summary = MarkdownTable::new(&["Kind", "Count"]);
    for (kind, count) in [
        ("Components", registry.components().len()),
        ("Controls", registry.controls().len()),
        ("Threats", registry.threats().len()),
        ("Mitigations", relations.mitigations().len()),
        ("Exposures", relations.exposures().len()),
        ("Acceptances", relations.acceptances().len()),
        ("Transfers", relations.transfers().len()),
        ("Connections", relations.connections().len()),
        ("Reviews", relations.reviews().len()),
        ("Tests", relations.tests().len()),
    ] {
        summary.row([kind.to_string(), count.to_string()]);
    }
    section(&mut out, "Summary", &summary);

    let mut components = MarkdownTable::new(&["Component", "Path", "Description"]);
    for component in registry.components().values() {
        let path = component
            .paths
            .iter()
            .map(|segments| segments.join(" / "))
            .collect::<Vec<_>>()
            .join(", ");
        components.row([&component.name, &path, &component.description]);
    }
    section(&mut out, "Components", &components);

    let mut threats = MarkdownTable::new(&["Threat", "Description"]);
    for threat in registry.threats().values() {
        threats.row([&threat.name, &threat.description]);
    }
    section(&mut out, "Threats", &threats);

    let mut controls = MarkdownTable::new(&["Control", "Description"]);
    for control in registry.controls().values() {
        controls.row([&control.name, &control.description]);
    }
    section(&mut out, "Controls", &controls);

    let mut exposures = MarkdownTable::new(&["Component", "Threat", "Details", "Source"]);
    for e in relations.exposures() {
        exposures.row([&e.component, &e.threat, &e.details, &link(&e.source)]);
    }
    section(&mut out, "Exposures", &exposures);

    let mut mitigations = MarkdownTable::new(&["Component", "Threat", "Control", "Source"]);
    for m in relations.mitigations() {
        mitigations.row([&m.component, &m.threat, &m.control, &link(&m.source)]);
    }
    section(&mut out, "Mitigations", &mitigations);

    let mut acceptances = MarkdownTable::new(&["Threat", "Component", "Details", "Source"]);
    for a in relations.acceptances() {
        acceptances.row([&a.threat, &a.component, &a.details, &link(&a.source)]);
    }
    section(&mut out, "Acceptances", &acceptances);

    let mut transfers = MarkdownTable::new(&["Threat", "From", "To", "Details", "Source"]);
    for t in relations.transfers() {
        transfers.row([
            &t.threat,
            &t.source_component,
            &t.destination_component,
            &t.details,
            &link(&t.source),
        ]);
    }
    section(&mut out, "Transfers", &transfers);

    let mut connections =
        MarkdownTable::new(&["Source", "Direction", "Destination", "Details", "Location"]);
    for c in relations.connections() {
        connections.row([
            c.source_component.as_str(),
            c.direction.as_str(),
            c.destination_component.as_str(),
            c.details.as_str(),
            link(&c.source).as_str(),
        ]);
    }
    section(&mut out, "Connections", &connections);

    let mut reviews = MarkdownTable::new(&["Component", "Details", "Source"]);
    for r in relations.reviews() {
        reviews.row([&r.component, &r.details, &link(&r.source)]);
    }
    section(&mut out, "Reviews", &reviews);

    let mut tests = MarkdownTable::new(&["Control", "Component", "Source"]);
    for t in relations.tests() {
        tests.row([&t.control, &t.component, &link(&t.source)]);
    }
    section(&mut out, "Tests", &tests);

    out
}

fn section(out: &mut String, title: &str, table: &MarkdownTable) {
    let _ = writeln!(out, "## {}\n", title);
    if table.is_empty() {
        out.push_str("_None._\n\n");
    } else {
        out.push_str(&table.render());
        out.push('\n');
    }
}

/// `file:line`, linked into the repository when its URL is configured
fn source_link(source: &Source, repository_url: Option<&str>) -> String {
    if source.filename.is_empty() {
        return String::new();
    }
    let label = format!("{}:{}", source.filename, source.line);
    match repository_url {
        Some(url) => format!(
            "[{}]({}/{}#L{})",
            label,
            url.trim_end_matches('/'),
            source.filename,
            source.line
        ),
        None => label,
    }
}
