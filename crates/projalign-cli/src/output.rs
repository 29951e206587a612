use std::io::{self, Write};
use std::path::Path;
use std::sync::OnceLock;

use serde::Serialize;
use termcolor::{Color, ColorChoice, ColorSpec, StandardStream, WriteColor};

use projalign_core::report::{AlignReport, MigrateReport, Outcome, ScanReport};
use projalign_core::schema::SchemaStatus;

static JSON_MODE: OnceLock<bool> = OnceLock::new();

pub fn init(json: bool) {
    let _ = JSON_MODE.set(json);
}

pub fn is_json() -> bool {
    JSON_MODE.get().copied().unwrap_or(false)
}

pub fn print<T: Serialize>(value: &T) -> anyhow::Result<()> {
    let s = serde_json::to_string_pretty(value)?;
    println!("{s}");
    Ok(())
}

pub fn eprintln_line(msg: &str) {
    let _ = writeln!(io::stderr(), "{msg}");
}

pub fn stdout() -> StandardStream {
    StandardStream::stdout(ColorChoice::Auto)
}

/// JSON envelope for one processed pair or project.
#[derive(Debug, Serialize)]
pub struct Entry<'a, R: Serialize> {
    pub source: Option<&'a Path>,
    pub project: &'a Path,
    pub written: Option<&'a Path>,
    pub report: &'a R,
}

fn heading(out: &mut StandardStream, color: Color, text: &str) -> io::Result<()> {
    out.set_color(ColorSpec::new().set_fg(Some(color)).set_bold(true))?;
    writeln!(out, "{text}")?;
    out.reset()
}

fn id_list(out: &mut StandardStream, label: &str, ids: &[String]) -> io::Result<()> {
    if ids.is_empty() {
        return Ok(());
    }
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    writeln!(out, "{label} ({}):", ids.len())?;
    out.reset()?;
    for id in ids {
        writeln!(out, "  {id}")?;
    }
    Ok(())
}

fn schema_note(out: &mut StandardStream, status: &SchemaStatus) -> io::Result<()> {
    let Some(note) = degraded_schema_note(status) else {
        return Ok(());
    };
    out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
    writeln!(out, "{note}")?;
    out.reset()
}

fn degraded_schema_note(status: &SchemaStatus) -> Option<String> {
    if !status.is_degraded() {
        return None;
    }
    let cause = match status {
        SchemaStatus::Failed(reason) => format!("schema bundle unavailable ({reason})"),
        _ => "schema bundle ignored".to_string(),
    };
    Some(format!("{cause}, native component definitions only"))
}

fn scan_notes(out: &mut StandardStream, scan: &ScanReport) -> io::Result<()> {
    if !scan.unsafe_component_fields.is_empty() {
        out.set_color(ColorSpec::new().set_fg(Some(Color::Yellow)))?;
        writeln!(out, "component fields treated as references without a schema:")?;
        out.reset()?;
        for (component, fields) in &scan.unsafe_component_fields {
            writeln!(out, "  {component}: {}", fields.join(", "))?;
        }
    }
    if !scan.material_property_ids.is_empty() {
        writeln!(out, "material properties treated as references:")?;
        for (owner, properties) in &scan.material_property_ids {
            writeln!(out, "  {owner}: {}", properties.join(", "))?;
        }
    }
    if scan.ignored_sites > 0 {
        writeln!(
            out,
            "{} possible reference(s) left untouched, rerun with --unsafe to rewrite them",
            scan.ignored_sites
        )?;
    }
    Ok(())
}

fn outcome_line(out: &mut StandardStream, op: &str, outcome: Outcome, written: Option<&Path>) -> io::Result<()> {
    let (color, word) = match outcome {
        Outcome::Completed => (Color::Green, "Completed"),
        Outcome::DryRun => (Color::Green, "Checked"),
        Outcome::Skipped => (Color::Cyan, "Skipped"),
        Outcome::PreexistingDuplicates | Outcome::PostOperationDuplicates => (Color::Red, "Failed"),
    };
    heading(out, color, &format!("{op} {word}"))?;
    if let Some(path) = written {
        writeln!(out, "written to {}", path.display())?;
    }
    Ok(())
}

pub fn align_report(source: &Path, target: &Path, report: &AlignReport, written: Option<&Path>) -> anyhow::Result<()> {
    if is_json() {
        return print(&Entry {
            source: Some(source),
            project: target,
            written,
            report,
        });
    }

    let mut out = stdout();
    heading(
        &mut out,
        Color::Cyan,
        &format!("{} -> {}", source.display(), target.display()),
    )?;
    if report.outcome == Outcome::Skipped {
        writeln!(out, "target is the source project")?;
        return Ok(());
    }
    schema_note(&mut out, &report.schema)?;
    id_list(&mut out, "duplicate identifiers in source", &report.source_duplicates)?;
    id_list(&mut out, "duplicate identifiers in target", &report.target_duplicates)?;

    for r in &report.renames {
        let kind = r.match_kind.map(|k| format!(" [{k:?}]").to_lowercase()).unwrap_or_default();
        writeln!(out, "  {} {} -> {}{kind}", r.collection, r.old_id, r.new_id)?;
    }
    writeln!(
        out,
        "{} renamed, {} already aligned, {} pass(es)",
        report.renames.len(),
        report.already_aligned.len(),
        report.passes
    )?;
    id_list(&mut out, "non-unique matches accepted", &report.non_unique)?;
    scan_notes(&mut out, &report.scan)?;
    id_list(&mut out, "duplicate identifiers after align", &report.duplicates_after)?;
    if report.forced {
        writeln!(out, "written despite duplicates (--force)")?;
    }
    outcome_line(&mut out, "ALIGN", report.outcome, written)?;
    Ok(())
}

pub fn migrate_report(project: &Path, report: &MigrateReport, written: Option<&Path>) -> anyhow::Result<()> {
    if is_json() {
        return print(&Entry {
            source: None,
            project,
            written,
            report,
        });
    }

    let mut out = stdout();
    heading(&mut out, Color::Cyan, &project.display().to_string())?;
    schema_note(&mut out, &report.schema)?;
    id_list(&mut out, "duplicate identifiers", &report.duplicates)?;
    if report.outcome != Outcome::DryRun && report.outcome != Outcome::PreexistingDuplicates {
        writeln!(out, "{} identifier(s) replaced", report.renames.len())?;
        if report.regenerated > 0 {
            writeln!(out, "{} generated identifier(s) were in use and drawn again", report.regenerated)?;
        }
    }
    scan_notes(&mut out, &report.scan)?;
    id_list(&mut out, "duplicate identifiers after migration", &report.duplicates_after)?;
    if report.forced {
        writeln!(out, "written despite duplicates (--force)")?;
    }
    outcome_line(&mut out, "UUIDIFY", report.outcome, written)?;
    Ok(())
}

/// Lists what failed once every pair or project has been processed.
pub fn failures(failed: &[String]) -> anyhow::Result<()> {
    if failed.is_empty() || is_json() {
        return Ok(());
    }
    let mut out = stdout();
    heading(&mut out, Color::Red, &format!("{} failed:", failed.len()))?;
    for line in failed {
        writeln!(out, "  {line}")?;
    }
    Ok(())
}
