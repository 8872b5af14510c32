//! Text rendering of run status and results.
//!
//! Produces either a markdown document (pretty-printed through `bat` on a
//! terminal) or tab-separated plain text for pipes. Every row carries the
//! classification annotation from [`crate::classify`].

use crate::classify::annotation_text;
use crate::model::{EmployeeRecord, RunStatus};
use std::fmt::Write as _;

pub(crate) const NAME_HEADER: &str = "Nombre de Empleado";
pub(crate) const HOURS_HEADER: &str = "Jornada Semanal";
pub(crate) const NOTE_HEADER: &str = "Observación";

/// One-line status indicator for the active stages.
pub(crate) fn status_line(status: RunStatus) -> Option<&'static str> {
    match status {
        RunStatus::Reading => Some("Leyendo archivos..."),
        RunStatus::Analyzing => Some("Analizando con IA..."),
        RunStatus::Idle | RunStatus::Done | RunStatus::Error => None,
    }
}

/// Message shown when a run finished without any records.
pub(crate) fn empty_message(file_names: &[String]) -> String {
    format!(
        "No se encontraron datos de empleados en los archivos: {}.",
        file_names.join(", ")
    )
}

// ── Plain text rendering ──────────────────────────────────────────

/// Tab-separated rows: name, hours, and the annotation when present.
pub(crate) fn render_plain(records: &[EmployeeRecord], file_names: &[String]) -> String {
    if records.is_empty() {
        let mut out = empty_message(file_names);
        out.push('\n');
        return out;
    }

    let mut out = String::new();
    for rec in records {
        let mut line = format!(
            "{}\t{}\t{}",
            rec.employee_name,
            rec.weekly_hours,
            annotation_text(&rec.weekly_hours)
        );
        line.truncate(line.trim_end().len());
        out.push_str(&line);
        out.push('\n');
    }
    out
}

// ── Markdown rendering ────────────────────────────────────────────

/// A results heading, the source file list, and a three-column table.
pub(crate) fn render_markdown(records: &[EmployeeRecord], file_names: &[String]) -> String {
    if records.is_empty() {
        let mut out = String::from("## Análisis Completo\n\n");
        out.push_str(&empty_message(file_names));
        out.push('\n');
        return out;
    }

    let mut out = String::from("## Resultados de la extracción\n\n");
    out.push_str("Archivos: ");
    out.push_str(&file_names.join(", "));
    out.push_str("\n\n");

    let _ = writeln!(out, "| {NAME_HEADER} | {HOURS_HEADER} | {NOTE_HEADER} |");
    out.push_str("| --- | --- | --- |\n");
    for rec in records {
        out.push_str("| ");
        out.push_str(&escape_cell(&rec.employee_name));
        out.push_str(" | ");
        out.push_str(&escape_cell(&rec.weekly_hours));
        out.push_str(" | ");
        out.push_str(annotation_text(&rec.weekly_hours));
        out.push_str(" |\n");
    }
    out
}

/// Records as pretty-printed JSON.
pub(crate) fn render_json(records: &[EmployeeRecord]) -> serde_json::Result<String> {
    let mut out = serde_json::to_string_pretty(records)?;
    out.push('\n');
    Ok(out)
}

/// Escape pipe characters and flatten newlines for markdown table cells.
fn escape_cell(s: &str) -> String {
    s.replace('|', "\\|").replace(['\r', '\n'], " ")
}

#[cfg(test)]
mod tests {
    use super::*;

    fn names(list: &[&str]) -> Vec<String> {
        list.iter().map(|s| (*s).to_string()).collect()
    }

    fn sample() -> Vec<EmployeeRecord> {
        vec![
            EmployeeRecord::new("Ana Pérez", "40 horas/sem"),
            EmployeeRecord::new("Luis Gómez", "20 horas/sem"),
        ]
    }

    #[test]
    fn status_lines() {
        assert_eq!(status_line(RunStatus::Reading), Some("Leyendo archivos..."));
        assert_eq!(status_line(RunStatus::Analyzing), Some("Analizando con IA..."));
        assert_eq!(status_line(RunStatus::Done), None);
    }

    #[test]
    fn empty_message_names_files() {
        assert_eq!(
            empty_message(&names(&["a.pdf", "b.pdf"])),
            "No se encontraron datos de empleados en los archivos: a.pdf, b.pdf."
        );
    }

    #[test]
    fn markdown_table_with_annotations() {
        let md = render_markdown(&sample(), &names(&["nomina.pdf"]));
        assert!(md.contains("Archivos: nomina.pdf"));
        assert!(md.contains("| Nombre de Empleado | Jornada Semanal | Observación |"));
        assert!(md.contains("| Ana Pérez | 40 horas/sem | NOT APPLICABLE |"));
        assert!(md.contains("| Luis Gómez | 20 horas/sem |  |"));
    }

    #[test]
    fn markdown_empty_result() {
        let md = render_markdown(&[], &names(&["escaneado.pdf"]));
        assert!(md.contains("escaneado.pdf"));
        assert!(!md.contains('|'));
    }

    #[test]
    fn plain_rows_are_tab_separated() {
        let text = render_plain(&sample(), &names(&["nomina.pdf"]));
        assert_eq!(
            text,
            "Ana Pérez\t40 horas/sem\tNOT APPLICABLE\nLuis Gómez\t20 horas/sem\n"
        );
    }

    #[test]
    fn cells_escape_pipes_and_newlines() {
        assert_eq!(escape_cell("a|b\nc"), "a\\|b c");
    }

    #[test]
    fn json_uses_wire_names() {
        let json = render_json(&sample()[..1]).unwrap();
        assert!(json.contains("\"employeeName\": \"Ana Pérez\""));
        assert!(json.contains("\"weeklyHours\": \"40 horas/sem\""));
    }
}
