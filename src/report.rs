//! PDF report export.
//!
//! Builds a paginated A4 document with [`lopdf`]: a title on every page, a
//! teal header row repeated per page, and one row per record with the
//! classification annotation. Cells wider than their column wrap onto extra
//! lines, and rows are paginated by the height they take up. Text uses the standard Helvetica fonts with
//! `WinAnsiEncoding`, so strings are encoded to cp1252 via `encoding_rs`.

use crate::classify::annotation_text;
use crate::error::Result;
use crate::model::EmployeeRecord;
use crate::render::{HOURS_HEADER, NAME_HEADER, NOTE_HEADER};
use lopdf::content::{Content, Operation};
use lopdf::{dictionary, Document, Object, ObjectId, Stream, StringFormat};
use std::path::Path;
use tracing::info;

/// File name used when the report is exported without an explicit path.
pub(crate) const DEFAULT_REPORT_NAME: &str = "datos_extraidos.pdf";

const TITLE: &str = "Datos Extraídos de PDF";

// A4 in points.
const PAGE_WIDTH: i64 = 595;
const PAGE_HEIGHT: i64 = 842;

const MARGIN_LEFT: i64 = 40;
const TITLE_Y: i64 = 800;
const HEADER_Y: i64 = 768;
const FIRST_ROW_Y: i64 = 748;
const ROW_HEIGHT: i64 = 18;
const LINE_HEIGHT: i64 = 12;
const BOTTOM_Y: i64 = 50;
const FOOTER_Y: i64 = 30;

/// Single-line rows that fit on one page.
pub(crate) const ROWS_PER_PAGE: usize = ((FIRST_ROW_Y - BOTTOM_Y) / ROW_HEIGHT + 1) as usize;

/// Column x positions and the number of characters per line.
const COLUMNS: [(i64, usize); 3] = [(46, 44), (300, 22), (430, 20)];

/// Header fill, rgb(38, 166, 154).
const HEADER_FILL: [f32; 3] = [0.149, 0.651, 0.604];

/// Render the report and write it to `path`.
pub(crate) fn write_report(records: &[EmployeeRecord], path: &Path) -> Result<()> {
    let bytes = build_report(records)?;
    std::fs::write(path, &bytes)?;
    info!(path = %path.display(), rows = records.len(), "report written");
    Ok(())
}

/// Render the report to PDF bytes. An empty record list still produces a
/// single page with the title and header.
pub(crate) fn build_report(records: &[EmployeeRecord]) -> Result<Vec<u8>> {
    let mut doc = Document::with_version("1.5");
    let pages_id = doc.new_object_id();

    let regular = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica",
        "Encoding" => "WinAnsiEncoding",
    });
    let bold = doc.add_object(dictionary! {
        "Type" => "Font",
        "Subtype" => "Type1",
        "BaseFont" => "Helvetica-Bold",
        "Encoding" => "WinAnsiEncoding",
    });
    let resources_id = doc.add_object(dictionary! {
        "Font" => dictionary! {
            "F1" => regular,
            "F2" => bold,
        },
    });

    let pages = paginate(records);
    let page_count = pages.len();

    let mut kids: Vec<Object> = Vec::with_capacity(page_count);
    for (index, rows) in pages.iter().enumerate() {
        let content = page_content(rows, index + 1, page_count);
        let content_id = doc.add_object(Stream::new(dictionary! {}, content.encode()?));
        let page_id = add_page(&mut doc, pages_id, content_id);
        kids.push(page_id.into());
    }

    let pages = dictionary! {
        "Type" => "Pages",
        "Kids" => kids,
        "Count" => i64::try_from(page_count).unwrap_or(i64::MAX),
        "Resources" => resources_id,
        "MediaBox" => vec![
            Object::Integer(0),
            Object::Integer(0),
            Object::Integer(PAGE_WIDTH),
            Object::Integer(PAGE_HEIGHT),
        ],
    };
    doc.objects.insert(pages_id, Object::Dictionary(pages));

    let catalog_id = doc.add_object(dictionary! {
        "Type" => "Catalog",
        "Pages" => pages_id,
    });
    doc.trailer.set("Root", catalog_id);

    let mut buf = Vec::new();
    doc.save_to(&mut buf)?;
    Ok(buf)
}

fn add_page(doc: &mut Document, pages_id: ObjectId, content_id: ObjectId) -> ObjectId {
    doc.add_object(dictionary! {
        "Type" => "Page",
        "Parent" => pages_id,
        "Contents" => content_id,
    })
}

/// One table row, each cell already wrapped to its column.
struct Row {
    cells: [Vec<String>; 3],
}

impl Row {
    fn new(rec: &EmployeeRecord) -> Self {
        let texts = [
            rec.employee_name.as_str(),
            rec.weekly_hours.as_str(),
            annotation_text(&rec.weekly_hours),
        ];
        let mut cells: [Vec<String>; 3] = Default::default();
        for ((cell, text), (_, width)) in cells.iter_mut().zip(texts).zip(COLUMNS) {
            *cell = wrap(text, width);
        }
        Self { cells }
    }

    fn lines(&self) -> i64 {
        let n = self.cells.iter().map(Vec::len).max().unwrap_or(1).max(1);
        i64::try_from(n).unwrap_or(i64::MAX)
    }

    /// Distance from this row's first baseline to the next row's.
    fn height(&self) -> i64 {
        ROW_HEIGHT.saturating_add((self.lines() - 1).saturating_mul(LINE_HEIGHT))
    }
}

/// Split records into pages by row height. Every page holds at least one
/// row, and an empty list still yields one empty page.
fn paginate(records: &[EmployeeRecord]) -> Vec<Vec<Row>> {
    let mut pages = Vec::new();
    let mut current: Vec<Row> = Vec::new();
    let mut y = FIRST_ROW_Y;
    for rec in records {
        let row = Row::new(rec);
        let last_baseline = y.saturating_sub((row.lines() - 1).saturating_mul(LINE_HEIGHT));
        if last_baseline < BOTTOM_Y && !current.is_empty() {
            pages.push(std::mem::take(&mut current));
            y = FIRST_ROW_Y;
        }
        y = y.saturating_sub(row.height());
        current.push(row);
    }
    pages.push(current);
    pages
}

/// Drawing operations for one page.
fn page_content(rows: &[Row], page: usize, page_count: usize) -> Content {
    let mut ops = Vec::new();

    // Title
    ops.push(Operation::new("g", vec![Object::Real(0.157)]));
    text(&mut ops, "F2", 18, MARGIN_LEFT, TITLE_Y, TITLE);

    // Header band
    ops.push(Operation::new(
        "rg",
        HEADER_FILL.iter().map(|c| Object::Real(*c)).collect(),
    ));
    ops.push(Operation::new(
        "re",
        vec![
            MARGIN_LEFT.into(),
            (HEADER_Y - 6).into(),
            (PAGE_WIDTH - 2 * MARGIN_LEFT).into(),
            ROW_HEIGHT.into(),
        ],
    ));
    ops.push(Operation::new("f", vec![]));
    ops.push(Operation::new("g", vec![Object::Integer(1)]));
    for ((x, _), label) in COLUMNS.iter().zip([NAME_HEADER, HOURS_HEADER, NOTE_HEADER]) {
        text(&mut ops, "F2", 10, *x, HEADER_Y, label);
    }

    // Rows
    ops.push(Operation::new("g", vec![Object::Integer(0)]));
    let mut y = FIRST_ROW_Y;
    for row in rows {
        for ((x, _), lines) in COLUMNS.iter().zip(&row.cells) {
            let mut line_y = y;
            for line in lines.iter().filter(|l| !l.is_empty()) {
                text(&mut ops, "F1", 10, *x, line_y, line);
                line_y -= LINE_HEIGHT;
            }
        }
        y -= row.height();
    }

    // Footer
    ops.push(Operation::new("g", vec![Object::Real(0.4)]));
    text(
        &mut ops,
        "F1",
        8,
        MARGIN_LEFT,
        FOOTER_Y,
        &format!("Página {page} de {page_count}"),
    );

    Content { operations: ops }
}

/// Append a single positioned text run.
fn text(ops: &mut Vec<Operation>, font: &str, size: i64, x: i64, y: i64, s: &str) {
    ops.push(Operation::new("BT", vec![]));
    ops.push(Operation::new("Tf", vec![font.into(), size.into()]));
    ops.push(Operation::new("Td", vec![x.into(), y.into()]));
    ops.push(Operation::new("Tj", vec![pdf_string(s)]));
    ops.push(Operation::new("ET", vec![]));
}

/// Encode text for a `WinAnsiEncoding` font. Characters outside cp1252
/// come out as numeric character references.
fn pdf_string(s: &str) -> Object {
    let (bytes, _, _) = encoding_rs::WINDOWS_1252.encode(s);
    Object::String(bytes.into_owned(), StringFormat::Literal)
}

/// Break `s` into lines of at most `width` characters on word boundaries.
/// Words longer than a line are split. Always returns at least one line.
fn wrap(s: &str, width: usize) -> Vec<String> {
    let width = width.max(1);
    let mut lines = Vec::new();
    let mut line = String::new();
    let mut line_len = 0;

    for word in s.split_whitespace() {
        let mut chars: Vec<char> = word.chars().collect();
        if line_len > 0 && line_len + 1 + chars.len() > width {
            lines.push(std::mem::take(&mut line));
            line_len = 0;
        }
        if chars.len() > width {
            if line_len > 0 {
                lines.push(std::mem::take(&mut line));
                line_len = 0;
            }
            while chars.len() > width {
                lines.push(chars.drain(..width).collect());
            }
        }
        if line_len > 0 {
            line.push(' ');
            line_len += 1;
        }
        line_len += chars.len();
        line.extend(chars);
    }

    if line_len > 0 || lines.is_empty() {
        lines.push(line);
    }
    lines
}
