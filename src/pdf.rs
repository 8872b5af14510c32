//! PDF text extraction.
//!
//! Uses [`pdf_extract`] to pull text from PDF files. Since `pdf_extract` can
//! panic on malformed input (rather than returning errors), all calls are
//! wrapped in [`std::panic::catch_unwind`] to convert panics into
//! [`Error::Document`] errors.
//!
//! A document that parses but carries no text (a scanned, image-only PDF)
//! is not an error here: it yields an empty string and the caller decides
//! what "no data" means.

use crate::error::{Error, Result};
use crate::model::SelectedFile;
use std::panic::{self, AssertUnwindSafe};
use tracing::{debug, warn};

/// Maximum input file size (256 MiB). Prevents accidental OOM from
/// huge files.
pub(crate) const MAX_INPUT_SIZE: usize = 256 * 1024 * 1024;

const PDF_MAGIC: [u8; 5] = [0x25, 0x50, 0x44, 0x46, 0x2D]; // %PDF-

/// Source of document text for the pipeline.
///
/// The production reader parses PDFs from disk; tests substitute a fake.
pub(crate) trait DocumentReader: Send + Sync {
    /// Read one selected file and return its concatenated page text.
    async fn read_text(&self, file: &SelectedFile) -> Result<String>;
}

/// Reads PDF files from the local filesystem.
#[derive(Debug, Default, Clone, Copy)]
pub(crate) struct PdfReader;

impl DocumentReader for PdfReader {
    async fn read_text(&self, file: &SelectedFile) -> Result<String> {
        let data = tokio::fs::read(&file.path)
            .await
            .map_err(|e| Error::Document(format!("{}: {e}", file.name)))?;
        check_input(&data, &file.name)?;

        debug!(file = %file.name, bytes = data.len(), "extracting text");
        let text = tokio::task::spawn_blocking(move || extract_text(&data))
            .await
            .map_err(|e| Error::Document(format!("{}: extraction task failed: {e}", file.name)))?
            .map_err(|e| Error::Document(format!("{}: {e}", file.name)))?;

        if text.trim().is_empty() {
            warn!(
                file = %file.name,
                "no text could be extracted (may be scanned/image-only)"
            );
        }
        Ok(text)
    }
}

/// True if `data` starts with the PDF file signature.
pub(crate) fn is_pdf(data: &[u8]) -> bool {
    data.len() >= PDF_MAGIC.len() && data[..PDF_MAGIC.len()] == PDF_MAGIC
}

/// Reject inputs that are too large or are not PDFs at all.
fn check_input(data: &[u8], name: &str) -> Result<()> {
    if data.len() > MAX_INPUT_SIZE {
        #[allow(clippy::cast_precision_loss)] // only used in error message
        let size_mib = data.len() as f64 / (1024.0 * 1024.0);
        return Err(Error::Document(format!(
            "{name}: too large ({size_mib:.1} MiB, max {} MiB)",
            MAX_INPUT_SIZE / (1024 * 1024),
        )));
    }
    if !is_pdf(data) {
        return Err(Error::Document(format!("{name}: not a PDF document")));
    }
    Ok(())
}

/// Extract pages of text from a PDF byte slice, returning one `String` per
/// page.
///
/// Panics from the underlying library are caught and converted to errors.
fn extract_pages(data: &[u8]) -> Result<Vec<String>> {
    let data = data.to_vec(); // owned copy for the unwind boundary
    let result = panic::catch_unwind(AssertUnwindSafe(|| {
        pdf_extract::extract_text_from_mem_by_pages(&data)
    }));
    match result {
        Ok(Ok(pages)) => Ok(pages),
        Ok(Err(e)) => Err(Error::Document(format!("PDF extraction failed: {e}"))),
        Err(_) => Err(Error::Document(
            "PDF extraction panicked (malformed document)".into(),
        )),
    }
}

/// Clean up a page of extracted text: trim trailing whitespace from each line,
/// collapse runs of 3+ blank lines down to 2, and trim leading/trailing
/// blank lines from the whole page.
fn clean_page(raw: &str) -> String {
    let mut out = String::with_capacity(raw.len());
    let mut blank_run = 0_u32;
    for line in raw.lines().map(str::trim_end) {
        if line.is_empty() {
            blank_run += 1;
            if blank_run <= 2 {
                out.push('\n');
            }
        } else {
            blank_run = 0;
            out.push_str(line);
            out.push('\n');
        }
    }

    let trimmed = out.trim_matches('\n');
    if trimmed.is_empty() {
        String::new()
    } else {
        let mut s = trimmed.to_string();
        s.push('\n');
        s
    }
}

/// Join cleaned pages with one blank line between them. Pages without text
/// are skipped; no pages with text gives an empty string.
fn join_pages<S: AsRef<str>>(pages: &[S]) -> String {
    pages
        .iter()
        .map(|p| clean_page(p.as_ref()))
        .filter(|p| !p.is_empty())
        .collect::<Vec<_>>()
        .join("\n")
}

/// Extract the text of every page of a PDF, pages separated by a blank line.
///
/// Returns an empty string for image-only documents; fails only when the
/// document cannot be parsed.
pub(crate) fn extract_text(data: &[u8]) -> Result<String> {
    let pages = extract_pages(data)?;
    Ok(join_pages(&pages))
}
