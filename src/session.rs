//! Run orchestration: read all selected files, concatenate, extract once.
//!
//! [`run_pipeline`] holds all of the decision logic and knows nothing about
//! selection or display. [`Session`] wraps it with the user-facing state:
//! the file selection, the last result, and a [`RunStatus`] published on a
//! `watch` channel so a presentation layer can follow along without
//! driving the pipeline itself.
//!
//! Status moves `idle -> reading -> analyzing -> done | error`, and a new
//! run from `done` or `error` starts over at `reading`. Records are only
//! present in `done`.

use crate::error::{Error, Result};
use crate::extract::FieldExtractor;
use crate::model::{EmployeeRecord, RunStatus, SelectedFile};
use crate::pdf::DocumentReader;
use futures_util::future::try_join_all;
use std::path::Path;
use std::sync::{Mutex, MutexGuard, PoisonError};
use tokio::sync::watch;
use tracing::{debug, info, warn};

/// Header line written before each file's text in the extractor input.
fn file_delimiter(name: &str) -> String {
    format!("--- Archivo: {name} ---")
}

/// Build the extractor input from per-file texts.
///
/// Files whose text is blank contribute nothing. Returns `None` when no
/// file had any text at all.
pub(crate) fn concatenate(files: &[SelectedFile], texts: &[String]) -> Option<String> {
    let blocks: Vec<String> = files
        .iter()
        .zip(texts)
        .filter(|(_, text)| !text.trim().is_empty())
        .map(|(file, text)| format!("{}\n{}\n", file_delimiter(&file.name), text.trim_end()))
        .collect();

    if blocks.is_empty() {
        None
    } else {
        Some(blocks.join("\n"))
    }
}

/// Run one extraction over `files`.
///
/// Every file is read concurrently and all reads must finish before the
/// extractor is called. The first failed read fails the run and the
/// extractor is never called. If no file yields any text the run succeeds
/// with no records, again without calling the extractor.
///
/// `on_stage` is told when reading starts and when analysis starts.
pub(crate) async fn run_pipeline<R, E, F>(
    reader: &R,
    extractor: &E,
    files: &[SelectedFile],
    mut on_stage: F,
) -> Result<Vec<EmployeeRecord>>
where
    R: DocumentReader,
    E: FieldExtractor,
    F: FnMut(RunStatus),
{
    on_stage(RunStatus::Reading);
    info!(files = files.len(), "reading documents");
    let texts = try_join_all(files.iter().map(|file| reader.read_text(file))).await?;

    on_stage(RunStatus::Analyzing);
    let Some(input) = concatenate(files, &texts) else {
        warn!("no text found in any selected file");
        return Ok(Vec::new());
    };
    debug!(chars = input.len(), "extracting fields");
    extractor.extract(&input).await
}

#[derive(Debug, Default)]
struct SessionState {
    files: Vec<SelectedFile>,
    records: Option<Vec<EmployeeRecord>>,
    error: Option<String>,
    /// Display names of the files in the last started run.
    run_files: Vec<String>,
}

/// Selection plus the outcome of the most recent run.
pub(crate) struct Session<R, E> {
    reader: R,
    extractor: E,
    state: Mutex<SessionState>,
    status: watch::Sender<RunStatus>,
}

impl<R, E> Session<R, E>
where
    R: DocumentReader,
    E: FieldExtractor,
{
    pub(crate) fn new(reader: R, extractor: E) -> Self {
        let (status, _) = watch::channel(RunStatus::Idle);
        Self {
            reader,
            extractor,
            state: Mutex::new(SessionState::default()),
            status,
        }
    }

    fn lock(&self) -> MutexGuard<'_, SessionState> {
        self.state.lock().unwrap_or_else(PoisonError::into_inner)
    }

    fn set_status(&self, next: RunStatus) {
        self.status.send_if_modified(|current| {
            if *current == next {
                false
            } else {
                debug!(from = %current, to = %next, "status");
                *current = next;
                true
            }
        });
    }

    /// Follow status changes.
    pub(crate) fn subscribe(&self) -> watch::Receiver<RunStatus> {
        self.status.subscribe()
    }

    pub(crate) fn status(&self) -> RunStatus {
        *self.status.borrow()
    }

    #[cfg(test)]
    pub(crate) fn extractor(&self) -> &E {
        &self.extractor
    }

    /// Drop any previous result after a selection change.
    fn invalidate(&self, state: &mut SessionState) {
        state.records = None;
        state.error = None;
        self.set_status(RunStatus::Idle);
    }

    /// Add a PDF to the selection. A path that is already selected is
    /// ignored. A file whose name matches a different selected file is shown
    /// under its full path so every display name stays unique.
    pub(crate) fn add_file(&self, path: impl AsRef<Path>) -> Result<()> {
        let path = path.as_ref();
        let is_pdf_name = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("pdf"));
        if !is_pdf_name {
            return Err(Error::Document(format!(
                "{}: only PDF files can be selected",
                path.display()
            )));
        }

        let mut state = self.lock();
        if self.status().is_active() {
            return Err(Error::Busy);
        }
        let mut file = SelectedFile::from_path(path);
        if !state.files.iter().any(|f| f.path == file.path) {
            if state.files.iter().any(|f| f.name == file.name) {
                file.name = file.path.display().to_string();
            }
            debug!(file = %file.name, "selected");
            state.files.push(file);
        }
        self.invalidate(&mut state);
        Ok(())
    }

    /// Remove a file from the selection by display name. Returns whether a
    /// file was removed.
    pub(crate) fn remove_file(&self, name: &str) -> Result<bool> {
        let mut state = self.lock();
        if self.status().is_active() {
            return Err(Error::Busy);
        }
        let before = state.files.len();
        state.files.retain(|f| f.name != name);
        let removed = state.files.len() != before;
        if removed {
            debug!(file = %name, "deselected");
        }
        self.invalidate(&mut state);
        Ok(removed)
    }

    /// Display names of the currently selected files.
    pub(crate) fn file_names(&self) -> Vec<String> {
        self.lock().files.iter().map(|f| f.name.clone()).collect()
    }

    /// Display names of the files in the last started run.
    pub(crate) fn run_file_names(&self) -> Vec<String> {
        self.lock().run_files.clone()
    }

    /// Records of the last run; `Some` only in [`RunStatus::Done`].
    pub(crate) fn records(&self) -> Option<Vec<EmployeeRecord>> {
        self.lock().records.clone()
    }

    /// Message of the last failed run; `Some` only in [`RunStatus::Error`].
    pub(crate) fn error_message(&self) -> Option<String> {
        self.lock().error.clone()
    }

    /// Run the pipeline over the current selection and return the final
    /// status.
    ///
    /// With nothing selected, or while another run is active, this does
    /// nothing and returns the current status.
    pub(crate) async fn run(&self) -> RunStatus {
        let files = {
            let mut state = self.lock();
            let current = self.status();
            if state.files.is_empty() || current.is_active() {
                return current;
            }
            state.records = None;
            state.error = None;
            state.run_files = state.files.iter().map(|f| f.name.clone()).collect();
            self.set_status(RunStatus::Reading);
            state.files.clone()
        };

        let result = run_pipeline(&self.reader, &self.extractor, &files, |stage| {
            self.set_status(stage);
        })
        .await;

        let mut state = self.lock();
        let status = match result {
            Ok(records) => {
                info!(records = records.len(), "run finished");
                state.records = Some(records);
                RunStatus::Done
            }
            Err(e) => {
                warn!(error = %e, "run failed");
                state.error = Some(e.to_string());
                RunStatus::Error
            }
        };
        self.set_status(status);
        status
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use std::sync::atomic::{AtomicUsize, Ordering};
    use tokio::sync::{Barrier, Notify};

    /// Reader serving canned text (or a failure) per file name.
    #[derive(Default)]
    struct FakeReader {
        docs: HashMap<String, std::result::Result<String, String>>,
        barrier: Option<Barrier>,
    }

    impl FakeReader {
        fn with(mut self, name: &str, text: &str) -> Self {
            self.docs.insert(name.into(), Ok(text.into()));
            self
        }

        fn failing(mut self, name: &str, message: &str) -> Self {
            self.docs.insert(name.into(), Err(message.into()));
            self
        }
    }

    impl DocumentReader for FakeReader {
        async fn read_text(&self, file: &SelectedFile) -> Result<String> {
            if let Some(barrier) = &self.barrier {
                barrier.wait().await;
            }
            match self.docs.get(&file.name) {
                Some(Ok(text)) => Ok(text.clone()),
                Some(Err(message)) => Err(Error::Document(message.clone())),
                None => Err(Error::Document(format!("{}: not found", file.name))),
            }
        }
    }

    /// Extractor that records its inputs and returns a fixed outcome.
    struct FakeExtractor {
        outcome: std::result::Result<Vec<EmployeeRecord>, String>,
        calls: AtomicUsize,
        inputs: Mutex<Vec<String>>,
        gate: Option<Notify>,
    }

    impl FakeExtractor {
        fn returning(records: Vec<EmployeeRecord>) -> Self {
            Self {
                outcome: Ok(records),
                calls: AtomicUsize::new(0),
                inputs: Mutex::new(Vec::new()),
                gate: None,
            }
        }

        fn failing(message: &str) -> Self {
            Self {
                outcome: Err(message.into()),
                ..Self::returning(Vec::new())
            }
        }

        fn gated(mut self) -> Self {
            self.gate = Some(Notify::new());
            self
        }

        fn calls(&self) -> usize {
            self.calls.load(Ordering::SeqCst)
        }

        fn last_input(&self) -> Option<String> {
            self.inputs.lock().unwrap().last().cloned()
        }
    }

    impl FieldExtractor for FakeExtractor {
        async fn extract(&self, text: &str) -> Result<Vec<EmployeeRecord>> {
            self.calls.fetch_add(1, Ordering::SeqCst);
            self.inputs.lock().unwrap().push(text.to_string());
            if let Some(gate) = &self.gate {
                gate.notified().await;
            }
            self.outcome.clone().map_err(Error::Extraction)
        }
    }

    fn ana() -> EmployeeRecord {
        EmployeeRecord::new("Ana Pérez", "40 horas/sem")
    }

    // ── concatenate ──────────────────────────────────────────────

    #[test]
    fn concatenate_prefixes_each_file() {
        let files = [
            SelectedFile::from_path("a.pdf"),
            SelectedFile::from_path("b.pdf"),
        ];
        let texts = ["uno\n".to_string(), "dos".to_string()];
        assert_eq!(
            concatenate(&files, &texts).unwrap(),
            "--- Archivo: a.pdf ---\nuno\n\n--- Archivo: b.pdf ---\ndos\n"
        );
    }

    #[test]
    fn concatenate_skips_blank_files() {
        let files = [
            SelectedFile::from_path("scan.pdf"),
            SelectedFile::from_path("b.pdf"),
        ];
        let texts = ["  \n".to_string(), "dos".to_string()];
        let input = concatenate(&files, &texts).unwrap();
        assert!(!input.contains("scan.pdf"));
        assert!(concatenate(&files[..1], &texts[..1]).is_none());
    }

    // ── Session ──────────────────────────────────────────────────

    #[tokio::test]
    async fn successful_run_reaches_done() {
        let session = Session::new(
            FakeReader::default().with("a.pdf", "Ana Pérez 40 horas/sem"),
            FakeExtractor::returning(vec![ana()]),
        );
        session.add_file("a.pdf").unwrap();

        assert_eq!(session.run().await, RunStatus::Done);
        assert_eq!(session.status(), RunStatus::Done);
        assert_eq!(session.records(), Some(vec![ana()]));
        assert_eq!(session.error_message(), None);
        assert_eq!(session.extractor().calls(), 1);
    }

    #[tokio::test]
    async fn run_with_no_files_is_noop() {
        let session = Session::new(FakeReader::default(), FakeExtractor::returning(vec![]));
        let mut rx = session.subscribe();

        assert_eq!(session.run().await, RunStatus::Idle);
        assert!(!rx.has_changed().unwrap());
        assert_eq!(session.records(), None);
        assert_eq!(session.extractor().calls(), 0);
    }

    #[tokio::test]
    async fn failed_read_aborts_before_extraction() {
        let session = Session::new(
            FakeReader::default()
                .with("a.pdf", "Ana 40 horas/sem")
                .failing("b.pdf", "b.pdf: PDF extraction failed: encrypted"),
            FakeExtractor::returning(vec![ana()]),
        );
        session.add_file("a.pdf").unwrap();
        session.add_file("b.pdf").unwrap();

        assert_eq!(session.run().await, RunStatus::Error);
        assert_eq!(session.records(), None);
        assert!(session.error_message().unwrap().contains("encrypted"));
        assert_eq!(session.extractor().calls(), 0);
    }

    #[tokio::test]
    async fn extractor_failure_reaches_error() {
        let session = Session::new(
            FakeReader::default().with("a.pdf", "texto"),
            FakeExtractor::failing("HTTP 500: boom"),
        );
        session.add_file("a.pdf").unwrap();

        assert_eq!(session.run().await, RunStatus::Error);
        assert_eq!(session.records(), None);
        assert_eq!(
            session.error_message().as_deref(),
            Some("extraction failed: HTTP 500: boom")
        );
    }

    #[tokio::test]
    async fn empty_text_file_is_done_with_no_records() {
        let session = Session::new(
            FakeReader::default().with("escaneado.pdf", ""),
            FakeExtractor::returning(vec![ana()]),
        );
        session.add_file("/docs/escaneado.pdf").unwrap();

        assert_eq!(session.run().await, RunStatus::Done);
        assert_eq!(session.records(), Some(Vec::new()));
        assert_eq!(session.run_file_names(), vec!["escaneado.pdf".to_string()]);
        assert_eq!(session.extractor().calls(), 0);
    }

    #[tokio::test]
    async fn removed_file_is_excluded_from_next_run() {
        let session = Session::new(
            FakeReader::default()
                .with("a.pdf", "TEXTO-A")
                .with("b.pdf", "TEXTO-B"),
            FakeExtractor::returning(vec![ana()]),
        );
        session.add_file("a.pdf").unwrap();
        session.add_file("b.pdf").unwrap();
        assert!(session.remove_file("a.pdf").unwrap());
        assert!(!session.remove_file("zzz.pdf").unwrap());

        session.run().await;
        let input = session.extractor().last_input().unwrap();
        assert!(input.contains("TEXTO-B"));
        assert!(!input.contains("TEXTO-A"));
        assert!(!input.contains("a.pdf"));
    }

    #[tokio::test]
    async fn same_name_in_different_folders_is_kept() {
        let session = Session::new(
            FakeReader::default()
                .with("nomina.pdf", "TEXTO-ENERO")
                .with("/febrero/nomina.pdf", "TEXTO-FEBRERO"),
            FakeExtractor::returning(vec![ana()]),
        );
        session.add_file("/enero/nomina.pdf").unwrap();
        session.add_file("/febrero/nomina.pdf").unwrap();
        session.add_file("/enero/nomina.pdf").unwrap();
        assert_eq!(
            session.file_names(),
            vec!["nomina.pdf", "/febrero/nomina.pdf"]
        );

        assert_eq!(session.run().await, RunStatus::Done);
        let input = session.extractor().last_input().unwrap();
        assert!(input.contains("TEXTO-ENERO"));
        assert!(input.contains("TEXTO-FEBRERO"));
        assert!(input.contains("--- Archivo: /febrero/nomina.pdf ---"));

        assert!(session.remove_file("/febrero/nomina.pdf").unwrap());
        assert_eq!(session.file_names(), vec!["nomina.pdf"]);
        session.run().await;
        let input = session.extractor().last_input().unwrap();
        assert!(input.contains("TEXTO-ENERO"));
        assert!(!input.contains("TEXTO-FEBRERO"));
    }

    #[tokio::test]
    async fn selection_change_clears_result() {
        let session = Session::new(
            FakeReader::default()
                .with("a.pdf", "x")
                .with("b.pdf", "y"),
            FakeExtractor::returning(vec![ana()]),
        );
        session.add_file("a.pdf").unwrap();
        session.run().await;
        assert!(session.records().is_some());

        session.add_file("b.pdf").unwrap();
        assert_eq!(session.status(), RunStatus::Idle);
        assert_eq!(session.records(), None);
        assert_eq!(session.file_names(), vec!["a.pdf", "b.pdf"]);
    }

    #[tokio::test]
    async fn rerun_after_error_starts_over() {
        let session = Session::new(
            FakeReader::default()
                .with("a.pdf", "x")
                .failing("b.pdf", "broken"),
            FakeExtractor::returning(vec![ana()]),
        );
        session.add_file("a.pdf").unwrap();
        session.add_file("b.pdf").unwrap();
        assert_eq!(session.run().await, RunStatus::Error);

        session.remove_file("b.pdf").unwrap();
        assert_eq!(session.error_message(), None);
        assert_eq!(session.run().await, RunStatus::Done);
        assert_eq!(session.records(), Some(vec![ana()]));
    }

    #[tokio::test]
    async fn non_pdf_selection_rejected() {
        let session = Session::new(FakeReader::default(), FakeExtractor::returning(vec![]));
        assert!(session.add_file("notas.txt").is_err());
        assert!(session.add_file("INFORME.PDF").is_ok());
        session.add_file("INFORME.PDF").unwrap();
        assert_eq!(session.file_names(), vec!["INFORME.PDF"]);
    }

    #[tokio::test]
    async fn reads_run_concurrently() {
        // Each read waits until all three are in flight.
        let reader = FakeReader {
            barrier: Some(Barrier::new(3)),
            ..FakeReader::default()
                .with("a.pdf", "TEXTO-A")
                .with("b.pdf", "TEXTO-B")
                .with("c.pdf", "TEXTO-C")
        };
        let session = Session::new(reader, FakeExtractor::returning(vec![ana()]));
        for name in ["a.pdf", "b.pdf", "c.pdf"] {
            session.add_file(name).unwrap();
        }

        assert_eq!(session.run().await, RunStatus::Done);
        let input = session.extractor().last_input().unwrap();
        for text in ["TEXTO-A", "TEXTO-B", "TEXTO-C"] {
            assert!(input.contains(text));
        }
    }

    #[tokio::test]
    async fn status_sequence_and_busy_selection() {
        let session = Session::new(
            FakeReader::default().with("a.pdf", "x"),
            FakeExtractor::returning(vec![ana()]).gated(),
        );
        session.add_file("a.pdf").unwrap();
        let mut rx = session.subscribe();
        let seen = Mutex::new(Vec::new());

        let (status, ()) = tokio::join!(session.run(), async {
            rx.wait_for(|s| *s == RunStatus::Analyzing).await.unwrap();
            seen.lock().unwrap().push(RunStatus::Analyzing);

            assert!(matches!(session.add_file("b.pdf"), Err(Error::Busy)));
            assert!(matches!(session.remove_file("a.pdf"), Err(Error::Busy)));
            assert_eq!(session.records(), None);

            if let Some(gate) = &session.extractor().gate {
                gate.notify_one();
            }
        });

        assert_eq!(status, RunStatus::Done);
        assert_eq!(*seen.lock().unwrap(), vec![RunStatus::Analyzing]);
        assert_eq!(session.file_names(), vec!["a.pdf"]);
    }
}
